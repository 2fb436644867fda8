//! Shared data model and event protocol for the Streamlands game server.
//!
//! Everything a transport collaborator needs to speak the protocol lives
//! here: the phase machine's state types, the outbound event enum, identity
//! normalization and the board coordinate format. All serialized types use
//! ordered collections so that encoding identical state always produces
//! identical payloads.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Board is GRID_SIZE x GRID_SIZE, addressed externally as A1..F6.
pub const GRID_SIZE: usize = 6;
/// Maximum number of candidates put to a vote.
pub const FINALIST_LIMIT: usize = 12;
/// Number of top-ranked finalists that become team leaders.
pub const LEADER_COUNT: usize = 5;
/// Resource markers scattered on the generated map.
pub const RESOURCE_MARKERS: usize = 10;
/// Attempt cap for resource placement's rejection sampling.
pub const RESOURCE_PLACEMENT_ATTEMPTS: usize = 100;

pub const APPLICATIONS_SECS: u64 = 30;
pub const VOTING_SECS: u64 = 30;
pub const TURN_SECS: u64 = 15;

/// Team colors assigned by formation order.
pub const TEAM_COLORS: [&str; 8] = [
    "blue", "red", "green", "purple", "orange", "cyan", "magenta", "yellow",
];
/// The rebel faction always gets this color, distinct from the palette.
pub const REBEL_COLOR: &str = "black";

/// Canonical form of a participant handle. All identity comparisons in the
/// game go through this.
pub fn normalize(handle: &str) -> String {
    handle.trim().to_lowercase()
}

/// Parses a board reference like "C4", "c-4" or "a 1" into zero-based
/// (row, col). The letter is the column, the digit is the row; a single
/// separator run of whitespace or hyphens is allowed between them.
pub fn parse_cell(text: &str) -> Option<(usize, usize)> {
    let text = text.trim();
    let mut chars = text.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if !('A'..='F').contains(&letter) {
        return None;
    }
    let rest: String = chars.collect();
    let rest = rest.trim_matches(|c: char| c.is_whitespace() || c == '-');
    let mut digits = rest.chars();
    let digit = digits.next()?;
    if digits.next().is_some() || !('1'..='6').contains(&digit) {
        return None;
    }
    let col = letter as usize - 'A' as usize;
    let row = digit as usize - '1' as usize;
    Some((row, col))
}

/// Formats zero-based (row, col) back into the external "C4" form.
pub fn cell_label(row: usize, col: usize) -> String {
    format!("{}{}", (b'A' + col as u8) as char, row + 1)
}

/// The game's authoritative phase. Every inbound command is validated
/// against exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Applications,
    Selection,
    Voting,
    Results,
    Map,
}

/// A viewer's application to lead a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Normalized handle, the key for all matching.
    pub id: String,
    /// Handle as the viewer typed it, for display.
    pub display_name: String,
    pub team_name: String,
    pub team_slogan: String,
    /// Epoch milliseconds of the latest (re-)application.
    pub applied_at: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamResources {
    pub wood: u32,
    pub iron: u32,
    pub clay: u32,
}

/// A team headed by an elected leader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Normalized leader handle. Leaders are stored here, never in `members`.
    pub leader: String,
    pub display_name: String,
    pub team_name: String,
    pub team_slogan: String,
    pub vote_count: usize,
    pub members: BTreeSet<String>,
    pub color: String,
    pub score: u32,
    pub wins: u32,
    pub resources: TeamResources,
}

/// Rejected leaders and their voters, banded together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebelFaction {
    pub leaders: Vec<String>,
    pub members: BTreeSet<String>,
    pub color: String,
    pub score: u32,
    pub wins: u32,
    pub resources: TeamResources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Water,
    Land,
    Mountain,
    Desert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Wood,
    Iron,
    Clay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCell {
    pub row: usize,
    pub col: usize,
    pub terrain: Terrain,
    pub resource: Option<ResourceKind>,
    /// Normalized handle of the claiming leader. Once set, never changes.
    pub owner: Option<String>,
}

/// Turn bookkeeping for the map draft. The current picker is always the
/// front of the picking order; advancing pops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftState {
    pub picking_order: VecDeque<String>,
    pub current_picker: Option<String>,
    /// Epoch milliseconds when the current turn times out.
    pub turn_deadline: u64,
}

/// The aggregate game state. Owned and mutated exclusively by the
/// orchestrator; replaced wholesale at every phase-initiating transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: Phase,
    pub candidates: Vec<Candidate>,
    pub selected_candidates: Vec<Candidate>,
    /// Normalized voter handle -> normalized target handle.
    pub ballots: BTreeMap<String, String>,
    pub teams: Vec<Team>,
    pub rebels: Option<RebelFaction>,
    pub grid: Option<Vec<Vec<MapCell>>>,
    pub draft: Option<DraftState>,
    /// Epoch milliseconds when the current phase timer ends, 0 when none.
    pub timer_end: u64,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            candidates: Vec::new(),
            selected_candidates: Vec::new(),
            ballots: BTreeMap::new(),
            teams: Vec::new(),
            rebels: None,
            grid: None,
            draft: None,
            timer_end: 0,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Named events pushed to the realtime transport collaborator. The wire
/// encoding is the transport's business; these are the payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full snapshot, broadcast after every mutation.
    GameState(GameState),
    UpdateCandidates(Vec<Candidate>),
    UpdateBallots(BTreeMap<String, String>),
    MapGenerated(Vec<Vec<MapCell>>),
    NowPicking { leader: String, deadline: u64 },
    DraftComplete,
    CellClaimed { row: usize, col: usize, owner: String },
    ClaimSuccess { leader: String, cell: String },
    ClaimError { leader: String, reason: String },
    GameReset,
}
