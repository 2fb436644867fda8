//! Application registry
//!
//! Holds candidate applications during the applications phase. One
//! application per participant, team names unique across candidates, both
//! matched case-insensitively. At the end of the phase a random subset of
//! candidates is selected to stand for election.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{normalize, Candidate};

/// Registers or updates an application. Returns true when the registry
/// changed, so the caller knows to push a candidate-list update.
///
/// Rejections are silent: a blank team name, or a team name already held by
/// a different participant, leaves the registry untouched. Re-applying
/// overwrites the caller's own entry in place without reordering anyone
/// else.
pub fn apply(
    candidates: &mut Vec<Candidate>,
    sender: &str,
    team_name: &str,
    slogan: &str,
    now: u64,
) -> bool {
    let team_name = team_name.trim();
    if team_name.is_empty() {
        debug!("ignoring application from {} with blank team name", sender);
        return false;
    }

    let id = normalize(sender);
    let team_key = team_name.to_lowercase();
    let taken = candidates
        .iter()
        .any(|c| c.id != id && c.team_name.to_lowercase() == team_key);
    if taken {
        debug!(
            "ignoring application from {}: team name '{}' is taken",
            sender, team_name
        );
        return false;
    }

    if let Some(existing) = candidates.iter_mut().find(|c| c.id == id) {
        existing.team_name = team_name.to_string();
        existing.team_slogan = slogan.to_string();
        existing.applied_at = now;
    } else {
        candidates.push(Candidate {
            id,
            display_name: sender.trim().to_string(),
            team_name: team_name.to_string(),
            team_slogan: slogan.to_string(),
            applied_at: now,
        });
    }
    true
}

/// Uniform sample of up to `limit` candidates, without replacement. The
/// resulting order becomes the 1-based ballot index for the voting phase.
pub fn select_finalists<R: Rng>(
    candidates: &[Candidate],
    limit: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    let mut pool = candidates.to_vec();
    pool.shuffle(rng);
    pool.truncate(limit);
    pool
}
