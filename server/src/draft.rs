//! Draft turn engine
//!
//! The turn-based state machine for claiming map cells. The engine itself
//! is a set of pure decision functions over the grid and draft bookkeeping;
//! the orchestrator applies them, emits the notifications and arms the turn
//! timers.

use rand::Rng;
use shared::{cell_label, DraftState, MapCell, Terrain, GRID_SIZE};
use std::collections::VecDeque;
use thiserror::Error;

/// Why a claim by the current picker was refused. These are the only claim
/// failures surfaced back to the audience; the picker keeps the turn.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("({0}, {1}) is outside the map")]
    OutOfBounds(usize, usize),
    #[error("{0} is water and cannot be claimed")]
    Water(String),
    #[error("{0} is already claimed by {1}")]
    AlreadyOwned(String, String),
}

/// Outcome of consuming the current picker's turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAdvance {
    NextPicker(String),
    Complete,
}

/// Starts the draft over the given pick order. The first leader in the
/// order immediately becomes the current picker.
pub fn begin(order: Vec<String>, deadline: u64) -> DraftState {
    let picking_order: VecDeque<String> = order.into();
    let current_picker = picking_order.front().cloned();
    DraftState {
        picking_order,
        current_picker,
        turn_deadline: deadline,
    }
}

/// Attempts to claim a cell for the current picker. On success the cell's
/// owner is set; ownership is never overwritten.
pub fn try_claim(
    grid: &mut [Vec<MapCell>],
    leader: &str,
    row: usize,
    col: usize,
) -> Result<(), ClaimError> {
    if row >= GRID_SIZE || col >= GRID_SIZE {
        return Err(ClaimError::OutOfBounds(row, col));
    }
    let cell = &mut grid[row][col];
    if cell.terrain == Terrain::Water {
        return Err(ClaimError::Water(cell_label(row, col)));
    }
    if let Some(owner) = &cell.owner {
        return Err(ClaimError::AlreadyOwned(cell_label(row, col), owner.clone()));
    }
    cell.owner = Some(leader.to_string());
    Ok(())
}

/// Consumes the current picker's turn: pops the front of the order and
/// promotes the next leader, or completes the draft when nobody is left.
/// `next_deadline` only applies when another picker follows.
pub fn advance(draft: &mut DraftState, next_deadline: u64) -> TurnAdvance {
    draft.picking_order.pop_front();
    match draft.picking_order.front().cloned() {
        Some(next) => {
            draft.current_picker = Some(next.clone());
            draft.turn_deadline = next_deadline;
            TurnAdvance::NextPicker(next)
        }
        None => {
            draft.current_picker = None;
            draft.turn_deadline = 0;
            TurnAdvance::Complete
        }
    }
}

/// Fallback when the turn timer expires: claims a uniformly random cell
/// among those that are both non-water and unowned, exactly as a successful
/// claim would. Returns the claimed coordinates, or None when no cell
/// qualifies and the picker is skipped without territory.
pub fn auto_claim<R: Rng>(
    grid: &mut [Vec<MapCell>],
    leader: &str,
    rng: &mut R,
) -> Option<(usize, usize)> {
    let open: Vec<(usize, usize)> = grid
        .iter()
        .flatten()
        .filter(|cell| cell.terrain != Terrain::Water && cell.owner.is_none())
        .map(|cell| (cell.row, cell.col))
        .collect();
    if open.is_empty() {
        return None;
    }
    let (row, col) = open[rng.gen_range(0..open.len())];
    grid[row][col].owner = Some(leader.to_string());
    Some((row, col))
}
