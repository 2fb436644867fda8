//! Map generation
//!
//! Builds the randomized 6x6 grid the draft is played on and computes the
//! order in which teams pick cells.

use log::debug;
use rand::Rng;
use shared::{
    MapCell, ResourceKind, Team, Terrain, GRID_SIZE, RESOURCE_MARKERS,
    RESOURCE_PLACEMENT_ATTEMPTS,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("no teams have been formed yet")]
    NoTeams,
}

/// Generates a fresh grid: terrain rolled independently per cell, then
/// resource markers scattered over non-water cells.
pub fn generate_grid<R: Rng>(rng: &mut R) -> Vec<Vec<MapCell>> {
    let mut grid = Vec::with_capacity(GRID_SIZE);
    for row in 0..GRID_SIZE {
        let mut cells = Vec::with_capacity(GRID_SIZE);
        for col in 0..GRID_SIZE {
            let roll: f64 = rng.gen_range(0.0..1.0);
            // Cumulative bands: 20% water, 40% land, 20% mountain, 20% desert.
            let terrain = if roll < 0.2 {
                Terrain::Water
            } else if roll < 0.6 {
                Terrain::Land
            } else if roll < 0.8 {
                Terrain::Mountain
            } else {
                Terrain::Desert
            };
            cells.push(MapCell {
                row,
                col,
                terrain,
                resource: None,
                owner: None,
            });
        }
        grid.push(cells);
    }
    scatter_resources(&mut grid, rng);
    grid
}

/// Places up to RESOURCE_MARKERS markers on distinct non-water cells by
/// rejection sampling. Running out of attempts with fewer markers placed is
/// accepted and only logged.
fn scatter_resources<R: Rng>(grid: &mut [Vec<MapCell>], rng: &mut R) {
    let kinds = [ResourceKind::Wood, ResourceKind::Iron, ResourceKind::Clay];
    let mut placed = 0;
    for _ in 0..RESOURCE_PLACEMENT_ATTEMPTS {
        if placed >= RESOURCE_MARKERS {
            break;
        }
        let row = rng.gen_range(0..GRID_SIZE);
        let col = rng.gen_range(0..GRID_SIZE);
        let cell = &mut grid[row][col];
        if cell.terrain == Terrain::Water || cell.resource.is_some() {
            continue;
        }
        cell.resource = Some(kinds[rng.gen_range(0..kinds.len())]);
        placed += 1;
    }
    if placed < RESOURCE_MARKERS {
        debug!(
            "placed {} of {} resource markers before running out of attempts",
            placed, RESOURCE_MARKERS
        );
    }
}

/// Draft order: smallest team picks first. The sort is stable, so teams
/// with equal member counts keep their formation order. Rebels never draft.
pub fn draft_order(teams: &[Team]) -> Result<Vec<String>, MapError> {
    if teams.is_empty() {
        return Err(MapError::NoTeams);
    }
    let mut by_size: Vec<&Team> = teams.iter().collect();
    by_size.sort_by_key(|team| team.members.len());
    Ok(by_size.into_iter().map(|team| team.leader.clone()).collect())
}
