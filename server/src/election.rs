//! Election tally and team formation
//!
//! Counts ballots cast during the voting phase, ranks the finalists, and
//! builds the five leader teams plus the rebel faction from everyone who
//! backed a losing candidate.

use crate::commands::VoteTarget;
use log::debug;
use rand::Rng;
use shared::{
    normalize, Candidate, RebelFaction, Team, TeamResources, LEADER_COUNT, REBEL_COLOR,
    TEAM_COLORS,
};
use std::collections::{BTreeMap, BTreeSet};

/// Records one voter's ballot. Returns true when the ballot map changed.
///
/// Finalists cannot vote. A numeric target is a 1-based index into the
/// finalist list when in range; anything else is matched as a literal
/// handle. Targets that resolve to no finalist are dropped silently. A
/// voter's newer ballot overwrites their older one.
pub fn cast_vote(
    ballots: &mut BTreeMap<String, String>,
    voter: &str,
    target: &VoteTarget,
    selected: &[Candidate],
) -> bool {
    let voter_id = normalize(voter);
    if selected.iter().any(|c| c.id == voter_id) {
        debug!("ignoring ballot from finalist {}", voter);
        return false;
    }

    let resolved = match target {
        VoteTarget::ByIndex(n) if (1..=selected.len()).contains(n) => selected[n - 1].id.clone(),
        VoteTarget::ByIndex(n) => normalize(&n.to_string()),
        VoteTarget::ById(raw) => normalize(raw),
    };

    if !selected.iter().any(|c| c.id == resolved) {
        debug!("ignoring ballot from {} for unknown target", voter);
        return false;
    }

    ballots.insert(voter_id, resolved);
    true
}

/// Ranks the finalists by vote count and splits them into leaders and
/// rejected. The sort is stable and descending, so tied finalists keep
/// their selection order; leaders are the top `min(LEADER_COUNT, n)`.
pub fn tally(
    selected: &[Candidate],
    ballots: &BTreeMap<String, String>,
) -> (Vec<(Candidate, usize)>, Vec<(Candidate, usize)>) {
    let mut ranked: Vec<(Candidate, usize)> = selected
        .iter()
        .map(|candidate| {
            let count = ballots.values().filter(|v| **v == candidate.id).count();
            (candidate.clone(), count)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let cut = LEADER_COUNT.min(ranked.len());
    let rejected = ranked.split_off(cut);
    (ranked, rejected)
}

/// Builds the teams and, when any leader was rejected, the rebel faction.
///
/// A team's members are the voters whose ballot backed its leader, minus
/// anyone who is a finalist themselves: no leader is ever a rank-and-file
/// member of another team. Rebel members are the voters who backed any
/// rejected leader, under the same exclusion.
pub fn form_teams<R: Rng>(
    leaders: &[(Candidate, usize)],
    rejected: &[(Candidate, usize)],
    ballots: &BTreeMap<String, String>,
    selected: &[Candidate],
    rng: &mut R,
) -> (Vec<Team>, Option<RebelFaction>) {
    let finalist_ids: BTreeSet<&str> = selected.iter().map(|c| c.id.as_str()).collect();
    let voters_for = |ids: &BTreeSet<&str>| -> BTreeSet<String> {
        ballots
            .iter()
            .filter(|(voter, target)| {
                ids.contains(target.as_str()) && !finalist_ids.contains(voter.as_str())
            })
            .map(|(voter, _)| voter.clone())
            .collect()
    };

    let teams = leaders
        .iter()
        .enumerate()
        .map(|(index, (leader, count))| {
            let leader_id: BTreeSet<&str> = [leader.id.as_str()].into_iter().collect();
            Team {
                leader: leader.id.clone(),
                display_name: leader.display_name.clone(),
                team_name: leader.team_name.clone(),
                team_slogan: leader.team_slogan.clone(),
                vote_count: *count,
                members: voters_for(&leader_id),
                color: pick_color(index, rng),
                score: 0,
                wins: 0,
                resources: TeamResources::default(),
            }
        })
        .collect();

    let rebels = if rejected.is_empty() {
        None
    } else {
        let rejected_ids: BTreeSet<&str> = rejected.iter().map(|(c, _)| c.id.as_str()).collect();
        Some(RebelFaction {
            leaders: rejected.iter().map(|(c, _)| c.id.clone()).collect(),
            members: voters_for(&rejected_ids),
            color: REBEL_COLOR.to_string(),
            score: 0,
            wins: 0,
            resources: TeamResources::default(),
        })
    };

    (teams, rebels)
}

/// Palette color by formation order; past the palette's end, a uniform
/// random palette entry.
fn pick_color<R: Rng>(index: usize, rng: &mut R) -> String {
    if index < TEAM_COLORS.len() {
        TEAM_COLORS[index].to_string()
    } else {
        TEAM_COLORS[rng.gen_range(0..TEAM_COLORS.len())].to_string()
    }
}
