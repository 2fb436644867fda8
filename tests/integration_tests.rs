//! Integration tests for a complete game round
//!
//! These tests validate cross-component behavior by driving the
//! orchestrator through whole rounds, one engine message at a time, the
//! same way the live loop does.

use server::orchestrator::{AdminCommand, EngineMessage, GameConfig, Orchestrator};
use shared::{cell_label, GameState, Phase, ServerEvent, Terrain, FINALIST_LIMIT, LEADER_COUNT};
use std::collections::BTreeSet;

fn chat(orchestrator: &mut Orchestrator, sender: &str, text: &str) {
    orchestrator.handle_message(EngineMessage::Chat {
        sender: sender.to_string(),
        text: text.to_string(),
    });
}

fn admin(orchestrator: &mut Orchestrator, command: AdminCommand) {
    orchestrator.handle_message(EngineMessage::Admin(command));
}

fn open_cells(state: &GameState) -> Vec<(usize, usize)> {
    state
        .grid
        .as_ref()
        .map(|grid| {
            grid.iter()
                .flatten()
                .filter(|cell| cell.terrain != Terrain::Water && cell.owner.is_none())
                .map(|cell| (cell.row, cell.col))
                .collect()
        })
        .unwrap_or_default()
}

/// FULL ROUND TESTS
mod round_flow_tests {
    use super::*;

    /// Drives a round from applications through a completed draft and a
    /// reset, checking the structural invariants at every phase boundary.
    #[tokio::test(start_paused = true)]
    async fn full_round_applications_to_draft_completion() {
        let config = GameConfig::default();
        let (mut orchestrator, mut engine_rx) = Orchestrator::new(config, Some(2024));
        let mut events = orchestrator.subscribe();

        // Applications: 15 hopefuls, one rejected duplicate, one update.
        admin(&mut orchestrator, AdminCommand::StartApplications);
        assert_eq!(orchestrator.state().phase, Phase::Applications);
        for i in 0..15 {
            chat(
                &mut orchestrator,
                &format!("streamer{}", i),
                &format!("!run Team{} we win {}", i, i),
            );
        }
        chat(&mut orchestrator, "latecomer", "!run Team3 stolen name");
        chat(&mut orchestrator, "streamer3", "!run Team3 fresh slogan");
        assert_eq!(orchestrator.state().candidates.len(), 15);

        // Phase timer fires (the paused clock advances on its own).
        let fired = engine_rx.recv().await.expect("applications timer");
        orchestrator.handle_message(fired);
        assert_eq!(orchestrator.state().phase, Phase::Selection);
        assert_eq!(orchestrator.state().selected_candidates.len(), FINALIST_LIMIT);

        // Every finalist is a distinct original candidate.
        let finalist_ids: BTreeSet<String> = orchestrator
            .state()
            .selected_candidates
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(finalist_ids.len(), FINALIST_LIMIT);

        // Voting: index votes, name votes, a finalist's vote, a revote.
        admin(&mut orchestrator, AdminCommand::StartElection);
        assert_eq!(orchestrator.state().phase, Phase::Voting);

        let finalists: Vec<String> = orchestrator
            .state()
            .selected_candidates
            .iter()
            .map(|c| c.id.clone())
            .collect();
        chat(&mut orchestrator, "fan_a", "!vote 1");
        chat(&mut orchestrator, "fan_b", &format!("!vote {}", finalists[0]));
        chat(&mut orchestrator, "fan_c", "!vote 2");
        chat(&mut orchestrator, "fan_d", "!vote 3");
        chat(&mut orchestrator, "fan_e", "!vote 4");
        chat(&mut orchestrator, "fan_f", "!vote 5");
        chat(&mut orchestrator, &finalists[1], "!vote 1");
        chat(&mut orchestrator, "fan_a", "!vote 2");
        let ballots = &orchestrator.state().ballots;
        assert_eq!(ballots.len(), 6);
        assert!(!ballots.contains_key(&finalists[1]));
        assert_eq!(ballots.get("fan_a"), Some(&finalists[1]));

        // Voting timer fires: teams and rebels are formed.
        let fired = engine_rx.recv().await.expect("voting timer");
        orchestrator.handle_message(fired);
        let state = orchestrator.state();
        assert_eq!(state.phase, Phase::Results);
        assert_eq!(state.teams.len(), LEADER_COUNT);
        let rebels = state.rebels.as_ref().expect("rejected leaders exist");
        assert_eq!(
            state.teams.len() + rebels.leaders.len(),
            FINALIST_LIMIT,
            "leaders and rejected partition the finalists"
        );

        // Nobody is a member of two factions, no leader is a member.
        let leaders: BTreeSet<&str> = state.teams.iter().map(|t| t.leader.as_str()).collect();
        let mut seen_members: BTreeSet<String> = BTreeSet::new();
        for team in &state.teams {
            for member in &team.members {
                assert!(seen_members.insert(member.clone()));
                assert!(!leaders.contains(member.as_str()));
            }
        }
        for member in &rebels.members {
            assert!(seen_members.insert(member.clone()));
        }

        // Map: grid built, smallest team picks first.
        admin(&mut orchestrator, AdminCommand::GenerateMap);
        let state = orchestrator.state();
        assert_eq!(state.phase, Phase::Map);
        let draft_state = state.draft.as_ref().expect("draft running");
        assert_eq!(draft_state.picking_order.len(), LEADER_COUNT);
        let sizes: Vec<usize> = draft_state
            .picking_order
            .iter()
            .map(|leader| {
                state
                    .teams
                    .iter()
                    .find(|t| &t.leader == leader)
                    .expect("picker leads a team")
                    .members
                    .len()
            })
            .collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sizes, sorted, "smallest team drafts first");

        // Draft: each picker claims the first open cell in turn.
        for remaining in (1..=LEADER_COUNT).rev() {
            let picker = orchestrator
                .state()
                .draft
                .as_ref()
                .unwrap()
                .current_picker
                .clone()
                .expect("picker while order non-empty");
            let (row, col) = open_cells(orchestrator.state())[0];
            chat(&mut orchestrator, &picker, &format!("!claim {}", cell_label(row, col)));

            let state = orchestrator.state();
            assert_eq!(
                state.grid.as_ref().unwrap()[row][col].owner.as_deref(),
                Some(picker.as_str())
            );
            assert_eq!(state.draft.as_ref().unwrap().picking_order.len(), remaining - 1);
        }
        let state = orchestrator.state();
        assert_eq!(state.phase, Phase::Map, "phase waits for the admin after the draft");
        assert!(state.draft.as_ref().unwrap().current_picker.is_none());

        // Reset: back to square one.
        admin(&mut orchestrator, AdminCommand::ResetGame);
        assert_eq!(orchestrator.state().phase, Phase::Idle);
        assert!(orchestrator.state().teams.is_empty());

        // The notable beats all appeared on the event stream, in order.
        let mut saw = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event {
                ServerEvent::MapGenerated(_) => saw.push("map"),
                ServerEvent::DraftComplete => saw.push("complete"),
                ServerEvent::GameReset => saw.push("reset"),
                _ => {}
            }
        }
        assert_eq!(saw, vec!["map", "complete", "reset"]);
    }

    /// An election with no ballots at all still forms five teams; the
    /// remaining finalists become rebel leaders with no members.
    #[tokio::test(start_paused = true)]
    async fn silent_chat_still_forms_teams() {
        let (mut orchestrator, mut engine_rx) = Orchestrator::new(GameConfig::default(), Some(7));

        admin(&mut orchestrator, AdminCommand::StartApplications);
        for i in 0..8 {
            chat(
                &mut orchestrator,
                &format!("quiet{}", i),
                &format!("!run Camp{} silence {}", i, i),
            );
        }
        admin(&mut orchestrator, AdminCommand::StartElection);

        let fired = engine_rx.recv().await.expect("voting timer");
        orchestrator.handle_message(fired);

        let state = orchestrator.state();
        assert_eq!(state.phase, Phase::Results);
        assert_eq!(state.teams.len(), LEADER_COUNT);
        for team in &state.teams {
            assert_eq!(team.vote_count, 0);
            assert!(team.members.is_empty());
        }
        let rebels = state.rebels.as_ref().expect("three rejected leaders");
        assert_eq!(rebels.leaders.len(), 3);
        assert!(rebels.members.is_empty());
    }
}

/// DRAFT PROTOCOL TESTS
mod draft_protocol_tests {
    use super::*;

    /// A draft left entirely to its turn timers auto-assigns one cell per
    /// picker and never assigns the same cell twice.
    #[tokio::test(start_paused = true)]
    async fn unattended_draft_completes_on_timeouts() {
        let (mut orchestrator, mut engine_rx) = Orchestrator::new(GameConfig::default(), Some(99));
        admin(&mut orchestrator, AdminCommand::CreateDummyTeams);
        admin(&mut orchestrator, AdminCommand::GenerateMap);

        let open_before = open_cells(orchestrator.state()).len();
        for _ in 0..LEADER_COUNT {
            let fired = engine_rx.recv().await.expect("turn timer");
            orchestrator.handle_message(fired);
        }

        let state = orchestrator.state();
        assert!(state.draft.as_ref().unwrap().picking_order.is_empty());

        let owners: Vec<String> = state
            .grid
            .as_ref()
            .unwrap()
            .iter()
            .flatten()
            .filter_map(|cell| cell.owner.clone())
            .collect();
        let distinct: BTreeSet<&String> = owners.iter().collect();
        assert_eq!(owners.len(), distinct.len(), "every auto-pick took a fresh cell");
        assert_eq!(owners.len(), LEADER_COUNT.min(open_before));
        assert_eq!(open_cells(state).len(), open_before.saturating_sub(LEADER_COUNT));
    }

    /// Broadcasting the same state twice yields byte-identical payloads,
    /// map and all.
    #[tokio::test]
    async fn snapshot_payloads_are_stable() {
        let (mut orchestrator, _engine_rx) = Orchestrator::new(GameConfig::default(), Some(13));
        admin(&mut orchestrator, AdminCommand::CreateDummyTeams);
        admin(&mut orchestrator, AdminCommand::GenerateMap);

        let snapshot = || ServerEvent::GameState(orchestrator.state().clone());
        let first = serde_json::to_string(&snapshot()).expect("encodable state");
        let second = serde_json::to_string(&snapshot()).expect("encodable state");
        assert_eq!(first, second);
    }

    /// Claims arriving out of phase or out of turn leave the board alone.
    #[tokio::test]
    async fn stray_claims_never_mutate_the_board() {
        let (mut orchestrator, _engine_rx) = Orchestrator::new(GameConfig::default(), Some(5));

        // No game at all yet.
        chat(&mut orchestrator, "rando", "!claim C4");
        assert_eq!(orchestrator.state().phase, Phase::Idle);

        admin(&mut orchestrator, AdminCommand::CreateDummyTeams);
        admin(&mut orchestrator, AdminCommand::GenerateMap);
        let before = open_cells(orchestrator.state());

        // Not the current picker, and plain chatter.
        chat(&mut orchestrator, "rockjaw", "!claim A1");
        chat(&mut orchestrator, "rando", "hello everyone");
        assert_eq!(open_cells(orchestrator.state()), before);
    }
}
