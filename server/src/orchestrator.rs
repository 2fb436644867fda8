//! Game orchestrator
//!
//! Owns the single authoritative `GameState` and is its only mutator.
//! Inbound chat lines, admin triggers and timer firings all arrive as
//! messages on one queue and are handled to completion one at a time, so
//! no two mutations ever race. After every mutation the full state is
//! broadcast to whoever is listening; broadcasts are fire-and-forget and a
//! slow listener never stalls the game.
//!
//! Timers are spawned sleep-tasks that send a timer-fired message back into
//! the same queue. Arming a timer aborts the previous one and bumps the
//! epoch counter; a firing whose epoch does not match the current one is
//! stale and dropped, so a canceled timer can never act on a state it no
//! longer belongs to.

use crate::commands::{parse_command, ChatCommand};
use crate::draft::{self, TurnAdvance};
use crate::election;
use crate::map;
use crate::registry;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    cell_label, normalize, GameState, Phase, RebelFaction, ServerEvent, Team, TeamResources,
    APPLICATIONS_SECS, FINALIST_LIMIT, REBEL_COLOR, TEAM_COLORS, TURN_SECS, VOTING_SECS,
};
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Everything that can reach the engine: chat from the ingestion
/// collaborator, triggers from the control panel, and the engine's own
/// timers coming home.
#[derive(Debug)]
pub enum EngineMessage {
    Chat { sender: String, text: String },
    Admin(AdminCommand),
    TimerFired { epoch: u64, kind: TimerKind },
}

/// Zero-argument triggers from the admin control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    StartApplications,
    StartElection,
    GenerateMap,
    ResetGame,
    CreateDummyTeams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Ends the Applications or Voting phase.
    PhaseEnd,
    /// Ends the current draft turn.
    TurnEnd,
}

/// Phase and turn lengths, overridable from the command line.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub applications_secs: u64,
    pub voting_secs: u64,
    pub turn_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            applications_secs: APPLICATIONS_SECS,
            voting_secs: VOTING_SECS,
            turn_secs: TURN_SECS,
        }
    }
}

/// The single-writer game engine.
pub struct Orchestrator {
    state: GameState,
    config: GameConfig,
    rng: StdRng,
    /// Bumped whenever a timer is armed or canceled; firings carry the
    /// epoch they were armed under and stale ones are dropped.
    epoch: u64,
    timer: Option<JoinHandle<()>>,
    engine_tx: mpsc::UnboundedSender<EngineMessage>,
    events: broadcast::Sender<ServerEvent>,
}

impl Orchestrator {
    /// Creates the engine and the queue it drains. Pass a seed for a
    /// reproducible game, None for entropy.
    pub fn new(config: GameConfig, seed: Option<u64>) -> (Self, mpsc::UnboundedReceiver<EngineMessage>) {
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(256);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let orchestrator = Self {
            state: GameState::new(),
            config,
            rng,
            epoch: 0,
            timer: None,
            engine_tx,
            events,
        };
        (orchestrator, engine_rx)
    }

    /// Sender half of the engine queue, for the transport collaborators.
    pub fn sender(&self) -> mpsc::UnboundedSender<EngineMessage> {
        self.engine_tx.clone()
    }

    /// New subscription to the outbound event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Drains the engine queue until every sender is gone. All mutation
    /// happens inside this loop, one message at a time.
    pub async fn run(mut self, mut engine_rx: mpsc::UnboundedReceiver<EngineMessage>) {
        info!("game engine running");
        while let Some(message) = engine_rx.recv().await {
            self.handle_message(message);
        }
        info!("game engine stopped");
    }

    /// Handles one inbound message to completion. Never panics on bad
    /// input; anything invalid is logged and dropped.
    pub fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Chat { sender, text } => self.handle_chat(&sender, &text),
            EngineMessage::Admin(command) => self.handle_admin(command),
            EngineMessage::TimerFired { epoch, kind } => self.handle_timer(epoch, kind),
        }
    }

    fn handle_chat(&mut self, sender: &str, text: &str) {
        let Some(command) = parse_command(text, self.state.phase) else {
            return;
        };
        match command {
            ChatCommand::Apply { team_name, slogan } => {
                if registry::apply(
                    &mut self.state.candidates,
                    sender,
                    &team_name,
                    &slogan,
                    now_millis(),
                ) {
                    self.emit(ServerEvent::UpdateCandidates(self.state.candidates.clone()));
                }
            }
            ChatCommand::Vote { target } => {
                if election::cast_vote(
                    &mut self.state.ballots,
                    sender,
                    &target,
                    &self.state.selected_candidates,
                ) {
                    self.emit(ServerEvent::UpdateBallots(self.state.ballots.clone()));
                }
            }
            ChatCommand::Claim { row, col } => self.handle_claim(sender, row, col),
        }
    }

    fn handle_admin(&mut self, command: AdminCommand) {
        info!("admin trigger: {:?}", command);
        match command {
            AdminCommand::StartApplications => self.start_applications(),
            AdminCommand::StartElection => self.start_election(),
            AdminCommand::GenerateMap => self.generate_map(),
            AdminCommand::ResetGame => self.reset(),
            AdminCommand::CreateDummyTeams => self.create_dummy_teams(),
        }
    }

    fn handle_timer(&mut self, epoch: u64, kind: TimerKind) {
        if epoch != self.epoch {
            debug!("dropping stale {:?} firing (epoch {} != {})", kind, epoch, self.epoch);
            return;
        }
        match kind {
            TimerKind::PhaseEnd => match self.state.phase {
                Phase::Applications => self.end_applications(),
                Phase::Voting => self.end_voting(),
                other => warn!("phase timer fired during {:?}, ignoring", other),
            },
            TimerKind::TurnEnd => self.handle_turn_timeout(),
        }
    }

    fn start_applications(&mut self) {
        self.cancel_timer();
        self.state = GameState::new();
        self.state.phase = Phase::Applications;
        self.state.timer_end = deadline_millis(self.config.applications_secs);
        self.arm_timer(TimerKind::PhaseEnd, Duration::from_secs(self.config.applications_secs));
        self.broadcast_state();
    }

    fn end_applications(&mut self) {
        self.cancel_timer();
        self.state.selected_candidates =
            registry::select_finalists(&self.state.candidates, FINALIST_LIMIT, &mut self.rng);
        self.state.phase = Phase::Selection;
        self.state.timer_end = 0;
        info!(
            "applications closed: {} of {} candidates selected",
            self.state.selected_candidates.len(),
            self.state.candidates.len()
        );
        self.broadcast_state();
    }

    fn start_election(&mut self) {
        match self.state.phase {
            // The admin skipped the wait; close applications first.
            Phase::Applications => self.end_applications(),
            Phase::Selection => {}
            other => {
                warn!("start-election ignored during {:?}", other);
                return;
            }
        }
        self.state.phase = Phase::Voting;
        self.state.timer_end = deadline_millis(self.config.voting_secs);
        self.arm_timer(TimerKind::PhaseEnd, Duration::from_secs(self.config.voting_secs));
        self.broadcast_state();
    }

    fn end_voting(&mut self) {
        self.cancel_timer();
        let (leaders, rejected) = election::tally(&self.state.selected_candidates, &self.state.ballots);
        let (teams, rebels) = election::form_teams(
            &leaders,
            &rejected,
            &self.state.ballots,
            &self.state.selected_candidates,
            &mut self.rng,
        );
        info!(
            "voting closed: {} teams formed, rebels {}",
            teams.len(),
            if rebels.is_some() { "present" } else { "absent" }
        );
        self.state.teams = teams;
        self.state.rebels = rebels;
        self.state.phase = Phase::Results;
        self.state.timer_end = 0;
        self.broadcast_state();
    }

    fn generate_map(&mut self) {
        if self.state.phase != Phase::Results {
            warn!("generate-map ignored during {:?}", self.state.phase);
            return;
        }
        let order = match map::draft_order(&self.state.teams) {
            Ok(order) => order,
            Err(err) => {
                warn!("generate-map refused: {}", err);
                return;
            }
        };

        let grid = map::generate_grid(&mut self.rng);
        let deadline = deadline_millis(self.config.turn_secs);
        let draft_state = draft::begin(order, deadline);
        let first_picker = draft_state.current_picker.clone();

        self.emit(ServerEvent::MapGenerated(grid.clone()));
        self.state.grid = Some(grid);
        self.state.draft = Some(draft_state);
        self.state.phase = Phase::Map;
        self.state.timer_end = deadline;

        if let Some(leader) = first_picker {
            self.arm_timer(TimerKind::TurnEnd, Duration::from_secs(self.config.turn_secs));
            self.emit(ServerEvent::NowPicking { leader, deadline });
        }
        self.broadcast_state();
    }

    fn handle_claim(&mut self, sender: &str, row: usize, col: usize) {
        let leader = normalize(sender);
        let current = self
            .state
            .draft
            .as_ref()
            .and_then(|draft_state| draft_state.current_picker.clone());
        if current.as_deref() != Some(leader.as_str()) {
            debug!("ignoring out-of-turn claim from {}", sender);
            return;
        }

        let result = match self.state.grid.as_mut() {
            Some(grid) => draft::try_claim(grid, &leader, row, col),
            None => return,
        };
        match result {
            Ok(()) => {
                info!("{} claimed {}", leader, cell_label(row, col));
                self.emit(ServerEvent::CellClaimed {
                    row,
                    col,
                    owner: leader.clone(),
                });
                self.emit(ServerEvent::ClaimSuccess {
                    leader,
                    cell: cell_label(row, col),
                });
                self.advance_turn();
            }
            Err(err) => {
                // The picker keeps the turn until they succeed or time out.
                warn!("claim by {} refused: {}", leader, err);
                self.emit(ServerEvent::ClaimError {
                    leader,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn handle_turn_timeout(&mut self) {
        if self.state.phase != Phase::Map {
            return;
        }
        let Some(picker) = self
            .state
            .draft
            .as_ref()
            .and_then(|draft_state| draft_state.current_picker.clone())
        else {
            return;
        };

        let auto_picked = match self.state.grid.as_mut() {
            Some(grid) => draft::auto_claim(grid, &picker, &mut self.rng),
            None => None,
        };
        match auto_picked {
            Some((row, col)) => {
                info!("turn expired, {} auto-assigned {}", picker, cell_label(row, col));
                self.emit(ServerEvent::CellClaimed {
                    row,
                    col,
                    owner: picker.clone(),
                });
                self.emit(ServerEvent::ClaimSuccess {
                    leader: picker,
                    cell: cell_label(row, col),
                });
            }
            None => info!("turn expired with no open cells, {} skipped", picker),
        }
        self.advance_turn();
    }

    fn advance_turn(&mut self) {
        let deadline = deadline_millis(self.config.turn_secs);
        let outcome = match self.state.draft.as_mut() {
            Some(draft_state) => draft::advance(draft_state, deadline),
            None => return,
        };
        match outcome {
            TurnAdvance::NextPicker(next) => {
                self.state.timer_end = deadline;
                self.arm_timer(TimerKind::TurnEnd, Duration::from_secs(self.config.turn_secs));
                self.emit(ServerEvent::NowPicking { leader: next, deadline });
            }
            TurnAdvance::Complete => {
                self.state.timer_end = 0;
                self.cancel_timer();
                info!("draft complete");
                self.emit(ServerEvent::DraftComplete);
            }
        }
        self.broadcast_state();
    }

    fn reset(&mut self) {
        self.cancel_timer();
        self.state = GameState::new();
        info!("game reset");
        self.emit(ServerEvent::GameReset);
        self.broadcast_state();
    }

    fn create_dummy_teams(&mut self) {
        self.cancel_timer();
        let (teams, rebels) = dummy_teams();
        self.state = GameState::new();
        self.state.teams = teams;
        self.state.rebels = Some(rebels);
        self.state.phase = Phase::Results;
        self.broadcast_state();
    }

    /// Arms the one timer slot, replacing whatever was armed before.
    fn arm_timer(&mut self, kind: TimerKind, duration: Duration) {
        self.cancel_timer();
        let epoch = self.epoch;
        let engine_tx = self.engine_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = engine_tx.send(EngineMessage::TimerFired { epoch, kind });
        }));
    }

    /// Aborts any armed timer and bumps the epoch so an already-queued
    /// firing from it is recognized as stale.
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
        self.epoch += 1;
    }

    fn broadcast_state(&self) {
        self.emit(ServerEvent::GameState(self.state.clone()));
    }

    /// Fire-and-forget: nobody listening is not an error.
    fn emit(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }
}

/// Epoch milliseconds, the protocol's timestamp form.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

fn deadline_millis(secs: u64) -> u64 {
    now_millis() + secs * 1000
}

/// Fixed teams and rebels for exercising the Results and Map phases
/// without running a whole election. Same shape the real formation
/// produces: unique leaders, disjoint membership, palette colors in order.
fn dummy_teams() -> (Vec<Team>, RebelFaction) {
    let specs: [(&str, &str, &str, &[&str]); 5] = [
        ("rockjaw", "Stonecutters", "We dig it", &["gravelfan", "pebble_pal", "oremonger"]),
        ("meadowlark", "Larks", "Sing loud", &["birdwatcher", "early_riser"]),
        ("nightowl", "Owls", "Hoot squad", &["insomniac_77", "moonchild"]),
        ("saltbeard", "Corsairs", "Yo ho", &["deckhand_dan"]),
        ("emberfox", "Foxes", "Stay sly", &[]),
    ];
    let teams = specs
        .iter()
        .enumerate()
        .map(|(index, (leader, team_name, slogan, members))| Team {
            leader: leader.to_string(),
            display_name: leader.to_string(),
            team_name: team_name.to_string(),
            team_slogan: slogan.to_string(),
            vote_count: members.len(),
            members: members.iter().map(|m| m.to_string()).collect::<BTreeSet<String>>(),
            color: TEAM_COLORS[index].to_string(),
            score: 0,
            wins: 0,
            resources: TeamResources::default(),
        })
        .collect();

    let rebels = RebelFaction {
        leaders: vec!["grumbletusk".to_string(), "pondweed".to_string()],
        members: ["soggy_sock", "lurker_99"].iter().map(|m| m.to_string()).collect(),
        color: REBEL_COLOR.to_string(),
        score: 0,
        wins: 0,
        resources: TeamResources::default(),
    };

    (teams, rebels)
}
