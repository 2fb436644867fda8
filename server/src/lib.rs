//! # Streamlands Game Server Library
//!
//! This library implements the authoritative engine for a chat-driven
//! social game played over a live video stream: viewers apply in chat to
//! lead teams, a random subset of applicants is put to a vote, the elected
//! leaders draft the audience into teams, and the teams then take turns
//! claiming territory on a shared grid map.
//!
//! ## Core Responsibilities
//!
//! ### Single Source of Truth
//! The orchestrator owns the one authoritative `GameState` and is its only
//! mutator. Chat commands, admin triggers and timer callbacks are all
//! serialized onto one queue, so two near-simultaneous claims for the same
//! cell always resolve as strictly first-committer-wins.
//!
//! ### Phase Machine
//! A round moves through Applications, Selection, Voting, Results and the
//! Map draft. Every inbound command is validated against the current phase;
//! commands that do not belong to it are dropped without a reply.
//!
//! ### State Broadcasting
//! After every mutation the full state is pushed to the realtime transport
//! collaborator, along with finer-grained notifications (candidate updates,
//! ballot updates, claim results). Broadcasts are fire-and-forget: a slow
//! listener never blocks the game.
//!
//! ## Module Organization
//!
//! ### Commands Module (`commands`)
//! Parses raw chat lines into typed game commands against the current
//! phase: `!run` applications, `!vote` ballots, `!claim` cell picks.
//!
//! ### Registry Module (`registry`)
//! Candidate applications: one per participant, unique team names, random
//! finalist selection at the end of the phase.
//!
//! ### Election Module (`election`)
//! Ballot casting and the tally that ranks finalists, plus formation of
//! the five leader teams and the rebel faction.
//!
//! ### Map Module (`map`)
//! The randomized 6x6 terrain grid, resource scattering, and the
//! smallest-team-first draft order.
//!
//! ### Draft Module (`draft`)
//! The turn-based claiming state machine: validation of picks, turn
//! advancement, and the random fallback when a turn times out.
//!
//! ### Orchestrator Module (`orchestrator`)
//! The engine loop tying it all together: phase transitions, cancellable
//! epoch-guarded timers, and event emission.

pub mod commands;
pub mod draft;
pub mod election;
pub mod map;
pub mod orchestrator;
pub mod registry;
