//! Chat command parsing
//!
//! Turns a raw chat line into a typed game command, given the current phase.
//! A command verb is only recognized in the phase it belongs to; everything
//! else, including a known verb in the wrong phase, parses to `None` and is
//! never surfaced back to the sender.

use shared::{parse_cell, Phase};

/// How a ballot names its target: a 1-based index into the finalist list,
/// or a literal handle. Produced here so the tally never has to guess what
/// kind of string it is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteTarget {
    ByIndex(usize),
    ById(String),
}

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `!run <team> <slogan...>` during Applications.
    Apply { team_name: String, slogan: String },
    /// `!vote <target>` during Voting.
    Vote { target: VoteTarget },
    /// `!claim <cell>` during Map, e.g. `!claim C4`.
    Claim { row: usize, col: usize },
}

/// Parses one chat line against the current phase.
pub fn parse_command(text: &str, phase: Phase) -> Option<ChatCommand> {
    let text = text.trim();
    match phase {
        Phase::Applications => {
            let rest = text.strip_prefix("!run ")?;
            let mut parts = rest.split_whitespace();
            let team_name = parts.next()?.to_string();
            let slogan_parts: Vec<&str> = parts.collect();
            // An application needs both a team name and a slogan.
            if slogan_parts.is_empty() {
                return None;
            }
            Some(ChatCommand::Apply {
                team_name,
                slogan: slogan_parts.join(" "),
            })
        }
        Phase::Voting => {
            let rest = text.strip_prefix("!vote ")?;
            let raw = rest.split_whitespace().next()?;
            let target = match raw.parse::<usize>() {
                Ok(index) => VoteTarget::ByIndex(index),
                Err(_) => VoteTarget::ById(raw.to_string()),
            };
            Some(ChatCommand::Vote { target })
        }
        Phase::Map => {
            let rest = text.strip_prefix("!claim ")?;
            let (row, col) = parse_cell(rest)?;
            Some(ChatCommand::Claim { row, col })
        }
        Phase::Idle | Phase::Selection | Phase::Results => None,
    }
}
