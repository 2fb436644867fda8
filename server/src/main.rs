use clap::Parser;
use log::{debug, error, info, warn};
use server::orchestrator::{AdminCommand, EngineMessage, GameConfig, Orchestrator};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

/// Main-method of the application.
/// Parses command-line arguments, then starts the game engine loop plus
/// console stand-ins for the chat, push and control-panel collaborators.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Applications phase length in seconds
        #[clap(long, default_value = "30")]
        applications_secs: u64,
        /// Voting phase length in seconds
        #[clap(long, default_value = "30")]
        voting_secs: u64,
        /// Draft turn length in seconds
        #[clap(long, default_value = "15")]
        turn_secs: u64,
        /// Seed for the game's random source (entropy when omitted)
        #[clap(long)]
        seed: Option<u64>,
    }

    env_logger::init();

    let args = Args::parse();
    let config = GameConfig {
        applications_secs: args.applications_secs,
        voting_secs: args.voting_secs,
        turn_secs: args.turn_secs,
    };

    let (orchestrator, engine_rx) = Orchestrator::new(config, args.seed);
    let engine_tx = orchestrator.sender();
    let mut events = orchestrator.subscribe();

    // Engine loop: the only task that touches game state.
    let engine_handle = tokio::spawn(orchestrator.run(engine_rx));

    // Stands in for the realtime-push collaborator: encode each event the
    // way a transport would and log it. Lagging only costs events, never
    // stalls the game.
    let push_handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(payload) => debug!("push: {}", payload),
                    Err(e) => error!("failed to encode event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("push listener lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Stands in for the chat-ingestion and control-panel collaborators:
    // admin triggers by name, anything of the form "sender: text" as chat.
    let console_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let message = match line {
                "start-applications" => EngineMessage::Admin(AdminCommand::StartApplications),
                "start-election" => EngineMessage::Admin(AdminCommand::StartElection),
                "generate-map" => EngineMessage::Admin(AdminCommand::GenerateMap),
                "reset-game" => EngineMessage::Admin(AdminCommand::ResetGame),
                "create-dummy-teams" => EngineMessage::Admin(AdminCommand::CreateDummyTeams),
                chat_line => match chat_line.split_once(':') {
                    Some((sender, text)) => EngineMessage::Chat {
                        sender: sender.trim().to_string(),
                        text: text.trim().to_string(),
                    },
                    None => {
                        warn!("unrecognized console line: {}", chat_line);
                        continue;
                    }
                },
            };
            if engine_tx.send(message).is_err() {
                break;
            }
        }
        info!("console input closed");
    });

    // Handle shutdown gracefully
    tokio::select! {
        result = engine_handle => {
            if let Err(e) = result {
                eprintln!("Engine task panicked: {}", e);
            }
        }
        result = push_handle => {
            if let Err(e) = result {
                eprintln!("Push task panicked: {}", e);
            }
        }
        result = console_handle => {
            if let Err(e) = result {
                eprintln!("Console task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
