//! `gameshowd`: runs a Gameshow server.

use std::path::PathBuf;

use clap::Parser;
use gameshow::prelude::*;

/// Live multi-player trivia game-show server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to listen on
    #[clap(short, long, default_value = "0.0.0.0:8080")]
    bind: String,
    /// Directory holding the question JSON files
    #[clap(short, long, default_value = "questions")]
    questions_dir: PathBuf,
    /// Round-1 questions before the elimination
    #[clap(long, default_value = "2")]
    questions_per_round: usize,
    /// Round-2 turns each player gets
    #[clap(long, default_value = "2")]
    turns_per_player: usize,
    /// Seconds shown as the advisory pack time limit
    #[clap(long, default_value = "45")]
    pack_time_limit: u32,
    /// Time speed answers on the server instead of trusting the client
    #[clap(long)]
    server_timing: bool,
    /// Seconds of silence before a connection is dropped
    #[clap(long, default_value = "600")]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), GameshowError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let game = GameConfig {
        questions_per_round: args.questions_per_round,
        turns_per_player: args.turns_per_player,
        pack_time_limit_secs: args.pack_time_limit,
        speed_timing: if args.server_timing {
            TimingSource::ServerStamped
        } else {
            TimingSource::ClientReported
        },
        ..GameConfig::default()
    };
    tracing::info!(?game, "game rules");

    let server = GameshowServer::builder()
        .bind(&args.bind)
        .questions_dir(args.questions_dir)
        .idle_timeout(std::time::Duration::from_secs(args.idle_timeout))
        .game_config(game)
        .build()
        .await?;
    server.run().await
}
