use clap::Parser;
use ledger_core::{
    constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, MAX_DIFFICULTY},
    pow::CancelFlag,
    LedgerConfig,
};
use ledger_node::{build_router, constants::DEFAULT_LISTEN, AppState, MiningOptions};
use std::{net::SocketAddr, time::Duration};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Leading hex zeros a mined hash must carry
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY, value_parser = parse_difficulty)]
    difficulty: usize,

    /// Coins credited to the caller of /mine
    #[arg(long, default_value_t = DEFAULT_MINING_REWARD)]
    reward: i64,

    /// Give up on a mining request after this many seconds
    #[arg(long)]
    mine_timeout_secs: Option<u64>,

    /// Search nonces on all cores
    #[arg(long)]
    parallel: bool,
}

fn parse_difficulty(raw: &str) -> Result<usize, String> {
    let difficulty: usize = raw.parse().map_err(|e| format!("{e}"))?;
    if difficulty > MAX_DIFFICULTY {
        return Err(format!("must be at most {MAX_DIFFICULTY}"));
    }
    Ok(difficulty)
}

async fn shutdown_signal(shutdown: CancelFlag) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        return;
    }
    info!("shutting down, cancelling in-flight mining");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = LedgerConfig::new(args.difficulty, args.reward)?;
    let mining = MiningOptions {
        parallel: args.parallel,
        timeout: args.mine_timeout_secs.map(Duration::from_secs),
    };
    let state = AppState::new(config, mining);
    let shutdown = state.shutdown().clone();
    let app = build_router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!(
        difficulty = config.difficulty,
        reward = config.reward,
        parallel = mining.parallel,
        "ledger-node listening on http://{addr}"
    );
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}
