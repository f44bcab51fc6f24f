use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a block and collect the reward
    Mine,
    /// Show the latest block
    LastBlock,
    /// Dump the whole chain
    Chain,
    /// Send coins from this host to another address
    Submit {
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: i64,
    },
    /// Show a balance (defaults to this host)
    Coins {
        #[arg(long)]
        address: Option<String>,
    },
    /// List known peers
    Peers,
    /// Register a peer address
    AddPeer {
        #[arg(long)]
        address: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TxIn {
    to_address: String,
    amount: i64,
}

#[derive(Serialize)]
struct PeerIn {
    address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();
    let request = match cli.cmd {
        Command::Mine => client.get(format!("{node}/mine")),
        Command::LastBlock => client.get(format!("{node}/last_block")),
        Command::Chain => client.get(format!("{node}/chain")),
        Command::Submit { to, amount } => client
            .post(format!("{node}/transaction"))
            .json(&TxIn {
                to_address: to,
                amount,
            }),
        Command::Coins { address } => {
            let request = client.get(format!("{node}/coins"));
            match address {
                Some(address) => request.query(&[("address", address)]),
                None => request,
            }
        }
        Command::Peers => client.get(format!("{node}/peers")),
        Command::AddPeer { address } => client
            .post(format!("{node}/peers"))
            .json(&PeerIn { address }),
    };

    debug!(?request, "sending");
    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
