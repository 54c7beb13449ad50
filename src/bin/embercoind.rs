use std::sync::Arc;

use colored::*;

use embercoin::config::{NodeConfig, DEFAULT_DIFFICULTY, RPC_BIND_ADDRESS};
use embercoin::node::NodeState;
use embercoin::rpc::server::start_rpc_server;

fn banner() {
    println!();
    println!(
        "{}",
        "  ███████╗███╗   ███╗██████╗ ███████╗██████╗ ".bright_yellow()
    );
    println!(
        "{}",
        "  ██╔════╝████╗ ████║██╔══██╗██╔════╝██╔══██╗".bright_yellow()
    );
    println!(
        "{}",
        "  █████╗  ██╔████╔██║██████╔╝█████╗  ██████╔╝".yellow().bold()
    );
    println!(
        "{}",
        "  ██╔══╝  ██║╚██╔╝██║██╔══██╗██╔══╝  ██╔══██╗".yellow()
    );
    println!(
        "{}",
        "  ███████╗██║ ╚═╝ ██║██████╔╝███████╗██║  ██║".red()
    );
    println!(
        "{}",
        "  ╚══════╝╚═╝     ╚═╝╚═════╝ ╚══════╝╚═╝  ╚═╝".red()
    );
    println!();
    println!(
        "{}",
        "       toy proof-of-work ledger node         "
            .bright_green()
            .bold()
    );
    println!();
}

fn usage() {
    eprintln!("usage: embercoind [port] [node_id]");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    banner();

    let config = match NodeConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {err}", "[args]".bright_red().bold());
            usage();
            std::process::exit(2);
        }
    };

    println!(
        "{} node id: {}",
        "[init]".bright_blue().bold(),
        config.node_id
    );

    let state = Arc::new(NodeState::new(config.node_id.clone(), DEFAULT_DIFFICULTY)?);

    // Forge the genesis block before accepting any request, so every
    // route can assume a non-empty chain.
    let genesis = state.mine().await?;
    println!(
        "{} genesis block forged at difficulty {}",
        "[mine]".bright_magenta().bold(),
        genesis.difficulty
    );

    println!(
        "{} listening on {}:{}",
        "[rpc] ".bright_green().bold(),
        RPC_BIND_ADDRESS,
        config.port
    );
    println!();
    println!("  {} curl localhost:{}/chain", "❯".bright_black(), config.port);
    println!("  {} curl localhost:{}/mine", "❯".bright_black(), config.port);
    println!(
        "  {} curl -X POST localhost:{}/transactions/new -d '{{\"sender\":\"alice\",\"recipient\":\"bob\",\"amount\":0.25}}'",
        "❯".bright_black(),
        config.port
    );
    println!();

    start_rpc_server(state, config.port).await
}
