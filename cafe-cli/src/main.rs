//! `cafe`: operator CLI for the cafe client subsystem (`spec.md` §6).
//!
//! Exit codes: `0` success, `1` local error, `2` network error,
//! `3` unauthorized — derived from [`cafe_client::error::RpcError::kind`].

mod cli;
mod collaborators;
mod commands;
mod error;
mod node;
mod transport;

use clap::Parser;

use cli::{Cli, Command, QueueCommand};
use node::Node;

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let node = match Node::build(&cli.config, &cli.identity, cli.poll_interval).await {
        Ok(node) => node,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Add { url, token } => commands::add(&node, url, token).await,
        Command::Ls => commands::ls(&node).await,
        Command::Get { cafe_id } => commands::get(&node, cafe_id).await,
        Command::Rm { cafe_id } => commands::rm(&node, cafe_id).await,
        Command::Messages => commands::messages(&node).await,
        Command::Queue(QueueCommand::Flush) => commands::flush(&node).await,
        Command::Queue(QueueCommand::Run) => commands::run(&node).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}
