//! Command-line surface (`spec.md` §6 CLI wiring), following the
//! `clap::Parser` derive + `env` fallback convention of
//! `TaceoLabs-oprf-service/oprf-service/src/config.rs`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cafe", about = "Operate a cafe client node: sessions, queue, inbox")]
pub struct Cli {
    /// Path to the node's YAML config file.
    #[clap(long, env = "CAFE_CONFIG", default_value = "cafe.yaml", global = true)]
    pub config: PathBuf,

    /// Path to this node's Ed25519 secret key, 32 raw bytes. Generated and
    /// written on first use if missing.
    #[clap(long, env = "CAFE_IDENTITY", default_value = "cafe.key", global = true)]
    pub identity: PathBuf,

    /// Override the config file's mailbox poll interval for this run, e.g.
    /// `30s` or `5min` (`spec.md` §4.4 `POLL_INTERVAL`).
    #[clap(long, env = "CAFE_POLL_INTERVAL", value_parser = humantime::parse_duration, global = true)]
    pub poll_interval: Option<Duration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register with a cafe at `url`, storing the resulting session.
    Add {
        url: String,
        #[clap(long)]
        token: String,
    },
    /// List cafes this node holds an active session with.
    Ls,
    /// Show the stored session for one cafe.
    Get { cafe_id: String },
    /// Deregister from a cafe and delete its local session.
    Rm { cafe_id: String },
    /// Poll every known cafe's mailbox right now (`Inbox.CheckNow`).
    Messages,
    #[command(subcommand)]
    Queue(QueueCommand),
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// Drain the request queue once and exit (`spec.md` §4.3 `Flush`).
    Flush,
    /// Run the request queue and inbox poller until interrupted
    /// (`spec.md` §4.3 `Run`).
    Run,
}
