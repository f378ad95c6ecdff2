use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;
mod utils;

use commands::daemon::DaemonArgs;
use commands::interest::InterestArgs;
use commands::management::{CsCommand, FacesCommand, FibCommand, RibCommand, StrategyCommand};

/// µDCN Command Line Interface: runs the forwarder daemon or talks to one
/// over its management protocol.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(flatten)]
    remote: Remote,

    #[clap(subcommand)]
    command: Commands,
}

/// Connection options shared by every client-side subcommand.
#[derive(Args, Clone)]
pub struct Remote {
    /// Address of the running udcnd to talk to.
    #[clap(long, global = true, default_value = "127.0.0.1:6367")]
    pub remote: String,

    /// TLS server name to present during the QUIC handshake.
    #[clap(long, global = true, default_value = "localhost")]
    pub server_name: String,

    /// Skip TLS certificate verification (dev/self-signed deployments only).
    #[clap(long, global = true)]
    pub insecure: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the forwarder daemon.
    Daemon(DaemonArgs),

    /// Manage the forwarding table (FIB).
    Fib {
        #[clap(subcommand)]
        cmd: FibCommand,
    },

    /// Manage the routing table (RIB).
    Rib {
        #[clap(subcommand)]
        cmd: RibCommand,
    },

    /// Manage per-prefix forwarding strategies.
    Strategy {
        #[clap(subcommand)]
        cmd: StrategyCommand,
    },

    /// Manage faces.
    Faces {
        #[clap(subcommand)]
        cmd: FacesCommand,
    },

    /// Inspect or configure the content store.
    Cs {
        #[clap(subcommand)]
        cmd: CsCommand,
    },

    /// Print general forwarder status.
    Status,

    /// Send an Interest and print the satisfying Data.
    Interest(InterestArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Commands::Daemon(args) => commands::daemon::run(args).await?,
        Commands::Fib { cmd } => commands::management::fib(&cli.remote, cmd).await?,
        Commands::Rib { cmd } => commands::management::rib(&cli.remote, cmd).await?,
        Commands::Strategy { cmd } => commands::management::strategy(&cli.remote, cmd).await?,
        Commands::Faces { cmd } => commands::management::faces(&cli.remote, cmd).await?,
        Commands::Cs { cmd } => commands::management::cs(&cli.remote, cmd).await?,
        Commands::Status => commands::management::status(&cli.remote).await?,
        Commands::Interest(args) => commands::interest::run(&cli.remote, args).await?,
    }

    Ok(())
}
