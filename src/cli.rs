use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nfs-check", about = "Reachability and export checks for NFS servers")]
pub struct Cli {
    /// Print the full check report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the highest NFS version the server advertises (0 if none)
    Version {
        /// Server hostname or IP address
        server: String,
    },
    /// Print the requested shares the server does not export
    Share {
        /// Server hostname or IP address
        server: String,
        /// Comma-separated export paths (e.g. "/srv/a,/srv/b")
        shares: String,
    },
}

impl Command {
    pub fn server(&self) -> &str {
        match self {
            Command::Version { server } | Command::Share { server, .. } => server,
        }
    }
}
