//! CLI module for Lectern.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Lectern - ask grounded questions about recorded classes
///
/// Rooms collect transcribed audio and uploaded documents; questions asked in a
/// room are answered from that content.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List rooms
    Rooms,

    /// Create a room
    CreateRoom {
        /// Room name
        name: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,

        /// Make the room public
        #[arg(long)]
        public: bool,
    },

    /// Ask a question in a room and wait for the answer
    Ask {
        /// Room to ask in
        room_id: Uuid,

        /// The question to ask
        question: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Cli {
    /// Log level for the `-v` count; `default` applies without the flag.
    pub fn log_level<'a>(&self, default: &'a str) -> &'a str {
        match self.verbose {
            0 => default,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
