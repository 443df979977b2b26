//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Voice presence time tracker.
///
/// Accumulates per-participant time spent in voice, muted, deafened, and
/// streaming, persists the totals, and crowns a period leader at rollover.
#[derive(Debug, Parser)]
#[command(name = "vt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the live engine: read state-change events from stdin and drive the
    /// checkpoint and rollover schedules.
    Run,

    /// Show accumulated time for one participant, per activity kind.
    Query {
        /// The participant ID to look up.
        participant: String,

        /// Accounting window: lifetime or current.
        #[arg(long, default_value = "lifetime")]
        window: String,
    },

    /// Rank participants by accumulated time for one activity kind.
    Rank {
        /// Activity kind: voice, muted, deafened, or streaming.
        #[arg(default_value = "voice")]
        kind: String,

        /// Accounting window: lifetime or current.
        #[arg(long, default_value = "current")]
        window: String,
    },

    /// Force a period-end rollover now.
    Rollover,

    /// Checkpoint open intervals and write a snapshot now.
    Checkpoint,

    /// Show snapshot location and tracking counts.
    Status,
}
