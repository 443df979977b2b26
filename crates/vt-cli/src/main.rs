use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vt_cli::commands::{checkpoint, query, rank, rollover, run, status, util};
use vt_cli::roster::FileRoster;
use vt_cli::{Cli, Commands, Config};
use vt_store::SnapshotStore;

/// Load config and open the persisted store plus roster.
fn open_state(config_path: Option<&Path>) -> Result<(vt_core::Accumulators, FileRoster, SnapshotStore, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let snapshot = SnapshotStore::new(&config.snapshot_path);
    let store = util::load_or_init_store(&snapshot)?;
    let roster = FileRoster::load(&config.roster_path)?;
    Ok((store, roster, snapshot, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Run) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            run::run_blocking(&config)?;
        }
        Some(Commands::Query {
            participant,
            window,
        }) => {
            let (store, roster, _snapshot, _config) = open_state(cli.config.as_deref())?;
            query::run(&mut stdout, &store, &roster, participant, window)?;
        }
        Some(Commands::Rank { kind, window }) => {
            let (store, roster, _snapshot, _config) = open_state(cli.config.as_deref())?;
            rank::run(&mut stdout, &store, &roster, kind, window)?;
        }
        Some(Commands::Rollover) => {
            let (mut store, mut roster, snapshot, _config) = open_state(cli.config.as_deref())?;
            rollover::run(&mut stdout, &mut store, &mut roster, &snapshot)?;
        }
        Some(Commands::Checkpoint) => {
            let (mut store, _roster, snapshot, _config) = open_state(cli.config.as_deref())?;
            checkpoint::run(&mut stdout, &mut store, &snapshot)?;
        }
        Some(Commands::Status) => {
            let (store, roster, _snapshot, config) = open_state(cli.config.as_deref())?;
            status::run(&mut stdout, &config, &store, &roster)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
