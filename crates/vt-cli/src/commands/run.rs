//! The live engine: consumes state-change events from stdin and drives the
//! scheduled checkpoint and rollover.
//!
//! Runs on a current-thread tokio runtime: event handling and scheduled-job
//! bodies all execute on one logical execution context, so in-memory store
//! mutations between await points are effectively atomic. The rollover's
//! ranking read and period reset happen back to back inside one job body with
//! no await between them.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use vt_core::{Accumulators, ContainerId, Ticker, VoiceEvent, apply_event, duration, run_rollover};
use vt_store::SnapshotStore;

use crate::Config;
use crate::commands::util::load_or_init_store;
use crate::roster::FileRoster;

/// The assembled engine state for one `vt run` invocation.
pub struct Engine {
    store: Accumulators,
    snapshot: SnapshotStore,
    roster: FileRoster,
    idle: Option<ContainerId>,
    checkpoint: Ticker,
    rollover: Ticker,
}

impl Engine {
    /// Builds the engine from configuration, loading or initializing state.
    pub fn new(config: &Config, now: DateTime<Utc>) -> Result<Self> {
        let snapshot = SnapshotStore::new(&config.snapshot_path);
        let store = load_or_init_store(&snapshot)?;
        let roster = FileRoster::load(&config.roster_path)?;

        Ok(Self {
            store,
            snapshot,
            roster,
            idle: config.idle_container_id(),
            checkpoint: Ticker::new(config.checkpoint_cadence()?, now),
            rollover: Ticker::new(config.rollover_cadence()?, now),
        })
    }

    /// Handles one event line. Malformed lines and state-machine errors are
    /// logged and dropped; nothing here may take the engine down.
    pub fn handle_line(&mut self, line: &str, now: DateTime<Utc>) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let event: VoiceEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "dropping malformed event line");
                return;
            }
        };
        if let Err(err) = apply_event(&mut self.store, &event, now, self.idle.as_ref()) {
            warn!(%err, "event applied with errors");
        }
    }

    /// Fires any due scheduled actions.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        // Rollover first when both are due, so the snapshot written by the
        // checkpoint reflects the fresh period.
        if self.rollover.fire_due(now) {
            self.run_rollover_now(now);
        }
        if self.checkpoint.fire_due(now) {
            self.checkpoint_and_save(now);
        }
    }

    /// When the next scheduled action is due.
    #[must_use]
    pub fn next_wake(&self) -> DateTime<Utc> {
        self.checkpoint.next_fire().min(self.rollover.next_fire())
    }

    /// Settles the store at shutdown so no in-flight time is lost.
    pub fn shutdown(&mut self, now: DateTime<Utc>) {
        self.checkpoint_and_save(now);
    }

    fn checkpoint_and_save(&mut self, now: DateTime<Utc>) {
        let cycled = self.store.checkpoint(now);
        // A failed save is logged, never retried; the in-memory store stays
        // authoritative and the next checkpoint will try again.
        match self.snapshot.save(&self.store) {
            Ok(()) => info!(cycled, "checkpoint saved"),
            Err(err) => warn!(%err, "checkpoint save failed"),
        }
    }

    fn run_rollover_now(&mut self, now: DateTime<Utc>) {
        let outcome = run_rollover(&mut self.store, &mut self.roster, now);
        if let Some(winner) = &outcome.winner {
            info!(
                winner = %winner.display_name,
                total = %duration::humanize(winner.total),
                leader_assigned = outcome.leader_assigned,
                "period rolled over"
            );
        }
        if let Err(err) = self.snapshot.save(&self.store) {
            warn!(%err, "post-rollover save failed");
        }
    }
}

/// Reads JSON-lines [`VoiceEvent`]s from stdin until EOF, ticking the
/// schedules in between.
pub async fn run(config: &Config) -> Result<()> {
    let mut engine = Engine::new(config, Utc::now())?;
    info!(
        snapshot = %config.snapshot_path.display(),
        next_checkpoint = %engine.checkpoint.next_fire(),
        next_rollover = %engine.rollover.next_fire(),
        "engine started"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        engine.tick(Utc::now());

        let sleep_for = (engine.next_wake() - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => engine.handle_line(&line, Utc::now()),
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "event source closed with error");
                    break;
                }
            },
            () = tokio::time::sleep(sleep_for) => {}
        }
    }

    engine.shutdown(Utc::now());
    info!("engine stopped");
    Ok(())
}

/// Synchronous entry point: builds the current-thread runtime and runs the
/// engine to completion.
pub fn run_blocking(config: &Config) -> Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?
        .block_on(run(config))
}
