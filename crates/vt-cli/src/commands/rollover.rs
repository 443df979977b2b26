//! Rollover command: force a period-end rollover now.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;

use vt_core::{Accumulators, duration, run_rollover};
use vt_store::SnapshotStore;

use crate::roster::FileRoster;

pub fn run<W: Write>(
    writer: &mut W,
    store: &mut Accumulators,
    roster: &mut FileRoster,
    snapshot: &SnapshotStore,
) -> Result<()> {
    let outcome = run_rollover(store, roster, Utc::now());

    match &outcome.winner {
        Some(winner) => {
            writeln!(
                writer,
                "Leader this period: {} with {}.",
                winner.display_name,
                duration::humanize(winner.total)
            )?;
            if !outcome.leader_assigned {
                writeln!(
                    writer,
                    "Warning: leader designation could not be assigned (see logs)."
                )?;
            }
        }
        None => writeln!(writer, "No participants ranked this period.")?,
    }

    snapshot
        .save(store)
        .with_context(|| format!("failed to write snapshot {}", snapshot.path().display()))?;
    writeln!(writer, "Current period reset.")?;
    Ok(())
}
