//! Checkpoint command: settle open intervals and write a snapshot.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;

use vt_core::Accumulators;
use vt_store::SnapshotStore;

pub fn run<W: Write>(
    writer: &mut W,
    store: &mut Accumulators,
    snapshot: &SnapshotStore,
) -> Result<()> {
    let cycled = store.checkpoint(Utc::now());
    snapshot
        .save(store)
        .with_context(|| format!("failed to write snapshot {}", snapshot.path().display()))?;
    writeln!(
        writer,
        "Snapshot written to {} ({cycled} open interval(s) settled).",
        snapshot.path().display()
    )?;
    Ok(())
}
