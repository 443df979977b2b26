//! Status command: snapshot location, epoch, and tracking counts.

use std::io::Write;

use anyhow::Result;

use vt_core::Accumulators;

use crate::Config;
use crate::roster::FileRoster;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    store: &Accumulators,
    roster: &FileRoster,
) -> Result<()> {
    writeln!(writer, "Voice tracker status")?;
    writeln!(writer, "Snapshot: {}", config.snapshot_path.display())?;
    writeln!(writer, "Start epoch: {}", store.start_epoch())?;
    writeln!(writer, "Tracked keys: {}", store.key_count())?;
    writeln!(writer, "Open intervals: {}", store.open_count())?;
    writeln!(
        writer,
        "Roster: {} ({} member(s))",
        roster.path().display(),
        roster.len()
    )?;
    Ok(())
}
