//! Ranking query: participants ordered by accumulated time for one kind.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;

use vt_core::{Accumulators, ActivityKind, Roster, Window, duration, rank_query};

use super::util::{INVALID_KIND_MSG, INVALID_WINDOW_MSG};

pub fn run<W: Write>(
    writer: &mut W,
    store: &Accumulators,
    roster: &impl Roster,
    kind: &str,
    window: &str,
) -> Result<()> {
    let Ok(kind) = kind.parse::<ActivityKind>() else {
        writeln!(writer, "{INVALID_KIND_MSG}")?;
        return Ok(());
    };
    let Ok(window) = window.parse::<Window>() else {
        writeln!(writer, "{INVALID_WINDOW_MSG}")?;
        return Ok(());
    };

    let Some(entries) = rank_query(store, kind, window, Utc::now(), roster) else {
        writeln!(writer, "No data found for {kind}.")?;
        return Ok(());
    };

    writeln!(writer, "Most {kind} time spent:")?;
    for entry in entries {
        writeln!(
            writer,
            "{}: {}",
            entry.display_name,
            duration::humanize(entry.total)
        )?;
    }

    Ok(())
}
