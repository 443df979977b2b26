//! Point query: accumulated time for one participant, per activity kind.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;

use vt_core::{Accumulators, ActivityKind, ParticipantId, Roster, Window, duration, point_query};

use super::util::INVALID_WINDOW_MSG;

/// Per-kind phrasing for the summary lines.
const fn phrase(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Voice => "in voice channels",
        ActivityKind::Muted => "muted",
        ActivityKind::Deafened => "deafened",
        ActivityKind::Streaming => "streaming",
    }
}

pub fn run<W: Write>(
    writer: &mut W,
    store: &Accumulators,
    roster: &impl Roster,
    participant: &str,
    window: &str,
) -> Result<()> {
    let Ok(window) = window.parse::<Window>() else {
        writeln!(writer, "{INVALID_WINDOW_MSG}")?;
        return Ok(());
    };
    let participant = match ParticipantId::new(participant) {
        Ok(id) => id,
        Err(err) => {
            writeln!(writer, "{err}")?;
            return Ok(());
        }
    };

    let name = roster
        .display_name(&participant)
        .unwrap_or_else(|| participant.to_string());

    let totals = point_query(store, &participant, window, Utc::now());
    for (kind, total) in &totals {
        writeln!(
            writer,
            "{name} has spent {} {}.",
            duration::humanize(*total),
            phrase(*kind)
        )?;
    }

    Ok(())
}
