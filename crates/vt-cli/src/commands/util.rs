//! Shared helpers for command implementations.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use vt_core::Accumulators;
use vt_store::SnapshotStore;

/// Loads the persisted store, or starts fresh when no snapshot exists.
///
/// A fresh start sets the lifetime accounting epoch to today. A present but
/// unreadable snapshot is an error; silently discarding history would be
/// worse than stopping.
pub fn load_or_init_store(snapshot: &SnapshotStore) -> Result<Accumulators> {
    match snapshot
        .load()
        .with_context(|| format!("failed to load snapshot {}", snapshot.path().display()))?
    {
        Some(store) => Ok(store),
        None => {
            let epoch = Utc::now().date_naive();
            info!(%epoch, "no snapshot found, starting fresh");
            Ok(Accumulators::new(epoch))
        }
    }
}

/// The user-visible rejection for an unknown activity-kind token.
pub const INVALID_KIND_MSG: &str =
    "Invalid type! Please choose from 'voice', 'muted', 'deafened', or 'streaming'.";

/// The user-visible rejection for an unknown window token.
pub const INVALID_WINDOW_MSG: &str = "Invalid window! Please choose 'lifetime' or 'current'.";
