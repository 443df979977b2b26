//! Snapshot persistence for the voice presence tracker.
//!
//! The durable representation is a single JSON document at a well-known path,
//! fully overwritten on every save:
//!
//! ```json
//! {
//!   "lifetime": { "1157:voice": "0:02:15:09" },
//!   "currentPeriod": { "1157:voice": "0:00:41:30" },
//!   "startEpoch": "2025-06-02"
//! }
//! ```
//!
//! Map keys are `<participant>:<kind>` strings, values use the duration
//! codec's `days:hours:minutes:seconds` encoding, and `startEpoch` is the
//! date lifetime accounting began.
//!
//! Open intervals are never persisted. A caller that wants live time included
//! checkpoints the store first; `save` itself only writes settled sums, so a
//! snapshot always reads as "all activity settled as of checkpoint time".

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use vt_core::types::AccumKey;
use vt_core::{Accumulators, duration};

/// Date format for the `startEpoch` field.
const EPOCH_FORMAT: &str = "%Y-%m-%d";

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot document was not valid JSON of the expected shape.
    #[error("malformed snapshot document: {0}")]
    Json(#[from] serde_json::Error),

    /// A map key was not a valid accumulator key.
    #[error("invalid accumulator key in snapshot: {0}")]
    InvalidKey(#[from] vt_core::ValidationError),

    /// A duration value failed to decode.
    #[error("invalid duration for key {key}: {source}")]
    InvalidDuration {
        key: String,
        #[source]
        source: duration::DurationParseError,
    },

    /// The `startEpoch` field was not a `YYYY-MM-DD` date.
    #[error("invalid start epoch {value:?}")]
    InvalidEpoch { value: String },
}

/// The durable document shape.
///
/// `BTreeMap` keeps the serialized key order stable so successive saves of
/// identical state are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub lifetime: BTreeMap<String, String>,
    pub current_period: BTreeMap<String, String>,
    pub start_epoch: String,
}

impl PersistedSnapshot {
    /// Encodes the settled sums of a store.
    #[must_use]
    pub fn from_store(store: &Accumulators) -> Self {
        Self {
            lifetime: encode_sums(store.lifetime_sums()),
            current_period: encode_sums(store.current_period_sums()),
            start_epoch: store.start_epoch().format(EPOCH_FORMAT).to_string(),
        }
    }

    /// Decodes back into a store with no open intervals.
    pub fn into_store(self) -> Result<Accumulators, StoreError> {
        let start_epoch = NaiveDate::parse_from_str(&self.start_epoch, EPOCH_FORMAT)
            .map_err(|_| StoreError::InvalidEpoch {
                value: self.start_epoch.clone(),
            })?;
        let lifetime = decode_sums(&self.lifetime)?;
        let current_period = decode_sums(&self.current_period)?;
        Ok(Accumulators::from_parts(start_epoch, lifetime, current_period))
    }
}

fn encode_sums(sums: &HashMap<AccumKey, Duration>) -> BTreeMap<String, String> {
    sums.iter()
        .map(|(key, total)| (key.to_string(), duration::encode(*total)))
        .collect()
}

fn decode_sums(sums: &BTreeMap<String, String>) -> Result<HashMap<AccumKey, Duration>, StoreError> {
    sums.iter()
        .map(|(key_text, duration_text)| {
            let key: AccumKey = key_text.parse()?;
            let total =
                duration::decode(duration_text).map_err(|source| StoreError::InvalidDuration {
                    key: key_text.clone(),
                    source,
                })?;
            Ok((key, total))
        })
        .collect()
}

/// Reads and writes the snapshot document at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the store's settled sums, replacing any previous snapshot.
    ///
    /// The document is written to a sibling temp file and renamed into place,
    /// so a crash mid-write leaves the previous snapshot intact. Failures
    /// leave the in-memory store untouched and authoritative.
    pub fn save(&self, store: &Accumulators) -> Result<(), StoreError> {
        let snapshot = PersistedSnapshot::from_store(store);
        let body = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &body).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), keys = snapshot.lifetime.len(), "snapshot written");
        Ok(())
    }

    /// Loads the snapshot, or `Ok(None)` when no snapshot exists yet.
    ///
    /// The caller starts fresh in that case, with the start epoch set to the
    /// current date.
    pub fn load(&self) -> Result<Option<Accumulators>, StoreError> {
        let body = match fs::read(&self.path) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let snapshot: PersistedSnapshot = serde_json::from_slice(&body)?;
        Ok(Some(snapshot.into_store()?))
    }
}
