//! Core domain logic for the voice presence tracker.
//!
//! This crate contains the engine that turns voice state-change events into
//! accumulated per-participant activity time:
//! - Duration codec: the `days:hours:minutes:seconds` snapshot encoding
//! - Accumulator store: open intervals plus lifetime/current-period sums
//! - Activity state machine: event application with idle-container policy
//! - Query engine: point and ranking queries over the store
//! - Rollover: the period-end leader selection and reset protocol

pub mod duration;
pub mod event;
pub mod machine;
pub mod query;
pub mod rollover;
pub mod store;
pub mod types;

pub use event::{VoiceEvent, VoiceState};
pub use machine::{MachineError, apply_event};
pub use query::{RankEntry, Roster, RosterError, point_query, rank_query};
pub use rollover::{Cadence, RolloverOutcome, Ticker, run_rollover};
pub use store::Accumulators;
pub use types::{AccumKey, ActivityKind, ContainerId, ParticipantId, ValidationError, Window};
