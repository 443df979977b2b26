//! The activity state machine: turns voice state-change events into interval
//! opens and closes on the accumulator store.
//!
//! Each event carries the participant's full before/after state, so one event
//! can affect all four activity kinds at once (leaving voice while muted must
//! settle the mute interval too).
//!
//! # Presence policy
//!
//! Presence time means "in a non-idle container". The idle (AFK) container
//! never accrues:
//!
//! - no container → non-idle container: open
//! - idle container → non-idle container: open (a resume, not a continuation)
//! - anywhere → no container or idle container: close, and settle the
//!   mute/deafen/stream intervals as if those flags dropped too
//! - non-idle → different non-idle container: the interval stays open at its
//!   original start. Closing and reopening here would drop the time between
//!   the original join and the switch, under-counting on every move.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::event::{VoiceEvent, VoiceState};
use crate::store::Accumulators;
use crate::types::{AccumKey, ActivityKind, ContainerId};

/// Errors surfaced by [`apply_event`].
///
/// The engine never lets these propagate past the handler boundary: the
/// caller logs them and drops the event, and the store is left in a
/// consistent state (a clamped close has already settled at zero elapsed).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// One or more intervals closed before they opened; each elapsed time was
    /// clamped to zero.
    #[error("clock went backwards while closing {kinds:?} intervals for {participant}")]
    ClockRegression {
        participant: String,
        kinds: Vec<ActivityKind>,
    },
}

/// True when the state places the participant in a container that accrues
/// presence time.
fn in_active_container(state: &VoiceState, idle: Option<&ContainerId>) -> bool {
    match &state.container {
        Some(container) => idle != Some(container),
        None => false,
    }
}

/// Applies one state-change event to the store at time `now`.
///
/// Idempotent against duplicate delivery: a flag already matching its
/// interval's open/closed status is a no-op.
pub fn apply_event(
    store: &mut Accumulators,
    event: &VoiceEvent,
    now: DateTime<Utc>,
    idle: Option<&ContainerId>,
) -> Result<(), MachineError> {
    let participant = &event.participant;
    let present_after = in_active_container(&event.after, idle);

    // Presence first, so a departure settles voice time before the dependent
    // flag close-outs below.
    let voice_key = AccumKey::new(participant.clone(), ActivityKind::Voice);
    let mut regressed: Vec<ActivityKind> = Vec::new();

    if present_after {
        // Covers fresh joins, resumes out of the idle container, and restarts
        // after a process crash. A switch between two non-idle containers
        // finds the interval already open and leaves its start untouched.
        if store.open_interval(voice_key.clone(), now) {
            debug!(participant = %participant, container = ?event.after.container, "voice interval opened");
        }
    } else if let Some(closed) = store.close_interval(&voice_key, now) {
        debug!(
            participant = %participant,
            elapsed = %crate::duration::encode(closed.elapsed),
            "voice interval closed"
        );
        if closed.clamped {
            regressed.push(ActivityKind::Voice);
        }
    }

    // Departing or entering the idle container drops the other flags: a
    // participant who leaves while muted must not keep accruing mute time.
    // The event's own after-state is left alone; we only derive effective
    // flags for the transition check.
    let flags_after: [(ActivityKind, bool); 3] = if present_after {
        [
            (ActivityKind::Muted, event.after.muted),
            (ActivityKind::Deafened, event.after.deafened),
            (ActivityKind::Streaming, event.after.streaming),
        ]
    } else {
        [
            (ActivityKind::Muted, false),
            (ActivityKind::Deafened, false),
            (ActivityKind::Streaming, false),
        ]
    };

    for (kind, flag) in flags_after {
        let key = AccumKey::new(participant.clone(), kind);
        if flag {
            if store.open_interval(key, now) {
                debug!(participant = %participant, %kind, "interval opened");
            }
        } else if let Some(closed) = store.close_interval(&key, now) {
            debug!(
                participant = %participant,
                %kind,
                elapsed = %crate::duration::encode(closed.elapsed),
                "interval closed"
            );
            if closed.clamped {
                regressed.push(kind);
            }
        }
    }

    if regressed.is_empty() {
        Ok(())
    } else {
        Err(MachineError::ClockRegression {
            participant: participant.to_string(),
            kinds: regressed,
        })
    }
}
