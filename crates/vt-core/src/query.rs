//! The query engine: point queries for one participant and ranking queries
//! across all participants for one kind.
//!
//! Both queries apply the open-interval-inclusive rule: the reported total is
//! the settled sum plus, when an interval is live, the time accrued since its
//! start. The settled sums never contain open time, so nothing double counts.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::store::Accumulators;
use crate::types::{AccumKey, ActivityKind, ParticipantId, Window};

/// Errors from roster side effects (role grant/revoke).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// The roster could not apply the mutation.
    #[error("roster operation failed for {participant}: {message}")]
    OperationFailed {
        participant: String,
        message: String,
    },
}

/// The collaborator directory and role-assignment boundary.
///
/// Ranking uses `display_name` for resolvability filtering; the rollover uses
/// the leader operations. Implementations live outside the engine (in the
/// real system this is the session platform's member/role API).
pub trait Roster {
    /// Resolves a participant to a display name, or `None` when the
    /// participant is no longer known to the roster.
    fn display_name(&self, participant: &ParticipantId) -> Option<String>;

    /// Every participant currently holding the leader designation.
    fn leader_holders(&self) -> Vec<ParticipantId>;

    /// Grants the leader designation.
    fn grant_leader(&mut self, participant: &ParticipantId) -> Result<(), RosterError>;

    /// Revokes the leader designation.
    fn revoke_leader(&mut self, participant: &ParticipantId) -> Result<(), RosterError>;
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub participant: ParticipantId,
    pub display_name: String,
    pub total: Duration,
}

/// Totals for one participant across all four kinds in one window.
///
/// Every kind is present, zero when nothing was ever recorded, so command
/// output always shows the full picture.
#[must_use]
pub fn point_query(
    store: &Accumulators,
    participant: &ParticipantId,
    window: Window,
    now: DateTime<Utc>,
) -> BTreeMap<ActivityKind, Duration> {
    ActivityKind::ALL
        .into_iter()
        .map(|kind| {
            let key = AccumKey::new(participant.clone(), kind);
            (kind, store.total(&key, window, now))
        })
        .collect()
}

/// Ranks all roster-resolvable participants by total time for `kind` in
/// `window`, strictly descending.
///
/// Returns `None` when no accumulator exists for the kind at all, so callers
/// can tell "nothing ever tracked" apart from "tracked but nobody currently
/// resolvable". Unresolvable participants are dropped silently. Exactly equal
/// totals have no guaranteed relative order.
#[must_use]
pub fn rank_query(
    store: &Accumulators,
    kind: ActivityKind,
    window: Window,
    now: DateTime<Utc>,
    roster: &impl Roster,
) -> Option<Vec<RankEntry>> {
    if !store.has_kind(kind) {
        return None;
    }

    let mut entries: Vec<RankEntry> = store
        .keys_for_kind(kind)
        .filter_map(|key| {
            let display_name = roster.display_name(&key.participant)?;
            Some(RankEntry {
                participant: key.participant.clone(),
                display_name,
                total: store.total(key, window, now),
            })
        })
        .collect();

    entries.sort_by(|a, b| b.total.cmp(&a.total));
    Some(entries)
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeRoster;
    use super::*;

    fn participant(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        "2025-06-02T09:00:00Z".parse().unwrap()
    }

    fn store_with_closed(entries: &[(&str, ActivityKind, i64)]) -> Accumulators {
        let mut store = Accumulators::new(t0().date_naive());
        for (id, kind, secs) in entries {
            let key = AccumKey::new(participant(id), *kind);
            store.open_interval(key.clone(), t0());
            store.close_interval(&key, t0() + Duration::seconds(*secs));
        }
        store
    }

    #[test]
    fn point_query_reports_all_kinds() {
        let store = store_with_closed(&[("a", ActivityKind::Voice, 100)]);
        let totals = point_query(&store, &participant("a"), Window::Lifetime, t0());

        assert_eq!(totals.len(), 4);
        assert_eq!(totals[&ActivityKind::Voice], Duration::seconds(100));
        assert_eq!(totals[&ActivityKind::Muted], Duration::zero());
    }

    #[test]
    fn point_query_includes_open_interval() {
        let mut store = Accumulators::new(t0().date_naive());
        let key = AccumKey::new(participant("a"), ActivityKind::Voice);
        store.open_interval(key.clone(), t0());
        store.close_interval(&key, t0() + Duration::seconds(100));
        store.open_interval(key, t0() + Duration::seconds(200));

        let totals = point_query(
            &store,
            &participant("a"),
            Window::Lifetime,
            t0() + Duration::seconds(230),
        );
        assert_eq!(totals[&ActivityKind::Voice], Duration::seconds(130));
    }

    #[test]
    fn rank_query_orders_descending() {
        let store = store_with_closed(&[
            ("a", ActivityKind::Voice, 1_800),
            ("b", ActivityKind::Voice, 3_600),
        ]);
        let roster = FakeRoster::with_members(&[("a", "Alice"), ("b", "Bert")]);

        let entries = rank_query(&store, ActivityKind::Voice, Window::CurrentPeriod, t0(), &roster)
            .expect("kind has accumulators");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].display_name, "Bert");
        assert_eq!(entries[0].total, Duration::seconds(3_600));
        assert_eq!(entries[1].display_name, "Alice");
        assert_eq!(entries[1].total, Duration::seconds(1_800));
    }

    #[test]
    fn rank_query_drops_unresolvable_participants() {
        let store = store_with_closed(&[
            ("a", ActivityKind::Voice, 500),
            ("ghost", ActivityKind::Voice, 900),
        ]);
        let roster = FakeRoster::with_members(&[("a", "Alice")]);

        let entries =
            rank_query(&store, ActivityKind::Voice, Window::Lifetime, t0(), &roster).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].participant, participant("a"));
    }

    #[test]
    fn rank_query_none_when_kind_never_tracked() {
        let store = store_with_closed(&[("a", ActivityKind::Voice, 500)]);
        let roster = FakeRoster::with_members(&[("a", "Alice")]);

        assert!(
            rank_query(&store, ActivityKind::Streaming, Window::Lifetime, t0(), &roster).is_none()
        );
    }

    #[test]
    fn rank_query_counts_open_intervals() {
        let mut store = Accumulators::new(t0().date_naive());
        let key = AccumKey::new(participant("a"), ActivityKind::Streaming);
        store.open_interval(key, t0());
        let roster = FakeRoster::with_members(&[("a", "Alice")]);

        let entries = rank_query(
            &store,
            ActivityKind::Streaming,
            Window::CurrentPeriod,
            t0() + Duration::seconds(75),
            &roster,
        )
        .unwrap();

        assert_eq!(entries[0].total, Duration::seconds(75));
    }
}
