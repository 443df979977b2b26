//! Period rollover: the ranking read, the leader reassignment, and the
//! current-period reset, plus the ticker that schedules it.
//!
//! # Ordering
//!
//! The ranking read happens strictly before the reset, with no suspension
//! point between them, so a rollover either sees the full pre-reset totals or
//! none at all. A role-assignment failure is logged and must not stop the
//! reset; the new period always starts clean.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use tracing::{info, warn};

use crate::query::{RankEntry, Roster, rank_query};
use crate::store::Accumulators;
use crate::types::{ActivityKind, Window};

/// How often and when a scheduled action fires, in UTC.
///
/// An explicit internal abstraction rather than a cron binding: callers ask
/// for the next fire time and drive the waiting themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every day at the given time.
    Daily { at: NaiveTime },
    /// Every week on the given weekday at the given time.
    Weekly { weekday: Weekday, at: NaiveTime },
}

impl Cadence {
    /// The first fire time strictly after `after`.
    #[must_use]
    pub fn next_fire(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Self::Daily { at } => {
                let candidate = after.date_naive().and_time(at).and_utc();
                if candidate > after {
                    candidate
                } else {
                    candidate + Duration::days(1)
                }
            }
            Self::Weekly { weekday, at } => {
                let days_ahead = i64::from(
                    (weekday.num_days_from_monday() + 7
                        - after.date_naive().weekday().num_days_from_monday())
                        % 7,
                );
                let candidate = (after.date_naive() + Duration::days(days_ahead))
                    .and_time(at)
                    .and_utc();
                if candidate > after {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
        }
    }
}

/// Tracks the next pending fire time for one scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    cadence: Cadence,
    next: DateTime<Utc>,
}

impl Ticker {
    /// Creates a ticker whose first fire is the next cadence point after `now`.
    #[must_use]
    pub fn new(cadence: Cadence, now: DateTime<Utc>) -> Self {
        Self {
            cadence,
            next: cadence.next_fire(now),
        }
    }

    /// When the ticker will next fire.
    #[must_use]
    pub const fn next_fire(&self) -> DateTime<Utc> {
        self.next
    }

    /// Consumes a due fire: returns `true` and advances to the following
    /// cadence point when `now` has reached the pending fire time.
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.next {
            return false;
        }
        self.next = self.cadence.next_fire(now);
        true
    }
}

/// What a rollover did, for announcement by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloverOutcome {
    /// The period's top voice participant, if the ranking was non-empty.
    pub winner: Option<RankEntry>,
    /// Whether the leader designation ended up on the winner.
    pub leader_assigned: bool,
}

/// Runs a period-end rollover at `now`.
///
/// Checkpoints so open intervals count toward the closing period, ranks voice
/// time for the current period, moves the leader designation to the top
/// participant, and resets every current-period sum. The reset is
/// unconditional: it runs even when the ranking is empty and even when a
/// roster mutation fails.
pub fn run_rollover(
    store: &mut Accumulators,
    roster: &mut impl Roster,
    now: DateTime<Utc>,
) -> RolloverOutcome {
    store.checkpoint(now);

    let ranking = rank_query(store, ActivityKind::Voice, Window::CurrentPeriod, now, &*roster);
    let winner = ranking.and_then(|entries| entries.into_iter().next());

    let mut leader_assigned = false;
    if let Some(winner) = &winner {
        for holder in roster.leader_holders() {
            if let Err(err) = roster.revoke_leader(&holder) {
                warn!(%holder, %err, "failed to revoke leader designation");
            }
        }
        match roster.grant_leader(&winner.participant) {
            Ok(()) => {
                leader_assigned = true;
                info!(
                    winner = %winner.display_name,
                    total = %crate::duration::encode(winner.total),
                    "period leader assigned"
                );
            }
            Err(err) => {
                warn!(winner = %winner.display_name, %err, "failed to grant leader designation");
            }
        }
    } else {
        info!("rollover found no ranked participants this period");
    }

    store.reset_current_period();

    RolloverOutcome {
        winner,
        leader_assigned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::query::test_support::FakeRoster;
    use crate::types::{AccumKey, ParticipantId};

    fn t0() -> DateTime<Utc> {
        // A Monday.
        "2025-06-02T10:30:00Z".parse().unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn daily_cadence_fires_later_today_or_tomorrow() {
        let cadence = Cadence::Daily { at: at(14, 0) };
        assert_eq!(
            cadence.next_fire(t0()),
            "2025-06-02T14:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );

        let cadence = Cadence::Daily { at: at(4, 0) };
        assert_eq!(
            cadence.next_fire(t0()),
            "2025-06-03T04:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn weekly_cadence_skips_to_next_week_when_past() {
        let cadence = Cadence::Weekly {
            weekday: Weekday::Mon,
            at: at(0, 0),
        };
        // t0 is Monday 10:30, so midnight Monday already passed.
        assert_eq!(
            cadence.next_fire(t0()),
            "2025-06-09T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );

        let cadence = Cadence::Weekly {
            weekday: Weekday::Fri,
            at: at(18, 0),
        };
        assert_eq!(
            cadence.next_fire(t0()),
            "2025-06-06T18:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn ticker_fires_once_per_cadence_point() {
        let mut ticker = Ticker::new(Cadence::Daily { at: at(12, 0) }, t0());
        assert!(!ticker.fire_due(t0() + Duration::minutes(30)));
        assert!(ticker.fire_due(t0() + Duration::hours(2)));
        // Already consumed; next fire is tomorrow noon.
        assert!(!ticker.fire_due(t0() + Duration::hours(3)));
        assert_eq!(
            ticker.next_fire(),
            "2025-06-03T12:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    fn store_with_voice(entries: &[(&str, i64)]) -> Accumulators {
        let mut store = Accumulators::new(t0().date_naive());
        for (id, secs) in entries {
            let key = AccumKey::new(
                ParticipantId::new(*id).unwrap(),
                ActivityKind::Voice,
            );
            store.open_interval(key.clone(), t0());
            store.close_interval(&key, t0() + Duration::seconds(*secs));
        }
        store
    }

    #[test]
    fn rollover_crowns_top_participant_and_resets() {
        let mut store = store_with_voice(&[("a", 3_600), ("b", 1_800)]);
        let mut roster = FakeRoster::with_members(&[("a", "Alice"), ("b", "Bert")]);
        roster.leaders = vec![ParticipantId::new("b").unwrap()];

        let outcome = run_rollover(&mut store, &mut roster, t0() + Duration::hours(2));

        let winner = outcome.winner.unwrap();
        assert_eq!(winner.display_name, "Alice");
        assert_eq!(winner.total, Duration::seconds(3_600));
        assert!(outcome.leader_assigned);
        assert_eq!(roster.leaders, vec![ParticipantId::new("a").unwrap()]);

        // Both entries read back as zero for the new period.
        for id in ["a", "b"] {
            let key = AccumKey::new(ParticipantId::new(id).unwrap(), ActivityKind::Voice);
            assert_eq!(store.sum(&key, Window::CurrentPeriod), Duration::zero());
        }
        // Lifetime survives.
        let key = AccumKey::new(ParticipantId::new("a").unwrap(), ActivityKind::Voice);
        assert_eq!(store.sum(&key, Window::Lifetime), Duration::seconds(3_600));
    }

    #[test]
    fn rollover_includes_open_intervals_via_checkpoint() {
        let mut store = Accumulators::new(t0().date_naive());
        let key = AccumKey::new(ParticipantId::new("a").unwrap(), ActivityKind::Voice);
        store.open_interval(key.clone(), t0());
        let mut roster = FakeRoster::with_members(&[("a", "Alice")]);

        let outcome = run_rollover(&mut store, &mut roster, t0() + Duration::seconds(500));

        assert_eq!(outcome.winner.unwrap().total, Duration::seconds(500));
        // Tracking continues into the new period.
        assert!(store.is_open(&key));
        assert_eq!(store.sum(&key, Window::CurrentPeriod), Duration::zero());
    }

    #[test]
    fn empty_rollover_resets_without_side_effects() {
        let mut store = Accumulators::new(t0().date_naive());
        let mut roster = FakeRoster::with_members(&[("a", "Alice")]);
        roster.leaders = vec![ParticipantId::new("a").unwrap()];

        let outcome = run_rollover(&mut store, &mut roster, t0());

        assert!(outcome.winner.is_none());
        assert!(!outcome.leader_assigned);
        // No revocation happened: the ranking was empty.
        assert_eq!(roster.leaders, vec![ParticipantId::new("a").unwrap()]);
    }

    #[test]
    fn role_failure_does_not_block_reset() {
        let mut store = store_with_voice(&[("a", 100)]);
        let mut roster = FakeRoster::with_members(&[("a", "Alice")]);
        roster.fail_mutations = Some("permission denied".to_string());

        let outcome = run_rollover(&mut store, &mut roster, t0() + Duration::hours(1));

        assert!(outcome.winner.is_some());
        assert!(!outcome.leader_assigned);
        let key = AccumKey::new(ParticipantId::new("a").unwrap(), ActivityKind::Voice);
        assert_eq!(store.sum(&key, Window::CurrentPeriod), Duration::zero());
    }
}
