//! The accumulator store: per-(participant, kind) open intervals and closed
//! duration sums.
//!
//! This is the single shared mutable resource in the engine. It is an owned
//! struct handed to every handler, never a process-wide global, so tests can
//! inject their own instance.
//!
//! # Invariants
//!
//! - At most one open interval per [`AccumKey`]; opening while open is a no-op.
//! - The closed sums only ever contain settled intervals. The "plus open
//!   interval" adjustment happens at read time in [`Accumulators::total`].
//! - Both sums are monotonically non-decreasing except for the bulk
//!   current-period reset at rollover.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::types::{AccumKey, ActivityKind, Window};

/// Result of closing an open interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedInterval {
    /// Elapsed time folded into the sums.
    pub elapsed: Duration,
    /// True when the close instant preceded the open instant and the elapsed
    /// time was clamped to zero instead of going negative.
    pub clamped: bool,
}

/// Open-interval state and accumulated sums for every tracked quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulators {
    start_epoch: NaiveDate,
    open: HashMap<AccumKey, DateTime<Utc>>,
    lifetime: HashMap<AccumKey, Duration>,
    current_period: HashMap<AccumKey, Duration>,
}

impl Accumulators {
    /// Creates an empty store whose lifetime accounting begins at `start_epoch`.
    #[must_use]
    pub fn new(start_epoch: NaiveDate) -> Self {
        Self {
            start_epoch,
            open: HashMap::new(),
            lifetime: HashMap::new(),
            current_period: HashMap::new(),
        }
    }

    /// Rebuilds a store from persisted sums. Open intervals are never
    /// persisted, so the rebuilt store has none.
    #[must_use]
    pub fn from_parts(
        start_epoch: NaiveDate,
        lifetime: HashMap<AccumKey, Duration>,
        current_period: HashMap<AccumKey, Duration>,
    ) -> Self {
        Self {
            start_epoch,
            open: HashMap::new(),
            lifetime,
            current_period,
        }
    }

    /// When lifetime accounting began.
    #[must_use]
    pub const fn start_epoch(&self) -> NaiveDate {
        self.start_epoch
    }

    /// Opens an interval for `key` at `now`.
    ///
    /// Returns `false` (no-op) when an interval is already open: duplicate
    /// "flag turned on" events must not restart the clock.
    pub fn open_interval(&mut self, key: AccumKey, now: DateTime<Utc>) -> bool {
        use std::collections::hash_map::Entry;
        match self.open.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Closes the open interval for `key` at `now`, folding the elapsed time
    /// into both the lifetime and current-period sums.
    ///
    /// Returns `None` (no-op) when no interval is open. A close instant before
    /// the open instant clamps to zero elapsed rather than decreasing a sum.
    pub fn close_interval(&mut self, key: &AccumKey, now: DateTime<Utc>) -> Option<ClosedInterval> {
        let start = self.open.remove(key)?;
        let raw = now.signed_duration_since(start);
        let clamped = raw < Duration::zero();
        let elapsed = if clamped { Duration::zero() } else { raw };

        *self.lifetime.entry(key.clone()).or_insert_with(Duration::zero) += elapsed;
        *self
            .current_period
            .entry(key.clone())
            .or_insert_with(Duration::zero) += elapsed;

        Some(ClosedInterval { elapsed, clamped })
    }

    /// Whether `key` currently has an open interval.
    #[must_use]
    pub fn is_open(&self, key: &AccumKey) -> bool {
        self.open.contains_key(key)
    }

    /// Settles every open interval at `now` and immediately reopens it.
    ///
    /// Net change to accounted-plus-accruing time is zero; afterwards the sums
    /// alone describe all activity up to `now`, which is what the snapshot
    /// writer needs. Returns the number of intervals cycled.
    pub fn checkpoint(&mut self, now: DateTime<Utc>) -> usize {
        let keys: Vec<AccumKey> = self.open.keys().cloned().collect();
        for key in &keys {
            self.close_interval(key, now);
            self.open.insert(key.clone(), now);
        }
        keys.len()
    }

    /// Clears every current-period sum. Lifetime sums and open intervals are
    /// untouched; an interval spanning the rollover accrues into the new
    /// period from its original start only via the checkpoint that precedes
    /// the reset.
    pub fn reset_current_period(&mut self) {
        self.current_period.clear();
    }

    /// Total accrued time for `key` in `window`: the closed sum plus, when an
    /// interval is open, the time accrued since its start.
    #[must_use]
    pub fn total(&self, key: &AccumKey, window: Window, now: DateTime<Utc>) -> Duration {
        let closed = self.sum(key, window);
        match self.open.get(key) {
            Some(&start) if now > start => closed + (now - start),
            _ => closed,
        }
    }

    /// The settled (closed-intervals-only) sum for `key` in `window`.
    #[must_use]
    pub fn sum(&self, key: &AccumKey, window: Window) -> Duration {
        let map = match window {
            Window::Lifetime => &self.lifetime,
            Window::CurrentPeriod => &self.current_period,
        };
        map.get(key).copied().unwrap_or_else(Duration::zero)
    }

    /// Whether any accumulator (sum or open interval) exists for `kind`.
    #[must_use]
    pub fn has_kind(&self, kind: ActivityKind) -> bool {
        self.keys_for_kind(kind).next().is_some()
    }

    /// All keys for `kind` with any sum or open interval, deduplicated.
    pub fn keys_for_kind(&self, kind: ActivityKind) -> impl Iterator<Item = &AccumKey> {
        let mut seen = std::collections::HashSet::new();
        self.lifetime
            .keys()
            .chain(self.current_period.keys())
            .chain(self.open.keys())
            .filter(move |key| key.kind == kind && seen.insert(*key))
    }

    /// The settled lifetime sums, for serialization.
    #[must_use]
    pub const fn lifetime_sums(&self) -> &HashMap<AccumKey, Duration> {
        &self.lifetime
    }

    /// The settled current-period sums, for serialization.
    #[must_use]
    pub const fn current_period_sums(&self) -> &HashMap<AccumKey, Duration> {
        &self.current_period
    }

    /// Number of distinct tracked keys across both sums and open intervals.
    #[must_use]
    pub fn key_count(&self) -> usize {
        let mut keys: std::collections::HashSet<&AccumKey> = self.lifetime.keys().collect();
        keys.extend(self.current_period.keys());
        keys.extend(self.open.keys());
        keys.len()
    }

    /// Number of currently open intervals.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::types::ParticipantId;

    fn key(participant: &str, kind: ActivityKind) -> AccumKey {
        AccumKey::new(ParticipantId::new(participant).unwrap(), kind)
    }

    fn t0() -> DateTime<Utc> {
        "2025-06-02T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn close_folds_into_both_windows() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Voice);

        assert!(store.open_interval(k.clone(), t0()));
        let closed = store
            .close_interval(&k, t0() + Duration::seconds(90))
            .unwrap();
        assert_eq!(closed.elapsed, Duration::seconds(90));
        assert!(!closed.clamped);

        assert_eq!(store.sum(&k, Window::Lifetime), Duration::seconds(90));
        assert_eq!(store.sum(&k, Window::CurrentPeriod), Duration::seconds(90));
        assert!(!store.is_open(&k));
    }

    #[test]
    fn reopen_while_open_is_noop() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Muted);

        assert!(store.open_interval(k.clone(), t0()));
        // A duplicate open 30s later must not restart the clock.
        assert!(!store.open_interval(k.clone(), t0() + Duration::seconds(30)));

        let closed = store
            .close_interval(&k, t0() + Duration::seconds(60))
            .unwrap();
        assert_eq!(closed.elapsed, Duration::seconds(60));
    }

    #[test]
    fn close_without_open_is_noop() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Deafened);
        assert!(store.close_interval(&k, t0()).is_none());
        assert_eq!(store.sum(&k, Window::Lifetime), Duration::zero());
    }

    #[test]
    fn clock_regression_clamps_to_zero() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Voice);

        store.open_interval(k.clone(), t0());
        let closed = store
            .close_interval(&k, t0() - Duration::seconds(10))
            .unwrap();
        assert!(closed.clamped);
        assert_eq!(closed.elapsed, Duration::zero());
        assert_eq!(store.sum(&k, Window::Lifetime), Duration::zero());
    }

    #[test]
    fn total_includes_open_interval_in_both_windows() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Streaming);

        store.open_interval(k.clone(), t0());
        store.close_interval(&k, t0() + Duration::seconds(100));
        store.open_interval(k.clone(), t0() + Duration::seconds(200));

        let now = t0() + Duration::seconds(250);
        assert_eq!(store.total(&k, Window::Lifetime, now), Duration::seconds(150));
        assert_eq!(
            store.total(&k, Window::CurrentPeriod, now),
            Duration::seconds(150)
        );
        // Settled sums only contain the closed interval.
        assert_eq!(store.sum(&k, Window::Lifetime), Duration::seconds(100));
    }

    #[test]
    fn checkpoint_preserves_totals_and_liveness() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Voice);

        store.open_interval(k.clone(), t0());
        let checkpoint_at = t0() + Duration::seconds(300);
        assert_eq!(store.checkpoint(checkpoint_at), 1);

        // Split moved to the sums, interval still live at the checkpoint instant.
        assert_eq!(store.sum(&k, Window::Lifetime), Duration::seconds(300));
        assert!(store.is_open(&k));

        let now = checkpoint_at + Duration::seconds(50);
        assert_eq!(store.total(&k, Window::Lifetime, now), Duration::seconds(350));
    }

    #[test]
    fn checkpoint_of_closed_keys_changes_nothing() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Muted);
        store.open_interval(k.clone(), t0());
        store.close_interval(&k, t0() + Duration::seconds(10));

        let before = store.clone();
        assert_eq!(store.checkpoint(t0() + Duration::seconds(20)), 0);
        assert_eq!(store, before);
    }

    #[test]
    fn reset_clears_current_period_only() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Voice);
        store.open_interval(k.clone(), t0());
        store.close_interval(&k, t0() + Duration::seconds(40));
        store.open_interval(k.clone(), t0() + Duration::seconds(60));

        store.reset_current_period();

        assert_eq!(store.sum(&k, Window::Lifetime), Duration::seconds(40));
        assert_eq!(store.sum(&k, Window::CurrentPeriod), Duration::zero());
        assert!(store.is_open(&k));
    }

    #[test]
    fn keys_for_kind_dedupes_across_maps() {
        let mut store = Accumulators::new(t0().date_naive());
        let k = key("a", ActivityKind::Voice);
        store.open_interval(k.clone(), t0());
        store.close_interval(&k, t0() + Duration::seconds(5));
        store.open_interval(k.clone(), t0() + Duration::seconds(6));

        assert_eq!(store.keys_for_kind(ActivityKind::Voice).count(), 1);
        assert!(!store.has_kind(ActivityKind::Muted));
        assert_eq!(store.key_count(), 1);
    }
}
