//! The strike store itself.
//!
//! Records are indexed by `(timestamp, id)` in a [`BTreeMap`], so recency
//! queries walk the map backwards and eviction splits it at a cutoff. A
//! single [`Mutex`] serializes every mutation; no I/O ever happens while
//! it is held.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use stormwatch_types::{NewStrike, StrikeId, StrikeRecord};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::validation;

/// Number of records returned by [`EventStore::recent_default`].
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Default hard cap on stored records.
///
/// Time-based eviction normally keeps the store far below this; the cap
/// bounds memory if eviction stalls (e.g. clock skew on submitted
/// timestamps).
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Ordering key: oldest first, ties broken by identifier.
type StrikeKey = (DateTime<Utc>, StrikeId);

/// Counters describing the store's state and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Records currently held.
    pub len: usize,
    /// Records ever inserted.
    pub total_inserted: u64,
    /// Records removed by age-based eviction.
    pub total_evicted: u64,
    /// Records dropped by the hard cap.
    pub total_capped: u64,
    /// The hard cap, if any.
    pub max_records: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    by_time: BTreeMap<StrikeKey, StrikeRecord>,
    ids: BTreeSet<StrikeId>,
    total_inserted: u64,
    total_evicted: u64,
    total_capped: u64,
}

impl Inner {
    fn fresh_id(&self) -> StrikeId {
        let mut id = StrikeId::new();
        while self.ids.contains(&id) {
            id = StrikeId::new();
        }
        id
    }

    fn insert(&mut self, record: StrikeRecord) {
        self.ids.insert(record.id);
        self.by_time.insert((record.timestamp, record.id), record);
        self.total_inserted = self.total_inserted.saturating_add(1);
    }

    /// Remove every record with `timestamp < cutoff`.
    fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let retained = self.by_time.split_off(&(cutoff, StrikeId::min()));
        let evicted = std::mem::replace(&mut self.by_time, retained);
        for (_, id) in evicted.keys() {
            self.ids.remove(id);
        }
        let count = evicted.len();
        self.total_evicted = self
            .total_evicted
            .saturating_add(u64::try_from(count).unwrap_or(u64::MAX));
        count
    }

    /// Drop the oldest records until at most `max` remain.
    fn enforce_cap(&mut self, max: usize) -> usize {
        let mut dropped: usize = 0;
        while self.by_time.len() > max {
            let Some(((_, id), _)) = self.by_time.pop_first() else {
                break;
            };
            self.ids.remove(&id);
            dropped = dropped.saturating_add(1);
        }
        self.total_capped = self
            .total_capped
            .saturating_add(u64::try_from(dropped).unwrap_or(u64::MAX));
        dropped
    }
}

/// Bounded, keyed collection of lightning strike records.
#[derive(Debug)]
pub struct EventStore {
    inner: Mutex<Inner>,
    max_records: Option<usize>,
}

impl EventStore {
    /// Create an empty store with the default hard cap.
    pub fn new() -> Self {
        Self::with_max_records(Some(DEFAULT_MAX_RECORDS))
    }

    /// Create an empty store with a custom hard cap (`None` = unbounded).
    ///
    /// A cap of zero is treated as unbounded.
    pub fn with_max_records(max_records: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_records: max_records.filter(|max| *max > 0),
        }
    }

    /// Validate and insert a strike, returning the stored record.
    ///
    /// The stored record keeps every submitted field and gains a fresh
    /// identifier that has never been used by this store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if the intensity or coordinates
    /// are out of range.
    pub async fn add(&self, strike: NewStrike) -> Result<StrikeRecord, StoreError> {
        let intensity = validation::validate(&strike)?;

        let mut inner = self.inner.lock().await;
        let record = StrikeRecord::from_new(inner.fresh_id(), strike, intensity);
        inner.insert(record.clone());
        self.apply_cap(&mut inner);

        debug!(
            strike_id = %record.id,
            intensity = record.intensity.get(),
            stored = inner.by_time.len(),
            "Strike stored"
        );
        Ok(record)
    }

    /// Insert a strike and evict aged records in one critical section.
    ///
    /// Returns the stored record and the number of records evicted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if the strike is rejected; the
    /// store is left untouched in that case.
    pub async fn add_and_evict(
        &self,
        strike: NewStrike,
        max_age_minutes: u32,
    ) -> Result<(StrikeRecord, usize), StoreError> {
        let intensity = validation::validate(&strike)?;
        let cutoff = cutoff_for(Utc::now(), max_age_minutes);

        let mut inner = self.inner.lock().await;
        let record = StrikeRecord::from_new(inner.fresh_id(), strike, intensity);
        inner.insert(record.clone());
        let evicted = inner.evict_before(cutoff);
        self.apply_cap(&mut inner);

        debug!(
            strike_id = %record.id,
            evicted,
            stored = inner.by_time.len(),
            "Strike stored, aged records evicted"
        );
        Ok((record, evicted))
    }

    /// Up to `limit` records, newest first.
    ///
    /// Records sharing a timestamp are ordered by identifier (descending)
    /// so the order is deterministic.
    pub async fn recent(&self, limit: usize) -> Vec<StrikeRecord> {
        let inner = self.inner.lock().await;
        inner.by_time.values().rev().take(limit).cloned().collect()
    }

    /// The newest [`DEFAULT_RECENT_LIMIT`] records, newest first.
    pub async fn recent_default(&self) -> Vec<StrikeRecord> {
        self.recent(DEFAULT_RECENT_LIMIT).await
    }

    /// Remove every record strictly older than `max_age_minutes` ago.
    ///
    /// Returns the number of records removed. Calling it again without an
    /// intervening insert removes nothing.
    pub async fn evict_older_than(&self, max_age_minutes: u32) -> usize {
        self.evict_before(cutoff_for(Utc::now(), max_age_minutes))
            .await
    }

    /// Remove every record whose timestamp is strictly before `cutoff`.
    pub async fn evict_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.inner.lock().await;
        let evicted = inner.evict_before(cutoff);
        if evicted > 0 {
            debug!(evicted, %cutoff, remaining = inner.by_time.len(), "Aged strikes evicted");
        }
        evicted
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_time.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.by_time.is_empty()
    }

    /// Snapshot of the store's counters.
    pub async fn stats(&self) -> StoreStats {
        let inner = self.inner.lock().await;
        StoreStats {
            len: inner.by_time.len(),
            total_inserted: inner.total_inserted,
            total_evicted: inner.total_evicted,
            total_capped: inner.total_capped,
            max_records: self.max_records,
        }
    }

    fn apply_cap(&self, inner: &mut Inner) {
        if let Some(max) = self.max_records {
            let dropped = inner.enforce_cap(max);
            if dropped > 0 {
                warn!(
                    dropped,
                    max_records = max,
                    "Strike store at capacity, oldest records dropped"
                );
            }
        }
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The instant `max_age_minutes` before `now`, saturating at the minimum
/// representable time.
pub fn cutoff_for(now: DateTime<Utc>, max_age_minutes: u32) -> DateTime<Utc> {
    now.checked_sub_signed(TimeDelta::minutes(i64::from(max_age_minutes)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use stormwatch_types::Coordinates;

    use super::*;

    fn strike_at(timestamp: DateTime<Utc>, intensity: i64) -> NewStrike {
        NewStrike {
            coordinates: Coordinates::new(37.7, -122.4),
            location: Some(String::from("San Francisco, California, United States")),
            intensity,
            timestamp,
        }
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = EventStore::new();
        assert!(store.recent(10).await.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn add_round_trips_every_field() {
        let store = EventStore::new();
        let submitted = strike_at(Utc::now(), 7);
        let stored = store.add(submitted.clone()).await.unwrap();

        let fetched = store.recent(1).await;
        assert_eq!(fetched.len(), 1);
        let record = &fetched[0];
        assert_eq!(record, &stored);
        assert_eq!(record.coordinates, submitted.coordinates);
        assert_eq!(record.location, submitted.location);
        assert_eq!(i64::from(record.intensity.get()), submitted.intensity);
        assert_eq!(record.timestamp, submitted.timestamp);
    }

    #[tokio::test]
    async fn ids_are_unique_across_history() {
        let store = EventStore::new();
        let now = Utc::now();
        let mut seen = BTreeSet::new();
        for i in 0..20 {
            let record = store.add(strike_at(now, 1 + i % 10)).await.unwrap();
            assert!(seen.insert(record.id), "duplicate id {}", record.id);
        }
        store.evict_before(now + TimeDelta::seconds(1)).await;
        for _ in 0..20 {
            let record = store.add(strike_at(now, 5)).await.unwrap();
            assert!(seen.insert(record.id), "reused id {}", record.id);
        }
    }

    #[tokio::test]
    async fn recent_default_caps_at_default_limit() {
        let store = EventStore::new();
        let now = Utc::now();
        for offset in 0..60_i64 {
            store
                .add(strike_at(now - TimeDelta::seconds(offset), 2))
                .await
                .unwrap();
        }

        let records = store.recent_default().await;
        assert_eq!(records.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(records[0].timestamp, now);
        assert_eq!(records, store.recent(DEFAULT_RECENT_LIMIT).await);
    }

    #[tokio::test]
    async fn recent_is_bounded_and_newest_first() {
        let store = EventStore::new();
        let now = Utc::now();
        for offset in [5_i64, 1, 30, 12, 0, 7, 3] {
            store
                .add(strike_at(now - TimeDelta::minutes(offset), 3))
                .await
                .unwrap();
        }

        let three = store.recent(3).await;
        assert_eq!(three.len(), 3);
        let all = store.recent_default().await;
        assert_eq!(all.len(), 7);
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(all[0].timestamp, now);
        assert_eq!(&all[..3], &three[..]);
        assert!(store.recent(0).await.is_empty());
    }

    #[tokio::test]
    async fn equal_timestamps_have_stable_order() {
        let store = EventStore::new();
        let now = Utc::now();
        for _ in 0..5 {
            store.add(strike_at(now, 2)).await.unwrap();
        }
        let first: Vec<StrikeId> = store.recent(5).await.iter().map(|r| r.id).collect();
        let second: Vec<StrikeId> = store.recent(5).await.iter().map(|r| r.id).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn eviction_keeps_only_fresh_records() {
        let store = EventStore::new();
        let now = Utc::now();
        let fresh = store
            .add(strike_at(now - TimeDelta::minutes(5), 4))
            .await
            .unwrap();
        store
            .add(strike_at(now - TimeDelta::minutes(65), 4))
            .await
            .unwrap();
        store
            .add(strike_at(now - TimeDelta::minutes(120), 4))
            .await
            .unwrap();

        assert_eq!(store.evict_older_than(60).await, 2);
        let remaining = store.recent(10).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh.id);

        // Second pass with no insert is a no-op.
        assert_eq!(store.evict_older_than(60).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn cutoff_boundary_is_strict() {
        let store = EventStore::new();
        let cutoff = Utc::now();
        store.add(strike_at(cutoff, 1)).await.unwrap();
        store
            .add(strike_at(cutoff - TimeDelta::milliseconds(1), 1))
            .await
            .unwrap();

        assert_eq!(store.evict_before(cutoff).await, 1);
        let left = store.recent(10).await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].timestamp, cutoff);
    }

    #[tokio::test]
    async fn rejected_strikes_are_not_stored() {
        let store = EventStore::new();
        assert!(store.add(strike_at(Utc::now(), 0)).await.is_err());
        assert!(store.add(strike_at(Utc::now(), 11)).await.is_err());
        assert!(store.add_and_evict(strike_at(Utc::now(), 42), 60).await.is_err());
        assert!(store.is_empty().await);
        assert_eq!(store.stats().await.total_inserted, 0);
    }

    #[tokio::test]
    async fn add_and_evict_drops_aged_records() {
        let store = EventStore::new();
        let now = Utc::now();
        store
            .add(strike_at(now - TimeDelta::minutes(90), 6))
            .await
            .unwrap();

        let (record, evicted) = store.add_and_evict(strike_at(now, 6), 60).await.unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(store.recent(10).await, vec![record]);

        let stats = store.stats().await;
        assert_eq!(stats.total_inserted, 2);
        assert_eq!(stats.total_evicted, 1);
    }

    #[tokio::test]
    async fn hard_cap_drops_oldest() {
        let store = EventStore::with_max_records(Some(3));
        let now = Utc::now();
        for offset in 0..5_i64 {
            store
                .add(strike_at(now - TimeDelta::minutes(10 - offset), 2))
                .await
                .unwrap();
        }
        let kept = store.recent(10).await;
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[2].timestamp, now - TimeDelta::minutes(8));

        let stats = store.stats().await;
        assert_eq!(stats.total_capped, 2);
        assert_eq!(stats.max_records, Some(3));
    }

    #[tokio::test]
    async fn zero_cap_means_unbounded() {
        let store = EventStore::with_max_records(Some(0));
        for _ in 0..4 {
            store.add(strike_at(Utc::now(), 2)).await.unwrap();
        }
        assert_eq!(store.len().await, 4);
        assert_eq!(store.stats().await.max_records, None);
    }

    #[test]
    fn cutoff_saturates() {
        let now = Utc::now();
        assert_eq!(cutoff_for(now, 60), now - TimeDelta::minutes(60));
        assert_eq!(
            cutoff_for(DateTime::<Utc>::MIN_UTC, 1),
            DateTime::<Utc>::MIN_UTC
        );
    }
}
