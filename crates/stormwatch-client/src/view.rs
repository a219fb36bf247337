//! Polling state machine for one cached view.
//!
//! A [`PolledView`] never performs I/O and never reads the clock; callers
//! pass `now` in and get back a [`Ticket`] whenever a fetch should start.
//! The fetch result is handed back through [`PolledView::complete`] with
//! its ticket. Any ticket other than the current in-flight one is
//! discarded, so a slow response can never overwrite a newer one.
//!
//! ```text
//! Idle --fetch--> Loading --ok--> Ready --tick/refresh--> Loading
//!                        \--err-> Failed --tick/refresh--> Loading
//! any --inactive--> Frozen --active--> Ready | Idle (+ fetch)
//! ```

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::cache::CacheEntry;

/// Where a view is in its fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "camelCase")]
pub enum ViewStatus {
    /// No data and nothing in flight.
    Idle,
    /// A fetch is in flight. Any previous value is still shown.
    Loading,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed. The last good value, if any, is retained.
    Failed(String),
    /// Polling is paused (disconnected or disabled). The value is retained.
    Frozen,
}

/// Identifies one fetch. Results are accepted only for the current ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket<K> {
    /// Bumped on every fetch start and every reset.
    pub generation: u64,
    /// The key the fetch was issued for.
    pub key: K,
}

/// Presentation copy of a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot<T> {
    /// Current status.
    pub status: ViewStatus,
    /// Last good value, if any.
    pub value: Option<T>,
    /// Whether `value` is past its staleness window.
    pub is_stale: bool,
}

impl<T> Default for ViewSnapshot<T> {
    fn default() -> Self {
        Self {
            status: ViewStatus::Idle,
            value: None,
            is_stale: false,
        }
    }
}

/// One periodically refreshed, keyed, cached value.
///
/// `key` is `None` when fetching is suppressed (for example a weather
/// view whose selection has no usable place name).
#[derive(Debug, Clone)]
pub struct PolledView<K, T> {
    interval: Duration,
    stale_after: Duration,
    key: Option<K>,
    entry: Option<CacheEntry<T>>,
    status: ViewStatus,
    active: bool,
    generation: u64,
    in_flight: Option<Ticket<K>>,
    next_due: Option<Instant>,
}

impl<K: Clone + PartialEq, T: Clone> PolledView<K, T> {
    /// Create an inactive view with no key.
    pub const fn new(interval: Duration, stale_after: Duration) -> Self {
        Self {
            interval,
            stale_after,
            key: None,
            entry: None,
            status: ViewStatus::Idle,
            active: false,
            generation: 0,
            in_flight: None,
            next_due: None,
        }
    }

    /// Create an inactive view with an initial key.
    #[must_use]
    pub fn with_key(mut self, key: K) -> Self {
        self.key = Some(key);
        self
    }

    /// Current status.
    pub const fn status(&self) -> &ViewStatus {
        &self.status
    }

    /// The current key, if fetching is not suppressed.
    pub const fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Last good value.
    pub fn value(&self) -> Option<&T> {
        self.entry.as_ref().map(|e| &e.value)
    }

    /// Whether the view is polling.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a fetch is in flight.
    pub const fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// When the next scheduled fetch is due, if one is scheduled.
    pub const fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Whether the cached value is past its staleness window.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|e| e.is_stale(now, self.stale_after))
    }

    /// The first instant at which the cached value counts as stale.
    pub fn stale_at(&self) -> Option<Instant> {
        let entry = self.entry.as_ref()?;
        entry
            .fetched_at
            .checked_add(self.stale_after)?
            .checked_add(Duration::from_nanos(1))
    }

    /// Presentation copy at `now`.
    pub fn snapshot(&self, now: Instant) -> ViewSnapshot<T> {
        ViewSnapshot {
            status: self.status.clone(),
            value: self.value().cloned(),
            is_stale: self.is_stale(now),
        }
    }

    /// Start or stop polling.
    ///
    /// Stopping freezes the view and orphans any in-flight fetch.
    /// Starting again does not catch up: a view holding data waits one
    /// full interval, a view without data fetches immediately.
    pub fn set_active(&mut self, active: bool, now: Instant) -> Option<Ticket<K>> {
        if active == self.active {
            if !active {
                self.status = ViewStatus::Frozen;
            }
            return None;
        }
        self.active = active;

        if !active {
            self.reset();
            self.status = ViewStatus::Frozen;
            return None;
        }

        if self.entry.is_some() {
            self.status = ViewStatus::Ready;
            self.next_due = self.key.is_some().then(|| self.after_interval(now));
            None
        } else {
            self.status = ViewStatus::Idle;
            self.start_fetch()
        }
    }

    /// Switch to a new key.
    ///
    /// The value cached for the old key is discarded. An active view
    /// fetches the new key immediately. `None` suppresses fetching.
    pub fn set_key(&mut self, key: Option<K>, _now: Instant) -> Option<Ticket<K>> {
        if key == self.key {
            return None;
        }
        self.key = key;
        self.entry = None;
        self.reset();

        if !self.active {
            self.status = ViewStatus::Frozen;
            return None;
        }
        self.status = ViewStatus::Idle;
        self.start_fetch()
    }

    /// Fetch now regardless of schedule or staleness.
    ///
    /// Ignored while inactive. A fetch already in flight is orphaned.
    pub fn refresh(&mut self, _now: Instant) -> Option<Ticket<K>> {
        if !self.active {
            return None;
        }
        self.start_fetch()
    }

    /// Start the scheduled fetch if it is due and nothing is in flight.
    pub fn poll_due(&mut self, now: Instant) -> Option<Ticket<K>> {
        if !self.active || self.in_flight.is_some() {
            return None;
        }
        match self.next_due {
            Some(due) if due <= now => self.start_fetch(),
            _ => None,
        }
    }

    /// Apply a finished fetch.
    ///
    /// Returns `false` (and changes nothing) if `ticket` is no longer
    /// current.
    pub fn complete(&mut self, ticket: &Ticket<K>, result: Result<T, String>, now: Instant) -> bool {
        if self.in_flight.as_ref() != Some(ticket) {
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(value) => {
                self.entry = Some(CacheEntry::new(value, now));
                self.status = ViewStatus::Ready;
            }
            Err(reason) => self.status = ViewStatus::Failed(reason),
        }
        self.next_due = Some(self.after_interval(now));
        true
    }

    fn start_fetch(&mut self) -> Option<Ticket<K>> {
        let key = self.key.clone()?;
        self.generation = self.generation.wrapping_add(1);
        let ticket = Ticket {
            generation: self.generation,
            key,
        };
        self.in_flight = Some(ticket.clone());
        self.next_due = None;
        self.status = ViewStatus::Loading;
        Some(ticket)
    }

    /// Orphan any in-flight fetch and clear the schedule.
    fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = None;
        self.next_due = None;
    }

    fn after_interval(&self, now: Instant) -> Instant {
        now.checked_add(self.interval).unwrap_or(now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn active_view(now: Instant) -> (PolledView<String, u32>, Ticket<String>) {
        let mut view = PolledView::new(INTERVAL, Duration::from_secs(120)).with_key("A".to_owned());
        let ticket = view.set_active(true, now).unwrap();
        (view, ticket)
    }

    #[test]
    fn first_activation_without_data_fetches() {
        let now = Instant::now();
        let (view, ticket) = active_view(now);
        assert_eq!(ticket.key, "A");
        assert_eq!(view.status(), &ViewStatus::Loading);
        assert!(view.is_loading());
    }

    #[test]
    fn success_schedules_next_tick() {
        let now = Instant::now();
        let (mut view, ticket) = active_view(now);

        assert!(view.complete(&ticket, Ok(7), now));
        assert_eq!(view.status(), &ViewStatus::Ready);
        assert_eq!(view.value(), Some(&7));
        assert_eq!(view.next_due(), Some(now + INTERVAL));

        assert!(view.poll_due(now + Duration::from_secs(9)).is_none());
        assert!(view.poll_due(now + INTERVAL).is_some());
    }

    #[test]
    fn failure_keeps_last_good_value() {
        let now = Instant::now();
        let (mut view, ticket) = active_view(now);
        view.complete(&ticket, Ok(1), now);

        let later = now + INTERVAL;
        let ticket = view.poll_due(later).unwrap();
        assert!(view.complete(&ticket, Err("boom".to_owned()), later));
        assert_eq!(view.status(), &ViewStatus::Failed("boom".to_owned()));
        assert_eq!(view.value(), Some(&1));
    }

    #[test]
    fn scheduled_ticks_coalesce_while_in_flight() {
        let now = Instant::now();
        let (mut view, _ticket) = active_view(now);
        assert!(view.poll_due(now + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn superseded_result_is_discarded() {
        let now = Instant::now();
        let (mut view, first) = active_view(now);
        let second = view.refresh(now).unwrap();
        assert_ne!(first, second);

        assert!(!view.complete(&first, Ok(1), now));
        assert_eq!(view.value(), None);
        assert!(view.complete(&second, Ok(2), now));
        assert_eq!(view.value(), Some(&2));

        // A late arrival after the newer result changes nothing.
        assert!(!view.complete(&first, Ok(1), now));
        assert_eq!(view.value(), Some(&2));
    }

    #[test]
    fn key_change_discards_value_and_fetches_new_key() {
        let now = Instant::now();
        let (mut view, ticket) = active_view(now);
        view.complete(&ticket, Ok(1), now);

        let ticket = view.set_key(Some("B".to_owned()), now).unwrap();
        assert_eq!(ticket.key, "B");
        assert_eq!(view.value(), None);
        assert!(view.set_key(Some("B".to_owned()), now).is_none());
    }

    #[test]
    fn suppressed_key_never_fetches() {
        let now = Instant::now();
        let (mut view, ticket) = active_view(now);
        view.complete(&ticket, Ok(1), now);

        assert!(view.set_key(None, now).is_none());
        assert_eq!(view.status(), &ViewStatus::Idle);
        assert!(view.refresh(now).is_none());
        assert!(view.poll_due(now + Duration::from_secs(3_600)).is_none());
    }

    #[test]
    fn freeze_orphans_in_flight_and_retains_value() {
        let now = Instant::now();
        let (mut view, ticket) = active_view(now);
        view.complete(&ticket, Ok(5), now);
        let in_flight = view.refresh(now).unwrap();

        assert!(view.set_active(false, now).is_none());
        assert_eq!(view.status(), &ViewStatus::Frozen);
        assert_eq!(view.value(), Some(&5));
        assert!(!view.complete(&in_flight, Ok(6), now));
        assert!(view.refresh(now).is_none());
        assert!(view.poll_due(now + Duration::from_secs(3_600)).is_none());
    }

    #[test]
    fn reactivation_with_data_waits_a_full_interval() {
        let now = Instant::now();
        let (mut view, ticket) = active_view(now);
        view.complete(&ticket, Ok(5), now);
        view.set_active(false, now);

        let back = now + Duration::from_secs(3_600);
        assert!(view.set_active(true, back).is_none());
        assert_eq!(view.status(), &ViewStatus::Ready);
        assert!(view.poll_due(back).is_none());
        assert!(view.poll_due(back + INTERVAL).is_some());
    }

    #[test]
    fn reactivation_without_data_fetches_once() {
        let now = Instant::now();
        let (mut view, _ticket) = active_view(now);
        view.set_active(false, now);

        let ticket = view.set_active(true, now);
        assert!(ticket.is_some());
        assert!(view.poll_due(now).is_none());
    }

    #[test]
    fn staleness_tracks_fetch_time() {
        let now = Instant::now();
        let (mut view, ticket) = active_view(now);
        assert!(!view.is_stale(now));
        view.complete(&ticket, Ok(5), now);

        assert!(!view.is_stale(now + Duration::from_secs(120)));
        assert!(view.is_stale(view.stale_at().unwrap()));
        let snap = view.snapshot(now + Duration::from_secs(121));
        assert!(snap.is_stale);
        assert_eq!(snap.value, Some(5));
    }
}
