//! Per-key alert rate limiting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Decides whether a flagged key should produce a notification.
pub trait KeysFilter: Send + Sync {
    fn should_notify(&self, identity_key: &str) -> bool;
}

/// Clock returning unix seconds.
pub type TimestampFn = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Wall clock in unix seconds.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
struct SnoozeEntry {
    snooze_count: u32,
    window_started_at: i64,
}

/// Lets through at most `max_snooze_events` notifications per key in each
/// window of `snooze_seconds`.
///
/// Entries are created the first time a key is flagged and reset in place
/// when their window expires. They are never removed, the map is bounded by
/// the number of monitored keys.
pub struct FaultySnoozeCache {
    max_snooze_events: u32,
    snooze_seconds: u64,
    now: TimestampFn,
    entries: Mutex<HashMap<String, SnoozeEntry>>,
}

impl FaultySnoozeCache {
    pub fn new(max_snooze_events: u32, snooze_seconds: u64) -> Self {
        Self::with_clock(max_snooze_events, snooze_seconds, Arc::new(unix_timestamp))
    }

    pub fn with_clock(max_snooze_events: u32, snooze_seconds: u64, now: TimestampFn) -> Self {
        Self {
            max_snooze_events,
            snooze_seconds,
            now,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl KeysFilter for FaultySnoozeCache {
    fn should_notify(&self, identity_key: &str) -> bool {
        let mut entries = self.entries.lock();
        let now = (self.now)();

        let entry = entries
            .entry(identity_key.to_string())
            .or_insert(SnoozeEntry {
                snooze_count: 0,
                window_started_at: now,
            });

        let window = i64::try_from(self.snooze_seconds).unwrap_or(i64::MAX);
        if entry.window_started_at.saturating_add(window) <= now {
            entry.snooze_count = 0;
            entry.window_started_at = now;
        }

        let should_notify = entry.snooze_count < self.max_snooze_events;
        entry.snooze_count = entry.snooze_count.saturating_add(1);
        should_notify
    }
}

/// Filter used when snoozing is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledKeysFilter;

impl KeysFilter for DisabledKeysFilter {
    fn should_notify(&self, _identity_key: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn manual_clock(start: i64) -> (Arc<AtomicI64>, TimestampFn) {
        let time = Arc::new(AtomicI64::new(start));
        let clock = time.clone();
        (time, Arc::new(move || clock.load(Ordering::SeqCst)))
    }

    #[test]
    fn allows_max_events_per_window() {
        let (time, clock) = manual_clock(1000);
        let cache = FaultySnoozeCache::with_clock(3, 60, clock);

        assert!(cache.should_notify("bls1"));
        assert!(cache.should_notify("bls1"));
        assert!(cache.should_notify("bls1"));
        assert!(!cache.should_notify("bls1"));

        time.store(1059, Ordering::SeqCst);
        assert!(!cache.should_notify("bls1"));

        time.store(1060, Ordering::SeqCst);
        assert!(cache.should_notify("bls1"));
        assert!(cache.should_notify("bls1"));
        assert!(cache.should_notify("bls1"));
        assert!(!cache.should_notify("bls1"));
    }

    #[test]
    fn keys_are_independent() {
        let (_, clock) = manual_clock(0);
        let cache = FaultySnoozeCache::with_clock(1, 60, clock);

        assert!(cache.should_notify("bls1"));
        assert!(cache.should_notify("bls2"));
        assert!(!cache.should_notify("bls1"));
        assert!(!cache.should_notify("bls2"));
    }

    #[test]
    fn zero_max_events_suppresses_everything() {
        let (_, clock) = manual_clock(0);
        let cache = FaultySnoozeCache::with_clock(0, 60, clock);
        assert!(!cache.should_notify("bls1"));
    }

    #[test]
    fn window_restarts_at_reset_time() {
        let (time, clock) = manual_clock(0);
        let cache = FaultySnoozeCache::with_clock(1, 10, clock);

        assert!(cache.should_notify("bls1"));
        time.store(25, Ordering::SeqCst);
        assert!(cache.should_notify("bls1"));
        // the new window started at 25, not at 10 or 20
        time.store(34, Ordering::SeqCst);
        assert!(!cache.should_notify("bls1"));
        time.store(35, Ordering::SeqCst);
        assert!(cache.should_notify("bls1"));
    }

    #[test]
    fn concurrent_calls_on_one_key_respect_limit() {
        let (_, clock) = manual_clock(0);
        let cache = Arc::new(FaultySnoozeCache::with_clock(5, 60, clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    (0..10).filter(|_| cache.should_notify("bls1")).count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 5);
    }

    #[test]
    fn disabled_filter_always_notifies() {
        let filter = DisabledKeysFilter;
        for _ in 0..10 {
            assert!(filter.should_notify("bls1"));
        }
    }
}
