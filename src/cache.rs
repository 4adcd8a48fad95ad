//! # Cache Module
//!
//! Single-slot, time-boxed cache for the last fetched usage snapshot. There is
//! one authenticated account, so there is exactly one entry.

use crate::models::UsageSnapshot;

/// Cached snapshot and the epoch millisecond it was fetched at
#[derive(Clone, Debug)]
struct CacheEntry {
    snapshot: UsageSnapshot,
    fetched_at_ms: i64,
}

#[derive(Debug, Default)]
pub struct StatsCache {
    entry: Option<CacheEntry>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot if it is younger than `refresh_interval_ms`
    pub fn get(&self, now_ms: i64, refresh_interval_ms: i64) -> Option<&UsageSnapshot> {
        let entry = self.entry.as_ref()?;
        if now_ms - entry.fetched_at_ms < refresh_interval_ms {
            Some(&entry.snapshot)
        } else {
            None
        }
    }

    /// Replace the entry unconditionally
    pub fn put(&mut self, snapshot: UsageSnapshot, now_ms: i64) {
        self.entry = Some(CacheEntry {
            snapshot,
            fetched_at_ms: now_ms,
        });
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Age of the cached entry (for debugging)
    pub fn age_ms(&self, now_ms: i64) -> Option<i64> {
        self.entry.as_ref().map(|e| now_ms - e.fetched_at_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PremiumUsage;
    use chrono::Utc;

    fn snapshot(current: u64) -> UsageSnapshot {
        UsageSnapshot {
            premium: PremiumUsage {
                current,
                limit: 500,
                period_start: Utc::now(),
            },
            billing_items: Vec::new(),
            has_unpaid_mid_month_invoice: false,
            mid_month_payment: 0.0,
        }
    }

    #[test]
    fn empty_cache_misses() {
        let cache = StatsCache::new();
        assert!(cache.get(0, 30_000).is_none());
        assert_eq!(cache.age_ms(0), None);
    }

    #[test]
    fn hit_inside_window_miss_at_boundary() {
        let mut cache = StatsCache::new();
        cache.put(snapshot(7), 1_000);
        assert_eq!(cache.get(1_000, 30_000).map(|s| s.premium.current), Some(7));
        assert!(cache.get(30_999, 30_000).is_some());
        assert!(cache.get(31_000, 30_000).is_none());
        assert_eq!(cache.age_ms(31_000), Some(30_000));
    }

    #[test]
    fn put_overwrites_and_clear_empties() {
        let mut cache = StatsCache::new();
        cache.put(snapshot(1), 0);
        cache.put(snapshot(2), 10);
        assert_eq!(cache.get(20, 30_000).map(|s| s.premium.current), Some(2));
        cache.clear();
        assert!(cache.get(20, 30_000).is_none());
    }
}
