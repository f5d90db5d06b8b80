use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::RowSetSnapshot;

/// A cached row-set and when it was fetched
#[derive(Debug, Clone)]
struct CachedRows {
    rows: RowSetSnapshot,
    fetched_at: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CachedRows>,
    /// Bumped on every invalidation; refreshes started before it are discarded
    generation: u64,
}

/// Process-wide read cache for the stats table.
///
/// Snapshots are replaced whole and never mutated, so sessions still holding
/// an older snapshot are unaffected by refreshes or invalidation.
#[derive(Debug)]
pub struct RowCache {
    ttl: Duration,
    slot: RwLock<Slot>,
}

/// Ticket returned when a refresh starts, see [`RowCache::begin_refresh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

impl RowCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(Slot::default()),
        }
    }

    /// Cached rows if present and younger than the TTL
    pub fn get(&self) -> Option<RowSetSnapshot> {
        let slot = self.slot.read();
        match &slot.entry {
            Some(cached) if cached.fetched_at.elapsed() < self.ttl => Some(cached.rows.clone()),
            _ => None,
        }
    }

    /// Call before fetching from the store so a write that lands mid-fetch wins
    pub fn begin_refresh(&self) -> RefreshTicket {
        RefreshTicket(self.slot.read().generation)
    }

    /// Store freshly fetched rows. Returns false if the cache was invalidated since `ticket`.
    pub fn complete_refresh(&self, ticket: RefreshTicket, rows: RowSetSnapshot) -> bool {
        let mut slot = self.slot.write();
        if slot.generation != ticket.0 {
            debug!("Discarding stale refresh of {} rows", rows.len());
            return false;
        }
        slot.entry = Some(CachedRows {
            rows,
            fetched_at: Instant::now(),
        });
        true
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        debug!("Row cache invalidated (generation {})", slot.generation);
    }
}

/// Shared row cache type
pub type SharedRowCache = Arc<RowCache>;

pub fn create_shared_row_cache(ttl: Duration) -> SharedRowCache {
    Arc::new(RowCache::new(ttl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;

    fn snapshot(names: &[&str]) -> RowSetSnapshot {
        names.iter().map(|n| Row::new(*n, 1, 1, 1.0)).collect()
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = RowCache::new(Duration::from_secs(60));
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_refresh_then_hit() {
        let cache = RowCache::new(Duration::from_secs(60));
        let ticket = cache.begin_refresh();
        assert!(cache.complete_refresh(ticket, snapshot(&["Ann", "Bob"])));

        let rows = cache.get().unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_zero_ttl_always_expired() {
        let cache = RowCache::new(Duration::ZERO);
        let ticket = cache.begin_refresh();
        cache.complete_refresh(ticket, snapshot(&["Ann"]));
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_invalidate_drops_rows_but_not_held_snapshots() {
        let cache = RowCache::new(Duration::from_secs(60));
        let ticket = cache.begin_refresh();
        cache.complete_refresh(ticket, snapshot(&["Ann"]));

        let held = cache.get().unwrap();
        cache.invalidate();

        assert!(cache.get().is_none());
        assert_eq!(held[0].name, "Ann");
    }

    #[test]
    fn test_refresh_started_before_invalidation_is_discarded() {
        let cache = RowCache::new(Duration::from_secs(60));
        let ticket = cache.begin_refresh();
        cache.invalidate();

        assert!(!cache.complete_refresh(ticket, snapshot(&["stale"])));
        assert!(cache.get().is_none());

        let ticket = cache.begin_refresh();
        assert!(cache.complete_refresh(ticket, snapshot(&["fresh"])));
        assert_eq!(cache.get().unwrap()[0].name, "fresh");
    }
}
