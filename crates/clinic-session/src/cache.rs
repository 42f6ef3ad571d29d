//! Short-lived cache of the last session verdict.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// The outcome of one session check and when it was made.
///
/// Uses Tokio's clock so paused-time tests can age it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    pub checked_at: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    verdict: Option<Verdict>,
    epoch: u64,
}

/// Holds at most one [`Verdict`], replaced wholesale on every store.
///
/// Readers never see a half-updated entry: the slot is swapped under a
/// lock that is never held across an `.await`.
///
/// Every [`invalidate`](Self::invalidate) starts a new epoch. Work that
/// began in an earlier epoch can't write its verdict back with
/// [`store_if_current`](Self::store_if_current).
#[derive(Debug)]
pub struct VerdictCache {
    slot: Mutex<Slot>,
    ttl: Duration,
}

impl VerdictCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            ttl,
        }
    }

    /// Returns the cached verdict if it is younger than the TTL.
    pub fn fresh(&self) -> Option<bool> {
        let entry = self.lock().verdict;
        entry
            .filter(|v| v.checked_at.elapsed() < self.ttl)
            .map(|v| v.valid)
    }

    /// Replaces the entry with a verdict stamped now.
    pub fn store(&self, valid: bool) {
        self.lock().verdict = Some(Verdict {
            valid,
            checked_at: Instant::now(),
        });
    }

    /// Stores `valid` only if no invalidation happened since `epoch` was
    /// read. Returns whether it was stored.
    pub fn store_if_current(&self, valid: bool, epoch: u64) -> bool {
        let mut slot = self.lock();
        if slot.epoch != epoch {
            return false;
        }
        slot.verdict = Some(Verdict {
            valid,
            checked_at: Instant::now(),
        });
        true
    }

    /// Drops the entry and starts a new epoch.
    pub fn invalidate(&self) {
        let mut slot = self.lock();
        slot.verdict = None;
        slot.epoch = slot.epoch.wrapping_add(1);
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// The current entry, fresh or not.
    pub fn peek(&self) -> Option<Verdict> {
        self.lock().verdict
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_empty_cache_returns_none() {
        let cache = VerdictCache::new(Duration::from_secs(2));
        assert_eq!(cache.fresh(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_within_ttl_returns_verdict() {
        let cache = VerdictCache::new(Duration::from_secs(2));
        cache.store(true);

        tokio::time::advance(Duration::from_millis(1_999)).await;

        assert_eq!(cache.fresh(), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_after_ttl_returns_none_but_peek_keeps_entry() {
        let cache = VerdictCache::new(Duration::from_secs(2));
        cache.store(false);

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.fresh(), None);
        assert_eq!(cache.peek().map(|v| v.valid), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_clears_entry() {
        let cache = VerdictCache::new(Duration::from_secs(2));
        cache.store(true);

        cache.invalidate();

        assert_eq!(cache.fresh(), None);
        assert_eq!(cache.peek(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_if_current_after_invalidate_is_rejected() {
        let cache = VerdictCache::new(Duration::from_secs(2));
        let epoch = cache.epoch();

        cache.invalidate();

        assert!(!cache.store_if_current(true, epoch));
        assert_eq!(cache.peek(), None);
        assert!(cache.store_if_current(false, cache.epoch()));
        assert_eq!(cache.fresh(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_replaces_previous_verdict() {
        let cache = VerdictCache::new(Duration::from_secs(2));
        cache.store(true);
        tokio::time::advance(Duration::from_secs(1)).await;

        cache.store(false);
        tokio::time::advance(Duration::from_millis(1_500)).await;

        // Second store restarted the TTL.
        assert_eq!(cache.fresh(), Some(false));
    }
}
