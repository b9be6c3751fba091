//! Compilation cache keyed by fragment identity.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of compiled fragments kept per template.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Bounded LRU map from fragment identity to compiled SQL text.
///
/// `get` promotes the entry to most recently used; `set` evicts the least
/// recently used entry once capacity is exceeded. A capacity of zero
/// disables caching entirely.
#[derive(Debug)]
pub struct CompileCache {
    inner: Option<Mutex<LruCache<String, String>>>,
}

impl CompileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.lock()?;
        inner.get(key).cloned()
    }

    pub fn set(&self, key: String, value: String) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        let full = inner.len() == inner.cap().get() && !inner.contains(&key);
        if let Some((_evicted, _)) = inner.push(key, value)
            && full
        {
            #[cfg(feature = "tracing")]
            tracing::trace!(target: "sqlcraft.template", evicted = %_evicted, "compile cache eviction");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |inner| inner.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().map_or(0, |inner| inner.cap().get())
    }

    pub fn clear(&self) {
        if let Some(mut inner) = self.lock() {
            inner.clear();
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<String, String>>> {
        // Entries are plain strings; a panic mid-update cannot leave them torn.
        self.inner
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for CompileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
