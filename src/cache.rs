//! Bounded LRU cache for decoded templates
//!
//! Matching runs in a tight loop over every captured frame, so template
//! decoding must never sit on the hot path. The cache hands out shared
//! handles to immutable templates; lookups run concurrently under a read
//! lock while insertion and eviction serialize on the write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::assets::TemplateSource;
use crate::error::VisionResult;
use crate::matching::Template;

/// Default maximum number of cached templates.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Monotonic counters and occupancy for the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub entry_count: usize,
    pub approx_memory_bytes: u64,
}

struct CacheEntry {
    template: Arc<Template>,
    last_access: AtomicU64,
    bytes: usize,
}

/// Entry-count bounded template cache with strict least-recently-used
/// eviction.
///
/// A miss is a normal outcome, not an error; callers load from their
/// [`TemplateSource`] and insert, or use [`TemplateCache::get_or_load`].
/// Templates handed out are shared and immutable.
pub struct TemplateCache {
    capacity: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a template and refresh its recency.
    pub fn get(&self, id: &str) -> Option<Arc<Template>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(id) {
            Some(entry) => {
                let tick = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
                entry.last_access.store(tick, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.template))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a template keyed by its identifier, evicting least-recently
    /// used entries first when the cache is full.
    pub fn put(&self, template: Template) -> Arc<Template> {
        let id = template.id().to_string();
        let bytes = template.approx_bytes();
        let template = Arc::new(template);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(&id) {
            while entries.len() >= self.capacity {
                Self::evict_lru(&mut entries);
            }
        }
        let tick = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        entries.insert(
            id,
            CacheEntry {
                template: Arc::clone(&template),
                last_access: AtomicU64::new(tick),
                bytes,
            },
        );
        template
    }

    /// Fetch from cache, falling back to the asset source on a miss.
    pub fn get_or_load(
        &self,
        id: &str,
        source: &dyn TemplateSource,
    ) -> VisionResult<Arc<Template>> {
        if let Some(template) = self.get(id) {
            return Ok(template);
        }
        let template = source.load(id)?;
        Ok(self.put(template))
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len(),
            approx_memory_bytes: entries.values().map(|e| e.bytes as u64).sum(),
        }
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn evict_lru(entries: &mut HashMap<String, CacheEntry>) {
        let victim = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
            .map(|(id, _)| id.clone());
        if let Some(id) = victim {
            entries.remove(&id);
            log::debug!("evicted template '{id}' from cache");
        }
    }
}
