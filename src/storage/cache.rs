use std::fmt;
use std::num::NonZeroUsize;
use std::rc::{Rc, Weak};

use lru::LruCache;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::types::GraphId;

/// Key of a cached element: owning graph plus raw element id.
pub type CacheKey = (GraphId, i64);

/// Callback run when an element leaves the bounded tier.
pub type EvictionCallback<T> = Box<dyn FnMut(CacheKey, &Rc<T>)>;

/// Counters describing cache behaviour.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CacheStats {
    /// Lookups that resolved to a live instance.
    pub hits: u64,
    /// Lookups that found nothing live.
    pub misses: u64,
    /// Entries pushed out of the bounded tier.
    pub evictions: u64,
    /// Reclaimed holds cleared by maintenance passes.
    pub drained: u64,
    /// Entries currently held strongly.
    pub resident: usize,
    /// Entries currently held weakly.
    pub retained: usize,
}

/// Reclaimable holds on loaded elements, keyed by `(graph, id)`.
///
/// The cache keeps up to `capacity` elements alive in an LRU tier. Elements
/// pushed out of that tier are not forgotten right away: the cache keeps a
/// weak hold on them, so an instance the application still uses resolves to
/// the same object until it is dropped everywhere. Dead weak holds are
/// cleared by a maintenance pass every `maintenance_interval` accesses.
///
/// A hit is only ever a hint. Callers must be ready to fetch the element
/// from the backend again.
pub struct ElementCache<T> {
    resident: LruCache<CacheKey, Rc<T>>,
    retained: FxHashMap<CacheKey, Weak<T>>,
    accesses: usize,
    maintenance_interval: usize,
    on_evict: Option<EvictionCallback<T>>,
    stats: CacheStats,
}

impl<T> fmt::Debug for ElementCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementCache")
            .field("capacity", &self.resident.cap())
            .field("resident", &self.resident.len())
            .field("retained", &self.retained.len())
            .field("maintenance_interval", &self.maintenance_interval)
            .finish()
    }
}

impl<T> ElementCache<T> {
    /// Creates a cache holding at most `capacity` elements strongly.
    pub fn new(capacity: usize, maintenance_interval: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            resident: LruCache::new(capacity),
            retained: FxHashMap::default(),
            accesses: 0,
            maintenance_interval: maintenance_interval.max(1),
            on_evict: None,
            stats: CacheStats::default(),
        }
    }

    /// Installs a callback invoked for each element leaving the bounded tier.
    pub fn set_eviction_callback(&mut self, callback: EvictionCallback<T>) {
        self.on_evict = Some(callback);
    }

    /// Registers `element` under `(graph, id)`.
    pub fn put(&mut self, graph: GraphId, id: i64, element: Rc<T>) {
        let key = (graph, id);
        self.retained.remove(&key);
        if let Some((old_key, old)) = self.resident.push(key, element) {
            if old_key != key {
                self.evicted(old_key, old);
            }
        }
        self.tick();
    }

    /// Returns the element if its hold still resolves to a live instance.
    pub fn get(&mut self, graph: GraphId, id: i64) -> Option<Rc<T>> {
        let key = (graph, id);
        self.tick();
        if let Some(element) = self.resident.get(&key) {
            self.stats.hits += 1;
            return Some(Rc::clone(element));
        }
        match self.retained.get(&key).and_then(Weak::upgrade) {
            Some(element) => {
                self.stats.hits += 1;
                self.retained.remove(&key);
                if let Some((old_key, old)) = self.resident.push(key, Rc::clone(&element)) {
                    if old_key != key {
                        self.evicted(old_key, old);
                    }
                }
                Some(element)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Looks up an element without touching recency or counters.
    pub fn peek(&self, graph: GraphId, id: i64) -> Option<Rc<T>> {
        let key = (graph, id);
        self.resident
            .peek(&key)
            .cloned()
            .or_else(|| self.retained.get(&key).and_then(Weak::upgrade))
    }

    /// Returns `true` while the hold on `(graph, id)` resolves.
    pub fn contains(&self, graph: GraphId, id: i64) -> bool {
        self.peek(graph, id).is_some()
    }

    /// Explicitly evicts `(graph, id)`, returning the held element if live.
    pub fn remove(&mut self, graph: GraphId, id: i64) -> Option<Rc<T>> {
        let key = (graph, id);
        let weak = self.retained.remove(&key);
        self.resident
            .pop(&key)
            .or_else(|| weak.and_then(|w| w.upgrade()))
    }

    /// Drops every hold belonging to `graph`.
    pub fn clear_graph(&mut self, graph: GraphId) {
        let keys: Vec<CacheKey> = self
            .resident
            .iter()
            .map(|(key, _)| *key)
            .filter(|(g, _)| *g == graph)
            .collect();
        for key in keys {
            self.resident.pop(&key);
        }
        self.retained.retain(|(g, _), _| *g != graph);
    }

    /// Drops every hold.
    pub fn clear(&mut self) {
        self.resident.clear();
        self.retained.clear();
    }

    /// Clears weak holds whose element has been reclaimed.
    pub fn maintain(&mut self) -> usize {
        let before = self.retained.len();
        self.retained.retain(|_, hold| hold.strong_count() > 0);
        let drained = before - self.retained.len();
        self.stats.drained += drained as u64;
        if drained > 0 {
            debug!(drained, retained = self.retained.len(), "cache maintenance");
        }
        drained
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            resident: self.resident.len(),
            retained: self.retained.len(),
            ..self.stats
        }
    }

    fn evicted(&mut self, key: CacheKey, element: Rc<T>) {
        trace!(graph = %key.0, id = key.1, "element left the bounded cache tier");
        self.stats.evictions += 1;
        if let Some(callback) = self.on_evict.as_mut() {
            callback(key, &element);
        }
        self.retained.insert(key, Rc::downgrade(&element));
    }

    fn tick(&mut self) {
        self.accesses = self.accesses.wrapping_add(1);
        if self.accesses % self.maintenance_interval == 0 {
            self.maintain();
        }
    }
}
