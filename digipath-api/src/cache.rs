//! Public response cache
//!
//! Public projections are cached as JSON per request key. Each entry names
//! the [`CacheScope`]s it was built from; a content event drops every entry
//! sharing a scope with it. Entries also expire after the configured TTL.
//! A zero TTL disables caching.
//!
//! The map holds at most `max_entries` keys; storing past that evicts the
//! oldest entry.
//!
//! Every invalidation bumps an epoch. A value loaded under an older epoch is
//! not stored, so a load racing a mutation cannot repopulate stale data.

use digipath_common::events::CacheScope;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Default entry cap
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

struct CacheEntry {
    scopes: &'static [CacheScope],
    stored_at: Instant,
    /// Insertion order, for eviction
    seq: u64,
    value: Value,
}

pub struct ResponseCache {
    ttl: Duration,
    max_entries: usize,
    epoch: AtomicU64,
    next_seq: AtomicU64,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_entries(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            epoch: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Current invalidation epoch; read before loading a value to [`put`](Self::put)
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Fresh value for `key`, if any
    pub async fn get(&self, key: &str) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        debug!("Cache hit: {}", key);
        Some(entry.value.clone())
    }

    /// Store `value` unless an invalidation happened since `loaded_at`
    pub async fn put(&self, key: String, scopes: &'static [CacheScope], value: Value, loaded_at: u64) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.write().await;
        if self.epoch() != loaded_at {
            debug!("Cache skip (invalidated while loading): {}", key);
            return;
        }
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full, evicting {}", oldest);
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                scopes,
                stored_at: Instant::now(),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                value,
            },
        );
    }

    /// Drop every entry built from any of `scopes`; returns how many went
    pub async fn invalidate(&self, scopes: &[CacheScope]) -> usize {
        let mut entries = self.entries.write().await;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let before = entries.len();
        entries.retain(|_, e| !e.scopes.iter().any(|s| scopes.contains(s)));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!("Cache invalidated {} entries for {:?}", dropped, scopes);
        }
        dropped
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
