//! In-memory TTL cache of finished layers.
//!
//! Keys are the MD5 hex digest of `source`, `location` and `data_type`, each
//! prefixed with its byte length so no two field splits hash alike. Fields are
//! taken verbatim (no case folding or trimming). Expired entries are dropped
//! lazily when read.

use geolayer_core::LayerResult;
use md5::{Digest, Md5};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct CacheEntry {
    value: Arc<LayerResult>,
    created_at: Instant,
}

/// Thread-safe layer cache; the last writer for a key wins.
#[derive(Debug)]
pub struct LayerCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl LayerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(source: &str, location: &str, data_type: &str) -> String {
        let mut hasher = Md5::new();
        for field in [source, location, data_type] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, source: &str, location: &str, data_type: &str) -> Option<Arc<LayerResult>> {
        self.get_at(source, location, data_type, Instant::now())
    }

    fn get_at(
        &self,
        source: &str,
        location: &str,
        data_type: &str,
        now: Instant,
    ) -> Option<Arc<LayerResult>> {
        let key = Self::key(source, location, data_type);
        {
            let entries = self.entries.read();
            let entry = entries.get(&key)?;
            if now.saturating_duration_since(entry.created_at) < self.ttl {
                tracing::debug!("Cache hit: {}", key);
                return Some(entry.value.clone());
            }
        }

        let mut entries = self.entries.write();
        // Re-check under the write lock; a concurrent `set` may have refreshed it.
        if let Some(entry) = entries.get(&key) {
            if now.saturating_duration_since(entry.created_at) < self.ttl {
                return Some(entry.value.clone());
            }
            entries.remove(&key);
            tracing::debug!("Cache entry expired: {}", key);
        }
        None
    }

    /// Store a layer, replacing any existing entry and restarting its TTL.
    pub fn set(&self, source: &str, location: &str, data_type: &str, value: Arc<LayerResult>) {
        self.set_at(source, location, data_type, value, Instant::now());
    }

    fn set_at(
        &self,
        source: &str,
        location: &str,
        data_type: &str,
        value: Arc<LayerResult>,
        now: Instant,
    ) {
        let key = Self::key(source, location, data_type);
        self.entries.write().insert(
            key,
            CacheEntry {
                value,
                created_at: now,
            },
        );
    }

    /// Drop every entry; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        tracing::info!("Cache cleared ({} entries)", removed);
        removed
    }

    /// Entry count, including expired entries not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LayerCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
