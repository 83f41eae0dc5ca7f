//! Resolved dish image cache with LRU eviction
//!
//! Only successful resolutions are remembered so that a dish that fell back
//! to the placeholder is searched again next time.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;

use crate::proxy::SafeUrl;

#[derive(Clone)]
pub struct ResolutionCache {
    entries: Arc<RwLock<LruCache<String, SafeUrl>>>,
}

impl ResolutionCache {
    /// `None` for a zero capacity
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|capacity| Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
        })
    }

    pub async fn get(&self, dish_name: &str) -> Option<SafeUrl> {
        // LruCache::get updates recency, hence the write lock
        self.entries.write().await.get(&cache_key(dish_name)).cloned()
    }

    pub async fn insert(&self, dish_name: &str, url: SafeUrl) {
        self.entries.write().await.put(cache_key(dish_name), url);
    }
}

fn cache_key(dish_name: &str) -> String {
    dish_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
