#![cfg(feature = "cache")]

use crate::{OneboxConfig, RenderedPreview};
use dashmap::DashMap;
use std::sync::Arc;

const DEFAULT_CAPACITY: usize = 100;

/// Previews keyed by normalized URL.
///
/// Only successful previews are stored; rejected URLs and timeouts are
/// resolved again on the next request.
#[derive(Clone)]
pub struct PreviewCache {
    entries: Arc<DashMap<String, RenderedPreview>>,
    capacity: usize,
}

impl PreviewCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        Self {
            entries: Arc::new(DashMap::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<RenderedPreview> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Stores `preview`, evicting an arbitrary entry when full.
    pub fn insert(&self, key: String, preview: RenderedPreview) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            let victim = self.entries.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(key, preview);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl From<&OneboxConfig> for PreviewCache {
    fn from(config: &OneboxConfig) -> Self {
        Self::new(config.cache_capacity)
    }
}
