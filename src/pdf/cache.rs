//! LRU cache for rendered page rasters

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::{DocumentSource, PageRaster};

/// Cache key for rendered pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Content identity of the source
    pub source: String,
    /// Page number
    pub page: usize,
    /// Scale factor (stored as thousandths for stable hashing)
    pub scale_millis: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(source: &DocumentSource, page: usize, scale: f32) -> Self {
        Self {
            source: source.key().to_string(),
            page,
            scale_millis: (scale * 1000.0).round() as u32,
        }
    }
}

/// LRU cache for rendered page rasters, shared between workers
pub struct RasterCache {
    cache: LruCache<CacheKey, Arc<PageRaster>>,
}

impl RasterCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached raster, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<PageRaster>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a raster into the cache, returning an Arc to the data
    pub fn insert(&mut self, key: CacheKey, raster: PageRaster) -> Arc<PageRaster> {
        let arc = Arc::new(raster);
        self.cache.put(key, Arc::clone(&arc));
        arc
    }

    /// Drop every raster of one source
    pub fn invalidate_source(&mut self, source: &DocumentSource) {
        let keys_to_remove: Vec<_> = self
            .cache
            .iter()
            .filter(|(k, _)| k.source == source.key())
            .map(|(k, _)| k.clone())
            .collect();

        for key in keys_to_remove {
            self.cache.pop(&key);
        }
    }

    /// Clear all cached rasters
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
