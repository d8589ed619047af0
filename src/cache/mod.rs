//! Rendered grid cache
//!
//! - `backend`: key-value store trait, in-memory implementation
//! - `memcached`: memcached ASCII protocol backend
//! - `keys`: storage key layout
//! - `page_cache`: consistency-checked page cache used by the grid service

pub mod backend;
pub mod keys;
pub mod memcached;
pub mod page_cache;

use std::sync::Arc;

pub use backend::{CacheBackend, CacheBackendError, MemoryBackend};
pub use keys::{page_count_key, photo_count_key, PageKey};
pub use memcached::{validate_key, MemcachedBackend};
pub use page_cache::{derived_page_count, pick_page, CacheLookup, PageCache};

use crate::config::{CacheBackendKind, CacheSettings};

/// Build the backend selected by configuration
pub fn backend_from_settings(settings: &CacheSettings) -> Arc<dyn CacheBackend> {
    match &settings.backend {
        CacheBackendKind::Memory => Arc::new(MemoryBackend::new()),
        CacheBackendKind::Memcached(servers) => Arc::new(
            MemcachedBackend::new(servers.clone()).with_connect_timeout(settings.op_timeout),
        ),
    }
}

/// Build a page cache from configuration, or `None` when caching is off
pub fn page_cache_from_settings(settings: &CacheSettings) -> Option<PageCache> {
    if !settings.enabled {
        return None;
    }
    Some(PageCache::new(
        backend_from_settings(settings),
        settings.namespace.clone(),
        settings.ttl_secs,
        settings.op_timeout,
    ))
}
