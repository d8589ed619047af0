//! Page cache with global consistency check
//!
//! Rendered pages are cached per `(page number, page size)`. Alongside them
//! sit two shared values recorded at the last fresh fetch: the page count
//! Flickr reported and the total photo count. A cached page is only served
//! when `ceil(photos / page_size)` still equals that page count; otherwise the
//! whole cache is treated as stale for this page size, since page boundaries
//! have moved and any stored page may now hold the wrong photos.
//!
//! The cache never fails a request: backend errors and timeouts are logged
//! and read as a miss.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::backend::{CacheBackend, CacheBackendError};
use super::keys::{page_count_key, photo_count_key, PageKey};

/// Most cached pages probed when falling back from a failed fetch
pub const FALLBACK_CANDIDATES: usize = 16;

/// Number of pages needed for `total_photos` at `page_size` (rounded up)
pub fn derived_page_count(total_photos: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total_photos.div_ceil(page_size)
}

/// Uniform page number in `[1, page_count]`; `page_count` must be positive
pub fn pick_page<R: Rng + ?Sized>(rng: &mut R, page_count: u32) -> u32 {
    rng.gen_range(1..=page_count.max(1))
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// No usable metadata (absent, unreadable, or an empty collection)
    Cold,
    /// Photo count no longer matches the recorded page count
    Stale { expected: u32, derived: u64 },
    /// Metadata is valid but the chosen page has expired
    Missing { page_number: u32 },
    /// Cached markup for the chosen page
    Hit { page_number: u32, markup: String },
}

/// Page cache over a [`CacheBackend`]
pub struct PageCache {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    ttl_secs: u32,
    op_timeout: Duration,
}

impl PageCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        namespace: impl Into<String>,
        ttl_secs: u32,
        op_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            ttl_secs,
            op_timeout,
        }
    }

    pub fn ttl_secs(&self) -> u32 {
        self.ttl_secs
    }

    /// Serve a random cached page if the cache is consistent
    pub async fn try_serve_cached(&self, page_size: u32) -> Option<(u32, String)> {
        match self.lookup(page_size).await {
            CacheLookup::Hit {
                page_number,
                markup,
            } => Some((page_number, markup)),
            _ => None,
        }
    }

    /// Check metadata, pick a random page and look it up
    pub async fn lookup(&self, page_size: u32) -> CacheLookup {
        self.lookup_with(page_size, |count| pick_page(&mut rand::thread_rng(), count))
            .await
    }

    /// [`lookup`](Self::lookup) with a caller-supplied page chooser
    pub async fn lookup_with<F>(&self, page_size: u32, choose_page: F) -> CacheLookup
    where
        F: FnOnce(u32) -> u32,
    {
        let expected = match self.valid_page_count(page_size).await {
            Ok(expected) => expected,
            Err(lookup) => return lookup,
        };

        let page_number = choose_page(expected);
        let key = PageKey::new(page_number, page_size).to_storage_key(&self.namespace);

        match self.guarded("get", self.backend.get(&key)).await {
            Some(Some(markup)) => {
                debug!(page = page_number, page_size, "Grid cache hit");
                CacheLookup::Hit {
                    page_number,
                    markup,
                }
            }
            Some(None) => {
                debug!(page = page_number, page_size, "Grid cache page missing");
                CacheLookup::Missing { page_number }
            }
            None => CacheLookup::Cold,
        }
    }

    /// Any cached page other than `exclude`, for when Flickr cannot be reached
    ///
    /// Metadata is checked again first, so a fallback page is never served
    /// from a stale cache. Up to [`FALLBACK_CANDIDATES`] random pages are tried
    /// in one multi-get.
    pub async fn fallback_page(&self, page_size: u32, exclude: u32) -> Option<(u32, String)> {
        let expected = self.valid_page_count(page_size).await.ok()?;

        let mut candidates: Vec<u32> = (1..=expected).filter(|&p| p != exclude).collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(FALLBACK_CANDIDATES);
        if candidates.is_empty() {
            return None;
        }

        let keys: Vec<String> = candidates
            .iter()
            .map(|&p| PageKey::new(p, page_size).to_storage_key(&self.namespace))
            .collect();
        let mut found = self.guarded("get_multi", self.backend.get_multi(&keys)).await?;

        candidates
            .into_iter()
            .zip(keys)
            .find_map(|(page_number, key)| found.remove(&key).map(|markup| (page_number, markup)))
    }

    /// Stored page count if the metadata is present and consistent at `page_size`
    async fn valid_page_count(&self, page_size: u32) -> Result<u32, CacheLookup> {
        let pages_key = page_count_key(&self.namespace);
        let photos_key = photo_count_key(&self.namespace);

        let Some(meta) = self
            .guarded("get_multi", self.backend.get_multi(&[pages_key.clone(), photos_key.clone()]))
            .await
        else {
            return Err(CacheLookup::Cold);
        };

        let (Some(expected), Some(total_photos)) = (
            meta.get(&pages_key).and_then(|v| v.trim().parse::<u32>().ok()),
            meta.get(&photos_key).and_then(|v| v.trim().parse::<u64>().ok()),
        ) else {
            debug!("Grid cache cold (metadata absent or partial)");
            return Err(CacheLookup::Cold);
        };

        if expected == 0 {
            return Err(CacheLookup::Cold);
        }

        let derived = derived_page_count(total_photos, page_size);
        if derived != u64::from(expected) {
            debug!(expected, derived, page_size, "Grid cache stale");
            return Err(CacheLookup::Stale { expected, derived });
        }

        Ok(expected)
    }

    /// Store a freshly rendered page and the totals seen with it
    pub async fn refresh_after_fetch(
        &self,
        page_number: u32,
        page_size: u32,
        markup: &str,
        total_pages: u32,
        total_photos: u64,
    ) {
        let mut entries = HashMap::new();
        entries.insert(
            PageKey::new(page_number, page_size).to_storage_key(&self.namespace),
            markup.to_string(),
        );
        entries.insert(page_count_key(&self.namespace), total_pages.to_string());
        entries.insert(photo_count_key(&self.namespace), total_photos.to_string());

        if self
            .guarded("set_multi", self.backend.set_multi(&entries, self.ttl_secs))
            .await
            .is_some()
        {
            debug!(
                page = page_number,
                page_size, total_pages, total_photos, "Grid cache refreshed"
            );
        }
    }

    /// Run a backend call under the operation timeout; failures become `None`
    async fn guarded<T, F>(&self, op: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, CacheBackendError>>,
    {
        let result = match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheBackendError::Timeout(self.op_timeout)),
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(op, error = %e, "Cache backend unavailable, treating as miss");
                None
            }
        }
    }
}
