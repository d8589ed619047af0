//! Grid service
//!
//! Produces the markup for one random page of photos. With caching enabled the
//! page cache is consulted first; on any miss the page is fetched and rendered
//! fresh, then written back.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{page_cache_from_settings, pick_page, CacheLookup, PageCache};
use crate::config::{ConfigError, GridDimensions, GridSettings};
use crate::flickr::{FlickrClient, PageFetchResult, PhotoSource};
use crate::render::render;
use crate::types::Result;

/// Picks a page number in `[1, count]`
pub type PageChooser = Arc<dyn Fn(u32) -> u32 + Send + Sync>;

/// A freshly fetched and rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderedPage {
    page_number: u32,
    markup: String,
    total_pages: u32,
    total_photos: u64,
}

/// Random photo grid service
pub struct GridService {
    source: Arc<dyn PhotoSource>,
    cache: Option<PageCache>,
    dimensions: GridDimensions,
    choose_page: PageChooser,
}

impl GridService {
    /// Create a service; `cache: None` disables caching
    pub fn new(
        source: Arc<dyn PhotoSource>,
        cache: Option<PageCache>,
        dimensions: GridDimensions,
    ) -> Self {
        Self {
            source,
            cache,
            dimensions,
            choose_page: Arc::new(|count| pick_page(&mut rand::thread_rng(), count)),
        }
    }

    /// Create the production service: Flickr client plus configured cache
    pub fn from_settings(settings: &GridSettings) -> std::result::Result<Self, ConfigError> {
        let source = Arc::new(FlickrClient::from_settings(settings)?);
        let cache = page_cache_from_settings(&settings.cache);

        info!(
            rows = settings.dimensions.rows(),
            cols = settings.dimensions.cols(),
            cache_enabled = cache.is_some(),
            "Grid service created"
        );

        Ok(Self::new(source, cache, settings.dimensions))
    }

    /// Replace the random page chooser
    pub fn with_page_chooser<F>(mut self, choose_page: F) -> Self
    where
        F: Fn(u32) -> u32 + Send + Sync + 'static,
    {
        self.choose_page = Arc::new(choose_page);
        self
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Markup for one random page of photos
    pub async fn grid_markup(&self) -> Result<String> {
        let page_size = self.dimensions.page_size();

        let Some(cache) = &self.cache else {
            return Ok(self.fresh_markup().await?.0);
        };

        match cache.lookup_with(page_size, |count| self.choose(count)).await {
            CacheLookup::Hit { markup, .. } => Ok(markup),
            CacheLookup::Missing { page_number } => self.refill_page(cache, page_number).await,
            CacheLookup::Cold | CacheLookup::Stale { .. } => self.refresh_cache(cache).await,
        }
    }

    /// Markup for the host page; failures are logged and render as nothing
    pub async fn grid_markup_or_empty(&self) -> String {
        match self.grid_markup().await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(error = %e, "No photo grid available");
                String::new()
            }
        }
    }

    fn choose(&self, count: u32) -> u32 {
        (self.choose_page)(count).clamp(1, count.max(1))
    }

    /// Fetch page 1 for totals, then a random page
    ///
    /// Returns the markup plus the rendered page when there is one worth
    /// caching (an empty collection renders only the opening row).
    async fn fresh_markup(&self) -> Result<(String, Option<RenderedPage>)> {
        let page_size = self.dimensions.page_size();
        let first = self.source.fetch_page(1, page_size).await?;

        if first.total_pages == 0 {
            debug!("Photo collection is empty");
            return Ok((render(&[], self.dimensions.cols()), None));
        }

        let page_number = self.choose(first.total_pages);
        let page = if page_number == 1 {
            first
        } else {
            self.source.fetch_page(page_number, page_size).await?
        };

        let rendered = self.render_page(page_number, page);
        Ok((rendered.markup.clone(), Some(rendered)))
    }

    /// Fresh fetch whose result replaces the cached totals
    async fn refresh_cache(&self, cache: &PageCache) -> Result<String> {
        let (markup, rendered) = self.fresh_markup().await?;
        if let Some(page) = rendered {
            self.store(cache, &page).await;
        }
        Ok(markup)
    }

    /// Fetch a single expired page whose metadata is still valid
    ///
    /// If Flickr fails, another cached page is served instead.
    async fn refill_page(&self, cache: &PageCache, page_number: u32) -> Result<String> {
        let page_size = self.dimensions.page_size();
        let page = match self.source.fetch_page(page_number, page_size).await {
            Ok(page) => page,
            Err(e) => {
                return match cache.fallback_page(page_size, page_number).await {
                    Some((fallback, markup)) => {
                        warn!(
                            page = page_number,
                            fallback,
                            error = %e,
                            "Page refetch failed, serving another cached page"
                        );
                        Ok(markup)
                    }
                    None => Err(e.into()),
                };
            }
        };

        if page.total_pages == 0 {
            return Ok(render(&[], self.dimensions.cols()));
        }

        if page_number > page.total_pages {
            debug!(
                page = page_number,
                total_pages = page.total_pages,
                "Collection shrank past cached page, refetching totals"
            );
            return self.refresh_cache(cache).await;
        }

        let rendered = self.render_page(page_number, page);
        self.store(cache, &rendered).await;
        Ok(rendered.markup)
    }

    fn render_page(&self, page_number: u32, page: PageFetchResult) -> RenderedPage {
        RenderedPage {
            page_number,
            markup: render(&page.photos, self.dimensions.cols()),
            total_pages: page.total_pages,
            total_photos: page.total_photos,
        }
    }

    async fn store(&self, cache: &PageCache, page: &RenderedPage) {
        cache
            .refresh_after_fetch(
                page.page_number,
                self.dimensions.page_size(),
                &page.markup,
                page.total_pages,
                page.total_photos,
            )
            .await;
    }
}
