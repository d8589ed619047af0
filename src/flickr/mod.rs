//! Flickr REST client
//!
//! Fetches one page of `flickr.photos.search` results for the authenticated
//! account. The service layer only sees the [`PhotoSource`] trait, so tests can
//! script page results without a network.

pub mod client;
pub mod response;
pub mod signing;

use async_trait::async_trait;

pub use client::FlickrClient;
pub use response::parse_page;
pub use signing::{flatten_params, sign_params};

/// Base URL for photo permalinks
pub const PHOTO_LINK_BASE: &str = "http://www.flickr.com/photos";

/// One photo as returned by a search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub owner_id: String,
    pub photo_id: String,
    pub farm_id: String,
    pub server_id: String,
    pub secret: String,
}

impl PhotoRecord {
    /// Canonical page for this photo on flickr.com
    pub fn permalink_url(&self) -> String {
        format!("{}/{}/{}/", PHOTO_LINK_BASE, self.owner_id, self.photo_id)
    }

    /// Small (100px) thumbnail image
    pub fn thumbnail_url(&self) -> String {
        format!(
            "http://farm{}.static.flickr.com/{}/{}_{}_t.jpg",
            self.farm_id, self.server_id, self.photo_id, self.secret
        )
    }
}

/// A single page of search results
///
/// `total_pages` and `total_photos` describe the whole collection at the
/// moment of the fetch, not just this page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetchResult {
    pub page_number: u32,
    pub total_pages: u32,
    pub total_photos: u64,
    pub photos: Vec<PhotoRecord>,
}

/// Errors talking to the photo service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteServiceError {
    /// Connection, timeout or body read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The service answered with `stat: fail`
    #[error("Flickr API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Source of photo pages
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Fetch `page_number` with `page_size` photos per page
    async fn fetch_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<PageFetchResult, RemoteServiceError>;
}
