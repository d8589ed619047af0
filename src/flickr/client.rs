//! HTTP client for `flickr.photos.search`

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::response::parse_page;
use super::signing::sign_params;
use super::{PageFetchResult, PhotoSource, RemoteServiceError};
use crate::config::{ConfigError, Credentials, GridSettings};

/// API method used for every page fetch
pub const SEARCH_METHOD: &str = "flickr.photos.search";

/// Only public photos
const PRIVACY_FILTER: &str = "1";

/// The account identified by the auth token
const CURRENT_USER: &str = "me";

/// Flickr REST client
pub struct FlickrClient {
    endpoint: String,
    credentials: Credentials,
    http_client: reqwest::Client,
}

impl FlickrClient {
    /// Create a new client; `timeout` bounds each request end to end
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("photo-grid/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            credentials,
            http_client,
        })
    }

    /// Create from resolved settings
    pub fn from_settings(settings: &GridSettings) -> Result<Self, ConfigError> {
        Self::new(
            settings.flickr_endpoint.clone(),
            settings.credentials.clone(),
            settings.request_timeout,
        )
    }

    /// Full signed query for one page
    ///
    /// Parameter order here is irrelevant; signing sorts them.
    pub fn signed_query(&self, page_number: u32, page_size: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("method", SEARCH_METHOD.to_string()),
            ("page", page_number.to_string()),
            ("per_page", page_size.to_string()),
            ("privacy_filter", PRIVACY_FILTER.to_string()),
            ("user_id", CURRENT_USER.to_string()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
            ("api_key", self.credentials.api_key.clone()),
            ("auth_token", self.credentials.auth_token.clone()),
        ];
        let api_sig = sign_params(&self.credentials.secret, &params);
        params.push(("api_sig", api_sig));
        params
    }
}

#[async_trait]
impl PhotoSource for FlickrClient {
    async fn fetch_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<PageFetchResult, RemoteServiceError> {
        debug!(page = page_number, page_size, "Fetching Flickr page");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&self.signed_query(page_number, page_size))
            .send()
            .await
            .map_err(|e| RemoteServiceError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(page = page_number, status = %status, "Flickr returned an error status");
            return Err(RemoteServiceError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteServiceError::Transport(e.without_url().to_string()))?;

        let page = parse_page(&body, page_number)?;
        debug!(
            page = page.page_number,
            total_pages = page.total_pages,
            total_photos = page.total_photos,
            photos = page.photos.len(),
            "Fetched Flickr page"
        );
        Ok(page)
    }
}
