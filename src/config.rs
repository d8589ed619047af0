//! Configuration for photo-grid
//!
//! CLI arguments and environment variable handling using clap. `Args` is
//! parsed once at startup and validated into [`GridSettings`], which is what
//! the library components consume.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cache::{validate_key, PageKey};

/// Default number of grid rows
pub const DEFAULT_NR_ROWS: u32 = 2;

/// Default number of grid columns
pub const DEFAULT_NR_COLS: u32 = 3;

/// Largest `per_page` Flickr serves
pub const MAX_PAGE_SIZE: u32 = 500;

/// Default Flickr REST endpoint
pub const DEFAULT_FLICKR_ENDPOINT: &str = "https://api.flickr.com/services/rest/";

/// Default memcached server list
pub const DEFAULT_CACHE_SERVERS: &str = "127.0.0.1:11211";

/// `CACHE_SERVERS` value selecting the in-process cache backend
pub const MEMORY_CACHE_SERVERS: &str = "memory";

/// photo-grid - random photo grid from your Flickr account
#[derive(Parser, Debug, Clone)]
#[command(name = "photo-grid")]
#[command(about = "Render a random page of your Flickr photos as an HTML table grid")]
pub struct Args {
    /// Flickr API key
    #[arg(long, env = "FLICKR_KEY")]
    pub flickr_key: Option<String>,

    /// Flickr API shared secret
    #[arg(long, env = "FLICKR_SECRET", hide_env_values = true)]
    pub flickr_secret: Option<String>,

    /// Flickr auth token for the account whose photos are shown
    #[arg(long, env = "FLICKR_AUTH", hide_env_values = true)]
    pub flickr_auth: Option<String>,

    /// Number of table rows in the grid
    #[arg(long, env = "FLICKR_NR_ROWS", default_value_t = DEFAULT_NR_ROWS)]
    pub flickr_nr_rows: u32,

    /// Number of table columns in the grid
    #[arg(long, env = "FLICKR_NR_COLS", default_value_t = DEFAULT_NR_COLS)]
    pub flickr_nr_cols: u32,

    /// Flickr REST endpoint
    #[arg(long, env = "FLICKR_ENDPOINT", default_value = DEFAULT_FLICKR_ENDPOINT)]
    pub flickr_endpoint: String,

    /// Request timeout for Flickr calls in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Cache rendered grids between requests
    #[arg(long, env = "CACHE_ENABLED", default_value = "false")]
    pub cache_enabled: bool,

    /// Cache entry lifetime in seconds (0 = never expire)
    #[arg(long, env = "CACHE_TIMEOUT", default_value = "0")]
    pub cache_timeout: u32,

    /// Comma-separated memcached servers (host:port), or "memory"
    #[arg(long, env = "CACHE_SERVERS", default_value = DEFAULT_CACHE_SERVERS)]
    pub cache_servers: String,

    /// Prefix for every cache key
    #[arg(long, env = "CACHE_NAMESPACE", default_value = "photo-grid")]
    pub cache_namespace: String,

    /// Timeout for a single cache round trip in milliseconds
    #[arg(long, env = "CACHE_OP_TIMEOUT_MS", default_value = "500")]
    pub cache_op_timeout_ms: u64,

    /// Serve the grid over HTTP on this address instead of printing it once
    #[arg(long, env = "LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get the list of cache servers
    pub fn cache_server_list(&self) -> Vec<String> {
        self.cache_servers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings().map(|_| ())
    }

    /// Resolve validated settings
    pub fn settings(&self) -> Result<GridSettings, ConfigError> {
        let credentials = Credentials::new(
            required(&self.flickr_key, "FLICKR_KEY")?,
            required(&self.flickr_secret, "FLICKR_SECRET")?,
            required(&self.flickr_auth, "FLICKR_AUTH")?,
        );
        let dimensions = GridDimensions::new(self.flickr_nr_rows, self.flickr_nr_cols)?;

        let namespace = self.cache_namespace.trim();
        validate_key(&PageKey::new(u32::MAX, MAX_PAGE_SIZE).to_storage_key(namespace))
            .map_err(|_| ConfigError::InvalidNamespace(self.cache_namespace.clone()))?;

        let servers = self.cache_server_list();
        let backend = if servers.len() == 1 && servers[0] == MEMORY_CACHE_SERVERS {
            CacheBackendKind::Memory
        } else if servers.is_empty() {
            CacheBackendKind::Memcached(vec![DEFAULT_CACHE_SERVERS.to_string()])
        } else {
            CacheBackendKind::Memcached(servers)
        };

        Ok(GridSettings {
            credentials,
            dimensions,
            flickr_endpoint: self.flickr_endpoint.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            cache: CacheSettings {
                enabled: self.cache_enabled,
                ttl_secs: self.cache_timeout,
                backend,
                namespace: namespace.to_string(),
                op_timeout: Duration::from_millis(self.cache_op_timeout_ms),
            },
        })
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}

/// Configuration errors, reported once at startup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingCredential(&'static str),

    #[error("grid dimensions must be positive, got {rows}x{cols}")]
    InvalidDimension { rows: u32, cols: u32 },

    #[error("grid of {rows}x{cols} exceeds {max} photos per page", max = MAX_PAGE_SIZE)]
    PageTooLarge { rows: u32, cols: u32 },

    #[error("cache namespace {0:?} does not form valid cache keys")]
    InvalidNamespace(String),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Flickr API credentials
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub auth_token: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
            auth_token: auth_token.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// Rows and columns of the rendered grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    rows: u32,
    cols: u32,
}

impl GridDimensions {
    pub fn new(rows: u32, cols: u32) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::InvalidDimension { rows, cols });
        }
        match rows.checked_mul(cols) {
            Some(size) if size <= MAX_PAGE_SIZE => Ok(Self { rows, cols }),
            _ => Err(ConfigError::PageTooLarge { rows, cols }),
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Photos per remote page
    pub fn page_size(&self) -> u32 {
        self.rows * self.cols
    }
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_NR_ROWS,
            cols: DEFAULT_NR_COLS,
        }
    }
}

/// Which cache backend to talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// memcached servers as `host:port`
    Memcached(Vec<String>),
    /// In-process store
    Memory,
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Entry TTL in seconds; 0 never expires
    pub ttl_secs: u32,
    pub backend: CacheBackendKind,
    pub namespace: String,
    pub op_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 0,
            backend: CacheBackendKind::Memcached(vec![DEFAULT_CACHE_SERVERS.to_string()]),
            namespace: "photo-grid".to_string(),
            op_timeout: Duration::from_millis(500),
        }
    }
}

/// Validated settings for one grid service
#[derive(Debug, Clone)]
pub struct GridSettings {
    pub credentials: Credentials,
    pub dimensions: GridDimensions,
    pub flickr_endpoint: String,
    pub request_timeout: Duration,
    pub cache: CacheSettings,
}

impl GridSettings {
    /// Settings with defaults for everything but credentials
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            dimensions: GridDimensions::default(),
            flickr_endpoint: DEFAULT_FLICKR_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(10),
            cache: CacheSettings::default(),
        }
    }
}
