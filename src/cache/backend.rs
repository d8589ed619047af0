//! Cache backend abstraction
//!
//! A narrow key-value interface with per-entry TTLs, modelled on the memcached
//! command set. `PageCache` is the only caller.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error types for cache backend operations
#[derive(Debug, Error)]
pub enum CacheBackendError {
    /// Could not reach any server for the key
    #[error("Connection failed to {server}: {reason}")]
    Connect { server: String, reason: String },

    /// I/O failure mid-command
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected reply from the server
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server rejected the command
    #[error("Server error: {0}")]
    Server(String),

    /// Key not storable by the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The operation did not finish in time
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Key-value store with TTLs
///
/// A TTL of 0 means the entry does not expire.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError>;

    /// Fetch several keys; absent keys are missing from the result
    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheBackendError>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u32) -> Result<(), CacheBackendError>;

    async fn set_multi(
        &self,
        entries: &HashMap<String, String>,
        ttl_secs: u32,
    ) -> Result<(), CacheBackendError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process cache backend
///
/// Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all live entries
    pub fn snapshot(&self) -> HashMap<String, String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.value().is_live(now))
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect()
    }

    fn read(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .map(|e| (e.is_live(now), e.value.clone()));

        match value {
            Some((true, v)) => Some(v),
            Some((false, _)) => {
                self.entries.remove_if(key, |_, e| !e.is_live(now));
                None
            }
            None => None,
        }
    }

    fn write(&self, key: &str, value: &str, ttl_secs: u32) {
        let expires_at = if ttl_secs == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(u64::from(ttl_secs)))
        };
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        Ok(self.read(key))
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheBackendError> {
        Ok(keys
            .iter()
            .filter_map(|k| self.read(k).map(|v| (k.clone(), v)))
            .collect())
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u32) -> Result<(), CacheBackendError> {
        self.write(key, value, ttl_secs);
        Ok(())
    }

    async fn set_multi(
        &self,
        entries: &HashMap<String, String>,
        ttl_secs: u32,
    ) -> Result<(), CacheBackendError> {
        for (key, value) in entries {
            self.write(key, value, ttl_secs);
        }
        Ok(())
    }
}
