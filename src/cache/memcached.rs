//! memcached backend
//!
//! Speaks the memcached ASCII protocol over plain TCP. Each operation opens
//! its own connection per server it touches; keys are spread across servers by
//! a stable hash so every process sharing a server list agrees on placement.
//!
//! Commands used:
//!
//! ```text
//! get <key>*\r\n              -> (VALUE <key> <flags> <bytes>\r\n<data>\r\n)* END\r\n
//! set <key> 0 <exptime> <n>\r\n<data>\r\n -> STORED\r\n
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::debug;

use super::backend::{CacheBackend, CacheBackendError};

/// Longest key memcached accepts
pub const MAX_KEY_LENGTH: usize = 250;

/// Relative expirations longer than this are read by memcached as unix times
const MAX_RELATIVE_EXPIRY: u32 = 60 * 60 * 24 * 30;

/// memcached client over one or more servers
#[derive(Debug, Clone)]
pub struct MemcachedBackend {
    servers: Vec<String>,
    connect_timeout: Duration,
}

impl MemcachedBackend {
    /// Create a client for `servers` (`host:port`)
    pub fn new(servers: Vec<String>) -> Self {
        Self {
            servers,
            connect_timeout: Duration::from_millis(500),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Server responsible for `key`
    pub fn server_for(&self, key: &str) -> Result<&str, CacheBackendError> {
        if self.servers.is_empty() {
            return Err(CacheBackendError::Connect {
                server: String::new(),
                reason: "no cache servers configured".to_string(),
            });
        }
        let digest = Sha256::digest(key.as_bytes());
        let bucket = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        Ok(&self.servers[bucket as usize % self.servers.len()])
    }

    async fn connect(&self, server: &str) -> Result<BufStream<TcpStream>, CacheBackendError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(server))
            .await
            .map_err(|_| CacheBackendError::Connect {
                server: server.to_string(),
                reason: "connect timed out".to_string(),
            })?
            .map_err(|e| CacheBackendError::Connect {
                server: server.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true).ok();
        Ok(BufStream::new(stream))
    }

    /// Group keys by the server they live on
    fn partition<'a, I>(&self, keys: I) -> Result<HashMap<String, Vec<&'a str>>, CacheBackendError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut by_server: HashMap<String, Vec<&'a str>> = HashMap::new();
        for key in keys {
            validate_key(key)?;
            let server = self.server_for(key)?.to_string();
            by_server.entry(server).or_default().push(key);
        }
        Ok(by_server)
    }
}

#[async_trait]
impl CacheBackend for MemcachedBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        let mut found = self.get_multi(&[key.to_string()]).await?;
        Ok(found.remove(key))
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheBackendError> {
        let mut found = HashMap::new();
        for (server, server_keys) in self.partition(keys.iter().map(String::as_str))? {
            let mut conn = self.connect(&server).await?;
            let values = get_keys(&mut conn, &server_keys).await?;
            debug!(server = %server, requested = server_keys.len(), found = values.len(), "memcached get");
            found.extend(values);
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u32) -> Result<(), CacheBackendError> {
        validate_key(key)?;
        let server = self.server_for(key)?.to_string();
        let mut conn = self.connect(&server).await?;
        set_entries(&mut conn, &[(key, value)], ttl_secs).await
    }

    async fn set_multi(
        &self,
        entries: &HashMap<String, String>,
        ttl_secs: u32,
    ) -> Result<(), CacheBackendError> {
        let by_server = self.partition(entries.keys().map(String::as_str))?;
        for (server, server_keys) in by_server {
            let batch: Vec<(&str, &str)> = server_keys
                .iter()
                .map(|k| (*k, entries[*k].as_str()))
                .collect();
            let mut conn = self.connect(&server).await?;
            set_entries(&mut conn, &batch, ttl_secs).await?;
            debug!(server = %server, keys = batch.len(), "memcached set");
        }
        Ok(())
    }
}

/// Reject keys memcached cannot store
pub fn validate_key(key: &str) -> Result<(), CacheBackendError> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(CacheBackendError::InvalidKey(format!(
            "key length {} outside 1..={}",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    if key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(CacheBackendError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Expiration field for a `set` command
fn exptime(ttl_secs: u32) -> u64 {
    if ttl_secs <= MAX_RELATIVE_EXPIRY {
        return u64::from(ttl_secs);
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    now + u64::from(ttl_secs)
}

async fn get_keys<S>(conn: &mut S, keys: &[&str]) -> Result<HashMap<String, String>, CacheBackendError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let command = format!("get {}\r\n", keys.join(" "));
    conn.write_all(command.as_bytes()).await?;
    conn.flush().await?;

    let mut found = HashMap::new();
    loop {
        let line = read_line(conn).await?;
        if line == "END" {
            return Ok(found);
        }
        check_error(&line)?;

        let mut parts = line.split(' ');
        let (Some("VALUE"), Some(key), Some(_flags), Some(len)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CacheBackendError::Protocol(format!("unexpected line: {}", line)));
        };
        let len: usize = len
            .parse()
            .map_err(|_| CacheBackendError::Protocol(format!("bad value length: {}", len)))?;

        let mut data = vec![0u8; len + 2];
        conn.read_exact(&mut data).await?;
        if !data.ends_with(b"\r\n") {
            return Err(CacheBackendError::Protocol("value not terminated".to_string()));
        }
        data.truncate(len);
        let value = String::from_utf8(data)
            .map_err(|_| CacheBackendError::Protocol(format!("non UTF-8 value for {}", key)))?;
        found.insert(key.to_string(), value);
    }
}

/// Pipeline `set` commands and read one reply per command
async fn set_entries<S>(conn: &mut S, entries: &[(&str, &str)], ttl_secs: u32) -> Result<(), CacheBackendError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let expiry = exptime(ttl_secs);
    let mut command = Vec::new();
    for (key, value) in entries {
        command.extend_from_slice(format!("set {} 0 {} {}\r\n", key, expiry, value.len()).as_bytes());
        command.extend_from_slice(value.as_bytes());
        command.extend_from_slice(b"\r\n");
    }
    conn.write_all(&command).await?;
    conn.flush().await?;

    for (key, _) in entries {
        let line = read_line(conn).await?;
        match line.as_str() {
            "STORED" => {}
            "NOT_STORED" => {
                return Err(CacheBackendError::Server(format!("{} not stored", key)));
            }
            other => {
                check_error(other)?;
                return Err(CacheBackendError::Protocol(format!("unexpected reply: {}", other)));
            }
        }
    }
    Ok(())
}

async fn read_line<S>(conn: &mut S) -> Result<String, CacheBackendError>
where
    S: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if conn.read_line(&mut line).await? == 0 {
        return Err(CacheBackendError::Protocol("connection closed".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn check_error(line: &str) -> Result<(), CacheBackendError> {
    if line == "ERROR" {
        return Err(CacheBackendError::Server("unknown command".to_string()));
    }
    if let Some(msg) = line
        .strip_prefix("CLIENT_ERROR ")
        .or_else(|| line.strip_prefix("SERVER_ERROR "))
    {
        return Err(CacheBackendError::Server(msg.to_string()));
    }
    Ok(())
}
