//! Shared test fakes

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use photo_grid::cache::{derived_page_count, CacheBackend, CacheBackendError};
use photo_grid::flickr::{PageFetchResult, PhotoRecord, PhotoSource, RemoteServiceError};

/// Photo source backed by a synthetic collection of `total` photos
pub struct ScriptedSource {
    total_photos: AtomicU64,
    calls: Mutex<Vec<(u32, u32)>>,
    failure: Mutex<Option<RemoteServiceError>>,
}

impl ScriptedSource {
    pub fn new(total_photos: u64) -> Self {
        Self {
            total_photos: AtomicU64::new(total_photos),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn set_total(&self, total_photos: u64) {
        self.total_photos.store(total_photos, Ordering::SeqCst);
    }

    pub fn fail_with(&self, err: RemoteServiceError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    /// `(page_number, page_size)` of every fetch so far
    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn photo(index: u64) -> PhotoRecord {
    PhotoRecord {
        owner_id: "owner@N00".to_string(),
        photo_id: (index + 1).to_string(),
        farm_id: "1".to_string(),
        server_id: "2".to_string(),
        secret: "s".to_string(),
    }
}

#[async_trait]
impl PhotoSource for ScriptedSource {
    async fn fetch_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<PageFetchResult, RemoteServiceError> {
        self.calls.lock().unwrap().push((page_number, page_size));
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let total = self.total_photos.load(Ordering::SeqCst);
        let total_pages = derived_page_count(total, page_size) as u32;
        let start = u64::from(page_number - 1) * u64::from(page_size);
        let end = (start + u64::from(page_size)).min(total);
        let photos = (start..end).map(photo).collect();

        Ok(PageFetchResult {
            page_number,
            total_pages,
            total_photos: total,
            photos,
        })
    }
}

/// Backend whose server is always down
pub struct FailingBackend;

fn refused() -> CacheBackendError {
    CacheBackendError::Connect {
        server: "127.0.0.1:11211".to_string(),
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl CacheBackend for FailingBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheBackendError> {
        Err(refused())
    }

    async fn get_multi(&self, _keys: &[String]) -> Result<HashMap<String, String>, CacheBackendError> {
        Err(refused())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: u32) -> Result<(), CacheBackendError> {
        Err(refused())
    }

    async fn set_multi(
        &self,
        _entries: &HashMap<String, String>,
        _ttl: u32,
    ) -> Result<(), CacheBackendError> {
        Err(refused())
    }
}

/// Backend that never answers
pub struct HangingBackend;

#[async_trait]
impl CacheBackend for HangingBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheBackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn get_multi(&self, _keys: &[String]) -> Result<HashMap<String, String>, CacheBackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(HashMap::new())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: u32) -> Result<(), CacheBackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn set_multi(
        &self,
        _entries: &HashMap<String, String>,
        _ttl: u32,
    ) -> Result<(), CacheBackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// A canned HTTP endpoint standing in for the Flickr REST API
pub struct FakeFlickr {
    pub addr: SocketAddr,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeFlickr {
    pub fn endpoint(&self) -> String {
        format!("http://{}/services/rest/", self.addr)
    }

    /// Raw query strings received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

pub async fn spawn_fake_flickr(status: u16, body: &'static str) -> FakeFlickr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let queries = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&queries);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let recorded = Arc::clone(&recorded);
                    async move {
                        recorded
                            .lock()
                            .unwrap()
                            .push(req.uri().query().unwrap_or_default().to_string());
                        let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
                        *response.status_mut() = StatusCode::from_u16(status).unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    FakeFlickr { addr, queries }
}

/// Minimal memcached speaking `get` and `set`; expirations are ignored
pub async fn spawn_fake_memcached() -> (SocketAddr, Arc<Mutex<HashMap<String, String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Arc::new(Mutex::new(HashMap::<String, String>::new()));

    let shared = Arc::clone(&store);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let store = Arc::clone(&shared);
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut read = BufReader::new(read);
                loop {
                    let mut line = String::new();
                    if read.read_line(&mut line).await.unwrap_or(0) == 0 {
                        break;
                    }
                    let parts: Vec<String> =
                        line.split_whitespace().map(str::to_string).collect();
                    let reply = match parts.first().map(String::as_str) {
                        Some("get") => {
                            let mut out = String::new();
                            let store = store.lock().unwrap();
                            for key in &parts[1..] {
                                if let Some(value) = store.get(key) {
                                    out.push_str(&format!("VALUE {} 0 {}\r\n{}\r\n", key, value.len(), value));
                                }
                            }
                            out.push_str("END\r\n");
                            out
                        }
                        Some("set") if parts.len() == 5 => {
                            let len: usize = parts[4].parse().unwrap();
                            let mut data = vec![0u8; len + 2];
                            if read.read_exact(&mut data).await.is_err() {
                                break;
                            }
                            data.truncate(len);
                            store
                                .lock()
                                .unwrap()
                                .insert(parts[1].clone(), String::from_utf8(data).unwrap());
                            "STORED\r\n".to_string()
                        }
                        _ => "ERROR\r\n".to_string(),
                    };
                    if write.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, store)
}

/// Accepts connections and never answers
pub async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// An address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
