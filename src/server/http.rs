//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. The grid is served as an
//! HTML fragment for the host page to embed.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::service::GridService;

/// Shared application state
pub struct AppState {
    pub grid: GridService,
}

impl AppState {
    pub fn new(grid: GridService) -> Self {
        Self { grid }
    }
}

/// Liveness response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub cache_enabled: bool,
    pub rows: u32,
    pub cols: u32,
}

/// Accept connections on `listen` until the process exits
pub async fn run(state: Arc<AppState>, listen: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    serve(state, listener).await
}

/// Serve on an already bound listener
pub async fn serve(state: Arc<AppState>, listener: TcpListener) -> std::io::Result<()> {
    info!("photo-grid listening on {}", listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%addr, %method, %path, "Request");

    let response = match (method, path.as_str()) {
        (Method::GET, "/grid") => grid_response(state.grid.grid_markup_or_empty().await),
        (Method::GET, "/health") | (Method::GET, "/healthz") => health_response(&state),
        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Grid fragment; an unavailable grid is an empty body
fn grid_response(markup: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(markup)));
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response.headers_mut().insert(
        hyper::header::CACHE_CONTROL,
        hyper::header::HeaderValue::from_static("no-store"),
    );
    response
}

fn health_response(state: &AppState) -> Response<Full<Bytes>> {
    let dimensions = state.grid.dimensions();
    let body = HealthResponse {
        healthy: true,
        cache_enabled: state.grid.cache_enabled(),
        rows: dimensions.rows(),
        cols: dimensions.cols(),
    };
    let body = serde_json::to_string(&body).unwrap_or_else(|_| r#"{"healthy":true}"#.to_string());
    json_response(StatusCode::OK, body)
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "GET /grid for the photo grid"
    });
    json_response(StatusCode::NOT_FOUND, body.to_string())
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}
