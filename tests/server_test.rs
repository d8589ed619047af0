//! HTTP surface over a scripted photo source

mod common;

use std::sync::Arc;

use common::ScriptedSource;
use photo_grid::flickr::{PhotoSource, RemoteServiceError};
use photo_grid::server::{serve, AppState};
use photo_grid::{GridDimensions, GridService};
use tokio::net::TcpListener;

async fn start(source: Arc<ScriptedSource>) -> String {
    let source: Arc<dyn PhotoSource> = source;
    let grid = GridService::new(source, None, GridDimensions::new(2, 3).unwrap());
    let state = Arc::new(AppState::new(grid));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(state, listener));
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_grid_endpoint() {
    let base = start(Arc::new(ScriptedSource::new(16))).await;

    let response = reqwest::get(format!("{}/grid", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    let body = response.text().await.unwrap();
    assert!(body.starts_with("<tr><td><a href=\"http://www.flickr.com/photos/"));
}

#[tokio::test]
async fn test_grid_endpoint_empty_when_unavailable() {
    let source = Arc::new(ScriptedSource::new(16));
    source.fail_with(RemoteServiceError::Transport("timed out".to_string()));
    let base = start(source).await;

    let response = reqwest::get(format!("{}/grid", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = start(Arc::new(ScriptedSource::new(0))).await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["healthy"], true);
    assert_eq!(body["cache_enabled"], false);
    assert_eq!(body["rows"], 2);
    assert_eq!(body["cols"], 3);
}

#[tokio::test]
async fn test_unknown_path() {
    let base = start(Arc::new(ScriptedSource::new(0))).await;

    let response = reqwest::get(format!("{}/nope", base)).await.unwrap();
    assert_eq!(response.status(), 404);
}
