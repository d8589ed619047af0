//! Flickr client against a local stand-in for the REST endpoint

mod common;

use std::time::Duration;

use common::spawn_fake_flickr;
use photo_grid::config::Credentials;
use photo_grid::flickr::{FlickrClient, PhotoSource, RemoteServiceError};

const PAGE_TWO: &str = r#"{"photos":{"page":2,"pages":3,"perpage":6,"total":"16","photo":[
    {"id":"7","owner":"owner@N00","secret":"a1","server":"11","farm":1,"title":"","ispublic":1,"isfriend":0,"isfamily":0},
    {"id":"8","owner":"owner@N00","secret":"b2","server":"12","farm":2,"title":"","ispublic":1,"isfriend":0,"isfamily":0}
]},"stat":"ok"}"#;

fn client(endpoint: String) -> FlickrClient {
    FlickrClient::new(
        endpoint,
        Credentials::new("KEY", "SECRET", "AUTH"),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_page_parses_photos() {
    let flickr = spawn_fake_flickr(200, PAGE_TWO).await;

    let page = client(flickr.endpoint()).fetch_page(2, 6).await.unwrap();
    assert_eq!(page.page_number, 2);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_photos, 16);
    assert_eq!(page.photos.len(), 2);
    assert_eq!(page.photos[1].photo_id, "8");
    assert_eq!(
        page.photos[0].thumbnail_url(),
        "http://farm1.static.flickr.com/11/7_a1_t.jpg"
    );
}

#[tokio::test]
async fn test_request_carries_signed_params() {
    let flickr = spawn_fake_flickr(200, PAGE_TWO).await;

    client(flickr.endpoint()).fetch_page(2, 6).await.unwrap();

    let queries = flickr.queries();
    assert_eq!(queries.len(), 1);
    let query = &queries[0];
    for expected in [
        "method=flickr.photos.search",
        "page=2",
        "per_page=6",
        "privacy_filter=1",
        "user_id=me",
        "api_key=KEY",
        "auth_token=AUTH",
        "api_sig=",
    ] {
        assert!(query.contains(expected), "{} missing from {}", expected, query);
    }
    assert!(!query.contains("SECRET"));
}

#[tokio::test]
async fn test_error_status() {
    let flickr = spawn_fake_flickr(500, "oops").await;

    assert_eq!(
        client(flickr.endpoint()).fetch_page(1, 6).await.unwrap_err(),
        RemoteServiceError::Status(500)
    );
}

#[tokio::test]
async fn test_missing_totals_is_malformed() {
    let flickr = spawn_fake_flickr(200, r#"{"photos":{"page":1,"photo":[]},"stat":"ok"}"#).await;

    assert!(matches!(
        client(flickr.endpoint()).fetch_page(1, 6).await,
        Err(RemoteServiceError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_api_failure() {
    let flickr = spawn_fake_flickr(200, r#"{"stat":"fail","code":98,"message":"Invalid auth token"}"#).await;

    assert!(matches!(
        client(flickr.endpoint()).fetch_page(1, 6).await,
        Err(RemoteServiceError::Api { code: 98, .. })
    ));
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let addr = common::spawn_silent_server().await;
    let client = FlickrClient::new(
        format!("http://{}/services/rest/", addr),
        Credentials::new("KEY", "SECRET", "AUTH"),
        Duration::from_millis(200),
    )
    .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), client.fetch_page(1, 6))
        .await
        .expect("request timeout must end the fetch");
    assert!(matches!(result, Err(RemoteServiceError::Transport(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let addr = common::closed_addr().await;

    assert!(matches!(
        client(format!("http://{}/services/rest/", addr)).fetch_page(1, 6).await,
        Err(RemoteServiceError::Transport(_))
    ));
}
