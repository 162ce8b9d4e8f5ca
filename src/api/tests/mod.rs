use super::*;
use crate::downloader::test_helpers::{MockSource, create_test_downloader_with};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tower::ServiceExt;


struct TestApp {
    router: Router,
    downloader: Downloader,
    watchers: Watchers,
    _temp_dir: tempfile::TempDir,
}

impl TestApp {
    async fn get(&self, uri: &str) -> axum::response::Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(&self, uri: &str, body: serde_json::Value) -> axum::response::Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Router over a downloader with a [`MockSource`] and no running workers
async fn create_test_app(configure: impl FnOnce(&mut Config)) -> TestApp {
    let (downloader, temp_dir) = create_test_downloader_with(MockSource::new(), configure).await;
    let watchers = Watchers::new(downloader.clone()).unwrap();
    let router = create_router(downloader.clone(), watchers.clone(), downloader.get_config());
    TestApp {
        router,
        downloader,
        watchers,
        _temp_dir: temp_dir,
    }
}

async fn json_body<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns_and_stops() {
    let (downloader, _temp_dir) = create_test_downloader_with(MockSource::new(), |_| {}).await;
    let watchers = Watchers::new(downloader.clone()).unwrap();

    let mut config = (*downloader.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(start_api_server(
        downloader,
        watchers,
        Arc::new(config),
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = create_test_app(|c| c.api.cors_enabled = true).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let app = create_test_app(|c| c.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_download_dir_is_served() {
    let app = create_test_app(|_| {}).await;
    let cover_dir = app.downloader.get_config().cover_dir();
    std::fs::create_dir_all(&cover_dir).unwrap();
    std::fs::write(cover_dir.join("BV1x.jpg"), b"jpeg-bytes").unwrap();

    let response = app.get("/downloads/covers/BV1x.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"jpeg-bytes");

    let missing = app.get("/downloads/covers/BV1none.jpg").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
