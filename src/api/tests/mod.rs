use super::*;
use crate::downloader::test_helpers::{ScriptedExecutor, test_config};
use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


struct TestApp {
    router: Router,
    downloader: Arc<TubeDownloader>,
    executor: Arc<ScriptedExecutor>,
    _temp_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build an app from the test config after applying `adjust`
    async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = test_config(temp_dir.path());
        adjust(&mut config);

        let executor = ScriptedExecutor::new();
        let downloader = Arc::new(
            TubeDownloader::with_executor(config, executor.clone())
                .await
                .unwrap(),
        );
        let router = create_router(downloader.clone(), downloader.get_config());

        Self {
            router,
            downloader,
            executor,
            _temp_dir: temp_dir,
        }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body)).await
    }

    fn download_dir(&self) -> std::path::PathBuf {
        self.downloader.backend().download_dir().to_path_buf()
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let app = TestApp::new().await;

    let mut config = (*app.downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = app.downloader.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let app = TestApp::with_config(|c| c.server.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let layer = build_cors_layer(&["http://localhost:5173".to_string()]);
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(layer);

    let request = Request::builder()
        .uri("/")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_routes_live_under_api_v1() {
    let app = TestApp::new().await;

    assert_eq!(app.get("/api/v1/health").await.status(), StatusCode::OK);
    assert_eq!(app.get("/health").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let enabled = TestApp::new().await;
    let response = enabled.get("/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let disabled = TestApp::with_config(|c| c.server.api.swagger_ui = false).await;
    let response = disabled.get("/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_default_config_router_builds() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.tools.search_path = false;
    assert!(config.server.api.swagger_ui);

    let downloader = Arc::new(
        TubeDownloader::with_executor(config, ScriptedExecutor::new())
            .await
            .unwrap(),
    );
    let router = create_router(downloader.clone(), downloader.get_config());

    for uri in ["/api/v1/openapi.json", "/api-docs/openapi.json"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            json_body(response).await["info"]["title"],
            "offlinetube REST API"
        );
    }
}
