use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use cdp_adapter::{AdapterError, AdapterErrorKind};
use serde_json::Value;
use statgrab::server::{build_router, ServeState};
use statgrab::{ExtractionError, RenderError, StatisticsRecord, StatisticsSource};
use tower::ServiceExt;

const SECRET: &str = "s3cret";

#[derive(Default)]
struct FakeSource {
    fail: bool,
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl StatisticsSource for FakeSource {
    async fn extract_statistics(&self, url: &str) -> Result<StatisticsRecord, ExtractionError> {
        self.seen.lock().unwrap().push(url.to_string());
        if self.fail {
            let cause = AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint("document not ready within 45000ms");
            return Err(RenderError::Navigation(cause).into());
        }
        let mut record = StatisticsRecord::default();
        record.kills = 1200.0;
        record.deaths = 400.0;
        record.hs_percent = 22.5;
        record.finalize_ratio();
        record.best_class = Some("Assault".into());
        record.time_played = "12h".into();
        Ok(record)
    }
}

fn router(source: Arc<FakeSource>, api_key: Option<&str>) -> Router {
    build_router(ServeState::new(source, api_key.map(str::to_string)))
}

async fn get(router: Router, uri: &str, key: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    let response = router
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn scrape_returns_record_in_camel_case() {
    let source = Arc::new(FakeSource::default());
    let (status, body) = get(
        router(source.clone(), Some(SECRET)),
        "/scrape?url=https%3A%2F%2Ftracker.example%2Fprofile%2F42",
        Some(SECRET),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["kills"], 1200);
    assert_eq!(body["killDeath"], 3);
    assert_eq!(body["hsPercent"], 22.5);
    assert_eq!(body["bestClass"], "Assault");
    assert_eq!(body["timePlayed"], "12h");
    assert_eq!(
        source.seen.lock().unwrap().as_slice(),
        ["https://tracker.example/profile/42"]
    );
}

#[tokio::test]
async fn wrong_or_missing_key_is_unauthorized() {
    for key in [None, Some("nope")] {
        let source = Arc::new(FakeSource::default());
        let (status, body) = get(
            router(source.clone(), Some(SECRET)),
            "/scrape?url=https%3A%2F%2Ftracker.example%2Fp",
            key,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json(&body)["error"], "Unauthorized");
        assert!(source.seen.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn unconfigured_secret_rejects_everything() {
    let (status, _) = get(
        router(Arc::new(FakeSource::default()), None),
        "/scrape?url=https%3A%2F%2Ftracker.example%2Fp",
        Some(""),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_is_checked_before_url() {
    let (status, _) = get(router(Arc::new(FakeSource::default()), Some(SECRET)), "/scrape", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_url_is_bad_request() {
    for uri in ["/scrape", "/scrape?url=", "/scrape?page=1"] {
        let (status, body) = get(
            router(Arc::new(FakeSource::default()), Some(SECRET)),
            uri,
            Some(SECRET),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json(&body)["error"], "url is required");
    }
}

#[tokio::test]
async fn malformed_url_is_bad_request() {
    let source = Arc::new(FakeSource::default());
    let (status, _) = get(
        router(source.clone(), Some(SECRET)),
        "/scrape?url=javascript%3Aalert(1)",
        Some(SECRET),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(source.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn extraction_failure_is_reported_with_details() {
    let source = Arc::new(FakeSource {
        fail: true,
        ..FakeSource::default()
    });
    let (status, body) = get(
        router(source, Some(SECRET)),
        "/scrape?url=https%3A%2F%2Ftracker.example%2Fp",
        Some(SECRET),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_eq!(body["error"], "Scraping failed");
    assert_eq!(
        body["details"],
        "navigation failed: navigation timed out: document not ready within 45000ms"
    );
}

#[tokio::test]
async fn health_and_metrics_are_open() {
    let source = Arc::new(FakeSource::default());
    let (status, body) = get(router(source.clone(), Some(SECRET)), "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");

    let (status, body) = get(router(source, Some(SECRET)), "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("statgrab_"));
}
