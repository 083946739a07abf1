// Status classifier: remote pass-through and the load-threshold fallback

mod common;

use axum::{Json, Router, http::StatusCode, routing::post};
use fleet::classifier::{ClassifyError, StatusClassifier, fallback_status};
use fleet::models::{Status, TelemetrySnapshot};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(500);

fn with_load(load: f64) -> TelemetrySnapshot {
    TelemetrySnapshot {
        load,
        ..TelemetrySnapshot::default()
    }
}

#[test]
fn fallback_threshold_boundaries() {
    let capacity = 100.0;
    let threshold = 0.8 * capacity;
    assert_eq!(fallback_status(&with_load(threshold), capacity), Status::Present);
    assert_eq!(
        fallback_status(&with_load(threshold - 1e-9), capacity),
        Status::NotPresent
    );
    assert_eq!(fallback_status(&with_load(85.0), capacity), Status::Present);
    assert_eq!(fallback_status(&with_load(79.0), capacity), Status::NotPresent);
    assert_eq!(fallback_status(&with_load(100.0), capacity), Status::Present);
    assert_eq!(fallback_status(&with_load(0.0), capacity), Status::NotPresent);
}

#[test]
fn fallback_scales_with_capacity() {
    assert_eq!(fallback_status(&with_load(40.0), 50.0), Status::Present);
    assert_eq!(fallback_status(&with_load(39.0), 50.0), Status::NotPresent);
}

#[tokio::test]
async fn remote_status_is_used_when_available() {
    let url = common::predict_stub(serde_json::json!({ "status": "Failure Present" })).await;
    let classifier = StatusClassifier::new(url, TIMEOUT).unwrap();
    // Local rule would say NotPresent for load 0; the remote answer wins.
    assert_eq!(classifier.classify(&with_load(0.0), 100.0).await, Status::Present);
}

#[tokio::test]
async fn unknown_remote_status_passes_through() {
    let url = common::predict_stub(serde_json::json!({ "status": "Inspect Soon" })).await;
    let classifier = StatusClassifier::new(url, TIMEOUT).unwrap();
    assert_eq!(
        classifier.classify(&with_load(90.0), 100.0).await,
        Status::Other("Inspect Soon".into())
    );
}

#[tokio::test]
async fn short_remote_status_is_echoed_unchanged() {
    let url = common::predict_stub(serde_json::json!({ "status": "Present" })).await;
    let classifier = StatusClassifier::new(url, TIMEOUT).unwrap();
    let status = classifier.classify(&with_load(0.0), 100.0).await;
    assert_eq!(status, Status::Other("Present".into()));
    assert_eq!(serde_json::to_value(&status).unwrap(), serde_json::json!("Present"));
}

#[tokio::test]
async fn remote_receives_all_seven_features() {
    let app = Router::new().route(
        "/predict",
        post(|Json(body): Json<serde_json::Value>| async move {
            let fields = [
                "voltage",
                "current",
                "temperature",
                "load",
                "time_since_maintenance",
                "moisture_level",
                "lightning_surge",
            ];
            let complete = fields.iter().all(|f| body.get(*f).is_some_and(|v| v.is_number()));
            let status = if complete { "Failure Not Present" } else { "incomplete" };
            Json(serde_json::json!({ "status": status }))
        }),
    );
    let url = format!("http://{}/predict", common::serve(app).await);
    let classifier = StatusClassifier::new(url, TIMEOUT).unwrap();
    assert_eq!(classifier.classify(&with_load(95.0), 100.0).await, Status::NotPresent);
}

#[tokio::test]
async fn unreachable_service_falls_back() {
    let url = format!("http://{}/predict", common::closed_addr().await);
    let classifier = StatusClassifier::new(url.as_str(), TIMEOUT).unwrap();
    let err = classifier.predict(&url, &with_load(85.0)).await.unwrap_err();
    assert!(matches!(err, ClassifyError::Request(_)));
    assert_eq!(classifier.classify(&with_load(85.0), 100.0).await, Status::Present);
    assert_eq!(classifier.classify(&with_load(79.0), 100.0).await, Status::NotPresent);
}

#[tokio::test]
async fn error_response_falls_back() {
    let app = Router::new().route(
        "/predict",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Missing columns: ['load']" })),
            )
        }),
    );
    let url = format!("http://{}/predict", common::serve(app).await);
    let classifier = StatusClassifier::new(url, TIMEOUT).unwrap();
    assert_eq!(classifier.classify(&with_load(85.0), 100.0).await, Status::Present);
}

#[tokio::test]
async fn malformed_response_falls_back() {
    let app = Router::new().route("/predict", post(|| async { "definitely not json" }));
    let url = format!("http://{}/predict", common::serve(app).await);
    let classifier = StatusClassifier::new(url, TIMEOUT).unwrap();
    assert_eq!(classifier.classify(&with_load(10.0), 100.0).await, Status::NotPresent);
}

#[tokio::test]
async fn response_without_status_falls_back() {
    let url = common::predict_stub(serde_json::json!({ "probability": 0.9 })).await;
    let classifier = StatusClassifier::new(url.as_str(), TIMEOUT).unwrap();
    let err = classifier.predict(&url, &with_load(10.0)).await.unwrap_err();
    assert!(matches!(err, ClassifyError::MissingStatus));
    assert_eq!(classifier.classify(&with_load(80.0), 100.0).await, Status::Present);
}

#[tokio::test]
async fn slow_service_times_out_and_falls_back() {
    let app = Router::new().route(
        "/predict",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(serde_json::json!({ "status": "Failure Not Present" }))
        }),
    );
    let url = format!("http://{}/predict", common::serve(app).await);
    let classifier = StatusClassifier::new(url, Duration::from_millis(100)).unwrap();
    let started = std::time::Instant::now();
    assert_eq!(classifier.classify(&with_load(90.0), 100.0).await, Status::Present);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn local_only_classifier_uses_threshold() {
    let classifier = StatusClassifier::local_only();
    assert!(classifier.predict_url().is_none());
    assert_eq!(classifier.classify(&with_load(80.0), 100.0).await, Status::Present);
    assert_eq!(classifier.classify(&with_load(79.9), 100.0).await, Status::NotPresent);
}

#[tokio::test]
async fn https_endpoint_is_attempted_not_rejected_by_scheme() {
    let url = format!("https://{}/predict", common::closed_addr().await);
    let classifier = StatusClassifier::new(url.as_str(), TIMEOUT).unwrap();
    let err = classifier.predict(&url, &with_load(10.0)).await.unwrap_err();
    let ClassifyError::Request(e) = &err else {
        panic!("expected a request error, got {err:?}");
    };
    // The client speaks TLS, so the failure is the refused connection, not the URL scheme.
    assert!(!format!("{e:?}").contains("scheme is not http"), "{e:?}");
    assert!(e.is_connect());
    assert_eq!(classifier.classify(&with_load(10.0), 100.0).await, Status::NotPresent);
}
