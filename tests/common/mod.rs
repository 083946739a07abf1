// Shared test helpers: in-process stub servers for the inference service and nodes.

use axum::{Json, Router, routing::post};
use fleet::classifier::StatusClassifier;
use fleet::models::NodeState;
use fleet::node::NodeService;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Serves `app` on an ephemeral localhost port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Inference stub that always answers `body` on POST /predict.
pub async fn predict_stub(body: serde_json::Value) -> String {
    let app = Router::new().route(
        "/predict",
        post(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    format!("http://{}/predict", serve(app).await)
}

pub fn seeded_node(id: &str, classifier: StatusClassifier) -> NodeService {
    NodeService::new(
        NodeState::new(id, 100.0),
        classifier,
        Duration::from_secs(3),
        StdRng::seed_from_u64(42),
    )
}

/// Full node HTTP boundary backed by a local-only classifier; returns the state URL.
pub async fn spawn_node(id: &str) -> (Arc<NodeService>, String) {
    let service = Arc::new(seeded_node(id, StatusClassifier::local_only()));
    let addr = serve(fleet::routes::node_app(service.clone())).await;
    (service, format!("http://{addr}/api/transformer"))
}
