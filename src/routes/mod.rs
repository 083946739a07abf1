// HTTP + WebSocket routes for both process types

mod fleet;
mod http;
mod node;
mod ws;

use axum::{Router, routing::get, routing::post};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::Aggregator;
use crate::models::FleetReport;
use crate::node::NodeService;

#[derive(Clone)]
pub(crate) struct NodeAppState {
    pub(crate) service: Arc<NodeService>,
}

#[derive(Clone)]
pub(crate) struct AggregatorAppState {
    pub(crate) aggregator: Arc<Aggregator>,
    pub(crate) report_tx: broadcast::Sender<FleetReport>,
}

/// Routes served by a single transformer node.
pub fn node_app(service: Arc<NodeService>) -> Router {
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/transformer", get(node::get_state_handler)) // GET /api/transformer
        .route("/api/transformer/update", post(node::update_handler)) // POST /api/transformer/update
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(NodeAppState { service })
}

/// Routes served by the central aggregator.
pub fn aggregator_app(
    aggregator: Arc<Aggregator>,
    report_tx: broadcast::Sender<FleetReport>,
) -> Router {
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/transformers", get(fleet::registry_handler)) // GET /api/transformers
        .route("/api/fleet", get(fleet::last_report_handler)) // GET /api/fleet
        .route("/ws/fleet", get(ws::ws_fleet)) // WS /ws/fleet
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(AggregatorAppState {
            aggregator,
            report_tx,
        })
}
