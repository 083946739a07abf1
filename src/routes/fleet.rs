// Aggregator read-only views

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AggregatorAppState;
use crate::models::NodeRegistryEntry;

/// GET /api/transformers: registry with each node's latest poll result, ascending id.
pub(super) async fn registry_handler(
    State(state): State<AggregatorAppState>,
) -> Json<Vec<NodeRegistryEntry>> {
    Json(state.aggregator.registry())
}

/// GET /api/fleet: latest round's report; 503 before the first round completes.
pub(super) async fn last_report_handler(State(state): State<AggregatorAppState>) -> Response {
    match state.aggregator.last_report() {
        Some(report) => Json(report).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "no poll round completed yet" })),
        )
            .into_response(),
    }
}
