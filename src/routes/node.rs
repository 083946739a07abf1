// Node boundary: read current state, apply a manual update

use axum::{Json, extract::State};

use super::NodeAppState;
use crate::models::{NodeState, TelemetryUpdate};

/// GET /api/transformer: current telemetry + status.
pub(super) async fn get_state_handler(State(state): State<NodeAppState>) -> Json<NodeState> {
    Json(state.service.get_state())
}

/// POST /api/transformer/update: sets only the fields present in the body, echoes the new state.
pub(super) async fn update_handler(
    State(state): State<NodeAppState>,
    Json(update): Json<TelemetryUpdate>,
) -> Json<NodeState> {
    Json(state.service.update(&update).await)
}
