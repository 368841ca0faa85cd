//! Incident report endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

use roadsafe_core::models::Incident;

use crate::state::AppState;

/// POST /v1/incidents - record an incident and notify connected clients.
pub async fn report_incident(
    State(state): State<Arc<AppState>>,
    Json(incident): Json<Incident>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    if incident.coordinate().validate().is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Latitude/longitude out of range" })),
        ));
    }

    state.record_incident(incident);
    Ok((StatusCode::CREATED, Json(json!({ "recorded": true }))))
}

/// GET /v1/incidents - all recorded incidents.
pub async fn list_incidents(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let incidents = state.incidents_snapshot();
    Json(json!({
        "count": incidents.len(),
        "incidents": incidents,
    }))
}
