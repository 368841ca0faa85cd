//! Route risk analysis endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use roadsafe_core::models::{Incident, RouteAnalysis, RouteAnalysisRequest};
use roadsafe_core::route::analyze_route;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRouteRequest {
    #[serde(flatten)]
    pub route: RouteAnalysisRequest,
    /// Caller-supplied incident set; when absent the server's reported
    /// incidents are used.
    #[serde(default)]
    pub historical_incidents: Option<Vec<Incident>>,
}

/// POST /v1/routes/analyze - score a route against historical incidents.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRouteRequest>,
) -> Result<Json<RouteAnalysis>, (StatusCode, Json<serde_json::Value>)> {
    let incidents = request
        .historical_incidents
        .unwrap_or_else(|| state.incidents_snapshot());

    let analysis = analyze_route(&request.route, &incidents).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        )
    })?;

    Ok(Json(analysis))
}
