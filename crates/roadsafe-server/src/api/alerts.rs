//! Alert management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use roadsafe_core::models::{Coordinate, CreateAlertRequest};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
}

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// POST /v1/alerts - create an alert and push it to connected clients.
pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    if request.coordinate().validate().is_err() {
        return Err(bad_request("Latitude/longitude out of range"));
    }
    if request.message.trim().is_empty() {
        return Err(bad_request("Alert message must not be empty"));
    }
    if !request.radius_km.is_finite() || request.radius_km <= 0.0 {
        return Err(bad_request("Alert radius must be positive"));
    }
    if request.duration_minutes <= 0 {
        return Err(bad_request("Alert duration must be positive"));
    }

    let alert = state.create_alert(&request);
    Ok((StatusCode::CREATED, Json(json!({ "alert": alert }))))
}

/// GET /v1/alerts - active alerts, optionally filtered to a location.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let now = chrono::Utc::now();

    if let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) {
        let center = Coordinate::new(latitude, longitude);
        if center.validate().is_err() {
            return Err(bad_request("Latitude/longitude out of range"));
        }
        let alerts = state.registry.list_near(center, query.radius_km, now);
        return Ok(Json(json!({
            "count": alerts.len(),
            "alerts": alerts,
        })));
    }

    let alerts = state.registry.list_active(now);
    Ok(Json(json!({
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

/// DELETE /v1/alerts/:alert_id - dismiss an active alert.
pub async fn dismiss_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<u64>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.dismiss_alert(alert_id) {
        Some(alert) => Ok(Json(json!({
            "dismissed": true,
            "alert_id": alert.id,
        }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
