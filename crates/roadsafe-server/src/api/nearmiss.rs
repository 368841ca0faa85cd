//! Near-miss detection endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use roadsafe_core::models::{
    AlertSeverity, AlertType, Coordinate, CreateAlertRequest, PatternSummary, TelemetrySample,
};

use crate::state::AppState;

/// Geofence radius for auto-raised near-miss alerts.
const AUTO_ALERT_RADIUS_KM: f64 = 2.0;
/// Auto-raised alerts lapse quickly; the underlying event buffer is authoritative.
const AUTO_ALERT_DURATION_MINUTES: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_pattern_radius_km")]
    pub radius_km: f64,
}

fn default_pattern_radius_km() -> f64 {
    1.0
}

/// POST /v1/nearmiss/detect - score one telemetry sample.
///
/// When the sample crosses the near-miss threshold and auto-alerting is
/// enabled, an alert is raised at the event location so nearby clients hear
/// about it immediately.
pub async fn detect(
    State(state): State<Arc<AppState>>,
    Json(sample): Json<TelemetrySample>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let event = state.detect_near_miss(&sample).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        )
    })?;

    if event.is_near_miss && state.config.auto_alert {
        let request = CreateAlertRequest {
            alert_type: AlertType::NearMiss,
            severity: AlertSeverity::from(event.severity),
            latitude: event.location.latitude,
            longitude: event.location.longitude,
            message: event.details.pattern_description.clone(),
            radius_km: AUTO_ALERT_RADIUS_KM,
            duration_minutes: AUTO_ALERT_DURATION_MINUTES,
        };
        let alert = state.create_alert(&request);
        tracing::debug!(alert_id = alert.id, score = event.near_miss_score, "auto alert raised");
    }

    Ok(Json(json!({ "event": event })))
}

/// POST /v1/nearmiss/patterns - pattern summary around a point.
pub async fn patterns(
    State(state): State<Arc<AppState>>,
    Json(query): Json<PatternQuery>,
) -> Result<Json<PatternSummary>, (StatusCode, Json<serde_json::Value>)> {
    let center = Coordinate::new(query.latitude, query.longitude);
    if center.validate().is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Latitude/longitude out of range" })),
        ));
    }

    Ok(Json(state.analyze_patterns(center, query.radius_km)))
}

/// GET /v1/nearmiss/events - buffered near-miss events from the last hour.
pub async fn recent_events(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let events = state.recent_events();
    Json(json!({
        "total": events.len(),
        "events": events,
    }))
}
