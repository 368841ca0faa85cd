//! REST API routes.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::{alerts, incidents, nearmiss, route_analysis, ws};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Near-miss detection
        .route("/v1/nearmiss/detect", post(nearmiss::detect))
        .route("/v1/nearmiss/patterns", post(nearmiss::patterns))
        .route("/v1/nearmiss/events", get(nearmiss::recent_events))
        // Route risk analysis
        .route("/v1/routes/analyze", post(route_analysis::analyze))
        // Alerts
        .route("/v1/alerts", post(alerts::create_alert))
        .route("/v1/alerts", get(alerts::list_alerts))
        .route("/v1/alerts/:alert_id", delete(alerts::dismiss_alert))
        // Incident reports
        .route("/v1/incidents", post(incidents::report_incident))
        .route("/v1/incidents", get(incidents::list_incidents))
        // WebSocket streaming
        .route("/v1/ws", get(ws::ws_handler))
}
