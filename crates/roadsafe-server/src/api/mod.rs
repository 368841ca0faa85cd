//! API routes for the road-safety server.

pub mod alerts;
pub mod incidents;
pub mod nearmiss;
pub mod route_analysis;
mod routes;
pub mod ws;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}
