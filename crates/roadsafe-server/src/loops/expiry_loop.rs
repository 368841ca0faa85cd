//! Alert expiry loop.
//!
//! Read paths already expire lazily; this loop keeps the registry and the
//! detector's event buffer tidy on an otherwise idle server.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::state::AppState;

pub async fn run_expiry_loop(state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(state.config.sweep_interval_secs.max(1)));

    loop {
        ticker.tick().await;
        let (expired_alerts, purged_events) = state.sweep_expired();
        if expired_alerts > 0 || purged_events > 0 {
            tracing::info!(expired_alerts, purged_events, "expiry sweep");
        }
    }
}
