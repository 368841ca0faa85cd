//! Application state wiring the detector, alert registry, and connection hub.

use std::sync::{Mutex, RwLock};

use chrono::Utc;

use roadsafe_core::models::{
    Alert, Coordinate, CreateAlertRequest, Incident, NearMissEvent, PatternSummary, ServerEvent,
    TelemetrySample,
};
use roadsafe_core::nearmiss::NearMissDetector;
use roadsafe_core::GeoError;

use crate::config::Config;
use crate::state::{AlertRegistry, ConnectionHub};

/// Thread-safe store shared across handlers and background loops.
pub struct AppState {
    pub config: Config,
    pub registry: AlertRegistry,
    pub hub: ConnectionHub,
    detector: Mutex<NearMissDetector>,
    incidents: RwLock<Vec<Incident>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: AlertRegistry::new(),
            hub: ConnectionHub::new(),
            detector: Mutex::new(NearMissDetector::default()),
            incidents: RwLock::new(Vec::new()),
        }
    }

    /// Create an alert and fan it out: full payload to sessions inside the
    /// alert's geofence, lightweight notice to everyone.
    pub fn create_alert(&self, request: &CreateAlertRequest) -> Alert {
        let alert = self.registry.create(request, Utc::now());

        let reached = self.hub.broadcast_to_area(
            alert.location,
            alert.radius_km,
            &ServerEvent::NewAlert {
                data: alert.clone(),
            },
        );
        self.hub.broadcast(&ServerEvent::AlertCreated {
            alert_id: alert.id,
            alert_type: alert.alert_type,
            location: alert.location,
        });

        tracing::info!(
            alert_id = alert.id,
            severity = ?alert.severity,
            reached,
            "alert created"
        );
        alert
    }

    /// Dismiss an alert and notify every connected client.
    pub fn dismiss_alert(&self, alert_id: u64) -> Option<Alert> {
        let alert = self.registry.dismiss(alert_id, Utc::now())?;
        self.hub
            .broadcast(&ServerEvent::AlertDismissed { alert_id });
        tracing::info!(alert_id, "alert dismissed");
        Some(alert)
    }

    /// Run a telemetry sample through the near-miss detector.
    pub fn detect_near_miss(&self, sample: &TelemetrySample) -> Result<NearMissEvent, GeoError> {
        let mut detector = match self.detector.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        detector.detect(sample)
    }

    pub fn analyze_patterns(&self, center: Coordinate, radius_km: f64) -> PatternSummary {
        let detector = match self.detector.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        detector.analyze_patterns(center, radius_km)
    }

    pub fn recent_events(&self) -> Vec<NearMissEvent> {
        let detector = match self.detector.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        detector.recent_events().to_vec()
    }

    /// Store an incident report and push a summary to all clients.
    pub fn record_incident(&self, incident: Incident) {
        if let Ok(mut incidents) = self.incidents.write() {
            incidents.push(incident.clone());
        }
        self.hub
            .broadcast(&ServerEvent::NewAccident { data: incident });
    }

    pub fn incidents_snapshot(&self) -> Vec<Incident> {
        self.incidents
            .read()
            .map(|incidents| incidents.clone())
            .unwrap_or_default()
    }

    /// Sweep expired alerts and stale detector events. Returns
    /// (expired alerts, purged events).
    pub fn sweep_expired(&self) -> (usize, usize) {
        let now = Utc::now();
        let expired = self.registry.expire_stale(now);
        let purged = {
            let mut detector = match self.detector.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            detector.purge_stale(now)
        };
        (expired, purged)
    }
}
