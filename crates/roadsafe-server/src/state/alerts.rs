//! In-memory alert registry using DashMap.
//!
//! Ids are monotonic and never reused. Expiry is lazy: every read path sweeps
//! expired alerts first, and a background loop does the same on a timer so
//! alerts lapse even on an idle server.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use roadsafe_core::models::{Alert, Coordinate, CreateAlertRequest, NearbyAlert};

pub struct AlertRegistry {
    alerts: DashMap<u64, Alert>,
    alert_counter: AtomicU64,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self {
            alerts: DashMap::new(),
            alert_counter: AtomicU64::new(0),
        }
    }

    /// Create and store a new active alert.
    pub fn create(&self, request: &CreateAlertRequest, now: DateTime<Utc>) -> Alert {
        let id = self.alert_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let alert = Alert::from_request(id, request, now);
        self.alerts.insert(id, alert.clone());
        alert
    }

    /// Flip alerts past their expiry to inactive. Returns how many flipped.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for mut entry in self.alerts.iter_mut() {
            if entry.active && entry.is_expired(now) {
                entry.active = false;
                expired += 1;
            }
        }
        expired
    }

    /// All active alerts, oldest first.
    pub fn list_active(&self, now: DateTime<Utc>) -> Vec<Alert> {
        self.expire_stale(now);
        let mut active: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by_key(|alert| alert.id);
        active
    }

    /// Active alerts whose geofence covers `center`, or within an explicit
    /// search radius when one is given. Sorted most severe first, nearest
    /// first within a severity.
    pub fn list_near(
        &self,
        center: Coordinate,
        radius_km: Option<f64>,
        now: DateTime<Utc>,
    ) -> Vec<NearbyAlert> {
        self.expire_stale(now);
        let mut nearby: Vec<NearbyAlert> = self
            .alerts
            .iter()
            .filter(|entry| entry.active)
            .filter_map(|entry| {
                let alert = entry.value();
                let distance = alert.location.distance_km(&center);
                let reach = radius_km.unwrap_or(alert.radius_km);
                (distance <= reach).then(|| NearbyAlert {
                    alert: alert.clone(),
                    distance_km: round2(distance),
                })
            })
            .collect();
        nearby.sort_by(|a, b| {
            a.alert
                .severity
                .rank()
                .cmp(&b.alert.severity.rank())
                .then(
                    a.distance_km
                        .partial_cmp(&b.distance_km)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
        nearby
    }

    /// Dismiss an active alert. Returns the dismissed alert, or None when the
    /// id is unknown or the alert already lapsed.
    pub fn dismiss(&self, alert_id: u64, now: DateTime<Utc>) -> Option<Alert> {
        self.expire_stale(now);
        let mut entry = self.alerts.get_mut(&alert_id)?;
        if !entry.active {
            return None;
        }
        entry.active = false;
        Some(entry.value().clone())
    }
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use roadsafe_core::models::{AlertSeverity, AlertType};

    fn request(lat: f64, lon: f64, severity: AlertSeverity, minutes: i64) -> CreateAlertRequest {
        CreateAlertRequest {
            alert_type: AlertType::Accident,
            severity,
            latitude: lat,
            longitude: lon,
            message: "test alert".to_string(),
            radius_km: 10.0,
            duration_minutes: minutes,
        }
    }

    #[test]
    fn ids_are_monotonic_and_start_at_one() {
        let registry = AlertRegistry::new();
        let now = Utc::now();
        let first = registry.create(&request(0.0, 0.0, AlertSeverity::Low, 60), now);
        let second = registry.create(&request(0.0, 0.0, AlertSeverity::Low, 60), now);
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn expired_alerts_drop_out_of_listings() {
        let registry = AlertRegistry::new();
        let now = Utc::now();
        registry.create(&request(0.0, 0.0, AlertSeverity::Low, 30), now);
        registry.create(&request(0.0, 0.0, AlertSeverity::Low, 120), now);

        let later = now + Duration::minutes(31);
        let active = registry.list_active(later);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 2);
    }

    #[test]
    fn dismiss_flips_once() {
        let registry = AlertRegistry::new();
        let now = Utc::now();
        let alert = registry.create(&request(0.0, 0.0, AlertSeverity::High, 60), now);

        assert!(registry.dismiss(alert.id, now).is_some());
        assert!(registry.dismiss(alert.id, now).is_none());
        assert!(registry.dismiss(999, now).is_none());
    }

    #[test]
    fn dismiss_expired_alert_fails() {
        let registry = AlertRegistry::new();
        let now = Utc::now();
        let alert = registry.create(&request(0.0, 0.0, AlertSeverity::High, 10), now);
        assert!(registry.dismiss(alert.id, now + Duration::minutes(11)).is_none());
    }

    #[test]
    fn list_near_uses_alert_radius_by_default() {
        let registry = AlertRegistry::new();
        let now = Utc::now();
        // 10km radius: a query point ~5.5km away is inside
        registry.create(&request(40.0, -74.0, AlertSeverity::Low, 60), now);

        let near = registry.list_near(Coordinate::new(40.05, -74.0), None, now);
        assert_eq!(near.len(), 1);
        assert!(near[0].distance_km > 5.0 && near[0].distance_km < 6.0);

        // An explicit 2km search radius overrides the alert's own geofence.
        let near = registry.list_near(Coordinate::new(40.05, -74.0), Some(2.0), now);
        assert!(near.is_empty());
    }

    #[test]
    fn list_near_boundary_is_inclusive() {
        let registry = AlertRegistry::new();
        let now = Utc::now();
        let alert = registry.create(&request(40.0, -74.0, AlertSeverity::Low, 60), now);

        let center = Coordinate::new(40.05, -74.0);
        let exact = alert.location.distance_km(&center);
        let near = registry.list_near(center, Some(exact), now);
        assert_eq!(near.len(), 1);
    }

    #[test]
    fn list_near_sorts_by_severity_then_distance() {
        let registry = AlertRegistry::new();
        let now = Utc::now();
        registry.create(&request(40.02, -74.0, AlertSeverity::Low, 60), now);
        registry.create(&request(40.03, -74.0, AlertSeverity::Critical, 60), now);
        registry.create(&request(40.01, -74.0, AlertSeverity::Critical, 60), now);

        let near = registry.list_near(Coordinate::new(40.0, -74.0), None, now);
        assert_eq!(near.len(), 3);
        assert_eq!(near[0].alert.severity, AlertSeverity::Critical);
        assert_eq!(near[1].alert.severity, AlertSeverity::Critical);
        assert!(near[0].distance_km <= near[1].distance_km);
        assert_eq!(near[2].alert.severity, AlertSeverity::Low);
    }
}
