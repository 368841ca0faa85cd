//! Core data models for the road-safety alert system.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{self, GeoError};

/// A point on the road network in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject coordinates outside the valid lat/lon ranges.
    pub fn validate(&self) -> Result<(), GeoError> {
        if !(-90.0..=90.0).contains(&self.latitude)
            || !(-180.0..=180.0).contains(&self.longitude)
            || !self.latitude.is_finite()
            || !self.longitude.is_finite()
        {
            return Err(GeoError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(())
    }

    /// Great-circle distance to another coordinate in kilometers.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        geo::haversine_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Inclusive circular geofence membership check.
    pub fn is_within_km(&self, center: &Coordinate, radius_km: f64) -> bool {
        self.distance_km(center) <= radius_km
    }
}

/// One telemetry sample from a vehicle. Consumed once by the near-miss detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub latitude: f64,
    pub longitude: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Acceleration in m/s^2 (negative = braking)
    #[serde(default)]
    pub acceleration: f64,
    /// Steering angle in degrees
    #[serde(default)]
    pub steering_angle: f64,
    /// Time gap to the lead vehicle in seconds
    #[serde(default = "default_time_gap")]
    pub time_gap: f64,
    /// Brake pedal force, 0-1
    #[serde(default)]
    pub brake_force: f64,
}

fn default_time_gap() -> f64 {
    10.0
}

impl TelemetrySample {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Near-miss pattern, in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearMissPattern {
    SuddenBrake,
    Swerve,
    Tailgating,
    AggressiveAcceleration,
    CloseCall,
}

impl NearMissPattern {
    pub fn description(&self) -> &'static str {
        match self {
            NearMissPattern::SuddenBrake => "Sudden hard braking detected",
            NearMissPattern::Swerve => "Sharp steering maneuver detected",
            NearMissPattern::Tailgating => "Unsafe following distance",
            NearMissPattern::AggressiveAcceleration => "Aggressive acceleration detected",
            NearMissPattern::CloseCall => "Close call with potential hazard",
        }
    }
}

/// Severity bucket for a scored near-miss event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    Low,
    Moderate,
    High,
    Critical,
}

/// Human-oriented breakdown attached to each detection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
    pub speed_kmh: f64,
    pub time_gap_seconds: f64,
    /// Brake force as a percentage
    pub brake_intensity: f64,
    pub steering_angle: f64,
    pub pattern_description: String,
}

/// A scored telemetry sample. Buffered by the detector only when `is_near_miss`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearMissEvent {
    pub near_miss_score: f64,
    pub is_near_miss: bool,
    pub pattern_type: NearMissPattern,
    pub severity: EventSeverity,
    pub location: Coordinate,
    pub created_at: DateTime<Utc>,
    pub details: EventDetails,
}

/// Pattern/count pair. Kept in first-occurrence order so the most-common-pattern
/// tie-break is the first pattern to reach the maximum count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCount {
    pub pattern: NearMissPattern,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
}

/// Risk label for an analyzed area of near-miss activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaRiskLevel {
    Low,
    Moderate,
    High,
}

/// Result of `NearMissDetector::analyze_patterns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSummary {
    pub total_events: usize,
    pub hotspot: bool,
    pub risk_level: AreaRiskLevel,
    pub patterns: Vec<PatternCount>,
    pub severity_distribution: SeverityCounts,
    pub most_common_pattern: Option<NearMissPattern>,
    pub recommendations: Vec<String>,
}

/// Severity of a historical incident supplied by the reporting collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentSeverity {
    Minor,
    Major,
    Fatal,
}

impl IncidentSeverity {
    pub fn weight(&self) -> u32 {
        match self {
            IncidentSeverity::Minor => 1,
            IncidentSeverity::Major => 2,
            IncidentSeverity::Fatal => 3,
        }
    }
}

/// A historical accident/incident record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub latitude: f64,
    pub longitude: f64,
    pub severity: IncidentSeverity,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub road_condition: Option<String>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl Incident {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Route to score: origin, ordered waypoints, destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAnalysisRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    #[serde(default)]
    pub waypoints: Vec<Coordinate>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}

/// An incident matched to a segment, annotated with its perpendicular distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredIncident {
    #[serde(flatten)]
    pub incident: Incident,
    pub distance_to_route_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start: Coordinate,
    pub end: Coordinate,
    pub distance_km: f64,
    /// 0-100
    pub risk_score: f64,
    pub is_high_risk: bool,
    pub incident_count: usize,
    pub risk_factors: Vec<String>,
    /// Top 5 nearest incidents; the full matched set feeds the score.
    pub incidents: Vec<ScoredIncident>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotspotRiskLevel {
    Low,
    Medium,
    High,
}

/// A cluster of historical incidents near a route point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub latitude: f64,
    pub longitude: f64,
    pub accident_count: usize,
    pub fatal_count: usize,
    pub serious_count: usize,
    pub minor_count: usize,
    pub risk_level: HotspotRiskLevel,
    pub common_weather: String,
    pub common_road_condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyLevel {
    #[serde(rename = "Low Risk")]
    LowRisk,
    #[serde(rename = "Moderate Risk")]
    ModerateRisk,
    #[serde(rename = "High Risk")]
    HighRisk,
    #[serde(rename = "Very High Risk")]
    VeryHighRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAnalysis {
    /// Mean segment risk on a 0-10 scale
    pub overall_risk_score: f64,
    pub safety_level: SafetyLevel,
    pub high_risk_zones: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeKind {
    AvoidZones,
    TimeChange,
    PublicTransport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeRoute {
    #[serde(rename = "type")]
    pub kind: AlternativeKind,
    pub description: String,
    pub potential_improvement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStatistics {
    pub total_segments: usize,
    pub high_risk_segments: usize,
    pub average_segment_risk: f64,
}

/// Full response of the route risk analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAnalysis {
    pub route_summary: RouteSummary,
    pub safety_analysis: SafetyAnalysis,
    pub hotspots: Vec<Hotspot>,
    pub recommendations: Vec<String>,
    pub alternative_routes: Vec<AlternativeRoute>,
    pub segment_analysis: Vec<RouteSegment>,
    pub statistics: RouteStatistics,
}

// ========== ALERT MODELS ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Accident,
    NearMiss,
    HighRisk,
    Weather,
    Traffic,
}

impl AlertType {
    /// Map-marker icon shown by the dashboard frontend.
    pub fn icon(&self) -> &'static str {
        match self {
            AlertType::Accident => "🚨",
            AlertType::NearMiss => "⚠️",
            AlertType::HighRisk => "🔴",
            AlertType::Weather => "🌧️",
            AlertType::Traffic => "🚦",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Display color for the severity level.
    pub fn color(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "#FFA500",
            AlertSeverity::Medium => "#FF6B00",
            AlertSeverity::High => "#FF0000",
            AlertSeverity::Critical => "#8B0000",
        }
    }

    /// Sort rank, most severe first.
    pub fn rank(&self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::High => 1,
            AlertSeverity::Medium => 2,
            AlertSeverity::Low => 3,
        }
    }
}

impl From<EventSeverity> for AlertSeverity {
    fn from(severity: EventSeverity) -> Self {
        match severity {
            EventSeverity::Critical => AlertSeverity::Critical,
            EventSeverity::High => AlertSeverity::High,
            EventSeverity::Moderate => AlertSeverity::Medium,
            EventSeverity::Low => AlertSeverity::Low,
        }
    }
}

/// Request to create a new alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlertRequest {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub latitude: f64,
    pub longitude: f64,
    pub message: String,
    #[serde(default = "default_alert_radius_km")]
    pub radius_km: f64,
    #[serde(default = "default_alert_duration_minutes")]
    pub duration_minutes: i64,
}

fn default_alert_radius_km() -> f64 {
    10.0
}

fn default_alert_duration_minutes() -> i64 {
    60
}

impl CreateAlertRequest {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A time-bounded, geographically-scoped safety alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub location: Coordinate,
    pub radius_km: f64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub icon: String,
    pub color: String,
}

impl Alert {
    /// Build a new active alert from a creation request.
    pub fn from_request(id: u64, request: &CreateAlertRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            alert_type: request.alert_type,
            severity: request.severity,
            location: request.coordinate(),
            radius_km: request.radius_km,
            message: request.message.clone(),
            created_at: now,
            expires_at: now + Duration::minutes(request.duration_minutes),
            active: true,
            icon: request.alert_type.icon().to_string(),
            color: request.severity.color().to_string(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// An active alert annotated with its distance from a query location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyAlert {
    #[serde(flatten)]
    pub alert: Alert,
    pub distance_km: f64,
}

// ========== WIRE PROTOCOL ==========

/// Messages pushed from the server to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full alert payload, geofenced to sessions inside the alert radius.
    NewAlert { data: Alert },
    /// Lightweight notice broadcast to every client for map overviews.
    AlertCreated {
        alert_id: u64,
        #[serde(rename = "type")]
        alert_type: AlertType,
        location: Coordinate,
    },
    AlertDismissed { alert_id: u64 },
    LocationUpdated { status: String },
    Pong { timestamp: Option<f64> },
    /// Accident report summary fed by the external reporting collaborator.
    NewAccident { data: Incident },
}

/// Messages received from connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    LocationUpdate { latitude: f64, longitude: f64 },
    Ping {
        #[serde(default)]
        timestamp: Option<f64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_validation_bounds() {
        assert!(Coordinate::new(90.0, 180.0).validate().is_ok());
        assert!(Coordinate::new(-90.0, -180.0).validate().is_ok());
        assert!(Coordinate::new(90.01, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -180.5).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn telemetry_defaults_apply() {
        let sample: TelemetrySample =
            serde_json::from_str(r#"{"latitude": 1.0, "longitude": 2.0, "speed": 50.0}"#).unwrap();
        assert_eq!(sample.time_gap, 10.0);
        assert_eq!(sample.brake_force, 0.0);
        assert_eq!(sample.steering_angle, 0.0);
    }

    #[test]
    fn alert_derives_icon_and_color() {
        let request = CreateAlertRequest {
            alert_type: AlertType::Accident,
            severity: AlertSeverity::Critical,
            latitude: 40.0,
            longitude: -74.0,
            message: "Multi-vehicle collision".to_string(),
            radius_km: 5.0,
            duration_minutes: 30,
        };
        let now = Utc::now();
        let alert = Alert::from_request(7, &request, now);
        assert_eq!(alert.id, 7);
        assert!(alert.active);
        assert_eq!(alert.icon, AlertType::Accident.icon());
        assert_eq!(alert.color, AlertSeverity::Critical.color());
        assert_eq!(alert.expires_at, now + Duration::minutes(30));
    }

    #[test]
    fn server_event_wire_shape() {
        let event = ServerEvent::AlertDismissed { alert_id: 3 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "alert_dismissed");
        assert_eq!(value["alert_id"], 3);
    }

    #[test]
    fn client_message_parses_location_update() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type": "location_update", "latitude": 40.0, "longitude": -74.0}"#,
        )
        .unwrap();
        match message {
            ClientMessage::LocationUpdate {
                latitude,
                longitude,
            } => {
                assert_eq!(latitude, 40.0);
                assert_eq!(longitude, -74.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn severity_rank_orders_critical_first() {
        assert!(AlertSeverity::Critical.rank() < AlertSeverity::High.rank());
        assert!(AlertSeverity::High.rank() < AlertSeverity::Medium.rank());
        assert!(AlertSeverity::Medium.rank() < AlertSeverity::Low.rank());
    }
}
