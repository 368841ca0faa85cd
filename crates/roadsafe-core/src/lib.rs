pub mod geo;
pub mod models;
pub mod nearmiss;
pub mod route;

pub use geo::{haversine_km, GeoError};
pub use models::{
    Alert, AlertSeverity, AlertType, ClientMessage, Coordinate, CreateAlertRequest, EventSeverity,
    Hotspot, Incident, IncidentSeverity, NearMissEvent, NearMissPattern, NearbyAlert,
    PatternSummary, RouteAnalysis, RouteAnalysisRequest, RouteSegment, SafetyLevel, ServerEvent,
    TelemetrySample,
};
pub use nearmiss::NearMissDetector;
pub use route::analyze_route;
