//! Route-segment risk analysis over historical incident data.
//!
//! Walks the ordered route points, scores each consecutive segment from the
//! incidents matched to it, clusters incidents into hotspots around route
//! points, and produces an aggregate safety verdict. Stateless per call.

use crate::geo::{self, GeoError};
use crate::models::{
    AlternativeKind, AlternativeRoute, Coordinate, Hotspot, HotspotRiskLevel, Incident,
    RouteAnalysis, RouteAnalysisRequest, RouteSegment, RouteStatistics, RouteSummary,
    SafetyAnalysis, SafetyLevel, ScoredIncident,
};

/// Segment risk score at or above which a segment is flagged high-risk.
pub const HIGH_RISK_THRESHOLD: f64 = 60.0;
/// Incidents within this perpendicular distance of a segment count toward it.
pub const ZONE_RADIUS_KM: f64 = 0.5;
/// Density floor preventing divide-by-zero on degenerate segments.
const MIN_SEGMENT_LENGTH_KM: f64 = 0.1;
/// How many matched incidents are echoed back per segment.
const MAX_REPORTED_INCIDENTS: usize = 5;

/// Analyze a route against a historical incident set.
pub fn analyze_route(
    request: &RouteAnalysisRequest,
    incidents: &[Incident],
) -> Result<RouteAnalysis, GeoError> {
    request.origin.validate()?;
    request.destination.validate()?;
    for waypoint in &request.waypoints {
        waypoint.validate()?;
    }

    let points = route_points(request);

    let mut segments = Vec::with_capacity(points.len() - 1);
    let mut total_risk = 0.0;
    let mut high_risk_zones = 0usize;
    for pair in points.windows(2) {
        let segment = analyze_segment(pair[0], pair[1], incidents);
        total_risk += segment.risk_score;
        if segment.is_high_risk {
            high_risk_zones += 1;
        }
        segments.push(segment);
    }

    let avg_risk = if segments.is_empty() {
        0.0
    } else {
        total_risk / segments.len() as f64
    };
    let safety_score = (100.0 - avg_risk).max(0.0);
    let high_risk_segments = segments.iter().filter(|s| s.is_high_risk).count();

    let recommendations = route_recommendations(safety_score, high_risk_zones, high_risk_segments);
    let alternative_routes = if safety_score < 70.0 {
        suggest_alternatives(high_risk_zones)
    } else {
        Vec::new()
    };
    let hotspots = derive_hotspots(&points, incidents);

    Ok(RouteAnalysis {
        route_summary: RouteSummary {
            distance_km: request.distance_km.unwrap_or(0.0),
            duration_minutes: request.duration_minutes.unwrap_or(0.0),
        },
        safety_analysis: SafetyAnalysis {
            overall_risk_score: round2(avg_risk / 10.0),
            safety_level: safety_level_for(avg_risk),
            high_risk_zones,
        },
        hotspots,
        recommendations,
        alternative_routes,
        statistics: RouteStatistics {
            total_segments: segments.len(),
            high_risk_segments,
            average_segment_risk: round2(avg_risk),
        },
        segment_analysis: segments,
    })
}

/// Ordered point list: origin, waypoints in given order, destination.
fn route_points(request: &RouteAnalysisRequest) -> Vec<Coordinate> {
    let mut points = Vec::with_capacity(request.waypoints.len() + 2);
    points.push(request.origin);
    points.extend(request.waypoints.iter().copied());
    points.push(request.destination);
    points
}

fn analyze_segment(start: Coordinate, end: Coordinate, incidents: &[Incident]) -> RouteSegment {
    let distance_km = start.distance_km(&end);

    // All incidents inside the zone radius, nearest first. The full matched set
    // feeds the score; only the top few are echoed back.
    let mut matched: Vec<ScoredIncident> = incidents
        .iter()
        .filter_map(|incident| {
            let distance = geo::distance_to_segment_km(
                incident.latitude,
                incident.longitude,
                start.latitude,
                start.longitude,
                end.latitude,
                end.longitude,
            );
            (distance <= ZONE_RADIUS_KM).then(|| ScoredIncident {
                incident: incident.clone(),
                distance_to_route_km: round3(distance),
            })
        })
        .collect();
    matched.sort_by(|a, b| {
        a.distance_to_route_km
            .partial_cmp(&b.distance_to_route_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let incident_count = matched.len();
    let density = incident_count as f64 / distance_km.max(MIN_SEGMENT_LENGTH_KM);
    let base_risk = (density * 20.0).min(80.0);
    let severity_adjustment: f64 = matched
        .iter()
        .map(|scored| scored.incident.severity.weight() as f64)
        .sum::<f64>()
        * 5.0;
    let risk_score = round2((base_risk + severity_adjustment).min(100.0));

    let risk_factors = segment_risk_factors(&matched, density);

    matched.truncate(MAX_REPORTED_INCIDENTS);
    RouteSegment {
        start,
        end,
        distance_km: round2(distance_km),
        risk_score,
        is_high_risk: risk_score >= HIGH_RISK_THRESHOLD,
        incident_count,
        risk_factors,
        incidents: matched,
    }
}

fn segment_risk_factors(matched: &[ScoredIncident], density: f64) -> Vec<String> {
    let mut factors = Vec::new();

    if matched.len() > 3 {
        factors.push(format!(
            "High accident frequency ({} incidents)",
            matched.len()
        ));
    }
    if matched
        .iter()
        .any(|scored| scored.incident.severity == crate::models::IncidentSeverity::Fatal)
    {
        factors.push("Fatal accidents reported in area".to_string());
    }
    if density > 5.0 {
        factors.push("Very high incident density".to_string());
    }

    let mut conditions = Vec::new();
    if let Some(weather) = dominant_condition(matched, |incident| incident.weather.as_deref()) {
        conditions.push(format!("{weather} weather"));
    }
    if let Some(road) = dominant_condition(matched, |incident| incident.road_condition.as_deref()) {
        conditions.push(format!("{road} roads"));
    }
    if !conditions.is_empty() {
        factors.push(format!("Common conditions: {}", conditions.join(", ")));
    }

    factors
}

/// Most frequent condition value, but only when it covers a strict majority of
/// the matched incidents. Incidents without the value do not contribute.
fn dominant_condition<F>(matched: &[ScoredIncident], extract: F) -> Option<String>
where
    F: Fn(&Incident) -> Option<&str>,
{
    if matched.is_empty() {
        return None;
    }
    let mut counts: Vec<(String, usize)> = Vec::new();
    for scored in matched {
        let Some(value) = extract(&scored.incident) else {
            continue;
        };
        match counts.iter_mut().find(|(existing, _)| *existing == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value.to_string(), 1)),
        }
    }
    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, max)| count > *max) {
            best = Some((value, count));
        }
    }
    best.and_then(|(value, count)| {
        (count as f64 > matched.len() as f64 * 0.5).then_some(value)
    })
}

fn safety_level_for(avg_risk: f64) -> SafetyLevel {
    if avg_risk < 20.0 {
        SafetyLevel::LowRisk
    } else if avg_risk < 40.0 {
        SafetyLevel::ModerateRisk
    } else if avg_risk < 60.0 {
        SafetyLevel::HighRisk
    } else {
        SafetyLevel::VeryHighRisk
    }
}

/// Deterministic text keyed on the safety score and zone counts. The wording is
/// not load-bearing; the triggering conditions are.
fn route_recommendations(
    safety_score: f64,
    high_risk_zones: usize,
    high_risk_segments: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if safety_score >= 80.0 {
        recommendations.push("Route appears safe - enjoy your journey".to_string());
        recommendations.push("Maintain safe driving practices throughout".to_string());
    } else if safety_score >= 60.0 {
        recommendations.push("Exercise normal caution on this route".to_string());
        recommendations.push("Stay alert and follow traffic rules".to_string());
    } else {
        recommendations.push("High risk route - consider alternatives if possible".to_string());
        recommendations
            .push("If you must take this route, exercise extreme caution".to_string());
    }

    if high_risk_zones > 0 {
        recommendations.push(format!(
            "{high_risk_zones} high-risk zones identified along the route"
        ));
        recommendations
            .push("Reduce speed and increase following distance in marked zones".to_string());
    }
    if high_risk_segments > 0 {
        recommendations.push(format!(
            "Be especially careful in {high_risk_segments} segment(s) with elevated risk"
        ));
    }

    recommendations.push("Check weather conditions before departure".to_string());
    recommendations.push("Ensure vehicle is in good condition".to_string());

    recommendations
}

fn suggest_alternatives(high_risk_zones: usize) -> Vec<AlternativeRoute> {
    let mut alternatives = Vec::new();

    if high_risk_zones > 0 {
        alternatives.push(AlternativeRoute {
            kind: AlternativeKind::AvoidZones,
            description: "Consider routes that avoid identified high-risk zones".to_string(),
            potential_improvement: "May reduce risk by 30-50%".to_string(),
        });
    }

    alternatives.push(AlternativeRoute {
        kind: AlternativeKind::TimeChange,
        description: "Consider traveling during daylight hours (6 AM - 6 PM) if possible"
            .to_string(),
        potential_improvement: "Daylight travel reduces risk by ~25%".to_string(),
    });

    if high_risk_zones > 2 {
        alternatives.push(AlternativeRoute {
            kind: AlternativeKind::PublicTransport,
            description: "Consider using public transportation for this route".to_string(),
            potential_improvement: "Professional drivers and safer vehicles".to_string(),
        });
    }

    alternatives
}

/// Cluster incidents around each route point (2x the zone radius), keep clusters
/// of two or more, and deduplicate clusters closer than 0.01 degrees on both axes.
fn derive_hotspots(points: &[Coordinate], incidents: &[Incident]) -> Vec<Hotspot> {
    let mut hotspots: Vec<Hotspot> = Vec::new();

    for point in points {
        let nearby: Vec<&Incident> = incidents
            .iter()
            .filter(|incident| incident.coordinate().is_within_km(point, ZONE_RADIUS_KM * 2.0))
            .collect();
        if nearby.len() < 2 {
            continue;
        }

        let fatal_count = count_severity(&nearby, crate::models::IncidentSeverity::Fatal);
        let serious_count = count_severity(&nearby, crate::models::IncidentSeverity::Major);
        let minor_count = count_severity(&nearby, crate::models::IncidentSeverity::Minor);

        let risk_level = if fatal_count > 0 || serious_count > 2 {
            HotspotRiskLevel::High
        } else if nearby.len() > 5 {
            HotspotRiskLevel::Medium
        } else {
            HotspotRiskLevel::Low
        };

        let hotspot = Hotspot {
            latitude: point.latitude,
            longitude: point.longitude,
            accident_count: nearby.len(),
            fatal_count,
            serious_count,
            minor_count,
            risk_level,
            common_weather: most_common(&nearby, |incident| incident.weather.as_deref()),
            common_road_condition: most_common(&nearby, |incident| {
                incident.road_condition.as_deref()
            }),
        };

        let duplicate = hotspots.iter().any(|existing| {
            (existing.latitude - hotspot.latitude).abs() < 0.01
                && (existing.longitude - hotspot.longitude).abs() < 0.01
        });
        if !duplicate {
            hotspots.push(hotspot);
        }
    }

    hotspots
}

fn count_severity(incidents: &[&Incident], severity: crate::models::IncidentSeverity) -> usize {
    incidents
        .iter()
        .filter(|incident| incident.severity == severity)
        .count()
}

/// Most frequent condition value; first value reaching the maximum count wins.
fn most_common<F>(incidents: &[&Incident], extract: F) -> String
where
    F: Fn(&Incident) -> Option<&str>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    for incident in incidents {
        let value = extract(incident).unwrap_or("Unknown").to_string();
        match counts.iter_mut().find(|(existing, _)| *existing == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, max)| count > *max) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
        .unwrap_or_else(|| "N/A".to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
