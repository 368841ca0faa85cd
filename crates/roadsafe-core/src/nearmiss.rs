//! Near-miss detection and area pattern analysis.
//!
//! Converts raw vehicle telemetry into a scored event and keeps a rolling,
//! time-windowed buffer of qualifying events for local pattern queries.

use chrono::{DateTime, Duration, Utc};

use crate::geo::GeoError;
use crate::models::{
    AreaRiskLevel, Coordinate, EventDetails, EventSeverity, NearMissEvent, NearMissPattern,
    PatternCount, PatternSummary, SeverityCounts, TelemetrySample,
};

/// Composite danger score above which a sample counts as a near miss (strict).
pub const NEAR_MISS_THRESHOLD: f64 = 0.7;

/// Detects near misses from telemetry and answers pattern queries over the
/// retained event buffer.
pub struct NearMissDetector {
    threshold: f64,
    retention: Duration,
    events: Vec<NearMissEvent>,
}

impl Default for NearMissDetector {
    fn default() -> Self {
        Self {
            threshold: NEAR_MISS_THRESHOLD,
            retention: Duration::hours(1),
            events: Vec::new(),
        }
    }
}

impl NearMissDetector {
    /// Score a telemetry sample. Qualifying events are appended to the buffer;
    /// events past the retention window are purged first.
    pub fn detect(&mut self, sample: &TelemetrySample) -> Result<NearMissEvent, GeoError> {
        self.detect_at(sample, Utc::now())
    }

    pub fn detect_at(
        &mut self,
        sample: &TelemetrySample,
        now: DateTime<Utc>,
    ) -> Result<NearMissEvent, GeoError> {
        sample.coordinate().validate()?;
        self.purge_stale(now);

        let score = score_sample(sample);
        let pattern = classify_pattern(sample);
        let event = NearMissEvent {
            near_miss_score: score,
            is_near_miss: score > self.threshold,
            pattern_type: pattern,
            severity: severity_for(score),
            location: sample.coordinate(),
            created_at: now,
            details: EventDetails {
                speed_kmh: round1(sample.speed),
                time_gap_seconds: round2(sample.time_gap),
                brake_intensity: round1(sample.brake_force * 100.0),
                steering_angle: round1(sample.steering_angle),
                pattern_description: pattern.description().to_string(),
            },
        };

        if event.is_near_miss {
            self.events.push(event.clone());
        }

        Ok(event)
    }

    /// Drop events older than the retention window. Returns how many were removed.
    pub fn purge_stale(&mut self, now: DateTime<Utc>) -> usize {
        let retention = self.retention;
        let before = self.events.len();
        self.events
            .retain(|event| now.signed_duration_since(event.created_at) <= retention);
        before - self.events.len()
    }

    pub fn recent_events(&self) -> &[NearMissEvent] {
        &self.events
    }

    /// Tally patterns and severities for buffered events within `radius_km` of
    /// `center`, and flag the area as a hotspot when activity is concentrated.
    pub fn analyze_patterns(&self, center: Coordinate, radius_km: f64) -> PatternSummary {
        let nearby: Vec<&NearMissEvent> = self
            .events
            .iter()
            .filter(|event| event.location.is_within_km(&center, radius_km))
            .collect();

        let mut patterns: Vec<PatternCount> = Vec::new();
        let mut severity = SeverityCounts::default();

        for event in &nearby {
            match patterns
                .iter_mut()
                .find(|entry| entry.pattern == event.pattern_type)
            {
                Some(entry) => entry.count += 1,
                None => patterns.push(PatternCount {
                    pattern: event.pattern_type,
                    count: 1,
                }),
            }
            match event.severity {
                EventSeverity::Critical => severity.critical += 1,
                EventSeverity::High => severity.high += 1,
                EventSeverity::Moderate => severity.moderate += 1,
                EventSeverity::Low => severity.low += 1,
            }
        }

        let hotspot = nearby.len() >= 5 || severity.critical >= 2;
        let risk_level = if hotspot {
            AreaRiskLevel::High
        } else if nearby.len() > 2 {
            AreaRiskLevel::Moderate
        } else {
            AreaRiskLevel::Low
        };

        // First pattern reaching the maximum count wins; insertion order is
        // first-occurrence order.
        let mut most_common_pattern: Option<(NearMissPattern, usize)> = None;
        for entry in &patterns {
            if most_common_pattern.map_or(true, |(_, count)| entry.count > count) {
                most_common_pattern = Some((entry.pattern, entry.count));
            }
        }
        let most_common_pattern = most_common_pattern.map(|(pattern, _)| pattern);

        let recommendations = area_recommendations(&patterns, hotspot);

        PatternSummary {
            total_events: nearby.len(),
            hotspot,
            risk_level,
            patterns,
            severity_distribution: severity,
            most_common_pattern,
            recommendations,
        }
    }
}

/// Additive danger score, capped at 1.0 and rounded to hundredths so the
/// threshold comparison is exact for decimal increments.
fn score_sample(sample: &TelemetrySample) -> f64 {
    let mut score: f64 = 0.0;

    if sample.brake_force > 0.8 {
        score += 0.4;
    } else if sample.brake_force > 0.6 {
        score += 0.2;
    }

    if sample.time_gap < 1.0 {
        score += 0.3;
    } else if sample.time_gap < 2.0 {
        score += 0.15;
    }

    let acceleration = sample.acceleration.abs();
    if acceleration > 5.0 {
        score += 0.2;
    } else if acceleration > 3.0 {
        score += 0.1;
    }

    let steering = sample.steering_angle.abs();
    if steering > 30.0 {
        score += 0.25;
    } else if steering > 15.0 {
        score += 0.1;
    }

    if sample.speed > 100.0 {
        score += 0.15;
    } else if sample.speed > 80.0 {
        score += 0.05;
    }

    round2(score.min(1.0))
}

/// Ordered precedence: sudden brake > swerve > tailgating > aggressive
/// acceleration > close call.
fn classify_pattern(sample: &TelemetrySample) -> NearMissPattern {
    if sample.brake_force > 0.7 && sample.acceleration.abs() > 4.0 {
        NearMissPattern::SuddenBrake
    } else if sample.steering_angle.abs() > 20.0 {
        NearMissPattern::Swerve
    } else if sample.time_gap < 1.5 && sample.speed > 60.0 {
        NearMissPattern::Tailgating
    } else if sample.acceleration.abs() > 5.0 {
        NearMissPattern::AggressiveAcceleration
    } else {
        NearMissPattern::CloseCall
    }
}

fn severity_for(score: f64) -> EventSeverity {
    if score >= 0.9 {
        EventSeverity::Critical
    } else if score >= 0.7 {
        EventSeverity::High
    } else if score >= 0.5 {
        EventSeverity::Moderate
    } else {
        EventSeverity::Low
    }
}

fn area_recommendations(patterns: &[PatternCount], hotspot: bool) -> Vec<String> {
    let mut recommendations = Vec::new();

    if hotspot {
        recommendations
            .push("High near-miss activity area - exercise extreme caution".to_string());
        recommendations.push("Consider an alternative route if possible".to_string());
    }

    let count_of = |pattern: NearMissPattern| {
        patterns
            .iter()
            .find(|entry| entry.pattern == pattern)
            .map(|entry| entry.count)
            .unwrap_or(0)
    };

    if count_of(NearMissPattern::SuddenBrake) > 2 {
        recommendations
            .push("Frequent sudden braking - maintain extra following distance".to_string());
    }
    if count_of(NearMissPattern::Swerve) > 2 {
        recommendations.push("Swerving incidents common - watch for road hazards".to_string());
    }
    if count_of(NearMissPattern::Tailgating) > 2 {
        recommendations.push("Tailgating common - stay alert for aggressive drivers".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("Normal traffic conditions - standard precautions apply".to_string());
    }

    recommendations
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(brake: f64, time_gap: f64, accel: f64, steer: f64, speed: f64) -> TelemetrySample {
        TelemetrySample {
            latitude: 40.0,
            longitude: -74.0,
            speed,
            acceleration: accel,
            steering_angle: steer,
            time_gap,
            brake_force: brake,
        }
    }

    #[test]
    fn hard_brake_with_deceleration_is_sudden_brake() {
        let mut detector = NearMissDetector::default();
        // brake 0.9 -> +0.4, |accel| 6.0 -> +0.2 = 0.6, below the threshold
        let event = detector
            .detect(&sample(0.9, 10.0, -6.0, 0.0, 50.0))
            .unwrap();
        assert_eq!(event.pattern_type, NearMissPattern::SuddenBrake);
        assert_eq!(event.near_miss_score, 0.6);
        assert!(!event.is_near_miss);
        assert_eq!(event.severity, EventSeverity::Moderate);
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        let mut detector = NearMissDetector::default();

        // brake 0.9 -> +0.4, time_gap 0.5 -> +0.3: exactly 0.7
        let at_threshold = detector
            .detect(&sample(0.9, 0.5, 0.0, 0.0, 50.0))
            .unwrap();
        assert_eq!(at_threshold.near_miss_score, 0.7);
        assert!(!at_threshold.is_near_miss);

        // same plus speed 90 -> +0.05: 0.75, just past the threshold
        let above = detector
            .detect(&sample(0.9, 0.5, 0.0, 0.0, 90.0))
            .unwrap();
        assert_eq!(above.near_miss_score, 0.75);
        assert!(above.is_near_miss);
        assert_eq!(above.severity, EventSeverity::High);
    }

    #[test]
    fn score_caps_at_one_and_is_critical() {
        let mut detector = NearMissDetector::default();
        let event = detector
            .detect(&sample(0.95, 0.5, -7.0, 45.0, 120.0))
            .unwrap();
        assert_eq!(event.near_miss_score, 1.0);
        assert!(event.is_near_miss);
        assert_eq!(event.severity, EventSeverity::Critical);
    }

    #[test]
    fn pattern_precedence_swerve_before_tailgating() {
        let mut detector = NearMissDetector::default();
        // Qualifies for both swerve and tailgating; swerve has precedence.
        let event = detector
            .detect(&sample(0.0, 1.0, 0.0, 25.0, 90.0))
            .unwrap();
        assert_eq!(event.pattern_type, NearMissPattern::Swerve);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut detector = NearMissDetector::default();
        let mut bad = sample(0.9, 0.5, 0.0, 0.0, 90.0);
        bad.latitude = 95.0;
        assert!(detector.detect(&bad).is_err());
        assert!(detector.recent_events().is_empty());
    }

    #[test]
    fn only_near_misses_are_buffered() {
        let mut detector = NearMissDetector::default();
        detector.detect(&sample(0.0, 10.0, 0.0, 0.0, 40.0)).unwrap();
        assert!(detector.recent_events().is_empty());

        detector.detect(&sample(0.9, 0.5, 0.0, 0.0, 90.0)).unwrap();
        assert_eq!(detector.recent_events().len(), 1);
    }

    #[test]
    fn stale_events_purged_on_next_detect() {
        let mut detector = NearMissDetector::default();
        let start = Utc::now();
        detector
            .detect_at(&sample(0.9, 0.5, 0.0, 0.0, 90.0), start)
            .unwrap();
        assert_eq!(detector.recent_events().len(), 1);

        // Two hours later the buffered event is outside the retention window.
        detector
            .detect_at(
                &sample(0.0, 10.0, 0.0, 0.0, 40.0),
                start + Duration::hours(2),
            )
            .unwrap();
        assert!(detector.recent_events().is_empty());
    }

    #[test]
    fn analyze_patterns_counts_and_hotspot() {
        let mut detector = NearMissDetector::default();
        let now = Utc::now();
        // Five near misses at the same spot: hotspot by count.
        // brake 0.9 (+0.4), |accel| 6 (+0.2), gap 1.5 (+0.15): 0.75, High,
        // sudden brake (brake > 0.7 and |accel| > 4).
        for _ in 0..3 {
            let event = detector
                .detect_at(&sample(0.9, 1.5, -6.0, 0.0, 50.0), now)
                .unwrap();
            assert!(event.is_near_miss);
            assert_eq!(event.pattern_type, NearMissPattern::SuddenBrake);
        }
        // brake 0.7 (+0.2), gap 0.5 (+0.3), |accel| 6 (+0.2), steer 35
        // (+0.25), speed 90 (+0.05): capped 1.0, Critical, swerve (brake is
        // not strictly above 0.7).
        for _ in 0..2 {
            let event = detector
                .detect_at(&sample(0.7, 0.5, -6.0, 35.0, 90.0), now)
                .unwrap();
            assert!(event.is_near_miss);
            assert_eq!(event.pattern_type, NearMissPattern::Swerve);
        }

        let summary = detector.analyze_patterns(Coordinate::new(40.0, -74.0), 1.0);
        assert_eq!(summary.total_events, 5);
        assert!(summary.hotspot);
        assert_eq!(summary.risk_level, AreaRiskLevel::High);
        assert_eq!(
            summary.most_common_pattern,
            Some(NearMissPattern::SuddenBrake)
        );
        assert_eq!(summary.severity_distribution.high, 3);
        assert_eq!(summary.severity_distribution.critical, 2);
    }

    #[test]
    fn most_common_pattern_tie_break_is_first_seen() {
        let mut detector = NearMissDetector::default();
        let now = Utc::now();
        // One sudden brake (0.95), then one swerve (0.9): both buffered,
        // tied at 1, sudden brake was first.
        let first = detector
            .detect_at(&sample(0.9, 0.5, -6.0, 0.0, 90.0), now)
            .unwrap();
        assert!(first.is_near_miss);
        assert_eq!(first.pattern_type, NearMissPattern::SuddenBrake);
        let second = detector
            .detect_at(&sample(0.0, 0.5, -6.0, 35.0, 120.0), now)
            .unwrap();
        assert!(second.is_near_miss);
        assert_eq!(second.pattern_type, NearMissPattern::Swerve);

        let summary = detector.analyze_patterns(Coordinate::new(40.0, -74.0), 1.0);
        assert_eq!(summary.total_events, 2);
        assert_eq!(
            summary.most_common_pattern,
            Some(NearMissPattern::SuddenBrake)
        );
    }

    #[test]
    fn analyze_patterns_ignores_distant_events() {
        let mut detector = NearMissDetector::default();
        detector.detect(&sample(0.9, 0.5, 0.0, 0.0, 90.0)).unwrap();

        // ~111 km away from the buffered event.
        let summary = detector.analyze_patterns(Coordinate::new(41.0, -74.0), 1.0);
        assert_eq!(summary.total_events, 0);
        assert!(!summary.hotspot);
        assert_eq!(summary.most_common_pattern, None);
        assert_eq!(summary.risk_level, AreaRiskLevel::Low);
    }
}
