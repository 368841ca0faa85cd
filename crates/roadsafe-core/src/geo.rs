//! Spatial math for geofencing and route-segment distance calculations.

use thiserror::Error;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Validation failures for boundary input.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("coordinate out of range: lat {latitude}, lon {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// Calculate distance between two points in kilometers using the Haversine formula.
///
/// This is the standard formula for calculating great-circle distance
/// between two points on a sphere given their latitudes and longitudes.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in kilometers
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Calculate bearing from point 1 to point 2 in degrees, normalized to 0-360.
/// 0 = north, 90 = east.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Check if a point lies within a circular geofence (inclusive boundary).
pub fn point_in_radius_km(
    point_lat: f64,
    point_lon: f64,
    center_lat: f64,
    center_lon: f64,
    radius_km: f64,
) -> bool {
    haversine_km(point_lat, point_lon, center_lat, center_lon) <= radius_km
}

// ==== ENU (East-North-Up) Coordinate Conversion ====
// These functions convert between kilometers and degrees using latitude-aware scaling.

/// Kilometers per degree of latitude at a given latitude (WGS84 approximation).
pub fn km_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    (111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos())
        / 1000.0
}

/// Kilometers per degree of longitude at a given latitude (WGS84 approximation).
pub fn km_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    (111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos())
        / 1000.0
}

/// Calculate minimum distance from a point to a line segment (in kilometers).
///
/// Projects into a locally-flat ENU plane anchored at the segment start, which is
/// accurate at the sub-kilometer scale the risk-zone matching operates on.
pub fn distance_to_segment_km(
    point_lat: f64,
    point_lon: f64,
    seg_start_lat: f64,
    seg_start_lon: f64,
    seg_end_lat: f64,
    seg_end_lon: f64,
) -> f64 {
    let ref_lat = seg_start_lat;

    // Point in local coords
    let px = (point_lon - seg_start_lon) * km_per_deg_lon(ref_lat);
    let py = (point_lat - seg_start_lat) * km_per_deg_lat(ref_lat);

    // Segment end in local coords
    let sx = (seg_end_lon - seg_start_lon) * km_per_deg_lon(ref_lat);
    let sy = (seg_end_lat - seg_start_lat) * km_per_deg_lat(ref_lat);

    let seg_len_sq = sx * sx + sy * sy;

    if seg_len_sq < 1e-10 {
        // Segment is essentially a point
        return haversine_km(point_lat, point_lon, seg_start_lat, seg_start_lon);
    }

    // Project point onto segment line: t = ((P-A) . (B-A)) / |B-A|^2
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);

    let closest_x = t * sx;
    let closest_y = t * sy;

    let dx = px - closest_x;
    let dy = py - closest_y;

    (dx * dx + dy * dy).sqrt()
}

/// Linearly interpolate between two coordinates.
/// `fraction` 0.0 returns the first point, 1.0 the second.
pub fn interpolate(lat1: f64, lon1: f64, lat2: f64, lon2: f64, fraction: f64) -> (f64, f64) {
    (
        lat1 + (lat2 - lat1) * fraction,
        lon1 + (lon2 - lon1) * fraction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111.19).abs() < 0.1);
    }

    #[test]
    fn haversine_same_point() {
        let dist = haversine_km(40.7128, -74.0060, 40.7128, -74.0060);
        assert!(dist < 1e-9);
    }

    #[test]
    fn haversine_is_symmetric() {
        let pairs = [
            (40.7128, -74.0060, 51.5074, -0.1278),
            (-33.8688, 151.2093, 35.6762, 139.6503),
            (0.0, 179.9, 0.0, -179.9),
        ];
        for (lat1, lon1, lat2, lon2) in pairs {
            let forward = haversine_km(lat1, lon1, lat2, lon2);
            let backward = haversine_km(lat2, lon2, lat1, lon1);
            assert!((forward - backward).abs() < 1e-9);
        }
    }

    #[test]
    fn bearing_due_east() {
        let bearing = bearing_deg(0.0, 0.0, 0.0, 1.0);
        assert!((bearing - 90.0).abs() < 0.01);
    }

    #[test]
    fn point_on_segment_has_zero_distance() {
        // Point exactly on the equatorial segment (0,0)->(0,1)
        let dist = distance_to_segment_km(0.0, 0.5, 0.0, 0.0, 0.0, 1.0);
        assert!(dist < 0.01, "expected ~0, got {dist}");
    }

    #[test]
    fn point_beside_segment_measures_perpendicular() {
        // ~0.01 degrees north of the segment midpoint, ~1.11km
        let dist = distance_to_segment_km(0.01, 0.5, 0.0, 0.0, 0.0, 1.0);
        assert!((dist - 1.11).abs() < 0.02, "got {dist}");
    }

    #[test]
    fn degenerate_segment_falls_back_to_point_distance() {
        let dist = distance_to_segment_km(0.0, 0.5, 0.0, 0.0, 0.0, 0.0);
        let direct = haversine_km(0.0, 0.5, 0.0, 0.0);
        assert!((dist - direct).abs() < 1e-9);
    }

    #[test]
    fn point_in_radius_boundary_is_inclusive() {
        let dist = haversine_km(40.0, -74.0, 40.01, -74.0);
        assert!(point_in_radius_km(40.01, -74.0, 40.0, -74.0, dist));
    }

    #[test]
    fn interpolate_endpoints_and_midpoint() {
        assert_eq!(interpolate(0.0, 0.0, 2.0, 4.0, 0.0), (0.0, 0.0));
        assert_eq!(interpolate(0.0, 0.0, 2.0, 4.0, 1.0), (2.0, 4.0));
        assert_eq!(interpolate(0.0, 0.0, 2.0, 4.0, 0.5), (1.0, 2.0));
    }
}
