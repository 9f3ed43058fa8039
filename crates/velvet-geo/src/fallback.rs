//! Straight-line distance fallback.
//!
//! When the distance service is unavailable, a venue reference that carries
//! coordinates (map links usually do) can still be resolved to a
//! great-circle estimate.

use std::sync::LazyLock;

use regex::Regex;

use velvet_core::types::Coordinates;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A "lat,lng" decimal pair anywhere in the reference string. Matches the
/// `@25.2,55.3` form in map links as well as `q=25.2,55.3` query params.
static COORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)").unwrap()
});

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Extract a coordinate pair from a venue reference (map link or address).
///
/// Returns `None` when no in-range decimal pair is present.
pub fn extract_coordinates(reference: &str) -> Option<Coordinates> {
    for caps in COORD_RE.captures_iter(reference) {
        let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
        let lng: f64 = caps.get(2)?.as_str().parse().ok()?;
        if lat.abs() <= 90.0 && lng.abs() <= 180.0 {
            return Some(Coordinates { lat, lng });
        }
    }
    None
}
