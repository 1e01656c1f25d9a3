//! Great-circle geometry for a single shot.
//!
//! Everything here is a pure function over plain numbers. Invalid input
//! (NaN, latitudes outside ±90°) is not rejected: it flows through as NaN in
//! the `f64` results.

use crate::model::{GeoPoint, ShotGeometry, WindClassification, WindObservation};

/// Mean Earth radius in metres (spherical model).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // tiny negative inputs round up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped + 0.0 }
}

/// Signed difference `a - b` wrapped into `(-180, 180]`.
fn signed_difference(a: f64, b: f64) -> f64 {
    let diff = normalize_degrees(a - b);
    if diff > 180.0 { diff - 360.0 } else { diff }
}

/// Haversine distance in metres, unrounded.
pub fn great_circle_meters(origin: GeoPoint, target: GeoPoint) -> f64 {
    let phi1 = origin.latitude.to_radians();
    let phi2 = target.latitude.to_radians();
    let d_phi = (target.latitude - origin.latitude).to_radians();
    let d_lambda = (target.longitude - origin.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Near-antipodal points can push `a` a hair past 1. Written as a
    // comparison so NaN still propagates.
    let a = if a > 1.0 { 1.0 } else { a };

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Haversine distance rounded to the nearest whole metre.
///
/// A NaN distance saturates to `0` through the float-to-integer cast.
pub fn distance_meters(origin: GeoPoint, target: GeoPoint) -> u32 {
    great_circle_meters(origin, target).round() as u32
}

/// Initial bearing (forward azimuth) from `origin` to `target`, clockwise
/// from true north, in `[0, 360)`.
///
/// When `origin == target` the bearing is undefined; this returns `0.0`
/// because `f64::atan2(0.0, 0.0)` is `+0.0`. Don't read anything into the
/// bearing of a zero-length shot.
pub fn bearing_degrees(origin: GeoPoint, target: GeoPoint) -> f64 {
    let phi1 = origin.latitude.to_radians();
    let phi2 = target.latitude.to_radians();
    let d_lambda = (target.longitude - origin.longitude).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Classify the wind relative to the line of a shot.
///
/// `wind.direction_deg` is where the wind blows *from*, so a wind from the
/// same direction the ball is travelling towards is a headwind. Boundaries
/// at exactly 45° and 135° go to headwind and tailwind respectively.
///
/// Wind speed is not consulted: a calm day still gets a label.
pub fn classify_wind(wind: &WindObservation, shot_bearing_deg: f64) -> WindClassification {
    let diff = signed_difference(wind.direction_deg, shot_bearing_deg);
    let magnitude = diff.abs();

    if magnitude <= 45.0 {
        WindClassification::Headwind
    } else if magnitude >= 135.0 {
        WindClassification::Tailwind
    } else if diff > 0.0 {
        WindClassification::CrosswindRight
    } else {
        WindClassification::CrosswindLeft
    }
}

/// 16-point compass abbreviation for a direction in degrees.
pub fn compass_label(direction_deg: f64) -> &'static str {
    let index = (normalize_degrees(direction_deg) / 22.5).round() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

/// Wind direction as seen from someone facing `heading_deg`, in `[0, 360)`.
/// `0` means the wind comes from straight ahead.
pub fn relative_wind_degrees(wind_direction_deg: f64, heading_deg: f64) -> f64 {
    normalize_degrees(wind_direction_deg - heading_deg)
}

/// Distance, bearing and wind classification for a shot from `origin` to
/// `target`.
pub fn shot_geometry(origin: GeoPoint, target: GeoPoint, wind: &WindObservation) -> ShotGeometry {
    let bearing_deg = bearing_degrees(origin, target);

    ShotGeometry {
        distance_m: distance_meters(origin, target),
        bearing_deg,
        wind: classify_wind(wind, bearing_deg),
    }
}
