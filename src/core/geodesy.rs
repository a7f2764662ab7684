//! Great-circle distance on a spherical Earth.

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two points given in decimal degrees.
///
/// No ellipsoidal correction is applied; at urban scale (under a kilometre)
/// the error is far below the tier thresholds.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Latitude span, in degrees, covered by `distance_m` along a meridian.
pub fn meters_to_lat_degrees(distance_m: f64) -> f64 {
    (distance_m / EARTH_RADIUS_M).to_degrees()
}
