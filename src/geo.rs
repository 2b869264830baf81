/// Mean Earth radius used by the spherical approximation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// distance_km
///
/// Great-circle distance in kilometres between two points given in decimal
/// degrees, using the haversine formula on a sphere of radius
/// [`EARTH_RADIUS_KM`]. Pure and deterministic. Callers must reject requests
/// with missing coordinates before calling it.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}
