use crate::types::LatLon;

/// Mean Earth radius in metres (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Angular threshold below which the aeqd scale factor is taken as 1.
const NEAR_ORIGIN: f64 = 1e-12;

/// Project a geographic point into the azimuthal-equidistant plane
/// centered at `origin`.
///
/// Returns `(east, north)` in metres. Distances from the origin are exact
/// great-circle distances; the frame is locally metric, which is what the
/// extrusion stage needs for footprints a few kilometres across.
pub fn project_aeqd(origin: LatLon, p: LatLon) -> (f64, f64) {
    let lat0 = origin.lat.to_radians();
    let lat = p.lat.to_radians();
    let dlon = (p.lon - origin.lon).to_radians();

    let cos_c = (lat0.sin() * lat.sin() + lat0.cos() * lat.cos() * dlon.cos()).clamp(-1.0, 1.0);
    let c = cos_c.acos();
    let k = if c.abs() < NEAR_ORIGIN { 1.0 } else { c / c.sin() };

    let east = EARTH_RADIUS_M * k * lat.cos() * dlon.sin();
    let north = EARTH_RADIUS_M * k * (lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * dlon.cos());
    (east, north)
}

/// Inverse of `project_aeqd`: plane metres back to geographic degrees.
pub fn inverse_aeqd(origin: LatLon, east: f64, north: f64) -> LatLon {
    let rho = east.hypot(north);
    if rho < NEAR_ORIGIN {
        return origin;
    }

    let lat0 = origin.lat.to_radians();
    let c = rho / EARTH_RADIUS_M;

    let lat = (c.cos() * lat0.sin() + north * c.sin() * lat0.cos() / rho)
        .clamp(-1.0, 1.0)
        .asin();
    let lon = origin.lon.to_radians()
        + (east * c.sin()).atan2(rho * c.cos() * lat0.cos() - north * c.sin() * lat0.sin());

    LatLon::new(lat.to_degrees(), lon.to_degrees())
}
