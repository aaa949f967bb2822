use serde::Serialize;

/// A geographic position with altitude, metres above mean sea level.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// World extents and pose values consumed by the external scene writer.
///
/// Sizes are metres along the true-boundary edges; pose offsets are the
/// launch point's East-North displacement from the world origin plus the
/// terrain-clearance vertical offset.
#[derive(Debug, Clone, Serialize)]
pub struct WorldFrame {
    pub size_x: f64,
    pub size_y: f64,
    pub size_z: f64,
    pub origin: GeoPosition,
    pub launch: GeoPosition,
    pub pose_x: f64,
    pub pose_y: f64,
    pub pose_z: f64,
}
