use geo::{GeodesicDistance, Point};
use tracing::{info, warn};

use crate::error::Result;
use crate::terrain::elevation_at;
use crate::tiling::store::TileStore;
use crate::types::{GeoPosition, Heightmap, LatLon, TrueBoundary, WorldFrame};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// WGS84 geodesic distance between two geographic points, metres.
pub fn geodesic_m(a: LatLon, b: LatLon) -> f64 {
    Point::new(a.lon, a.lat).geodesic_distance(&Point::new(b.lon, b.lat))
}

/// World extents from the true boundary's edges and the heightmap's
/// recorded elevation range.
pub fn world_sizes(boundary: &TrueBoundary, heightmap: &Heightmap) -> (f64, f64, f64) {
    let size_x = round2(geodesic_m(boundary.southwest, boundary.southeast));
    let size_y = round2(geodesic_m(boundary.southeast, boundary.northeast));
    let size_z = round2(heightmap.elevation_range());
    (size_x, size_y, size_z)
}

/// East-North offset of `coord` from `origin`, metres, positive toward
/// east/north.
///
/// Each axis is a geodesic with the other coordinate held fixed — an
/// approximation of a true ENU projection that accumulates error far from
/// the origin, acceptable at the few-tile scale of one world.
pub fn offset(origin: LatLon, coord: LatLon) -> (f64, f64) {
    let east = geodesic_m(origin, LatLon::new(origin.lat, coord.lon));
    let east = if coord.lon >= origin.lon { east } else { -east };

    let north = geodesic_m(origin, LatLon::new(coord.lat, origin.lon));
    let north = if coord.lat >= origin.lat { north } else { -north };

    (round2(east), round2(north))
}

/// Terrain-clearance vertical pose: the heightmap height under the launch
/// point plus a safety margin fraction of itself, negated so the world
/// anchor sits above the surface.
pub fn clearance_pose_z(heightmap: &Heightmap, launch: LatLon, safety_margin: f64) -> f64 {
    let launch_height = heightmap.relative_elevation(launch);
    round2(-(launch_height + safety_margin * launch_height))
}

/// Compute the full world frame for a generated terrain.
///
/// The origin is the true-boundary midpoint; its altitude comes from the
/// DEM tile underneath it, and an unresolvable origin tile is the one
/// fatal coverage failure. A launch point outside DEM coverage falls back
/// to the origin altitude.
pub fn compute_world_frame(
    store: &TileStore,
    boundary: &TrueBoundary,
    heightmap: &Heightmap,
    launch: Option<LatLon>,
    dem_zoom: u32,
    safety_margin: f64,
) -> Result<WorldFrame> {
    let origin_ll = boundary.center();
    let origin_alt = elevation_at(store, origin_ll, dem_zoom)?;

    let launch_ll = launch.unwrap_or(origin_ll);
    let launch_alt = match elevation_at(store, launch_ll, dem_zoom) {
        Ok(alt) => alt,
        Err(e) => {
            warn!(error = %e, "Launch point outside DEM coverage, using origin altitude");
            origin_alt
        }
    };

    let (size_x, size_y, size_z) = world_sizes(boundary, heightmap);
    let (pose_x, pose_y) = offset(origin_ll, launch_ll);
    let pose_z = clearance_pose_z(heightmap, launch_ll, safety_margin);

    info!(
        size_x,
        size_y,
        size_z,
        pose_x,
        pose_y,
        pose_z,
        "World frame computed"
    );

    Ok(WorldFrame {
        size_x,
        size_y,
        size_z,
        origin: GeoPosition {
            latitude: origin_ll.lat,
            longitude: origin_ll.lon,
            altitude: origin_alt,
        },
        launch: GeoPosition {
            latitude: launch_ll.lat,
            longitude: launch_ll.lon,
            altitude: launch_alt,
        },
        pose_x,
        pose_y,
        pose_z,
    })
}
