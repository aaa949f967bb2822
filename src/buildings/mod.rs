pub mod extrude;
pub mod local_frame;

use geo::{Centroid, Coord, Geometry, LineString, MapCoords, Point, Polygon};
use tracing::{debug, info};

use crate::config::BuildingConfig;
use crate::error::{Result, WorldTilerError};
use crate::types::{BuildingFeature, Heightmap, LatLon, TriangleMesh};

pub use extrude::{buffer_line, cube_at, extrude_line, extrude_polygon, resolve_height};
pub use local_frame::{inverse_aeqd, project_aeqd};

/// A single-part geometry ready for one extrusion handler.
enum Primitive {
    Polygon(Polygon<f64>),
    Line(LineString<f64>),
    Point(Point<f64>),
}

impl Primitive {
    fn centroid(&self) -> Option<Point<f64>> {
        match self {
            Primitive::Polygon(p) => p.centroid(),
            Primitive::Line(l) => l.centroid(),
            Primitive::Point(p) => Some(*p),
        }
    }

    fn solid(&self, height: f64, config: &BuildingConfig) -> Option<TriangleMesh> {
        match self {
            Primitive::Polygon(p) => extrude_polygon(p, height, config),
            Primitive::Line(l) => extrude_line(l, config),
            Primitive::Point(p) => Some(cube_at(p, config.point_size)),
        }
    }
}

/// Recursively flatten multi-part geometry into extrudable primitives,
/// preserving order.
fn flatten_geometry(geometry: &Geometry<f64>, out: &mut Vec<Primitive>) {
    match geometry {
        Geometry::Polygon(p) => out.push(Primitive::Polygon(p.clone())),
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                out.push(Primitive::Polygon(p.clone()));
            }
        }
        Geometry::LineString(l) => out.push(Primitive::Line(l.clone())),
        Geometry::MultiLineString(ml) => {
            for l in &ml.0 {
                out.push(Primitive::Line(l.clone()));
            }
        }
        Geometry::Line(l) => out.push(Primitive::Line(LineString::from(*l))),
        Geometry::Point(p) => out.push(Primitive::Point(*p)),
        Geometry::MultiPoint(mp) => {
            for p in &mp.0 {
                out.push(Primitive::Point(*p));
            }
        }
        Geometry::Rect(r) => out.push(Primitive::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => out.push(Primitive::Polygon(t.to_polygon())),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                flatten_geometry(g, out);
            }
        }
    }
}

/// Reproject feature geometry into the metric frame centered on `origin`.
pub fn project_to_local_frame(geometry: &Geometry<f64>, origin: LatLon) -> Geometry<f64> {
    geometry.map_coords(|c: Coord<f64>| {
        let (east, north) = project_aeqd(origin, LatLon::new(c.y, c.x));
        Coord { x: east, y: north }
    })
}

/// Extrude fused features into one combined model placed on the terrain.
///
/// Each primitive is extruded in the local frame, then raised to the
/// heightmap elevation sampled at its planar centroid (the footprint is
/// assumed locally flat) plus the supplied vertical datum offset.
/// Degenerate primitives are dropped individually; an assembly that drops
/// everything aborts the stage.
pub fn assemble_buildings(
    features: &[BuildingFeature],
    origin: LatLon,
    heightmap: &Heightmap,
    vertical_offset: f64,
    config: &BuildingConfig,
) -> Result<TriangleMesh> {
    let mut combined = TriangleMesh::default();
    let mut solids = 0usize;
    let mut dropped = 0usize;

    for feature in features {
        let height = resolve_height(&feature.properties, config);
        let local = project_to_local_frame(&feature.geometry, origin);

        let mut primitives = Vec::new();
        flatten_geometry(&local, &mut primitives);

        for primitive in primitives {
            let Some(mut solid) = primitive.solid(height, config) else {
                dropped += 1;
                continue;
            };
            let Some(centroid) = primitive.centroid() else {
                dropped += 1;
                continue;
            };

            let geographic = inverse_aeqd(origin, centroid.x(), centroid.y());
            let elevation = heightmap.relative_elevation(geographic);
            solid.translate_z(elevation + vertical_offset);

            combined.append(&solid);
            solids += 1;
        }
    }

    if combined.is_empty() {
        return Err(WorldTilerError::Mesh(format!(
            "no building geometry produced from {} features ({dropped} primitives dropped)",
            features.len()
        )));
    }

    debug!(solids, dropped, "Extrusion complete");
    combined.recompute_normals();
    info!(
        vertices = combined.vertex_count(),
        triangles = combined.triangle_count(),
        "Combined building model"
    );
    Ok(combined)
}
