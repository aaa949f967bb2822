use geo::orient::{Direction, Orient};
use geo::{
    Area, BooleanOps, CoordsIter, EuclideanLength, LineString, MultiPolygon, Point, Polygon,
    TriangulateEarcut,
};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::BuildingConfig;
use crate::types::TriangleMesh;

/// Height-like property keys, highest priority first. The order must be
/// preserved exactly.
const HEIGHT_KEYS: [&str; 4] = ["height", "building:height", "ele", "min_height"];
const LEVELS_KEY: &str = "building:levels";

/// Parse a height-like tag value, stripping non-numeric characters
/// ("12 m" -> 12.0).
fn clean_height(value: Option<&Value>) -> Option<f64> {
    let raw = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Resolve a feature's extrusion height in metres: the first positive value
/// among the height keys, else `building:levels` times the per-level
/// height, else the configured default.
pub fn resolve_height(properties: &Map<String, Value>, config: &BuildingConfig) -> f64 {
    for key in HEIGHT_KEYS {
        if let Some(v) = clean_height(properties.get(key)) {
            if v > 0.0 {
                return v;
            }
        }
    }

    if let Some(levels) = clean_height(properties.get(LEVELS_KEY)) {
        if levels > 0.0 {
            return levels * config.level_height;
        }
    }

    config.default_height
}

/// Drop rings that cannot close a surface and orient the rest
/// (exterior counter-clockwise, holes clockwise).
fn normalize_polygon(polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    if polygon.exterior().coords_count() < 4 {
        return None;
    }
    let interiors: Vec<LineString<f64>> = polygon
        .interiors()
        .iter()
        .filter(|ring| ring.coords_count() >= 4)
        .cloned()
        .collect();
    Some(Polygon::new(polygon.exterior().clone(), interiors).orient(Direction::Default))
}

/// Extrude a planar polygon into a capped solid of the given height.
///
/// Polygons with area below the configured threshold, or topology the
/// triangulator cannot handle even after normalization, yield `None` and
/// are dropped by the caller.
pub fn extrude_polygon(
    polygon: &Polygon<f64>,
    height: f64,
    config: &BuildingConfig,
) -> Option<TriangleMesh> {
    if polygon.unsigned_area() < config.min_polygon_area {
        return None;
    }
    let polygon = normalize_polygon(polygon)?;

    let raw = polygon.earcut_triangles_raw();
    if raw.triangle_indices.is_empty() {
        warn!("Polygon topology unrepairable, dropping feature geometry");
        return None;
    }

    let mut mesh = TriangleMesh::default();
    let cap_vertices = raw.vertices.len() / 2;

    // Bottom cap at z = 0, top cap at z = height
    for pair in raw.vertices.chunks_exact(2) {
        mesh.positions
            .extend_from_slice(&[pair[0] as f32, pair[1] as f32, 0.0]);
    }
    for pair in raw.vertices.chunks_exact(2) {
        mesh.positions
            .extend_from_slice(&[pair[0] as f32, pair[1] as f32, height as f32]);
    }
    for tri in raw.triangle_indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as u32, tri[1] as u32, tri[2] as u32);
        // Bottom faces down: reversed winding
        mesh.indices.extend_from_slice(&[a, c, b]);
        let top = cap_vertices as u32;
        mesh.indices.extend_from_slice(&[top + a, top + b, top + c]);
    }

    // Walls from every ring edge. Exterior runs counter-clockwise so the
    // outward side is to the right of travel; holes run clockwise and face
    // their cavity.
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors().iter()) {
        for edge in ring.lines() {
            let base = mesh.positions.len() as u32 / 3;
            for (x, y, z) in [
                (edge.start.x, edge.start.y, 0.0),
                (edge.end.x, edge.end.y, 0.0),
                (edge.end.x, edge.end.y, height),
                (edge.start.x, edge.start.y, height),
            ] {
                mesh.positions
                    .extend_from_slice(&[x as f32, y as f32, z as f32]);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    Some(mesh)
}

/// Buffer a line to a flat-ended ribbon of the given half-width.
///
/// One rectangle per segment, unioned; adequate for the fixed width used
/// for linear obstacles.
pub fn buffer_line(line: &LineString<f64>, half_width: f64) -> Option<MultiPolygon<f64>> {
    let mut acc: Option<MultiPolygon<f64>> = None;
    for segment in line.lines() {
        let (dx, dy) = (segment.dx(), segment.dy());
        let len = dx.hypot(dy);
        if len == 0.0 {
            continue;
        }
        let (nx, ny) = (-dy / len * half_width, dx / len * half_width);
        let quad = Polygon::new(
            LineString::from(vec![
                (segment.start.x + nx, segment.start.y + ny),
                (segment.start.x - nx, segment.start.y - ny),
                (segment.end.x - nx, segment.end.y - ny),
                (segment.end.x + nx, segment.end.y + ny),
            ]),
            vec![],
        );
        let quad = MultiPolygon::new(vec![quad]);
        acc = Some(match acc {
            None => quad,
            Some(a) => a.union(&quad),
        });
    }
    acc
}

/// Extrude a line feature: buffer to the configured width, then raise the
/// ribbon by the fixed line height. Lines shorter than the minimum are
/// dropped.
pub fn extrude_line(line: &LineString<f64>, config: &BuildingConfig) -> Option<TriangleMesh> {
    if line.euclidean_length() < config.min_line_length {
        return None;
    }
    let buffered = buffer_line(line, config.line_width / 2.0)?;

    let mut mesh = TriangleMesh::default();
    for polygon in &buffered {
        if let Some(solid) = extrude_polygon(polygon, config.line_height, config) {
            mesh.append(&solid);
        }
    }
    if mesh.is_empty() {
        None
    } else {
        Some(mesh)
    }
}

/// A fixed-size cube centered on the point, base sitting at z = 0.
pub fn cube_at(point: &Point<f64>, size: f64) -> TriangleMesh {
    let half = size / 2.0;
    let (x0, x1) = (point.x() - half, point.x() + half);
    let (y0, y1) = (point.y() - half, point.y() + half);

    let mut mesh = TriangleMesh::default();
    for (x, y, z) in [
        (x0, y0, 0.0),
        (x1, y0, 0.0),
        (x1, y1, 0.0),
        (x0, y1, 0.0),
        (x0, y0, size),
        (x1, y0, size),
        (x1, y1, size),
        (x0, y1, size),
    ] {
        mesh.positions
            .extend_from_slice(&[x as f32, y as f32, z as f32]);
    }
    #[rustfmt::skip]
    mesh.indices.extend_from_slice(&[
        0, 2, 1, 0, 3, 2, // bottom
        4, 5, 6, 4, 6, 7, // top
        0, 1, 5, 0, 5, 4, // south
        1, 2, 6, 1, 6, 5, // east
        2, 3, 7, 2, 7, 6, // north
        3, 0, 4, 3, 4, 7, // west
    ]);
    mesh
}
