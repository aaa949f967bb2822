pub mod identity;

use std::collections::HashMap;

use geo::{BooleanOps, Coord, Geometry, MapCoords, MultiPolygon};
use tracing::{debug, info, warn};

use crate::error::{Result, WorldTilerError};
use crate::tiling::slippy::{tile_bounds, TileRange};
use crate::tiling::store::TileStore;
use crate::types::{BuildingFeature, GeoBoundingBox};

pub use identity::{CoordinateKey, IdentityStrategy};

/// Decode a tile-local feature into geographic coordinates.
///
/// Tile-local coordinates span `[0, extent)` with the origin at the tile's
/// south-west corner. The mapping is applied structurally, so nested
/// multi-part geometries keep their shape. Undecodable geometry is demoted
/// to a per-feature coverage gap.
pub fn tile_feature_to_geo(
    feature: &geojson::Feature,
    bounds: &GeoBoundingBox,
    extent: f64,
) -> Option<BuildingFeature> {
    let geometry = feature.geometry.as_ref()?;
    let local = match Geometry::<f64>::try_from(&geometry.value) {
        Ok(g) => g,
        Err(e) => {
            warn!(error = %e, "Undecodable feature geometry, skipping feature");
            return None;
        }
    };

    let west = bounds.lon_min();
    let east = bounds.lon_max();
    let south = bounds.lat_min();
    let north = bounds.lat_max();
    let geographic = local.map_coords(|c: Coord<f64>| Coord {
        x: west + c.x / extent * (east - west),
        y: south + c.y / extent * (north - south),
    });

    let id = match &feature.id {
        Some(geojson::feature::Id::String(s)) => Some(s.clone()),
        Some(geojson::feature::Id::Number(n)) => Some(n.to_string()),
        None => None,
    };

    Some(BuildingFeature::new(
        id,
        geographic,
        feature.properties.clone().unwrap_or_default(),
    ))
}

/// Sequential accumulator fusing features by identity.
///
/// Accumulation over the shared identity map is inherently sequential; it
/// must not be parallelized across tiles without partitioning by identity
/// first, or two workers race on the same building id.
pub struct FeatureFuser {
    strategy: Box<dyn IdentityStrategy>,
    order: Vec<String>,
    by_id: HashMap<String, BuildingFeature>,
}

impl FeatureFuser {
    pub fn new(strategy: Box<dyn IdentityStrategy>) -> Self {
        Self {
            strategy,
            order: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Insert one feature, merging with any previously seen feature that
    /// shares its identity.
    pub fn insert(&mut self, incoming: BuildingFeature) {
        let key = self.strategy.identity(&incoming);
        match self.by_id.get(&key) {
            Some(existing) => {
                let merged = merge_features(existing, &incoming);
                self.by_id.insert(key, merged);
            }
            None => {
                self.order.push(key.clone());
                self.by_id.insert(key, incoming);
            }
        }
    }

    /// All fused features, in first-seen order.
    pub fn into_features(mut self) -> Vec<BuildingFeature> {
        self.order
            .iter()
            .filter_map(|key| self.by_id.remove(key))
            .collect()
    }
}

impl Default for FeatureFuser {
    fn default() -> Self {
        Self::new(Box::new(CoordinateKey))
    }
}

/// Merge two partial features sharing an identity.
///
/// Polygonal geometry is replaced by the planar union of both parts, which
/// recovers footprints split across a tile seam. Properties come from the
/// first-seen feature. Non-area geometry cannot be unioned; the first-seen
/// geometry wins.
pub fn merge_features(existing: &BuildingFeature, incoming: &BuildingFeature) -> BuildingFeature {
    let geometry = match (
        to_multi_polygon(&existing.geometry),
        to_multi_polygon(&incoming.geometry),
    ) {
        (Some(a), Some(b)) => Geometry::MultiPolygon(a.union(&b)),
        _ => {
            debug!("Identity collision on non-polygonal geometry, keeping first-seen");
            existing.geometry.clone()
        }
    };

    BuildingFeature::new(existing.id.clone(), geometry, existing.properties.clone())
}

fn to_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        _ => None,
    }
}

/// Property keys that mark a feature as extrusion-relevant.
const EXTRUDABLE_KEYS: [&str; 3] = ["height", "min_height", "render_height"];

/// Keep only features whose properties indicate height or extrusion
/// relevance. This is a whitelist over properties, not a geometry check;
/// zero-area geometry can pass and is rejected later by the mesh stage.
pub fn filter_extrudable(features: Vec<BuildingFeature>) -> Vec<BuildingFeature> {
    features
        .into_iter()
        .filter(|f| {
            EXTRUDABLE_KEYS.iter().any(|k| f.properties.contains_key(*k))
                || f.property_str("extrude").as_deref() == Some("true")
                || f.property_str("type").as_deref() == Some("building")
        })
        .collect()
}

/// Decode and fuse every vector tile in the range.
///
/// Missing tiles are coverage gaps; a range with no tiles at all, or one
/// that fuses to zero extrudable features, aborts the stage.
pub fn fuse_tiles(
    store: &TileStore,
    range: &TileRange,
    strategy: Box<dyn IdentityStrategy>,
) -> Result<Vec<BuildingFeature>> {
    let mut fuser = FeatureFuser::new(strategy);
    let mut tiles_seen = 0usize;
    let mut decoded = 0usize;

    for x in range.xs() {
        for y in range.ys() {
            let Some(payload) = store.load_vector(range.zoom, x, y)? else {
                debug!(tile = %format!("{}/{x}/{y}", range.zoom), "Missing vector tile, coverage gap");
                continue;
            };
            tiles_seen += 1;
            let bounds = tile_bounds(x, y, range.zoom);
            for feature in &payload.collection.features {
                if let Some(bf) = tile_feature_to_geo(feature, &bounds, payload.extent) {
                    decoded += 1;
                    fuser.insert(bf);
                }
            }
        }
    }

    if tiles_seen == 0 {
        return Err(WorldTilerError::Fusion(format!(
            "no vector tiles in range {}/{}..{}/{}..{}",
            range.zoom, range.x_min, range.x_max, range.y_min, range.y_max
        )));
    }

    let fused = fuser.len();
    let features = filter_extrudable(fuser.into_features());
    info!(
        tiles = tiles_seen,
        decoded,
        fused,
        extrudable = features.len(),
        "Vector fusion complete"
    );

    if features.is_empty() {
        return Err(WorldTilerError::Fusion(
            "no extrudable features after fusion".into(),
        ));
    }
    Ok(features)
}

/// The fused set as a GeoJSON FeatureCollection for persistence.
pub fn to_feature_collection(features: &[BuildingFeature]) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: features.iter().map(BuildingFeature::to_geojson).collect(),
        foreign_members: None,
    }
}

/// Summary statistics over the fused building set.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionStats {
    pub total: usize,
    pub with_height: usize,
    pub min_height: f64,
    pub max_height: f64,
    pub avg_height: f64,
}

pub fn feature_stats(features: &[BuildingFeature]) -> FusionStats {
    let heights: Vec<f64> = features
        .iter()
        .filter_map(|f| {
            f.property_str("height")
                .or_else(|| f.property_str("render_height"))
                .and_then(|s| s.parse::<f64>().ok())
        })
        .collect();

    let (min_height, max_height, avg_height) = if heights.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            heights.iter().copied().fold(f64::INFINITY, f64::min),
            heights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            heights.iter().sum::<f64>() / heights.len() as f64,
        )
    };

    FusionStats {
        total: features.len(),
        with_height: heights.len(),
        min_height,
        max_height,
        avg_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};
    use serde_json::{json, Map, Value};

    fn props(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn geojson_polygon_feature(
        id: Option<&str>,
        ring: Vec<Vec<f64>>,
        properties: Map<String, Value>,
    ) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))),
            id: id.map(|s| geojson::feature::Id::String(s.into())),
            properties: Some(properties),
            foreign_members: None,
        }
    }

    fn unit_tile_bounds() -> GeoBoundingBox {
        use crate::types::LatLon;
        GeoBoundingBox::new(LatLon::new(1.0, 10.0), LatLon::new(0.0, 11.0))
    }

    #[test]
    fn tile_coords_map_to_tile_corners() {
        // Corners of the tile-local space land on the tile's geographic corners
        let f = geojson_polygon_feature(
            Some("a"),
            vec![
                vec![0.0, 0.0],
                vec![4096.0, 0.0],
                vec![4096.0, 4096.0],
                vec![0.0, 0.0],
            ],
            Map::new(),
        );
        let bf = tile_feature_to_geo(&f, &unit_tile_bounds(), 4096.0).unwrap();

        let Geometry::Polygon(poly) = &bf.geometry else {
            panic!("expected polygon")
        };
        let coords: Vec<_> = poly.exterior().coords().collect();
        // (0,0) -> south-west corner
        assert!((coords[0].x - 10.0).abs() < 1e-9);
        assert!((coords[0].y - 0.0).abs() < 1e-9);
        // (extent,extent) -> north-east corner
        assert!((coords[2].x - 11.0).abs() < 1e-9);
        assert!((coords[2].y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multi_part_structure_is_preserved() {
        let f = geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::MultiPolygon(vec![
                vec![vec![
                    vec![0.0, 0.0],
                    vec![100.0, 0.0],
                    vec![100.0, 100.0],
                    vec![0.0, 0.0],
                ]],
                vec![vec![
                    vec![200.0, 200.0],
                    vec![300.0, 200.0],
                    vec![300.0, 300.0],
                    vec![200.0, 200.0],
                ]],
            ]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        let bf = tile_feature_to_geo(&f, &unit_tile_bounds(), 4096.0).unwrap();
        assert!(matches!(&bf.geometry, Geometry::MultiPolygon(mp) if mp.0.len() == 2));
    }

    #[test]
    fn feature_without_geometry_is_skipped() {
        let f = geojson::Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert!(tile_feature_to_geo(&f, &unit_tile_bounds(), 4096.0).is_none());
    }

    fn square(x0: f64, y0: f64, side: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
        ]
    }

    #[test]
    fn merging_adjacent_halves_restores_footprint() {
        // Two unit squares sharing an edge: the union's area is the sum,
        // with no seam gap and no double count.
        let a = BuildingFeature::new(
            Some("b1".into()),
            Geometry::Polygon(square(0.0, 0.0, 1.0)),
            props(&[("height", json!("10"))]),
        );
        let b = BuildingFeature::new(
            Some("b1".into()),
            Geometry::Polygon(square(1.0, 0.0, 1.0)),
            props(&[("height", json!("99"))]),
        );

        let mut fuser = FeatureFuser::default();
        fuser.insert(a);
        fuser.insert(b);
        assert_eq!(fuser.len(), 1);

        let features = fuser.into_features();
        let merged = &features[0];
        assert!((merged.geometry.unsigned_area() - 2.0).abs() < 1e-9);
        // Properties come from the first-seen feature
        assert_eq!(merged.property_str("height").as_deref(), Some("10"));
    }

    #[test]
    fn distinct_identities_stay_separate() {
        let mut fuser = FeatureFuser::default();
        fuser.insert(BuildingFeature::new(
            Some("b1".into()),
            Geometry::Polygon(square(0.0, 0.0, 1.0)),
            Map::new(),
        ));
        fuser.insert(BuildingFeature::new(
            Some("b2".into()),
            Geometry::Polygon(square(5.0, 5.0, 1.0)),
            Map::new(),
        ));
        assert_eq!(fuser.len(), 2);
    }

    #[test]
    fn filter_keeps_height_markers_only() {
        let make = |properties| {
            BuildingFeature::new(None, Geometry::Polygon(square(0.0, 0.0, 1.0)), properties)
        };
        let features = vec![
            make(props(&[("height", json!(12))])),
            make(props(&[("extrude", json!("true"))])),
            make(props(&[("type", json!("building"))])),
            make(props(&[("name", json!("park"))])),
            make(props(&[("min_height", json!(2))])),
        ];
        let kept = filter_extrudable(features);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn stats_summarize_heights() {
        let make = |properties| {
            BuildingFeature::new(None, Geometry::Polygon(square(0.0, 0.0, 1.0)), properties)
        };
        let features = vec![
            make(props(&[("height", json!("10"))])),
            make(props(&[("render_height", json!(30))])),
            make(props(&[("type", json!("building"))])),
        ];
        let stats = feature_stats(&features);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_height, 2);
        assert!((stats.min_height - 10.0).abs() < 1e-9);
        assert!((stats.max_height - 30.0).abs() < 1e-9);
        assert!((stats.avg_height - 20.0).abs() < 1e-9);
    }

    #[test]
    fn fuse_tiles_merges_across_seam() {
        use crate::tiling::slippy::{tile_bounds, TileRange};
        use crate::tiling::store::TileStore;
        use std::fs;

        let tmp = tempfile::tempdir().unwrap();
        let store = TileStore::new(tmp.path());
        let range = TileRange {
            zoom: 15,
            x_min: 17000,
            x_max: 17001,
            y_min: 11000,
            y_max: 11000,
        };

        // The same building id appears in both tiles
        for x in range.xs() {
            let feature = geojson_polygon_feature(
                Some("shared"),
                vec![
                    vec![0.0, 0.0],
                    vec![1000.0, 0.0],
                    vec![1000.0, 1000.0],
                    vec![0.0, 1000.0],
                    vec![0.0, 0.0],
                ],
                props(&[("height", json!("8"))]),
            );
            let fc = geojson::FeatureCollection {
                bbox: None,
                features: vec![feature],
                foreign_members: None,
            };
            let path = store.vector_path(15, x, 11000);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, fc.to_string()).unwrap();
        }

        let features = fuse_tiles(&store, &range, Box::new(CoordinateKey)).unwrap();
        assert_eq!(features.len(), 1);
        // The merged footprint covers parts of both tiles
        let w_bounds = tile_bounds(17000, 11000, 15);
        let area = features[0].geometry.unsigned_area();
        let tile_area = (w_bounds.lon_max() - w_bounds.lon_min())
            * (w_bounds.lat_max() - w_bounds.lat_min());
        let expected = 2.0 * tile_area * (1000.0 / 4096.0) * (1000.0 / 4096.0);
        assert!((area - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn fuse_tiles_empty_range_aborts() {
        use crate::tiling::slippy::TileRange;
        use crate::tiling::store::TileStore;

        let tmp = tempfile::tempdir().unwrap();
        let store = TileStore::new(tmp.path());
        let range = TileRange {
            zoom: 15,
            x_min: 0,
            x_max: 0,
            y_min: 0,
            y_max: 0,
        };
        let err = fuse_tiles(&store, &range, Box::new(CoordinateKey)).unwrap_err();
        assert!(err.to_string().contains("no vector tiles"));
    }
}
