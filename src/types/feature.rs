use geo::Geometry;
use serde_json::{Map, Value};

/// A building feature in geographic coordinates.
///
/// Partial features split across tile seams carry the same identity and are
/// merged by the fuser; properties always come from the first-seen part.
#[derive(Debug, Clone)]
pub struct BuildingFeature {
    /// Source-supplied feature id, when the tileset provides one.
    pub id: Option<String>,
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl BuildingFeature {
    pub fn new(id: Option<String>, geometry: Geometry<f64>, properties: Map<String, Value>) -> Self {
        Self {
            id,
            geometry,
            properties,
        }
    }

    /// Property value rendered as a string, for height-tag parsing.
    /// JSON numbers and strings are both accepted; anything else is None.
    pub fn property_str(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Convert to a GeoJSON feature for persistence.
    pub fn to_geojson(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: self
                .id
                .clone()
                .map(geojson::feature::Id::String),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }
}
