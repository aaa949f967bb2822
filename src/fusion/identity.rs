use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use geo::CoordsIter;

use crate::types::BuildingFeature;

/// Cross-tile identity assignment for building features.
///
/// Identity decides which partial features get merged across tile seams,
/// so alternate strategies (e.g. spatial-overlap matching) can be swapped
/// in without touching the fuser.
pub trait IdentityStrategy: Send + Sync {
    fn identity(&self, feature: &BuildingFeature) -> String;
}

/// Default strategy: the source-supplied id when present, otherwise the
/// feature's first coordinate rounded to 6 decimal degrees (~0.1 m).
///
/// The coordinate key is a best-effort stand-in for true identity: it can
/// collide for near-identical but distinct buildings, and it can fail to
/// match the same building when the split parts start at different
/// vertices.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateKey;

impl IdentityStrategy for CoordinateKey {
    fn identity(&self, feature: &BuildingFeature) -> String {
        if let Some(id) = &feature.id {
            return id.clone();
        }
        if let Some(c) = feature.geometry.coords_iter().next() {
            return format!("{:.6},{:.6}", c.x, c.y);
        }
        // Empty geometry: hash the properties so the feature stays distinct
        let mut hasher = DefaultHasher::new();
        serde_json::Value::Object(feature.properties.clone())
            .to_string()
            .hash(&mut hasher);
        format!("hash:{:016x}", hasher.finish())
    }
}
