use std::path::{Path, PathBuf};

use geojson::{FeatureCollection, GeoJson};
use image::RgbImage;
use tracing::warn;

use crate::error::Result;

/// Declared tile-local coordinate extent when a payload does not carry one.
pub const DEFAULT_EXTENT: f64 = 4096.0;

/// A decoded vector tile: a feature collection in tile-local integer
/// coordinates plus the declared extent those coordinates span.
#[derive(Debug, Clone)]
pub struct VectorTilePayload {
    pub extent: f64,
    pub collection: FeatureCollection,
}

/// Read access to a `root/zoom/x/y` tile directory.
///
/// Tile acquisition (external) fills this layout with raster `.png` and
/// vector `.json` payloads; absence is represented by "no file", never a
/// partial payload. Malformed payloads are demoted to coverage gaps at
/// this boundary.
#[derive(Debug, Clone)]
pub struct TileStore {
    root: PathBuf,
}

impl TileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raster_path(&self, zoom: u32, x: u32, y: u32) -> PathBuf {
        self.root
            .join(zoom.to_string())
            .join(x.to_string())
            .join(format!("{y}.png"))
    }

    pub fn vector_path(&self, zoom: u32, x: u32, y: u32) -> PathBuf {
        self.root
            .join(zoom.to_string())
            .join(x.to_string())
            .join(format!("{y}.json"))
    }

    pub fn has_raster(&self, zoom: u32, x: u32, y: u32) -> bool {
        self.raster_path(zoom, x, y).is_file()
    }

    /// Load one raster tile. `Ok(None)` means a coverage gap: the file is
    /// absent, or present but undecodable (logged and skipped).
    pub fn load_raster(&self, zoom: u32, x: u32, y: u32) -> Result<Option<RgbImage>> {
        let path = self.raster_path(zoom, x, y);
        if !path.is_file() {
            return Ok(None);
        }
        match image::open(&path) {
            Ok(img) => Ok(Some(img.to_rgb8())),
            Err(e) => {
                warn!(tile = %format!("{zoom}/{x}/{y}"), error = %e, "Undecodable raster tile, treating as coverage gap");
                Ok(None)
            }
        }
    }

    /// Load one vector tile. Same coverage-gap policy as `load_raster`.
    ///
    /// The payload is a GeoJSON FeatureCollection with tile-local
    /// coordinates; a top-level `extent` member overrides the default 4096.
    pub fn load_vector(&self, zoom: u32, x: u32, y: u32) -> Result<Option<VectorTilePayload>> {
        let path = self.vector_path(zoom, x, y);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let collection = match raw.parse::<GeoJson>() {
            Ok(GeoJson::FeatureCollection(fc)) => fc,
            Ok(_) => {
                warn!(tile = %format!("{zoom}/{x}/{y}"), "Vector tile is not a FeatureCollection, treating as coverage gap");
                return Ok(None);
            }
            Err(e) => {
                warn!(tile = %format!("{zoom}/{x}/{y}"), error = %e, "Undecodable vector tile, treating as coverage gap");
                return Ok(None);
            }
        };

        let extent = collection
            .foreign_members
            .as_ref()
            .and_then(|m| m.get("extent"))
            .and_then(|v| v.as_f64())
            .unwrap_or(DEFAULT_EXTENT);

        Ok(Some(VectorTilePayload { extent, collection }))
    }
}
