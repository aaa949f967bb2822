use std::path::Path;

use image::GrayImage;

use crate::error::Result;
use crate::types::bounds::{LatLon, TrueBoundary};

/// Normalized terrain heightmap.
///
/// A square `2^n + 1` grid of 8-bit samples spanning the recorded physical
/// elevation range over a tile-aligned geographic boundary. Created once per
/// world-generation run and read-only afterward.
#[derive(Debug, Clone)]
pub struct Heightmap {
    pub image: GrayImage,
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub boundary: TrueBoundary,
}

impl Heightmap {
    /// Side length of the square grid.
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Physical elevation span in metres (the world's size_z).
    pub fn elevation_range(&self) -> f64 {
        self.max_elevation - self.min_elevation
    }

    /// Raw normalized sample under a geographic point.
    pub fn sample(&self, p: LatLon) -> u8 {
        let (px, py) = self
            .boundary
            .pixel_at(p, self.image.width(), self.image.height());
        self.image.get_pixel(px, py).0[0]
    }

    /// Height above the world floor (min elevation) at a geographic point.
    pub fn relative_elevation(&self, p: LatLon) -> f64 {
        self.sample(p) as f64 / 255.0 * self.elevation_range()
    }

    /// Physical elevation reconstructed from a normalized sample.
    pub fn denormalize(&self, v: u8) -> f64 {
        v as f64 / 255.0 * self.elevation_range() + self.min_elevation
    }

    /// Physical elevation at a geographic point.
    pub fn elevation(&self, p: LatLon) -> f64 {
        self.denormalize(self.sample(p))
    }

    /// Persist as a single-channel 8-bit image.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}
