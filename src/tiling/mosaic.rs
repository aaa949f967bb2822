use image::{imageops, RgbImage};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Result, WorldTilerError};
use crate::tiling::slippy::TileRange;
use crate::tiling::store::TileStore;
use crate::types::{LatLon, TrueBoundary};

/// A raster mosaic assembled from a rectangular tile-index range.
///
/// Owns the pixel-to-geocoordinate affine mapping derived from the range's
/// tile-aligned boundary.
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub image: RgbImage,
    pub boundary: TrueBoundary,
}

impl Mosaic {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Fractional pixel coordinates of a geographic point (north-up).
    pub fn pixel_of(&self, p: LatLon) -> (f64, f64) {
        let b = &self.boundary;
        let px = (p.lon - b.lon_min()) / (b.lon_max() - b.lon_min()) * self.width() as f64;
        let py = (b.lat_max() - p.lat) / (b.lat_max() - b.lat_min()) * self.height() as f64;
        (px, py)
    }
}

/// Assemble one mosaic over the given tile range.
///
/// Per x-column, present y-tiles are concatenated vertically; absent tiles
/// are skipped as coverage gaps. Columns are then concatenated horizontally,
/// keeping only columns whose pixel dimensions match the first assembled
/// column — mismatched columns are dropped, not fatal. Callers must treat
/// partial coverage as expected when source tiles are missing.
///
/// Fails with `MissingBaseTile` when the first tile of the range is absent:
/// without it the mosaic cannot be seeded.
pub fn build_mosaic(store: &TileStore, range: &TileRange) -> Result<Mosaic> {
    if !store.has_raster(range.zoom, range.x_min, range.y_min) {
        return Err(WorldTilerError::MissingBaseTile {
            zoom: range.zoom,
            x: range.x_min,
            y: range.y_min,
        });
    }

    // Columns are independent: disjoint inputs, disjoint outputs.
    let xs: Vec<u32> = range.xs().collect();
    let columns: Vec<Option<RgbImage>> = xs
        .par_iter()
        .map(|&x| build_column(store, range, x))
        .collect::<Result<_>>()?;

    let mut assembled: Vec<RgbImage> = Vec::with_capacity(columns.len());
    for (x, column) in xs.iter().zip(columns.into_iter()) {
        let Some(column) = column else {
            warn!(column = x, "No tiles in column, dropping");
            continue;
        };
        if let Some(first) = assembled.first() {
            if column.dimensions() != first.dimensions() {
                warn!(
                    column = x,
                    got = ?column.dimensions(),
                    want = ?first.dimensions(),
                    "Column dimension mismatch, dropping"
                );
                continue;
            }
        }
        assembled.push(column);
    }

    if assembled.is_empty() {
        return Err(WorldTilerError::Mosaic(format!(
            "no usable columns in range {}/{}..{}/{}..{}",
            range.zoom, range.x_min, range.x_max, range.y_min, range.y_max
        )));
    }

    let (col_w, col_h) = assembled[0].dimensions();
    let mut canvas = RgbImage::new(col_w * assembled.len() as u32, col_h);
    for (i, column) in assembled.iter().enumerate() {
        imageops::replace(&mut canvas, column, (i as u32 * col_w) as i64, 0);
    }

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        columns = assembled.len(),
        "Mosaic assembled"
    );

    Ok(Mosaic {
        image: canvas,
        boundary: range.true_boundary(),
    })
}

/// Vertically concatenate the present tiles of one x-column, north to south.
fn build_column(store: &TileStore, range: &TileRange, x: u32) -> Result<Option<RgbImage>> {
    let mut tiles: Vec<RgbImage> = Vec::with_capacity(range.height() as usize);
    for y in range.ys() {
        match store.load_raster(range.zoom, x, y)? {
            Some(tile) => {
                if let Some(first) = tiles.first() {
                    if tile.width() != first.width() {
                        warn!(
                            tile = %format!("{}/{x}/{y}", range.zoom),
                            "Tile width mismatch within column, dropping tile"
                        );
                        continue;
                    }
                }
                tiles.push(tile);
            }
            None => {
                warn!(tile = %format!("{}/{x}/{y}", range.zoom), "Missing tile, coverage gap");
            }
        }
    }

    if tiles.is_empty() {
        return Ok(None);
    }

    let width = tiles[0].width();
    let height: u32 = tiles.iter().map(|t| t.height()).sum();
    let mut column = RgbImage::new(width, height);
    let mut offset = 0i64;
    for tile in &tiles {
        imageops::replace(&mut column, tile, 0, offset);
        offset += tile.height() as i64;
    }
    Ok(Some(column))
}
