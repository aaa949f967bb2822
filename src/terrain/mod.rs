use image::{imageops, GrayImage, RgbImage};
use tracing::{debug, info};

use crate::error::{Result, WorldTilerError};
use crate::tiling::mosaic::Mosaic;
use crate::tiling::slippy::{lat_lon_to_tile, tile_bounds};
use crate::tiling::store::TileStore;
use crate::types::{Heightmap, LatLon, TrueBoundary};

/// Terrain-RGB decoding constants: base-256 big-endian value, 0.1 m scale,
/// 10 km offset. The formula must be reproduced bit-for-bit; any deviation
/// shifts all elevations.
const ELEVATION_SCALE: f64 = 0.1;
const ELEVATION_OFFSET: f64 = 10_000.0;

/// Normalized fallback value for a zero elevation range (flat terrain).
const FLAT_FALLBACK: u8 = 128;

/// Decode one terrain-RGB pixel into metres above mean sea level.
pub fn decode_elevation(r: u8, g: u8, b: u8) -> f64 {
    ((r as f64 * 65_536.0 + g as f64 * 256.0 + b as f64) * ELEVATION_SCALE) - ELEVATION_OFFSET
}

/// Inverse of `decode_elevation`, used by tile producers and tests.
pub fn encode_elevation(elevation: f64) -> (u8, u8, u8) {
    let v = ((elevation + ELEVATION_OFFSET) / ELEVATION_SCALE).round() as u32;
    (((v >> 16) & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, (v & 0xFF) as u8)
}

/// Crop a mosaic to an exact geographic sub-region.
///
/// Corner coordinates are mapped into mosaic pixel space through the
/// mosaic's affine mapping; the target must intersect the mosaic with a
/// non-empty pixel rectangle.
pub fn crop_to_bounds(mosaic: &Mosaic, target: &TrueBoundary) -> Result<RgbImage> {
    let (x0, y0) = mosaic.pixel_of(target.northwest);
    let (x1, y1) = mosaic.pixel_of(target.southeast);

    let x0 = (x0 as i64).clamp(0, mosaic.width() as i64);
    let y0 = (y0 as i64).clamp(0, mosaic.height() as i64);
    let x1 = (x1 as i64).clamp(0, mosaic.width() as i64);
    let y1 = (y1 as i64).clamp(0, mosaic.height() as i64);

    if x1 <= x0 || y1 <= y0 {
        return Err(WorldTilerError::Terrain(format!(
            "crop target maps to empty pixel rect ({x0},{y0})..({x1},{y1})"
        )));
    }

    let cropped = imageops::crop_imm(
        &mosaic.image,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image();
    debug!(width = cropped.width(), height = cropped.height(), "Cropped mosaic");
    Ok(cropped)
}

/// Smallest `2^n + 1` square accommodating the given dimensions, as
/// required by downstream terrain consumers.
fn nearest_heightmap_size(width: u32, height: u32) -> u32 {
    let value = width.max(height).max(2);
    let n = ((value - 1) as f64).log2().ceil() as u32;
    (1u32 << n) + 1
}

/// Decode a cropped terrain-RGB raster into a normalized heightmap.
///
/// Every pixel is decoded to physical elevation, the {min, max} range is
/// recorded, samples are normalized to [0, 255], and the grid is resized
/// (bilinear) to the nearest `2^n + 1` square. A flat area (max == min)
/// normalizes to a constant mid-value instead of dividing by zero.
pub fn build_heightmap(cropped: &RgbImage, boundary: TrueBoundary) -> Result<Heightmap> {
    if cropped.width() == 0 || cropped.height() == 0 {
        return Err(WorldTilerError::Terrain("empty raster for heightmap".into()));
    }

    let mut elevations = Vec::with_capacity((cropped.width() * cropped.height()) as usize);
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for pixel in cropped.pixels() {
        let e = decode_elevation(pixel.0[0], pixel.0[1], pixel.0[2]);
        min = min.min(e);
        max = max.max(e);
        elevations.push(e);
    }

    let range = max - min;
    let normalized: Vec<u8> = if range == 0.0 {
        vec![FLAT_FALLBACK; elevations.len()]
    } else {
        elevations
            .iter()
            .map(|e| ((e - min) / range * 255.0) as u8)
            .collect()
    };

    let grid = GrayImage::from_raw(cropped.width(), cropped.height(), normalized)
        .ok_or_else(|| WorldTilerError::Terrain("heightmap buffer size mismatch".into()))?;

    let size = nearest_heightmap_size(cropped.width(), cropped.height());
    let resized = imageops::resize(&grid, size, size, imageops::FilterType::Triangle);

    info!(
        size,
        min_elevation = min,
        max_elevation = max,
        "Heightmap built"
    );

    Ok(Heightmap {
        image: resized,
        min_elevation: min,
        max_elevation: max,
        boundary,
    })
}

/// Elevation above mean sea level at a point, read from the single DEM tile
/// covering it. Fails when that tile is not in the store — callers treat
/// this as the origin being unresolvable.
pub fn elevation_at(store: &TileStore, p: LatLon, zoom: u32) -> Result<f64> {
    let (x, y) = lat_lon_to_tile(p.lat, p.lon, zoom)?;
    let tile = store.load_raster(zoom, x, y)?.ok_or_else(|| {
        WorldTilerError::Terrain(format!("DEM tile {zoom}/{x}/{y} not found for ({}, {})", p.lat, p.lon))
    })?;

    let bounds = tile_bounds(x, y, zoom);
    let (px, py) = bounds.pixel_at(p, tile.width(), tile.height());
    let pixel = tile.get_pixel(px, py);
    Ok(decode_elevation(pixel.0[0], pixel.0[1], pixel.0[2]))
}
