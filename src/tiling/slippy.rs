use std::f64::consts::PI;

use crate::error::{Result, WorldTilerError};
use crate::types::{GeoBoundingBox, LatLon, TrueBoundary};

/// A tile in slippy-map (zoom/x/y) addressing, y = 0 at the north edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

/// Inclusive tile-index range covering a bounding box at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u32,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl TileRange {
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn tile_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn xs(&self) -> std::ops::RangeInclusive<u32> {
        self.x_min..=self.x_max
    }

    pub fn ys(&self) -> std::ops::RangeInclusive<u32> {
        self.y_min..=self.y_max
    }

    /// The tile-aligned boundary of the whole range.
    pub fn true_boundary(&self) -> TrueBoundary {
        let nw = tile_bounds(self.x_min, self.y_min, self.zoom);
        let se = tile_bounds(self.x_max, self.y_max, self.zoom);
        TrueBoundary {
            northwest: LatLon::new(nw.lat_max(), nw.lon_min()),
            northeast: LatLon::new(nw.lat_max(), se.lon_max()),
            southwest: LatLon::new(se.lat_min(), nw.lon_min()),
            southeast: LatLon::new(se.lat_min(), se.lon_max()),
        }
    }
}

/// Web-Mercator tile index containing a geographic point.
///
/// Fails on out-of-domain latitude (|lat| >= 90), where the Mercator
/// projection diverges.
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u32) -> Result<(u32, u32)> {
    if !lat.is_finite() || lat.abs() >= 90.0 {
        return Err(WorldTilerError::Input(format!(
            "latitude {lat} outside Web-Mercator domain"
        )));
    }
    let n = (1u64 << zoom) as f64;
    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    let max = (1u64 << zoom) as i64 - 1;
    let x = (x as i64).clamp(0, max) as u32;
    let y = (y as i64).clamp(0, max) as u32;
    Ok((x, y))
}

/// Geographic bounds of one tile (inverse of `lat_lon_to_tile`).
pub fn tile_bounds(x: u32, y: u32, zoom: u32) -> GeoBoundingBox {
    let n = (1u64 << zoom) as f64;
    let lon_west = x as f64 / n * 360.0 - 180.0;
    let lon_east = (x + 1) as f64 / n * 360.0 - 180.0;
    let lat_north = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();
    let lat_south = (PI * (1.0 - 2.0 * (y + 1) as f64 / n))
        .sinh()
        .atan()
        .to_degrees();
    GeoBoundingBox::new(
        LatLon::new(lat_north, lon_west),
        LatLon::new(lat_south, lon_east),
    )
}

/// Tile-index range covering a bounding box; each axis is sorted
/// independently, so corner ordering does not matter. A bbox inside a
/// single tile yields a valid one-element range.
pub fn tile_index_range(bbox: &GeoBoundingBox, zoom: u32) -> Result<TileRange> {
    let (nw_x, nw_y) = lat_lon_to_tile(bbox.northwest.lat, bbox.northwest.lon, zoom)?;
    let (se_x, se_y) = lat_lon_to_tile(bbox.southeast.lat, bbox.southeast.lon, zoom)?;
    Ok(TileRange {
        zoom,
        x_min: nw_x.min(se_x),
        x_max: nw_x.max(se_x),
        y_min: nw_y.min(se_y),
        y_max: nw_y.max(se_y),
    })
}

/// Snap a bounding box outward to whole-tile edges at the given zoom.
///
/// The result fully contains `bbox` and all four corners lie exactly on
/// tile boundaries, which keeps raster crops and vector reprojection
/// consistent with tile-aligned mosaics.
pub fn true_boundary(bbox: &GeoBoundingBox, zoom: u32) -> Result<TrueBoundary> {
    Ok(tile_index_range(bbox, zoom)?.true_boundary())
}

/// The four zoom+1 children of a tile, clockwise from the north-west.
pub fn child_tiles(x: u32, y: u32, zoom: u32) -> [TileIndex; 4] {
    let (cx, cy, cz) = (x * 2, y * 2, zoom + 1);
    [
        TileIndex { zoom: cz, x: cx, y: cy },
        TileIndex { zoom: cz, x: cx + 1, y: cy },
        TileIndex { zoom: cz, x: cx + 1, y: cy + 1 },
        TileIndex { zoom: cz, x: cx, y: cy + 1 },
    ]
}

/// Bing-style quadkey for a tile.
pub fn quadkey(x: u32, y: u32, zoom: u32) -> String {
    let mut key = String::with_capacity(zoom as usize);
    for i in (1..=zoom).rev() {
        let mask = 1u32 << (i - 1);
        let mut digit = 0u8;
        if x & mask != 0 {
            digit += 1;
        }
        if y & mask != 0 {
            digit += 2;
        }
        key.push((b'0' + digit) as char);
    }
    key
}
