use crate::error::{Result, WorldTilerError};

/// A point on the sphere in geographic coordinates, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Parse a "lat,lon" pair.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(WorldTilerError::Input(format!(
                "expected \"lat,lon\", got \"{s}\""
            )));
        }
        let lat = parse_coord(parts[0])?;
        let lon = parse_coord(parts[1])?;
        Ok(Self { lat, lon })
    }
}

fn parse_coord(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|_| WorldTilerError::Input(format!("invalid coordinate \"{s}\"")))
}

/// A geographic bounding box given by its north-west and south-east corners.
///
/// The constructor normalizes any corner ordering so that
/// `northwest.lat >= southeast.lat` and `northwest.lon <= southeast.lon`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundingBox {
    pub northwest: LatLon,
    pub southeast: LatLon,
}

impl GeoBoundingBox {
    pub fn new(a: LatLon, b: LatLon) -> Self {
        Self {
            northwest: LatLon::new(a.lat.max(b.lat), a.lon.min(b.lon)),
            southeast: LatLon::new(a.lat.min(b.lat), a.lon.max(b.lon)),
        }
    }

    /// Parse a "nw_lat,nw_lon,se_lat,se_lon" string (corner order is not
    /// required; the result is normalized).
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(WorldTilerError::Input(format!(
                "expected \"lat,lon,lat,lon\", got \"{s}\""
            )));
        }
        let a = LatLon::new(parse_coord(parts[0])?, parse_coord(parts[1])?);
        let b = LatLon::new(parse_coord(parts[2])?, parse_coord(parts[3])?);
        Ok(Self::new(a, b))
    }

    pub fn lat_min(&self) -> f64 {
        self.southeast.lat
    }

    pub fn lat_max(&self) -> f64 {
        self.northwest.lat
    }

    pub fn lon_min(&self) -> f64 {
        self.northwest.lon
    }

    pub fn lon_max(&self) -> f64 {
        self.southeast.lon
    }

    pub fn contains(&self, p: LatLon) -> bool {
        p.lat >= self.lat_min()
            && p.lat <= self.lat_max()
            && p.lon >= self.lon_min()
            && p.lon <= self.lon_max()
    }

    /// Map a geographic point to pixel coordinates in a north-up raster of
    /// the given dimensions covering this box, clamped to the raster.
    pub fn pixel_at(&self, p: LatLon, width: u32, height: u32) -> (u32, u32) {
        pixel_in(
            p,
            self.lat_min(),
            self.lat_max(),
            self.lon_min(),
            self.lon_max(),
            width,
            height,
        )
    }
}

/// A bounding box expanded outward to align exactly with whole-tile edges
/// at some zoom level. Every corner lies on a tile boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrueBoundary {
    pub northwest: LatLon,
    pub northeast: LatLon,
    pub southwest: LatLon,
    pub southeast: LatLon,
}

impl TrueBoundary {
    pub fn lat_min(&self) -> f64 {
        self.southwest.lat
    }

    pub fn lat_max(&self) -> f64 {
        self.northeast.lat
    }

    pub fn lon_min(&self) -> f64 {
        self.southwest.lon
    }

    pub fn lon_max(&self) -> f64 {
        self.northeast.lon
    }

    pub fn contains(&self, p: LatLon) -> bool {
        p.lat >= self.lat_min()
            && p.lat <= self.lat_max()
            && p.lon >= self.lon_min()
            && p.lon <= self.lon_max()
    }

    pub fn contains_box(&self, bbox: &GeoBoundingBox) -> bool {
        self.contains(bbox.northwest) && self.contains(bbox.southeast)
    }

    /// Geographic midpoint, used as the world origin.
    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.southwest.lat + self.northeast.lat) / 2.0,
            (self.southeast.lon + self.southwest.lon) / 2.0,
        )
    }

    /// The axis-aligned box with the same extent.
    pub fn bounding_box(&self) -> GeoBoundingBox {
        GeoBoundingBox::new(self.northwest, self.southeast)
    }

    /// Map a geographic point to pixel coordinates in a north-up raster of
    /// the given dimensions covering this boundary, clamped to the raster.
    pub fn pixel_at(&self, p: LatLon, width: u32, height: u32) -> (u32, u32) {
        pixel_in(
            p,
            self.lat_min(),
            self.lat_max(),
            self.lon_min(),
            self.lon_max(),
            width,
            height,
        )
    }
}

fn pixel_in(
    p: LatLon,
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    width: u32,
    height: u32,
) -> (u32, u32) {
    let px = (p.lon - lon_min) / (lon_max - lon_min) * width as f64;
    let py = (lat_max - p.lat) / (lat_max - lat_min) * height as f64;
    let px = (px as i64).clamp(0, width as i64 - 1) as u32;
    let py = (py as i64).clamp(0, height as i64 - 1) as u32;
    (px, py)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_normalizes_any_corner_order() {
        // Corners given as (south-east, north-west)
        let bbox = GeoBoundingBox::new(LatLon::new(0.0, 1.0), LatLon::new(1.0, 0.0));
        assert_eq!(bbox.northwest, LatLon::new(1.0, 0.0));
        assert_eq!(bbox.southeast, LatLon::new(0.0, 1.0));
    }

    #[test]
    fn bbox_parse() {
        let bbox = GeoBoundingBox::parse("45.1, 7.0, 45.0, 7.2").unwrap();
        assert!((bbox.lat_max() - 45.1).abs() < 1e-12);
        assert!((bbox.lon_max() - 7.2).abs() < 1e-12);
        assert!(bbox.contains(LatLon::new(45.05, 7.1)));
        assert!(!bbox.contains(LatLon::new(44.9, 7.1)));
    }

    #[test]
    fn bbox_parse_rejects_garbage() {
        assert!(GeoBoundingBox::parse("1,2,3").is_err());
        assert!(GeoBoundingBox::parse("a,b,c,d").is_err());
        assert!(LatLon::parse("45.0").is_err());
    }

    #[test]
    fn true_boundary_center_is_midpoint() {
        let tb = TrueBoundary {
            northwest: LatLon::new(2.0, 10.0),
            northeast: LatLon::new(2.0, 12.0),
            southwest: LatLon::new(0.0, 10.0),
            southeast: LatLon::new(0.0, 12.0),
        };
        let c = tb.center();
        assert!((c.lat - 1.0).abs() < 1e-12);
        assert!((c.lon - 11.0).abs() < 1e-12);
    }

    #[test]
    fn pixel_mapping_corners_and_clamp() {
        let tb = TrueBoundary {
            northwest: LatLon::new(1.0, 0.0),
            northeast: LatLon::new(1.0, 1.0),
            southwest: LatLon::new(0.0, 0.0),
            southeast: LatLon::new(0.0, 1.0),
        };
        // North-west corner maps to the raster origin
        assert_eq!(tb.pixel_at(LatLon::new(1.0, 0.0), 100, 100), (0, 0));
        // South-east corner clamps to the last pixel
        assert_eq!(tb.pixel_at(LatLon::new(0.0, 1.0), 100, 100), (99, 99));
        // Center of the box
        assert_eq!(tb.pixel_at(LatLon::new(0.5, 0.5), 100, 100), (50, 50));
        // Out-of-range points clamp instead of wrapping
        assert_eq!(tb.pixel_at(LatLon::new(2.0, -1.0), 100, 100), (0, 0));
    }
}
