//! End-to-end integration tests.
//!
//! These tests create a synthetic tile cache (terrain-RGB DEM tiles,
//! imagery tiles, vector building tiles), run the full pipeline, and
//! validate the produced world model.

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use serde_json::json;

use world_tiler::config::WorldConfig;
use world_tiler::terrain::encode_elevation;
use world_tiler::tiling::{lat_lon_to_tile, tile_index_range, true_boundary, TileRange, TileStore};
use world_tiler::types::GeoBoundingBox;
use world_tiler::Pipeline;

const BOUNDS: &str = "45.07,7.06,45.05,7.09";
const ZOOM: u32 = 15;
const DEM_ZOOM: u32 = 13;
const TILE_PX: u32 = 16;

fn bbox() -> GeoBoundingBox {
    GeoBoundingBox::parse(BOUNDS).unwrap()
}

/// DEM range covering the imagery-zoom true boundary, the same way the
/// pipeline derives it.
fn dem_range() -> TileRange {
    let boundary = true_boundary(&bbox(), ZOOM).unwrap();
    tile_index_range(&boundary.bounding_box(), DEM_ZOOM).unwrap()
}

/// Write terrain-RGB DEM tiles with a smooth per-pixel elevation ramp so
/// every crop window has a non-degenerate range.
fn write_dem_tiles(root: &Path) {
    let store = TileStore::new(root);
    for x in dem_range().xs() {
        for y in dem_range().ys() {
            let tile = RgbImage::from_fn(TILE_PX, TILE_PX, |px, py| {
                let elevation = 200.0 + (px + py) as f64 * 2.0;
                let (r, g, b) = encode_elevation(elevation);
                Rgb([r, g, b])
            });
            let path = store.raster_path(DEM_ZOOM, x, y);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            tile.save(path).unwrap();
        }
    }
}

/// Write checkerboard imagery tiles over the full imagery range.
fn write_imagery_tiles(root: &Path) {
    let store = TileStore::new(root);
    let range = tile_index_range(&bbox(), ZOOM).unwrap();
    for x in range.xs() {
        for y in range.ys() {
            let tile = RgbImage::from_fn(TILE_PX, TILE_PX, |px, py| {
                if (px / 4 + py / 4) % 2 == 0 {
                    Rgb([200, 60, 60])
                } else {
                    Rgb([60, 60, 200])
                }
            });
            let path = store.raster_path(ZOOM, x, y);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            tile.save(path).unwrap();
        }
    }
}

/// Write one vector building tile per index: a tall square footprint in
/// tile-local coordinates, sharing one id so seam fusion kicks in.
fn write_vector_tiles(root: &Path) {
    let store = TileStore::new(root);
    let range = tile_index_range(&bbox(), ZOOM).unwrap();
    for x in range.xs() {
        for y in range.ys() {
            let payload = json!({
                "type": "FeatureCollection",
                "extent": 4096,
                "features": [{
                    "type": "Feature",
                    "id": format!("block-{x}-{y}"),
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [1000.0, 1000.0],
                            [2000.0, 1000.0],
                            [2000.0, 2000.0],
                            [1000.0, 2000.0],
                            [1000.0, 1000.0]
                        ]]
                    },
                    "properties": {"height": "12", "type": "building"}
                }]
            });
            let path = store.vector_path(ZOOM, x, y);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, payload.to_string()).unwrap();
        }
    }
}

fn base_config(tiles: &Path, output: &Path) -> WorldConfig {
    WorldConfig {
        tiles: tiles.to_path_buf(),
        output: output.to_path_buf(),
        model_name: "testworld".into(),
        bounds: BOUNDS.into(),
        zoom: ZOOM,
        dem_zoom: DEM_ZOOM,
        building_zoom: ZOOM,
        ..WorldConfig::default()
    }
}

#[test]
fn full_pipeline_terrain_and_imagery() {
    let tmp = tempfile::tempdir().unwrap();
    let tiles = tmp.path().join("tiles");
    let output = tmp.path().join("output");
    write_dem_tiles(&tiles);
    write_imagery_tiles(&tiles);

    let config = base_config(&tiles, &output);
    let result = Pipeline::run(&config).unwrap();

    // Heightmap: square 2^n+1, persisted as 8-bit gray
    let heightmap = image::open(&result.heightmap_path).unwrap().to_luma8();
    assert_eq!(heightmap.width(), heightmap.height());
    let n = heightmap.width() - 1;
    assert!(n.is_power_of_two(), "heightmap size {} not 2^n+1", heightmap.width());

    // Aerial mosaic present
    let aerial = image::open(result.aerial_path.as_ref().unwrap()).unwrap();
    assert!(aerial.width() >= TILE_PX);

    // World frame: a few-kilometre box with a non-degenerate height range
    assert!(result.frame.size_x > 1000.0 && result.frame.size_x < 10_000.0);
    assert!(result.frame.size_y > 1000.0 && result.frame.size_y < 10_000.0);
    assert!(result.frame.size_z > 0.0);
    // Synthetic terrain sits around 200 m
    assert!((result.frame.origin.altitude - 200.0).abs() < 100.0);
    // Clearance pose is at or below ground level
    assert!(result.frame.pose_z <= 0.0);

    // No buildings requested
    assert!(result.buildings.is_none());
    assert_eq!(result.building_count, 0);

    // world.json carries the scene-writer contract
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(result.model_dir.join("world.json")).unwrap())
            .unwrap();
    assert_eq!(summary["model_name"], "testworld");
    assert_eq!(summary["include_buildings"], false);
    assert!(summary["frame"]["size_x"].as_f64().unwrap() > 0.0);
}

#[test]
fn full_pipeline_with_buildings() {
    let tmp = tempfile::tempdir().unwrap();
    let tiles = tmp.path().join("tiles");
    let output = tmp.path().join("output");
    write_dem_tiles(&tiles);
    write_imagery_tiles(&tiles);
    write_vector_tiles(&tiles);

    let mut config = base_config(&tiles, &output);
    config.include_buildings = true;

    let result = Pipeline::run(&config).unwrap();

    let range = tile_index_range(&bbox(), ZOOM).unwrap();
    assert_eq!(result.building_count as u64, range.tile_count());

    let mesh = result.buildings.as_ref().unwrap();
    assert!(!mesh.is_empty());
    assert_eq!(mesh.normals.len(), mesh.positions.len());
    // Every building is a closed 12-triangle box at minimum
    assert!(mesh.triangle_count() >= 12 * result.building_count);

    // Fused features persisted for downstream consumers
    let geojson = fs::read_to_string(result.model_dir.join("buildings.geojson")).unwrap();
    assert!(geojson.contains("FeatureCollection"));
    assert!(geojson.contains("block-"));
}

#[test]
fn missing_dem_base_tile_fails_terrain_stage() {
    let tmp = tempfile::tempdir().unwrap();
    let tiles = tmp.path().join("tiles");
    let output = tmp.path().join("output");
    // Imagery only; the DEM tree is empty
    write_imagery_tiles(&tiles);

    let config = base_config(&tiles, &output);
    let err = Pipeline::run(&config).unwrap_err();
    assert!(err.to_string().contains("Missing base tile"));
}

#[test]
fn missing_vector_tiles_degrade_to_no_buildings() {
    let tmp = tempfile::tempdir().unwrap();
    let tiles = tmp.path().join("tiles");
    let output = tmp.path().join("output");
    write_dem_tiles(&tiles);
    write_imagery_tiles(&tiles);
    // No vector tiles written

    let mut config = base_config(&tiles, &output);
    config.include_buildings = true;

    // The building stage aborts internally; the run still produces terrain
    let result = Pipeline::run(&config).unwrap();
    assert!(result.buildings.is_none());
    assert_eq!(result.building_count, 0);
    assert!(result.heightmap_path.exists());
}

#[test]
fn partial_dem_coverage_still_produces_a_world() {
    let tmp = tempfile::tempdir().unwrap();
    let tiles = tmp.path().join("tiles");
    let output = tmp.path().join("output");
    write_dem_tiles(&tiles);
    write_imagery_tiles(&tiles);

    // Remove one DEM tile to open a coverage gap, sparing the base tile
    // and the tile under the world origin (both fatal by design)
    let store = TileStore::new(&tiles);
    let range = dem_range();
    let center = true_boundary(&bbox(), ZOOM).unwrap().center();
    let (ox, oy) = lat_lon_to_tile(center.lat, center.lon, DEM_ZOOM).unwrap();
    let victim = range
        .xs()
        .flat_map(|x| range.ys().map(move |y| (x, y)))
        .find(|&(x, y)| !(x == range.x_min && y == range.y_min) && !(x == ox && y == oy));
    if let Some((x, y)) = victim {
        fs::remove_file(store.raster_path(DEM_ZOOM, x, y)).unwrap();
    }

    let config = base_config(&tiles, &output);
    let result = Pipeline::run(&config).unwrap();
    assert!(result.heightmap_path.exists());
    assert!(result.frame.size_z >= 0.0);
}
