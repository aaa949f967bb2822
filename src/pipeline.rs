use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::buildings;
use crate::config::WorldConfig;
use crate::error::{Result, WorldTilerError};
use crate::fusion::{self, CoordinateKey};
use crate::terrain;
use crate::tiling::{build_mosaic, tile_index_range, true_boundary, TileStore};
use crate::types::{GeoBoundingBox, Heightmap, LatLon, TriangleMesh, WorldFrame};
use crate::worldframe;

/// Summary of a completed world-generation run.
#[derive(Debug)]
pub struct ProcessingResult {
    pub frame: WorldFrame,
    pub model_dir: PathBuf,
    pub heightmap_path: PathBuf,
    pub aerial_path: Option<PathBuf>,
    /// Combined building model, for the external mesh exporter.
    pub buildings: Option<TriangleMesh>,
    pub building_count: usize,
    pub duration: Duration,
}

/// Pipeline orchestrator -- drives the four world-assembly stages.
///
/// Per-tile and per-feature failures are isolated inside the stages; a run
/// prefers partial output (reduced coverage, no imagery, no buildings)
/// over producing nothing. Only terrain assembly and an unresolvable
/// origin tile are fatal.
pub struct Pipeline;

impl Pipeline {
    /// Run the full world-generation pipeline.
    pub fn run(config: &WorldConfig) -> Result<ProcessingResult> {
        let start = Instant::now();
        let store = TileStore::new(&config.tiles);

        let bbox = GeoBoundingBox::parse(&config.bounds)?;
        let launch = config
            .launch
            .as_deref()
            .map(LatLon::parse)
            .transpose()?;

        // The imagery-zoom true boundary fixes the world extent, so the
        // heightmap, aerial image, and buildings cover identical ground.
        let boundary = true_boundary(&bbox, config.zoom)?;
        info!(
            lat_min = boundary.lat_min(),
            lat_max = boundary.lat_max(),
            lon_min = boundary.lon_min(),
            lon_max = boundary.lon_max(),
            zoom = config.zoom,
            "True boundary"
        );

        let model_dir = config.output.join(&config.model_name);
        let texture_dir = model_dir.join("textures");
        fs::create_dir_all(&texture_dir)?;

        info!("Stage 1/4: Terrain");
        let dem_range = tile_index_range(&boundary.bounding_box(), config.dem_zoom)?;
        let dem_mosaic = build_mosaic(&store, &dem_range)?;
        let cropped = terrain::crop_to_bounds(&dem_mosaic, &boundary)?;
        let heightmap = terrain::build_heightmap(&cropped, boundary)?;
        let heightmap_path = texture_dir.join(format!("{}_height_map.png", config.model_name));
        heightmap.save(&heightmap_path)?;

        info!("Stage 2/4: Imagery");
        let aerial_path = match Self::aerial(config, &store, &bbox, &texture_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(%e, "Aerial mosaic failed, continuing without imagery");
                None
            }
        };

        info!("Stage 3/4: World frame");
        let frame = worldframe::compute_world_frame(
            &store,
            &heightmap.boundary,
            &heightmap,
            launch,
            config.dem_zoom,
            config.safety_margin,
        )?;

        let (buildings_mesh, building_count) = if config.include_buildings {
            info!("Stage 4/4: Buildings");
            match Self::buildings(config, &store, &bbox, &frame, &heightmap, &model_dir) {
                Ok((mesh, count)) => (Some(mesh), count),
                Err(e) => {
                    error!(%e, "Building stage failed, continuing without buildings");
                    (None, 0)
                }
            }
        } else {
            (None, 0)
        };

        Self::write_summary(
            config,
            &model_dir,
            &frame,
            &heightmap_path,
            aerial_path.as_deref(),
            buildings_mesh.is_some(),
        )?;

        let duration = start.elapsed();
        info!(elapsed = ?duration, "World generation complete");

        Ok(ProcessingResult {
            frame,
            model_dir,
            heightmap_path,
            aerial_path,
            buildings: buildings_mesh,
            building_count,
            duration,
        })
    }

    /// Assemble and persist the satellite-imagery mosaic.
    fn aerial(
        config: &WorldConfig,
        store: &TileStore,
        bbox: &GeoBoundingBox,
        texture_dir: &Path,
    ) -> Result<PathBuf> {
        let range = tile_index_range(bbox, config.zoom)?;
        let mosaic = build_mosaic(store, &range)?;
        let path = texture_dir.join(format!("{}_aerial.png", config.model_name));
        mosaic.image.save(&path)?;
        info!(path = %path.display(), "Aerial image saved");
        Ok(path)
    }

    /// Fuse vector tiles, persist the fused GeoJSON, and assemble the
    /// combined building model.
    fn buildings(
        config: &WorldConfig,
        store: &TileStore,
        bbox: &GeoBoundingBox,
        frame: &WorldFrame,
        heightmap: &Heightmap,
        model_dir: &Path,
    ) -> Result<(TriangleMesh, usize)> {
        let range = tile_index_range(bbox, config.building_zoom)?;
        let features = fusion::fuse_tiles(store, &range, Box::new(CoordinateKey))?;

        let stats = fusion::feature_stats(&features);
        info!(
            buildings = stats.total,
            with_height = stats.with_height,
            min_height = stats.min_height,
            max_height = stats.max_height,
            "Fused building set"
        );

        let collection = fusion::to_feature_collection(&features);
        fs::write(model_dir.join("buildings.geojson"), collection.to_string())?;

        let origin = LatLon::new(frame.origin.latitude, frame.origin.longitude);
        let mesh = buildings::assemble_buildings(
            &features,
            origin,
            heightmap,
            frame.pose_z,
            &config.buildings,
        )?;
        Ok((mesh, features.len()))
    }

    /// Write `world.json`, the contract consumed by the external
    /// scene-description writer.
    fn write_summary(
        config: &WorldConfig,
        model_dir: &Path,
        frame: &WorldFrame,
        heightmap_path: &Path,
        aerial_path: Option<&Path>,
        include_buildings: bool,
    ) -> Result<()> {
        let summary = serde_json::json!({
            "model_name": config.model_name,
            "frame": frame,
            "heightmap": heightmap_path,
            "aerial": aerial_path,
            "include_buildings": include_buildings,
        });
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|e| WorldTilerError::Output(format!("world summary: {e}")))?;
        fs::write(model_dir.join("world.json"), rendered)?;
        Ok(())
    }
}
