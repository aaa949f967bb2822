use std::path::PathBuf;

use clap::Parser;

/// Building extrusion parameters, metres.
#[derive(Debug, Clone)]
pub struct BuildingConfig {
    /// Height for features with no usable height tag.
    pub default_height: f64,
    /// Metres per `building:levels` storey.
    pub level_height: f64,
    /// Edge length of the cube emitted for point features.
    pub point_size: f64,
    /// Full ribbon width for buffered line features.
    pub line_width: f64,
    /// Extrusion height for line features.
    pub line_height: f64,
    /// Polygons below this footprint area are dropped.
    pub min_polygon_area: f64,
    /// Lines below this length are dropped.
    pub min_line_length: f64,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            default_height: 10.0,
            level_height: 3.0,
            point_size: 1.0,
            line_width: 0.5,
            line_height: 2.0,
            min_polygon_area: 0.1,
            min_line_length: 0.1,
        }
    }
}

/// Fully resolved pipeline configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Tile cache root with `zoom/x/y` payloads.
    pub tiles: PathBuf,
    /// Output root; artifacts land under `<output>/<model_name>/`.
    pub output: PathBuf,
    pub model_name: String,
    /// "nw_lat,nw_lon,se_lat,se_lon" requested coverage.
    pub bounds: String,
    /// "lat,lon" launch point; defaults to the boundary center.
    pub launch: Option<String>,
    /// Imagery zoom level; also fixes the world's true boundary.
    pub zoom: u32,
    /// Terrain-RGB DEM zoom level.
    pub dem_zoom: u32,
    /// Vector building tile zoom level.
    pub building_zoom: u32,
    pub include_buildings: bool,
    pub buildings: BuildingConfig,
    /// Terrain-clearance margin as a fraction of the launch height.
    pub safety_margin: f64,
    pub verbose: bool,
    pub threads: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tiles: PathBuf::new(),
            output: PathBuf::new(),
            model_name: String::new(),
            bounds: String::new(),
            launch: None,
            zoom: 15,
            dem_zoom: 13,
            building_zoom: 15,
            include_buildings: false,
            buildings: BuildingConfig::default(),
            safety_margin: 0.03,
            verbose: false,
            threads: None,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "world-tiler",
    about = "Map-tile fusion to simulator-ready 3D world models",
    version
)]
pub struct CliArgs {
    /// Tile cache root directory (zoom/x/y layout)
    #[arg(short = 't', long)]
    pub tiles: PathBuf,

    /// Output directory
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// World model name
    #[arg(short = 'n', long)]
    pub name: String,

    /// Coverage as "nw_lat,nw_lon,se_lat,se_lon"
    #[arg(short = 'b', long)]
    pub bounds: String,

    /// Launch point as "lat,lon" (default: boundary center)
    #[arg(long)]
    pub launch: Option<String>,

    /// Imagery zoom level
    #[arg(short = 'z', long, default_value_t = 15)]
    pub zoom: u32,

    /// Terrain DEM zoom level
    #[arg(long, default_value_t = 13)]
    pub dem_zoom: u32,

    /// Building vector tile zoom level
    #[arg(long, default_value_t = 15)]
    pub building_zoom: u32,

    /// Generate extruded building meshes
    #[arg(long)]
    pub buildings: bool,

    /// Default building height in metres
    #[arg(long, default_value_t = 10.0)]
    pub default_height: f64,

    /// Terrain clearance margin fraction
    #[arg(long, default_value_t = 0.03)]
    pub safety_margin: f64,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl From<CliArgs> for WorldConfig {
    fn from(args: CliArgs) -> Self {
        WorldConfig {
            tiles: args.tiles,
            output: args.output,
            model_name: args.name,
            bounds: args.bounds,
            launch: args.launch,
            zoom: args.zoom,
            dem_zoom: args.dem_zoom,
            building_zoom: args.building_zoom,
            include_buildings: args.buildings,
            buildings: BuildingConfig {
                default_height: args.default_height,
                ..BuildingConfig::default()
            },
            safety_margin: args.safety_margin,
            verbose: args.verbose,
            threads: args.threads,
        }
    }
}
