pub mod mosaic;
pub mod slippy;
pub mod store;

pub use mosaic::{build_mosaic, Mosaic};
pub use slippy::{
    child_tiles, lat_lon_to_tile, quadkey, tile_bounds, tile_index_range, true_boundary,
    TileIndex, TileRange,
};
pub use store::{TileStore, VectorTilePayload, DEFAULT_EXTENT};
