pub mod bounds;
pub mod feature;
pub mod heightmap;
pub mod mesh;
pub mod world;

pub use bounds::{GeoBoundingBox, LatLon, TrueBoundary};
pub use feature::BuildingFeature;
pub use heightmap::Heightmap;
pub use mesh::TriangleMesh;
pub use world::{GeoPosition, WorldFrame};
