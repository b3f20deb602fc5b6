//! Tileset-related functionality for tsxviewer

pub mod assets;
pub mod loader;
pub mod raw;
pub mod types;

// Re-export commonly used items
pub use assets::{
    verify_images, ImageMismatch, ImageProblem, TileImageCache, MAX_PLACEHOLDER_SIZE,
};
pub use loader::{load_tileset, parse_tileset, TilesetLoadError, MAX_ATLAS_TILES};
pub use types::{Grid, Orientation, Tile, TileId, TileImage, TileRect, TileRef, Tileset, TilesetInfo};
