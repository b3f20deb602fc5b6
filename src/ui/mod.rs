//! eframe viewer for tilesets

pub mod app;
pub mod tile_info;
pub mod tileset_view;

pub use app::TilesetViewerApp;
