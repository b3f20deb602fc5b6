//! Loader, checker and viewer for Tiled tilesets (`.tsx`)

pub mod check;
pub mod config;
pub mod tileset;
pub mod ui;
