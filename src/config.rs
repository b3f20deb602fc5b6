//! Viewer settings, persisted between sessions by eframe

use std::path::PathBuf;

use egui::Color32;
use serde::{Deserialize, Serialize};

/// Configuration for the tileset viewer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub zoom_level: f32,
    /// Edge length of a thumbnail cell at zoom 1.0
    pub thumbnail_size: f32,
    pub show_grid: bool,
    pub show_ids: bool,
    pub grid_color: Color32,
    pub background_color: Color32,
    pub last_opened: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            zoom_level: 1.0,
            thumbnail_size: 96.0,
            show_grid: true,
            show_ids: true,
            grid_color: Color32::from_gray(128),
            background_color: Color32::from_gray(24),
            last_opened: None,
        }
    }
}

impl ViewerConfig {
    /// Thumbnail cell size after zoom, clamped so cells stay clickable
    pub fn cell_size(&self) -> f32 {
        (self.thumbnail_size * self.zoom_level).max(8.0)
    }
}
