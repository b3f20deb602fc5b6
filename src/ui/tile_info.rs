//! Tile information panel for tsxviewer

use eframe::egui::{Color32, RichText, Ui};

use crate::tileset::{TileId, TileImageCache, Tileset};

/// Widget for displaying detailed tile information
pub struct TileInfoPanel {
    show_properties: bool,
}

impl Default for TileInfoPanel {
    fn default() -> Self {
        Self {
            show_properties: true,
        }
    }
}

impl TileInfoPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the tile information panel
    pub fn show(
        &mut self,
        ui: &mut Ui,
        tileset: &Tileset,
        cache: Option<&TileImageCache>,
        id: Option<TileId>,
    ) {
        ui.heading("Tile Information");

        let Some(tile) = id.and_then(|id| tileset.tile(id)) else {
            ui.label("Click a tile to see information");
            return;
        };

        ui.horizontal(|ui| {
            ui.label("Id:");
            ui.label(RichText::new(tile.id.to_string()).color(Color32::LIGHT_BLUE));
        });

        if let Some(image) = tileset.image(tile.id) {
            ui.horizontal(|ui| {
                ui.label("Image:");
                ui.label(image.source.display().to_string());
            });
            ui.horizontal(|ui| {
                ui.label("Declared:");
                ui.label(format!("{}x{}", image.width, image.height));
            });
        }

        if let Some(rect) = tileset.source_rect(tile.id) {
            ui.horizontal(|ui| {
                ui.label("Rect:");
                ui.label(format!(
                    "{}, {} ({}x{})",
                    rect.x, rect.y, rect.width, rect.height
                ));
            });
        }

        if let Some(cache) = cache {
            if cache.is_placeholder(tile.id) {
                ui.label(RichText::new("Image missing, showing placeholder").color(Color32::RED));
            } else if let Some(loaded) = cache.get_image(tile.id) {
                let declared = tileset
                    .source_rect(tile.id)
                    .map(|rect| (rect.width, rect.height));
                let actual = (loaded.width(), loaded.height());
                let color = if declared == Some(actual) {
                    Color32::LIGHT_GREEN
                } else {
                    Color32::YELLOW
                };
                ui.horizontal(|ui| {
                    ui.label("Loaded:");
                    ui.label(RichText::new(format!("{}x{}", actual.0, actual.1)).color(color));
                });
            }
        }

        if let Some(class) = &tile.class {
            ui.horizontal(|ui| {
                ui.label("Class:");
                ui.label(class.as_str());
            });
        }

        if self.show_properties && !tile.properties.is_empty() {
            ui.separator();
            for (name, value) in &tile.properties {
                ui.label(format!("{} = {}", name, value));
            }
        }

        ui.separator();
        ui.checkbox(&mut self.show_properties, "Show properties");
    }
}
