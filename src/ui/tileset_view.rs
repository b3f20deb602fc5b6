//! Tile grid widget for tsxviewer

use std::collections::HashMap;

use eframe::egui::{self, Rect, Sense, TextureHandle, TextureOptions, Ui, Vec2};
use egui::{Align2, Color32, FontId, Pos2, Stroke};

use crate::config::ViewerConfig;
use crate::tileset::{TileId, TileImageCache, Tileset};

const CELL_PADDING: f32 = 6.0;

/// Grid of tile thumbnails that handles rendering and selection
pub struct TilesetView {
    hovered_tile: Option<TileId>,
    tile_textures: HashMap<TileId, TextureHandle>,
}

impl Default for TilesetView {
    fn default() -> Self {
        Self::new()
    }
}

impl TilesetView {
    pub fn new() -> Self {
        Self {
            hovered_tile: None,
            tile_textures: HashMap::new(),
        }
    }

    /// Drops uploaded textures; call when a different tileset is loaded.
    pub fn clear_textures(&mut self) {
        self.tile_textures.clear();
        self.hovered_tile = None;
    }

    pub fn hovered_tile(&self) -> Option<TileId> {
        self.hovered_tile
    }

    /// Get or create a texture for a tile
    fn get_or_create_tile_texture(
        &mut self,
        ui: &mut Ui,
        cache: &TileImageCache,
        id: TileId,
    ) -> Option<TextureHandle> {
        if let Some(texture) = self.tile_textures.get(&id) {
            return Some(texture.clone());
        }

        let image = cache.get_image(id)?;
        let rgba_image = image.to_rgba8();
        let size = [rgba_image.width() as usize, rgba_image.height() as usize];
        let texture = ui.ctx().load_texture(
            format!("tile_{}", id),
            egui::ColorImage::from_rgba_unmultiplied(size, rgba_image.as_flat_samples().as_slice()),
            TextureOptions::NEAREST,
        );

        self.tile_textures.insert(id, texture.clone());
        Some(texture)
    }

    /// Show the tile grid, returning the tile clicked this frame if any
    pub fn show(
        &mut self,
        ui: &mut Ui,
        tileset: &Tileset,
        cache: Option<&TileImageCache>,
        config: &ViewerConfig,
        selected: Option<TileId>,
    ) -> Option<TileId> {
        let cell_size = config.cell_size();
        let stride = cell_size + CELL_PADDING;
        let columns = ((ui.available_width() / stride).floor() as usize).max(1);
        let rows = tileset.len().div_ceil(columns);

        let (response, painter) = ui.allocate_painter(
            Vec2::new(columns as f32 * stride, rows as f32 * stride),
            Sense::click(),
        );
        painter.rect_filled(response.rect, 0.0, config.background_color);

        let origin = response.rect.min;
        self.hovered_tile = None;
        let mut clicked = None;

        for (index, tile) in tileset.tiles().enumerate() {
            let column = index % columns;
            let row = index / columns;
            let cell_rect = Rect::from_min_size(
                Pos2::new(
                    origin.x + column as f32 * stride,
                    origin.y + row as f32 * stride,
                ),
                Vec2::splat(cell_size),
            );

            if let Some(pos) = response.hover_pos() {
                if cell_rect.contains(pos) {
                    self.hovered_tile = Some(tile.id);
                    if response.clicked() {
                        clicked = Some(tile.id);
                    }
                }
            }

            let texture = cache.and_then(|cache| self.get_or_create_tile_texture(ui, cache, tile.id));
            match texture {
                Some(texture) => {
                    let image_rect = fit_rect(cell_rect, texture.size_vec2());
                    painter.image(
                        texture.id(),
                        image_rect,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
                None => {
                    // Fallback to colored rectangle if no image was loaded
                    painter.rect_filled(cell_rect, 0.0, Color32::from_gray(64));
                }
            }

            if config.show_ids {
                painter.text(
                    cell_rect.left_top() + Vec2::new(2.0, 1.0),
                    Align2::LEFT_TOP,
                    tile.id.to_string(),
                    FontId::monospace(11.0),
                    Color32::YELLOW,
                );
            }

            if selected == Some(tile.id) {
                painter.rect_stroke(cell_rect, 0.0, Stroke::new(2.0, Color32::LIGHT_BLUE));
            } else if self.hovered_tile == Some(tile.id) {
                painter.rect_stroke(cell_rect, 0.0, Stroke::new(1.5, Color32::WHITE));
            } else if config.show_grid {
                painter.rect_stroke(cell_rect, 0.0, Stroke::new(1.0, config.grid_color));
            }
        }

        clicked
    }
}

/// Largest rect with the image's aspect ratio centered in `cell`.
fn fit_rect(cell: Rect, image_size: Vec2) -> Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return cell;
    }
    let scale = (cell.width() / image_size.x).min(cell.height() / image_size.y);
    Rect::from_center_size(cell.center(), image_size * scale)
}
