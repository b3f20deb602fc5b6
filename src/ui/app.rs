//! Main application for tsxviewer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eframe::egui;
use rfd::FileDialog;

use super::{tile_info::TileInfoPanel, tileset_view::TilesetView};
use crate::config::ViewerConfig;
use crate::tileset::{
    load_tileset, ImageMismatch, TileId, TileImageCache, Tileset, TilesetLoadError,
};

/// Main application state
pub struct TilesetViewerApp {
    config: ViewerConfig,
    tileset: Option<Tileset>,
    image_cache: Option<Arc<TileImageCache>>,
    mismatches: Vec<ImageMismatch>,
    tileset_path: Option<PathBuf>,
    error_message: Option<String>,
    tileset_view: TilesetView,
    tile_info: TileInfoPanel,
    selected_tile: Option<TileId>,
    settings_open: bool,
    about_open: bool,
}

impl Default for TilesetViewerApp {
    fn default() -> Self {
        Self {
            config: ViewerConfig::default(),
            tileset: None,
            image_cache: None,
            mismatches: Vec::new(),
            tileset_path: None,
            error_message: None,
            tileset_view: TilesetView::new(),
            tile_info: TileInfoPanel::new(),
            selected_tile: None,
            settings_open: false,
            about_open: false,
        }
    }
}

impl TilesetViewerApp {
    /// Creates a new instance of the application
    pub fn new(cc: &eframe::CreationContext<'_>, initial_file: Option<PathBuf>) -> Self {
        cc.egui_ctx.set_style(egui::Style {
            visuals: egui::Visuals::dark(),
            ..Default::default()
        });

        let mut app = Self::default();
        if let Some(storage) = cc.storage {
            app.config = eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default();
        }

        // Reopen the last tileset if nothing was passed on the command line
        let file = initial_file.or_else(|| {
            app.config
                .last_opened
                .clone()
                .filter(|path| path.exists())
        });
        if let Some(path) = file {
            app.open_file(path);
        }

        app
    }

    /// Attempts to load a tileset document or bundle
    fn open_file(&mut self, path: PathBuf) {
        let result = if is_archive(&path) {
            TileImageCache::load_archive(&path)
        } else {
            load_tileset(&path).map(|tileset| {
                let cache = TileImageCache::load(&tileset);
                (tileset, cache)
            })
        };

        match result {
            Ok((tileset, cache)) => {
                let mismatches = cache.mismatches().to_vec();
                for mismatch in &mismatches {
                    log::warn!("{}", mismatch);
                }
                self.tileset = Some(tileset);
                self.image_cache = Some(Arc::new(cache));
                self.mismatches = mismatches;
                self.config.last_opened = Some(path.clone());
                self.tileset_path = Some(path);
                self.selected_tile = None;
                self.error_message = None;
                self.tileset_view.clear_textures(); // Will be recreated on next frame
            }
            Err(e) => {
                log::error!("Failed to open {:?}: {}", path, e);
                self.error_message = Some(describe_error(&e));
            }
        }
    }

    /// Shows the main menu bar
    fn show_menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Tileset...").clicked() {
                    if let Some(path) = FileDialog::new()
                        .add_filter("Tiled Tileset", &["tsx"])
                        .add_filter("Tileset Bundle", &["zip"])
                        .pick_file()
                    {
                        self.open_file(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Reload").clicked() {
                    if let Some(path) = self.tileset_path.clone() {
                        self.open_file(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Settings").clicked() {
                    self.settings_open = true;
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Exit").clicked() {
                    ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                ui.add(egui::Slider::new(&mut self.config.zoom_level, 0.25..=4.0).text("Zoom"));
                ui.checkbox(&mut self.config.show_grid, "Show Grid");
                ui.checkbox(&mut self.config.show_ids, "Show Tile Ids");
            });

            ui.menu_button("Help", |ui| {
                if ui.button("About...").clicked() {
                    self.about_open = true;
                    ui.close_menu();
                }
            });
        });
    }

    /// Shows the settings window
    fn show_settings(&mut self, ctx: &egui::Context) {
        let config = &mut self.config;
        egui::Window::new("Settings")
            .open(&mut self.settings_open)
            .show(ctx, |ui| {
                ui.heading("Display");
                ui.add(
                    egui::Slider::new(&mut config.thumbnail_size, 32.0..=256.0)
                        .text("Thumbnail Size"),
                );
                ui.checkbox(&mut config.show_grid, "Show Grid");
                ui.checkbox(&mut config.show_ids, "Show Tile Ids");

                ui.separator();
                ui.heading("Colors");
                ui.horizontal(|ui| {
                    ui.label("Grid:");
                    ui.color_edit_button_srgba(&mut config.grid_color);
                });
                ui.horizontal(|ui| {
                    ui.label("Background:");
                    ui.color_edit_button_srgba(&mut config.background_color);
                });

                ui.separator();
                if ui.button("Reset to defaults").clicked() {
                    *config = ViewerConfig {
                        last_opened: config.last_opened.take(),
                        ..Default::default()
                    };
                }
            });
    }

    fn show_tileset_summary(
        ui: &mut egui::Ui,
        tileset: &Tileset,
        path: Option<&Path>,
        cache: Option<&TileImageCache>,
        mismatches: &[ImageMismatch],
    ) {
        let info = &tileset.info;
        ui.heading(info.name.as_str());
        if let Some(path) = path {
            ui.label(path.display().to_string());
        }
        ui.label(format!(
            "Format {} (Tiled {})",
            info.version.as_deref().unwrap_or("?"),
            info.tiled_version.as_deref().unwrap_or("?")
        ));
        ui.label(format!(
            "{} tiles, {}x{} px, {}",
            tileset.len(),
            info.tile_width,
            info.tile_height,
            if tileset.is_atlas() {
                format!("{} columns", info.columns)
            } else {
                "image collection".to_string()
            }
        ));
        ui.label(format!(
            "Grid: {} {}x{}",
            tileset.grid.orientation, tileset.grid.width, tileset.grid.height
        ));

        if let Some(cache) = cache {
            if cache.placeholder_count() > 0 {
                ui.colored_label(
                    egui::Color32::RED,
                    format!("{} images missing", cache.placeholder_count()),
                );
            }
        }
        if !mismatches.is_empty() {
            ui.collapsing(format!("{} image problems", mismatches.len()), |ui| {
                for mismatch in mismatches {
                    ui.label(mismatch.to_string());
                }
            });
        }
        ui.separator();
    }
}

impl eframe::App for TilesetViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.show_menu_bar(ui);
        });

        if self.settings_open {
            self.show_settings(ctx);
        }

        if self.about_open {
            egui::Window::new("About tsxviewer")
                .collapsible(false)
                .resizable(false)
                .default_size([280.0, 100.0])
                .open(&mut self.about_open)
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("tsxviewer");
                        ui.label("Viewer for Tiled tilesets");
                        ui.label("Written in Rust");
                    });
                });
        }

        egui::SidePanel::right("info_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                if let Some(tileset) = &self.tileset {
                    Self::show_tileset_summary(
                        ui,
                        tileset,
                        self.tileset_path.as_deref(),
                        self.image_cache.as_deref(),
                        &self.mismatches,
                    );
                    let shown = self.selected_tile.or(self.tileset_view.hovered_tile());
                    self.tile_info
                        .show(ui, tileset, self.image_cache.as_deref(), shown);
                } else {
                    ui.heading("No Tileset Loaded");
                    ui.label("Open a .tsx file to begin");
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = &self.error_message {
                ui.colored_label(egui::Color32::RED, error);
            }

            if let Some(tileset) = &self.tileset {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if let Some(id) = self.tileset_view.show(
                        ui,
                        tileset,
                        self.image_cache.as_deref(),
                        &self.config,
                        self.selected_tile,
                    ) {
                        self.selected_tile = Some(id);
                    }
                });
            } else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Welcome to tsxviewer");
                });
            }
        });
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.config);
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn describe_error(error: &TilesetLoadError) -> String {
    match error {
        TilesetLoadError::IoError(e) => format!("Failed to read tileset file: {}", e),
        TilesetLoadError::XmlError(e) => format!("Malformed tileset: {}", e),
        TilesetLoadError::InvalidFormat(msg) => format!("Invalid tileset format: {}", msg),
        TilesetLoadError::UnsupportedVersion(ver) => {
            format!("Unsupported tileset version: {}", ver)
        }
        TilesetLoadError::ZipError(e) => format!("Failed to read tileset bundle: {}", e),
        e => format!("Error loading tileset: {}", e),
    }
}
