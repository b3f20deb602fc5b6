//! Report produced by `tsxviewer check`

use std::fmt;
use std::path::PathBuf;

use crate::tileset::{verify_images, Grid, ImageMismatch, TileId, Tileset};

/// One tile as listed in a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLine {
    pub id: TileId,
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Summary of a loaded tileset and, optionally, of its images
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub name: String,
    pub tile_count: usize,
    pub tile_width: u32,
    pub tile_height: u32,
    pub grid: Grid,
    pub tiles: Vec<TileLine>,
    /// `None` when image checking was skipped
    pub mismatches: Option<Vec<ImageMismatch>>,
}

impl CheckReport {
    /// Builds the report, comparing images on disk when `check_images` is set.
    pub fn run(tileset: &Tileset, check_images: bool) -> Self {
        let tiles = tileset
            .ids()
            .filter_map(|id| {
                let image = tileset.image(id)?;
                let rect = tileset.source_rect(id)?;
                Some(TileLine {
                    id,
                    source: image.source.clone(),
                    width: rect.width,
                    height: rect.height,
                })
            })
            .collect();

        let mismatches = check_images.then(|| verify_images(tileset));
        if let Some(mismatches) = &mismatches {
            log::debug!("{} image problems in '{}'", mismatches.len(), tileset.name());
        }

        Self {
            name: tileset.name().to_string(),
            tile_count: tileset.len(),
            tile_width: tileset.info.tile_width,
            tile_height: tileset.info.tile_height,
            grid: tileset.grid,
            tiles,
            mismatches,
        }
    }

    /// True unless image checking ran and found problems
    pub fn passed(&self) -> bool {
        self.mismatches.as_ref().map_or(true, Vec::is_empty)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} tiles, {}x{} px, grid {} {}x{}",
            self.name,
            self.tile_count,
            self.tile_width,
            self.tile_height,
            self.grid.orientation,
            self.grid.width,
            self.grid.height
        )?;
        for tile in &self.tiles {
            writeln!(
                f,
                "  {:>4}  {}  {}x{}",
                tile.id,
                tile.source.display(),
                tile.width,
                tile.height
            )?;
        }

        match &self.mismatches {
            None => writeln!(f, "Image check skipped"),
            Some(mismatches) if mismatches.is_empty() => {
                writeln!(f, "All images match their declared size")
            }
            Some(mismatches) => {
                for mismatch in mismatches {
                    writeln!(f, "  error: {}", mismatch)?;
                }
                writeln!(f, "{} image problems", mismatches.len())
            }
        }
    }
}
