//! Tileset loading functionality for tsxviewer

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

use super::raw::{RawImage, RawProperties, RawTileset};
use super::types::{Grid, Orientation, Tile, TileId, TileImage, Tileset, TilesetInfo};

/// Error type for tileset loading operations
#[derive(Error, Debug)]
pub enum TilesetLoadError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] serde_xml_rs::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("Unsupported grid orientation: {0}")]
    UnsupportedOrientation(String),

    #[error("Duplicate tile id {0}")]
    DuplicateTileId(TileId),

    #[error("Tile {0} has an empty image source")]
    EmptyImageSource(TileId),

    #[error("Tile {id} declares an invalid image size {width}x{height}")]
    InvalidImageSize { id: TileId, width: u32, height: u32 },

    #[error("Tile {0} has no image")]
    MissingImage(TileId),

    #[error("Invalid atlas image: {0}")]
    InvalidAtlasImage(String),

    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("No .tsx file found in archive")]
    NoTilesetInArchive,

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Upper bound on the tiles an atlas may declare
pub const MAX_ATLAS_TILES: u32 = 1 << 20;

/// Loads a tileset from a `.tsx` file.
///
/// Image sources are resolved against the directory containing `file_path`.
pub fn load_tileset(file_path: &Path) -> Result<Tileset, TilesetLoadError> {
    log::debug!("Loading tileset {:?}", file_path);
    let xml = fs::read_to_string(file_path)?;
    let base_dir = file_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let tileset = parse_tileset(&xml, &base_dir)?;
    log::info!(
        "Loaded tileset '{}' with {} tiles from {:?}",
        tileset.name(),
        tileset.len(),
        file_path
    );
    Ok(tileset)
}

/// Parses and validates an in-memory `.tsx` document.
pub fn parse_tileset(xml: &str, base_dir: &Path) -> Result<Tileset, TilesetLoadError> {
    let (root, attributes) = root_element(xml)?;
    if root != "tileset" {
        return Err(TilesetLoadError::InvalidFormat(format!(
            "Expected <tileset> root element, found <{}>",
            root
        )));
    }
    // A map's reference to an external tileset, not a tileset document
    if let Some(source) = attributes.iter().find(|a| a.name.local_name == "source") {
        return Err(TilesetLoadError::InvalidFormat(format!(
            "External tileset reference '{}' is not a tileset document",
            source.value
        )));
    }

    let raw: RawTileset = serde_xml_rs::from_str(xml)?;
    build_tileset(raw, base_dir.to_path_buf())
}

fn build_tileset(raw: RawTileset, base_dir: PathBuf) -> Result<Tileset, TilesetLoadError> {
    if let Some(version) = &raw.version {
        check_version(version)?;
    }

    let info = TilesetInfo {
        name: raw.name,
        version: raw.version,
        tiled_version: raw.tiledversion,
        tile_width: raw.tilewidth,
        tile_height: raw.tileheight,
        tile_count: raw.tilecount,
        columns: raw.columns,
        margin: raw.margin,
        spacing: raw.spacing,
        tile_offset: raw.tileoffset.map(|o| (o.x, o.y)).unwrap_or((0, 0)),
        class: raw.class,
    };

    let mut tileset = Tileset::new(info, base_dir);
    tileset.properties = convert_properties(raw.properties);

    if let Some(grid) = raw.grid {
        let orientation = match grid.orientation.as_str() {
            "orthogonal" => Orientation::Orthogonal,
            "isometric" => Orientation::Isometric,
            other => return Err(TilesetLoadError::UnsupportedOrientation(other.to_string())),
        };
        tileset.grid = Grid {
            orientation,
            width: grid.width,
            height: grid.height,
        };
    }

    let is_atlas = tileset.is_atlas();
    if is_atlas {
        let image = raw.image.ok_or_else(|| {
            TilesetLoadError::InvalidFormat(format!(
                "Tileset '{}' has {} columns but no image",
                tileset.info.name, tileset.info.columns
            ))
        })?;
        let sheet = convert_image(image).map_err(|e| {
            TilesetLoadError::InvalidAtlasImage(match e {
                ImageDeclError::Embedded => "embedded image data is not supported".to_string(),
                ImageDeclError::EmptySource => "empty image source".to_string(),
                ImageDeclError::ZeroSize(w, h) => format!("invalid image size {}x{}", w, h),
            })
        })?;
        check_atlas_geometry(&tileset.info, &sheet)?;
        tileset.atlas = Some(sheet);
    }

    for raw_tile in raw.tiles {
        let id = TileId(raw_tile.id);
        if is_atlas && raw_tile.id >= tileset.info.tile_count {
            return Err(TilesetLoadError::InvalidFormat(format!(
                "Tile {} is outside the atlas tilecount {}",
                id, tileset.info.tile_count
            )));
        }
        let image = match raw_tile.image {
            Some(image) => Some(convert_image(image).map_err(|e| match e {
                ImageDeclError::Embedded => TilesetLoadError::InvalidFormat(format!(
                    "Tile {} uses an embedded image, only file references are supported",
                    id
                )),
                ImageDeclError::EmptySource => TilesetLoadError::EmptyImageSource(id),
                ImageDeclError::ZeroSize(width, height) => {
                    TilesetLoadError::InvalidImageSize { id, width, height }
                }
            })?),
            None if !is_atlas => return Err(TilesetLoadError::MissingImage(id)),
            None => None,
        };

        let mut tile = Tile::new(id, image);
        tile.class = raw_tile.class.or(raw_tile.kind);
        tile.properties = convert_properties(raw_tile.properties);

        log::debug!("Tile {}: {:?}", id, tile.image);
        tileset
            .insert_tile(tile)
            .map_err(|tile| TilesetLoadError::DuplicateTileId(tile.id))?;
    }

    if !is_atlas && tileset.len() != tileset.info.tile_count as usize {
        log::warn!(
            "Tileset '{}' declares tilecount {} but lists {} tiles",
            tileset.name(),
            tileset.info.tile_count,
            tileset.len()
        );
    }

    Ok(tileset)
}

fn check_version(version: &str) -> Result<(), TilesetLoadError> {
    let major = version
        .split('.')
        .next()
        .and_then(|major| major.parse::<u32>().ok());
    match major {
        Some(1) => Ok(()),
        _ => Err(TilesetLoadError::UnsupportedVersion(version.to_string())),
    }
}

/// Every tile of the atlas must lie inside the declared sheet.
fn check_atlas_geometry(info: &TilesetInfo, sheet: &TileImage) -> Result<(), TilesetLoadError> {
    if info.tile_width == 0 || info.tile_height == 0 {
        return Err(TilesetLoadError::InvalidFormat(format!(
            "Atlas tileset '{}' declares a {}x{} tile size",
            info.name, info.tile_width, info.tile_height
        )));
    }
    if info.tile_count > MAX_ATLAS_TILES {
        return Err(TilesetLoadError::InvalidFormat(format!(
            "Atlas tileset '{}' declares {} tiles, at most {} are supported",
            info.name, info.tile_count, MAX_ATLAS_TILES
        )));
    }

    let (margin, spacing) = (u64::from(info.margin), u64::from(info.spacing));
    let fit = |extent: u32, tile: u32| {
        (u64::from(extent) + spacing).saturating_sub(2 * margin) / (u64::from(tile) + spacing)
    };
    let columns = fit(sheet.width, info.tile_width).min(u64::from(info.columns));
    let rows = fit(sheet.height, info.tile_height);
    let capacity = columns * rows;

    if u64::from(info.tile_count) > capacity {
        return Err(TilesetLoadError::InvalidFormat(format!(
            "Atlas tileset '{}' declares {} tiles but only {} fit in the {}x{} image",
            info.name, info.tile_count, capacity, sheet.width, sheet.height
        )));
    }
    Ok(())
}

enum ImageDeclError {
    Embedded,
    EmptySource,
    ZeroSize(u32, u32),
}

fn convert_image(raw: RawImage) -> Result<TileImage, ImageDeclError> {
    let source = raw.source.ok_or(ImageDeclError::Embedded)?;
    if source.trim().is_empty() {
        return Err(ImageDeclError::EmptySource);
    }
    if raw.width == 0 || raw.height == 0 {
        return Err(ImageDeclError::ZeroSize(raw.width, raw.height));
    }

    Ok(TileImage {
        source: PathBuf::from(source),
        width: raw.width,
        height: raw.height,
    })
}

fn convert_properties(raw: Option<RawProperties>) -> BTreeMap<String, String> {
    raw.map(|props| {
        props
            .properties
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect()
    })
    .unwrap_or_default()
}

/// Local name and attributes of the document's root element.
fn root_element(xml: &str) -> Result<(String, Vec<OwnedAttribute>), TilesetLoadError> {
    for event in EventReader::from_str(xml) {
        match event {
            Ok(XmlEvent::StartElement {
                name, attributes, ..
            }) => return Ok((name.local_name, attributes)),
            Ok(_) => {}
            Err(e) => {
                return Err(TilesetLoadError::InvalidFormat(format!(
                    "Malformed XML: {}",
                    e
                )))
            }
        }
    }
    Err(TilesetLoadError::InvalidFormat(
        "Document has no root element".into(),
    ))
}
