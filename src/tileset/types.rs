//! Tileset data structures for tsxviewer

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Tiled stores flip and rotation flags in the top bits of a global tile id.
pub const FLIPPED_HORIZONTALLY_FLAG: u32 = 0x8000_0000;
pub const FLIPPED_VERTICALLY_FLAG: u32 = 0x4000_0000;
pub const FLIPPED_DIAGONALLY_FLAG: u32 = 0x2000_0000;
pub const ROTATED_HEXAGONAL_120_FLAG: u32 = 0x1000_0000;

const GID_FLAGS: u32 = FLIPPED_HORIZONTALLY_FLAG
    | FLIPPED_VERTICALLY_FLAG
    | FLIPPED_DIAGONALLY_FLAG
    | ROTATED_HEXAGONAL_120_FLAG;

/// Local tile id within a single tileset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grid layout scheme declared by the tileset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Orthogonal,
    Isometric,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Orthogonal => write!(f, "orthogonal"),
            Orientation::Isometric => write!(f, "isometric"),
        }
    }
}

/// The `<grid>` directive: how tiles snap when placed on a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            orientation: Orientation::Orthogonal,
            width: 1,
            height: 1,
        }
    }
}

/// An image reference as written in the document.
///
/// `source` is kept relative to the tileset's directory; use
/// [`Tileset::image_path`] to get a path that can be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Pixel rectangle of a tile inside its image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A single tile entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    /// Only set for image-per-tile tilesets; atlas tiles borrow the tileset image.
    pub image: Option<TileImage>,
    pub class: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl Tile {
    pub fn new(id: TileId, image: Option<TileImage>) -> Self {
        Self {
            id,
            image,
            class: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn description(&self) -> String {
        let mut text = format!("Id: {}\n", self.id);
        if let Some(image) = &self.image {
            text.push_str(&format!(
                "Image: {}\nSize: {}x{}\n",
                image.source.display(),
                image.width,
                image.height
            ));
        }
        if let Some(class) = &self.class {
            text.push_str(&format!("Class: {}\n", class));
        }
        for (name, value) in &self.properties {
            text.push_str(&format!("{} = {}\n", name, value));
        }
        text
    }
}

/// Tileset metadata from the root element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TilesetInfo {
    pub name: String,
    pub version: Option<String>,
    pub tiled_version: Option<String>,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_count: u32,
    /// 0 means every tile carries its own image
    pub columns: u32,
    pub margin: u32,
    pub spacing: u32,
    pub tile_offset: (i32, i32),
    pub class: Option<String>,
}

/// A tile reference decoded from a map layer's global id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRef {
    pub id: TileId,
    pub flipped_horizontally: bool,
    pub flipped_vertically: bool,
    pub flipped_diagonally: bool,
    pub rotated_hexagonal_120: bool,
}

impl TileRef {
    /// Decodes a raw gid against the `firstgid` the map assigned to this tileset.
    ///
    /// Returns `None` for the empty gid 0 and for gids belonging to an earlier tileset.
    pub fn from_gid(gid: u32, first_gid: u32) -> Option<Self> {
        let bare = gid & !GID_FLAGS;
        if bare == 0 || bare < first_gid {
            return None;
        }
        Some(Self {
            id: TileId(bare - first_gid),
            flipped_horizontally: gid & FLIPPED_HORIZONTALLY_FLAG != 0,
            flipped_vertically: gid & FLIPPED_VERTICALLY_FLAG != 0,
            flipped_diagonally: gid & FLIPPED_DIAGONALLY_FLAG != 0,
            rotated_hexagonal_120: gid & ROTATED_HEXAGONAL_120_FLAG != 0,
        })
    }
}

/// Complete tileset data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tileset {
    pub info: TilesetInfo,
    pub grid: Grid,
    /// Shared sheet for atlas tilesets (`columns > 0`)
    pub atlas: Option<TileImage>,
    pub properties: BTreeMap<String, String>,
    /// Directory image sources are relative to
    pub base_dir: PathBuf,
    /// Tiles listed in the document. Atlas ids without a record are implied.
    tiles: BTreeMap<TileId, Tile>,
}

impl Tileset {
    pub fn new(info: TilesetInfo, base_dir: PathBuf) -> Self {
        Self {
            info,
            grid: Grid::default(),
            atlas: None,
            properties: BTreeMap::new(),
            base_dir,
            tiles: BTreeMap::new(),
        }
    }

    /// Inserts a tile, handing back the tile if its id is already taken.
    pub(crate) fn insert_tile(&mut self, tile: Tile) -> Result<(), Tile> {
        if self.tiles.contains_key(&tile.id) {
            return Err(tile);
        }
        self.tiles.insert(tile.id, tile);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_atlas(&self) -> bool {
        self.info.columns > 0
    }

    pub fn len(&self) -> usize {
        if self.is_atlas() {
            self.info.tile_count as usize
        } else {
            self.tiles.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: TileId) -> bool {
        if self.is_atlas() {
            id.0 < self.info.tile_count
        } else {
            self.tiles.contains_key(&id)
        }
    }

    /// Looks up a tile. Ids missing from the document are `None`, never a blank entry.
    ///
    /// Atlas tiles without a `<tile>` record come back as an owned bare tile.
    pub fn tile(&self, id: TileId) -> Option<Cow<'_, Tile>> {
        if let Some(tile) = self.tiles.get(&id) {
            return Some(Cow::Borrowed(tile));
        }
        self.contains(id).then(|| Cow::Owned(Tile::new(id, None)))
    }

    /// Tiles in ascending id order
    pub fn tiles(&self) -> impl Iterator<Item = Cow<'_, Tile>> + '_ {
        self.ids().filter_map(move |id| self.tile(id))
    }

    pub fn ids(&self) -> Box<dyn Iterator<Item = TileId> + '_> {
        if self.is_atlas() {
            Box::new((0..self.info.tile_count).map(TileId))
        } else {
            Box::new(self.tiles.keys().copied())
        }
    }

    /// The image a tile is drawn from: its own image, or the atlas sheet.
    pub fn image(&self, id: TileId) -> Option<&TileImage> {
        match self.tiles.get(&id) {
            Some(tile) => tile.image.as_ref().or(self.atlas.as_ref()),
            None if self.contains(id) => self.atlas.as_ref(),
            None => None,
        }
    }

    pub fn image_path(&self, id: TileId) -> Option<PathBuf> {
        self.image(id).map(|image| self.resolve(&image.source))
    }

    pub fn resolve(&self, source: &Path) -> PathBuf {
        self.base_dir.join(source)
    }

    /// Pixel rectangle of the tile within [`Tileset::image`].
    ///
    /// `None` for unknown ids and for atlas positions that do not fit in `u32`.
    pub fn source_rect(&self, id: TileId) -> Option<TileRect> {
        if !self.contains(id) {
            return None;
        }
        if let Some(image) = self.tiles.get(&id).and_then(|tile| tile.image.as_ref()) {
            return Some(TileRect {
                x: 0,
                y: 0,
                width: image.width,
                height: image.height,
            });
        }

        let info = &self.info;
        if info.columns == 0 {
            return None;
        }
        let column = id.0 % info.columns;
        let row = id.0 / info.columns;
        let x = info
            .tile_width
            .checked_add(info.spacing)?
            .checked_mul(column)?
            .checked_add(info.margin)?;
        let y = info
            .tile_height
            .checked_add(info.spacing)?
            .checked_mul(row)?
            .checked_add(info.margin)?;
        x.checked_add(info.tile_width)?;
        y.checked_add(info.tile_height)?;
        Some(TileRect {
            x,
            y,
            width: info.tile_width,
            height: info.tile_height,
        })
    }

    /// Resolves a map layer gid to the tile it names.
    pub fn resolve_gid(&self, gid: u32, first_gid: u32) -> Option<(TileRef, Cow<'_, Tile>)> {
        let tile_ref = TileRef::from_gid(gid, first_gid)?;
        self.tile(tile_ref.id).map(|tile| (tile_ref, tile))
    }
}
