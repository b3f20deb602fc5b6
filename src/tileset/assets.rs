//! Image assets referenced by a tileset

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Component, Path, PathBuf};

use image::{DynamicImage, GenericImageView, ImageError, Rgba, RgbaImage};
use zip::result::ZipError;
use zip::ZipArchive;

use super::loader::{parse_tileset, TilesetLoadError};
use super::types::{TileId, TileImage, Tileset};

/// Largest edge of a placeholder; bigger declared sizes are clamped
pub const MAX_PLACEHOLDER_SIZE: u32 = 256;

const PLACEHOLDER_CHECKER: u32 = 8;
const PLACEHOLDER_COLORS: [Rgba<u8>; 2] = [Rgba([255, 0, 255, 255]), Rgba([0, 0, 0, 255])];

/// What went wrong with a referenced image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageProblem {
    Missing,
    Unreadable(String),
    SizeMismatch {
        declared: (u32, u32),
        actual: (u32, u32),
    },
}

/// A referenced image that does not match its declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMismatch {
    /// `None` for the shared sheet of an atlas tileset
    pub tile: Option<TileId>,
    pub path: PathBuf,
    pub problem: ImageProblem,
}

impl fmt::Display for ImageMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tile {
            Some(id) => write!(f, "tile {}: ", id)?,
            None => write!(f, "atlas: ")?,
        }
        match &self.problem {
            ImageProblem::Missing => write!(f, "{} does not exist", self.path.display()),
            ImageProblem::Unreadable(reason) => {
                write!(f, "{} could not be read ({})", self.path.display(), reason)
            }
            ImageProblem::SizeMismatch { declared, actual } => write!(
                f,
                "{} is {}x{}, declared {}x{}",
                self.path.display(),
                actual.0,
                actual.1,
                declared.0,
                declared.1
            ),
        }
    }
}

/// Checks every referenced image on disk against its declared size.
///
/// Only image headers are read, so this is cheap even for large sheets.
pub fn verify_images(tileset: &Tileset) -> Vec<ImageMismatch> {
    let mut mismatches = Vec::new();

    if let Some(atlas) = &tileset.atlas {
        if let Some(problem) = check_image(&tileset.resolve(&atlas.source), atlas) {
            mismatches.push(ImageMismatch {
                tile: None,
                path: tileset.resolve(&atlas.source),
                problem,
            });
        }
    }

    for tile in tileset.tiles() {
        let Some(image) = &tile.image else {
            continue;
        };
        let path = tileset.resolve(&image.source);
        if let Some(problem) = check_image(&path, image) {
            mismatches.push(ImageMismatch {
                tile: Some(tile.id),
                path,
                problem,
            });
        }
    }

    mismatches
}

fn check_image(path: &Path, declared: &TileImage) -> Option<ImageProblem> {
    if !path.is_file() {
        return Some(ImageProblem::Missing);
    }
    match image::image_dimensions(path) {
        Ok(actual) if actual == (declared.width, declared.height) => None,
        Ok(actual) => Some(ImageProblem::SizeMismatch {
            declared: (declared.width, declared.height),
            actual,
        }),
        Err(e) => Some(ImageProblem::Unreadable(e.to_string())),
    }
}

/// Cache of decoded tile images, keyed by tile id
#[derive(Debug, Default)]
pub struct TileImageCache {
    images: HashMap<TileId, DynamicImage>,
    /// Tiles drawn with a placeholder, and the placeholder size they use
    placeholders: HashMap<TileId, (u32, u32)>,
    placeholder_images: HashMap<(u32, u32), DynamicImage>,
    mismatches: Vec<ImageMismatch>,
}

impl TileImageCache {
    /// Creates a new, empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes every tile image of `tileset` from disk.
    ///
    /// Images that are missing or fail to decode are replaced by a placeholder
    /// of the declared size, capped at [`MAX_PLACEHOLDER_SIZE`].
    pub fn load(tileset: &Tileset) -> Self {
        let mut cache = Self::new();
        cache.fill(
            tileset,
            |source| tileset.resolve(source),
            |path| Ok(image::open(path)?),
        );
        cache
    }

    /// Loads a tileset and its images from a zip bundle.
    ///
    /// The first `.tsx` entry in the archive is used; image sources are
    /// resolved relative to that entry.
    pub fn load_archive(archive_path: &Path) -> Result<(Tileset, Self), TilesetLoadError> {
        let file = File::open(archive_path)?;
        let mut archive = ZipArchive::new(file)?;

        let mut tileset_entry = None;
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.name().ends_with(".tsx") {
                tileset_entry = Some(entry.name().to_string());
                break;
            }
        }
        let tileset_entry = tileset_entry.ok_or(TilesetLoadError::NoTilesetInArchive)?;
        log::debug!("Using {} from {:?}", tileset_entry, archive_path);

        let mut xml = String::new();
        archive.by_name(&tileset_entry)?.read_to_string(&mut xml)?;
        let base_dir = Path::new(&tileset_entry)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let tileset = parse_tileset(&xml, &base_dir)?;

        let mut cache = Self::new();
        cache.fill(
            &tileset,
            |source| PathBuf::from(archive_entry_name(&tileset.resolve(source))),
            |entry| {
                let mut buffer = Vec::new();
                archive
                    .by_name(&entry.to_string_lossy())?
                    .read_to_end(&mut buffer)?;
                Ok(image::load_from_memory(&buffer)?)
            },
        );

        log::info!(
            "Loaded tileset '{}' with {} tiles from archive {:?}",
            tileset.name(),
            tileset.len(),
            archive_path
        );
        Ok((tileset, cache))
    }

    /// `locate` maps an image source to where `open` finds it.
    fn fill<L, F>(&mut self, tileset: &Tileset, locate: L, mut open: F)
    where
        L: Fn(&Path) -> PathBuf,
        F: FnMut(&Path) -> Result<DynamicImage, TilesetLoadError>,
    {
        let atlas = tileset
            .atlas
            .as_ref()
            .and_then(|atlas| self.open_checked(None, atlas, &locate, &mut open));

        for tile in tileset.tiles() {
            let id = tile.id;
            let loaded = match (&tile.image, &atlas) {
                (Some(image), _) => self.open_checked(Some(id), image, &locate, &mut open),
                (None, Some(sheet)) => match tileset.source_rect(id) {
                    Some(rect) if fits(rect.x, rect.width, sheet.width())
                        && fits(rect.y, rect.height, sheet.height()) =>
                    {
                        Some(sheet.crop_imm(rect.x, rect.y, rect.width, rect.height))
                    }
                    _ => {
                        log::warn!("Tile {} lies outside the atlas image", id);
                        None
                    }
                },
                (None, None) => None,
            };

            match loaded {
                Some(image) => {
                    self.images.insert(id, image);
                }
                None => {
                    let (width, height) = tileset
                        .source_rect(id)
                        .map(|rect| (rect.width, rect.height))
                        .unwrap_or((tileset.info.tile_width, tileset.info.tile_height));
                    self.add_placeholder(id, width, height);
                }
            }
        }
    }

    /// Opens one referenced image, recording any problem with it.
    fn open_checked<L, F>(
        &mut self,
        tile: Option<TileId>,
        declared: &TileImage,
        locate: &L,
        open: &mut F,
    ) -> Option<DynamicImage>
    where
        L: Fn(&Path) -> PathBuf,
        F: FnMut(&Path) -> Result<DynamicImage, TilesetLoadError>,
    {
        let path = locate(&declared.source);
        match open(&path) {
            Ok(image) => {
                let actual = (image.width(), image.height());
                if actual != (declared.width, declared.height) {
                    self.mismatches.push(ImageMismatch {
                        tile,
                        path,
                        problem: ImageProblem::SizeMismatch {
                            declared: (declared.width, declared.height),
                            actual,
                        },
                    });
                }
                Some(image)
            }
            Err(e) => {
                log::warn!("Failed to load image {}: {}", path.display(), e);
                self.mismatches.push(ImageMismatch {
                    tile,
                    path,
                    problem: problem_for(&e),
                });
                None
            }
        }
    }

    fn add_placeholder(&mut self, id: TileId, width: u32, height: u32) {
        let size = (
            width.clamp(1, MAX_PLACEHOLDER_SIZE),
            height.clamp(1, MAX_PLACEHOLDER_SIZE),
        );
        self.placeholder_images
            .entry(size)
            .or_insert_with(|| placeholder_image(size.0, size.1));
        self.placeholders.insert(id, size);
    }

    /// Gets a tile's image by id
    pub fn get_image(&self, id: TileId) -> Option<&DynamicImage> {
        self.images.get(&id).or_else(|| {
            self.placeholders
                .get(&id)
                .and_then(|size| self.placeholder_images.get(size))
        })
    }

    pub fn is_placeholder(&self, id: TileId) -> bool {
        self.placeholders.contains_key(&id)
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Problems found while decoding, in the order images were opened
    pub fn mismatches(&self) -> &[ImageMismatch] {
        &self.mismatches
    }

    pub fn len(&self) -> usize {
        self.images.len() + self.placeholders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fits(offset: u32, extent: u32, limit: u32) -> bool {
    offset.checked_add(extent).is_some_and(|end| end <= limit)
}

fn problem_for(error: &TilesetLoadError) -> ImageProblem {
    let missing = match error {
        TilesetLoadError::IoError(e) => e.kind() == ErrorKind::NotFound,
        TilesetLoadError::ImageError(ImageError::IoError(e)) => e.kind() == ErrorKind::NotFound,
        TilesetLoadError::ZipError(ZipError::FileNotFound) => true,
        _ => false,
    };
    if missing {
        ImageProblem::Missing
    } else {
        ImageProblem::Unreadable(error.to_string())
    }
}

/// Magenta and black checkerboard used in place of a missing image
pub fn placeholder_image(width: u32, height: u32) -> DynamicImage {
    let image = RgbaImage::from_fn(width.max(1), height.max(1), |x, y| {
        let parity = (x / PLACEHOLDER_CHECKER + y / PLACEHOLDER_CHECKER) % 2;
        PLACEHOLDER_COLORS[parity as usize]
    });
    DynamicImage::ImageRgba8(image)
}

/// Lexically normalizes a path into a `/`-separated zip entry name.
fn archive_entry_name(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn entry_names_collapse_parent_dirs() {
        let path = Path::new("data/Tilesets").join("../../graphics/objects/bush.png");
        assert_eq!(archive_entry_name(&path), "graphics/objects/bush.png");
        assert_eq!(archive_entry_name(Path::new("./a/b.png")), "a/b.png");
    }

    #[test]
    fn placeholder_has_requested_size() {
        let image = placeholder_image(20, 9);
        assert_eq!(image.dimensions(), (20, 9));
        assert_eq!(image.get_pixel(0, 0), PLACEHOLDER_COLORS[0]);
        assert_eq!(image.get_pixel(8, 0), PLACEHOLDER_COLORS[1]);
    }

    #[test]
    fn placeholders_are_clamped_and_shared() {
        let mut cache = TileImageCache::new();
        cache.add_placeholder(TileId(0), 100_000, 100_000);
        cache.add_placeholder(TileId(1), 4_000_000, 300);
        cache.add_placeholder(TileId(2), 0, 16);

        assert_eq!(cache.placeholder_count(), 3);
        assert_eq!(cache.placeholder_images.len(), 2);
        let big = cache.get_image(TileId(0)).unwrap();
        assert_eq!(
            big.dimensions(),
            (MAX_PLACEHOLDER_SIZE, MAX_PLACEHOLDER_SIZE)
        );
        assert!(std::ptr::eq(big, cache.get_image(TileId(1)).unwrap()));
        assert_eq!(cache.get_image(TileId(2)).unwrap().dimensions(), (1, 16));
    }

    #[test]
    fn open_failures_are_classified() {
        let missing = TilesetLoadError::ZipError(ZipError::FileNotFound);
        assert_eq!(problem_for(&missing), ImageProblem::Missing);
        let not_found = io::Error::new(ErrorKind::NotFound, "gone");
        assert_eq!(
            problem_for(&TilesetLoadError::ImageError(ImageError::IoError(not_found))),
            ImageProblem::Missing
        );
        let denied = io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            problem_for(&TilesetLoadError::IoError(denied)),
            ImageProblem::Unreadable(_)
        ));
    }

    #[test]
    fn crop_bounds_do_not_overflow() {
        assert!(fits(16, 16, 32));
        assert!(!fits(17, 16, 32));
        assert!(!fits(u32::MAX, 1, u32::MAX));
    }

    #[test]
    fn mismatch_messages_name_the_tile() {
        let mismatch = ImageMismatch {
            tile: Some(TileId(5)),
            path: PathBuf::from("tree_medium.png"),
            problem: ImageProblem::SizeMismatch {
                declared: (96, 124),
                actual: (96, 120),
            },
        };
        assert_eq!(
            mismatch.to_string(),
            "tile 5: tree_medium.png is 96x120, declared 96x124"
        );
    }
}
