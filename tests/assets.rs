use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tsxviewer::tileset::*;
use zip::write::FileOptions;
use zip::ZipWriter;

const OBJECTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" tiledversion="1.10.1" name="Objects" tilewidth="128" tileheight="130" tilecount="3" columns="0">
 <grid orientation="orthogonal" width="1" height="1"/>
 <tile id="0">
  <image width="64" height="60" source="../../graphics/objects/bush.png"/>
 </tile>
 <tile id="5">
  <image width="96" height="124" source="../../graphics/objects/tree_medium.png"/>
 </tile>
 <tile id="12">
  <image width="104" height="130" source="../../graphics/objects/Fir_tree.png"/>
 </tile>
</tileset>
"#;

fn solid(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([30, 140, 60, 255]))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(solid(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Lays out a game directory the way the tileset's relative paths expect.
fn game_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("data/Tilesets")).unwrap();
    fs::create_dir_all(dir.path().join("graphics/objects")).unwrap();
    fs::write(dir.path().join("data/Tilesets/Objects.tsx"), OBJECTS).unwrap();
    dir
}

fn save(dir: &Path, name: &str, width: u32, height: u32) {
    solid(width, height)
        .save(dir.join("graphics/objects").join(name))
        .unwrap();
}

#[test]
fn test_images_match_declarations() {
    let dir = game_dir();
    save(dir.path(), "bush.png", 64, 60);
    save(dir.path(), "tree_medium.png", 96, 124);
    save(dir.path(), "Fir_tree.png", 104, 130);

    let tileset = load_tileset(&dir.path().join("data/Tilesets/Objects.tsx")).unwrap();
    assert!(verify_images(&tileset).is_empty());

    let cache = TileImageCache::load(&tileset);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.placeholder_count(), 0);
    let tree = cache.get_image(TileId(5)).unwrap();
    assert_eq!((tree.width(), tree.height()), (96, 124));
}

#[test]
fn test_size_mismatch_and_missing_file() {
    let dir = game_dir();
    save(dir.path(), "bush.png", 64, 60);
    save(dir.path(), "tree_medium.png", 96, 120);

    let tileset = load_tileset(&dir.path().join("data/Tilesets/Objects.tsx")).unwrap();
    let mismatches = verify_images(&tileset);
    assert_eq!(mismatches.len(), 2);

    assert_eq!(mismatches[0].tile, Some(TileId(5)));
    assert_eq!(
        mismatches[0].problem,
        ImageProblem::SizeMismatch {
            declared: (96, 124),
            actual: (96, 120),
        }
    );
    assert_eq!(mismatches[1].tile, Some(TileId(12)));
    assert_eq!(mismatches[1].problem, ImageProblem::Missing);
}

#[test]
fn test_undecodable_image_is_reported() {
    let dir = game_dir();
    save(dir.path(), "bush.png", 64, 60);
    save(dir.path(), "tree_medium.png", 96, 124);
    fs::write(dir.path().join("graphics/objects/Fir_tree.png"), b"not a png").unwrap();

    let tileset = load_tileset(&dir.path().join("data/Tilesets/Objects.tsx")).unwrap();
    let mismatches = verify_images(&tileset);
    assert_eq!(mismatches.len(), 1);
    assert!(matches!(mismatches[0].problem, ImageProblem::Unreadable(_)));

    let cache = TileImageCache::load(&tileset);
    assert!(cache.is_placeholder(TileId(12)));
    assert!(!cache.is_placeholder(TileId(0)));
}

#[test]
fn test_missing_images_get_placeholders() {
    let dir = game_dir();
    save(dir.path(), "bush.png", 64, 60);

    let tileset = load_tileset(&dir.path().join("data/Tilesets/Objects.tsx")).unwrap();
    let cache = TileImageCache::load(&tileset);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.placeholder_count(), 2);
    assert!(cache.is_placeholder(TileId(5)));
    let fir = cache.get_image(TileId(12)).unwrap();
    assert_eq!((fir.width(), fir.height()), (104, 130));
    assert!(cache.get_image(TileId(10)).is_none());
}

#[test]
fn test_atlas_tiles_are_cropped() {
    let dir = TempDir::new().unwrap();
    let mut sheet = RgbaImage::new(32, 16);
    for (x, _, pixel) in sheet.enumerate_pixels_mut() {
        *pixel = if x < 16 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        };
    }
    sheet.save(dir.path().join("sheet.png")).unwrap();
    // Declared with two rows, but the file on disk only has one
    fs::write(
        dir.path().join("sheet.tsx"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="Sheet" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="sheet.png" width="32" height="32"/>
</tileset>"#,
    )
    .unwrap();

    let tileset = load_tileset(&dir.path().join("sheet.tsx")).unwrap();
    let mismatches = verify_images(&tileset);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].tile, None);
    assert_eq!(
        mismatches[0].problem,
        ImageProblem::SizeMismatch {
            declared: (32, 32),
            actual: (32, 16),
        }
    );

    let cache = TileImageCache::load(&tileset);
    assert_eq!(cache.mismatches(), mismatches.as_slice());
    let right = cache.get_image(TileId(1)).unwrap().to_rgba8();
    assert_eq!((right.width(), right.height()), (16, 16));
    assert_eq!(right.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    assert!(!cache.is_placeholder(TileId(0)));
    assert!(cache.is_placeholder(TileId(2)));
    assert!(cache.is_placeholder(TileId(3)));
}

#[test]
fn test_cache_records_problems() {
    let dir = game_dir();
    save(dir.path(), "bush.png", 64, 60);
    save(dir.path(), "tree_medium.png", 96, 120);

    let tileset = load_tileset(&dir.path().join("data/Tilesets/Objects.tsx")).unwrap();
    let cache = TileImageCache::load(&tileset);
    assert_eq!(cache.mismatches(), verify_images(&tileset).as_slice());
    // A wrongly sized image is still shown
    assert!(!cache.is_placeholder(TileId(5)));
}

#[test]
fn test_huge_declared_image_gets_bounded_placeholder() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("huge.tsx"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="Huge" tilewidth="8" tileheight="8" tilecount="2" columns="0">
 <tile id="0"><image width="100000" height="100000" source="gone.png"/></tile>
 <tile id="1"><image width="4000000" height="4000000" source="gone_too.png"/></tile>
</tileset>"#,
    )
    .unwrap();

    let tileset = load_tileset(&dir.path().join("huge.tsx")).unwrap();
    let cache = TileImageCache::load(&tileset);
    assert_eq!(cache.placeholder_count(), 2);
    for id in [TileId(0), TileId(1)] {
        let image = cache.get_image(id).unwrap();
        assert_eq!(
            (image.width(), image.height()),
            (MAX_PLACEHOLDER_SIZE, MAX_PLACEHOLDER_SIZE)
        );
    }
    assert!(cache
        .mismatches()
        .iter()
        .all(|m| m.problem == ImageProblem::Missing));
}

#[test]
fn test_load_from_archive() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("objects.zip");
    let mut zip = ZipWriter::new(File::create(&archive_path).unwrap());
    let options = FileOptions::default();
    zip.start_file("graphics/objects/bush.png", options).unwrap();
    zip.write_all(&png_bytes(64, 60)).unwrap();
    zip.start_file("data/Tilesets/Objects.tsx", options).unwrap();
    zip.write_all(OBJECTS.as_bytes()).unwrap();
    zip.start_file("graphics/objects/tree_medium.png", options).unwrap();
    zip.write_all(&png_bytes(96, 120)).unwrap();
    zip.finish().unwrap();

    let (tileset, cache) = TileImageCache::load_archive(&archive_path).unwrap();
    assert_eq!(tileset.name(), "Objects");
    assert_eq!(tileset.len(), 3);
    assert!(!cache.is_placeholder(TileId(0)));
    assert!(!cache.is_placeholder(TileId(5)));
    assert!(cache.is_placeholder(TileId(12)));
    let bush = cache.get_image(TileId(0)).unwrap();
    assert_eq!((bush.width(), bush.height()), (64, 60));

    let mismatches = cache.mismatches();
    assert_eq!(mismatches.len(), 2);
    assert_eq!(mismatches[0].tile, Some(TileId(5)));
    assert_eq!(mismatches[0].path, Path::new("graphics/objects/tree_medium.png"));
    assert_eq!(
        mismatches[0].problem,
        ImageProblem::SizeMismatch {
            declared: (96, 124),
            actual: (96, 120),
        }
    );
    assert_eq!(mismatches[1].tile, Some(TileId(12)));
    assert_eq!(mismatches[1].problem, ImageProblem::Missing);
}

#[test]
fn test_archive_without_tileset() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("empty.zip");
    let mut zip = ZipWriter::new(File::create(&archive_path).unwrap());
    zip.start_file("readme.txt", FileOptions::default()).unwrap();
    zip.write_all(b"nothing here").unwrap();
    zip.finish().unwrap();

    assert!(matches!(
        TileImageCache::load_archive(&archive_path),
        Err(TilesetLoadError::NoTilesetInArchive)
    ));
}
