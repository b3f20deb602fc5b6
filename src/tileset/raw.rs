//! Serde mirror of the `.tsx` document.
//!
//! These structs follow the XML one-to-one; the loader turns them into the
//! checked types in [`super::types`].

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawTileset {
    pub version: Option<String>,
    pub tiledversion: Option<String>,
    pub name: String,
    pub class: Option<String>,
    pub tilewidth: u32,
    pub tileheight: u32,
    pub tilecount: u32,
    pub columns: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub spacing: u32,
    pub tileoffset: Option<RawTileOffset>,
    pub grid: Option<RawGrid>,
    pub properties: Option<RawProperties>,
    pub image: Option<RawImage>,
    #[serde(rename = "tile", default)]
    pub tiles: Vec<RawTile>,
}

#[derive(Debug, Deserialize)]
pub struct RawTileOffset {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

#[derive(Debug, Deserialize)]
pub struct RawGrid {
    pub orientation: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct RawTile {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub class: Option<String>,
    pub properties: Option<RawProperties>,
    pub image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
pub struct RawImage {
    /// Missing when the image is embedded as `<data>`
    pub source: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct RawProperties {
    #[serde(rename = "property", default)]
    pub properties: Vec<RawProperty>,
}

#[derive(Debug, Deserialize)]
pub struct RawProperty {
    pub name: String,
    #[serde(default)]
    pub value: String,
}
