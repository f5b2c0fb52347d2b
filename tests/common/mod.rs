#![allow(dead_code)]

use std::{fs, path::Path, path::PathBuf};

use image::{ImageFormat, Rgb, RgbImage};

/// Write a small valid PNG to `path`.
pub fn write_png(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

/// Pull the first string literal passed to `call(` out of a composed script.
pub fn literal_after(script: &str, call: &str) -> Option<PathBuf> {
    let start = script.find(call)? + call.len();
    let rest = &script[start..];
    let mut de = serde_json::Deserializer::from_str(rest).into_iter::<String>();
    de.next()?.ok().map(PathBuf::from)
}

pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default()
}
