//! Decoded raster produced by the interpreter.

use std::{fs, io::Cursor, path::Path};

use image::{DynamicImage, ImageFormat};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RenderedImage {
    inner: DynamicImage,
}

impl RenderedImage {
    /// Decode from disk, guessing the format from the file content.
    pub fn decode_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(image::ImageError::IoError)?;
        Self::decode(&bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let inner = image::load_from_memory(bytes)?;
        Ok(Self { inner })
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// PNG stream handed to downstream consumers.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.inner.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}
