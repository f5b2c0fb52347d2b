//! Durable node internals: `image.png` plus `shelve.db`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    error::{PlotError, Result},
    render::RenderedImage,
    temp::TempArtifactSet,
};

pub const IMAGE_FILE: &str = "image.png";
pub const SHELVE_FILE: &str = "shelve.db";

/// Copies the artifacts of a finished attempt into internal storage.
#[derive(Debug, Clone)]
pub struct ArtifactPersister {
    internal_dir: PathBuf,
}

impl ArtifactPersister {
    pub fn new(internal_dir: impl Into<PathBuf>) -> Self {
        Self { internal_dir: internal_dir.into() }
    }

    /// Both sources are checked before either copy, so a missing artifact
    /// leaves a previous pair untouched. The two copies are not atomic together.
    pub fn persist(&self, temp: &TempArtifactSet) -> Result<()> {
        let image_src = temp.image_path().to_path_buf();
        let shelve_src = temp.actual_shelve_path();

        ensure_readable(&image_src, "image")?;
        ensure_readable(&shelve_src, "shelve")?;

        fs::create_dir_all(&self.internal_dir).map_err(|source| PlotError::Persistence {
            target: self.internal_dir.clone(),
            source,
        })?;

        let image_dst = self.internal_dir.join(IMAGE_FILE);
        copy(&image_src, &image_dst)?;
        let shelve_dst = self.internal_dir.join(SHELVE_FILE);
        copy(&shelve_src, &shelve_dst)?;

        info!(dir = %self.internal_dir.display(), "persisted node internals");
        Ok(())
    }
}

fn ensure_readable(path: &Path, artifact: &'static str) -> Result<()> {
    match fs::File::open(path) {
        Ok(f) if f.metadata().map(|m| m.is_file()).unwrap_or(false) => Ok(()),
        _ => Err(PlotError::ExecutionFailure { artifact, path: path.to_path_buf() }),
    }
}

fn copy(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|source| PlotError::Persistence { target: dst.to_path_buf(), source })
}

/// Validates internal storage and rehydrates the image lazily.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    internal_dir: PathBuf,
    image: Option<RenderedImage>,
}

impl ArtifactLoader {
    pub fn new(internal_dir: impl Into<PathBuf>) -> Self {
        Self { internal_dir: internal_dir.into(), image: None }
    }

    pub fn internal_dir(&self) -> &Path {
        &self.internal_dir
    }

    pub fn image_path(&self) -> PathBuf {
        self.internal_dir.join(IMAGE_FILE)
    }

    /// Both files must exist and be readable; anything less is corrupt.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        for name in [IMAGE_FILE, SHELVE_FILE] {
            let path = self.internal_dir.join(name);
            if let Err(e) = readable_file(&path) {
                missing.push(format!("{name} ({e})"));
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PlotError::CorruptInternals {
                dir: self.internal_dir.clone(),
                reason: format!("files missing or without read access: {}", missing.join(", ")),
            })
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Decode `image.png` on first use; later calls return the cached bitmap.
    pub fn get_image(&mut self) -> Result<&RenderedImage> {
        let image = match self.image.take() {
            Some(img) => img,
            None => {
                warn!(path = %self.image_path().display(), "restoring image from disk");
                RenderedImage::decode_file(&self.image_path())?
            }
        };
        Ok(self.image.insert(image))
    }

    /// Seed the cache with the bitmap of a fresh execution.
    pub fn install(&mut self, image: RenderedImage) {
        self.image = Some(image);
    }

    pub fn reset(&mut self) {
        self.image = None;
    }
}

fn readable_file(path: &Path) -> io::Result<()> {
    let f = fs::File::open(path)?;
    if f.metadata()?.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"))
    }
}
