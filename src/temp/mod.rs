//! Temporary exchange artifacts for one execution attempt.
//!
//! Names combine a per-attempt random token with a role label, e.g.
//! `3f2c..._img_Xa81Qz.png`. Placeholder files are removed right after their
//! names are reserved so the interpreter can create the real files itself.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::ImageFormat,
    error::{PlotError, Result},
};

pub const SHELVE_LABEL: &str = "shelve";
pub const IMG_LABEL: &str = "img";
pub const SCRIPT_LABEL: &str = "script";

/// Appended by Python's `shelve`/`dbm` backend to the path it is handed.
pub const SHELVE_BACKEND_SUFFIX: &str = ".db";

#[derive(Debug, Clone)]
pub struct TempArtifactManager {
    root: PathBuf,
}

impl TempArtifactManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reserve the shelve, image and script paths of a new attempt.
    pub fn allocate(&self, image_format: ImageFormat) -> Result<TempArtifactSet> {
        let token = Uuid::new_v4().simple().to_string();
        let image_suffix = format!(".{}", image_format.extension());

        let shelve_path = self.placeholder(&token, SHELVE_LABEL, "")?;
        let image_path = match self.placeholder(&token, IMG_LABEL, &image_suffix) {
            Ok(p) => p,
            Err(err) => {
                discard(&[shelve_path]);
                return Err(err);
            }
        };
        let script_path = match self.placeholder(&token, SCRIPT_LABEL, ".py") {
            Ok(p) => p,
            Err(err) => {
                discard(&[shelve_path, image_path]);
                return Err(err);
            }
        };

        debug!(
            token = %token,
            shelve = %shelve_path.display(),
            image = %image_path.display(),
            script = %script_path.display(),
            "allocated temp artifacts"
        );

        Ok(TempArtifactSet {
            root: self.root.clone(),
            token,
            shelve_path,
            image_path,
            script_path,
            released: false,
        })
    }

    fn placeholder(&self, token: &str, label: &str, suffix: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(&format!("{token}_{label}_"))
            .suffix(suffix)
            .tempfile_in(&self.root)
            .map_err(|e| {
                PlotError::temp_file(
                    format!("failed to create {label} file in {}", self.root.display()),
                    e,
                )
            })?;
        let path = file.path().to_path_buf();
        file.close()
            .map_err(|e| PlotError::temp_file(format!("failed to remove placeholder {}", path.display()), e))?;
        Ok(path)
    }
}

impl Default for TempArtifactManager {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

/// Temp paths owned by exactly one attempt, released together exactly once.
#[derive(Debug)]
pub struct TempArtifactSet {
    root: PathBuf,
    token: String,
    shelve_path: PathBuf,
    image_path: PathBuf,
    script_path: PathBuf,
    released: bool,
}

impl TempArtifactSet {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Logical shelve path handed to the interpreter.
    pub fn shelve_path(&self) -> &Path {
        &self.shelve_path
    }

    /// Where the shelve backend actually writes: `shelve_path + ".db"`.
    pub fn actual_shelve_path(&self) -> PathBuf {
        with_suffix(&self.shelve_path, SHELVE_BACKEND_SUFFIX)
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// The known paths plus anything else in the temp root carrying this
    /// attempt's token, e.g. `.dir`/`.pag` files from another dbm backend.
    fn tracked(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.shelve_path.clone(),
            self.actual_shelve_path(),
            self.image_path.clone(),
            self.script_path.clone(),
        ];
        let prefix = format!("{}_", self.token);
        match fs::read_dir(&self.root) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if entry.file_name().to_string_lossy().starts_with(&prefix) && !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
            Err(e) => warn!(root = %self.root.display(), error = %e, "failed to scan temp dir"),
        }
        paths
    }

    /// Remove every file of this attempt. Later calls are no-ops.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut first_err: Option<(PathBuf, io::Error)> = None;
        for path in self.tracked() {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed temp artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove temp artifact");
                    if first_err.is_none() {
                        first_err = Some((path, e));
                    }
                }
            }
        }

        match first_err {
            None => Ok(()),
            Some((path, e)) => Err(PlotError::temp_file(
                format!("failed to remove {}", path.display()),
                e,
            )),
        }
    }
}

impl Drop for TempArtifactSet {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.release();
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut p = path.as_os_str().to_os_string();
    p.push(suffix);
    PathBuf::from(p)
}

fn discard(paths: &[PathBuf]) {
    for p in paths {
        let _ = fs::remove_file(p);
    }
}
