//! Optional export of the rendered figure to a user-chosen file.

use std::{borrow::Cow, fs, io::Write, path::PathBuf};

use tracing::{info, warn};

use crate::{
    config::{ImageFormat, ScriptParameters},
    error::{PlotError, Result},
    render::RenderedImage,
};

pub mod template;

pub use template::{NoVariables, TemplateContext, VariableMap, VariableSubstitutor};

#[derive(Debug, Clone)]
enum ContextSource {
    Fixed(TemplateContext),
    /// Date and user are read when each export starts.
    Current { workspace: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct OutputFileWriter {
    source: ContextSource,
}

impl OutputFileWriter {
    /// Resolve every template against `ctx`.
    pub fn new(ctx: TemplateContext) -> Self {
        Self { source: ContextSource::Fixed(ctx) }
    }

    /// Capture a fresh [`TemplateContext`] at the start of every export.
    pub fn current(workspace: Option<PathBuf>) -> Self {
        Self { source: ContextSource::Current { workspace } }
    }

    fn context(&self) -> Cow<'_, TemplateContext> {
        match &self.source {
            ContextSource::Fixed(ctx) => Cow::Borrowed(ctx),
            ContextSource::Current { workspace } => {
                Cow::Owned(TemplateContext::current(workspace.clone()))
            }
        }
    }

    /// Returns the written path, or `None` when export is disabled or the
    /// template resolves to nothing.
    ///
    /// The file is always PNG encoded, whatever `image_format` says.
    pub fn write(
        &self,
        params: &ScriptParameters,
        image: &RenderedImage,
        substitutor: &dyn VariableSubstitutor,
    ) -> Result<Option<PathBuf>> {
        if !params.write_to_file || params.output_path_template.is_empty() {
            return Ok(None);
        }

        let resolved = template::resolve(&params.output_path_template, substitutor, &self.context())?;
        if resolved.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(resolved);

        if path.exists() && !params.overwrite {
            return Err(PlotError::Conflict { path });
        }

        if params.image_format != ImageFormat::Png {
            warn!(
                format = %params.image_format,
                path = %path.display(),
                "output file is written as png regardless of the configured format"
            );
        }

        let bytes = image.to_png_bytes()?;
        let mut file = fs::File::create(&path)
            .map_err(|source| PlotError::OutputFile { path: path.clone(), source })?;
        file.write_all(&bytes)
            .map_err(|source| PlotError::OutputFile { path: path.clone(), source })?;

        info!(path = %path.display(), bytes = bytes.len(), "wrote output file");
        Ok(Some(path))
    }
}
