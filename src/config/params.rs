//! Typed rendering parameters, captured once per attempt.

use std::{fmt, str::FromStr};

use serde::Serialize;

use super::{Config, DEFAULT_DPI, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{PlotError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Svg,
    Pdf,
    Tif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 5] = [Self::Png, Self::Jpeg, Self::Svg, Self::Pdf, Self::Tif];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
            Self::Tif => "tif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| {
                PlotError::config(format!(
                    "unsupported image format '{s}' (expected one of png, jpeg, svg, pdf, tif)"
                ))
            })
    }
}

/// Immutable snapshot of the figure settings for one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptParameters {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub image_format: ImageFormat,
    pub write_to_file: bool,
    pub output_path_template: String,
    pub overwrite: bool,
}

impl Default for ScriptParameters {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH as u32,
            height: DEFAULT_HEIGHT as u32,
            dpi: DEFAULT_DPI as u32,
            image_format: ImageFormat::Png,
            write_to_file: true,
            output_path_template: String::new(),
            overwrite: false,
        }
    }
}

impl ScriptParameters {
    /// Build and validate the parameters from host settings.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let params = Self {
            width: bounded(cfg, "FIGURE_WIDTH", DEFAULT_WIDTH)?,
            height: bounded(cfg, "FIGURE_HEIGHT", DEFAULT_HEIGHT)?,
            dpi: bounded(cfg, "FIGURE_DPI", DEFAULT_DPI)?,
            image_format: cfg
                .get("FIGURE_OUTPUT_TYPE")
                .as_deref()
                .unwrap_or("png")
                .parse()?,
            write_to_file: cfg.get_bool("WRITE_OUTPUT_FILE"),
            output_path_template: cfg.get("FIGURE_OUTPUT_FILE").unwrap_or_default(),
            overwrite: cfg.get_bool("OVERWRITE_OK"),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        // The settings range only excludes negatives; dpi is a divisor.
        if self.dpi == 0 {
            return Err(PlotError::config("figure dpi must be greater than zero"));
        }
        Ok(())
    }

    /// Physical figure size as `(width / dpi, height / dpi)`.
    pub fn size_inches(&self) -> Result<(f64, f64)> {
        self.validate()?;
        let dpi = f64::from(self.dpi);
        Ok((f64::from(self.width) / dpi, f64::from(self.height) / dpi))
    }
}

fn bounded(cfg: &Config, key: &str, default: i64) -> Result<u32> {
    let raw = match cfg.get(key) {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .map_err(|_| PlotError::config(format!("{key} is not an integer: '{v}'")))?,
        None => default,
    };
    if !(0..=i64::from(i32::MAX)).contains(&raw) {
        return Err(PlotError::config(format!(
            "{key} must be between 0 and {} (got {raw})",
            i32::MAX
        )));
    }
    Ok(raw as u32)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn cfg() -> Config {
        Config::from_file(PathBuf::from("/nonexistent/.plotbridgerc"))
    }

    #[test]
    fn defaults_match_host_defaults() {
        let params = ScriptParameters::from_config(&cfg()).unwrap();
        assert_eq!(params, ScriptParameters::default());
    }

    #[test]
    fn zero_dpi_is_a_configuration_error() {
        let mut c = cfg();
        c.set("FIGURE_DPI", "0");
        let err = ScriptParameters::from_config(&c).unwrap_err();
        assert!(matches!(err, PlotError::Configuration(_)));
    }

    #[test]
    fn negative_sizes_are_rejected() {
        let mut c = cfg();
        c.set("FIGURE_WIDTH", "-1");
        assert!(matches!(
            ScriptParameters::from_config(&c),
            Err(PlotError::Configuration(_))
        ));
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("SVG".parse::<ImageFormat>().unwrap(), ImageFormat::Svg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
