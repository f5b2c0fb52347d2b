use std::{
    collections::HashMap,
    env, fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

mod params;

pub use params::{ImageFormat, ScriptParameters};

pub const DEFAULT_WIDTH: i64 = 1000;
pub const DEFAULT_HEIGHT: i64 = 700;
pub const DEFAULT_DPI: i64 = 75;

/// Host settings: `.plotbridgerc` overlaid by the environment.
#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let config_path = default_config_path();
        let mut cfg = Self::from_file(config_path);

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                cfg.inner.insert(k, v);
            }
        }
        cfg
    }

    /// Defaults plus whatever `path` contains. The environment is not consulted.
    pub fn from_file(path: PathBuf) -> Self {
        let mut map = default_map();
        if path.exists() {
            if let Ok(file) = fs::File::open(&path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }
        Self { inner: map, config_path: path }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    }

    pub fn python_executable(&self) -> String {
        self.get("PYTHON_EXECUTABLE").unwrap_or_else(|| "python".to_string())
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.get_path("TEMP_DIR").unwrap_or_else(env::temp_dir)
    }

    pub fn workspace_dir(&self) -> Option<PathBuf> {
        self.get_path("WORKSPACE_DIR")
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "FIGURE_WIDTH",
        "FIGURE_HEIGHT",
        "FIGURE_DPI",
        "FIGURE_OUTPUT_TYPE",
        "FIGURE_OUTPUT_FILE",
        "OVERWRITE_OK",
        "WRITE_OUTPUT_FILE",
        "PYTHON_EXECUTABLE",
        "WORKSPACE_DIR",
        "TEMP_DIR",
    ];

    KEYS.contains(&k) || k.starts_with("PLOTBRIDGE_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("plotbridge").join(".plotbridgerc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Numbers
    m.insert("FIGURE_WIDTH".into(), DEFAULT_WIDTH.to_string());
    m.insert("FIGURE_HEIGHT".into(), DEFAULT_HEIGHT.to_string());
    m.insert("FIGURE_DPI".into(), DEFAULT_DPI.to_string());

    // Strings
    m.insert("FIGURE_OUTPUT_TYPE".into(), "png".into());
    m.insert("FIGURE_OUTPUT_FILE".into(), String::new());
    m.insert("PYTHON_EXECUTABLE".into(), "python".into());

    // Bools as strings
    m.insert("OVERWRITE_OK".into(), "false".into());
    m.insert("WRITE_OUTPUT_FILE".into(), "true".into());

    m
}
