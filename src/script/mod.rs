//! Composition of the Python script handed to the interpreter.
//!
//! Section order is fixed: backend preamble, data binding, user code, figure
//! export epilogue.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{
    config::ScriptParameters,
    error::{PlotError, Result},
    internals::SHELVE_FILE,
    temp::{TempArtifactSet, SHELVE_BACKEND_SUFFIX},
};

mod support;

pub const BACKEND_PREAMBLE: &str = "import matplotlib\nmatplotlib.use('Agg')\nimport matplotlib.pyplot as plt";

pub const DEFAULT_PLOT_CODE: &str = "\
# the following import is not required, as the node takes care of it
#import matplotlib.pyplot as plt

X = range(10)
plt.plot(X, [x*x for x in X])
plt.show()";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Globals the composed script relies on; binding an input over them breaks the script.
pub const RESERVED_NAMES: &[&str] =
    &["matplotlib", "plt", "shelve", "pd", "read_csv", "_ndbm", "_shelf", "_key"];

/// Backend whose files carry the `.db` suffix the persister copies.
const SHELVE_BACKEND: &str = "\
try:
    import dbm.ndbm as _ndbm
except ImportError:
    raise RuntimeError(\"plot data exchange needs the dbm.ndbm backend\")
";

/// A host table serialised as CSV, bound into the workspace under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTable {
    pub name: String,
    pub csv_path: PathBuf,
}

impl InputTable {
    pub fn new(name: impl Into<String>, csv_path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), csv_path: csv_path.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShelveMode {
    /// Store the inputs, then read them back into the workspace.
    Write,
    /// Only read an existing shelve.
    Read,
}

pub struct ScriptComposer<'a> {
    params: &'a ScriptParameters,
    inputs: &'a [InputTable],
}

impl<'a> ScriptComposer<'a> {
    pub fn new(params: &'a ScriptParameters, inputs: &'a [InputTable]) -> Self {
        Self { params, inputs }
    }

    /// Script for an execution attempt; saves the figure to the attempt's image path.
    pub fn compose(&self, temp: &TempArtifactSet, user_code: &str) -> Result<String> {
        let (width_in, height_in) = self.params.size_inches()?;
        let bind = self.data_bind(temp.shelve_path(), ShelveMode::Write)?;

        let epilogue = format!(
            "F = plt.gcf()\n\nF.set_dpi({dpi})\nF.set_size_inches({width_in},{height_in})\n\n\
             plt.savefig({image}, format=\"png\")\nplt.close()",
            dpi = self.params.dpi,
            image = py_str(temp.image_path()),
        );

        Ok(assemble(&bind, user_code, &epilogue))
    }

    /// Script that recreates the figure from a persisted shelve without re-sending data.
    pub fn compose_replay(&self, internal_dir: &Path, user_code: &str) -> Result<String> {
        let (width_in, height_in) = self.params.size_inches()?;
        let logical = logical_shelve_path(&internal_dir.join(SHELVE_FILE));
        let bind = self.data_bind(&logical, ShelveMode::Read)?;

        let epilogue = format!(
            "F = plt.gcf()\n\nF.set_dpi({dpi})\nF.set_size_inches({width_in},{height_in})\n\nplt.show()",
            dpi = self.params.dpi,
        );

        Ok(assemble(&bind, user_code, &epilogue))
    }

    fn data_bind(&self, shelve: &Path, mode: ShelveMode) -> Result<String> {
        let mut out = String::from("import shelve\n");
        out.push_str(SHELVE_BACKEND);
        let shelve = py_str(shelve);

        if mode == ShelveMode::Write {
            for input in self.inputs {
                check_input_name(&input.name)?;
            }
            if !self.inputs.is_empty() {
                out.push_str(support::READ_CSV);
                out.push('\n');
            }
            out.push_str(&format!("_shelf = shelve.Shelf(_ndbm.open({shelve}, \"n\"))\n"));
            for input in self.inputs {
                out.push_str(&format!(
                    "_shelf[{}] = read_csv({})\n",
                    py_str(&input.name),
                    py_str(&input.csv_path)
                ));
            }
            out.push_str("_shelf.close()\n");
        }

        out.push_str(&format!("_shelf = shelve.Shelf(_ndbm.open({shelve}, \"r\"))\n"));
        out.push_str("for _key in list(_shelf.keys()):\n    globals()[_key] = _shelf[_key]\n");
        out.push_str("_shelf.close()\ndel _shelf");
        Ok(out)
    }
}

fn check_input_name(name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        return Err(PlotError::config(format!("input name '{name}' is not a valid Python identifier")));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(PlotError::config(format!("input name '{name}' is reserved by the plot script")));
    }
    Ok(())
}

/// Append `script` to `path`, keeping whatever the file already holds.
pub fn append_script(path: &Path, script: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PlotError::temp_file(format!("failed to open script file {}", path.display()), e))?;
    file.write_all(script.as_bytes())
        .map_err(|e| PlotError::temp_file(format!("failed to write script file {}", path.display()), e))?;
    debug!(path = %path.display(), bytes = script.len(), "wrote script");
    Ok(())
}

fn assemble(bind: &str, user_code: &str, epilogue: &str) -> String {
    let mut script = String::with_capacity(
        BACKEND_PREAMBLE.len() + bind.len() + user_code.len() + epilogue.len() + 8,
    );
    script.push_str(BACKEND_PREAMBLE);
    script.push('\n');
    script.push_str(bind);
    script.push('\n');
    script.push_str(user_code);
    script.push_str("\n\n");
    script.push_str(epilogue);
    script.push('\n');
    script
}

/// `dbm.ndbm` appends the backend suffix itself, so strip it from durable paths.
fn logical_shelve_path(actual: &Path) -> PathBuf {
    let s = actual.to_string_lossy();
    match s.strip_suffix(SHELVE_BACKEND_SUFFIX) {
        Some(stem) => PathBuf::from(stem),
        None => actual.to_path_buf(),
    }
}

/// Python string literal for a path or name. JSON escaping is valid Python.
fn py_str(value: impl AsRef<std::ffi::OsStr>) -> String {
    let lossy = value.as_ref().to_string_lossy();
    serde_json::to_string(lossy.as_ref()).unwrap_or_else(|_| format!("{lossy:?}"))
}
