//! Run user plot scripts in an external Python interpreter and keep the
//! artifacts they produce.
//!
//! The exchange is file based: a composed script binds host data through a
//! shelve file, the interpreter saves the figure as PNG, and the pair is
//! copied into the node's internal storage for later redisplay.

pub mod config;
pub mod error;
pub mod execution;
pub mod internals;
pub mod output;
pub mod process;
pub mod render;
pub mod script;
pub mod temp;

pub use config::{Config, ImageFormat, ScriptParameters};
pub use error::{PlotError, Result};
pub use execution::{CancelSignal, PlotAttempt, PlotExecutor, PlotOutcome, PlotRequest};
pub use internals::{ArtifactLoader, ArtifactPersister, IMAGE_FILE, SHELVE_FILE};
pub use output::{OutputFileWriter, TemplateContext, VariableMap, VariableSubstitutor};
pub use render::RenderedImage;
pub use script::{InputTable, ScriptComposer};
pub use temp::{TempArtifactManager, TempArtifactSet};
