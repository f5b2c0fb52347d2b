//! Out-of-process interpreter invocation.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub mod python;

pub use python::PythonInterpreter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a composed script file to completion.
///
/// Dropping the returned future must stop the underlying process.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn run(&self, script: &Path) -> Result<InterpreterOutput>;
}
