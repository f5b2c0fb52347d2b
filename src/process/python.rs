//! Python interpreter process.

use std::{path::Path, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::debug;

use super::{Interpreter, InterpreterOutput};
use crate::error::{PlotError, Result};

#[derive(Debug, Clone)]
pub struct PythonInterpreter {
    program: String,
    timeout: Option<Duration>,
}

impl PythonInterpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), timeout: None }
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

#[async_trait]
impl Interpreter for PythonInterpreter {
    async fn run(&self, script: &Path) -> Result<InterpreterOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-u") // unbuffered
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, script = %script.display(), "starting interpreter");
        let child = cmd.spawn().map_err(|e| {
            PlotError::Interpreter(format!("failed to start '{}': {e}", self.program))
        })?;

        let out = match self.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| PlotError::Interpreter(format!("timed out after {limit:?}")))?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| PlotError::Interpreter(format!("failed to wait for '{}': {e}", self.program)))?;

        let output = InterpreterOutput {
            exit_code: out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        };

        if !out.status.success() {
            return Err(PlotError::Interpreter(format!(
                "exit code {}\n{}",
                output.exit_code,
                output.stderr.trim_end()
            )));
        }
        Ok(output)
    }
}
