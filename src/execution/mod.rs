//! One plot execution attempt, end to end.
//!
//! allocate → compose → run interpreter → cancellation checkpoint → persist →
//! decode → export. Whatever happens, the attempt's temp files are released
//! exactly once before `execute` returns.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::ScriptParameters,
    error::{PlotError, Result},
    internals::{ArtifactLoader, ArtifactPersister},
    output::{OutputFileWriter, VariableSubstitutor},
    process::{Interpreter, InterpreterOutput},
    render::RenderedImage,
    script::{append_script, InputTable, ScriptComposer},
    temp::{TempArtifactManager, TempArtifactSet},
};

/// Cancellation signal supplied by the host.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the sender is gone.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub params: ScriptParameters,
    pub inputs: Vec<InputTable>,
    pub user_code: String,
}

#[derive(Debug, Clone)]
pub struct PlotOutcome {
    /// PNG stream for downstream consumers.
    pub png: Vec<u8>,
    pub image: RenderedImage,
    pub output_file: Option<PathBuf>,
    pub interpreter: InterpreterOutput,
}

/// Per-attempt state: the typed parameters and the temp artifacts they were composed against.
#[derive(Debug)]
pub struct PlotAttempt {
    params: ScriptParameters,
    temp: TempArtifactSet,
}

impl PlotAttempt {
    /// Allocate temp artifacts and write the composed script.
    pub fn prepare(
        manager: &TempArtifactManager,
        params: ScriptParameters,
        inputs: &[InputTable],
        user_code: &str,
    ) -> Result<Self> {
        params.validate()?;
        let temp = manager.allocate(params.image_format)?;
        let script = ScriptComposer::new(&params, inputs).compose(&temp, user_code)?;
        append_script(temp.script_path(), &script)?;
        Ok(Self { params, temp })
    }

    pub fn params(&self) -> &ScriptParameters {
        &self.params
    }

    pub fn temp(&self) -> &TempArtifactSet {
        &self.temp
    }

    pub fn script_path(&self) -> &Path {
        self.temp.script_path()
    }

    pub fn release(&mut self) -> Result<()> {
        self.temp.release()
    }
}

pub struct PlotExecutor<I> {
    temp: TempArtifactManager,
    interpreter: I,
    writer: OutputFileWriter,
}

impl<I: Interpreter> PlotExecutor<I> {
    pub fn new(temp: TempArtifactManager, interpreter: I, writer: OutputFileWriter) -> Self {
        Self { temp, interpreter, writer }
    }

    pub async fn execute(
        &self,
        request: &PlotRequest,
        loader: &mut ArtifactLoader,
        substitutor: &dyn VariableSubstitutor,
        cancel: &CancelSignal,
    ) -> Result<PlotOutcome> {
        let mut attempt = PlotAttempt::prepare(
            &self.temp,
            request.params.clone(),
            &request.inputs,
            &request.user_code,
        )?;
        debug!(token = attempt.temp().token(), "prepared plot attempt");

        let result = self.run(&attempt, loader, substitutor, cancel.clone()).await;
        let cleanup = attempt.release();

        match (result, cleanup) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup_err)) => {
                warn!(error = %cleanup_err, "temp cleanup failed after attempt error");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        attempt: &PlotAttempt,
        loader: &mut ArtifactLoader,
        substitutor: &dyn VariableSubstitutor,
        mut cancel: CancelSignal,
    ) -> Result<PlotOutcome> {
        let output = tokio::select! {
            res = self.interpreter.run(attempt.script_path()) => res?,
            _ = cancel.cancelled() => return Err(PlotError::Cancelled),
        };
        if !output.stdout.is_empty() {
            debug!(stdout = %output.stdout.trim_end(), "interpreter output");
        }

        if cancel.is_cancelled() {
            return Err(PlotError::Cancelled);
        }

        ArtifactPersister::new(loader.internal_dir()).persist(attempt.temp())?;

        let image = RenderedImage::decode_file(attempt.temp().image_path())?;
        let png = image.to_png_bytes()?;
        loader.install(image.clone());

        let output_file = self.writer.write(attempt.params(), &image, substitutor)?;
        info!(
            width = image.width(),
            height = image.height(),
            exported = output_file.is_some(),
            "plot attempt finished"
        );

        Ok(PlotOutcome { png, image, output_file, interpreter: output })
    }
}
