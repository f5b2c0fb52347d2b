mod cli;

use std::{
    fs,
    io::{self, Read},
    path::Path,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command, FigureArgs, RunArgs};
use plotbridge::{
    process::PythonInterpreter,
    script::DEFAULT_PLOT_CODE,
    ArtifactLoader, CancelSignal, Config, InputTable, OutputFileWriter, PlotExecutor, PlotRequest,
    ScriptComposer, ScriptParameters, TempArtifactManager, VariableMap,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "plotbridge=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Cli::parse();
    let mut cfg = Config::load();

    match args.command {
        Command::Run(run) => {
            apply_figure_args(&mut cfg, &run.figure);
            run_plot(&cfg, run).await
        }
        Command::Load { internals, port_out } => {
            let mut loader = ArtifactLoader::new(internals);
            loader.validate()?;
            let (width, height, png) = {
                let image = loader.get_image()?;
                (image.width(), image.height(), image.to_png_bytes()?)
            };
            println!(
                "{} {}x{} from {}",
                "loaded".green(),
                width,
                height,
                loader.image_path().display()
            );
            if let Some(path) = port_out {
                write_port(&path, &png)?;
            }
            Ok(())
        }
        Command::Replay { script, internals, out, figure } => {
            apply_figure_args(&mut cfg, &figure);
            let params = ScriptParameters::from_config(&cfg)?;
            let user_code = read_user_code(script.as_deref())?;
            ArtifactLoader::new(&internals).validate()?;
            let text = ScriptComposer::new(&params, &[]).compose_replay(&internals, &user_code)?;
            fs::write(&out, text).with_context(|| format!("writing replay script: {}", out.display()))?;
            println!("Wrote replay script to {}", out.display());
            Ok(())
        }
        Command::Config { figure } => {
            apply_figure_args(&mut cfg, &figure);
            let params = ScriptParameters::from_config(&cfg)?;
            println!("{}", serde_json::to_string_pretty(&params)?);
            Ok(())
        }
    }
}

async fn run_plot(cfg: &Config, args: RunArgs) -> Result<()> {
    let params = ScriptParameters::from_config(cfg)?;
    let user_code = read_user_code(args.script.as_deref())?;
    let inputs = args
        .inputs
        .iter()
        .map(|s| parse_pair(s, "--input").map(|(name, path)| InputTable::new(name, path)))
        .collect::<Result<Vec<_>>>()?;
    let vars: VariableMap = args
        .vars
        .iter()
        .map(|s| parse_pair(s, "--var"))
        .collect::<Result<_>>()?;

    let mut interpreter =
        PythonInterpreter::new(args.python.clone().unwrap_or_else(|| cfg.python_executable()));
    if let Some(secs) = args.timeout {
        interpreter = interpreter.with_timeout(Duration::from_secs(secs));
    }
    let executor = PlotExecutor::new(
        TempArtifactManager::new(cfg.temp_dir()),
        interpreter,
        OutputFileWriter::current(cfg.workspace_dir()),
    );

    let (cancel_tx, cancel) = CancelSignal::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let mut loader = ArtifactLoader::new(&args.internals);
    let request = PlotRequest { params, inputs, user_code };
    let outcome = executor
        .execute(&request, &mut loader, &vars, &cancel)
        .await
        .context("plot execution failed")?;

    if !outcome.interpreter.stdout.is_empty() {
        print!("{}", outcome.interpreter.stdout);
    }
    println!(
        "{} {}x{} into {}",
        "persisted".green(),
        outcome.image.width(),
        outcome.image.height(),
        args.internals.display()
    );
    if let Some(path) = &outcome.output_file {
        println!("{} {}", "exported".cyan(), path.display());
    }
    if let Some(path) = &args.port_out {
        write_port(path, &outcome.png)?;
    }
    Ok(())
}

fn apply_figure_args(cfg: &mut Config, figure: &FigureArgs) {
    if let Some(v) = figure.width {
        cfg.set("FIGURE_WIDTH", v.to_string());
    }
    if let Some(v) = figure.height {
        cfg.set("FIGURE_HEIGHT", v.to_string());
    }
    if let Some(v) = figure.dpi {
        cfg.set("FIGURE_DPI", v.to_string());
    }
    if let Some(v) = &figure.format {
        cfg.set("FIGURE_OUTPUT_TYPE", v.clone());
    }
    if let Some(v) = &figure.output {
        cfg.set("FIGURE_OUTPUT_FILE", v.clone());
    }
    if figure.overwrite {
        cfg.set("OVERWRITE_OK", "true");
    }
    if figure.no_write {
        cfg.set("WRITE_OUTPUT_FILE", "false");
    }
    if let Some(ws) = &figure.workspace {
        cfg.set("WORKSPACE_DIR", ws.to_string_lossy().into_owned());
    }
}

/// Script file, piped stdin, or the default demo plot on an interactive terminal.
fn read_user_code(script: Option<&Path>) -> Result<String> {
    if let Some(path) = script {
        return fs::read_to_string(path)
            .with_context(|| format!("reading script: {}", path.display()));
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(DEFAULT_PLOT_CODE.to_string());
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        bail!("no plot code provided on stdin");
    }
    Ok(buf)
}

fn parse_pair(raw: &str, flag: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow!("{flag} expects NAME=VALUE, got '{raw}'"))
}

fn write_port(path: &Path, png: &[u8]) -> Result<()> {
    fs::write(path, png).with_context(|| format!("writing port image: {}", path.display()))?;
    println!("Wrote {} bytes to {}", png.len(), path.display());
    Ok(())
}
