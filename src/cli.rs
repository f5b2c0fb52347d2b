use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "plotbridge", about = "Render plots with an external Python interpreter", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Execute a plot script and persist its artifacts.
    Run(RunArgs),
    /// Validate persisted internals and decode the stored image.
    Load {
        /// Node internal storage directory.
        #[arg(long)]
        internals: PathBuf,
        /// Write the stored image as a PNG stream to this file.
        #[arg(long = "port-out")]
        port_out: Option<PathBuf>,
    },
    /// Write a script that recreates the figure from persisted internals.
    Replay {
        /// Plot script; read from stdin when omitted.
        #[arg(value_name = "SCRIPT")]
        script: Option<PathBuf>,
        #[arg(long)]
        internals: PathBuf,
        /// Destination of the replay script.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        figure: FigureArgs,
    },
    /// Print the effective figure settings as JSON.
    Config {
        #[command(flatten)]
        figure: FigureArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Plot script; read from stdin when omitted.
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Node internal storage directory.
    #[arg(long)]
    pub internals: PathBuf,

    /// Input table bound into the workspace, as NAME=CSV_PATH.
    /// Can be used multiple times.
    #[arg(long = "input", action = clap::ArgAction::Append)]
    pub inputs: Vec<String>,

    /// Variable for ${name} expansion in the output path, as NAME=VALUE.
    #[arg(long = "var", action = clap::ArgAction::Append)]
    pub vars: Vec<String>,

    /// Write the PNG stream exposed to downstream consumers to this file.
    #[arg(long = "port-out")]
    pub port_out: Option<PathBuf>,

    /// Interpreter executable (overrides PYTHON_EXECUTABLE).
    #[arg(long)]
    pub python: Option<String>,

    /// Kill the interpreter after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub figure: FigureArgs,
}

/// Figure settings; each flag overrides the configured value.
#[derive(Args, Debug, Clone, Default)]
pub struct FigureArgs {
    /// Figure width in pixels.
    #[arg(long)]
    pub width: Option<i64>,

    /// Figure height in pixels.
    #[arg(long)]
    pub height: Option<i64>,

    /// Figure resolution.
    #[arg(long)]
    pub dpi: Option<i64>,

    /// Declared output format (png, jpeg, svg, pdf, tif).
    #[arg(long)]
    pub format: Option<String>,

    /// Output file template. Supports $$DATE$$, $$USER$$, $$WS$$ and ${name}.
    #[arg(long)]
    pub output: Option<String>,

    /// Overwrite an existing output file.
    #[arg(long)]
    pub overwrite: bool,

    /// Do not write the output file.
    #[arg(long = "no-write")]
    pub no_write: bool,

    /// Workspace root used for $$WS$$.
    #[arg(long)]
    pub workspace: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
