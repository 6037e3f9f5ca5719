//! vcov: instruments an elaborated Verilog design with coverage code.
//!
//! `vcov instrument` reads a design description, elaborates it and writes a
//! copy of every design file with coverage signals spliced in. `vcov check`
//! runs elaboration only and prints the resulting instance tree.

#![warn(missing_docs)]

mod check;
mod instrument;
mod pipeline;

use std::io::IsTerminal;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Coverage instrumentation for Verilog designs.
#[derive(Parser, Debug)]
#[command(name = "vcov", version, about = "Verilog coverage instrumentation")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `vcov.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Elaborate the design and write instrumented copies of its files.
    Instrument(InstrumentArgs),
    /// Elaborate the design and print its instance tree.
    Check(CheckArgs),
}

/// Arguments for `vcov instrument`.
#[derive(Parser, Debug)]
pub struct InstrumentArgs {
    /// Design description produced by the front end (JSON).
    #[arg(short, long)]
    pub design: String,

    /// Top-level module. Inferred when exactly one module is never
    /// instantiated.
    #[arg(short, long)]
    pub top: Option<String>,

    /// Output directory, overriding `output.dir`.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for `vcov check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Design description produced by the front end (JSON).
    #[arg(short, long)]
    pub design: String,

    /// Top-level module.
    #[arg(short, long)]
    pub top: Option<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a configuration file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    let global = GlobalArgs {
        quiet: cli.quiet,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Instrument(ref args) => instrument::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence over the
/// verbosity flags.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
