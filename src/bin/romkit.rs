use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use romkit::{Config, Engine, Platform};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Extract descriptive metadata from game ROMs, disc images and packages.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Files to inspect
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Platform to assume instead of guessing from the extension
    /// (required for .cue, .iso and .bin)
    #[arg(short, long)]
    platform: Option<Platform>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log decoder progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print compact instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let engine = Engine::new(&config);
    let report = engine.run_batch(&args.paths, args.platform);

    let json = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    };
    let written = json
        .map_err(io::Error::from)
        .and_then(|text| writeln!(io::stdout().lock(), "{text}"));
    if let Err(e) = written {
        error!(error = %e, "cannot write report");
        return ExitCode::FAILURE;
    }

    if report.failed > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
