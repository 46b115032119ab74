//! Application entry point.
//!
//! Parses command-line arguments, merges configuration layers, and delegates
//! execution to [`runner::run`].

use std::process::ExitCode;
use testsession::{cli, runner};
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let (parsed, matches) = match cli::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };
    let merged = cli::merge_with_config(&parsed, &matches);
    let verbose = merged.as_ref().map_or(parsed.verbose, |config| config.verbose);
    let max_level = if verbose { Level::DEBUG } else { Level::ERROR };
    fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();

    let config = match merged {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "configuration failed");
            return ExitCode::FAILURE;
        }
    };
    match runner::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let chain = format!("{err:#}");
            tracing::error!(error = %chain, "runner failed");
            ExitCode::FAILURE
        }
    }
}
