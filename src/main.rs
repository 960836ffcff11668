//! `trunk-opt` entry point.

mod cli;

use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;
use trunk_opt::{PipelineError, PipelineOptions, PipelineOutput, lower_file, lower_source};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = PipelineOptions { verify: cli.verify };
    let result = match &cli.file {
        Some(path) => lower_file(path, options),
        None => read_stdin().and_then(|source| lower_source(&source, options)),
    };

    match result {
        Ok(PipelineOutput { text, stats }) => {
            if cli.stats {
                eprintln!("rewrites: {}, retyped: {}", stats.rewrites, stats.retyped);
            }
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_stdin() -> Result<String, PipelineError> {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source)?;
    Ok(source)
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
