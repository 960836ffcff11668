//! Common utilities for CLI tests.

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

/// Write `source` to a temporary `.ir` file and run `trunk-opt` on it.
pub fn run_trunk_opt(source: &str, args: &[&str]) -> Output {
    let mut input = NamedTempFile::with_suffix(".ir").expect("Failed to create temp file");
    input
        .write_all(source.as_bytes())
        .expect("Failed to write IR");

    Command::new(env!("CARGO_BIN_EXE_trunk-opt"))
        .args(args)
        .arg(input.path())
        .output()
        .expect("Failed to execute trunk-opt")
}
