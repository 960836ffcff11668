//! Command-line interface for `trunk-opt`.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "trunk-opt")]
#[command(about = "Lower tuple types and ops in a TrunkIR module to structs", long_about = None)]
pub struct Cli {
    /// Input file; reads stdin when omitted
    pub file: Option<PathBuf>,

    /// Validate scopes and use-chains after lowering
    #[arg(long)]
    pub verify: bool,

    /// Print rewrite counts to stderr
    #[arg(long)]
    pub stats: bool,

    /// Raise log verbosity (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
