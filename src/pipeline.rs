//! Text in, text out: parse a module, lower its tuples, print it.
//!
//! ```text
//! source text
//!     │ parse_module
//!     ▼
//! core.module (tuples)
//!     │ tuple_to_struct
//!     ▼
//! core.module (structs) ─► [--verify] scope and use-chain validation
//!     │ print_module
//!     ▼
//! output text
//! ```

use std::fs;
use std::path::Path;

use derive_more::{Display, From};
use tracing::info;
use trunk_ir::parser::{ParseError, parse_module};
use trunk_ir::printer::print_module;
use trunk_ir::validation::validate_scopes;
use trunk_ir::{ArenaModule, IrContext};
use trunk_passes::PassError;
use trunk_passes::tuple_to_struct::{self, TupleToStructOptions, TupleToStructStats};

#[derive(Debug, Display, From)]
pub enum PipelineError {
    #[display("{_0}")]
    Parse(ParseError),

    #[display("{_0}")]
    Pass(PassError),

    #[display("I/O error: {_0}")]
    Io(std::io::Error),
}

impl std::error::Error for PipelineError {}

#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineOptions {
    /// Validate scopes and use-chains after lowering.
    pub verify: bool,
}

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub text: String,
    pub stats: TupleToStructStats,
}

pub fn lower_source(
    source: &str,
    options: PipelineOptions,
) -> Result<PipelineOutput, PipelineError> {
    let mut ctx = IrContext::new();
    let op = parse_module(&mut ctx, source)?;
    let module = ArenaModule::new(&ctx, op)
        .ok_or_else(|| PassError::invalid_module("top-level operation is not a core.module"))?;

    let pass_options = TupleToStructOptions {
        verify_use_chains: options.verify,
    };
    let stats = tuple_to_struct::run_with_options(&mut ctx, module, pass_options)?;
    info!(rewrites = stats.rewrites, retyped = stats.retyped, "lowered tuples");

    if options.verify {
        let validation = validate_scopes(&ctx, module);
        if !validation.is_ok() {
            return Err(PassError::invalid_module(validation).into());
        }
    }

    Ok(PipelineOutput {
        text: print_module(&ctx, op),
        stats,
    })
}

pub fn lower_file(path: &Path, options: PipelineOptions) -> Result<PipelineOutput, PipelineError> {
    let source = fs::read_to_string(path)?;
    lower_source(&source, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn lowers_and_prints() {
        let output = lower_source(
            r#"core.module @m {
  %a = arith.const {value = 4} : core.i32
  %t = adt.tuple_new %a : core.tuple(core.i32)
  %x = adt.tuple_get %t {index = 0} : core.i32
}"#,
            PipelineOptions { verify: true },
        )
        .expect("pipeline succeeds");
        assert_eq!(output.stats.rewrites, 2);
        assert_snapshot!(output.text, @r"
        core.module @m {
          %0 = arith.const {value = 4} : core.i32
          %1 = adt.struct_new %0 : adt.struct() {fields = [[@elemet_0, core.i32]], name = @_tupletoStruct}
          %2 = adt.struct_extract %1 {field = @elemet_0} : core.i32
        }
        ");
    }

    #[test]
    fn parse_errors_are_reported() {
        let source = "core.module @m {\n  %x = test.use %nope\n}";
        let err = lower_source(source, PipelineOptions::default()).expect_err("undefined value");
        assert!(matches!(err, PipelineError::Parse(_)));
        assert!(err.to_string().contains("undefined value '%nope'"), "{err}");
    }

    #[test]
    fn top_level_must_be_a_module() {
        let err = lower_source("arith.const {value = 1}", PipelineOptions::default())
            .expect_err("not a module");
        assert!(matches!(err, PipelineError::Pass(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = lower_file(Path::new("/nonexistent/input.ir"), PipelineOptions::default())
            .expect_err("no such file");
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
