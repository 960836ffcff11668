//! Lower tuples to nominal structs.
//!
//! Every `core.tuple` type becomes an `adt.struct` named `_tupletoStruct`
//! whose fields are `elemet_0, elemet_1, ...` in element order, and the tuple
//! ops are replaced by their struct counterparts:
//!
//! - `adt.tuple_new` → `adt.struct_new` (same operands)
//! - `adt.tuple_get {index = i}` → `adt.struct_extract {field = @elemet_i}`
//!
//! Any other op that mentions a tuple type (block arguments, `func.func`
//! signatures, `func.call` results, ...) is retyped in place.
//!
//! ## Example
//!
//! Before:
//! ```text
//! %2 = adt.tuple_new %0, %1 : core.tuple(core.i32, core.f64)
//! %3 = adt.tuple_get %2 {index = 1} : core.f64
//! ```
//!
//! After:
//! ```text
//! %2 = adt.struct_new %0, %1 : adt.struct() {fields = [[@elemet_0, core.i32], [@elemet_1, core.f64]], name = @_tupletoStruct}
//! %3 = adt.struct_extract %2 {field = @elemet_1} : core.f64
//! ```
//!
//! The pass fails if a tuple op can't be rewritten, for example a
//! `tuple_get` whose index is past the end of its tuple. The module is left
//! partially converted in that case.

mod patterns;
mod type_converter;


use tracing::{debug, error};
use trunk_ir::rewrite::{ArenaConversionTarget, ArenaModule, PatternApplicator};
use trunk_ir::validation::validate_use_chains;
use trunk_ir::IrContext;

use crate::errors::{PassError, PassResult, RemainingOp};

pub use patterns::{
    DECLINE_ARITY_MISMATCH, DECLINE_INDEX_OUT_OF_BOUNDS, DECLINE_INPUT_NOT_STRUCT,
    DECLINE_NOT_A_STRUCT, LowerTupleGetPattern, LowerTupleNewPattern,
};
pub use type_converter::{
    FIELD_PREFIX, STRUCT_NAME, field_name, tuple_to_struct_type, tuple_type_converter,
};

pub const PASS_NAME: &str = "tuple-to-struct";

#[derive(Clone, Copy, Debug, Default)]
pub struct TupleToStructOptions {
    /// Check use-chains after a successful conversion.
    pub verify_use_chains: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TupleToStructStats {
    /// Tuple ops replaced by struct ops.
    pub rewrites: usize,
    /// Ops and block arguments retyped in place.
    pub retyped: usize,
}

pub fn run(ctx: &mut IrContext, module: ArenaModule) -> PassResult<TupleToStructStats> {
    run_with_options(ctx, module, TupleToStructOptions::default())
}

#[tracing::instrument(skip_all)]
pub fn run_with_options(
    ctx: &mut IrContext,
    module: ArenaModule,
    options: TupleToStructOptions,
) -> PassResult<TupleToStructStats> {
    if module.body(ctx).is_none() {
        return Err(PassError::invalid_module("core.module has no body region"));
    }

    let applicator = PatternApplicator::new(tuple_type_converter())
        .add_pattern(LowerTupleNewPattern)
        .add_pattern(LowerTupleGetPattern);
    let target = conversion_target();

    let result = applicator.apply_partial(ctx, module, &target);
    debug!(
        rewrites = result.rewrites,
        retyped = result.retyped,
        reached_fixpoint = result.reached_fixpoint,
        "{PASS_NAME} finished"
    );

    if let Err(illegal) = result.verify(ctx, module, &target) {
        let remaining: Vec<RemainingOp> = illegal
            .into_iter()
            .map(|op| RemainingOp {
                op: op.op,
                name: format!("{}.{}", op.dialect, op.name),
                reason: result.decline_for(op.op).map(|d| d.reason),
            })
            .collect();
        for op in &remaining {
            error!(
                op = %op.op,
                op_name = %op.name,
                reason = op.reason.unwrap_or("no pattern applied"),
                "illegal operation remains after {PASS_NAME}"
            );
        }
        return Err(PassError::conversion_incomplete(PASS_NAME, remaining));
    }

    if options.verify_use_chains {
        let validation = validate_use_chains(ctx, module);
        if !validation.is_ok() {
            return Err(PassError::invalid_module(validation));
        }
    }

    Ok(TupleToStructStats {
        rewrites: result.rewrites,
        retyped: result.retyped,
    })
}

/// `adt.tuple_new` and `adt.tuple_get` must go; everything else is legal
/// once no tuple type is left on it.
fn conversion_target() -> ArenaConversionTarget {
    let mut target = ArenaConversionTarget::new();
    target.add_illegal_op("adt", "tuple_new");
    target.add_illegal_op("adt", "tuple_get");

    let legality = tuple_type_converter();
    target.mark_unknown_op_dynamically_legal(move |ctx, op| legality.is_legal_op(ctx, op));
    target
}
