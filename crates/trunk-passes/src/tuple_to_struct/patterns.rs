//! Rewrite patterns for tuple construction and extraction.

use trunk_ir::dialect::{adt, core};
use trunk_ir::rewrite::{ArenaRewritePattern, MatchResult, PatternRewriter};
use trunk_ir::{ArenaDialectOp, IrContext, OpRef, ValueRef};

pub const DECLINE_NOT_A_STRUCT: &str = "type conversion failed to struct";
pub const DECLINE_INPUT_NOT_STRUCT: &str = "expected struct type as input";
pub const DECLINE_INDEX_OUT_OF_BOUNDS: &str = "index out of bounds";
pub const DECLINE_ARITY_MISMATCH: &str = "operand count does not match tuple arity";

/// `adt.tuple_new %e... : core.tuple(..)` → `adt.struct_new %e... : adt.struct(..)`.
///
/// Operands are passed through unchanged, so field order is operand order.
/// Declines when the operand count differs from the tuple's arity.
pub struct LowerTupleNewPattern;

impl ArenaRewritePattern for LowerTupleNewPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Ok(tuple_new) = adt::TupleNew::from_op(ctx, op) else {
            return MatchResult::NoMatch;
        };
        let tuple_ty = tuple_new.result_ty(ctx);
        if !core::is_tuple(ctx, tuple_ty) {
            return MatchResult::NoMatch;
        }

        let Some(struct_ty) = rewriter
            .type_converter()
            .convert_type(ctx, tuple_ty)
            .filter(|&ty| adt::is_struct_type(ctx, ty))
        else {
            return MatchResult::Declined(DECLINE_NOT_A_STRUCT);
        };
        let elements: Vec<ValueRef> = tuple_new.elements(ctx).to_vec();
        if adt::struct_fields(ctx, struct_ty).map(|f| f.len()) != Some(elements.len()) {
            return MatchResult::Declined(DECLINE_ARITY_MISMATCH);
        }

        let location = ctx.op(op).location;
        let struct_new = adt::struct_new(ctx, location, elements, struct_ty);
        rewriter.replace_op(struct_new.op_ref());
        MatchResult::Applied
    }

    fn name(&self) -> &'static str {
        "LowerTupleNewPattern"
    }
}

/// `adt.tuple_get %t {index = i}` → `adt.struct_extract %t {field = @elemet_i}`.
///
/// Waits until `%t` has been given a struct type, either by rewriting its
/// producer or by retyping the block argument or op that defines it.
pub struct LowerTupleGetPattern;

impl ArenaRewritePattern for LowerTupleGetPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Ok(tuple_get) = adt::TupleGet::from_op(ctx, op) else {
            return MatchResult::NoMatch;
        };

        let input = tuple_get.tuple(ctx);
        let Some(fields) = adt::struct_fields(ctx, ctx.value_ty(input)) else {
            return MatchResult::Declined(DECLINE_INPUT_NOT_STRUCT);
        };
        let position = usize::try_from(tuple_get.index(ctx)).ok();
        let Some(&(field, field_ty)) = position.and_then(|i| fields.get(i)) else {
            return MatchResult::Declined(DECLINE_INDEX_OUT_OF_BOUNDS);
        };

        let location = ctx.op(op).location;
        let extract = adt::struct_extract(ctx, location, input, field_ty, field);
        rewriter.replace_op(extract.op_ref());
        MatchResult::Applied
    }

    fn name(&self) -> &'static str {
        "LowerTupleGetPattern"
    }
}
