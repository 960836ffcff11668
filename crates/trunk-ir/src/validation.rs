//! Structural validation of a module.
//!
//! Two checks are provided:
//!
//! 1. **Scope**: every operand refers to a value that is visible at the
//!    point of use. Within a block, results become visible after their
//!    defining op; values of enclosing regions are visible in nested ones.
//! 2. **Use-chains**: the use lists kept by [`IrContext`] agree exactly with
//!    the operands of the ops reachable from the module.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use derive_more::Display;

use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef, ValueDef, ValueRef};
use crate::rewrite::ArenaModule;
use crate::walk::{self, WalkAction};

#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("operand #{operand_index} of {consumer} ({op}) refers to {value}, which is not in scope")]
pub struct ScopeError {
    pub op: OpRef,
    pub consumer: String,
    pub operand_index: usize,
    pub value: String,
}

#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{message}")]
pub struct UseChainError {
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub scope_errors: Vec<ScopeError>,
    pub use_chain_errors: Vec<UseChainError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.scope_errors.is_empty() && self.use_chain_errors.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("validation passed");
        }
        if !self.scope_errors.is_empty() {
            writeln!(f, "{} scope error(s):", self.scope_errors.len())?;
            for err in &self.scope_errors {
                writeln!(f, "  - {err}")?;
            }
        }
        if !self.use_chain_errors.is_empty() {
            writeln!(f, "{} use-chain error(s):", self.use_chain_errors.len())?;
            for err in &self.use_chain_errors {
                writeln!(f, "  - {err}")?;
            }
        }
        Ok(())
    }
}

fn describe_value(ctx: &IrContext, v: ValueRef) -> String {
    match ctx.value_def(v) {
        ValueDef::OpResult(op, idx) => {
            let attached = if ctx.op(op).parent_block.is_some() {
                ""
            } else {
                ", detached"
            };
            format!("result #{idx} of {} ({op}{attached})", ctx.op_full_name(op))
        }
        ValueDef::BlockArg(block, idx) => format!("block arg #{idx} of {block}"),
    }
}

// ============================================================================
// Scope
// ============================================================================

pub fn validate_scopes(ctx: &IrContext, module: ArenaModule) -> ValidationResult {
    let mut errors = Vec::new();
    if let Some(body) = module.body(ctx) {
        check_region(ctx, body, &HashSet::new(), &mut errors);
    }
    ValidationResult {
        scope_errors: errors,
        ..Default::default()
    }
}

fn check_region(
    ctx: &IrContext,
    region: RegionRef,
    outer: &HashSet<ValueRef>,
    errors: &mut Vec<ScopeError>,
) {
    let blocks = &ctx.region(region).blocks;
    for &block in blocks {
        // No dominance analysis across blocks: sibling blocks see each
        // other's values, ordering is only enforced inside a block.
        let mut visible = outer.clone();
        for &other in blocks {
            visible.extend(ctx.block_args(other).iter().copied());
            if other != block {
                for &op in &ctx.block(other).ops {
                    visible.extend(ctx.op_results(op).iter().copied());
                }
            }
        }

        for &op in &ctx.block(block).ops {
            for (i, &operand) in ctx.op_operands(op).iter().enumerate() {
                if !visible.contains(&operand) {
                    errors.push(ScopeError {
                        op,
                        consumer: ctx.op_full_name(op),
                        operand_index: i,
                        value: describe_value(ctx, operand),
                    });
                }
            }
            for &nested in &ctx.op(op).regions {
                check_region(ctx, nested, &visible, errors);
            }
            visible.extend(ctx.op_results(op).iter().copied());
        }
    }
}

// ============================================================================
// Use-chains
// ============================================================================

/// Check both directions: each operand has its use entry, and each use
/// entry of a value defined in the module points at a live operand.
pub fn validate_use_chains(ctx: &IrContext, module: ArenaModule) -> ValidationResult {
    let mut errors = Vec::new();
    let Some(body) = module.body(ctx) else {
        return ValidationResult::default();
    };

    let mut actual: HashSet<(ValueRef, OpRef, u32)> = HashSet::new();
    let mut defined: Vec<ValueRef> = Vec::new();
    for block in walk::collect_blocks(ctx, body) {
        defined.extend(ctx.block_args(block).iter().copied());
    }
    let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
        for (idx, &operand) in ctx.op_operands(op).iter().enumerate() {
            actual.insert((operand, op, idx as u32));
        }
        defined.extend(ctx.op_results(op).iter().copied());
        ControlFlow::Continue(WalkAction::Advance)
    });

    for &(val, op, idx) in &actual {
        let recorded = ctx
            .uses(val)
            .iter()
            .any(|u| u.user == op && u.operand_index == idx);
        if !recorded {
            errors.push(UseChainError {
                message: format!(
                    "operand #{idx} of {} ({op}) uses {val} but {val} has no such use recorded",
                    ctx.op_full_name(op)
                ),
            });
        }
    }

    for &val in &defined {
        for u in ctx.uses(val) {
            if !actual.contains(&(val, u.user, u.operand_index)) {
                errors.push(UseChainError {
                    message: format!(
                        "{val} ({}) records a use by operand #{} of {}, which is not in the module",
                        describe_value(ctx, val),
                        u.operand_index,
                        u.user
                    ),
                });
            }
        }
    }

    ValidationResult {
        use_chain_errors: errors,
        ..Default::default()
    }
}

pub fn validate_all(ctx: &IrContext, module: ArenaModule) -> ValidationResult {
    let scopes = validate_scopes(ctx, module);
    let uses = validate_use_chains(ctx, module);
    ValidationResult {
        scope_errors: scopes.scope_errors,
        use_chain_errors: uses.use_chain_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{adt, arith, core};
    use crate::parser::parse_test_module;

    #[test]
    fn parsed_module_is_valid() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            r#"core.module @m {
                 func.func @f {type = core.func(core.i32, core.tuple(core.i32))} {
                   ^bb0(%p: core.tuple(core.i32)):
                     %x = adt.tuple_get %p {index = 0} : core.i32
                     func.return %x
                 }
               }"#,
        );
        let result = validate_all(&ctx, module);
        assert!(result.is_ok(), "{result}");
        assert_eq!(result.to_string(), "validation passed");
    }

    #[test]
    fn use_before_definition_is_a_scope_error() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            "core.module @m {\n  %0 = arith.const {value = 1} : core.i32\n}",
        );
        let block = module.first_block(&ctx).expect("module block");
        let c = module.ops(&ctx)[0];
        let i32_ty = core::i32(&mut ctx);
        let pair = core::tuple(&mut ctx, [i32_ty]);

        // The tuple is placed before the constant it consumes.
        let cv = ctx.op_result(c, 0);
        let loc = ctx.op(c).location;
        let t = adt::tuple_new(&mut ctx, loc, [cv], pair);
        ctx.insert_op_before(block, c, t.op_ref());

        let result = validate_scopes(&ctx, module);
        assert_eq!(result.scope_errors.len(), 1);
        assert_eq!(result.scope_errors[0].op, t.op_ref());
        assert!(result.scope_errors[0].to_string().contains("arith.const"));
    }

    #[test]
    fn detached_user_is_a_use_chain_error() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            "core.module @m {\n  %0 = arith.const {value = 1} : core.i32\n}",
        );
        let block = module.first_block(&ctx).expect("module block");
        let c = module.ops(&ctx)[0];
        let cv = ctx.op_result(c, 0);
        let i32_ty = core::i32(&mut ctx);
        let loc = ctx.op(c).location;

        // Detached but never removed: its use of %0 is stale.
        let add = arith::add(&mut ctx, loc, cv, cv, i32_ty);
        let result = validate_use_chains(&ctx, module);
        assert_eq!(result.use_chain_errors.len(), 2, "{result}");

        ctx.push_op(block, add.op_ref());
        assert!(validate_use_chains(&ctx, module).is_ok());

        ctx.remove_op_from_block(block, add.op_ref());
        ctx.remove_op(add.op_ref());
        assert!(validate_all(&ctx, module).is_ok());
    }
}
