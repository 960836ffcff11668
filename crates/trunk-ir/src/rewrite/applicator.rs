//! Worklist-driven pattern application.
//!
//! [`PatternApplicator::apply_partial`] first retypes block arguments, then
//! seeds a worklist with every op of the module in pre-order. Each popped
//! illegal op is offered to the patterns in order; after a rewrite the new
//! ops, the users of their results and the producers of their operands are
//! re-enqueued. An illegal op no pattern rewrites is retyped in place unless
//! the target names it explicitly illegal.
//!
//! Ops created by a rewrite are expected to be legal, so the number of
//! rewrites is bounded by the op count at seed time. Hitting the bound ends
//! the run with `reached_fixpoint == false`.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace, warn};

use super::ArenaModule;
use super::conversion_target::{ArenaConversionTarget, IllegalOp, LegalityCheck};
use super::pattern::{ArenaRewritePattern, MatchResult};
use super::rewriter::{self, PatternRewriter};
use super::type_converter::ArenaTypeConverter;
use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef, ValueDef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;
use crate::walk;

/// The last reason a pattern gave for not rewriting an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decline {
    pub pattern: &'static str,
    pub reason: &'static str,
}

#[derive(Debug, Default)]
pub struct ApplyResult {
    /// Number of pattern rewrites applied.
    pub rewrites: usize,
    /// Number of ops and block arguments retyped in place.
    pub retyped: usize,
    /// Whether the worklist drained before the rewrite budget ran out.
    pub reached_fixpoint: bool,
    /// Ops still in the IR whose last pattern attempt was declined.
    pub declines: HashMap<OpRef, Decline>,
}

impl ApplyResult {
    /// Check that no illegal operations remain.
    pub fn verify(
        &self,
        ctx: &IrContext,
        module: ArenaModule,
        target: &ArenaConversionTarget,
    ) -> Result<(), Vec<IllegalOp>> {
        let Some(body) = module.body(ctx) else {
            return Ok(());
        };
        let illegal = target.verify(ctx, body);
        if illegal.is_empty() {
            Ok(())
        } else {
            Err(illegal)
        }
    }

    pub fn decline_for(&self, op: OpRef) -> Option<&Decline> {
        self.declines.get(&op)
    }
}

/// FIFO of ops with membership tracking, so an op is queued at most once.
struct Worklist {
    queue: VecDeque<OpRef>,
    queued: HashSet<OpRef>,
}

impl Worklist {
    fn new(seed: Vec<OpRef>) -> Self {
        let queued = seed.iter().copied().collect();
        Self {
            queue: seed.into(),
            queued,
        }
    }

    fn push(&mut self, op: OpRef) {
        if self.queued.insert(op) {
            self.queue.push_back(op);
        }
    }

    fn pop(&mut self) -> Option<OpRef> {
        let op = self.queue.pop_front()?;
        self.queued.remove(&op);
        Some(op)
    }

    fn push_users(&mut self, ctx: &IrContext, values: &[ValueRef]) {
        for &v in values {
            for u in ctx.uses(v) {
                self.push(u.user);
            }
        }
    }

    fn push_producers(&mut self, ctx: &IrContext, op: OpRef) {
        for &v in ctx.op_operands(op) {
            if let ValueDef::OpResult(producer, _) = ctx.value_def(v) {
                self.push(producer);
            }
        }
    }
}

/// Applies rewrite patterns to a module until no illegal op makes progress.
pub struct PatternApplicator {
    patterns: Vec<Box<dyn ArenaRewritePattern>>,
    max_rewrites: Option<usize>,
    type_converter: ArenaTypeConverter,
}

impl PatternApplicator {
    pub fn new(type_converter: ArenaTypeConverter) -> Self {
        Self {
            patterns: Vec::new(),
            max_rewrites: None,
            type_converter,
        }
    }

    /// Add a rewrite pattern. Patterns are tried in insertion order.
    pub fn add_pattern(mut self, pattern: impl ArenaRewritePattern + 'static) -> Self {
        self.patterns.push(Box::new(pattern));
        self
    }

    /// Override the rewrite budget (default: op count at seed time).
    pub fn with_max_rewrites(mut self, n: usize) -> Self {
        self.max_rewrites = Some(n);
        self
    }

    pub fn type_converter(&self) -> &ArenaTypeConverter {
        &self.type_converter
    }

    /// Apply patterns and verify the result.
    pub fn apply(
        &self,
        ctx: &mut IrContext,
        module: ArenaModule,
        target: &ArenaConversionTarget,
    ) -> Result<ApplyResult, Vec<IllegalOp>> {
        let result = self.apply_partial(ctx, module, target);
        result.verify(ctx, module, target)?;
        Ok(result)
    }

    /// Apply patterns without verification.
    pub fn apply_partial(
        &self,
        ctx: &mut IrContext,
        module: ArenaModule,
        target: &ArenaConversionTarget,
    ) -> ApplyResult {
        let mut result = ApplyResult {
            reached_fixpoint: true,
            ..Default::default()
        };
        let Some(body) = module.body(ctx) else {
            return result;
        };

        result.retyped += self.retype_block_args(ctx, body);

        let seed = walk::collect_ops(ctx, body);
        let budget = self.max_rewrites.unwrap_or(seed.len());
        let mut worklist = Worklist::new(seed);

        while let Some(op) = worklist.pop() {
            // Erased or replaced by an earlier rewrite.
            if ctx.op(op).parent_block.is_none() {
                continue;
            }
            if target.is_legal(ctx, op) == LegalityCheck::Legal {
                continue;
            }
            trace!(op = %op, op_name = %ctx.op_full_name(op), "visiting illegal op");

            if result.rewrites >= budget {
                warn!(
                    budget,
                    pending = worklist.queue.len() + 1,
                    "rewrite budget exhausted; stopping conversion"
                );
                result.reached_fixpoint = false;
                break;
            }

            if self.try_patterns(ctx, op, &mut worklist, &mut result) {
                continue;
            }

            if !target.is_explicitly_illegal(ctx, op) && self.retype_op(ctx, op) {
                result.retyped += 1;
                worklist.push_users(ctx, ctx.op_results(op));
            }
        }

        result
            .declines
            .retain(|&op, _| ctx.op(op).parent_block.is_some());
        result
    }

    /// Offer `op` to each pattern; returns whether one applied.
    fn try_patterns(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        worklist: &mut Worklist,
        result: &mut ApplyResult,
    ) -> bool {
        for pattern in &self.patterns {
            let mut rw = PatternRewriter::new(&self.type_converter);
            match pattern.match_and_rewrite(ctx, op, &mut rw) {
                MatchResult::Applied => {
                    if !rw.has_mutations() {
                        debug!(
                            pattern = pattern.name(),
                            op = %op,
                            "pattern applied without mutations"
                        );
                        continue;
                    }
                    let op_name = ctx.op_full_name(op);
                    let mutations = rw.take_mutations();
                    rewriter::apply_mutations(ctx, op, &mutations);
                    result.rewrites += 1;
                    result.declines.remove(&op);
                    debug!(pattern = pattern.name(), op = %op, %op_name, "rewrote op");

                    for new_op in mutations.new_ops() {
                        worklist.push(new_op);
                        worklist.push_users(ctx, ctx.op_results(new_op));
                        worklist.push_producers(ctx, new_op);
                    }
                    return true;
                }
                MatchResult::Declined(reason) => {
                    debug!(pattern = pattern.name(), op = %op, reason, "pattern declined");
                    result.declines.insert(
                        op,
                        Decline {
                            pattern: pattern.name(),
                            reason,
                        },
                    );
                }
                MatchResult::NoMatch => {}
            }
        }
        false
    }

    /// Convert result types and type attributes of `op`. Returns whether
    /// anything changed.
    fn retype_op(&self, ctx: &mut IrContext, op: OpRef) -> bool {
        let mut changed = false;

        let result_types = ctx.op_result_types(op).to_vec();
        for (index, ty) in result_types.into_iter().enumerate() {
            match self.type_converter.convert_type(ctx, ty) {
                Some(new_ty) if new_ty != ty => {
                    ctx.set_op_result_type(op, index as u32, new_ty);
                    changed = true;
                }
                Some(_) => {}
                None => debug!(op = %op, index, "result type could not be converted"),
            }
        }

        let attrs: Vec<(Symbol, Attribute)> = ctx
            .op(op)
            .attributes
            .iter()
            .filter(|(_, a)| a.contains_type())
            .map(|(k, a)| (*k, a.clone()))
            .collect();
        for (key, attr) in attrs {
            match self.type_converter.convert_attribute(ctx, &attr) {
                Some(new_attr) if new_attr != attr => {
                    ctx.set_op_attr(op, key, new_attr);
                    changed = true;
                }
                Some(_) => {}
                None => debug!(op = %op, attr = %key, "type attribute could not be converted"),
            }
        }

        if changed {
            trace!(op = %op, op_name = %ctx.op_full_name(op), "retyped op in place");
        }
        changed
    }

    fn retype_block_args(&self, ctx: &mut IrContext, body: RegionRef) -> usize {
        let mut retyped = 0;
        for block in walk::collect_blocks(ctx, body) {
            let arg_types: Vec<_> = ctx
                .block_args(block)
                .iter()
                .map(|&v| ctx.value_ty(v))
                .collect();
            for (index, ty) in arg_types.into_iter().enumerate() {
                match self.type_converter.convert_type(ctx, ty) {
                    Some(new_ty) if new_ty != ty => {
                        ctx.set_block_arg_type(block, index as u32, new_ty);
                        retyped += 1;
                    }
                    Some(_) => {}
                    None => debug!(%block, index, "block argument type could not be converted"),
                }
            }
        }
        retyped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationDataBuilder;
    use crate::dialect::core;
    use crate::parser::parse_test_module;
    use crate::printer::print_module;
    use insta::assert_snapshot;

    /// `test.source` becomes `test.target`.
    struct RenamePattern;

    impl ArenaRewritePattern for RenamePattern {
        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            rewriter: &mut PatternRewriter,
        ) -> MatchResult {
            let data = ctx.op(op);
            if data.dialect != "test" || data.name != "source" {
                return MatchResult::NoMatch;
            }
            let loc = data.location;
            let operands = ctx.op_operands(op).to_vec();
            let result_types = ctx.op_result_types(op).to_vec();
            let new_data =
                OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("target"))
                    .operands(operands)
                    .results(result_types)
                    .build(ctx);
            let new_op = ctx.create_op(new_data);
            rewriter.replace_op(new_op);
            MatchResult::Applied
        }
    }

    /// Declines every `test.stuck` op.
    struct StuckPattern;

    impl ArenaRewritePattern for StuckPattern {
        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            _rewriter: &mut PatternRewriter,
        ) -> MatchResult {
            if ctx.op(op).name == "stuck" {
                MatchResult::Declined("always stuck")
            } else {
                MatchResult::NoMatch
            }
        }

        fn name(&self) -> &'static str {
            "stuck"
        }
    }

    /// `core.i32` becomes `core.i64`.
    fn widening() -> ArenaTypeConverter {
        let mut converter = ArenaTypeConverter::new();
        converter.add_conversion(
            |ctx, ty| ctx.types.is_dialect(ty, "core", "i32"),
            |ctx, _| Some(core::i64(ctx)),
        );
        converter
    }

    fn test_target() -> ArenaConversionTarget {
        let mut target = ArenaConversionTarget::new();
        target.add_legal_dialect("test");
        target.add_illegal_op("test", "source");
        target.add_illegal_op("test", "stuck");
        target
    }

    #[test]
    fn renames_op_and_preserves_uses() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            r#"core.module @m {
  %0 = test.source : core.i32
  test.use %0
}"#,
        );
        let applicator =
            PatternApplicator::new(ArenaTypeConverter::new()).add_pattern(RenamePattern);
        let result = applicator
            .apply(&mut ctx, module, &test_target())
            .expect("no illegal ops remain");
        assert!(result.reached_fixpoint);
        assert_eq!(result.rewrites, 1);
        assert_snapshot!(print_module(&ctx, module.op()), @r"
        core.module @m {
          %0 = test.target : core.i32
          test.use %0
        }
        ");
    }

    #[test]
    fn declines_are_reported_and_verification_fails() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            r#"core.module @m {
  %0 = test.stuck : core.i32
}"#,
        );
        let stuck = module.ops(&ctx)[0];
        let applicator = PatternApplicator::new(ArenaTypeConverter::new())
            .add_pattern(RenamePattern)
            .add_pattern(StuckPattern);

        let result = applicator.apply_partial(&mut ctx, module, &test_target());
        assert_eq!(result.rewrites, 0);
        assert_eq!(
            result.decline_for(stuck),
            Some(&Decline {
                pattern: "stuck",
                reason: "always stuck",
            })
        );

        let illegal = applicator
            .apply(&mut ctx, module, &test_target())
            .expect_err("stuck op remains");
        assert_eq!(illegal.len(), 1);
        assert_eq!(illegal[0].op, stuck);
    }

    #[test]
    fn budget_stops_the_run() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            r#"core.module @m {
  %0 = test.source : core.i32
  %1 = test.source : core.i32
}"#,
        );
        let applicator = PatternApplicator::new(ArenaTypeConverter::new())
            .add_pattern(RenamePattern)
            .with_max_rewrites(1);
        let result = applicator.apply_partial(&mut ctx, module, &test_target());
        assert_eq!(result.rewrites, 1);
        assert!(!result.reached_fixpoint);
    }

    #[test]
    fn ops_illegal_by_type_are_retyped_in_place() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            r#"core.module @m {
  func.func @f {type = core.func(core.i32, core.i32)} {
    ^bb0(%0: core.i32):
      %1 = func.call %0 {callee = @f} : core.i32
      func.return %1
  }
}"#,
        );
        let applicator = PatternApplicator::new(widening());
        let legality = widening();
        let mut target = ArenaConversionTarget::new();
        target.mark_unknown_op_dynamically_legal(move |ctx, op| legality.is_legal_op(ctx, op));

        let result = applicator
            .apply(&mut ctx, module, &target)
            .expect("everything retyped");
        assert_eq!(result.rewrites, 0);
        // Block argument, func type attribute and call result.
        assert_eq!(result.retyped, 3);
        assert_snapshot!(print_module(&ctx, module.op()), @r"
        core.module @m {
          func.func @f {type = core.func(core.i64, core.i64)} {
            ^bb0(%0: core.i64):
              %1 = func.call %0 {callee = @f} : core.i64
              func.return %1
          }
        }
        ");
    }
}
