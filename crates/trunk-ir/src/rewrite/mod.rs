//! Rewrite infrastructure.
//!
//! Patterns record mutations on a [`PatternRewriter`]; the
//! [`PatternApplicator`] applies them in place (insert, RAUW, remove) and
//! drives a worklist until no illegal op can make progress.

pub mod applicator;
pub mod conversion_target;
pub mod pattern;
pub mod rewriter;
pub mod type_converter;

pub use applicator::{ApplyResult, Decline, PatternApplicator};
pub use conversion_target::{ArenaConversionTarget, IllegalOp, LegalityCheck};
pub use pattern::{ArenaRewritePattern, MatchResult};
pub use rewriter::PatternRewriter;
pub use type_converter::ArenaTypeConverter;

use crate::context::IrContext;
use crate::dialect::core;
use crate::refs::{BlockRef, OpRef, RegionRef};
use crate::symbol::Symbol;
use crate::types::Attribute;

/// Thin wrapper around an `OpRef` pointing to a `core.module` operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaModule(pub OpRef);

impl ArenaModule {
    /// Wrap `op`, or `None` if it is not a `core.module`.
    pub fn new(ctx: &IrContext, op: OpRef) -> Option<Self> {
        let data = ctx.op(op);
        (data.dialect == core::DIALECT_NAME() && data.name == core::MODULE())
            .then_some(ArenaModule(op))
    }

    pub fn op(self) -> OpRef {
        self.0
    }

    pub fn body(self, ctx: &IrContext) -> Option<RegionRef> {
        ctx.op(self.0).regions.first().copied()
    }

    /// Top-level operations in the body's first block.
    pub fn ops(self, ctx: &IrContext) -> Vec<OpRef> {
        match self.first_block(ctx) {
            Some(block) => ctx.block(block).ops.to_vec(),
            None => vec![],
        }
    }

    pub fn name(self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op(self.0)
            .attributes
            .get(&core::ATTR_SYM_NAME())
            .and_then(Attribute::as_symbol)
    }

    pub fn first_block(self, ctx: &IrContext) -> Option<BlockRef> {
        let region = self.body(ctx)?;
        ctx.region(region).blocks.first().copied()
    }
}
