//! Recursive traversal over operations and blocks.
//!
//! Walks visit operations in pre-order: an op is seen before the ops nested
//! in its regions, and blocks are visited in region order.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::ops::ArenaDialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into nested regions.
    Advance,
    /// Skip the nested regions of the current operation.
    Skip,
}

pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &block in &ctx.region(region).blocks {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &op in &ctx.block(block).ops {
        walk_op(ctx, op, f)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_op<B>(
    ctx: &IrContext,
    op: OpRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(op) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for &region in &ctx.op(op).regions {
        walk_region(ctx, region, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk only the ops that view as `T`; other ops are descended into.
pub fn walk_typed<T, B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(T) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()>
where
    T: ArenaDialectOp,
{
    walk_region(ctx, region, &mut |op| match T::from_op(ctx, op) {
        Ok(typed) => f(typed),
        Err(_) => ControlFlow::Continue(WalkAction::Advance),
    })
}

/// Every op nested in `region`, in pre-order.
pub fn collect_ops(ctx: &IrContext, region: RegionRef) -> Vec<OpRef> {
    let mut ops = Vec::new();
    let _ = walk_region::<()>(ctx, region, &mut |op| {
        ops.push(op);
        ControlFlow::Continue(WalkAction::Advance)
    });
    ops
}

/// Every block nested in `region` (including `region`'s own), in pre-order.
pub fn collect_blocks(ctx: &IrContext, region: RegionRef) -> Vec<BlockRef> {
    let mut blocks = Vec::new();
    let mut stack = vec![region];
    while let Some(r) = stack.pop() {
        for &block in &ctx.region(r).blocks {
            blocks.push(block);
        }
        // Nested regions are pushed in reverse so they pop in source order.
        let nested: Vec<RegionRef> = ctx
            .region(r)
            .blocks
            .iter()
            .flat_map(|&b| ctx.block(b).ops.iter())
            .flat_map(|&op| ctx.op(op).regions.iter().copied())
            .collect();
        stack.extend(nested.into_iter().rev());
    }
    blocks
}
