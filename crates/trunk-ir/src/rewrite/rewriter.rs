//! Mutation recording for rewrite patterns.
//!
//! There is no operand remapping: patterns read operands straight from the
//! context, and value replacement is done with
//! [`IrContext::replace_all_uses`] when the mutations are applied.

use crate::context::IrContext;
use crate::refs::{OpRef, ValueRef};
use crate::rewrite::type_converter::ArenaTypeConverter;

/// Accumulated mutations from a pattern rewrite.
pub(crate) struct Mutations {
    /// Operations to insert before the current op's position.
    pub(crate) prefix_ops: Vec<OpRef>,
    pub(crate) replacement: Option<OpRef>,
    /// If set, the operation is erased and its results mapped to these values.
    pub(crate) erase_values: Option<Vec<ValueRef>>,
}

impl Mutations {
    /// Every op this rewrite attaches to the IR.
    pub(crate) fn new_ops(&self) -> impl Iterator<Item = OpRef> + '_ {
        self.prefix_ops.iter().copied().chain(self.replacement)
    }
}

/// Rewriter handed to patterns.
///
/// Ops passed in must already be created with `ctx.create_op()` and not yet
/// attached to a block.
pub struct PatternRewriter<'a> {
    type_converter: &'a ArenaTypeConverter,
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    erase_values: Option<Vec<ValueRef>>,
}

impl<'a> PatternRewriter<'a> {
    pub(crate) fn new(type_converter: &'a ArenaTypeConverter) -> Self {
        Self {
            type_converter,
            prefix_ops: Vec::new(),
            replacement: None,
            erase_values: None,
        }
    }

    pub fn type_converter(&self) -> &'a ArenaTypeConverter {
        self.type_converter
    }

    /// Insert an operation before the current operation. Multiple calls
    /// keep their order.
    pub fn insert_op(&mut self, op: OpRef) {
        self.prefix_ops.push(op);
    }

    /// Replace the current operation with `new_op`.
    ///
    /// Old results are RAUW'd to the new results 1:1 by index, so the
    /// result counts must agree.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "replace_op called after replace_op or erase_op"
        );
        self.replacement = Some(new_op);
    }

    /// Erase the current operation, mapping its results to `replacement_values`.
    pub fn erase_op(&mut self, replacement_values: Vec<ValueRef>) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "erase_op called after replace_op or erase_op"
        );
        self.erase_values = Some(replacement_values);
    }

    pub(crate) fn has_mutations(&self) -> bool {
        !self.prefix_ops.is_empty() || self.replacement.is_some() || self.erase_values.is_some()
    }

    pub(crate) fn take_mutations(self) -> Mutations {
        Mutations {
            prefix_ops: self.prefix_ops,
            replacement: self.replacement,
            erase_values: self.erase_values,
        }
    }
}

/// Apply recorded mutations to the context.
///
/// `original_op` must be attached to a block.
pub(crate) fn apply_mutations(ctx: &mut IrContext, original_op: OpRef, mutations: &Mutations) {
    let Some(block) = ctx.op(original_op).parent_block else {
        return;
    };

    for &prefix_op in &mutations.prefix_ops {
        ctx.insert_op_before(block, original_op, prefix_op);
    }

    let new_values: Vec<ValueRef> = if let Some(new_op) = mutations.replacement {
        ctx.insert_op_before(block, original_op, new_op);
        ctx.op_results(new_op).to_vec()
    } else if let Some(values) = &mutations.erase_values {
        values.clone()
    } else {
        return;
    };

    let old_results: Vec<ValueRef> = ctx.op_results(original_op).to_vec();
    debug_assert_eq!(
        old_results.len(),
        new_values.len(),
        "result count mismatch ({} vs {})",
        old_results.len(),
        new_values.len()
    );
    for (old_v, new_v) in old_results.into_iter().zip(new_values) {
        ctx.replace_all_uses(old_v, new_v);
    }

    ctx.remove_op_from_block(block, original_op);
    ctx.remove_op(original_op);
}
