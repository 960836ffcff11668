//! Conversion target: which operations are legal after a conversion.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef};
use crate::symbol::Symbol;
use crate::walk::{self, WalkAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalityCheck {
    Legal,
    Illegal,
}

/// Return `Some(..)` to decide, `None` to defer to the next rule.
type DynamicCheckFn = dyn Fn(&IrContext, OpRef) -> Option<LegalityCheck>;
type UnknownOpFn = dyn Fn(&IrContext, OpRef) -> bool;

/// Defines which ops and dialects are legal, illegal, or dynamically checked.
pub struct ArenaConversionTarget {
    legal_dialects: HashSet<Symbol>,
    illegal_dialects: HashSet<Symbol>,
    /// Specific operations marked as legal: (dialect, op_name).
    legal_ops: HashSet<(Symbol, Symbol)>,
    illegal_ops: HashSet<(Symbol, Symbol)>,
    dynamic_checks: Vec<Box<DynamicCheckFn>>,
    unknown_op: Option<Box<UnknownOpFn>>,
}

impl ArenaConversionTarget {
    /// An empty target: everything is legal.
    pub fn new() -> Self {
        Self {
            legal_dialects: HashSet::new(),
            illegal_dialects: HashSet::new(),
            legal_ops: HashSet::new(),
            illegal_ops: HashSet::new(),
            dynamic_checks: Vec::new(),
            unknown_op: None,
        }
    }

    pub fn add_legal_dialect(&mut self, dialect: &str) {
        self.legal_dialects.insert(Symbol::from_dynamic(dialect));
    }

    pub fn add_illegal_dialect(&mut self, dialect: &str) {
        self.illegal_dialects.insert(Symbol::from_dynamic(dialect));
    }

    pub fn add_legal_op(&mut self, dialect: &str, op_name: &str) {
        self.legal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op_name)));
    }

    pub fn add_illegal_op(&mut self, dialect: &str, op_name: &str) {
        self.illegal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op_name)));
    }

    pub fn add_dynamic_check(
        &mut self,
        f: impl Fn(&IrContext, OpRef) -> Option<LegalityCheck> + 'static,
    ) {
        self.dynamic_checks.push(Box::new(f));
    }

    /// Decide legality of ops no static rule mentions. Without this such
    /// ops are legal.
    pub fn mark_unknown_op_dynamically_legal(
        &mut self,
        f: impl Fn(&IrContext, OpRef) -> bool + 'static,
    ) {
        self.unknown_op = Some(Box::new(f));
    }

    /// Resolution order:
    /// 1. Dynamic checks (first non-`None` wins)
    /// 2. Specific op rules
    /// 3. Dialect rules
    /// 4. The unknown-op callback, if any
    /// 5. Legal
    pub fn is_legal(&self, ctx: &IrContext, op: OpRef) -> LegalityCheck {
        for check in &self.dynamic_checks {
            if let Some(result) = check(ctx, op) {
                return result;
            }
        }

        if let Some(result) = self.static_rule(ctx, op) {
            return result;
        }

        match &self.unknown_op {
            Some(f) if !f(ctx, op) => LegalityCheck::Illegal,
            _ => LegalityCheck::Legal,
        }
    }

    /// Whether a static op or dialect rule names `op` illegal.
    ///
    /// Ops that are only illegal through the unknown-op callback are not
    /// explicitly illegal; the applicator may retype them in place.
    pub fn is_explicitly_illegal(&self, ctx: &IrContext, op: OpRef) -> bool {
        self.static_rule(ctx, op) == Some(LegalityCheck::Illegal)
    }

    fn static_rule(&self, ctx: &IrContext, op: OpRef) -> Option<LegalityCheck> {
        let data = ctx.op(op);
        let key = (data.dialect, data.name);

        if self.legal_ops.contains(&key) {
            return Some(LegalityCheck::Legal);
        }
        if self.illegal_ops.contains(&key) {
            return Some(LegalityCheck::Illegal);
        }
        if self.legal_dialects.contains(&data.dialect) {
            return Some(LegalityCheck::Legal);
        }
        if self.illegal_dialects.contains(&data.dialect) {
            return Some(LegalityCheck::Illegal);
        }
        None
    }

    /// Every illegal op nested in `body`, in pre-order.
    pub fn verify(&self, ctx: &IrContext, body: RegionRef) -> Vec<IllegalOp> {
        let mut illegal = Vec::new();
        let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
            if self.is_legal(ctx, op) == LegalityCheck::Illegal {
                let data = ctx.op(op);
                illegal.push(IllegalOp {
                    op,
                    dialect: data.dialect,
                    name: data.name,
                });
            }
            ControlFlow::Continue(WalkAction::Advance)
        });
        illegal
    }
}

impl Default for ArenaConversionTarget {
    fn default() -> Self {
        Self::new()
    }
}

/// An illegal operation found during verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalOp {
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
}

impl fmt::Display for IllegalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.dialect, self.name, self.op)
    }
}
