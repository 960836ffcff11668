//! `arith` dialect (subset).

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{check_operand_count, check_result_count, dialect_op};
use crate::refs::{TypeRef, ValueRef};
use crate::types::{Attribute, Location};

crate::symbols! {
    DIALECT_NAME => "arith",
    CONST => "const",
    ADD => "add",
    ATTR_VALUE => "value",
}

dialect_op! {
    /// `%c = arith.const {value = ...} : T`
    pub struct Const = "arith"."const";
    validate(ctx, op) {
        check_result_count(ctx, op, 1)?;
        crate::ops::required_attr(ctx, op, "value", |a| Some(a.clone()))?;
    }
}

impl Const {
    pub fn value(&self, ctx: &IrContext) -> Attribute {
        ctx.op(self.0)
            .attributes
            .get(&ATTR_VALUE())
            .cloned()
            .unwrap_or(Attribute::Unit)
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

pub fn r#const(ctx: &mut IrContext, loc: Location, ty: TypeRef, value: Attribute) -> Const {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), CONST())
        .result(ty)
        .attr(ATTR_VALUE(), value)
        .build(ctx);
    Const(ctx.create_op(data))
}

dialect_op! {
    /// `%r = arith.add %lhs, %rhs : T`
    pub struct Add = "arith"."add";
    validate(ctx, op) {
        check_operand_count(ctx, op, 2)?;
        check_result_count(ctx, op, 1)?;
    }
}

impl Add {
    pub fn lhs(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn rhs(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

pub fn add(ctx: &mut IrContext, loc: Location, lhs: ValueRef, rhs: ValueRef, ty: TypeRef) -> Add {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), ADD())
        .operands([lhs, rhs])
        .result(ty)
        .build(ctx);
    Add(ctx.create_op(data))
}
