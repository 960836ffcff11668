//! `func` dialect: functions, calls and returns.
//!
//! A function's signature lives in its `type` attribute as
//! `core.func(ret, params...)`; the entry block's arguments carry the
//! parameter types.

use smallvec::smallvec;

use crate::context::{BlockArgData, BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::ops::{check_result_count, dialect_op, required_attr};
use crate::refs::{BlockRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location};

crate::symbols! {
    DIALECT_NAME => "func",
    FUNC => "func",
    CALL => "call",
    RETURN => "return",
    ATTR_SYM_NAME => "sym_name",
    ATTR_TYPE => "type",
    ATTR_CALLEE => "callee",
}

dialect_op! {
    /// `func.func @name {type = core.func(...)} { ^bb0(...): ... }`
    pub struct Func = "func"."func";
    validate(ctx, op) {
        required_attr(ctx, op, "sym_name", Attribute::as_symbol)?;
        required_attr(ctx, op, "type", Attribute::as_type)?;
        if ctx.op(op).regions.len() != 1 {
            return Err(crate::ConversionError::MissingRegion("body"));
        }
    }
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> Symbol {
        match ctx.op(self.0).attributes.get(&ATTR_SYM_NAME()) {
            Some(Attribute::Symbol(s)) => *s,
            _ => panic!("func.func: `sym_name` is checked by from_op"),
        }
    }

    pub fn r#type(&self, ctx: &IrContext) -> TypeRef {
        match ctx.op(self.0).attributes.get(&ATTR_TYPE()) {
            Some(Attribute::Type(ty)) => *ty,
            _ => panic!("func.func: `type` is checked by from_op"),
        }
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn entry_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }
}

/// Build `func.func @name` with an entry block whose arguments are `params`.
///
/// Returns the function and its entry block, ready for `push_op`.
pub fn func(
    ctx: &mut IrContext,
    loc: Location,
    name: Symbol,
    params: &[TypeRef],
    ret: TypeRef,
) -> (Func, BlockRef) {
    let fn_ty = crate::dialect::core::func(ctx, params.iter().copied(), ret);
    let entry = ctx.create_block(BlockData {
        location: loc,
        args: params.iter().copied().map(BlockArgData::of_type).collect(),
        ops: smallvec![],
        parent_region: None,
    });
    let body = ctx.create_region(RegionData {
        location: loc,
        blocks: smallvec![entry],
        parent_op: None,
    });
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), FUNC())
        .attr(ATTR_SYM_NAME(), Attribute::Symbol(name))
        .attr(ATTR_TYPE(), Attribute::Type(fn_ty))
        .region(body)
        .build(ctx);
    (Func(ctx.create_op(data)), entry)
}

dialect_op! {
    /// `%r = func.call %args... {callee = @f} : T`
    pub struct Call = "func"."call";
    validate(ctx, op) {
        required_attr(ctx, op, "callee", Attribute::as_symbol)?;
    }
}

impl Call {
    pub fn callee(&self, ctx: &IrContext) -> Symbol {
        match ctx.op(self.0).attributes.get(&ATTR_CALLEE()) {
            Some(Attribute::Symbol(s)) => *s,
            _ => panic!("func.call: `callee` is checked by from_op"),
        }
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn results<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_results(self.0)
    }
}

pub fn call(
    ctx: &mut IrContext,
    loc: Location,
    callee: Symbol,
    args: impl IntoIterator<Item = ValueRef>,
    result_ty: TypeRef,
) -> Call {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), CALL())
        .operands(args)
        .result(result_ty)
        .attr(ATTR_CALLEE(), Attribute::Symbol(callee))
        .build(ctx);
    Call(ctx.create_op(data))
}

dialect_op! {
    /// `func.return %v...`
    pub struct Return = "func"."return";
    validate(ctx, op) {
        check_result_count(ctx, op, 0)?;
    }
}

impl Return {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

pub fn r#return(
    ctx: &mut IrContext,
    loc: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Return {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), RETURN())
        .operands(values)
        .build(ctx);
    Return(ctx.create_op(data))
}
