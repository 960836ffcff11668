//! `core` dialect: the module op and builtin types.

use smallvec::smallvec;

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::ops::{dialect_op, required_attr};
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location, TypeDataBuilder};

crate::symbols! {
    DIALECT_NAME => "core",
    MODULE => "module",
    TUPLE => "tuple",
    FUNC => "func",
    ATTR_SYM_NAME => "sym_name",
}

dialect_op! {
    /// `core.module @name { ... }`: the unit of compilation.
    pub struct Module = "core"."module";
    validate(ctx, op) {
        required_attr(ctx, op, "sym_name", Attribute::as_symbol)?;
        if ctx.op(op).regions.len() != 1 {
            return Err(crate::ConversionError::MissingRegion("body"));
        }
    }
}

impl Module {
    pub fn sym_name(&self, ctx: &IrContext) -> Symbol {
        ctx.op(self.0)
            .attributes
            .get(&ATTR_SYM_NAME())
            .and_then(Attribute::as_symbol)
            .unwrap_or_else(|| Symbol::new(""))
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

/// Build an empty `core.module @name` with a single argument-less block.
pub fn module(ctx: &mut IrContext, loc: Location, name: Symbol) -> (Module, BlockRef) {
    let block = ctx.create_block(BlockData {
        location: loc,
        args: vec![],
        ops: smallvec![],
        parent_region: None,
    });
    let region = ctx.create_region(RegionData {
        location: loc,
        blocks: smallvec![block],
        parent_op: None,
    });
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), MODULE())
        .attr(ATTR_SYM_NAME(), Attribute::Symbol(name))
        .region(region)
        .build(ctx);
    (Module(ctx.create_op(data)), block)
}

// ============================================================================
// Types
// ============================================================================

fn simple(ctx: &mut IrContext, name: &'static str) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), Symbol::new(name)).build())
}

pub fn i1(ctx: &mut IrContext) -> TypeRef {
    simple(ctx, "i1")
}

pub fn i32(ctx: &mut IrContext) -> TypeRef {
    simple(ctx, "i32")
}

pub fn i64(ctx: &mut IrContext) -> TypeRef {
    simple(ctx, "i64")
}

pub fn f64(ctx: &mut IrContext) -> TypeRef {
    simple(ctx, "f64")
}

pub fn nil(ctx: &mut IrContext) -> TypeRef {
    simple(ctx, "nil")
}

/// `core.tuple(T0, ..., Tn-1)`. Interning makes tuples with the same
/// element sequence the same type.
pub fn tuple(ctx: &mut IrContext, elements: impl IntoIterator<Item = TypeRef>) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), TUPLE()).params(elements).build())
}

pub fn is_tuple(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, "core", "tuple")
}

/// Element types of a tuple, or `None` for any other type.
pub fn tuple_elements(ctx: &IrContext, ty: TypeRef) -> Option<&[TypeRef]> {
    let data = ctx.types.get(ty);
    data.is("core", "tuple").then_some(data.params.as_slice())
}

/// `core.func(ret, params...)`.
pub fn func(
    ctx: &mut IrContext,
    params: impl IntoIterator<Item = TypeRef>,
    ret: TypeRef,
) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), FUNC())
            .param(ret)
            .params(params)
            .build(),
    )
}

/// The module op `op` if it is a `core.module`.
pub fn as_module(ctx: &IrContext, op: OpRef) -> Option<Module> {
    use crate::ops::ArenaDialectOp;
    Module::from_op(ctx, op).ok()
}
