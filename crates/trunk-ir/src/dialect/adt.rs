//! `adt` dialect: tuples and named-field structs.
//!
//! Tuples are positional and use the builtin `core.tuple` type. Structs use
//! the `adt.struct` type, which has no params and carries two attributes:
//!
//! - `name`: the struct's nominal name (`Symbol`)
//! - `fields`: `[[@field0, T0], [@field1, T1], ...]` in declaration order
//!
//! Field order is significant: two struct types with the same fields in a
//! different order are different types.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{check_operand_count, check_result_count, dialect_op, required_attr};
use crate::refs::{TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location, TypeDataBuilder};

crate::symbols! {
    DIALECT_NAME => "adt",
    STRUCT => "struct",
    TUPLE_NEW => "tuple_new",
    TUPLE_GET => "tuple_get",
    STRUCT_NEW => "struct_new",
    STRUCT_EXTRACT => "struct_extract",
    ATTR_NAME => "name",
    ATTR_FIELDS => "fields",
    ATTR_INDEX => "index",
    ATTR_FIELD => "field",
}

// ============================================================================
// Struct types
// ============================================================================

/// Intern `adt.struct() {fields = [...], name = @name}`.
pub fn struct_type(ctx: &mut IrContext, name: Symbol, fields: &[(Symbol, TypeRef)]) -> TypeRef {
    let fields_attr = Attribute::List(
        fields
            .iter()
            .map(|&(field, ty)| {
                Attribute::List(vec![Attribute::Symbol(field), Attribute::Type(ty)])
            })
            .collect(),
    );
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), STRUCT())
            .attr(ATTR_NAME(), Attribute::Symbol(name))
            .attr(ATTR_FIELDS(), fields_attr)
            .build(),
    )
}

pub fn is_struct_type(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, "adt", "struct")
}

pub fn struct_name(ctx: &IrContext, ty: TypeRef) -> Option<Symbol> {
    let data = ctx.types.get(ty);
    if !data.is("adt", "struct") {
        return None;
    }
    data.attrs.get(&ATTR_NAME()).and_then(Attribute::as_symbol)
}

/// Ordered `(name, type)` pairs of a struct type.
///
/// Returns `None` if `ty` is not an `adt.struct` or its `fields` attribute
/// is malformed.
pub fn struct_fields(ctx: &IrContext, ty: TypeRef) -> Option<Vec<(Symbol, TypeRef)>> {
    let data = ctx.types.get(ty);
    if !data.is("adt", "struct") {
        return None;
    }
    data.attrs
        .get(&ATTR_FIELDS())?
        .as_list()?
        .iter()
        .map(|entry| match entry.as_list()? {
            [Attribute::Symbol(name), Attribute::Type(field_ty)] => Some((*name, *field_ty)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Operations
// ============================================================================

dialect_op! {
    /// `%t = adt.tuple_new %e0, ..., %en : core.tuple(...)`
    pub struct TupleNew = "adt"."tuple_new";
    validate(ctx, op) {
        check_result_count(ctx, op, 1)?;
    }
}

impl TupleNew {
    pub fn elements<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}

pub fn tuple_new(
    ctx: &mut IrContext,
    loc: Location,
    elements: impl IntoIterator<Item = ValueRef>,
    result_ty: TypeRef,
) -> TupleNew {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), TUPLE_NEW())
        .operands(elements)
        .result(result_ty)
        .build(ctx);
    TupleNew(ctx.create_op(data))
}

dialect_op! {
    /// `%x = adt.tuple_get %t {index = i} : T`
    pub struct TupleGet = "adt"."tuple_get";
    validate(ctx, op) {
        check_operand_count(ctx, op, 1)?;
        check_result_count(ctx, op, 1)?;
        required_attr(ctx, op, "index", Attribute::as_int)?;
    }
}

impl TupleGet {
    pub fn tuple(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    /// Unchecked against the tuple's arity.
    pub fn index(&self, ctx: &IrContext) -> u64 {
        match ctx.op(self.0).attributes.get(&ATTR_INDEX()) {
            Some(Attribute::IntBits(v)) => *v,
            _ => panic!("adt.tuple_get: `index` is checked by from_op"),
        }
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

pub fn tuple_get(
    ctx: &mut IrContext,
    loc: Location,
    tuple: ValueRef,
    result_ty: TypeRef,
    index: u64,
) -> TupleGet {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), TUPLE_GET())
        .operand(tuple)
        .result(result_ty)
        .attr(ATTR_INDEX(), Attribute::from(index))
        .build(ctx);
    TupleGet(ctx.create_op(data))
}

dialect_op! {
    /// `%s = adt.struct_new %f0, ..., %fn : adt.struct() {...}`
    pub struct StructNew = "adt"."struct_new";
    validate(ctx, op) {
        check_result_count(ctx, op, 1)?;
        if let Some(fields) = struct_fields(ctx, ctx.op_result_types(op)[0]) {
            check_operand_count(ctx, op, fields.len())?;
        }
    }
}

impl StructNew {
    pub fn fields<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}

pub fn struct_new(
    ctx: &mut IrContext,
    loc: Location,
    fields: impl IntoIterator<Item = ValueRef>,
    struct_ty: TypeRef,
) -> StructNew {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), STRUCT_NEW())
        .operands(fields)
        .result(struct_ty)
        .build(ctx);
    StructNew(ctx.create_op(data))
}

dialect_op! {
    /// `%x = adt.struct_extract %s {field = @name} : T`
    pub struct StructExtract = "adt"."struct_extract";
    validate(ctx, op) {
        check_operand_count(ctx, op, 1)?;
        check_result_count(ctx, op, 1)?;
        required_attr(ctx, op, "field", Attribute::as_symbol)?;
    }
}

impl StructExtract {
    pub fn r#ref(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn field(&self, ctx: &IrContext) -> Symbol {
        match ctx.op(self.0).attributes.get(&ATTR_FIELD()) {
            Some(Attribute::Symbol(s)) => *s,
            _ => panic!("adt.struct_extract: `field` is checked by from_op"),
        }
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

pub fn struct_extract(
    ctx: &mut IrContext,
    loc: Location,
    r#ref: ValueRef,
    result_ty: TypeRef,
    field: Symbol,
) -> StructExtract {
    let data = OperationDataBuilder::new(loc, DIALECT_NAME(), STRUCT_EXTRACT())
        .operand(r#ref)
        .result(result_ty)
        .attr(ATTR_FIELD(), Attribute::Symbol(field))
        .build(ctx);
    StructExtract(ctx.create_op(data))
}
