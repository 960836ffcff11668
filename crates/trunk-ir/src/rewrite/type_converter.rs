//! Structural type converter.
//!
//! A conversion is a predicate plus a convert function. [`convert_type`]
//! rebuilds a type bottom-up: type params and type-valued attributes
//! (including those nested in lists) are converted first, then the first
//! conversion whose predicate accepts the rebuilt type is applied. A
//! conversion therefore only ever sees already-converted components.
//!
//! [`convert_type`]: ArenaTypeConverter::convert_type

use smallvec::SmallVec;

use crate::context::IrContext;
use crate::refs::{OpRef, TypeRef};
use crate::types::{Attribute, TypeData};

type PredicateFn = dyn Fn(&IrContext, TypeRef) -> bool;
type ConversionFn = dyn Fn(&mut IrContext, TypeRef) -> Option<TypeRef>;

struct Conversion {
    applies: Box<PredicateFn>,
    convert: Box<ConversionFn>,
}

/// Maps types during dialect conversion.
pub struct ArenaTypeConverter {
    conversions: Vec<Conversion>,
}

impl ArenaTypeConverter {
    pub fn new() -> Self {
        Self {
            conversions: Vec::new(),
        }
    }

    /// Register a conversion for every type `predicate` accepts.
    ///
    /// `convert` returning `None` means the type needs converting but can't
    /// be; the failure propagates to every type that contains it.
    pub fn add_conversion(
        &mut self,
        predicate: impl Fn(&IrContext, TypeRef) -> bool + 'static,
        convert: impl Fn(&mut IrContext, TypeRef) -> Option<TypeRef> + 'static,
    ) {
        self.conversions.push(Conversion {
            applies: Box::new(predicate),
            convert: Box::new(convert),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }

    /// Convert `ty` structurally.
    ///
    /// Returns `Some(ty)` unchanged for a type that is already legal, and
    /// `None` only when some applicable conversion failed.
    pub fn convert_type(&self, ctx: &mut IrContext, ty: TypeRef) -> Option<TypeRef> {
        if self.is_legal_type(ctx, ty) {
            return Some(ty);
        }

        let data = ctx.types.get(ty).clone();
        let mut params: SmallVec<[TypeRef; 4]> = SmallVec::with_capacity(data.params.len());
        for &param in &data.params {
            params.push(self.convert_type(ctx, param)?);
        }
        let mut attrs = data.attrs.clone();
        for value in attrs.values_mut() {
            if value.contains_type() {
                *value = self.convert_attribute(ctx, value)?;
            }
        }

        let rebuilt = if params == data.params && attrs == data.attrs {
            ty
        } else {
            ctx.types.intern(TypeData {
                dialect: data.dialect,
                name: data.name,
                params,
                attrs,
            })
        };

        let found = self.conversions.iter().find(|c| (c.applies)(&*ctx, rebuilt));
        match found {
            Some(conversion) => (conversion.convert)(ctx, rebuilt),
            None => Some(rebuilt),
        }
    }

    /// Like [`convert_type`](Self::convert_type), falling back to `ty` when
    /// conversion fails.
    pub fn convert_type_or_identity(&self, ctx: &mut IrContext, ty: TypeRef) -> TypeRef {
        self.convert_type(ctx, ty).unwrap_or(ty)
    }

    /// Convert every type mentioned by `attr`; other attributes are returned
    /// as-is.
    pub fn convert_attribute(&self, ctx: &mut IrContext, attr: &Attribute) -> Option<Attribute> {
        match attr {
            Attribute::Type(ty) => self.convert_type(ctx, *ty).map(Attribute::Type),
            Attribute::List(items) => items
                .iter()
                .map(|item| self.convert_attribute(ctx, item))
                .collect::<Option<Vec<_>>>()
                .map(Attribute::List),
            other => Some(other.clone()),
        }
    }

    /// Whether no conversion applies to `ty` or anything nested in it.
    pub fn is_legal_type(&self, ctx: &IrContext, ty: TypeRef) -> bool {
        if self.conversions.iter().any(|c| (c.applies)(ctx, ty)) {
            return false;
        }
        let data = ctx.types.get(ty);
        data.params.iter().all(|&p| self.is_legal_type(ctx, p))
            && data.attrs.values().all(|a| self.is_legal_attribute(ctx, a))
    }

    pub fn is_legal_attribute(&self, ctx: &IrContext, attr: &Attribute) -> bool {
        match attr {
            Attribute::Type(ty) => self.is_legal_type(ctx, *ty),
            Attribute::List(items) => items.iter().all(|a| self.is_legal_attribute(ctx, a)),
            _ => true,
        }
    }

    /// Whether every operand type, result type and type attribute of `op`
    /// is legal.
    pub fn is_legal_op(&self, ctx: &IrContext, op: OpRef) -> bool {
        ctx.op_operands(op)
            .iter()
            .all(|&v| self.is_legal_type(ctx, ctx.value_ty(v)))
            && ctx
                .op_result_types(op)
                .iter()
                .all(|&ty| self.is_legal_type(ctx, ty))
            && ctx
                .op(op)
                .attributes
                .values()
                .all(|a| self.is_legal_attribute(ctx, a))
    }
}

impl Default for ArenaTypeConverter {
    fn default() -> Self {
        Self::new()
    }
}
