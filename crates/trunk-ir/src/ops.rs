//! Typed operation wrappers.
//!
//! A dialect op wrapper is a `Copy` newtype over [`OpRef`] that has been
//! checked to carry the expected `dialect.name`, operand shape and
//! attributes. Wrappers are obtained with [`ArenaDialectOp::from_op`] and
//! read everything else straight from the [`IrContext`].

use derive_more::Display;

use crate::context::IrContext;
use crate::refs::OpRef;
use crate::symbol::Symbol;
use crate::types::Attribute;

/// Why an [`OpRef`] could not be viewed as a particular dialect op.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ConversionError {
    #[display("expected {expected}, found {actual}")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    #[display("missing attribute `{_0}`")]
    MissingAttribute(&'static str),
    #[display("missing region `{_0}`")]
    MissingRegion(&'static str),
    #[display("attribute `{_0}` has the wrong kind")]
    WrongAttributeType(&'static str),
    #[display("expected {expected} operand(s), found {actual}")]
    WrongOperandCount { expected: usize, actual: usize },
    #[display("expected {expected} result(s), found {actual}")]
    WrongResultCount { expected: usize, actual: usize },
}

impl std::error::Error for ConversionError {}

pub trait ArenaDialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError>;
    fn op_ref(&self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == Self::DIALECT_NAME && data.name == Self::OP_NAME
    }
}

/// Fail with `WrongOperation` unless `op` is `T`.
pub(crate) fn check_name<T: ArenaDialectOp>(
    ctx: &IrContext,
    op: OpRef,
    expected: &'static str,
) -> Result<(), ConversionError> {
    if T::matches(ctx, op) {
        Ok(())
    } else {
        Err(ConversionError::WrongOperation {
            expected,
            actual: ctx.op_full_name(op),
        })
    }
}

pub(crate) fn check_operand_count(
    ctx: &IrContext,
    op: OpRef,
    expected: usize,
) -> Result<(), ConversionError> {
    let actual = ctx.op_operands(op).len();
    if actual == expected {
        Ok(())
    } else {
        Err(ConversionError::WrongOperandCount { expected, actual })
    }
}

pub(crate) fn check_result_count(
    ctx: &IrContext,
    op: OpRef,
    expected: usize,
) -> Result<(), ConversionError> {
    let actual = ctx.op_result_types(op).len();
    if actual == expected {
        Ok(())
    } else {
        Err(ConversionError::WrongResultCount { expected, actual })
    }
}

/// Look up a required attribute and project it with `project`.
pub(crate) fn required_attr<T>(
    ctx: &IrContext,
    op: OpRef,
    key: &'static str,
    project: impl FnOnce(&Attribute) -> Option<T>,
) -> Result<T, ConversionError> {
    let attr = ctx
        .op(op)
        .attributes
        .get(&Symbol::new(key))
        .ok_or(ConversionError::MissingAttribute(key))?;
    project(attr).ok_or(ConversionError::WrongAttributeType(key))
}

/// Declare a newtype wrapper implementing [`ArenaDialectOp`].
///
/// The body block runs after the name check and may perform further
/// validation with `?`. `Self(op)` is built when it succeeds.
macro_rules! dialect_op {
    (
        $(#[$meta:meta])*
        $vis:vis struct $ty:ident = $dialect:literal . $name:literal;
        validate($ctx:ident, $op:ident) $body:block
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        $vis struct $ty($crate::refs::OpRef);

        impl $crate::ops::ArenaDialectOp for $ty {
            const DIALECT_NAME: &'static str = $dialect;
            const OP_NAME: &'static str = $name;

            fn from_op(
                $ctx: &$crate::context::IrContext,
                $op: $crate::refs::OpRef,
            ) -> Result<Self, $crate::ops::ConversionError> {
                $crate::ops::check_name::<Self>($ctx, $op, concat!($dialect, ".", $name))?;
                $body
                Ok(Self($op))
            }

            fn op_ref(&self) -> $crate::refs::OpRef {
                self.0
            }
        }

        impl $ty {
            pub fn op_ref(&self) -> $crate::refs::OpRef {
                self.0
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $ty:ident = $dialect:literal . $name:literal;
    ) => {
        $crate::ops::dialect_op! {
            $(#[$meta])*
            $vis struct $ty = $dialect . $name;
            validate(_ctx, _op) {}
        }
    };
}
pub(crate) use dialect_op;
