//! TrunkIR: an arena-allocated, multi-dialect SSA IR.
//!
//! All entities (operations, values, blocks, regions) live in an
//! [`IrContext`] and are addressed by small `Copy` refs. Types are interned,
//! so structural equality of types is `TypeRef` equality.
//!
//! The crate also ships the machinery passes are built from: a textual
//! [`printer`] and [`parser`], recursive [`walk`]ers, use-chain
//! [`validation`], and the partial-conversion [`rewrite`] engine.

pub mod context;
pub mod dialect;
pub mod location;
pub mod ops;
pub mod parser;
pub mod printer;
pub mod refs;
pub mod rewrite;
pub mod symbol;
pub mod types;
pub mod validation;
pub mod walk;

pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
    ValueData,
};
pub use location::Span;
pub use ops::{ArenaDialectOp, ConversionError};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use rewrite::ArenaModule;
pub use symbol::Symbol;
pub use types::{Attribute, Location, PathInterner, TypeData, TypeDataBuilder, TypeInterner};
pub use walk::WalkAction;

// Re-exported for the `symbols!` macro and downstream builders.
#[doc(hidden)]
pub use smallvec;
