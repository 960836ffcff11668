//! Transformation passes over TrunkIR.
//!
//! Each pass takes an [`IrContext`](trunk_ir::IrContext) and an
//! [`ArenaModule`](trunk_ir::ArenaModule) and mutates the module in place.

pub mod errors;
pub mod tuple_to_struct;

pub use errors::{PassError, PassErrorKind, PassResult, RemainingOp};
pub use tuple_to_struct::{TupleToStructOptions, TupleToStructStats};
