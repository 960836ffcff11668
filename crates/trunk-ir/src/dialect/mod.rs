//! Dialects understood by this crate.
//!
//! | Dialect | Ops                                                     |
//! |---------|---------------------------------------------------------|
//! | `core`  | `module`; builtin types incl. `tuple` and `func`        |
//! | `adt`   | `tuple_new`, `tuple_get`, `struct_new`, `struct_extract` |
//! | `arith` | `const`, `add`                                          |
//! | `func`  | `func`, `call`, `return`                                |

pub mod adt;
pub mod arith;
pub mod core;
pub mod func;
