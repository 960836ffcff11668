//! Error types for passes.

use std::fmt;

use derive_more::{Display, From};
use trunk_ir::OpRef;

pub type PassResult<T> = Result<T, PassError>;

#[derive(Clone, Display, Debug, From, PartialEq)]
#[display("{kind}")]
pub struct PassError {
    #[from]
    kind: Box<PassErrorKind>,
}

impl<E> From<E> for PassError
where
    PassErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        PassError {
            kind: Box::new(PassErrorKind::from(error)),
        }
    }
}

impl PassError {
    pub fn conversion_incomplete(pass: &'static str, remaining: Vec<RemainingOp>) -> Self {
        PassErrorKind::ConversionIncomplete { pass, remaining }.into()
    }

    pub fn invalid_module(msg: impl fmt::Display) -> Self {
        PassErrorKind::InvalidModule(msg.to_string()).into()
    }

    pub fn kind(&self) -> &PassErrorKind {
        &self.kind
    }

    /// Ops left illegal by the pass, if that is what failed.
    pub fn remaining(&self) -> &[RemainingOp] {
        match &*self.kind {
            PassErrorKind::ConversionIncomplete { remaining, .. } => remaining,
            _ => &[],
        }
    }
}

#[derive(Clone, Display, Debug, PartialEq)]
pub enum PassErrorKind {
    #[display("{pass}: {} illegal operation(s) remain: {}", remaining.len(), RemainingList(remaining))]
    ConversionIncomplete {
        pass: &'static str,
        remaining: Vec<RemainingOp>,
    },

    #[display("Invalid module: {_0}")]
    InvalidModule(String),
}

impl std::error::Error for PassError {}

/// An op that was still illegal when a pass gave up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemainingOp {
    pub op: OpRef,
    /// `dialect.name` of the op.
    pub name: String,
    /// Last reason a pattern gave for not rewriting the op.
    pub reason: Option<&'static str>,
}

impl fmt::Display for RemainingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.op)?;
        if let Some(reason) = self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

struct RemainingList<'a>(&'a [RemainingOp]);

impl fmt::Display for RemainingList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_incomplete_lists_reasons() {
        let err = PassError::conversion_incomplete(
            "tuple-to-struct",
            vec![RemainingOp {
                op: OpRef::from_u32(3),
                name: "adt.tuple_get".to_string(),
                reason: Some("index out of bounds"),
            }],
        );
        assert_eq!(
            err.to_string(),
            "tuple-to-struct: 1 illegal operation(s) remain: adt.tuple_get (op3): index out of bounds"
        );
        assert_eq!(err.remaining().len(), 1);
    }

    #[test]
    fn invalid_module_message() {
        let err = PassError::invalid_module("expected core.module");
        assert_eq!(err.to_string(), "Invalid module: expected core.module");
        assert!(err.remaining().is_empty());
    }
}
