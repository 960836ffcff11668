//! Rewrite pattern trait.

use super::rewriter::PatternRewriter;
use crate::context::IrContext;
use crate::refs::OpRef;

/// Outcome of one [`ArenaRewritePattern::match_and_rewrite`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Mutations were recorded on the rewriter.
    Applied,
    /// The op is not something this pattern handles.
    NoMatch,
    /// The op is the pattern's kind, but it cannot be rewritten in the
    /// current state of the IR. The engine may retry once a neighbour
    /// changes.
    Declined(&'static str),
}

impl MatchResult {
    pub fn matched(self) -> bool {
        matches!(self, MatchResult::Applied)
    }

    pub fn reason(self) -> Option<&'static str> {
        match self {
            MatchResult::Declined(reason) => Some(reason),
            _ => None,
        }
    }
}

/// A pattern that can match and transform operations.
///
/// Patterns must not touch the IR except by creating new detached ops;
/// replacements and insertions go through `rewriter` and are applied by the
/// [`PatternApplicator`](super::PatternApplicator) after the pattern
/// returns [`MatchResult::Applied`].
pub trait ArenaRewritePattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> MatchResult;

    /// Human-readable name used in logs and decline reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
