//! Reconciliation errors

/// Errors from reconciliation operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// No proposal is pending review
    #[error("no pending proposal")]
    NoPendingProposal,

    /// A proposal is already pending review
    #[error("a proposal is already pending review")]
    ProposalPending,

    /// Line or hunk index outside the current diff
    #[error("index {index} is out of bounds (diff has {len} entries)")]
    StaleIndex {
        /// Requested index
        index: usize,
        /// Entries in the current diff
        len: usize,
    },

    /// Line index addresses an unchanged line
    #[error("line {index} is unchanged")]
    NotAChange {
        /// Requested index
        index: usize,
    },
}

impl ReconcileError {
    /// Check if the caller sent a request that can never succeed as-is
    #[inline]
    #[must_use]
    pub const fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::NoPendingProposal | Self::StaleIndex { .. } | Self::NotAChange { .. }
        )
    }
}
