//! Error types for Scribe Core
//!
//! Everything the orchestrator can surface:
//! - Unknown sessions
//! - Language-model adapter failures (turn aborted, nothing mutated)
//! - Invalid reconciliation requests (no pending proposal, stale index)
//! - Store and configuration failures

use crate::adapter::AdapterError;
use crate::config::ConfigError;
use crate::session::SessionId;
use crate::store::StoreError;
use scribe_reconcile::ReconcileError;

/// Main Scribe error type
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    /// No session with this id
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Language-model adapter failed; the turn was aborted
    #[error("adapter failed: {0}")]
    Adapter(#[from] AdapterError),

    /// Reconciliation request rejected
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Session store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ScribeError {
    /// Check if the caller sent a request that can never succeed as-is
    #[inline]
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        match self {
            Self::SessionNotFound(_) => true,
            Self::Reconcile(err) => err.is_invalid_request(),
            _ => false,
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Adapter(err) => err.is_retryable(),
            Self::Store(StoreError::Io(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let stale: ScribeError = ReconcileError::StaleIndex { index: 4, len: 2 }.into();
        assert!(stale.is_invalid_request());
        assert!(!stale.is_retryable());

        let pending: ScribeError = ReconcileError::ProposalPending.into();
        assert!(!pending.is_invalid_request());

        let timeout: ScribeError = AdapterError::Timeout { secs: 5 }.into();
        assert!(timeout.is_retryable());
        assert!(!timeout.is_invalid_request());

        assert!(ScribeError::SessionNotFound(SessionId::new()).is_invalid_request());
    }
}
