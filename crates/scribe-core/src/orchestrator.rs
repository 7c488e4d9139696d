//! Session orchestrator
//!
//! The entry point for the presentation layer. Every operation:
//! 1. Takes the session's lock (one operation per session at a time)
//! 2. Loads the session from the store
//! 3. Works on a scratch copy
//! 4. Persists the copy and returns a view of it
//!
//! A failed step returns before anything is persisted, so an adapter
//! failure or a rejected reconciliation request leaves the stored session
//! untouched.

use crate::adapter::LanguageModelAdapter;
use crate::config::ScribeConfig;
use crate::error::ScribeError;
use crate::session::{Session, SessionId, SessionSnapshot};
use crate::store::SessionStore;
use crate::turn::{self, Begin};
use dashmap::DashMap;
use scribe_dialogue::{
    ConfirmationClassifier, IntentClassifier, LexicalConfirmationClassifier, LexicalIntentClassifier,
    RESOLVE_PENDING_REPLY,
};
use scribe_reconcile::{ContentHash, DiffView, ReconcileError, ResolveOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Result of one user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    /// Visible reply
    pub reply: String,
    /// Whether a proposal now awaits review
    pub has_pending_proposal: bool,
    /// Session after the turn
    pub snapshot: SessionSnapshot,
}

/// Session orchestrator
pub struct Orchestrator {
    config: ScribeConfig,
    store: Arc<dyn SessionStore>,
    adapter: Arc<dyn LanguageModelAdapter>,
    intents: Arc<dyn IntentClassifier>,
    confirmations: Arc<dyn ConfirmationClassifier>,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("locked_sessions", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create orchestrator with the lexical classifiers
    #[must_use]
    pub fn new(
        config: ScribeConfig,
        store: Arc<dyn SessionStore>,
        adapter: Arc<dyn LanguageModelAdapter>,
    ) -> Self {
        Self {
            config,
            store,
            adapter,
            intents: Arc::new(LexicalIntentClassifier),
            confirmations: Arc::new(LexicalConfirmationClassifier),
            locks: DashMap::new(),
        }
    }

    /// With intent classifier
    #[must_use]
    pub fn with_intent_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.intents = classifier;
        self
    }

    /// With confirmation classifier
    #[must_use]
    pub fn with_confirmation_classifier(mut self, classifier: Arc<dyn ConfirmationClassifier>) -> Self {
        self.confirmations = classifier;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    /// Start a session from an initial document
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn create_session(&self, initial: &str) -> Result<SessionId, ScribeError> {
        let session = Session::new(initial);
        self.store.create(&session).await?;
        info!(session = %session.id(), bytes = initial.len(), "session created");
        Ok(session.id())
    }

    /// Run one user turn
    ///
    /// While a proposal is pending the adapter is not called and the reply
    /// asks the user to resolve the proposal first.
    ///
    /// # Errors
    /// `SessionNotFound`, `Adapter` (turn aborted, nothing persisted), or a
    /// store failure.
    pub async fn submit_turn(&self, id: SessionId, input: &str) -> Result<TurnResult, ScribeError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        let mut session = self.load(id).await?;

        let reply = match turn::begin(
            &mut session,
            input,
            &self.config,
            self.intents.as_ref(),
            self.confirmations.as_ref(),
        ) {
            Begin::Suppressed => RESOLVE_PENDING_REPLY.to_string(),
            Begin::Run(plan, request) => {
                let response = self.adapter.respond(&request).await.inspect_err(|err| {
                    tracing::warn!(session = %id, error = %err, "adapter failed, turn aborted");
                })?;
                turn::complete(&mut session, plan, input, response, &self.config)?
            }
        };

        self.persist(&mut session).await?;
        Ok(TurnResult {
            reply,
            has_pending_proposal: session.has_pending_proposal(),
            snapshot: session.snapshot(&self.config),
        })
    }

    /// Current review state
    ///
    /// # Errors
    /// `SessionNotFound` or a store failure.
    pub async fn get_diff(&self, id: SessionId) -> Result<DiffView, ScribeError> {
        let session = self.load(id).await?;
        Ok(session.diff_view(&self.config))
    }

    /// Accept one diff line
    ///
    /// # Errors
    /// `Reconcile` for an absent proposal or a bad index.
    pub async fn accept_line(&self, id: SessionId, index: usize) -> Result<DiffView, ScribeError> {
        self.review(id, |s, _| s.accept_line(index)).await
    }

    /// Reject one diff line
    ///
    /// # Errors
    /// `Reconcile` for an absent proposal or a bad index.
    pub async fn reject_line(&self, id: SessionId, index: usize) -> Result<DiffView, ScribeError> {
        self.review(id, |s, _| s.reject_line(index)).await
    }

    /// Accept one hunk
    ///
    /// # Errors
    /// `Reconcile` for an absent proposal or a bad index.
    pub async fn accept_hunk(&self, id: SessionId, index: usize) -> Result<DiffView, ScribeError> {
        self.review(id, |s, c| s.accept_hunk(index, c)).await
    }

    /// Reject one hunk
    ///
    /// # Errors
    /// `Reconcile` for an absent proposal or a bad index.
    pub async fn reject_hunk(&self, id: SessionId, index: usize) -> Result<DiffView, ScribeError> {
        self.review(id, |s, c| s.reject_hunk(index, c)).await
    }

    /// Undo the last line or hunk operation
    ///
    /// With an empty history the view is returned unchanged.
    ///
    /// # Errors
    /// `Reconcile` when no proposal is pending.
    pub async fn undo(&self, id: SessionId) -> Result<DiffView, ScribeError> {
        self.review(id, |s, _| s.undo().map(|_| ())).await
    }

    /// Take the proposal verbatim and commit it
    ///
    /// # Errors
    /// `Reconcile(NoPendingProposal)` unless this retries an accept-all.
    pub async fn accept_all(&self, id: SessionId) -> Result<ResolveOutcome, ScribeError> {
        self.resolve(id, |s, c| s.accept_all(c)).await
    }

    /// Discard the proposal
    ///
    /// # Errors
    /// `Reconcile(NoPendingProposal)` unless this retries a reject-all.
    pub async fn reject_all(&self, id: SessionId) -> Result<ResolveOutcome, ScribeError> {
        self.resolve(id, |s, _| s.reject_all()).await
    }

    /// Commit a merged text as the accepted document
    ///
    /// # Errors
    /// `SessionNotFound` or a store failure.
    pub async fn finalize(&self, id: SessionId, merged: &str) -> Result<ContentHash, ScribeError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        let mut session = self.load(id).await?;
        let hash = session.finalize(merged, &self.config);
        self.persist(&mut session).await?;
        Ok(hash)
    }

    /// Presentation view of a session
    ///
    /// # Errors
    /// `SessionNotFound` or a store failure.
    pub async fn snapshot(&self, id: SessionId) -> Result<SessionSnapshot, ScribeError> {
        Ok(self.load(id).await?.snapshot(&self.config))
    }

    /// Delete a session, returning whether it existed
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn delete(&self, id: SessionId) -> Result<bool, ScribeError> {
        let lock = self.lock_for(id);
        let deleted = {
            let _guard = lock.lock().await;
            self.store.delete(id).await?
        };
        self.locks.remove(&id);
        if deleted {
            info!(session = %id, "session deleted");
        }
        Ok(deleted)
    }

    /// Stored session ids
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn list(&self) -> Result<Vec<SessionId>, ScribeError> {
        Ok(self.store.list().await?)
    }

    fn lock_for(&self, id: SessionId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, id: SessionId) -> Result<Session, ScribeError> {
        match self.store.get(id).await? {
            Some(session) => Ok(session),
            None => {
                // Unknown ids must not leave a lock behind.
                self.locks.remove(&id);
                Err(ScribeError::SessionNotFound(id))
            }
        }
    }

    async fn persist(&self, session: &mut Session) -> Result<(), ScribeError> {
        session.touch();
        self.store.update(session).await?;
        Ok(())
    }

    async fn review<F>(&self, id: SessionId, op: F) -> Result<DiffView, ScribeError>
    where
        F: FnOnce(&mut Session, &ScribeConfig) -> Result<(), ReconcileError> + Send,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        let mut session = self.load(id).await?;
        op(&mut session, &self.config)?;
        self.persist(&mut session).await?;
        Ok(session.diff_view(&self.config))
    }

    async fn resolve<F>(&self, id: SessionId, op: F) -> Result<ResolveOutcome, ScribeError>
    where
        F: FnOnce(&mut Session, &ScribeConfig) -> Result<ResolveOutcome, ReconcileError> + Send,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        let mut session = self.load(id).await?;
        let outcome = op(&mut session, &self.config)?;
        if outcome == ResolveOutcome::Applied {
            self.persist(&mut session).await?;
        }
        Ok(outcome)
    }
}
