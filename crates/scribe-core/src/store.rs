//! Session persistence
//!
//! [`SessionStore`] is injected into the orchestrator. Two implementations:
//! - [`InMemorySessionStore`]: concurrent map, for tests and embedding
//! - [`FileSessionStore`]: one JSON file per session, written atomically

use crate::session::{Session, SessionId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Record did not encode or decode
    #[error("session record invalid: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Create called for an existing id
    #[error("session already exists: {0}")]
    AlreadyExists(SessionId),

    /// Update called for an unknown id
    #[error("session not stored: {0}")]
    NotFound(SessionId),
}

/// Session persistence capability
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session
    ///
    /// # Errors
    /// Returns error on I/O or decode failure; a missing session is `Ok(None)`.
    async fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Store a new session
    ///
    /// # Errors
    /// `AlreadyExists` if the id is taken.
    async fn create(&self, session: &Session) -> Result<(), StoreError>;

    /// Replace a stored session
    ///
    /// # Errors
    /// `NotFound` if the id was never created.
    async fn update(&self, session: &Session) -> Result<(), StoreError>;

    /// Remove a session, returning whether it existed
    ///
    /// # Errors
    /// Returns error on I/O failure.
    async fn delete(&self, id: SessionId) -> Result<bool, StoreError>;

    /// Stored session ids, oldest first
    ///
    /// # Errors
    /// Returns error on I/O failure.
    async fn list(&self) -> Result<Vec<SessionId>, StoreError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl InMemorySessionStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        match self.sessions.entry(session.id()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::AlreadyExists(session.id())),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, session: &Session) -> Result<(), StoreError> {
        let mut entry = self
            .sessions
            .get_mut(&session.id())
            .ok_or(StoreError::NotFound(session.id()))?;
        *entry = session.clone();
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<SessionId>, StoreError> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// JSON file store, one `<id>.json` per session
///
/// Writes go to a temporary sibling, are fsynced, then renamed over the
/// record, so a crash leaves either the old or the new record.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Open a store rooted at `root`, creating the directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Store directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record path for a session
    #[must_use]
    pub fn path_for(&self, id: SessionId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn write_atomic(&self, id: SessionId, session: &Session) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(session)?;
        let path = self.path_for(id);
        let tmp = self.root.join(format!(".{id}.json.tmp"));

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(session = %id, bytes = bytes.len(), "session persisted");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        if tokio::fs::try_exists(self.path_for(session.id())).await? {
            return Err(StoreError::AlreadyExists(session.id()));
        }
        self.write_atomic(session.id(), session).await
    }

    async fn update(&self, session: &Session) -> Result<(), StoreError> {
        if !tokio::fs::try_exists(self.path_for(session.id())).await? {
            return Err(StoreError::NotFound(session.id()));
        }
        self.write_atomic(session.id(), session).await
    }

    async fn delete(&self, id: SessionId) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<SessionId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<SessionId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn exercise(store: &dyn SessionStore) {
        let mut session = Session::new("## Overview\n- Summary: tbd\n");
        let id = session.id();

        assert!(store.get(id).await.unwrap().is_none());
        assert!(matches!(store.update(&session).await, Err(StoreError::NotFound(_))));

        store.create(&session).await.unwrap();
        assert!(matches!(store.create(&session).await, Err(StoreError::AlreadyExists(_))));

        session.record(crate::session::Role::User, "first turn");
        store.update(&session).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), Some(session.clone()));
        assert_eq!(store.list().await.unwrap(), vec![id]);

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_contract() {
        let store = InMemorySessionStore::new();
        exercise(&store).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn file_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path().join("sessions")).await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path()).await.unwrap();
        let session = Session::new("");
        store.create(&session).await.unwrap();
        store.update(&session).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", session.id())]);
    }

    #[tokio::test]
    async fn corrupt_record_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path()).await.unwrap();
        let id = SessionId::new();
        std::fs::write(store.path_for(id), "{not json").unwrap();
        assert!(matches!(store.get(id).await, Err(StoreError::Serialization(_))));
    }
}
