//! Persistence seam for per-host session records.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::session::SessionRecord;

/// Store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Trait for session record stores.
///
/// The registry loads a record on a host's first contact and writes one
/// back when a session with an unfetched command expires. Failures are
/// logged by the caller and never fail the triggering operation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record for `host`, or `None` if the store has nothing.
    async fn load(&self, host: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Write back a record.
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;
}

/// Store that remembers nothing. Useful for tests and for running
/// without a sessions directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl SessionStore for NullStore {
    async fn load(&self, _host: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(None)
    }

    async fn save(&self, _record: &SessionRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Filesystem store keeping one `<host>.json` file per host.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Map a host to its record path.
    ///
    /// Host values come off the wire; anything that could escape the
    /// store directory is rejected rather than used as a path.
    fn path_for(&self, host: &str) -> Option<PathBuf> {
        if host.is_empty() || host.contains(['/', '\\']) || host.contains("..") {
            return None;
        }
        Some(self.dir.join(format!("{host}.json")))
    }

    /// Directory the records live in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SessionStore for FsStore {
    async fn load(&self, host: &str) -> Result<Option<SessionRecord>, StoreError> {
        let Some(path) = self.path_for(host) else {
            return Ok(None);
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let Some(path) = self.path_for(&record.host) else {
            tracing::debug!(host = %record.host, "refusing to persist unsafe host name");
            return Ok(());
        };
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert!(store.load("a.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("sessions"));

        let record = SessionRecord {
            host: "a.test".to_string(),
            pending: Some("alert(1)".to_string()),
        };
        store.save(&record).await.unwrap();

        let loaded = store.load("a.test").await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn corrupt_record_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        tokio::fs::write(dir.path().join("a.test.json"), b"{not json")
            .await
            .unwrap();
        assert!(matches!(
            store.load("a.test").await,
            Err(StoreError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn traversal_hosts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        assert!(store.load("../etc/passwd").await.unwrap().is_none());
        let record = SessionRecord {
            host: "../escape".to_string(),
            pending: None,
        };
        store.save(&record).await.unwrap();
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
