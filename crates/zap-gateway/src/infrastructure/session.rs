//! Persistence of session credentials between gateway runs.
//!
//! The credentials are an opaque JSON blob owned by the socket library; the
//! store only round-trips it.  Persisting the blob lets the gateway
//! reconnect after a restart without the operator re-scanning a pairing
//! code.
//!
//! # Single-writer invariant
//!
//! Only the connection manager calls [`SessionStore::save`] and
//! [`SessionStore::clear`] (from its event pump), so there is never a
//! concurrent writer and no file locking is needed.  Credentials are never
//! deleted automatically — only on an explicit logout-class disconnect.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::transport::SessionCredentials;

/// File name of the credential blob inside the session directory.
const CREDS_FILE: &str = "creds.json";

/// Error type for session persistence.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing session at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored blob is not valid JSON.
    #[error("failed to parse stored session: {0}")]
    Format(#[from] serde_json::Error),
}

/// Reads and writes the credential blob under a fixed session directory.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn creds_path(&self) -> PathBuf {
        self.dir.join(CREDS_FILE)
    }

    /// Loads persisted credentials, returning `Ok(None)` when none exist
    /// yet (first run, or after a logout cleared them).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] for file-system errors other than
    /// "not found" and [`SessionError::Format`] for a corrupt blob.
    pub fn load(&self) -> Result<Option<SessionCredentials>, SessionError> {
        let path = self.creds_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let creds: SessionCredentials = serde_json::from_str(&content)?;
                Ok(Some(creds))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Io { path, source: e }),
        }
    }

    /// Persists rotated credentials, creating the session directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] for file-system failures.
    pub fn save(&self, creds: &SessionCredentials) -> Result<(), SessionError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| SessionError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.creds_path();
        let content = serde_json::to_string(creds)?;
        std::fs::write(&path, content).map_err(|source| SessionError::Io { path, source })?;
        debug!("session credentials persisted");
        Ok(())
    }

    /// Removes persisted credentials.  Missing files are not an error —
    /// clearing an already-empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] for file-system failures other than
    /// "not found".
    pub fn clear(&self) -> Result<(), SessionError> {
        let path = self.creds_path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("session credentials cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Io { path, source: e }),
        }
    }

    /// The directory this store persists into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
