//! Pairing presenter: renders a pairing challenge as a scannable QR image.
//!
//! When no valid session exists, the chat network emits a short-lived opaque
//! challenge token.  The operator links the gateway to the account by
//! scanning that token with the phone app, so it has to become something a
//! camera can read: this module encodes it as a QR matrix and writes a PNG
//! to a well-known path.
//!
//! The presenter is a pure transformation plus one file write.  It keeps no
//! state; the challenge itself stays valid if the write fails, so callers
//! log the error and carry on (the next challenge re-renders).

use std::path::{Path, PathBuf};

use image::Luma;
use qrcode::QrCode;
use thiserror::Error;
use tracing::info;

/// Error type for pairing artifact rendering.
#[derive(Debug, Error)]
pub enum PairingError {
    /// The challenge could not be encoded as a QR matrix (too long).
    #[error("failed to encode pairing challenge: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// The artifact directory could not be created.
    #[error("failed to create artifact directory {path}: {source}")]
    Dir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PNG could not be written.
    #[error("failed to write pairing artifact to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Renders pairing challenges to a fixed artifact path.
pub struct PairingPresenter {
    output_path: PathBuf,
}

impl PairingPresenter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// Encodes `challenge` as a QR matrix and writes it as a PNG.
    ///
    /// Returns the path written so callers can tell the operator where to
    /// look.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError`] when encoding or the file write fails.  The
    /// failure is non-fatal to the connection lifecycle; callers log it.
    pub fn present(&self, challenge: &str) -> Result<&Path, PairingError> {
        let code = QrCode::new(challenge.as_bytes())?;

        // Grayscale is enough for a scanner and keeps the file small.
        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(256, 256)
            .build();

        if let Some(dir) = self.output_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|source| PairingError::Dir {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }

        image
            .save(&self.output_path)
            .map_err(|source| PairingError::Write {
                path: self.output_path.clone(),
                source,
            })?;

        info!("pairing challenge rendered to {}", self.output_path.display());
        Ok(&self.output_path)
    }

    /// Where the artifact is written.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
