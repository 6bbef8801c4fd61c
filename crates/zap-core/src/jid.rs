//! Recipient addressing: normalization into the chat network's JID format.
//!
//! Callers supply recipients as bare phone numbers (`"5511999999999"`).  The
//! network addresses users as JIDs (`"5511999999999@s.whatsapp.net"`), so the
//! gateway appends the user-server suffix when no domain part is present.
//! Beyond non-emptiness the identifier shape is deliberately not validated —
//! the network layer rejects malformed addresses itself, and duplicating its
//! rules here would drift out of date.

use serde::Serialize;
use thiserror::Error;

/// The user-server domain appended to bare phone numbers.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Error type for recipient normalization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JidError {
    /// The supplied recipient was empty or whitespace-only.
    #[error("recipient must not be empty")]
    Empty,
}

/// A normalized chat-network address.
///
/// Construct via [`Jid::normalize`]; the inner string is guaranteed
/// non-empty and carries a domain part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Jid(String);

impl Jid {
    /// Normalizes a caller-supplied recipient into a JID.
    ///
    /// Trims surrounding whitespace, rejects empty input, and appends
    /// `@s.whatsapp.net` when the input has no `@` domain.  Input that
    /// already carries a domain (user or group JIDs) passes through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`JidError::Empty`] for empty or whitespace-only input.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zap_core::Jid;
    ///
    /// let jid = Jid::normalize("5511999999999").unwrap();
    /// assert_eq!(jid.as_str(), "5511999999999@s.whatsapp.net");
    /// ```
    pub fn normalize(raw: &str) -> Result<Self, JidError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(JidError::Empty);
        }

        if trimmed.contains('@') {
            Ok(Self(trimmed.to_string()))
        } else {
            Ok(Self(format!("{trimmed}@{USER_SERVER}")))
        }
    }

    /// The normalized address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Jid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
