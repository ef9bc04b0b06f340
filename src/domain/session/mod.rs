//! Session domain
//!
//! A session is nothing more than an opaque cookie value naming a directory
//! of transient files.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_ID_BYTES: usize = 16;
const MIN_SESSION_ID_LENGTH: usize = 8;
const MAX_SESSION_ID_LENGTH: usize = 128;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionIdError {
    #[error("Session ID must be between 8 and 128 characters")]
    InvalidLength,

    #[error("Session ID contains invalid character: '{0}'")]
    InvalidCharacter(char),
}

/// Opaque session identifier, safe to use as a single path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Parse a client-supplied value (URL-safe base64 alphabet only)
    pub fn new(id: impl Into<String>) -> Result<Self, SessionIdError> {
        let id = id.into();

        if id.len() < MIN_SESSION_ID_LENGTH || id.len() > MAX_SESSION_ID_LENGTH {
            return Err(SessionIdError::InvalidLength);
        }

        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(SessionIdError::InvalidCharacter(c));
        }

        Ok(Self(id))
    }

    /// Generate a fresh random session ID
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_valid() {
        let sid = SessionId::generate();
        assert_eq!(sid.as_str().len(), 22);
        assert!(SessionId::new(sid.as_str()).is_ok());
    }

    #[test]
    fn test_rejects_path_segments() {
        assert_eq!(
            SessionId::new("../../etc/passwd"),
            Err(SessionIdError::InvalidCharacter('.'))
        );
        assert_eq!(
            SessionId::new("abc/defghij"),
            Err(SessionIdError::InvalidCharacter('/'))
        );
    }

    #[test]
    fn test_rejects_bad_length() {
        assert_eq!(SessionId::new("short"), Err(SessionIdError::InvalidLength));
        assert_eq!(
            SessionId::new("a".repeat(129)),
            Err(SessionIdError::InvalidLength)
        );
    }
}
