//! Custom error types for Stardust
//!
//! This module defines the error hierarchy for the prompt pipeline and the
//! credential cache using thiserror. Messages are safe to show to users: they
//! never carry key material, IVs, auth tags, or decrypted text.

use std::fmt;

use thiserror::Error;

/// Why an authenticated decryption failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionFailure {
    /// Wrong key or tampered ciphertext/tag; the cipher cannot tell these apart
    InvalidKeyOrCorruptData,
    /// A tag mismatch reported separately by the primitive
    ///
    /// AES-GCM reports every tag failure as `InvalidKeyOrCorruptData`, so the
    /// bundled codec never produces this. Verified plaintext that is not
    /// coherent text is `StardustError::PromptValidation` instead.
    IntegrityFailure,
}

impl fmt::Display for DecryptionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyOrCorruptData => write!(f, "invalid key or corrupted data"),
            Self::IntegrityFailure => write!(f, "data integrity check failed"),
        }
    }
}

/// The main error type for Stardust operations
#[derive(Error, Debug)]
pub enum StardustError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Structural input of the wrong size (key, IV, auth tag)
    #[error("Validation error: {field} must be {expected} bytes, got {actual}")]
    Validation {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A hex-encoded field could not be decoded
    #[error("Validation error: {field} is not valid hex")]
    InvalidEncoding { field: &'static str },

    /// Authenticated decryption failed
    #[error("Decryption failed: {0}")]
    Decryption(DecryptionFailure),

    /// Session missing or expired
    #[error("Session error: {0}")]
    Session(String),

    /// Session owned by someone else
    #[error("Access denied: {0}")]
    Access(String),

    /// Remote response did not carry the expected success envelope
    #[error("Payload error: {0}")]
    Payload(String),

    /// Remote service asked us to back off
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Transport-level failure talking to the remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Decrypted text failed the structural sanity check
    #[error("Decrypted prompt failed validation")]
    PromptValidation,

    /// Template expansion failed part-way
    #[error("Template fill failed: {0}")]
    TemplateFill(String),

    /// Template or parameters rejected before expansion
    #[error("Invalid template input: {0}")]
    InvalidInput(String),

    /// Credential import rejected
    #[error("Import error: {0}")]
    Import(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StardustError {
    /// Create a validation error for a field of the wrong length
    pub fn wrong_length(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::Validation {
            field,
            expected,
            actual,
        }
    }

    /// Check if this is a decryption error
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::InvalidEncoding { .. }
        )
    }

    /// Whether retrying the same call could plausibly succeed
    ///
    /// Session and access errors need the caller to re-authenticate first,
    /// so they are not counted here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }
}

impl From<std::io::Error> for StardustError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StardustError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for Stardust operations
pub type StardustResult<T> = Result<T, StardustError>;
