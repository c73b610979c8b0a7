//! Prompt service abstraction
//!
//! `PromptManager` talks to the remote service only through this trait, so
//! tests can substitute an in-memory implementation.

use async_trait::async_trait;

use crate::error::StardustResult;
use crate::models::{EncryptedPromptPayload, Session};

/// Remote source of sessions and encrypted prompts
#[async_trait]
pub trait PromptService: Send + Sync {
    /// Fetch session metadata
    async fn get_session(&self, session_id: &str) -> StardustResult<Session>;

    /// Fetch the encrypted prompt for a session
    ///
    /// `api_key` overrides the client's configured key for this call.
    async fn get_encrypted_prompt(
        &self,
        session_id: &str,
        api_key: Option<&str>,
    ) -> StardustResult<EncryptedPromptPayload>;

    /// Whether a default API key is configured
    fn has_credentials(&self) -> bool;
}
