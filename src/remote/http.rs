//! HTTP implementation of [`PromptService`]
//!
//! Requests are JSON `POST`s with the arguments wrapped as `{"json": {...}}`.
//! The response body for a prompt holds the session key, so it is read into
//! a buffer that is wiped once parsed. Buffers internal to the HTTP stack are
//! outside our control and are not wiped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;
use zeroize::Zeroizing;

use super::envelope::{self, Endpoint};
use super::service::PromptService;
use crate::crypto::secure_memory::scrub;
use crate::crypto::SecureString;
use crate::error::{StardustError, StardustResult};
use crate::models::{EncryptedPromptPayload, Session};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Prompt service client over HTTPS
pub struct HttpPromptClient {
    client: Client,
    base_url: String,
    api_key: Option<SecureString>,
}

impl HttpPromptClient {
    pub fn new(base_url: &str, timeout: Duration) -> StardustResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StardustError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Set the default API key used when a call does not pass one
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty()).map(SecureString::new);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        session_id: &str,
        arguments: Value,
    ) -> StardustResult<T> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        debug!(endpoint = endpoint.path(), session_id, "Calling prompt service");

        let mut wrapped = Map::new();
        wrapped.insert("json".to_string(), arguments);
        let mut body = Value::Object(wrapped);
        let sent = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await;
        scrub(&mut body);

        let response = sent.map_err(|e| {
            StardustError::Network(format!("request to {} failed: {}", endpoint.path(), e))
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| {
            StardustError::Network(format!("reading {} failed: {}", endpoint.path(), e))
        })?;
        let raw = Zeroizing::new(Vec::<u8>::from(bytes));

        envelope::interpret(endpoint, session_id, status, retry_after.as_deref(), &raw)
    }
}

#[async_trait]
impl PromptService for HttpPromptClient {
    async fn get_session(&self, session_id: &str) -> StardustResult<Session> {
        self.call(
            Endpoint::GetSession,
            session_id,
            json!({ "sessionId": session_id }),
        )
        .await
    }

    async fn get_encrypted_prompt(
        &self,
        session_id: &str,
        api_key: Option<&str>,
    ) -> StardustResult<EncryptedPromptPayload> {
        let api_key = api_key.or_else(|| self.api_key.as_ref().map(SecureString::as_str));
        self.call(
            Endpoint::GetPrompt,
            session_id,
            json!({ "sessionId": session_id, "apiKey": api_key }),
        )
        .await
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpPromptClient::new("https://api.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_api_key_configuration() {
        let client = HttpPromptClient::new("https://api.example.com", Duration::from_secs(5)).unwrap();
        assert!(!client.has_credentials());

        let client = client.with_api_key(Some(String::new()));
        assert!(!client.has_credentials());

        let client = client.with_api_key(Some("key".into()));
        assert!(client.has_credentials());
    }
}
