//! Encrypted prompt payload
//!
//! The ciphertext envelope for one template, together with the session key
//! needed to open it and the caller's fill parameters. A payload lives only
//! for one `use_prompt` call and wipes every field when dropped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::timestamp;
use crate::crypto::secure_memory::{scrub, Scrub};

/// Ciphertext envelope delivered by the prompt service
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPromptPayload {
    pub session_id: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub form_id: String,

    #[serde(default)]
    pub form_name: String,

    /// Fill parameters, arbitrary nesting
    #[serde(default)]
    pub parameters: Value,

    /// Ciphertext, hex
    pub encrypted_prompt: String,

    /// 16-byte IV, hex
    pub iv: String,

    /// 16-byte GCM tag, hex
    pub auth_tag: String,

    /// 32-byte session key, hex
    pub session_key: String,

    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl EncryptedPromptPayload {
    /// Check whether the payload carries an expiry that has already passed
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

impl Scrub for EncryptedPromptPayload {
    fn scrub(&mut self) {
        self.session_id.scrub();
        self.form_id.scrub();
        self.form_name.scrub();
        self.parameters.scrub();
        self.encrypted_prompt.scrub();
        self.iv.scrub();
        self.auth_tag.scrub();
        self.session_key.scrub();
        self.expires_at = None;
    }
}

impl Drop for EncryptedPromptPayload {
    fn drop(&mut self) {
        scrub(self);
    }
}

impl fmt::Debug for EncryptedPromptPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPromptPayload")
            .field("session_id", &self.session_id)
            .field("form_id", &self.form_id)
            .field("form_name", &self.form_name)
            .field("ciphertext_len", &(self.encrypted_prompt.len() / 2))
            .finish_non_exhaustive()
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
