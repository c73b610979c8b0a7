//! Credential record model
//!
//! Authentication material cached on disk by the credential store. Only auth
//! tokens live here, never prompt content.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timestamp;
use crate::crypto::secure_memory::{scrub, Scrub};
use crate::error::StardustResult;

/// Cached authentication data
///
/// Unknown fields are kept in `extra` and written back unchanged.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Access token; `None` once the record has expired
    #[serde(default)]
    pub token: Option<String>,

    /// Refresh token, preserved across expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token stops being valid
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option_millis"
    )]
    pub expires_at: Option<DateTime<Utc>>,

    /// Set on read when `expires_at` has passed
    #[serde(default, skip_serializing_if = "is_false")]
    pub expired: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CredentialRecord {
    /// Create a record holding an access token
    pub fn new(token: impl Into<String>) -> Self {
        let mut record = Self::default();
        record.token = Some(token.into());
        record
    }

    /// Set the refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set the expiry
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check whether the access token has expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }

    /// Drop the access token but keep the refresh token for renewal
    pub fn mark_expired(&mut self) {
        scrub(&mut self.token);
        self.expired = true;
    }

    /// Shallow-merge `partial` over this record
    ///
    /// The derived `expired` flag is not carried into the merged record, so
    /// saving a renewed token does not persist a stale flag.
    pub fn merged_with(&self, partial: &Map<String, Value>) -> StardustResult<Self> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        fields.remove("expired");
        for (key, value) in partial {
            fields.insert(key.clone(), value.clone());
        }

        let mut merged = Value::Object(fields);
        let result = serde_json::from_value(merged.clone());
        scrub(&mut merged);
        Ok(result?)
    }
}

impl Scrub for CredentialRecord {
    fn scrub(&mut self) {
        self.token.scrub();
        self.refresh_token.scrub();
        self.extra.scrub();
        self.expires_at = None;
    }
}

impl Drop for CredentialRecord {
    fn drop(&mut self) {
        scrub(self);
    }
}

// Tokens never appear in Debug output
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("has_token", &self.token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("expired", &self.expired)
            .field("extra_fields", &self.extra.len())
            .finish()
    }
}

/// Encrypted credential blob exported for diagnostics
///
/// Decrypting it requires the same device key, so it does not move between
/// machines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportedAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_expires_at_serialized_as_millis() {
        let at = Utc::now();
        let record = CredentialRecord::new("t").with_expires_at(at);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["expiresAt"], json!(at.timestamp_millis()));
        assert!(value.get("expired").is_none());
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let record: CredentialRecord = serde_json::from_value(json!({
            "token": "t",
            "refreshToken": "r",
            "userId": "u-1",
            "plan": { "tier": "pro" }
        }))
        .unwrap();

        assert_eq!(record.extra["userId"], "u-1");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["plan"]["tier"], "pro");
    }

    #[test]
    fn test_mark_expired_keeps_refresh_token() {
        let mut record = CredentialRecord::new("t").with_refresh_token("r");
        record.mark_expired();
        assert!(record.token.is_none());
        assert!(record.expired);
        assert_eq!(record.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn test_merged_with_overrides_fields() {
        let mut record = CredentialRecord::new("old")
            .with_refresh_token("r")
            .with_expires_at(Utc::now() - Duration::hours(1));
        record.mark_expired();

        let partial = json!({ "token": "new", "plan": "pro" });
        let merged = record.merged_with(partial.as_object().unwrap()).unwrap();

        assert_eq!(merged.token.as_deref(), Some("new"));
        assert_eq!(merged.refresh_token.as_deref(), Some("r"));
        assert_eq!(merged.extra["plan"], "pro");
        assert!(!merged.expired);
    }

    #[test]
    fn test_debug_hides_tokens() {
        let record = CredentialRecord::new("secret-token");
        assert!(!format!("{:?}", record).contains("secret-token"));
    }
}
