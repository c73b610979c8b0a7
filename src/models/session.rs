//! Session model
//!
//! A server-issued, time-limited handle authorizing one user to fetch one
//! encrypted prompt. Sessions are read-only here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// A prompt session as returned by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque session identifier
    pub session_id: String,

    /// When the session stops being usable
    #[serde(with = "timestamp::flexible")]
    pub expires_at: DateTime<Utc>,

    /// Owner of the session, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Session {
    /// Check whether the session has expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check whether the session has expired now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check whether `user_id` may use this session
    ///
    /// Sessions without a recorded owner are open to any caller.
    pub fn is_accessible_by(&self, user_id: &str) -> bool {
        match &self.user_id {
            Some(owner) => owner == user_id,
            None => true,
        }
    }
}
