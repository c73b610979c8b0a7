//! RPC response envelope
//!
//! Every endpoint answers `{"result": {"data": {"success": bool, "data": ...}}}`.
//! Turning a raw response into a typed value is kept free of I/O so it can be
//! tested without a server.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::crypto::secure_memory::scrub;
use crate::error::{StardustError, StardustResult};

/// Seconds to wait when a 429 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// The remote procedures this client calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GetSession,
    GetPrompt,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::GetSession => "/api/trpc/form.getSession",
            Self::GetPrompt => "/api/trpc/form.getPrompt",
        }
    }

    /// Error raised when the envelope does not report success
    fn failure(self, session_id: &str) -> StardustError {
        match self {
            Self::GetSession => StardustError::Session(format!(
                "session {} does not exist or has expired",
                session_id
            )),
            Self::GetPrompt => StardustError::Payload(format!(
                "no encrypted prompt available for session {}",
                session_id
            )),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    result: Option<EnvelopeResult>,
}

#[derive(Deserialize)]
struct EnvelopeResult {
    data: Option<EnvelopeData>,
}

#[derive(Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Value,
}

/// Parse the seconds of a `Retry-After` header
pub fn retry_after_secs(header: Option<&str>) -> u64 {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Map a raw response to the typed `data` of a successful envelope
pub fn interpret<T: DeserializeOwned>(
    endpoint: Endpoint,
    session_id: &str,
    status: u16,
    retry_after: Option<&str>,
    body: &[u8],
) -> StardustResult<T> {
    if status == 429 {
        return Err(StardustError::RateLimited {
            retry_after_secs: retry_after_secs(retry_after),
        });
    }

    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !(200..300).contains(&status) => {
            return Err(StardustError::Network(format!(
                "{} returned HTTP {}",
                endpoint.path(),
                status
            )));
        }
        Err(_) => {
            return Err(StardustError::Payload(format!(
                "{} returned a malformed response",
                endpoint.path()
            )));
        }
    };

    let Some(mut data) = envelope.result.and_then(|r| r.data) else {
        return Err(endpoint.failure(session_id));
    };
    if !data.success {
        scrub(&mut data.data);
        return Err(endpoint.failure(session_id));
    }

    // The payload carries key material; never echo serde's message
    let value = std::mem::take(&mut data.data);
    serde_json::from_value(value).map_err(|_| {
        StardustError::Payload(format!(
            "{} response is missing required fields",
            endpoint.path()
        ))
    })
}
