//! Core data models for Stardust
//!
//! Sessions and encrypted payloads come from the prompt service; credential
//! records are what the local cache persists.

pub mod credential;
pub mod payload;
pub mod session;
pub mod timestamp;

pub use credential::{CredentialRecord, ExportedAuth};
pub use payload::EncryptedPromptPayload;
pub use session::Session;
