//! Stardust - secure in-memory prompt delivery for AI-assisted novel writing
//!
//! Prompts are fetched from the remote service encrypted, decrypted with
//! AES-256-GCM, filled from a template and handed back without ever being
//! written to disk or logs. A small device-bound encrypted cache holds the
//! user's credentials.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Storage paths and non-sensitive settings
//! - `error`: Custom error types
//! - `crypto`: AES-256-GCM codec, device key and zero-on-drop containers
//! - `models`: Sessions, encrypted payloads and credential records
//! - `template`: The prompt template language
//! - `remote`: Client for the remote prompt service
//! - `prompt`: The fetch, decrypt and fill pipeline
//! - `storage`: Atomic file writes and the encrypted credential cache
//! - `display`, `cli`: Terminal glue for the `stardust` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stardust::crypto::CipherCodec;
//! use stardust::prompt::{PromptDecryptor, PromptManager};
//! use stardust::remote::HttpPromptClient;
//! use stardust::template::TemplateEngine;
//!
//! let client = HttpPromptClient::new("https://api.stardust-dreams.com", timeout)?;
//! let manager = PromptManager::new(
//!     Arc::new(client),
//!     PromptDecryptor::new(CipherCodec::new()),
//!     TemplateEngine::new(),
//! );
//! let output = manager.use_prompt("session-id", None).await?;
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod models;
pub mod prompt;
pub mod remote;
pub mod storage;
pub mod template;

pub use error::{StardustError, StardustResult};
