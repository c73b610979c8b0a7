//! Encrypted prompt pipeline
//!
//! Fetches an encrypted prompt, decrypts it in memory, fills it and hands
//! the result back without ever writing prompt text to disk or logs.

pub mod cache;
pub mod decryptor;
pub mod manager;
pub mod memory;

pub use cache::SessionCache;
pub use decryptor::PromptDecryptor;
pub use manager::{PromptManager, PromptMetadata, PromptOutput, ReadinessReport, Stage};
pub use memory::{MemoryProbe, MemoryThresholds, SystemMemoryProbe};
