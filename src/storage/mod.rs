//! Storage layer for Stardust
//!
//! Atomic file writes with owner-only permissions, and the device-bound
//! encrypted credential cache built on top of them.

pub mod credentials;
pub mod file_io;

pub use credentials::{CredentialStore, StorageHealth};
pub use file_io::{read_json, write_json_atomic};
