//! Configuration module for Stardust
//!
//! This module provides configuration management including:
//! - storage directory resolution
//! - non-sensitive settings persistence

pub mod paths;
pub mod settings;

pub use paths::StardustPaths;
pub use settings::Settings;
