//! Display formatting for terminal output
//!
//! Plain-text formatting for reports shown by the CLI. Nothing here ever
//! receives prompt text, tokens or key material.

pub mod auth;
pub mod prompt;
pub mod template;

pub use auth::{format_auth_status, format_storage_health};
pub use prompt::{format_prompt_metadata, format_readiness_report};
pub use template::format_template_issues;
