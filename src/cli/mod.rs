//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the prompt pipeline and credential store.

pub mod auth;
pub mod prompt;
pub mod template;

pub use auth::{handle_auth_command, AuthCommands};
pub use prompt::{handle_access_command, handle_check_command, handle_use_command};
pub use template::{handle_template_command, TemplateCommands};
