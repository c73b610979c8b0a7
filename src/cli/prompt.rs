//! Prompt CLI commands
//!
//! Thin wrappers over [`PromptManager`]: fetch and print a prompt, run a
//! readiness check, or confirm session ownership.

use std::io::Write;

use crate::display::{format_prompt_metadata, format_readiness_report};
use crate::error::{StardustError, StardustResult};
use crate::prompt::PromptManager;

/// Fetch, decrypt and fill a prompt, writing it to stdout
///
/// Metadata goes to stderr so stdout carries only the prompt.
pub async fn handle_use_command(
    manager: &PromptManager,
    session_id: &str,
    api_key: Option<&str>,
    show_metadata: bool,
) -> StardustResult<()> {
    let output = manager.use_prompt(session_id, api_key).await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.prompt.as_bytes())?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;

    if show_metadata {
        eprintln!("{}", format_prompt_metadata(&output.metadata));
    }
    Ok(())
}

/// Print the readiness report for a session
pub async fn handle_check_command(manager: &PromptManager, session_id: &str) -> StardustResult<()> {
    let report = manager.pre_check(session_id).await;
    println!("{}", format_readiness_report(session_id, &report));
    Ok(())
}

/// Confirm that `user_id` may use the session
pub async fn handle_access_command(
    manager: &PromptManager,
    session_id: &str,
    user_id: &str,
) -> StardustResult<()> {
    if user_id.trim().is_empty() {
        return Err(StardustError::InvalidInput("user id must not be empty".into()));
    }
    manager.validate_access(session_id, user_id).await?;
    println!("Access granted to session {}.", session_id);
    Ok(())
}
