//! Credential cache CLI commands
//!
//! Implements `stardust auth ...` on top of [`CredentialStore`].

use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::Subcommand;
use zeroize::Zeroizing;

use crate::display::{format_auth_status, format_storage_health};
use crate::error::{StardustError, StardustResult};
use crate::models::{CredentialRecord, ExportedAuth};
use crate::storage::CredentialStore;

/// Credential subcommands
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store an access token in the encrypted cache
    Login {
        /// Hours until the token expires
        #[arg(short, long)]
        expires_in_hours: Option<i64>,
        /// Also prompt for a refresh token
        #[arg(short, long)]
        refresh: bool,
    },
    /// Show cached credential state and storage health
    Status,
    /// Securely delete cached credentials
    Clear,
    /// Export the encrypted credential blob as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a previously exported credential blob
    Import {
        /// Path to the exported JSON file
        file: PathBuf,
    },
    /// Remove expired credentials and leftover temporary files
    Cleanup,
}

/// Handle an auth command
pub async fn handle_auth_command(store: &CredentialStore, cmd: AuthCommands) -> StardustResult<()> {
    match cmd {
        AuthCommands::Login {
            expires_in_hours,
            refresh,
        } => login(store, expires_in_hours, refresh).await,
        AuthCommands::Status => {
            let record = store.get_auth().await;
            println!("{}", format_auth_status(record.as_ref()));
            println!();
            println!("{}", format_storage_health(&store.check_health().await));
            Ok(())
        }
        AuthCommands::Clear => {
            if !store.clear_auth().await {
                return Err(StardustError::Storage("Failed to clear credentials".into()));
            }
            println!("Credentials cleared.");
            Ok(())
        }
        AuthCommands::Export { output } => export(store, output).await,
        AuthCommands::Import { file } => import(store, file).await,
        AuthCommands::Cleanup => {
            if !store.cleanup().await {
                return Err(StardustError::Storage("Cleanup did not complete".into()));
            }
            println!("Storage cleaned up.");
            Ok(())
        }
    }
}

async fn login(
    store: &CredentialStore,
    expires_in_hours: Option<i64>,
    refresh: bool,
) -> StardustResult<()> {
    let token = read_secret("Access token: ")?;
    if token.trim().is_empty() {
        return Err(StardustError::InvalidInput("access token must not be empty".into()));
    }

    let mut record = CredentialRecord::new(token.trim());
    if refresh {
        let refresh_token = read_secret("Refresh token: ")?;
        if !refresh_token.trim().is_empty() {
            record = record.with_refresh_token(refresh_token.trim());
        }
    }
    if let Some(hours) = expires_in_hours {
        if hours <= 0 {
            return Err(StardustError::InvalidInput(
                "expiry must be a positive number of hours".into(),
            ));
        }
        let expires_at = Duration::try_hours(hours)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| StardustError::InvalidInput("expiry is too far away".into()))?;
        record = record.with_expires_at(expires_at);
    }

    if !store.save_auth(&record).await {
        return Err(StardustError::Storage("Failed to save credentials".into()));
    }
    println!("Credentials saved.");
    Ok(())
}

async fn export(store: &CredentialStore, output: Option<PathBuf>) -> StardustResult<()> {
    let exported = store
        .export_auth()
        .await
        .ok_or_else(|| StardustError::Storage("No credentials to export".into()))?;
    let json = serde_json::to_string_pretty(&exported)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            println!("Exported credentials to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn import(store: &CredentialStore, file: PathBuf) -> StardustResult<()> {
    let contents = tokio::fs::read_to_string(&file).await?;
    let exported: ExportedAuth = serde_json::from_str(&contents)
        .map_err(|e| StardustError::Import(format!("{} is not an export file: {}", file.display(), e)))?;

    if !store.import_auth(&exported).await? {
        return Err(StardustError::Import(
            "credentials could not be decrypted on this device".into(),
        ));
    }
    println!("Credentials imported.");
    Ok(())
}

fn read_secret(prompt: &str) -> StardustResult<Zeroizing<String>> {
    rpassword::prompt_password(prompt)
        .map(Zeroizing::new)
        .map_err(|e| StardustError::Io(format!("Failed to read input: {}", e)))
}
