//! Path management for Stardust
//!
//! ## Path Resolution Order
//!
//! 1. `STARDUST_DATA_DIR` environment variable (if set)
//! 2. `<home>/.novel/stardust`

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::{StardustError, StardustResult};
use crate::storage::file_io;

/// Environment variable overriding the storage directory
pub const DATA_DIR_ENV: &str = "STARDUST_DATA_DIR";

/// Manages all paths used by Stardust
#[derive(Debug, Clone)]
pub struct StardustPaths {
    /// Directory holding the credential cache and settings
    storage_dir: PathBuf,
}

impl StardustPaths {
    /// Resolve the storage directory
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> StardustResult<Self> {
        let storage_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(".novel").join("stardust"))
                .ok_or_else(|| {
                    StardustError::Config("Could not determine home directory".into())
                })?,
        };

        Ok(Self { storage_dir })
    }

    /// Create StardustPaths with a custom directory (useful for testing)
    pub fn with_storage_dir(storage_dir: PathBuf) -> Self {
        Self { storage_dir }
    }

    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    /// Encrypted credential cache
    pub fn auth_file(&self) -> PathBuf {
        self.storage_dir.join("auth.enc")
    }

    /// Non-sensitive settings
    pub fn settings_file(&self) -> PathBuf {
        self.storage_dir.join("config.json")
    }

    /// Create the storage directory with owner-only permissions
    pub async fn ensure_storage_dir(&self) -> StardustResult<()> {
        file_io::ensure_private_dir(&self.storage_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_storage_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StardustPaths::with_storage_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.storage_dir(), temp_dir.path());
        assert_eq!(paths.auth_file(), temp_dir.path().join("auth.enc"));
        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(DATA_DIR_ENV, temp_dir.path());
        let paths = StardustPaths::new().unwrap();
        env::remove_var(DATA_DIR_ENV);

        assert_eq!(paths.storage_dir(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_ensure_storage_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StardustPaths::with_storage_dir(temp_dir.path().join("stardust"));

        paths.ensure_storage_dir().await.unwrap();
        assert!(paths.storage_dir().is_dir());
    }
}
