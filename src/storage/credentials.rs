//! Encrypted credential cache
//!
//! Stores authentication material (never prompt content) in `auth.enc` as
//! `ivHex:authTagHex:ciphertextHex`, encrypted with the device key. Losing
//! the cache must never crash the CLI, so expected failures are logged and
//! reported as `None`/`false` instead of errors.
//!
//! There is no file locking; two processes updating at once may lose one
//! update. Writes are atomic, so the file itself is never torn.

use std::path::Path;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::file_io::{self, TEMP_SUFFIX};
use crate::config::StardustPaths;
use crate::crypto::{CipherCodec, DeviceIdentity, SealedBox, SecureBytes};
use crate::error::{StardustError, StardustResult};
use crate::models::{CredentialRecord, ExportedAuth};

/// Overwrite size granularity used before deleting the credential file
const WIPE_BLOCK: usize = 1024;

/// Result of [`CredentialStore::check_health`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageHealth {
    pub storage_dir: bool,
    pub auth_file: bool,
    pub config_file: bool,
    /// Storage directory is exactly owner-only
    pub permissions: bool,
}

/// Device-bound encrypted credential storage
pub struct CredentialStore {
    paths: StardustPaths,
    identity: DeviceIdentity,
    codec: CipherCodec,
}

impl CredentialStore {
    pub fn new(paths: StardustPaths, identity: DeviceIdentity, codec: CipherCodec) -> Self {
        Self {
            paths,
            identity,
            codec,
        }
    }

    pub fn paths(&self) -> &StardustPaths {
        &self.paths
    }

    fn encrypt(&self, plaintext: &[u8]) -> StardustResult<String> {
        let key = self.identity.derive_key();
        let sealed = self.codec.encrypt(plaintext, key.as_bytes())?;
        Ok(sealed.to_colon_hex())
    }

    fn decrypt(&self, encoded: &str) -> StardustResult<SecureBytes> {
        let sealed = SealedBox::from_colon_hex(encoded)?;
        let key = self.identity.derive_key();
        self.codec.open(&sealed, key.as_bytes())
    }

    async fn auth_file_exists(&self) -> bool {
        path_exists(&self.paths.auth_file()).await
    }

    /// Encrypt and persist a credential record
    pub async fn save_auth(&self, record: &CredentialRecord) -> bool {
        match self.try_save(record).await {
            Ok(()) => {
                debug!("Saved credentials");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to save credentials");
                false
            }
        }
    }

    async fn try_save(&self, record: &CredentialRecord) -> StardustResult<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(record)?);
        let encoded = self.encrypt(&plaintext)?;
        self.paths.ensure_storage_dir().await?;
        file_io::write_private_atomic(self.paths.auth_file(), encoded.as_bytes()).await
    }

    /// Load the cached credential record
    ///
    /// A record past its expiry comes back with the access token removed
    /// and `expired` set; the refresh token is kept.
    pub async fn get_auth(&self) -> Option<CredentialRecord> {
        if !self.auth_file_exists().await {
            return None;
        }

        match self.try_load().await {
            Ok(mut record) => {
                if record.is_expired_at(Utc::now()) {
                    record.mark_expired();
                }
                Some(record)
            }
            Err(e) => {
                warn!(error = %e, "Failed to read credentials");
                None
            }
        }
    }

    async fn try_load(&self) -> StardustResult<CredentialRecord> {
        let encoded = fs::read_to_string(self.paths.auth_file()).await?;
        let plaintext = self.decrypt(&encoded)?;
        Ok(serde_json::from_slice(plaintext.as_bytes())?)
    }

    /// Shallow-merge `partial` over the stored record and save it
    pub async fn update_auth(&self, partial: &Map<String, Value>) -> bool {
        let current = self.get_auth().await.unwrap_or_default();
        match current.merged_with(partial) {
            Ok(merged) => self.save_auth(&merged).await,
            Err(e) => {
                warn!(error = %e, "Failed to merge credential update");
                false
            }
        }
    }

    /// Overwrite the credential file with random bytes, then delete it
    ///
    /// The overwrite is padded to a multiple of 1 KiB so its size does not
    /// reveal the original length. Succeeds when there is nothing to clear.
    pub async fn clear_auth(&self) -> bool {
        if !self.auth_file_exists().await {
            return true;
        }
        match self.try_clear().await {
            Ok(()) => {
                debug!("Cleared credentials");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear credentials");
                false
            }
        }
    }

    async fn try_clear(&self) -> StardustResult<()> {
        let path = self.paths.auth_file();
        let len = fs::metadata(&path).await?.len() as usize;
        let padded = len.div_ceil(WIPE_BLOCK).max(1) * WIPE_BLOCK;

        let mut noise = vec![0u8; padded];
        OsRng.fill_bytes(&mut noise);
        fs::write(&path, &noise).await?;
        fs::remove_file(&path).await?;
        Ok(())
    }

    /// Export the encrypted blob for diagnostics
    ///
    /// Only the ciphertext leaves the store; it decrypts only on this device.
    pub async fn export_auth(&self) -> Option<ExportedAuth> {
        if !self.auth_file_exists().await {
            return None;
        }
        match fs::read_to_string(self.paths.auth_file()).await {
            Ok(encrypted) => Some(ExportedAuth {
                encrypted: Some(encrypted.trim().to_string()),
                timestamp: Some(Utc::now()),
                device: Some(self.identity.hostname.clone()),
            }),
            Err(e) => {
                warn!(error = %e, "Failed to export credentials");
                None
            }
        }
    }

    /// Import a previously exported blob
    ///
    /// Fails with `Import` when there is no blob. The blob is trial
    /// decrypted first; if that fails nothing is written and `false` is
    /// returned.
    pub async fn import_auth(&self, exported: &ExportedAuth) -> StardustResult<bool> {
        let encrypted = match exported.encrypted.as_deref().map(str::trim) {
            Some(encrypted) if !encrypted.is_empty() => encrypted,
            _ => {
                return Err(StardustError::Import(
                    "exported data has no encrypted credentials".into(),
                ))
            }
        };

        if let Err(e) = self.decrypt(encrypted) {
            warn!(error = %e, "Imported credentials do not decrypt on this device");
            return Ok(false);
        }

        let written = async {
            self.paths.ensure_storage_dir().await?;
            file_io::write_private_atomic(self.paths.auth_file(), encrypted.as_bytes()).await
        }
        .await;

        match written {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "Failed to write imported credentials");
                Ok(false)
            }
        }
    }

    /// Report which storage artifacts exist and whether permissions are tight
    pub async fn check_health(&self) -> StorageHealth {
        let storage_dir = self.paths.storage_dir();
        let mut health = StorageHealth {
            storage_dir: path_exists(storage_dir).await,
            auth_file: path_exists(&self.paths.auth_file()).await,
            config_file: path_exists(&self.paths.settings_file()).await,
            permissions: false,
        };
        if health.storage_dir {
            health.permissions =
                file_io::mode_of(storage_dir).await == Some(file_io::PRIVATE_DIR_MODE);
        }
        health
    }

    /// Clear expired credentials and delete leftover temporary files
    pub async fn cleanup(&self) -> bool {
        if let Some(record) = self.get_auth().await {
            if record.expired && !self.clear_auth().await {
                return false;
            }
        }

        match self.remove_temp_files().await {
            Ok(removed) => {
                if removed > 0 {
                    debug!(removed, "Removed temporary files");
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to clean storage directory");
                false
            }
        }
    }

    async fn remove_temp_files(&self) -> StardustResult<usize> {
        let dir = self.paths.storage_dir();
        if !path_exists(dir).await {
            return Ok(0);
        }

        let suffix = format!(".{}", TEMP_SUFFIX);
        let mut removed = 0;
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(&suffix) {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    fn identity(host: &str) -> DeviceIdentity {
        DeviceIdentity::with_values(host, "writer", "linux", "x64")
    }

    fn store(temp_dir: &TempDir) -> CredentialStore {
        CredentialStore::new(
            StardustPaths::with_storage_dir(temp_dir.path().join("stardust")),
            identity("studio"),
            CipherCodec::new(),
        )
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let record = CredentialRecord::new("t").with_expires_at(Utc::now() + Duration::hours(1));
        assert!(store.save_auth(&record).await);

        let loaded = store.get_auth().await.unwrap();
        assert_eq!(loaded.token.as_deref(), Some("t"));
        assert!(!loaded.expired);
    }

    #[tokio::test]
    async fn test_file_format_and_no_plaintext() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert!(store.save_auth(&CredentialRecord::new("very-secret")).await);

        let contents = std::fs::read_to_string(store.paths().auth_file()).unwrap();
        let parts: Vec<&str> = contents.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 32);
        assert_eq!(parts[1].len(), 32);
        assert!(!contents.contains("very-secret"));
    }

    #[tokio::test]
    async fn test_expired_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let record = CredentialRecord::new("t")
            .with_refresh_token("r")
            .with_expires_at(Utc::now() - Duration::hours(1));
        assert!(store.save_auth(&record).await);

        let loaded = store.get_auth().await.unwrap();
        assert!(loaded.token.is_none());
        assert!(loaded.expired);
        assert_eq!(loaded.refresh_token.as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert!(store.get_auth().await.is_none());

        std::fs::create_dir_all(store.paths().storage_dir()).unwrap();
        std::fs::write(store.paths().auth_file(), "not:valid").unwrap();
        assert!(store.get_auth().await.is_none());
    }

    #[tokio::test]
    async fn test_other_device_cannot_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert!(store.save_auth(&CredentialRecord::new("t")).await);

        let other = CredentialStore::new(
            store.paths().clone(),
            identity("laptop"),
            CipherCodec::new(),
        );
        assert!(other.get_auth().await.is_none());
    }

    #[tokio::test]
    async fn test_update_auth_merges() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert!(store.save_auth(&CredentialRecord::new("old").with_refresh_token("r")).await);

        let partial = json!({ "token": "new", "userId": "u-1" });
        assert!(store.update_auth(partial.as_object().unwrap()).await);

        let loaded = store.get_auth().await.unwrap();
        assert_eq!(loaded.token.as_deref(), Some("new"));
        assert_eq!(loaded.refresh_token.as_deref(), Some("r"));
        assert_eq!(loaded.extra["userId"], "u-1");
    }

    #[tokio::test]
    async fn test_update_without_existing_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let partial = json!({ "token": "fresh" });
        assert!(store.update_auth(partial.as_object().unwrap()).await);
        assert_eq!(store.get_auth().await.unwrap().token.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_clear_auth() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert!(store.save_auth(&CredentialRecord::new("t")).await);

        assert!(store.clear_auth().await);
        assert!(store.get_auth().await.is_none());
        assert!(!store.paths().auth_file().exists());
        assert!(store.clear_auth().await);
    }

    #[tokio::test]
    async fn test_export_and_import() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert!(store.export_auth().await.is_none());
        assert!(store.save_auth(&CredentialRecord::new("t")).await);

        let exported = store.export_auth().await.unwrap();
        assert_eq!(exported.device.as_deref(), Some("studio"));
        assert!(store.clear_auth().await);

        assert!(store.import_auth(&exported).await.unwrap());
        assert_eq!(store.get_auth().await.unwrap().token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_import_rejects_foreign_and_missing_blobs() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let err = store.import_auth(&ExportedAuth::default()).await.unwrap_err();
        assert!(matches!(err, StardustError::Import(_)));

        let foreign = CredentialStore::new(
            StardustPaths::with_storage_dir(temp_dir.path().join("other")),
            identity("laptop"),
            CipherCodec::new(),
        );
        assert!(foreign.save_auth(&CredentialRecord::new("t")).await);
        let exported = foreign.export_auth().await.unwrap();

        assert!(!store.import_auth(&exported).await.unwrap());
        assert!(!store.paths().auth_file().exists());
    }

    #[tokio::test]
    async fn test_check_health() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert_eq!(store.check_health().await, StorageHealth::default());

        assert!(store.save_auth(&CredentialRecord::new("t")).await);
        let health = store.check_health().await;
        assert!(health.storage_dir);
        assert!(health.auth_file);
        assert!(!health.config_file);
        #[cfg(unix)]
        assert!(health.permissions);
    }

    #[tokio::test]
    async fn test_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let record = CredentialRecord::new("t").with_expires_at(Utc::now() - Duration::hours(1));
        assert!(store.save_auth(&record).await);
        let stray = store.paths().storage_dir().join("config.json.tmp");
        std::fs::write(&stray, "{}").unwrap();

        assert!(store.cleanup().await);
        assert!(!store.paths().auth_file().exists());
        assert!(!stray.exists());
    }
}
