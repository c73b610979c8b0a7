//! File I/O utilities with atomic writes
//!
//! Writes go to a sibling `.tmp` file which is synced and then renamed over
//! the target, so a crash leaves either the old or the new contents.
//! Owner-only modes are applied on Unix and ignored elsewhere.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StardustError, StardustResult};

/// Mode for files holding credentials
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Mode for the storage directory
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Extension appended to in-flight writes
pub const TEMP_SUFFIX: &str = "tmp";

/// Path of the temporary file used while writing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Read JSON from a file, returning a default value if file doesn't exist
pub async fn read_json<T, P>(path: P) -> StardustResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(T::default());
    }

    let contents = fs::read(path)
        .await
        .map_err(|e| StardustError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_slice(&contents)
        .map_err(|e| StardustError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
pub async fn write_json_atomic<T, P>(path: P, data: &T) -> StardustResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let contents = serde_json::to_vec_pretty(data)
        .map_err(|e| StardustError::Storage(format!("Failed to serialize data: {}", e)))?;
    write_atomic(path.as_ref(), &contents, None).await
}

/// Write bytes atomically with owner-only permissions
pub async fn write_private_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> StardustResult<()> {
    write_atomic(path.as_ref(), contents, Some(PRIVATE_FILE_MODE)).await
}

async fn write_atomic(path: &Path, contents: &[u8], mode: Option<u32>) -> StardustResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            StardustError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp = temp_path(path);
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if let Some(mode) = mode {
        options.mode(mode);
    }

    let mut file = options
        .open(&temp)
        .await
        .map_err(|e| StardustError::Storage(format!("Failed to create temp file: {}", e)))?;

    let written = async {
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;
    drop(file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp).await;
        return Err(StardustError::Storage(format!("Failed to write data: {}", e)));
    }

    // A stale temp file keeps its old mode through truncation
    if let Some(mode) = mode {
        set_mode(&temp, mode).await?;
    }

    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(StardustError::Storage(format!(
            "Failed to rename temp file: {}",
            e
        )));
    }

    Ok(())
}

/// Set Unix permission bits; a no-op on other platforms
pub async fn set_mode(path: &Path, mode: u32) -> StardustResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| {
                StardustError::Storage(format!(
                    "Failed to set permissions on {}: {}",
                    path.display(),
                    e
                ))
            })?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

/// Permission bits of a path, when the platform has them
pub async fn mode_of(path: &Path) -> Option<u32> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path)
            .await
            .ok()
            .map(|meta| meta.permissions().mode() & 0o777)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        None
    }
}

/// Create a directory (and parents) and restrict it to the owner
pub async fn ensure_private_dir(path: &Path) -> StardustResult<()> {
    fs::create_dir_all(path).await.map_err(|e| {
        StardustError::Storage(format!(
            "Failed to create directory {}: {}",
            path.display(),
            e
        ))
    })?;
    set_mode(path, PRIVATE_DIR_MODE).await
}
