//! Device-bound key derivation for the local credential cache
//!
//! The key is SHA-256 over `hostname:username:platform:arch:salt`. It is
//! deterministic for a given host and user, never stored, and recomputed on
//! every use. Anyone who can read the credential file *and* knows those host
//! attributes can rebuild the key, so this protects against casual disclosure
//! of the file only. It is not a substitute for an OS keychain or a managed
//! secret store.
//!
//! Platform and architecture are reported with Node.js naming (`darwin`,
//! `win32`, `x64`, `arm64`) so that credential files written by the earlier
//! JavaScript plugin remain readable.

use sha2::{Digest, Sha256};
use sysinfo::{System, Users};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::cipher::KEY_SIZE;

/// Fixed salt mixed into every device key
pub const DEVICE_KEY_SALT: &str = "stardust-dreams-2024";

/// The host attributes a device key is derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub hostname: String,
    pub username: String,
    pub platform: String,
    pub arch: String,
}

impl DeviceIdentity {
    /// Collect the attributes of the current host
    pub fn current() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();

        let username = os_username()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_default();

        Self {
            hostname,
            username,
            platform: node_platform(std::env::consts::OS).to_string(),
            arch: node_arch(std::env::consts::ARCH).to_string(),
        }
    }

    /// Create an identity from explicit values (useful for testing)
    pub fn with_values(
        hostname: impl Into<String>,
        username: impl Into<String>,
        platform: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            platform: platform.into(),
            arch: arch.into(),
        }
    }

    /// Derive the 256-bit key for this identity
    pub fn derive_key(&self) -> DeviceKey {
        let mut material = [
            self.hostname.as_str(),
            self.username.as_str(),
            self.platform.as_str(),
            self.arch.as_str(),
            DEVICE_KEY_SALT,
        ]
        .join(":");

        let digest = Sha256::digest(material.as_bytes());
        material.zeroize();

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        DeviceKey { key }
    }
}

/// A derived device key, zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DeviceKey {
    key: [u8; KEY_SIZE],
}

impl DeviceKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

/// Account name of the user running this process, looked up by user id
///
/// `None` when the process owner has no account entry, as in some
/// containers.
fn os_username() -> Option<String> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_process(pid);
    let uid = system.process(pid)?.user_id()?.clone();

    let users = Users::new_with_refreshed_list();
    users
        .get_user_by_id(&uid)
        .map(|user| user.name().to_string())
        .filter(|name| !name.is_empty())
}

fn node_platform(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn node_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}
