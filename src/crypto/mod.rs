//! Cryptographic functions for Stardust
//!
//! Provides AES-256-GCM authenticated encryption, the device-bound key used
//! by the credential cache, and zero-on-drop containers for plaintext.

pub mod cipher;
pub mod device_key;
pub mod secure_memory;

pub use cipher::{CipherCodec, SealedBox, IV_SIZE, KEY_SIZE, TAG_SIZE};
pub use device_key::{DeviceIdentity, DeviceKey};
pub use secure_memory::{scrub, Scrub, SecureBytes, SecureString};
