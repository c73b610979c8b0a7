//! AES-256-GCM encryption/decryption
//!
//! Authenticated encryption with a 256-bit key, a 16-byte IV and a detached
//! 16-byte authentication tag, no associated data. The 16-byte IV matches what
//! the prompt service and existing credential files use, so the cipher is
//! instantiated with a 128-bit nonce rather than the usual 96-bit one.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};

use crate::error::{DecryptionFailure, StardustError, StardustResult};

use super::secure_memory::SecureBytes;

/// Size of the AES key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the IV in bytes (128 bits)
pub const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Check key, IV and tag lengths before any cipher work
pub fn validate_lengths(key: &[u8], iv: &[u8], auth_tag: &[u8]) -> StardustResult<()> {
    validate_key(key)?;
    if iv.len() != IV_SIZE {
        return Err(StardustError::wrong_length("iv", IV_SIZE, iv.len()));
    }
    if auth_tag.len() != TAG_SIZE {
        return Err(StardustError::wrong_length(
            "authTag",
            TAG_SIZE,
            auth_tag.len(),
        ));
    }
    Ok(())
}

fn validate_key(key: &[u8]) -> StardustResult<()> {
    if key.len() != KEY_SIZE {
        return Err(StardustError::wrong_length("key", KEY_SIZE, key.len()));
    }
    Ok(())
}

/// Output of one encryption: IV, ciphertext and detached tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub iv: [u8; IV_SIZE],
    pub ciphertext: Vec<u8>,
    pub auth_tag: [u8; TAG_SIZE],
}

impl SealedBox {
    /// Encode as `ivHex:authTagHex:ciphertextHex`
    pub fn to_colon_hex(&self) -> String {
        format!(
            "{}:{}:{}",
            hex::encode(self.iv),
            hex::encode(self.auth_tag),
            hex::encode(&self.ciphertext)
        )
    }

    /// Parse the `ivHex:authTagHex:ciphertextHex` form
    pub fn from_colon_hex(encoded: &str) -> StardustResult<Self> {
        let parts: Vec<&str> = encoded.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(StardustError::Storage(format!(
                "Invalid encrypted data format: expected 3 parts, got {}",
                parts.len()
            )));
        }

        let iv = hex::decode(parts[0]).map_err(|_| StardustError::InvalidEncoding { field: "iv" })?;
        let auth_tag = hex::decode(parts[1])
            .map_err(|_| StardustError::InvalidEncoding { field: "authTag" })?;
        let ciphertext = hex::decode(parts[2])
            .map_err(|_| StardustError::InvalidEncoding { field: "ciphertext" })?;

        let iv: [u8; IV_SIZE] = iv
            .as_slice()
            .try_into()
            .map_err(|_| StardustError::wrong_length("iv", IV_SIZE, iv.len()))?;
        let auth_tag: [u8; TAG_SIZE] = auth_tag
            .as_slice()
            .try_into()
            .map_err(|_| StardustError::wrong_length("authTag", TAG_SIZE, auth_tag.len()))?;

        Ok(Self {
            iv,
            ciphertext,
            auth_tag,
        })
    }
}

/// Authenticated encryption primitive shared by the prompt decryptor and the
/// credential store
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherCodec;

impl CipherCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encrypt plaintext with a fresh random IV
    pub fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> StardustResult<SealedBox> {
        validate_key(key)?;
        let cipher = Aes256Gcm16::new_from_slice(key)
            .map_err(|_| StardustError::wrong_length("key", KEY_SIZE, key.len()))?;

        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.to_vec();
        let tag = match cipher.encrypt_in_place_detached(
            Nonce::<U16>::from_slice(&iv),
            b"",
            &mut buffer,
        ) {
            Ok(tag) => tag,
            Err(_) => {
                // Buffer may still hold plaintext
                drop(SecureBytes::new(buffer));
                return Err(StardustError::Storage(
                    "Encryption failed: plaintext too large".to_string(),
                ));
            }
        };

        let mut auth_tag = [0u8; TAG_SIZE];
        auth_tag.copy_from_slice(tag.as_slice());

        Ok(SealedBox {
            iv,
            ciphertext: buffer,
            auth_tag,
        })
    }

    /// Decrypt and verify
    ///
    /// Wrong keys and tampered data produce the same error; the tag check
    /// cannot distinguish them and the error does not try to.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        iv: &[u8],
        auth_tag: &[u8],
    ) -> StardustResult<SecureBytes> {
        validate_lengths(key, iv, auth_tag)?;
        let cipher = Aes256Gcm16::new_from_slice(key)
            .map_err(|_| StardustError::wrong_length("key", KEY_SIZE, key.len()))?;

        let mut buffer = SecureBytes::new(ciphertext.to_vec());
        cipher
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(iv),
                b"",
                buffer.as_bytes_mut(),
                Tag::<U16>::from_slice(auth_tag),
            )
            .map_err(|_| StardustError::Decryption(DecryptionFailure::InvalidKeyOrCorruptData))?;

        Ok(buffer)
    }

    /// Decrypt a [`SealedBox`]
    pub fn open(&self, sealed: &SealedBox, key: &[u8]) -> StardustResult<SecureBytes> {
        self.decrypt(&sealed.ciphertext, key, &sealed.iv, &sealed.auth_tag)
    }
}
