//! In-memory prompt decryption
//!
//! Decodes the hex fields of a payload into buffers that are wiped on drop,
//! checks their lengths, decrypts, and sanity-checks the resulting text.
//! The plaintext exists only inside the returned [`SecureString`].

use zeroize::Zeroizing;

use crate::crypto::cipher::{self, CipherCodec};
use crate::crypto::SecureString;
use crate::error::{StardustError, StardustResult};

/// Upper bound on process memory after decryption
pub const SAFE_DECRYPT_LIMIT: u64 = 500 * 1024 * 1024;

const MIN_PROMPT_CHARS: usize = 10;

/// Decrypts encrypted prompt payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptDecryptor {
    codec: CipherCodec,
}

fn decode(field: &'static str, hex_text: &str) -> StardustResult<Zeroizing<Vec<u8>>> {
    hex::decode(hex_text)
        .map(Zeroizing::new)
        .map_err(|_| StardustError::InvalidEncoding { field })
}

impl PromptDecryptor {
    pub fn new(codec: CipherCodec) -> Self {
        Self { codec }
    }

    /// Decrypt a hex-encoded prompt with a hex-encoded session key
    ///
    /// Lengths are validated before the cipher runs. Plaintext that is not
    /// UTF-8 or fails [`is_valid_prompt`] is wiped and rejected with
    /// `PromptValidation`.
    pub fn decrypt(
        &self,
        encrypted_hex: &str,
        iv_hex: &str,
        auth_tag_hex: &str,
        session_key_hex: &str,
    ) -> StardustResult<SecureString> {
        if encrypted_hex.is_empty() || iv_hex.is_empty() || auth_tag_hex.is_empty() {
            return Err(StardustError::Payload(
                "encrypted prompt is incomplete".into(),
            ));
        }

        let iv = decode("iv", iv_hex)?;
        let auth_tag = decode("authTag", auth_tag_hex)?;
        let ciphertext = decode("encryptedPrompt", encrypted_hex)?;
        let key = decode("key", session_key_hex)?;
        cipher::validate_lengths(&key, &iv, &auth_tag)?;

        let plaintext = self.codec.decrypt(&ciphertext, &key, &iv, &auth_tag)?;
        let prompt = plaintext
            .into_secure_string()
            .ok_or(StardustError::PromptValidation)?;

        if !is_valid_prompt(&prompt) {
            return Err(StardustError::PromptValidation);
        }
        Ok(prompt)
    }
}

/// Structural sanity check on decrypted text
///
/// A prompt is longer than ten characters, contains a `{{` placeholder and
/// at least one CJK unified ideograph.
pub fn is_valid_prompt(prompt: &str) -> bool {
    prompt.chars().count() > MIN_PROMPT_CHARS
        && prompt.contains("{{")
        && prompt.chars().any(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c))
}

/// A plausible session key: 32 to 256 hex characters
pub fn is_valid_session_key(session_key: &str) -> bool {
    (32..=256).contains(&session_key.len()) && session_key.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Bytes of plaintext a hex ciphertext decrypts to
pub fn estimate_decrypted_size(encrypted_hex: &str) -> u64 {
    (encrypted_hex.len() / 2) as u64
}

/// Whether decrypting keeps the process under [`SAFE_DECRYPT_LIMIT`]
pub fn can_safely_decrypt(resident_bytes: u64, encrypted_hex: &str) -> bool {
    resident_bytes.saturating_add(estimate_decrypted_size(encrypted_hex)) < SAFE_DECRYPT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecryptionFailure;
    use crate::crypto::SealedBox;

    const KEY: [u8; 32] = [7u8; 32];

    fn seal(text: &str) -> SealedBox {
        CipherCodec::new().encrypt(text.as_bytes(), &KEY).unwrap()
    }

    fn decrypt(sealed: &SealedBox, key: &[u8]) -> StardustResult<SecureString> {
        PromptDecryptor::default().decrypt(
            &hex::encode(&sealed.ciphertext),
            &hex::encode(sealed.iv),
            &hex::encode(sealed.auth_tag),
            &hex::encode(key),
        )
    }

    #[test]
    fn test_decrypt_valid_prompt() {
        let sealed = seal("请为{{name}}写一个开头段落");
        let prompt = decrypt(&sealed, &KEY).unwrap();
        assert_eq!(prompt, "请为{{name}}写一个开头段落");
    }

    #[test]
    fn test_rejects_implausible_text() {
        let sealed = seal("hello {{world}} in ascii only");
        assert!(matches!(
            decrypt(&sealed, &KEY),
            Err(StardustError::PromptValidation)
        ));
    }

    #[test]
    fn test_wrong_key() {
        let sealed = seal("请为{{name}}写一个开头段落");
        assert!(matches!(
            decrypt(&sealed, &[8u8; 32]),
            Err(StardustError::Decryption(
                DecryptionFailure::InvalidKeyOrCorruptData
            ))
        ));
    }

    #[test]
    fn test_invalid_utf8_fails_validation() {
        let sealed = CipherCodec::new().encrypt(&[0xff, 0xfe, 0xfd], &KEY).unwrap();
        assert!(matches!(
            decrypt(&sealed, &KEY),
            Err(StardustError::PromptValidation)
        ));
    }

    #[test]
    fn test_length_validation_before_cipher() {
        let sealed = seal("请为{{name}}写一个开头段落");
        let err = decrypt(&sealed, &[1u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            StardustError::Validation {
                field: "key",
                expected: 32,
                actual: 16
            }
        ));

        let err = PromptDecryptor::default()
            .decrypt("00", "0011", &"00".repeat(16), &"00".repeat(32))
            .unwrap_err();
        assert!(matches!(err, StardustError::Validation { field: "iv", .. }));
    }

    #[test]
    fn test_bad_hex_and_missing_fields() {
        let err = PromptDecryptor::default()
            .decrypt("zz", &"00".repeat(16), &"00".repeat(16), &"00".repeat(32))
            .unwrap_err();
        assert!(matches!(
            err,
            StardustError::InvalidEncoding {
                field: "encryptedPrompt"
            }
        ));

        let err = PromptDecryptor::default()
            .decrypt("", "00", "00", "00")
            .unwrap_err();
        assert!(matches!(err, StardustError::Payload(_)));
    }

    #[test]
    fn test_prompt_sanity_rules() {
        assert!(!is_valid_prompt("短{{x}}"));
        assert!(is_valid_prompt("请描述{{name}}的故事背景"));
        assert!(!is_valid_prompt("请描述name的故事背景很长很长"));
    }

    #[test]
    fn test_session_key_shape() {
        assert!(is_valid_session_key(&"ab".repeat(32)));
        assert!(!is_valid_session_key("abc"));
        assert!(!is_valid_session_key(&"zz".repeat(32)));
        assert!(!is_valid_session_key(&"a".repeat(257)));
    }

    #[test]
    fn test_safe_decrypt_headroom() {
        assert_eq!(estimate_decrypted_size("abcd"), 2);
        assert!(can_safely_decrypt(1024, "abcd"));
        assert!(!can_safely_decrypt(SAFE_DECRYPT_LIMIT, "abcd"));
    }
}
