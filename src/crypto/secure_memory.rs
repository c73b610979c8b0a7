//! Secure memory handling for sensitive data
//!
//! Provides types that zero their memory on drop, and the [`Scrub`] trait for
//! wiping structured values (JSON trees, payload envelopes) in place.
//!
//! Scrubbing is best effort. Copies the allocator made before a buffer was
//! wiped (a `String` that reallocated while growing, a value cloned by a
//! library) are out of reach. Because Rust strings are mutable, the final
//! text buffers can be wiped too, which a garbage-collected runtime cannot
//! offer, but callers that copy the returned text take over that
//! responsibility.

use std::fmt;
use std::ops::Deref;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Values that can wipe their own contents in place
pub trait Scrub {
    /// Overwrite every sensitive byte, leaving the value empty
    fn scrub(&mut self);
}

/// Scrub a value, swallowing any failure
///
/// A scrub must never interrupt the caller's control flow, so panics raised
/// while wiping are caught and discarded.
pub fn scrub<T: Scrub + ?Sized>(value: &mut T) {
    let _ = catch_unwind(AssertUnwindSafe(|| value.scrub()));
}

impl Scrub for String {
    fn scrub(&mut self) {
        self.zeroize();
    }
}

impl Scrub for Vec<u8> {
    fn scrub(&mut self) {
        self.zeroize();
    }
}

impl<T: Scrub> Scrub for Option<T> {
    fn scrub(&mut self) {
        if let Some(inner) = self.as_mut() {
            inner.scrub();
        }
        *self = None;
    }
}

impl Scrub for Value {
    fn scrub(&mut self) {
        match self {
            Value::String(s) => s.zeroize(),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    item.scrub();
                }
                items.clear();
            }
            Value::Object(map) => {
                // Keys may themselves be user data
                for (mut key, mut field) in std::mem::take(map) {
                    field.scrub();
                    key.zeroize();
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
        *self = Value::Null;
    }
}

impl Scrub for serde_json::Map<String, Value> {
    fn scrub(&mut self) {
        for (mut key, mut field) in std::mem::take(self) {
            field.scrub();
            key.zeroize();
        }
    }
}

/// A string type that zeros its contents on drop
///
/// Used for decrypted and filled prompt text.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    /// Create a new SecureString, taking ownership of the buffer
    pub fn new(s: impl Into<String>) -> Self {
        Self { inner: s.into() }
    }

    /// Get the string contents
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Scrub for SecureString {
    fn scrub(&mut self) {
        self.inner.zeroize();
    }
}

impl Deref for SecureString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AsRef<str> for SecureString {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for SecureString {
    fn eq(&self, other: &str) -> bool {
        self.inner == other
    }
}

impl PartialEq<&str> for SecureString {
    fn eq(&self, other: &&str) -> bool {
        self.inner == *other
    }
}

// Don't print the contents in Debug output
impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("len", &self.inner.len())
            .finish()
    }
}

// Don't print the contents in Display output
impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED {} bytes]", self.inner.len())
    }
}

/// A byte vector that zeros its contents on drop
///
/// Use this for decrypted buffers and other sensitive binary data.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureBytes {
    inner: Vec<u8>,
}

impl SecureBytes {
    /// Create new SecureBytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: bytes.into(),
        }
    }

    /// Get the bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Get mutable bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.inner
    }

    /// Get the length
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Convert into a [`SecureString`] without copying the buffer
    ///
    /// On invalid UTF-8 the buffer is wiped and `None` is returned.
    pub fn into_secure_string(mut self) -> Option<SecureString> {
        let bytes = std::mem::take(&mut self.inner);
        match String::from_utf8(bytes) {
            Ok(text) => Some(SecureString::new(text)),
            Err(err) => {
                let mut bytes = err.into_bytes();
                bytes.zeroize();
                None
            }
        }
    }
}

impl Scrub for SecureBytes {
    fn scrub(&mut self) {
        self.inner.zeroize();
    }
}

impl Deref for SecureBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

// Don't print the contents in Debug output
impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBytes")
            .field("len", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secure_string_creation() {
        let s = SecureString::new("test");
        assert_eq!(s.as_str(), "test");
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_secure_string_debug_and_display_redact() {
        let s = SecureString::new("secret");
        let debug = format!("{:?}", s);
        let display = format!("{}", s);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("SecureString"));
        assert!(!display.contains("secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_secure_string_scrub() {
        let mut s = SecureString::new("的故事");
        scrub(&mut s);
        assert!(s.is_empty());
    }

    #[test]
    fn test_secure_bytes_scrub() {
        let mut b = SecureBytes::new(vec![1, 2, 3]);
        scrub(&mut b);
        assert!(b.is_empty());
    }

    #[test]
    fn test_secure_bytes_into_string() {
        let b = SecureBytes::new("小明".as_bytes().to_vec());
        let s = b.into_secure_string().unwrap();
        assert_eq!(s.as_str(), "小明");
    }

    #[test]
    fn test_secure_bytes_invalid_utf8() {
        let b = SecureBytes::new(vec![0xff, 0xfe, 0x00]);
        assert!(b.into_secure_string().is_none());
    }

    #[test]
    fn test_scrub_json_tree() {
        let mut value = json!({
            "name": "Ann",
            "tags": ["a", "b"],
            "nested": { "token": "t" },
            "count": 3
        });
        scrub(&mut value);
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_scrub_option() {
        let mut maybe = Some(String::from("token"));
        scrub(&mut maybe);
        assert!(maybe.is_none());
    }
}
