//! Value encryption for kvault.
//!
//! Values are protected at rest by a compress-then-encrypt pipeline:
//! deflate at best compression, then AES-256-GCM under a key derived
//! from the logical storage key with PBKDF2. The encoded form is
//! `base64(nonce || ciphertext || tag)`.
//!
//! ## Security Model
//!
//! - AES-256-GCM authenticated encryption, unique nonce per operation
//! - Tampering fails the whole decryption - never partial plaintext
//! - Derived keys are cached (bounded, LRU) and zeroized on eviction
//! - Oversized inputs are rejected before any cryptographic work
//!
//! The pipeline is exception-opaque: every failure is logged, counted,
//! and surfaced as `None`.

mod aead;

pub use aead::{AeadPipeline, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

use async_trait::async_trait;

/// A pluggable value-encryption strategy.
///
/// Implementations never panic and never propagate errors: a failed
/// operation yields `None`. [`PlainText`] is a drop-in passthrough for
/// tests and performance-sensitive callers; [`AeadPipeline`] is the
/// production pipeline.
#[async_trait]
pub trait Encryption: Send + Sync {
    /// Encrypts `plaintext` under a key derived from `raw_key`.
    ///
    /// Returns the encoded ciphertext, or `None` on validation or
    /// crypto failure.
    async fn encrypt(&self, raw_key: &str, plaintext: &str) -> Option<String>;

    /// Decrypts a value produced by [`Encryption::encrypt`].
    ///
    /// Returns the plaintext, or `None` if the input is malformed,
    /// oversized, or fails authentication.
    async fn decrypt(&self, raw_key: &str, encoded: &str) -> Option<String>;
}

/// Passthrough strategy that stores values verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl PlainText {
    /// Creates a passthrough strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Encryption for PlainText {
    async fn encrypt(&self, _raw_key: &str, plaintext: &str) -> Option<String> {
        Some(plaintext.to_owned())
    }

    async fn decrypt(&self, _raw_key: &str, encoded: &str) -> Option<String> {
        Some(encoded.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plaintext_is_identity() {
        let strategy = PlainText::new();
        let out = strategy.encrypt("key1", "value").await.unwrap();
        assert_eq!(out, "value");
        let back = strategy.decrypt("key1", &out).await.unwrap();
        assert_eq!(back, "value");
    }

    #[tokio::test]
    async fn plaintext_accepts_empty() {
        let strategy = PlainText::new();
        assert_eq!(strategy.encrypt("key1", "").await.as_deref(), Some(""));
    }
}
