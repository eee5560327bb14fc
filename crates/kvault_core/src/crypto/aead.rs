//! AES-256-GCM pipeline with compression and derived-key caching.

use crate::config::VaultConfig;
use crate::error::{CoreError, CoreResult};
use crate::stats::VaultStats;
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lru::LruCache;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::Sha256;
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;
use zeroize::Zeroizing;

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Input bounds enforced before any cryptographic work.
#[derive(Debug, Clone, Copy)]
struct Limits {
    min_key_length: usize,
    max_key_length: usize,
    max_value_size: usize,
    max_compressed_size: usize,
}

/// The production crypto pipeline: deflate, then AES-256-GCM, then
/// base64.
///
/// Keys are derived from the logical storage key with
/// PBKDF2-HMAC-SHA256 under a fixed application salt; derived keys are
/// cached in a bounded LRU so the deliberately slow derivation runs
/// once per distinct key. A cache miss always recomputes - correctness
/// never depends on cache residency.
///
/// # Concurrency
///
/// Safe for concurrent use. CPU-heavy work runs on the blocking pool,
/// bounded by a crypto-only semaphore so slow derivations cannot starve
/// backend I/O, and every operation is awaited with a timeout.
pub struct AeadPipeline {
    limits: Limits,
    kdf_iterations: u32,
    kdf_salt: Vec<u8>,
    operation_timeout: Duration,
    key_cache: Mutex<LruCache<String, Zeroizing<[u8; KEY_SIZE]>>>,
    permits: Semaphore,
    stats: Arc<VaultStats>,
}

impl AeadPipeline {
    /// Creates a pipeline from the vault configuration.
    #[must_use]
    pub fn new(config: &VaultConfig, stats: Arc<VaultStats>) -> Self {
        let cache_size = NonZeroUsize::new(config.max_key_cache_size.max(1))
            .expect("cache size is at least one");
        Self {
            limits: Limits {
                min_key_length: config.min_key_length,
                max_key_length: config.max_key_length,
                max_value_size: config.max_value_size,
                max_compressed_size: config.max_compressed_size,
            },
            kdf_iterations: config.kdf_iterations,
            kdf_salt: config.kdf_salt.clone(),
            operation_timeout: config.operation_timeout,
            key_cache: Mutex::new(LruCache::new(cache_size)),
            permits: Semaphore::new(config.crypto_permits.max(1)),
            stats,
        }
    }

    /// Number of derived keys currently cached.
    #[must_use]
    pub fn cached_keys(&self) -> usize {
        self.key_cache.lock().len()
    }

    fn validate_key(&self, raw_key: &str) -> CoreResult<()> {
        let length = raw_key.chars().count();
        if length == 0 {
            return Err(CoreError::validation("key is empty"));
        }
        if length < self.limits.min_key_length {
            return Err(CoreError::validation(format!(
                "key too short ({length} < {})",
                self.limits.min_key_length
            )));
        }
        if length > self.limits.max_key_length {
            return Err(CoreError::validation(format!(
                "key too long ({length} > {})",
                self.limits.max_key_length
            )));
        }
        Ok(())
    }

    /// Fetches the derived key from the cache, deriving it on a miss.
    async fn derived_key(&self, raw_key: &str) -> CoreResult<Zeroizing<[u8; KEY_SIZE]>> {
        if let Some(key) = self.key_cache.lock().get(raw_key) {
            return Ok(key.clone());
        }

        let key = raw_key.to_owned();
        let salt = self.kdf_salt.clone();
        let iterations = self.kdf_iterations;
        let derived = tokio::task::spawn_blocking(move || derive_key(&key, &salt, iterations))
            .await
            .map_err(|e| CoreError::crypto(format!("key derivation task failed: {e}")))?;

        self.key_cache
            .lock()
            .put(raw_key.to_owned(), derived.clone());
        Ok(derived)
    }

    async fn encrypt_impl(&self, raw_key: &str, plaintext: &str) -> CoreResult<String> {
        self.validate_key(raw_key)?;
        if plaintext.is_empty() {
            return Err(CoreError::validation("value is empty"));
        }
        if plaintext.len() > self.limits.max_value_size {
            return Err(CoreError::validation(format!(
                "value too large ({} > {} bytes)",
                plaintext.len(),
                self.limits.max_value_size
            )));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CoreError::crypto("crypto pool closed"))?;

        let work = async {
            let derived = self.derived_key(raw_key).await?;
            let value = plaintext.to_owned();
            let max_compressed = self.limits.max_compressed_size;
            tokio::task::spawn_blocking(move || seal(&derived, value.as_bytes(), max_compressed))
                .await
                .map_err(|e| CoreError::crypto(format!("encryption task failed: {e}")))?
        };

        tokio::time::timeout(self.operation_timeout, work)
            .await
            .map_err(|_| CoreError::timeout("encrypt", self.operation_timeout))?
    }

    async fn decrypt_impl(&self, raw_key: &str, encoded: &str) -> CoreResult<String> {
        self.validate_key(raw_key)?;
        if encoded.is_empty() {
            return Err(CoreError::validation("value is empty"));
        }

        let decoded = BASE64
            .decode(encoded)
            .map_err(|_| CoreError::validation("value is not valid base64"))?;
        if decoded.len() > self.limits.max_compressed_size {
            return Err(CoreError::validation(format!(
                "encoded value too large ({} > {} bytes)",
                decoded.len(),
                self.limits.max_compressed_size
            )));
        }
        if decoded.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::crypto("ciphertext too short"));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CoreError::crypto("crypto pool closed"))?;

        let work = async {
            let derived = self.derived_key(raw_key).await?;
            let max_plain = self.limits.max_value_size;
            tokio::task::spawn_blocking(move || open(&derived, &decoded, max_plain))
                .await
                .map_err(|e| CoreError::crypto(format!("decryption task failed: {e}")))?
        };

        tokio::time::timeout(self.operation_timeout, work)
            .await
            .map_err(|_| CoreError::timeout("decrypt", self.operation_timeout))?
    }
}

#[async_trait]
impl super::Encryption for AeadPipeline {
    async fn encrypt(&self, raw_key: &str, plaintext: &str) -> Option<String> {
        self.stats.record_encryption();
        match self.encrypt_impl(raw_key, plaintext).await {
            Ok(encoded) => Some(encoded),
            Err(error) => {
                warn!(%error, "encryption failed");
                self.stats.record_crypto_failure();
                None
            }
        }
    }

    async fn decrypt(&self, raw_key: &str, encoded: &str) -> Option<String> {
        self.stats.record_decryption();
        match self.decrypt_impl(raw_key, encoded).await {
            Ok(plaintext) => Some(plaintext),
            Err(error) => {
                warn!(%error, "decryption failed");
                self.stats.record_crypto_failure();
                None
            }
        }
    }
}

impl std::fmt::Debug for AeadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadPipeline")
            .field("kdf_iterations", &self.kdf_iterations)
            .field("key_cache", &"[REDACTED]")
            .finish()
    }
}

/// Derives a 256-bit key from `raw_key` with PBKDF2-HMAC-SHA256.
fn derive_key(raw_key: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut derived = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(raw_key.as_bytes(), salt, iterations, &mut *derived);
    derived
}

/// Compresses, encrypts, and encodes a plaintext.
///
/// Output format: `base64(nonce || ciphertext || tag)`.
fn seal(derived: &[u8; KEY_SIZE], plaintext: &[u8], max_compressed: usize) -> CoreResult<String> {
    let compressed = compress(plaintext)?;
    if compressed.len() > max_compressed {
        return Err(CoreError::validation(format!(
            "compressed value too large ({} > {max_compressed} bytes)",
            compressed.len()
        )));
    }

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new(GenericArray::from_slice(derived));
    let ciphertext = cipher
        .encrypt(nonce, compressed.as_slice())
        .map_err(|_| CoreError::crypto("encryption error"))?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend(ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypts and decompresses a value produced by [`seal`].
///
/// Authentication failure aborts the whole operation; the inflated
/// size is bounded by `max_plain` as a decompression-bomb guard.
fn open(derived: &[u8; KEY_SIZE], decoded: &[u8], max_plain: usize) -> CoreResult<String> {
    let nonce = Nonce::from_slice(&decoded[..NONCE_SIZE]);
    let encrypted = &decoded[NONCE_SIZE..];

    let cipher = Aes256Gcm::new(GenericArray::from_slice(derived));
    let compressed = cipher
        .decrypt(nonce, encrypted)
        .map_err(|_| CoreError::crypto("authentication failed"))?;

    let plaintext = decompress(&compressed, max_plain)?;
    String::from_utf8(plaintext).map_err(|_| CoreError::crypto("plaintext is not valid UTF-8"))
}

fn compress(data: &[u8]) -> CoreResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| CoreError::crypto(format!("compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CoreError::crypto(format!("compression failed: {e}")))
}

fn decompress(data: &[u8], max_out: usize) -> CoreResult<Vec<u8>> {
    let mut output = Vec::new();
    let mut decoder = ZlibDecoder::new(data).take(max_out as u64 + 1);
    decoder
        .read_to_end(&mut output)
        .map_err(|e| CoreError::crypto(format!("decompression failed: {e}")))?;
    if output.len() > max_out {
        return Err(CoreError::crypto(format!(
            "decompressed value exceeds {max_out} bytes"
        )));
    }
    Ok(output)
}
