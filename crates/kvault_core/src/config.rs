//! Vault configuration.

use std::time::Duration;

/// Default application-level salt for key derivation.
///
/// One fixed salt is shared by every derived key, matching the layout
/// of existing vaults. Deployments can override it per installation
/// via [`VaultConfig::kdf_salt`].
pub const DEFAULT_KDF_SALT: &[u8] = b"kvault.kdf.v1";

/// Which crypto pipeline a vault runs its values through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMode {
    /// Compress and encrypt values at rest (AES-256-GCM).
    #[default]
    Aead,
    /// Store values verbatim. A drop-in passthrough for tests and
    /// performance-sensitive callers.
    Plain,
}

/// Configuration for opening a vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Logical name of the vault; part of the instance identity.
    pub name: String,

    /// Schema version of the vault; part of the instance identity.
    pub version: u32,

    /// Which crypto pipeline to use.
    pub encryption: EncryptionMode,

    /// Maximum encoded bytes per stored chunk row.
    pub max_chunk_size: usize,

    /// Maximum chunks a single logical value may produce.
    pub max_chunks_per_key: u32,

    /// Maximum entries the write-behind schedule queue may hold.
    pub max_schedule_size: usize,

    /// Time bound for a single backend operation.
    pub db_operation_timeout: Duration,

    /// Time bound for a single encrypt/decrypt operation.
    pub operation_timeout: Duration,

    /// Maximum plaintext size accepted for encryption.
    pub max_value_size: usize,

    /// Maximum decoded ciphertext size accepted for decryption.
    pub max_compressed_size: usize,

    /// PBKDF2 iteration count for key derivation.
    pub kdf_iterations: u32,

    /// Application-level salt for key derivation.
    pub kdf_salt: Vec<u8>,

    /// Minimum accepted raw key length.
    pub min_key_length: usize,

    /// Maximum accepted raw key length.
    pub max_key_length: usize,

    /// Maximum entries in the derived-key cache.
    pub max_key_cache_size: usize,

    /// Maximum concurrent in-flight backend operations.
    pub db_permits: usize,

    /// Maximum concurrent in-flight crypto operations.
    pub crypto_permits: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            name: "vault".to_owned(),
            version: 1,
            encryption: EncryptionMode::Aead,
            max_chunk_size: 5_000,
            max_chunks_per_key: 1_000,
            max_schedule_size: 1_000,
            db_operation_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(60),
            max_value_size: 50 * 1024 * 1024,       // 50 MiB
            max_compressed_size: 100 * 1024 * 1024, // 100 MiB
            kdf_iterations: 100_000,
            kdf_salt: DEFAULT_KDF_SALT.to_vec(),
            min_key_length: 4,
            max_key_length: 1_000,
            max_key_cache_size: 1_000,
            db_permits: 50,
            crypto_permits: 4,
        }
    }
}

impl VaultConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vault name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the vault version.
    #[must_use]
    pub const fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sets the crypto pipeline.
    #[must_use]
    pub const fn encryption(mut self, mode: EncryptionMode) -> Self {
        self.encryption = mode;
        self
    }

    /// Sets the maximum encoded bytes per chunk row.
    #[must_use]
    pub const fn max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    /// Sets the maximum chunks per logical value.
    #[must_use]
    pub const fn max_chunks_per_key(mut self, count: u32) -> Self {
        self.max_chunks_per_key = count;
        self
    }

    /// Sets the schedule queue bound.
    #[must_use]
    pub const fn max_schedule_size(mut self, size: usize) -> Self {
        self.max_schedule_size = size;
        self
    }

    /// Sets the backend operation time bound.
    #[must_use]
    pub const fn db_operation_timeout(mut self, timeout: Duration) -> Self {
        self.db_operation_timeout = timeout;
        self
    }

    /// Sets the crypto operation time bound.
    #[must_use]
    pub const fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets the PBKDF2 iteration count.
    #[must_use]
    pub const fn kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    /// Sets the key-derivation salt.
    #[must_use]
    pub fn kdf_salt(mut self, salt: impl Into<Vec<u8>>) -> Self {
        self.kdf_salt = salt.into();
        self
    }

    /// Sets the backend concurrency bound.
    #[must_use]
    pub const fn db_permits(mut self, permits: usize) -> Self {
        self.db_permits = permits;
        self
    }

    /// Sets the crypto concurrency bound.
    #[must_use]
    pub const fn crypto_permits(mut self, permits: usize) -> Self {
        self.crypto_permits = permits;
        self
    }

    /// Returns the identity string for this configuration.
    ///
    /// The identity is `{name}.{version}.{suffix}` where the suffix is
    /// derived from a hash of the name, so differently-named vaults
    /// never collide on the same storage artifact.
    #[must_use]
    pub fn instance_key(&self) -> String {
        format!("{}.{}.{}", self.name, self.version, name_suffix(&self.name))
    }

    /// Returns the file name for this configuration's storage artifact.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("{}.db", self.instance_key())
    }
}

/// Derives a short decimal suffix from the vault name.
fn name_suffix(name: &str) -> String {
    // FNV-1a, reversed decimal rendering, first two digits.
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    let digits: String = format!("{hash:02}").chars().rev().collect();
    digits[..2].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = VaultConfig::default();
        assert_eq!(config.max_chunk_size, 5_000);
        assert_eq!(config.max_chunks_per_key, 1_000);
        assert_eq!(config.kdf_iterations, 100_000);
        assert_eq!(config.db_permits, 50);
        assert_eq!(config.encryption, EncryptionMode::Aead);
    }

    #[test]
    fn builder_pattern() {
        let config = VaultConfig::new()
            .name("sessions")
            .version(3)
            .encryption(EncryptionMode::Plain)
            .max_chunk_size(128)
            .db_permits(4);

        assert_eq!(config.name, "sessions");
        assert_eq!(config.version, 3);
        assert_eq!(config.encryption, EncryptionMode::Plain);
        assert_eq!(config.max_chunk_size, 128);
        assert_eq!(config.db_permits, 4);
    }

    #[test]
    fn instance_key_is_stable_and_distinct() {
        let a = VaultConfig::new().name("alpha").instance_key();
        let a2 = VaultConfig::new().name("alpha").instance_key();
        let b = VaultConfig::new().name("beta").instance_key();

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert!(a.starts_with("alpha.1."));
    }

    #[test]
    fn version_changes_identity() {
        let v1 = VaultConfig::new().name("x").version(1).instance_key();
        let v2 = VaultConfig::new().name("x").version(2).instance_key();
        assert_ne!(v1, v2);
    }
}
