//! Vault instance registry.
//!
//! One vault instance exists per configuration identity (name plus
//! version). The registry owns that mapping explicitly - callers
//! receive shared handles via dependency injection instead of ambient
//! global state, and tear instances down explicitly.

use crate::config::VaultConfig;
use crate::error::CoreResult;
use crate::vault::Vault;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry of vault instances keyed by configuration identity.
///
/// # Example
///
/// ```rust,ignore
/// let registry = VaultRegistry::new("/var/lib/myapp");
/// let sessions = registry.open(VaultConfig::new().name("sessions")).await?;
/// let cache = registry.open(VaultConfig::new().name("cache")).await?;
/// ```
pub struct VaultRegistry {
    base_dir: PathBuf,
    vaults: Mutex<HashMap<String, Arc<Vault>>>,
}

impl VaultRegistry {
    /// Creates a registry storing its artifacts under `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            vaults: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the directory holding the storage artifacts.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the vault for `config`, opening it on first use.
    ///
    /// Two calls with the same configuration identity share one
    /// instance.
    ///
    /// # Errors
    ///
    /// Returns an error if a new vault cannot be opened.
    pub async fn open(&self, config: VaultConfig) -> CoreResult<Arc<Vault>> {
        let identity = config.instance_key();

        if let Some(existing) = self.vaults.lock().get(&identity) {
            return Ok(Arc::clone(existing));
        }

        let vault = Arc::new(Vault::open_at(&self.base_dir, config).await?);

        let mut vaults = self.vaults.lock();
        // A concurrent open may have won the race; keep the first.
        if let Some(existing) = vaults.get(&identity) {
            return Ok(Arc::clone(existing));
        }
        vaults.insert(identity, Arc::clone(&vault));
        Ok(vault)
    }

    /// Returns the vault registered under `identity`, if any.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<Arc<Vault>> {
        self.vaults.lock().get(identity).map(Arc::clone)
    }

    /// Removes a vault from the registry without closing it.
    pub fn remove(&self, identity: &str) -> Option<Arc<Vault>> {
        self.vaults.lock().remove(identity)
    }

    /// Shuts a vault down and removes it from the registry.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Vault::shutdown`].
    pub async fn close(&self, identity: &str) -> CoreResult<()> {
        if let Some(vault) = self.remove(identity) {
            vault.shutdown().await?;
        }
        Ok(())
    }

    /// Terminates a vault (irreversibly erasing its artifact) and
    /// removes it from the registry.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Vault::terminate`].
    pub async fn terminate(&self, identity: &str) -> CoreResult<()> {
        if let Some(vault) = self.remove(identity) {
            vault.terminate().await?;
        }
        Ok(())
    }

    /// Identities of every registered vault.
    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        self.vaults.lock().keys().cloned().collect()
    }
}

impl std::fmt::Debug for VaultRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultRegistry")
            .field("base_dir", &self.base_dir)
            .field("vaults", &self.identities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncryptionMode;
    use tempfile::TempDir;

    fn config(name: &str) -> VaultConfig {
        VaultConfig::new().name(name).encryption(EncryptionMode::Plain)
    }

    #[tokio::test]
    async fn same_identity_shares_one_instance() {
        let dir = TempDir::new().unwrap();
        let registry = VaultRegistry::new(dir.path());

        let a = registry.open(config("sessions")).await.unwrap();
        let b = registry.open(config("sessions")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_names_are_isolated() {
        let dir = TempDir::new().unwrap();
        let registry = VaultRegistry::new(dir.path());

        let sessions = registry.open(config("sessions")).await.unwrap();
        let cache = registry.open(config("cache")).await.unwrap();
        assert!(!Arc::ptr_eq(&sessions, &cache));

        sessions.put("k", "from sessions").await.unwrap();
        sessions.flush(std::time::Duration::from_secs(5)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn close_removes_from_registry() {
        let dir = TempDir::new().unwrap();
        let registry = VaultRegistry::new(dir.path());

        let vault = registry.open(config("sessions")).await.unwrap();
        let identity = vault.config().instance_key();

        registry.close(&identity).await.unwrap();
        assert!(registry.get(&identity).is_none());
    }

    #[tokio::test]
    async fn terminate_erases_artifact() {
        let dir = TempDir::new().unwrap();
        let registry = VaultRegistry::new(dir.path());

        let cfg = config("doomed");
        let artifact = dir.path().join(cfg.artifact_name());
        let vault = registry.open(cfg).await.unwrap();
        let identity = vault.config().instance_key();

        vault.put("k", "v").await.unwrap();
        assert!(artifact.exists());

        registry.terminate(&identity).await.unwrap();
        assert!(!artifact.exists());
        assert!(registry.get(&identity).is_none());
    }
}
