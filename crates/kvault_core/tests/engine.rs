//! End-to-end engine tests: put through the full pipeline, flush, and
//! read back.

use kvault_core::{
    CoreError, EncryptionMode, MemoryRowStore, RowStore, Vault, VaultConfig,
};
use std::sync::Arc;
use std::time::Duration;

const FLUSH_WAIT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn plain_config() -> VaultConfig {
    VaultConfig::new()
        .name("engine-test")
        .encryption(EncryptionMode::Plain)
}

fn aead_config() -> VaultConfig {
    // Low iteration count keeps key derivation fast in tests.
    VaultConfig::new()
        .name("engine-test")
        .encryption(EncryptionMode::Aead)
        .kdf_iterations(1_000)
}

async fn roundtrip(vault: &Vault, key: &str, value: &str) {
    vault.put(key, value).await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();
    assert_eq!(vault.get(key).await.unwrap().as_deref(), Some(value));
}

#[tokio::test]
async fn roundtrip_across_value_sizes_plain() {
    init_tracing();
    let config = plain_config().max_chunk_size(64);
    let vault = Vault::open_in_memory(config).await.unwrap();

    // Zero bytes up to just past two chunk budgets.
    for len in [0usize, 1, 63, 64, 65, 127, 128, 129] {
        let value = "v".repeat(len);
        roundtrip(&vault, &format!("key-{len}"), &value).await;
    }
}

#[tokio::test]
async fn roundtrip_across_value_sizes_encrypted() {
    init_tracing();
    let config = aead_config().max_chunk_size(64);
    let vault = Vault::open_in_memory(config).await.unwrap();

    for len in [0usize, 1, 64, 129, 1_000] {
        let value = "s".repeat(len);
        roundtrip(&vault, &format!("secret-{len}"), &value).await;
    }
}

#[tokio::test]
async fn roundtrip_multibyte_values() {
    let vault = Vault::open_in_memory(plain_config().max_chunk_size(16)).await.unwrap();
    roundtrip(&vault, "unicode", "héllo wörld ☃☃☃ ありがとう").await;
}

#[tokio::test]
async fn chunking_writes_expected_rows() {
    let store = Arc::new(MemoryRowStore::new());
    let config = plain_config().max_chunk_size(10);
    let vault = Vault::new(config, store.clone());
    vault.initialize().await.unwrap();

    // 3.5 chunk budgets -> exactly 4 data rows plus one control row.
    let value = "x".repeat(35);
    vault.put("big", &value).await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();

    assert_eq!(store.get("big_chunks").unwrap().as_deref(), Some("4"));
    for index in 0..4 {
        assert!(store.get(&format!("big_chunk_{index}")).unwrap().is_some());
    }
    assert!(store.get("big_chunk_4").unwrap().is_none());
    assert_eq!(vault.count().await.unwrap(), 5);

    // Reassembly concatenates in index order.
    assert_eq!(vault.get("big").await.unwrap().as_deref(), Some(value.as_str()));
}

#[tokio::test]
async fn encrypted_values_are_not_stored_verbatim() {
    let store = Arc::new(MemoryRowStore::new());
    let vault = Vault::new(aead_config(), store.clone());
    vault.initialize().await.unwrap();

    vault.put("user.token", "super secret token").await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();

    let stored = store.get("user.token_chunk_0").unwrap().unwrap();
    assert!(!stored.contains("super secret token"));
    assert_eq!(
        vault.get("user.token").await.unwrap().as_deref(),
        Some("super secret token")
    );
}

#[tokio::test]
async fn oversize_value_is_rejected_before_any_write() {
    let store = Arc::new(MemoryRowStore::new());
    let mut config = aead_config();
    config.max_value_size = 32;
    let vault = Vault::new(config, store.clone());
    vault.initialize().await.unwrap();

    let oversized = "x".repeat(33);
    let result = vault.put("big.value", &oversized).await;
    assert!(matches!(result, Err(CoreError::Crypto { .. })));

    // Nothing reached the backend and the failure was counted.
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(vault.pending_writes(), 0);
    let stats = vault.stats();
    assert_eq!(stats.crypto_failures, 1);
    assert!(stats.failures >= 1);
}

#[tokio::test]
async fn tampered_stored_ciphertext_fails_to_read() {
    let store = Arc::new(MemoryRowStore::new());
    let vault = Vault::new(aead_config(), store.clone());
    vault.initialize().await.unwrap();

    vault.put("user.token", "secret").await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();

    // Corrupt one character of the stored base64 payload.
    let stored = store.get("user.token_chunk_0").unwrap().unwrap();
    let mut bytes = stored.into_bytes();
    bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).unwrap();
    store.put("user.token_chunk_0", &tampered).unwrap();

    let result = vault.get("user.token").await;
    assert!(matches!(result, Err(CoreError::Crypto { .. })));
}

#[tokio::test]
async fn last_write_wins_per_key() {
    let vault = Vault::open_in_memory(plain_config()).await.unwrap();

    vault.put("k", "a").await.unwrap();
    vault.put("k", "b").await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();

    assert_eq!(vault.get("k").await.unwrap().as_deref(), Some("b"));
}

#[tokio::test]
async fn shrinking_value_leaves_no_visible_garbage() {
    let store = Arc::new(MemoryRowStore::new());
    let vault = Vault::new(plain_config().max_chunk_size(4), store.clone());
    vault.initialize().await.unwrap();

    vault.put("k", "aaaabbbbcccc").await.unwrap(); // 3 chunks
    vault.flush(FLUSH_WAIT).await.unwrap();
    vault.put("k", "dddd").await.unwrap(); // 1 chunk
    vault.flush(FLUSH_WAIT).await.unwrap();

    // Stale data rows may remain physically, but the control entry
    // only points at the live chunks.
    assert_eq!(vault.get("k").await.unwrap().as_deref(), Some("dddd"));

    // A delete clears the control row and every chunk row.
    assert!(vault.delete("k").await.unwrap());
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(vault.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn delete_only_touches_matching_key() {
    let vault = Vault::open_in_memory(plain_config()).await.unwrap();

    vault.put("user", "u").await.unwrap();
    vault.put("user2", "u2").await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();

    assert!(vault.delete("user").await.unwrap());
    assert_eq!(vault.get("user").await.unwrap(), None);
    assert_eq!(vault.get("user2").await.unwrap().as_deref(), Some("u2"));
}

#[tokio::test]
async fn delete_all_clears_every_key() {
    let vault = Vault::open_in_memory(plain_config()).await.unwrap();

    vault.put("a", "1").await.unwrap();
    vault.put("b", "2").await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();

    assert!(vault.delete_all().await.unwrap());
    assert_eq!(vault.count().await.unwrap(), 0);
    assert_eq!(vault.get("a").await.unwrap(), None);
}

#[tokio::test]
async fn concurrent_puts_across_keys() {
    let vault = Arc::new(Vault::open_in_memory(plain_config()).await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..32 {
        let v = Arc::clone(&vault);
        tasks.push(tokio::spawn(async move {
            v.put(&format!("key-{i}"), &format!("value-{i}")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    vault.flush(FLUSH_WAIT).await.unwrap();

    for i in 0..32 {
        assert_eq!(
            vault.get(&format!("key-{i}")).await.unwrap().as_deref(),
            Some(format!("value-{i}").as_str())
        );
    }
}

#[tokio::test]
async fn sqlite_vault_persists_across_reopen() {
    let dir = tempfile::TempDir::new().unwrap();

    {
        let vault = Vault::open_at(dir.path(), aead_config()).await.unwrap();
        vault.put("user.profile", "persisted secret").await.unwrap();
        vault.flush(FLUSH_WAIT).await.unwrap();
        vault.shutdown().await.unwrap();
    }

    let vault = Vault::open_at(dir.path(), aead_config()).await.unwrap();
    assert_eq!(
        vault.get("user.profile").await.unwrap().as_deref(),
        Some("persisted secret")
    );
}

#[tokio::test]
async fn terminate_erases_sqlite_artifact() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = plain_config();
    let artifact = dir.path().join(config.artifact_name());

    let vault = Vault::open_at(dir.path(), config).await.unwrap();
    vault.put("k", "v").await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();
    assert!(artifact.exists());

    vault.terminate().await.unwrap();
    assert!(!artifact.exists());
}

#[tokio::test]
async fn stats_track_operations() {
    let vault = Vault::open_in_memory(plain_config()).await.unwrap();

    vault.put("a", "1").await.unwrap();
    vault.flush(FLUSH_WAIT).await.unwrap();
    vault.get("a").await.unwrap();
    vault.delete("a").await.unwrap();

    let stats = vault.stats();
    assert_eq!(stats.puts, 1);
    assert_eq!(stats.gets, 1);
    assert_eq!(stats.deletes, 1);
    assert!(stats.flushes >= 1);
}
