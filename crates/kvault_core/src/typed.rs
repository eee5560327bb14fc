//! Typed access to logical keys.
//!
//! A [`ValueCodec`] binds a Rust type to the string values the vault
//! stores, and a [`TypedKey`] binds a logical key to a codec. Decoding
//! returns a typed `Result` - there are no unchecked casts anywhere in
//! the read path.

use crate::error::{CoreError, CoreResult};
use crate::vault::Vault;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Encodes and decodes values of type `T` to the vault's string form.
pub trait ValueCodec<T>: Send + Sync {
    /// Encodes a value for storage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] when the value cannot be encoded.
    fn encode(&self, value: &T) -> CoreResult<String>;

    /// Decodes a stored value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] when the stored string does not
    /// decode to `T`.
    fn decode(&self, raw: &str) -> CoreResult<T>;
}

/// JSON codec for any `serde` type.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates a JSON codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T> ValueCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, value: &T) -> CoreResult<String> {
        serde_json::to_string(value).map_err(|e| CoreError::codec(format!("encode failed: {e}")))
    }

    fn decode(&self, raw: &str) -> CoreResult<T> {
        serde_json::from_str(raw).map_err(|e| CoreError::codec(format!("decode failed: {e}")))
    }
}

/// A logical key bound to a value type and codec.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Profile { name: String }
///
/// let profile_key: TypedKey<Profile> = TypedKey::json("user.profile");
/// profile_key.store(&vault, &Profile { name: "alice".into() }).await?;
/// let loaded = profile_key.load(&vault).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TypedKey<T, C = JsonCodec> {
    key: String,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedKey<T, JsonCodec>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Binds `key` to `T` through the JSON codec.
    #[must_use]
    pub fn json(key: impl Into<String>) -> Self {
        Self::new(key, JsonCodec::new())
    }
}

impl<T, C> TypedKey<T, C>
where
    C: ValueCodec<T>,
{
    /// Binds `key` to `T` through `codec`.
    #[must_use]
    pub fn new(key: impl Into<String>, codec: C) -> Self {
        Self {
            key: key.into(),
            codec,
            _marker: PhantomData,
        }
    }

    /// Returns the logical key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Encodes and stores a value.
    ///
    /// # Errors
    ///
    /// Returns a codec error or any error from [`Vault::put`].
    pub async fn store(&self, vault: &Vault, value: &T) -> CoreResult<()> {
        let encoded = self.codec.encode(value)?;
        vault.put(&self.key, &encoded).await
    }

    /// Loads and decodes the value, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns a codec error or any error from [`Vault::get`].
    pub async fn load(&self, vault: &Vault) -> CoreResult<Option<T>> {
        match vault.get(&self.key).await? {
            None => Ok(None),
            Some(raw) => self.codec.decode(&raw).map(Some),
        }
    }

    /// Deletes the value.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Vault::delete`].
    pub async fn clear(&self, vault: &Vault) -> CoreResult<bool> {
        vault.delete(&self.key).await
    }
}
