//! The [`Vault`] trait and the in-memory reference backend.

use std::collections::HashMap;

use async_trait::async_trait;
use easyfi_core::SecretString;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::types::DecryptedSecret;

/// Associative store for secret key/value pairs.
///
/// Keys are arbitrary strings and unique within a vault (last write wins).
/// There is no size or content validation on keys or values: the vault is a
/// minimal contract and callers that need limits enforce them upstream.
///
/// - `get` of a missing key is `Ok(None)`, never an error.
/// - `delete` of a missing key is a no-op.
/// - `set` with an identical value is observably identical to a single `set`.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Look up a value.
    async fn get(&self, key: &str) -> Result<Option<DecryptedSecret>>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: SecretString) -> Result<()>;

    /// Remove a value if present.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check presence without exposing the value.
    async fn has(&self, key: &str) -> Result<bool>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;
}

/// Volatile vault living only as long as the host process.
///
/// Every operation is total: none of them can fail.
#[derive(Default)]
pub struct MemoryVault {
    entries: RwLock<HashMap<String, SecretString>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn get(&self, key: &str) -> Result<Option<DecryptedSecret>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned().map(DecryptedSecret::from))
    }

    async fn set(&self, key: &str, value: SecretString) -> Result<()> {
        let mut entries = self.entries.write().await;
        let replaced = entries.insert(key.to_string(), value).is_some();
        debug!(replaced, "vault entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(key).is_some();
        debug!(removed, "vault entry deleted");
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(v: &str) -> SecretString {
        SecretString::new(v)
    }

    #[tokio::test]
    async fn test_wallet_key_lifecycle() {
        let vault = MemoryVault::new();

        vault.set("pk_1", secret("abc")).await.unwrap();
        assert!(vault.has("pk_1").await.unwrap());
        assert_eq!(vault.get("pk_1").await.unwrap().unwrap().expose(), "abc");

        vault.delete("pk_1").await.unwrap();
        assert!(vault.get("pk_1").await.unwrap().is_none());
        assert!(!vault.has("pk_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_is_absent() {
        let vault = MemoryVault::new();
        assert!(vault.get("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let vault = MemoryVault::new();
        vault.set("k", secret("old")).await.unwrap();
        vault.set("k", secret("new")).await.unwrap();

        assert_eq!(vault.get("k").await.unwrap().unwrap().expose(), "new");
        assert_eq!(vault.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_twice_matches_delete_once() {
        let vault = MemoryVault::new();
        vault.set("a", secret("1")).await.unwrap();
        vault.set("b", secret("2")).await.unwrap();

        vault.delete("a").await.unwrap();
        vault.delete("a").await.unwrap();

        assert!(!vault.has("a").await.unwrap());
        assert!(vault.has("b").await.unwrap());
        assert_eq!(vault.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let vault = MemoryVault::new();
        vault.delete("ghost").await.unwrap();
        assert_eq!(vault.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repeated_identical_set() {
        let vault = MemoryVault::new();
        vault.set("k", secret("v")).await.unwrap();
        vault.set("k", secret("v")).await.unwrap();

        assert_eq!(vault.len().await.unwrap(), 1);
        assert_eq!(vault.get("k").await.unwrap().unwrap().expose(), "v");
    }

    #[tokio::test]
    async fn test_arbitrary_keys_and_empty_values() {
        let vault = MemoryVault::new();
        let odd_key = "../../etc/passwd \u{1F511} with spaces";
        vault.set(odd_key, secret("")).await.unwrap();
        vault.set("", secret("empty key")).await.unwrap();

        assert_eq!(vault.get(odd_key).await.unwrap().unwrap().expose(), "");
        assert_eq!(vault.get("").await.unwrap().unwrap().expose(), "empty key");
    }
}
