//! `secure-storage:*` handlers.

use crate::Result;
use easyfi_core::SecretString;
use easyfi_vault::Vault;
use serde_json::Value;
use tracing::debug;

/// The stored value, or `null` when the key is absent.
pub async fn get(vault: &dyn Vault, key: &str) -> Result<Value> {
    let value = vault.get(key).await?;
    debug!(hit = value.is_some(), "secure-storage:get");
    Ok(value
        .map(|secret| Value::String(secret.into_plain()))
        .unwrap_or(Value::Null))
}

pub async fn set(vault: &dyn Vault, key: &str, value: SecretString) -> Result<Value> {
    vault.set(key, value).await?;
    Ok(Value::Null)
}

pub async fn delete(vault: &dyn Vault, key: &str) -> Result<Value> {
    vault.delete(key).await?;
    Ok(Value::Null)
}

pub async fn has(vault: &dyn Vault, key: &str) -> Result<Value> {
    Ok(Value::Bool(vault.has(key).await?))
}
