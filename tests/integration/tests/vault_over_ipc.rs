//! Credential vault reached through the bridge.

use easyfi_integration_tests::{headless_config, start_default, start_host};
use easyfi_vault::{FileVault, Vault};
use std::sync::Arc;
use tempfile::TempDir;
use zeroize::Zeroizing;

#[tokio::test]
async fn test_vault_lifecycle_over_bridge() {
    let host = start_default().await;
    let client = host.connect().await;
    let storage = client.secure_storage();

    assert_eq!(storage.get("wallet.mnemonic").await.unwrap(), None);
    assert!(!storage.has("wallet.mnemonic").await.unwrap());

    storage
        .set("wallet.mnemonic", "abandon ability able")
        .await
        .unwrap();
    assert!(storage.has("wallet.mnemonic").await.unwrap());
    assert_eq!(
        storage.get("wallet.mnemonic").await.unwrap().as_deref(),
        Some("abandon ability able")
    );

    storage.set("wallet.mnemonic", "rotated").await.unwrap();
    assert_eq!(
        storage.get("wallet.mnemonic").await.unwrap().as_deref(),
        Some("rotated")
    );

    storage.delete("wallet.mnemonic").await.unwrap();
    assert!(!storage.has("wallet.mnemonic").await.unwrap());
    assert_eq!(storage.get("wallet.mnemonic").await.unwrap(), None);

    // deleting an absent key is not an error
    storage.delete("wallet.mnemonic").await.unwrap();

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_empty_value_is_stored() {
    let host = start_default().await;
    let client = host.connect().await;
    let storage = client.secure_storage();

    storage.set("pin", "").await.unwrap();
    assert!(storage.has("pin").await.unwrap());
    assert_eq!(storage.get("pin").await.unwrap().as_deref(), Some(""));

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_requests_are_answered_in_order() {
    let host = start_default().await;
    let client = host.connect().await;
    let storage = client.secure_storage();

    let (set, get) = tokio::join!(storage.set("k", "v1"), storage.get("k"));
    set.unwrap();
    assert_eq!(get.unwrap().as_deref(), Some("v1"));

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_two_connections_share_the_vault() {
    let host = start_default().await;
    let first = host.connect().await;
    let second = host.connect().await;

    first.secure_storage().set("shared", "yes").await.unwrap();
    assert!(second.secure_storage().has("shared").await.unwrap());

    first.close().await;
    second.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_memory_vault_is_volatile_across_hosts() {
    let host = start_default().await;
    let client = host.connect().await;
    client.secure_storage().set("session", "abc").await.unwrap();
    client.close().await;
    host.shutdown().await;

    let host = start_default().await;
    let client = host.connect().await;
    assert!(!client.secure_storage().has("session").await.unwrap());
    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_file_vault_survives_restart() {
    let dir = TempDir::new().unwrap();
    let key = || Zeroizing::new(vec![7u8; 32]);

    let vault: Arc<dyn Vault> = Arc::new(FileVault::new(dir.path().to_path_buf(), key()));
    let host = start_host(headless_config(), Some(vault)).await;
    let client = host.connect().await;
    client
        .secure_storage()
        .set("wallet.key", "0xdeadbeef")
        .await
        .unwrap();
    client.close().await;
    host.shutdown().await;

    let vault: Arc<dyn Vault> = Arc::new(FileVault::new(dir.path().to_path_buf(), key()));
    let host = start_host(headless_config(), Some(vault)).await;
    let client = host.connect().await;
    assert_eq!(
        client
            .secure_storage()
            .get("wallet.key")
            .await
            .unwrap()
            .as_deref(),
        Some("0xdeadbeef")
    );
    client.close().await;
    host.shutdown().await;
}
