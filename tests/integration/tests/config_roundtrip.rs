//! Config save/load roundtrip integration tests.

use easyfi_core::config::{Config, VaultBackend};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("easyfi.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.ipc.port, config.ipc.port);
    assert_eq!(loaded.window.width, config.window.width);
    assert_eq!(loaded.window.height, config.window.height);
    assert_eq!(loaded.shell.allowed_schemes, config.shell.allowed_schemes);
    assert_eq!(loaded.vault.backend, config.vault.backend);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("easyfi.json5");

    let mut config = Config::default();
    config.ipc.port = 4100;
    config.vault.backend = VaultBackend::File;
    config.window.quit_on_last_closed = false;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.ipc.port, 4100);
    assert_eq!(loaded.vault.backend, VaultBackend::File);
    assert!(!loaded.window.quit_on_last_closed);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/easyfi.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}

#[test]
fn test_saved_config_drives_a_host() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("easyfi.json5");
    std::fs::write(
        &path,
        r#"{
            window: { headless: true, quit_on_last_closed: false },
            shell: { allowed_schemes: ["https"] },
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert!(config.validate().is_ok());

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let host = easyfi_integration_tests::start_host(config, None).await;
        let client = host.connect().await;
        let err = client
            .shell()
            .open_external("mailto:support@easyfi.io")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some("InvalidArgument"));
        client.close().await;
        host.shutdown().await;
    });
}
