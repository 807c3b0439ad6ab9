//! The operation whitelist as seen from an untrusted UI.

use easyfi_broker::platform::app::platform_name;
use easyfi_broker::platform::{Clipboard, ShellCall};
use easyfi_broker::{BridgeClient, BridgeError, OperationKind};
use easyfi_integration_tests::{start_default, TEST_VERSION};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

fn rejected_kind(err: &BridgeError) -> &str {
    err.kind().unwrap_or("none")
}

#[tokio::test]
async fn test_unknown_operation_is_rejected() {
    let host = start_default().await;
    let client = host.connect().await;

    for method in ["window:destroy", "fs:readFile", "secure-storage:list", ""] {
        let err = client.call(method, vec![]).await.unwrap_err();
        assert_eq!(rejected_kind(&err), "UnknownOperation", "method {method:?}");
        assert!(matches!(err, BridgeError::Rejected { code: -32601, .. }));
    }

    // the connection stays usable after a rejection
    assert_eq!(client.app().version().await.unwrap(), TEST_VERSION);

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_malformed_arguments_are_rejected() {
    let host = start_default().await;
    let client = host.connect().await;

    let cases: Vec<(&str, Vec<Value>)> = vec![
        ("secure-storage:get", vec![]),
        ("secure-storage:get", vec![json!(42)]),
        ("secure-storage:set", vec![json!("only-key")]),
        ("secure-storage:set", vec![json!("k"), json!({ "v": 1 })]),
        ("secure-storage:has", vec![json!("a"), json!("b")]),
        ("clipboard:write", vec![json!(null)]),
        ("app:version", vec![json!("extra")]),
        ("shell:openPath", vec![json!(["/tmp"])]),
    ];

    for (method, args) in cases {
        let err = client.call(method, args.clone()).await.unwrap_err();
        assert_eq!(
            rejected_kind(&err),
            "InvalidArgument",
            "{method} with {args:?}"
        );
    }

    // nothing was written by the rejected set
    assert!(!client.secure_storage().has("k").await.unwrap());

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_every_listed_operation_is_reachable() {
    let host = start_default().await;
    let client = host.connect().await;

    for kind in OperationKind::ALL {
        let err = match client.call(kind.name(), vec![json!(1), json!(2), json!(3)]).await {
            Ok(_) => continue,
            Err(e) => e,
        };
        assert_ne!(rejected_kind(&err), "UnknownOperation", "{kind}");
    }

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let host = start_default().await;
    let session = host.session();

    let err = BridgeClient::connect(&session.url, "not-a-token")
        .await
        .err()
        .expect("connection refused");
    assert!(matches!(err, BridgeError::Unauthorized));

    let err = BridgeClient::connect(&session.url, "")
        .await
        .err()
        .expect("connection refused");
    assert!(matches!(err, BridgeError::Unauthorized));

    host.shutdown().await;
}

#[tokio::test]
async fn test_app_identity() {
    let host = start_default().await;
    let client = host.connect().await;

    assert_eq!(client.app().version().await.unwrap(), TEST_VERSION);
    assert_eq!(
        client.app().platform().await.unwrap(),
        platform_name(std::env::consts::OS)
    );

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_clipboard_roundtrip() {
    let host = start_default().await;
    let client = host.connect().await;

    assert_eq!(client.clipboard().read_text().await.unwrap(), "");
    client
        .clipboard()
        .write_text("0x71C7656EC7ab88b098defB751B7401B5f6d8976F")
        .await
        .unwrap();
    assert_eq!(
        client.clipboard().read_text().await.unwrap(),
        "0x71C7656EC7ab88b098defB751B7401B5f6d8976F"
    );
    assert_eq!(
        host.clipboard.read_text().await.unwrap().expose_secret(),
        "0x71C7656EC7ab88b098defB751B7401B5f6d8976F"
    );

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_open_external_allows_only_listed_schemes() {
    let host = start_default().await;
    let client = host.connect().await;

    client
        .shell()
        .open_external("https://etherscan.io/tx/0x1")
        .await
        .unwrap();

    for url in [
        "file:///etc/passwd",
        "javascript:alert(1)",
        "not a url",
    ] {
        let err = client.shell().open_external(url).await.unwrap_err();
        assert_eq!(rejected_kind(&err), "InvalidArgument", "{url}");
    }

    assert_eq!(
        host.shell.calls(),
        vec![ShellCall::External("https://etherscan.io/tx/0x1".to_string())]
    );

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_open_external_reports_launcher_failure() {
    let host = start_default().await;
    let client = host.connect().await;

    host.shell.fail_with("no handler for https");
    let err = client
        .shell()
        .open_external("https://easyfi.io/help")
        .await
        .unwrap_err();
    assert_eq!(rejected_kind(&err), "OSOperationFailed");

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_open_path_returns_status_string() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("export.csv");
    std::fs::write(&export, "tx,amount\n").unwrap();

    let host = start_default().await;
    let client = host.connect().await;

    let status = client
        .shell()
        .open_path(&export.to_string_lossy())
        .await
        .unwrap();
    assert_eq!(status, "");

    let missing = dir.path().join("missing.csv");
    let status = client
        .shell()
        .open_path(&missing.to_string_lossy())
        .await
        .unwrap();
    assert!(status.starts_with("Failed to open path"), "{status}");

    let status = client.shell().open_path("").await.unwrap();
    assert!(status.starts_with("Failed to open path"), "{status}");

    assert_eq!(host.shell.calls(), vec![ShellCall::Path(PathBuf::from(&export))]);

    client.close().await;
    host.shutdown().await;
}
