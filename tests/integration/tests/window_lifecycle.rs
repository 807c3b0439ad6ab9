//! Window control, host notifications and application lifecycle.

use easyfi_broker::platform::ShellCall;
use easyfi_broker::window::STATE_CHANNEL;
use easyfi_broker::{BridgeClient, BridgeError};
use easyfi_integration_tests::{headless_config, start_default, start_host, TIMEOUT};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl Fn(&[Value]) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |args: &[Value]| {
        sink.lock().unwrap().extend(args.iter().cloned());
    })
}

async fn wait_closed(client: &BridgeClient) {
    tokio::time::timeout(TIMEOUT, client.closed())
        .await
        .expect("host closes the channel");
    assert!(client.is_closed());
}

#[tokio::test]
async fn test_maximize_toggles_and_notifies() {
    let host = start_default().await;
    let client = host.connect().await;
    let (seen, listener) = recorder();
    let _sub = client.on(STATE_CHANNEL, listener);

    assert!(!client.window().is_maximized().await.unwrap());

    client.window().maximize().await.unwrap();
    assert!(client.window().is_maximized().await.unwrap());

    client.window().maximize().await.unwrap();
    assert!(!client.window().is_maximized().await.unwrap());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            json!({ "maximized": true, "minimized": false }),
            json!({ "maximized": false, "minimized": false }),
        ]
    );

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_minimize_notifies_once() {
    let host = start_default().await;
    let client = host.connect().await;
    let (seen, listener) = recorder();
    let _sub = client.on(STATE_CHANNEL, listener);

    client.window().minimize().await.unwrap();
    client.window().minimize().await.unwrap();
    // a no-op round trip so any stray notification would have arrived
    client.app().version().await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!({ "maximized": false, "minimized": true })]
    );

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_once_and_removed_subscriptions() {
    let host = start_default().await;
    let client = host.connect().await;

    let (once_seen, once_listener) = recorder();
    let _once = client.once(STATE_CHANNEL, once_listener);
    let (removed_seen, removed_listener) = recorder();
    let removed = client.on(STATE_CHANNEL, removed_listener);
    let (kept_seen, kept_listener) = recorder();
    let _kept = client.on(STATE_CHANNEL, kept_listener);

    client.window().maximize().await.unwrap();
    removed.unsubscribe();
    client.window().maximize().await.unwrap();

    assert_eq!(once_seen.lock().unwrap().len(), 1);
    assert_eq!(removed_seen.lock().unwrap().len(), 1);
    assert_eq!(kept_seen.lock().unwrap().len(), 2);
    assert_eq!(client.listeners().count(STATE_CHANNEL), 1);

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_app_quit_closes_the_channel() {
    let host = start_default().await;
    let client = host.connect().await;

    client.app().quit().await.unwrap();
    wait_closed(&client).await;

    let err = client.app().version().await.unwrap_err();
    assert!(matches!(err, BridgeError::Closed));
    assert_eq!(err.kind(), Some("ChannelClosed"));

    assert!(host.handle.is_quitting());
    host.join().await.unwrap();
}

#[tokio::test]
async fn test_window_close_ends_the_session() {
    let host = start_default().await;
    let client = host.connect().await;

    client.window().close().await.unwrap();
    wait_closed(&client).await;

    if cfg!(target_os = "macos") {
        // macOS hosts keep running with no window
        assert!(!host.handle.is_quitting());
        host.shutdown().await;
    } else {
        host.join().await.unwrap();
    }
}

#[tokio::test]
async fn test_reactivation_issues_a_fresh_session() {
    let mut config = headless_config();
    config.window.quit_on_last_closed = false;
    let host = start_host(config, None).await;

    let first = host.session();
    let client = host.connect().await;
    client.secure_storage().set("kept", "1").await.unwrap();
    client.window().close().await.unwrap();
    wait_closed(&client).await;
    assert!(!host.handle.is_quitting());

    host.handle.activate();
    let second = tokio::time::timeout(TIMEOUT, async {
        loop {
            if let Some(session) = host.handle.current_session() {
                return session;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("a new window opens");
    assert_ne!(first.window, second.window);

    let err = BridgeClient::connect(&first.url, first.token.expose_secret())
        .await
        .err()
        .expect("old token is revoked");
    assert!(matches!(err, BridgeError::Unauthorized));

    let client = BridgeClient::connect(&second.url, second.token.expose_secret())
        .await
        .unwrap();
    assert!(client.secure_storage().has("kept").await.unwrap());

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_new_window_requests_open_externally() {
    let host = start_default().await;

    host.handle.request_new_window("javascript:alert(1)");
    host.handle.request_new_window("https://easyfi.io/docs");

    tokio::time::timeout(TIMEOUT, async {
        while host.shell.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("redirect reaches the shell");

    assert_eq!(
        host.shell.calls(),
        vec![ShellCall::External("https://easyfi.io/docs".to_string())]
    );
    host.shutdown().await;
}
