//! Ordering and liveness of the IPC channel.

use async_trait::async_trait;
use easyfi_broker::platform::{Clipboard, MemoryClipboard, PlatformError};
use easyfi_broker::window::STATE_CHANNEL;
use easyfi_broker::BridgeError;
use easyfi_core::SecretString;
use easyfi_integration_tests::{
    headless_config, start_default, start_host, start_host_with_clipboard, TIMEOUT,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Clipboard whose writes take a while to land.
#[derive(Default)]
struct SlowClipboard {
    inner: MemoryClipboard,
}

#[async_trait]
impl Clipboard for SlowClipboard {
    async fn write_text(&self, text: &SecretString) -> Result<(), PlatformError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.inner.write_text(text).await
    }

    async fn read_text(&self) -> Result<SecretString, PlatformError> {
        self.inner.read_text().await
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipelined_clipboard_calls_keep_order() {
    let host = start_host_with_clipboard(
        headless_config(),
        None,
        Arc::new(SlowClipboard::default()),
    )
    .await;
    let client = host.connect().await;
    let clipboard = client.clipboard();

    clipboard.write_text("old").await.unwrap();
    let (write, read) = tokio::join!(clipboard.write_text("new"), clipboard.read_text());
    write.unwrap();
    assert_eq!(read.unwrap(), "new");

    client.close().await;
    host.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_clipboard_does_not_stall_the_vault() {
    let host = start_host_with_clipboard(
        headless_config(),
        None,
        Arc::new(SlowClipboard::default()),
    )
    .await;
    let client = host.connect().await;

    let clipboard = client.clipboard();
    let storage = client.secure_storage();
    let write = clipboard.write_text("address");
    let vault = async {
        storage.set("k", "v").await.unwrap();
        storage.has("k").await.unwrap()
    };
    let (write, has) = tokio::join!(write, vault);
    write.unwrap();
    assert!(has);

    client.close().await;
    host.shutdown().await;
}

#[tokio::test]
async fn test_rate_limited_calls_still_settle() {
    let mut config = headless_config();
    config.ipc.max_messages_per_second = 1;
    let host = start_host(config, None).await;
    let client = host.connect().await;
    let storage = client.secure_storage();

    let calls = (0..5).map(|_| tokio::time::timeout(TIMEOUT, storage.has("k")));
    let results = futures::future::join_all(calls).await;

    let mut limited = 0;
    for result in results {
        match result.expect("call settles instead of hanging") {
            Ok(has) => assert!(!has),
            Err(e) => {
                assert_eq!(e.kind(), Some("RateLimited"), "{e}");
                assert!(matches!(e, BridgeError::Rejected { code: -32000, .. }));
                limited += 1;
            }
        }
    }
    assert!(limited >= 1);

    client.close().await;
    host.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_from_two_connections() {
    let host = start_default().await;
    let first = host.connect().await;
    let second = host.connect().await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = first.on(STATE_CHANNEL, move |args: &[Value]| {
        sink.lock().unwrap().extend(args.iter().cloned());
    });

    let (a, b) = (first.window(), second.window());
    let toggles = (0..10).flat_map(|_| [a.maximize(), b.maximize()]);
    for result in futures::future::join_all(toggles).await {
        result.unwrap();
    }

    assert!(!a.is_maximized().await.unwrap());
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 20);
    for (n, state) in seen.iter().enumerate() {
        assert_eq!(state["maximized"], Value::Bool(n % 2 == 0), "notification {n}");
    }

    first.close().await;
    second.close().await;
    host.shutdown().await;
}
