//! Call command: invoke one operation against a running host.

use clap::Args;
use easyfi_broker::BridgeClient;
use easyfi_core::env::vars;
use serde_json::Value;

/// Call command arguments.
#[derive(Args)]
pub struct CallArgs {
    /// IPC endpoint printed by `easyfi run --headless`
    #[arg(long, env = vars::IPC_URL)]
    pub url: String,

    /// Session token for the target window
    #[arg(long, env = vars::IPC_TOKEN, hide_env_values = true)]
    pub token: String,

    /// Operation name, e.g. secure-storage:get
    pub method: String,

    /// Positional arguments, sent verbatim as strings
    pub args: Vec<String>,
}

/// Every operation takes string arguments, so a key such as `123` or a
/// clipboard text of `true` must not turn into a JSON number or boolean.
pub fn parse_arg(raw: &str) -> Value {
    Value::String(raw.to_string())
}

pub async fn run(args: CallArgs) -> anyhow::Result<()> {
    let client = BridgeClient::connect(&args.url, &args.token).await?;
    let params: Vec<Value> = args.args.iter().map(|a| parse_arg(a)).collect();

    let result = client.call(&args.method, params).await;
    client.close().await;

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
