//! `clipboard:*` handlers.

use crate::platform::Clipboard;
use crate::Result;
use easyfi_core::SecretString;
use serde_json::Value;

pub async fn write(clipboard: &dyn Clipboard, text: &SecretString) -> Result<Value> {
    clipboard.write_text(text).await?;
    Ok(Value::Null)
}

pub async fn read(clipboard: &dyn Clipboard) -> Result<Value> {
    let text = clipboard.read_text().await?;
    Ok(Value::String(text.to_plain()))
}
