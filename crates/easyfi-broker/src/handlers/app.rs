//! `app:*` handlers.

use crate::platform::AppControl;
use crate::Result;
use serde_json::Value;

pub fn version(app: &AppControl) -> Result<Value> {
    Ok(Value::String(app.version().to_string()))
}

pub fn platform(app: &AppControl) -> Result<Value> {
    Ok(Value::String(app.platform().to_string()))
}

/// Starts shutdown. The response is still delivered; nothing after it is.
pub fn quit(app: &AppControl) -> Result<Value> {
    app.quit();
    Ok(Value::Null)
}
