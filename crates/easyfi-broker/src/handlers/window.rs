//! `window:*` handlers. All of them succeed when no window exists.

use crate::window::WindowManager;
use crate::Result;
use serde_json::Value;

pub fn minimize(windows: &WindowManager) -> Result<Value> {
    windows.minimize();
    Ok(Value::Null)
}

/// Toggles between maximized and restored.
pub fn maximize(windows: &WindowManager) -> Result<Value> {
    windows.toggle_maximize();
    Ok(Value::Null)
}

pub fn close(windows: &WindowManager) -> Result<Value> {
    windows.close();
    Ok(Value::Null)
}

pub fn is_maximized(windows: &WindowManager) -> Result<Value> {
    Ok(Value::Bool(windows.is_maximized()))
}
