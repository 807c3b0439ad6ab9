//! JSON-RPC 2.0 framing for the IPC channel.
//!
//! Operation names travel verbatim as `method` (for example
//! `secure-storage:get`) and arguments as a positional `params` array.
//! Host-to-UI events are notifications whose `method` is the channel name.

use crate::error::BrokerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version tag carried by every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,

    /// Request ID (for matching responses). Absent for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Operation name.
    pub method: String,

    /// Positional arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request with a numeric id and positional arguments.
    pub fn call(id: u64, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Value::from(id)),
            method: method.into(),
            params: Some(Value::Array(args)),
        }
    }

    /// Check if this is a notification (no ID).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Decode one inbound frame.
    ///
    /// On failure the error comes with whatever request id could be read, so
    /// the rejection still reaches the caller: `-32700` for text that is not
    /// JSON, `-32600` for JSON that is not a 2.0 request.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text).map_err(|e| FrameError {
            id: None,
            error: JsonRpcError::parse_error(e.to_string()),
        })?;
        let id = request_id(&value);

        let request: Self = serde_json::from_value(value).map_err(|e| FrameError {
            id: id.clone(),
            error: JsonRpcError::invalid_request(e.to_string()),
        })?;

        if request.jsonrpc != JSONRPC_VERSION {
            return Err(FrameError {
                id,
                error: JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            });
        }
        Ok(request)
    }

    /// Read only the id of a frame, if it has one.
    pub fn peek_id(text: &str) -> Option<Value> {
        serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|value| request_id(&value))
    }
}

fn request_id(value: &Value) -> Option<Value> {
    value.get("id").filter(|id| !id.is_null()).cloned()
}

/// A frame that could not be decoded into a request.
#[derive(Debug, Clone)]
pub struct FrameError {
    /// Id of the offending request, when readable.
    pub id: Option<Value>,
    pub error: JsonRpcError,
}

impl FrameError {
    pub fn into_response(self) -> JsonRpcResponse {
        JsonRpcResponse::error(self.id, self.error)
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,

    /// Request ID (matches the request).
    pub id: Option<Value>,

    /// Result (on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error (on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Build a response from a dispatch outcome.
    pub fn from_result(id: Option<Value>, result: crate::Result<Value>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(err) => Self::error(id, JsonRpcError::from(&err)),
        }
    }
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,

    /// Error message.
    pub message: String,

    /// Additional error data. Broker errors put their kind here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create a new error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Add error data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Parse error (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message).with_data(serde_json::json!({ "kind": "ParseError" }))
    }

    /// Invalid request error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message).with_data(serde_json::json!({ "kind": "InvalidRequest" }))
    }

    /// The `kind` string from `data`, if present.
    pub fn kind(&self) -> Option<&str> {
        self.data.as_ref()?.get("kind")?.as_str()
    }
}

impl From<&BrokerError> for JsonRpcError {
    fn from(err: &BrokerError) -> Self {
        Self::new(err.code(), err.to_string())
            .with_data(serde_json::json!({ "kind": err.kind() }))
    }
}

/// JSON-RPC 2.0 notification (host-initiated event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,

    /// Channel name.
    pub method: String,

    /// Event arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a notification carrying positional event arguments.
    pub fn new(channel: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: channel.into(),
            params: Some(Value::Array(args)),
        }
    }

    /// Event arguments as a slice-friendly vector.
    pub fn into_args(self) -> Vec<Value> {
        match self.params {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(args)) => args,
            Some(other) => vec![other],
        }
    }
}

/// Any frame the host sends to the UI.
///
/// Notifications are tried first: a response never carries `method`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}
