use crate::errors::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

pub fn ok(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: Some(result),
        error: None,
    }
}

pub fn err(id: Value, code: i64, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.into(),
            data: Value::Null,
        }),
    }
}

/// Wrap a successful tool payload in the MCP content envelope.
pub fn tool_ok(payload: Value) -> Value {
    let text = payload.to_string();
    drop(payload);
    json!({
      "content": [{ "type": "text", "text": text }],
      "isError": false
    })
}

pub fn tool_err(tool_error: ToolError) -> Value {
    let text = serde_json::to_string(&tool_error).unwrap_or_else(|_e| {
        "{\"code\":\"error\",\"message\":\"failed to serialize error\"}".into()
    });
    drop(tool_error);
    json!({
      "content": [{ "type": "text", "text": text }],
      "isError": true
    })
}

pub async fn write_frame<W, T>(out: &mut W, v: &T) -> eyre::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin + Send,
    T: Serialize + Sync,
{
    use tokio::io::AsyncWriteExt as _;

    out.write_all(format!("{}\n", serde_json::to_string(v)?).as_bytes())
        .await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_parse_without_id() -> Result<(), serde_json::Error> {
        let req: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )?;
        assert!(req.id.is_none());
        assert_eq!(req.method, "notifications/initialized");
        Ok(())
    }

    #[test]
    fn tool_err_is_flagged() {
        let v = tool_err(ToolError::new("invalid_request", "missing mint"));
        assert_eq!(v.get("isError").and_then(Value::as_bool), Some(true));
    }
}
