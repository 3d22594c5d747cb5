use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{debug, warn};

use crate::{
    context::AgentContext,
    jsonrpc::{err, ok, write_frame, JsonRpcRequest, JsonRpcResponse},
    tools,
};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

fn initialize_result() -> Value {
    json!({
      "protocolVersion": PROTOCOL_VERSION,
      "capabilities": { "tools": {} },
      "serverInfo": {
        "name": "windlass",
        "version": env!("CARGO_PKG_VERSION"),
      }
    })
}

async fn handle_request(ctx: Option<&AgentContext>, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = req.id.clone();
    match req.method.as_str() {
        "initialize" => id.map(|id| ok(id, initialize_result())),
        "notifications/initialized" | "notifications/cancelled" => None,
        "ping" => id.map(|id| ok(id, json!({}))),
        "tools/list" => id.map(|id| ok(id, tools::list_tools_result())),
        "tools/call" => {
            let id = id?;
            let name = req
                .params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            if name.is_empty() {
                return Some(err(id, -32602, "missing tool name"));
            }
            let args = req
                .params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));
            debug!(tool = %name, "tools/call");
            let result = tools::handle_tool_call(ctx, &name, args).await;
            Some(ok(id, result))
        }
        other => {
            // Notifications we don't know are dropped; requests get an error.
            id.map(|id| err(id, -32601, format!("method not found: {other}")))
        }
    }
}

/// Serve the tool registry over stdio JSON-RPC until stdin closes.
///
/// Logs go to stderr; stdout carries only protocol frames.
pub async fn serve(ctx: Option<AgentContext>) -> eyre::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_owned();
        if line.is_empty() {
            continue;
        }
        let parsed: Result<JsonRpcRequest, _> = serde_json::from_str(&line);
        let resp = match parsed {
            Ok(req) => handle_request(ctx.as_ref(), req).await,
            Err(e) => {
                warn!("malformed request: {e}");
                Some(err(Value::Null, -32700, format!("parse error: {e}")))
            }
        };
        if let Some(resp) = resp {
            write_frame(&mut stdout, &resp).await?;
        }
    }
    Ok(())
}
