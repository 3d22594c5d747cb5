mod schema;

pub use schema::{list_tools_result, tool_schemas};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    context::AgentContext,
    errors::{OpError, ToolError},
    jsonrpc::{tool_err, tool_ok},
    ops,
};

fn parse_args<Req: DeserializeOwned>(args: Value) -> Result<Req, ToolError> {
    serde_json::from_value(args)
        .map_err(|e| ToolError::new("invalid_request", format!("arguments: {e}")))
}

fn respond<Resp: Serialize>(res: Result<Resp, OpError>) -> Value {
    match res {
        Ok(resp) => match serde_json::to_value(resp) {
            Ok(v) => tool_ok(v),
            Err(e) => tool_err(ToolError::new(
                "internal_error",
                format!("serialize response: {e}"),
            )),
        },
        Err(e) => tool_err(e.into()),
    }
}

/// Dispatch a tool call by name. `ctx` is `None` when no signing credential
/// is configured; every operation requires one.
pub async fn handle_tool_call(ctx: Option<&AgentContext>, name: &str, args: Value) -> Value {
    let Some(ctx) = ctx else {
        return tool_err(ToolError::new(
            "missing_credential",
            "no signing key configured; set WINDLASS_PRIVATE_KEY",
        ));
    };

    match name {
        "get_balance" => match parse_args(args) {
            Ok(req) => respond(ops::balance::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "transfer" => match parse_args(args) {
            Ok(req) => respond(ops::transfer::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "trade" => match parse_args(args) {
            Ok(req) => respond(ops::trade::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "stake" => match parse_args(args) {
            Ok(req) => respond(ops::stake::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "lend" => match parse_args(args) {
            Ok(req) => respond(ops::lend::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "deploy_token" => match parse_args(args) {
            Ok(req) => respond(ops::deploy::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "request_faucet_funds" => match parse_args(args) {
            Ok(req) => respond(ops::faucet::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "burn_and_close_account" => match parse_args(args) {
            Ok(req) => respond(ops::burn::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "create_dlmm_pool" => match parse_args(args) {
            Ok(req) => respond(ops::pool::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "launch_pumpfun_token" => match parse_args(args) {
            Ok(req) => respond(ops::launch::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "fetch_price" => match parse_args(args) {
            Ok(req) => respond(ops::price::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        "get_tps" => match parse_args(args) {
            Ok(req) => respond(ops::tps::run(ctx, req).await),
            Err(te) => tool_err(te),
        },
        _ => tool_err(ToolError::new("unknown_tool", format!("unknown tool: {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let v = handle_tool_call(None, "does_not_exist", json!({})).await;
        // Without a credential, missing_credential wins for any name; with a
        // bogus name and no ctx the credential check still applies first.
        assert_eq!(v.get("isError").and_then(Value::as_bool), Some(true));
    }

    #[tokio::test]
    async fn missing_credential_is_reported_before_dispatch() {
        let v = handle_tool_call(None, "get_balance", json!({})).await;
        assert_eq!(v.get("isError").and_then(Value::as_bool), Some(true));
        let text = v
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        assert!(text.contains("missing_credential"), "got: {text}");
    }

    #[test]
    fn every_schema_name_has_a_dispatch_arm() {
        // The registry is a static table; this keeps the descriptor list and
        // the dispatcher from drifting apart.
        let dispatched = [
            "get_balance",
            "transfer",
            "trade",
            "stake",
            "lend",
            "deploy_token",
            "request_faucet_funds",
            "burn_and_close_account",
            "create_dlmm_pool",
            "launch_pumpfun_token",
            "fetch_price",
            "get_tps",
        ];
        for s in tool_schemas() {
            let name = s.get("name").and_then(Value::as_str).unwrap_or_default();
            assert!(dispatched.contains(&name), "no dispatch arm for {name}");
        }
    }
}
