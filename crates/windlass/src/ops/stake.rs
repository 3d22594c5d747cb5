use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{amount, context::AgentContext, errors::OpError, http, tokens};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StakeRequest {
    /// SOL amount to stake into jupSOL, UI-units decimal string.
    pub amount_sol: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StakeResponse {
    pub signature: String,
    pub amount_sol: String,
    pub stake_mint: String,
}

/// Stake SOL into jupSOL via the Jupiter blink worker: the worker builds the
/// swap transaction, we validate and sign it.
pub async fn run(ctx: &AgentContext, req: StakeRequest) -> Result<StakeResponse, OpError> {
    let lamports = amount::parse_ui_to_base(&req.amount_sol, tokens::SOL_DECIMALS)
        .map_err(|e| OpError::invalid(format!("amount_sol: {e:#}")))?;
    if lamports == 0 {
        return Err(OpError::invalid("amount_sol must be > 0"));
    }

    let base = ctx.config().http.jupiter_stake_base_url.trim().to_owned();
    http::require_https_or_loopback("jupiter_stake_base_url", &base)
        .map_err(|e| OpError::invalid(e.to_string()))?;

    let url = format!(
        "{base}/{}/{}/{}",
        tokens::WSOL,
        tokens::JUPSOL,
        req.amount_sol.trim()
    );
    let client = http::client().map_err(|e| OpError::Connectivity(format!("{e:#}")))?;
    let resp: Value = client
        .post(url)
        .json(&serde_json::json!({ "account": ctx.pubkey().to_string() }))
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("jupiter stake: {e}")))?
        .json()
        .await
        .map_err(|e| OpError::Protocol(format!("jupiter stake json: {e}")))?;

    let tx_b64 = resp
        .get("transaction")
        .and_then(Value::as_str)
        .ok_or_else(|| OpError::Protocol("stake response missing transaction".into()))?;
    let tx_bytes = base64::engine::general_purpose::STANDARD
        .decode(tx_b64)
        .map_err(|e| OpError::Protocol(format!("decode stake transaction: {e}")))?;

    let sig = ctx
        .rpc()
        .sign_and_send_versioned(ctx.keypair(), &tx_bytes, None)
        .await?;

    Ok(StakeResponse {
        signature: sig.to_string(),
        amount_sol: req.amount_sol,
        stake_mint: tokens::JUPSOL.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_is_required() {
        let r: Result<StakeRequest, _> = serde_json::from_value(serde_json::json!({}));
        assert!(r.is_err());
    }
}
