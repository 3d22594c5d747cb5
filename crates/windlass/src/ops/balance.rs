use serde::{Deserialize, Serialize};

use crate::{amount, context::AgentContext, errors::OpError, tokens};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceRequest {
    /// SPL mint (address or known symbol). Omit for the native SOL balance.
    #[serde(default)]
    pub mint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub owner: String,
    /// UI-units decimal string.
    pub amount: String,
    pub decimals: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
}

pub async fn run(ctx: &AgentContext, req: BalanceRequest) -> Result<BalanceResponse, OpError> {
    let owner = ctx.pubkey();
    match req.mint {
        None => {
            let lamports = ctx
                .rpc()
                .get_sol_balance(owner)
                .await
                .map_err(OpError::from_rpc_read)?;
            let ui = amount::format_base_to_ui(lamports, tokens::SOL_DECIMALS)
                .map_err(|e| OpError::Protocol(format!("{e:#}")))?;
            Ok(BalanceResponse {
                owner: owner.to_string(),
                amount: ui,
                decimals: 9,
                mint: None,
            })
        }
        Some(mint_s) => {
            let mint = tokens::resolve_mint(&mint_s).map_err(|e| OpError::invalid(e.to_string()))?;
            let (base, decimals) = ctx
                .rpc()
                .get_spl_balance(owner, mint)
                .await
                .map_err(OpError::from_rpc_read)?;
            let ui = amount::format_base_to_ui(base, u32::from(decimals))
                .map_err(|e| OpError::Protocol(format!("{e:#}")))?;
            Ok(BalanceResponse {
                owner: owner.to_string(),
                amount: ui,
                decimals,
                mint: Some(mint.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_rejected() {
        let r: Result<BalanceRequest, _> =
            serde_json::from_value(serde_json::json!({ "mint": null, "typo": 1 }));
        assert!(r.is_err());
    }

    #[test]
    fn mint_is_optional() {
        let r: Result<BalanceRequest, _> = serde_json::from_value(serde_json::json!({}));
        assert!(r.is_ok(), "empty request must parse: {r:?}");
    }
}
