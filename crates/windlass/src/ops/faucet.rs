use serde::{Deserialize, Serialize};

use crate::{amount, context::AgentContext, errors::OpError, tokens};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaucetRequest {
    /// SOL amount to request. Defaults to 5. Devnet/testnet endpoints only;
    /// mainnet clusters reject airdrops.
    #[serde(default)]
    pub amount_sol: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaucetResponse {
    pub signature: String,
    pub lamports: u64,
}

pub async fn run(ctx: &AgentContext, req: FaucetRequest) -> Result<FaucetResponse, OpError> {
    let amount_s = req.amount_sol.unwrap_or_else(|| "5".into());
    let lamports = amount::parse_ui_to_base(&amount_s, tokens::SOL_DECIMALS)
        .map_err(|e| OpError::invalid(format!("amount_sol: {e:#}")))?;
    if lamports == 0 {
        return Err(OpError::invalid("amount_sol must be > 0"));
    }

    let sig = ctx.rpc().request_airdrop(ctx.pubkey(), lamports).await?;
    Ok(FaucetResponse {
        signature: sig.to_string(),
        lamports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_defaults_to_five_sol() -> Result<(), serde_json::Error> {
        let req: FaucetRequest = serde_json::from_value(serde_json::json!({}))?;
        assert!(req.amount_sol.is_none());
        Ok(())
    }
}
