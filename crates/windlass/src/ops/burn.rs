use serde::{Deserialize, Serialize};
use solana_sdk::program_pack::Pack as _;
use spl_token::state::Account as SplAccount;

use crate::{
    context::AgentContext,
    errors::OpError,
    solana::{
        compute_budget_set_compute_unit_limit, compute_budget_set_compute_unit_price, SolanaRpc,
    },
};

const BURN_COMPUTE_UNIT_LIMIT: u32 = 100_000;
const BURN_COMPUTE_UNIT_PRICE: u64 = 100_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BurnAndCloseRequest {
    /// Token account to empty and close. The reclaimed rent goes back to the
    /// agent wallet.
    pub token_account: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BurnAndCloseResponse {
    pub signature: String,
    pub token_account: String,
    pub burned_amount: u64,
}

pub async fn run(
    ctx: &AgentContext,
    req: BurnAndCloseRequest,
) -> Result<BurnAndCloseResponse, OpError> {
    let token_account = SolanaRpc::parse_pubkey(&req.token_account)
        .map_err(|e| OpError::invalid(format!("token_account: {e:#}")))?;
    let owner = ctx.pubkey();

    let acc = ctx
        .rpc()
        .get_account_optional(&token_account)
        .await
        .map_err(OpError::from_rpc_read)?
        .ok_or_else(|| OpError::Protocol("token account does not exist".into()))?;
    let token = SplAccount::unpack(&acc.data)
        .map_err(|e| OpError::Protocol(format!("not an spl token account: {e}")))?;
    if token.owner != owner {
        return Err(OpError::Protocol(
            "token account is not owned by the agent wallet".into(),
        ));
    }

    let mut ixs = vec![
        compute_budget_set_compute_unit_price(BURN_COMPUTE_UNIT_PRICE),
        compute_budget_set_compute_unit_limit(BURN_COMPUTE_UNIT_LIMIT),
    ];

    if token.amount > 0 {
        ixs.push(
            spl_token::instruction::burn(
                &spl_token::id(),
                &token_account,
                &token.mint,
                &owner,
                &[],
                token.amount,
            )
            .map_err(|e| OpError::invalid(format!("build burn: {e}")))?,
        );
    }

    ixs.push(
        spl_token::instruction::close_account(
            &spl_token::id(),
            &token_account,
            &owner,
            &owner,
            &[],
        )
        .map_err(|e| OpError::invalid(format!("build close_account: {e}")))?,
    );

    let sig = ctx
        .rpc()
        .sign_and_send_instructions(ctx.keypair(), ixs)
        .await?;

    Ok(BurnAndCloseResponse {
        signature: sig.to_string(),
        token_account: token_account.to_string(),
        burned_amount: token.amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_account_is_required() {
        let r: Result<BurnAndCloseRequest, _> = serde_json::from_value(serde_json::json!({}));
        assert!(r.is_err());
    }
}
