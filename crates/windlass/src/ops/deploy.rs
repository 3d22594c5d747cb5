use serde::{Deserialize, Serialize};
use solana_address::Address;
use solana_sdk::{program_pack::Pack as _, signature::Keypair, signer::Signer as _};
use solana_system_interface::instruction as system_instruction;
use spl_token::state::Mint;

use crate::{context::AgentContext, errors::OpError};

pub const DEFAULT_TOKEN_DECIMALS: u8 = 9;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployTokenRequest {
    /// Number of decimals for the new mint. Defaults to 9.
    #[serde(default)]
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployTokenResponse {
    pub mint: String,
    pub signature: String,
    pub decimals: u8,
}

/// Deploy a new SPL mint with the agent wallet as mint and freeze authority.
pub async fn run(
    ctx: &AgentContext,
    req: DeployTokenRequest,
) -> Result<DeployTokenResponse, OpError> {
    let decimals = req.decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS);
    if decimals > 9 {
        return Err(OpError::invalid("decimals must be in 0..=9"));
    }

    let payer = ctx.pubkey();
    let mint_kp = Keypair::new();
    let mint = mint_kp.pubkey();

    let lamports = ctx
        .rpc()
        .get_minimum_balance_for_rent_exemption(Mint::LEN)
        .await
        .map_err(OpError::from_rpc_read)?;

    let payer_addr = Address::new_from_array(payer.to_bytes());
    let mint_addr = Address::new_from_array(mint.to_bytes());
    let token_program_addr = Address::new_from_array(spl_token::id().to_bytes());

    let create_account_ix = system_instruction::create_account(
        &payer_addr,
        &mint_addr,
        lamports,
        Mint::LEN as u64,
        &token_program_addr,
    );
    let init_mint_ix = spl_token::instruction::initialize_mint2(
        &spl_token::id(),
        &mint,
        &payer,
        Some(&payer),
        decimals,
    )
    .map_err(|e| OpError::invalid(format!("build initialize_mint2: {e}")))?;

    let sig = ctx
        .rpc()
        .sign_and_send_instructions_multi(
            ctx.keypair(),
            &[&mint_kp],
            vec![create_account_ix, init_mint_ix],
        )
        .await?;

    Ok(DeployTokenResponse {
        mint: mint.to_string(),
        signature: sig.to_string(),
        decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_default_and_bounds() -> Result<(), serde_json::Error> {
        let req: DeployTokenRequest = serde_json::from_value(serde_json::json!({}))?;
        assert!(req.decimals.is_none());

        let req: DeployTokenRequest =
            serde_json::from_value(serde_json::json!({ "decimals": 6 }))?;
        assert_eq!(req.decimals, Some(6));
        Ok(())
    }
}
