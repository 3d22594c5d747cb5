use eyre::Context as _;
use serde::{Deserialize, Serialize};
use solana_address::Address;
use solana_system_interface::instruction as system_instruction;
use spl_associated_token_account::get_associated_token_address;

use crate::{amount, context::AgentContext, errors::OpError, solana::SolanaRpc, tokens};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferRequest {
    /// Recipient wallet address.
    pub to: String,
    /// UI-units decimal amount, e.g. "1.5".
    pub amount: String,
    /// SPL mint (address or known symbol). Omit to transfer native SOL.
    #[serde(default)]
    pub mint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferResponse {
    pub signature: String,
    pub to: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
}

pub async fn run(ctx: &AgentContext, req: TransferRequest) -> Result<TransferResponse, OpError> {
    let to =
        SolanaRpc::parse_pubkey(&req.to).map_err(|e| OpError::invalid(format!("to: {e:#}")))?;
    let from = ctx.pubkey();
    if to == from {
        return Err(OpError::invalid("recipient is the agent wallet itself"));
    }

    match &req.mint {
        None => {
            let lamports = amount::parse_ui_to_base(&req.amount, tokens::SOL_DECIMALS)
                .map_err(|e| OpError::invalid(format!("amount: {e:#}")))?;
            if lamports == 0 {
                return Err(OpError::invalid("amount must be > 0"));
            }

            let from_addr = Address::new_from_array(from.to_bytes());
            let to_addr = Address::new_from_array(to.to_bytes());
            let ix = system_instruction::transfer(&from_addr, &to_addr, lamports);

            let sig = ctx
                .rpc()
                .sign_and_send_instructions(ctx.keypair(), vec![ix])
                .await?;
            Ok(TransferResponse {
                signature: sig.to_string(),
                to: to.to_string(),
                amount: req.amount,
                mint: None,
            })
        }
        Some(mint_s) => {
            let mint = tokens::resolve_mint(mint_s).map_err(|e| OpError::invalid(e.to_string()))?;
            let decimals = ctx
                .rpc()
                .get_mint_decimals(mint)
                .await
                .map_err(OpError::from_rpc_read)?;
            let base = amount::parse_ui_to_base(&req.amount, u32::from(decimals))
                .map_err(|e| OpError::invalid(format!("amount: {e:#}")))?;
            if base == 0 {
                return Err(OpError::invalid("amount must be > 0"));
            }

            let from_ata = get_associated_token_address(&from, &mint);
            let to_ata = get_associated_token_address(&to, &mint);

            let mut ixs = vec![];

            // Create the recipient ATA if missing; the sender funds it.
            let to_ata_exists = ctx
                .rpc()
                .get_account_optional(&to_ata)
                .await
                .map_err(OpError::from_rpc_read)?
                .is_some();
            if !to_ata_exists {
                ixs.push(
                    spl_associated_token_account::instruction::create_associated_token_account(
                        &from,
                        &to,
                        &mint,
                        &spl_token::id(),
                    ),
                );
            }

            ixs.push(
                spl_token::instruction::transfer_checked(
                    &spl_token::id(),
                    &from_ata,
                    &mint,
                    &to_ata,
                    &from,
                    &[],
                    base,
                    decimals,
                )
                .context("build spl transfer")
                .map_err(|e| OpError::invalid(format!("{e:#}")))?,
            );

            let sig = ctx
                .rpc()
                .sign_and_send_instructions(ctx.keypair(), ixs)
                .await?;
            Ok(TransferResponse {
                signature: sig.to_string(),
                to: to.to_string(),
                amount: req.amount,
                mint: Some(mint.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_to_and_amount() {
        let r: Result<TransferRequest, _> = serde_json::from_value(serde_json::json!({
            "amount": "1"
        }));
        assert!(r.is_err(), "missing `to` must fail");

        let r: Result<TransferRequest, _> = serde_json::from_value(serde_json::json!({
            "to": "Addr1", "amount": "1", "mint": null
        }));
        assert!(r.is_ok(), "minimal request must parse: {r:?}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let r: Result<TransferRequest, _> = serde_json::from_value(serde_json::json!({
            "to": "Addr1", "amount": "1", "memo": "hi"
        }));
        assert!(r.is_err());
    }
}
