use serde::{Deserialize, Serialize};
use serde_json::Value;
use base64::Engine as _;

use crate::{
    amount, context::AgentContext, errors::OpError, http, solana::SolanaRpc, tokens,
};

pub const DEFAULT_SLIPPAGE_BPS: u32 = 300;

// Known Jupiter program IDs for provider allowlisting.
const JUPITER_PROGRAMS: [&str; 3] = [
    "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
    "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB",
    "JUP2jxvQffg8W4Jw8dYpQ8eQJ8v1s5p8yL6kD3m1j7d",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeRequest {
    /// Target token mint (address or known symbol).
    pub output_mint: String,
    /// UI-units decimal amount of the input token to swap.
    pub input_amount: String,
    /// Source token mint. Defaults to USDC.
    #[serde(default)]
    pub input_mint: Option<String>,
    /// Slippage tolerance in basis points. Defaults to 300 (3%).
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeResponse {
    pub signature: String,
    pub input_mint: String,
    pub output_mint: String,
    /// Input amount in base units, as quoted.
    pub input_amount_base: u64,
    pub slippage_bps: u32,
}

fn jupiter_request(
    ctx: &AgentContext,
    req: reqwest::RequestBuilder,
) -> reqwest::RequestBuilder {
    match ctx
        .config()
        .http
        .jupiter_api_key
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        Some(k) => req.header("x-api-key", k),
        None => req,
    }
}

pub async fn run(ctx: &AgentContext, req: TradeRequest) -> Result<TradeResponse, OpError> {
    let output_mint =
        tokens::resolve_mint(&req.output_mint).map_err(|e| OpError::invalid(e.to_string()))?;
    let input_mint = tokens::resolve_mint(req.input_mint.as_deref().unwrap_or(tokens::USDC))
        .map_err(|e| OpError::invalid(e.to_string()))?;
    if input_mint == output_mint {
        return Err(OpError::invalid("input and output mint are identical"));
    }
    let slippage_bps = req.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS);
    if slippage_bps == 0 || slippage_bps > 10_000 {
        return Err(OpError::invalid("slippage_bps must be in 1..=10000"));
    }

    let base_url = ctx.config().http.jupiter_swap_base_url.trim().to_owned();
    http::require_https_or_loopback("jupiter_swap_base_url", &base_url)
        .map_err(|e| OpError::invalid(e.to_string()))?;

    // Convert the UI amount with the input mint's actual decimals.
    let input_amount = req.input_amount;
    let decimals = ctx
        .rpc()
        .get_mint_decimals(input_mint)
        .await
        .map_err(OpError::from_rpc_read)?;
    let amount_base = amount::parse_ui_to_base(&input_amount, u32::from(decimals))
        .map_err(|e| OpError::invalid(format!("input_amount: {e:#}")))?;
    if amount_base == 0 {
        return Err(OpError::invalid("input_amount must be > 0"));
    }

    let client = http::client().map_err(|e| OpError::Connectivity(format!("{e:#}")))?;

    let quote_url = format!(
        "{base_url}/quote?inputMint={input_mint}&outputMint={output_mint}&amount={amount_base}&slippageBps={slippage_bps}&swapMode=ExactIn"
    );
    let quote: Value = jupiter_request(ctx, client.get(quote_url))
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("jupiter quote: {e}")))?
        .json()
        .await
        .map_err(|e| OpError::Protocol(format!("jupiter quote json: {e}")))?;

    let body = serde_json::json!({
      "quoteResponse": quote,
      "userPublicKey": ctx.pubkey().to_string(),
      "wrapAndUnwrapSol": true,
      "dynamicComputeUnitLimit": true
    });
    let swap: Value = jupiter_request(ctx, client.post(format!("{base_url}/swap")))
        .json(&body)
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("jupiter swap: {e}")))?
        .json()
        .await
        .map_err(|e| OpError::Protocol(format!("jupiter swap json: {e}")))?;

    let tx_b64 = swap
        .get("swapTransaction")
        .and_then(Value::as_str)
        .ok_or_else(|| OpError::Protocol("jupiter swap response missing swapTransaction".into()))?;
    let tx_bytes = base64::engine::general_purpose::STANDARD
        .decode(tx_b64)
        .map_err(|e| OpError::Protocol(format!("decode swapTransaction: {e}")))?;

    // Allow local Jupiter mocks (loopback base URL) to skip provider
    // allowlisting; real hosts must produce a transaction that invokes a
    // known Jupiter program id.
    let allowlist: Option<Vec<_>> = if http::is_loopback_http(&base_url) {
        None
    } else {
        Some(
            JUPITER_PROGRAMS
                .iter()
                .map(|s| SolanaRpc::parse_pubkey(s))
                .collect::<eyre::Result<Vec<_>>>()
                .map_err(|e| OpError::Protocol(format!("{e:#}")))?,
        )
    };

    let sig = ctx
        .rpc()
        .sign_and_send_versioned(ctx.keypair(), &tx_bytes, allowlist.as_deref())
        .await?;

    Ok(TradeResponse {
        signature: sig.to_string(),
        input_mint: input_mint.to_string(),
        output_mint: output_mint.to_string(),
        input_amount_base: amount_base,
        slippage_bps,
    })
}
