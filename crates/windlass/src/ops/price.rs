use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{context::AgentContext, errors::OpError, http, tokens};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchPriceRequest {
    /// Token mint (address or known symbol).
    pub mint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchPriceResponse {
    pub mint: String,
    /// USD price as reported by Jupiter, passed through as a string to avoid
    /// float round-tripping.
    pub price_usd: String,
}

/// Read-only and idempotent: two immediate calls with no intervening market
/// movement return the same quote.
pub async fn run(ctx: &AgentContext, req: FetchPriceRequest) -> Result<FetchPriceResponse, OpError> {
    let mint = tokens::resolve_mint(&req.mint).map_err(|e| OpError::invalid(e.to_string()))?;

    let base = ctx.config().http.jupiter_price_base_url.trim().to_owned();
    http::require_https_or_loopback("jupiter_price_base_url", &base)
        .map_err(|e| OpError::invalid(e.to_string()))?;

    let client = http::client().map_err(|e| OpError::Connectivity(format!("{e:#}")))?;
    let resp: Value = client
        .get(format!("{base}?ids={mint}"))
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("jupiter price: {e}")))?
        .json()
        .await
        .map_err(|e| OpError::Protocol(format!("jupiter price json: {e}")))?;

    let mint_key = mint.to_string();
    let price = resp
        .get("data")
        .and_then(|d| d.get(mint_key.as_str()))
        .and_then(|t| t.get("price"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OpError::Protocol("price data not available for this token".into()))?;

    Ok(FetchPriceResponse {
        mint: mint.to_string(),
        price_usd: price.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_is_required() {
        let r: Result<FetchPriceRequest, _> = serde_json::from_value(serde_json::json!({}));
        assert!(r.is_err());
    }
}
