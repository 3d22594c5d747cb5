use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::{signature::Keypair, signer::Signer as _};
use tracing::debug;

use crate::{context::AgentContext, errors::OpError, http};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchOptions {
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Initial dev buy in SOL, denominated in SOL.
    #[serde(default)]
    pub initial_liquidity_sol: Option<f64>,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
    /// Priority fee in lamports passed through to PumpPortal.
    #[serde(default)]
    pub priority_fee: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchTokenRequest {
    pub token_name: String,
    pub token_ticker: String,
    pub description: String,
    /// URL of the token image; fetched and re-uploaded to pump.fun's IPFS.
    pub image_url: String,
    #[serde(default)]
    pub options: Option<LaunchOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchTokenResponse {
    pub signature: String,
    pub mint: String,
    pub metadata_uri: String,
}

/// Upload metadata + image to pump.fun's IPFS endpoint; returns the
/// metadata JSON (name, symbol, metadataUri).
async fn upload_metadata(
    client: &reqwest::Client,
    base: &str,
    req: &LaunchTokenRequest,
    image: Vec<u8>,
) -> Result<Value, OpError> {
    let mut form = reqwest::multipart::Form::new()
        .text("name", req.token_name.clone())
        .text("symbol", req.token_ticker.clone())
        .text("description", req.description.clone())
        .text("showName", "true");
    if let Some(opts) = &req.options {
        if let Some(v) = &opts.twitter {
            form = form.text("twitter", v.clone());
        }
        if let Some(v) = &opts.telegram {
            form = form.text("telegram", v.clone());
        }
        if let Some(v) = &opts.website {
            form = form.text("website", v.clone());
        }
    }
    let part = reqwest::multipart::Part::bytes(image)
        .file_name("token_image.png")
        .mime_str("image/png")
        .map_err(|e| OpError::invalid(format!("image part: {e}")))?;
    form = form.part("file", part);

    client
        .post(format!("{base}/api/ipfs"))
        .multipart(form)
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("pump.fun metadata upload: {e}")))?
        .json()
        .await
        .map_err(|e| OpError::Protocol(format!("pump.fun metadata json: {e}")))
}

/// Ask PumpPortal to build the create transaction for this mint. The
/// response body is the raw serialized transaction.
async fn build_create_tx(
    client: &reqwest::Client,
    base: &str,
    ctx: &AgentContext,
    mint: &Keypair,
    metadata: &Value,
    metadata_uri: &str,
    opts: &LaunchOptions,
) -> Result<Vec<u8>, OpError> {
    let payload = serde_json::json!({
        "publicKey": ctx.pubkey().to_string(),
        "action": "create",
        "tokenMetadata": {
            "name": metadata.get("name").and_then(Value::as_str),
            "symbol": metadata.get("symbol").and_then(Value::as_str),
            "uri": metadata_uri,
        },
        "mint": mint.pubkey().to_string(),
        "denominatedInSol": "true",
        "amount": opts.initial_liquidity_sol,
        "slippage": opts.slippage_bps,
        "priorityFee": opts.priority_fee,
        "pool": "pump"
    });

    let bytes = client
        .post(format!("{base}/api/trade-local"))
        .json(&payload)
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("pumpportal trade-local: {e}")))?
        .bytes()
        .await
        .map_err(|e| OpError::Protocol(format!("pumpportal body: {e}")))?;
    Ok(bytes.to_vec())
}

pub async fn run(ctx: &AgentContext, req: LaunchTokenRequest) -> Result<LaunchTokenResponse, OpError> {
    if req.token_name.trim().is_empty() || req.token_ticker.trim().is_empty() {
        return Err(OpError::invalid("token_name and token_ticker are required"));
    }
    let pumpfun_base = ctx.config().http.pumpfun_base_url.trim().to_owned();
    let pumpportal_base = ctx.config().http.pumpportal_base_url.trim().to_owned();
    http::require_https_or_loopback("pumpfun_base_url", &pumpfun_base)
        .map_err(|e| OpError::invalid(e.to_string()))?;
    http::require_https_or_loopback("pumpportal_base_url", &pumpportal_base)
        .map_err(|e| OpError::invalid(e.to_string()))?;
    http::require_https_or_loopback("image_url", &req.image_url)
        .map_err(|e| OpError::invalid(e.to_string()))?;

    let client = http::client().map_err(|e| OpError::Connectivity(format!("{e:#}")))?;

    let image = client
        .get(req.image_url.trim())
        .send()
        .await
        .map_err(|e| OpError::from_http(&e))?
        .error_for_status()
        .map_err(|e| OpError::Protocol(format!("fetch token image: {e}")))?
        .bytes()
        .await
        .map_err(|e| OpError::Protocol(format!("fetch token image body: {e}")))?
        .to_vec();

    let metadata_resp = upload_metadata(&client, &pumpfun_base, &req, image).await?;
    let metadata_uri = metadata_resp
        .get("metadataUri")
        .and_then(Value::as_str)
        .ok_or_else(|| OpError::Protocol("metadata upload missing metadataUri".into()))?
        .to_owned();
    let metadata = metadata_resp
        .get("metadata")
        .cloned()
        .unwrap_or(Value::Null);

    let mint_kp = Keypair::new();
    debug!(mint = %mint_kp.pubkey(), "launching pump.fun token");

    let opts = req.options.clone().unwrap_or_default();
    let tx_bytes = build_create_tx(
        &client,
        &pumpportal_base,
        ctx,
        &mint_kp,
        &metadata,
        &metadata_uri,
        &opts,
    )
    .await?;

    // The create transaction requires the wallet (fee payer) plus the new
    // mint as co-signer.
    let sig = ctx
        .rpc()
        .sign_and_send_versioned_with_cosigner(ctx.keypair(), &mint_kp, &tx_bytes)
        .await?;

    Ok(LaunchTokenResponse {
        signature: sig.to_string(),
        mint: mint_kp.pubkey().to_string(),
        metadata_uri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_all_metadata_fields() {
        let r: Result<LaunchTokenRequest, _> = serde_json::from_value(serde_json::json!({
            "token_name": "MyToken",
            "token_ticker": "MTK",
            "description": "a token",
        }));
        assert!(r.is_err(), "image_url is required");

        let r: Result<LaunchTokenRequest, _> = serde_json::from_value(serde_json::json!({
            "token_name": "MyToken",
            "token_ticker": "MTK",
            "description": "a token",
            "image_url": "https://example.com/image.png",
            "options": { "twitter": "@mytoken", "initial_liquidity_sol": 0.5 }
        }));
        assert!(r.is_ok(), "full request must parse: {r:?}");
    }

    #[test]
    fn options_reject_unknown_fields() {
        let r: Result<LaunchOptions, _> =
            serde_json::from_value(serde_json::json!({ "discord": "nope" }));
        assert!(r.is_err());
    }
}
