use eyre::Context as _;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SOLANA_MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const SOLANA_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Meteora DLMM program id (mainnet-beta and devnet share it).
pub const DLMM_PROGRAM_ID: &str = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Solana RPC endpoint URL.
    pub solana_rpc_url: String,
    /// Additional Solana RPC endpoints to try if the primary fails.
    pub solana_fallback_rpc_urls: Vec<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            solana_rpc_url: SOLANA_MAINNET_RPC_URL.into(),
            solana_fallback_rpc_urls: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Jupiter Swap API base URL (quote + swap live under /swap/v1).
    pub jupiter_swap_base_url: String,
    /// Jupiter Price API base URL.
    pub jupiter_price_base_url: String,
    /// Jupiter blink worker base URL, used for the SOL -> jupSOL stake route.
    pub jupiter_stake_base_url: String,
    /// Optional Jupiter API key (x-api-key). Keyless usage works at reduced
    /// rate limits where Jupiter permits it.
    pub jupiter_api_key: Option<String>,

    /// Lulo blink base URL, used for USDC lending deposits.
    pub lulo_base_url: String,

    /// pump.fun base URL, used for token metadata/IPFS upload.
    pub pumpfun_base_url: String,
    /// PumpPortal base URL, used to build pump.fun launch transactions.
    pub pumpportal_base_url: String,

    /// Meteora DLMM program id override.
    pub dlmm_program_id: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            jupiter_swap_base_url: "https://api.jup.ag/swap/v1".into(),
            jupiter_price_base_url: "https://api.jup.ag/price/v2".into(),
            jupiter_stake_base_url: "https://worker.jup.ag/blinks/swap".into(),
            jupiter_api_key: None,
            lulo_base_url: "https://blink.lulo.fi".into(),
            pumpfun_base_url: "https://pump.fun".into(),
            pumpportal_base_url: "https://pumpportal.fun".into(),
            dlmm_program_id: DLMM_PROGRAM_ID.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WindlassConfig {
    pub rpc: RpcConfig,
    pub http: HttpConfig,
}

/// Resolve the config directory: `WINDLASS_CONFIG_DIR` wins, else the
/// platform config dir for "windlass".
pub fn config_dir() -> eyre::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("WINDLASS_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let dirs = directories::ProjectDirs::from("", "", "windlass")
        .ok_or_else(|| eyre::eyre!("cannot resolve a home directory for config"))?;
    Ok(dirs.config_dir().to_path_buf())
}

pub fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

impl WindlassConfig {
    /// Load `config.toml` if present, else defaults. A missing file is not an
    /// error; a malformed file is.
    pub fn load() -> eyre::Result<Self> {
        let path = config_path()?;
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_mainnet() {
        let cfg = WindlassConfig::default();
        assert_eq!(cfg.rpc.solana_rpc_url, SOLANA_MAINNET_RPC_URL);
        assert!(cfg.rpc.solana_fallback_rpc_urls.is_empty());
        assert!(cfg.http.jupiter_swap_base_url.starts_with("https://"));
        assert_eq!(cfg.http.dlmm_program_id, DLMM_PROGRAM_ID);
    }

    #[test]
    fn partial_toml_fills_defaults() -> eyre::Result<()> {
        let cfg: WindlassConfig = toml::from_str(
            r#"
            [rpc]
            solana_rpc_url = "https://api.devnet.solana.com"
            "#,
        )?;
        assert_eq!(cfg.rpc.solana_rpc_url, SOLANA_DEVNET_RPC_URL);
        assert_eq!(cfg.http.lulo_base_url, "https://blink.lulo.fi");
        Ok(())
    }
}
