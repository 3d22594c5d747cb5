use eyre::Context as _;
use serde_json::json;
use std::io::Write as _;

use crate::config::{config_path, WindlassConfig, SOLANA_DEVNET_RPC_URL};

/// Print a quick self-diagnostic. Safe to paste: reports whether keys are
/// configured, never their values.
pub fn run(json_output: bool) -> eyre::Result<()> {
    let cfg = WindlassConfig::load()?;
    let cfg_path = config_path()?;

    let has_private_key = std::env::var_os("WINDLASS_PRIVATE_KEY").is_some();
    let has_auxiliary_key = std::env::var_os("WINDLASS_OPENAI_API_KEY").is_some();
    let is_devnet = cfg.rpc.solana_rpc_url == SOLANA_DEVNET_RPC_URL;

    let report = json!({
      "ok": true,
      "version": env!("CARGO_PKG_VERSION"),
      "paths": {
        "config_file": cfg_path.clone(),
        "config_file_exists": cfg_path.is_file(),
      },
      "rpc": {
        "solana_rpc_url": cfg.rpc.solana_rpc_url.clone(),
        "fallback_count": cfg.rpc.solana_fallback_rpc_urls.len(),
        "devnet": is_devnet,
      },
      "credentials": {
        "private_key_configured": has_private_key,
        "auxiliary_key_configured": has_auxiliary_key,
      }
    });

    let mut out = std::io::stdout().lock();
    if json_output {
        writeln!(out, "{}", serde_json::to_string(&report).context("serialize report")?)
            .context("write report")?;
        return Ok(());
    }

    writeln!(out, "windlass {}", env!("CARGO_PKG_VERSION")).context("write report")?;
    writeln!(out, "config file: {} (exists: {})", cfg_path.display(), cfg_path.is_file())
        .context("write report")?;
    writeln!(out, "solana rpc: {}", cfg.rpc.solana_rpc_url).context("write report")?;
    writeln!(
        out,
        "signing key: {}",
        if has_private_key { "configured" } else { "not configured" }
    )
    .context("write report")?;
    Ok(())
}
