#![recursion_limit = "256"]
#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Parser, Subcommand};
use eyre::Context as _;
use secrecy::SecretString;
use tracing_subscriber::prelude::*;

mod amount;
mod config;
mod context;
mod doctor;
mod errors;
mod http;
mod jsonrpc;
mod ops;
mod retry;
mod server;
mod solana;
mod tokens;
mod tools;

#[derive(Parser, Debug)]
#[command(name = "windlass", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP tool server over stdio.
    ///
    /// Reads the signing key from WINDLASS_PRIVATE_KEY (base58 keypair
    /// secret). Without it, read descriptors still work but every tool call
    /// reports a missing credential.
    Mcp,

    /// Print the tool descriptor table as JSON.
    Tools,

    /// Print a quick self-diagnostic report (safe to paste; contains no secrets).
    Doctor {
        /// Emit machine-readable JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_logging() {
    // stdout carries protocol frames; all logs go to stderr.
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("WINDLASS_LOG")
        .unwrap_or_else(|_e| tracing_subscriber::EnvFilter::new("windlass=info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

/// Build the agent context from the environment, or `None` when no key is
/// configured. A key that is present but undecodable is a hard error: the
/// context must fail at construction, not at first use.
fn context_from_env() -> eyre::Result<Option<context::AgentContext>> {
    let Some(raw) = std::env::var("WINDLASS_PRIVATE_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty())
    else {
        return Ok(None);
    };
    let cfg = config::WindlassConfig::load()?;
    let aux = std::env::var("WINDLASS_OPENAI_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(SecretString::from);
    let ctx = context::AgentContext::new(&SecretString::from(raw), cfg, aux)
        .map_err(|e| eyre::eyre!("{e}"))?;
    Ok(Some(ctx))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging();

    match cli.cmd {
        Command::Mcp => {
            let ctx = context_from_env()?;
            if ctx.is_none() {
                tracing::warn!("WINDLASS_PRIVATE_KEY not set; tool calls will be refused");
            }
            server::serve(ctx).await.context("mcp server failed")
        }
        Command::Tools => {
            use std::io::Write as _;
            let s = serde_json::to_string_pretty(&tools::list_tools_result())
                .context("serialize tools")?;
            writeln!(std::io::stdout().lock(), "{s}").context("write tools")?;
            Ok(())
        }
        Command::Doctor { json } => doctor::run(json).context("doctor failed"),
    }
}
