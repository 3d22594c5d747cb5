use bincode::Options as _;
use eyre::Context as _;
use solana_address::Address;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_response::{RpcPerfSample, RpcSimulateTransactionResult};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{
    account::Account,
    hash::Hash,
    message::VersionedMessage,
    program_pack::Pack as _,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer as _,
    transaction::{Transaction, VersionedTransaction},
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::state::Mint;
use std::{str::FromStr as _, time::Duration};

use crate::errors::ChainError;
use crate::retry::{try_all_with_backoff, BackoffConfig};

const MAX_REMOTE_TX_BYTES: u64 = 2 * 1024 * 1024;

const fn compute_budget_program_id() -> Pubkey {
    // Base58("ComputeBudget111111111111111111111111111111")
    Pubkey::new_from_array([
        3, 6, 70, 111, 229, 33, 23, 50, 255, 236, 173, 186, 114, 195, 155, 231, 188, 140, 229, 187,
        197, 247, 18, 107, 44, 67, 155, 58, 64, 0, 0, 0,
    ])
}

pub fn compute_budget_set_compute_unit_limit(units: u32) -> solana_sdk::instruction::Instruction {
    let mut data = Vec::with_capacity(1 + 4);
    data.push(2); // SetComputeUnitLimit
    data.extend_from_slice(&units.to_le_bytes());
    solana_sdk::instruction::Instruction {
        program_id: compute_budget_program_id(),
        accounts: vec![],
        data,
    }
}

pub fn compute_budget_set_compute_unit_price(
    micro_lamports: u64,
) -> solana_sdk::instruction::Instruction {
    let mut data = Vec::with_capacity(1 + 8);
    data.push(3); // SetComputeUnitPrice
    data.extend_from_slice(&micro_lamports.to_le_bytes());
    solana_sdk::instruction::Instruction {
        program_id: compute_budget_program_id(),
        accounts: vec![],
        data,
    }
}

fn program_ids<'a>(
    msg: &'a VersionedMessage,
    keys: &'a [Address],
) -> eyre::Result<Vec<&'a Address>> {
    let mut out = vec![];
    let instructions = match msg {
        VersionedMessage::Legacy(m) => &m.instructions,
        VersionedMessage::V0(m) => &m.instructions,
    };
    for ix in instructions {
        let i = ix.program_id_index as usize;
        let pid = keys
            .get(i)
            .ok_or_else(|| eyre::eyre!("invalid instruction: program_id_index out of bounds"))?;
        out.push(pid);
    }
    Ok(out)
}

/// Heuristic split of a send/confirm error into "the cluster declined this"
/// versus "we never got an answer". Simulation runs before every send, so a
/// rejection here almost always means program-level failure.
fn classify_send_error(e: &eyre::Report) -> ChainError {
    let msg = format!("{e:#}");
    let rejected = msg.contains("custom program error")
        || msg.contains("InstructionError")
        || msg.contains("insufficient funds")
        || msg.contains("simulation failed")
        || msg.contains("Transaction simulation failed")
        || msg.contains("would exceed");
    if rejected {
        ChainError::Rejected(msg)
    } else {
        ChainError::Unavailable(msg)
    }
}

fn simulation_rejection(sim: &RpcSimulateTransactionResult) -> ChainError {
    let mut msg = format!("transaction simulation failed: {:?}", sim.err);
    if let Some(logs) = &sim.logs {
        // The tail of the log usually carries the program's own error line.
        let tail: Vec<&str> = logs.iter().rev().take(4).rev().map(String::as_str).collect();
        if !tail.is_empty() {
            msg.push_str(&format!(" (logs: {})", tail.join(" | ")));
        }
    }
    ChainError::Rejected(msg)
}

#[derive(Debug, Clone)]
pub struct SolanaRpc {
    pub rpc_url: String,
    pub fallback_rpc_urls: Vec<String>,
}

impl SolanaRpc {
    pub fn new(rpc_url: &str, fallback_rpc_urls: &[String]) -> Self {
        Self {
            rpc_url: rpc_url.to_owned(),
            fallback_rpc_urls: fallback_rpc_urls.to_vec(),
        }
    }

    fn all_rpc_urls(&self) -> Vec<String> {
        let mut urls = Vec::with_capacity(1 + self.fallback_rpc_urls.len());
        if !self.rpc_url.trim().is_empty() {
            urls.push(self.rpc_url.trim().to_owned());
        }
        for u in &self.fallback_rpc_urls {
            let t = u.trim();
            if t.is_empty() || urls.iter().any(|x| x == t) {
                continue;
            }
            urls.push(t.to_owned());
        }
        urls
    }

    fn rpc_for_url(url: &str) -> RpcClient {
        RpcClient::new_with_timeout_and_commitment(
            url.to_owned(),
            Duration::from_secs(20),
            CommitmentConfig::confirmed(),
        )
    }

    async fn with_fallback_and_backoff_cfg<T, Fut>(
        &self,
        cfg: &BackoffConfig,
        context_label: &'static str,
        f: impl Fn(RpcClient) -> Fut + Sync,
    ) -> eyre::Result<T>
    where
        T: Send,
        Fut: std::future::Future<Output = eyre::Result<T>> + Send,
    {
        let urls = self.all_rpc_urls();
        try_all_with_backoff(
            &urls,
            cfg,
            |u| {
                let u = u.clone();
                let f = &f;
                async move {
                    let rpc = Self::rpc_for_url(&u);
                    f(rpc).await
                }
            },
            context_label,
        )
        .await
    }

    async fn with_fallback_and_backoff<T, Fut>(
        &self,
        context_label: &'static str,
        f: impl Fn(RpcClient) -> Fut + Sync,
    ) -> eyre::Result<T>
    where
        T: Send,
        Fut: std::future::Future<Output = eyre::Result<T>> + Send,
    {
        let cfg = BackoffConfig::default();
        self.with_fallback_and_backoff_cfg(&cfg, context_label, f)
            .await
    }

    pub fn parse_pubkey(s: &str) -> eyre::Result<Pubkey> {
        Pubkey::from_str(s).context("parse solana pubkey")
    }

    pub async fn get_latest_blockhash(&self) -> eyre::Result<Hash> {
        self.with_fallback_and_backoff("latest blockhash", |rpc| async move {
            let bh = rpc
                .get_latest_blockhash()
                .await
                .context("latest blockhash")?;
            Ok(bh)
        })
        .await
    }

    pub async fn get_account_optional(&self, key: &Pubkey) -> eyre::Result<Option<Account>> {
        let k = *key;
        self.with_fallback_and_backoff("get account (optional)", |rpc| async move {
            let resp = rpc
                .get_account_with_commitment(&k, CommitmentConfig::processed())
                .await
                .context("get account")?;
            Ok(resp.value)
        })
        .await
    }

    pub async fn get_sol_balance(&self, owner: Pubkey) -> eyre::Result<u64> {
        self.with_fallback_and_backoff("get balance", |rpc| async move {
            let v = rpc.get_balance(&owner).await.context("get balance")?;
            Ok(v)
        })
        .await
    }

    /// Balance and decimals of `owner`'s associated token account for `mint`.
    /// A missing token account reads as zero.
    pub async fn get_spl_balance(&self, owner: Pubkey, mint: Pubkey) -> eyre::Result<(u64, u8)> {
        self.with_fallback_and_backoff("get spl balance", |rpc| async move {
            let mint_acc = rpc.get_account(&mint).await.context("get mint account")?;
            let m = Mint::unpack(&mint_acc.data).context("unpack mint")?;

            let ata = get_associated_token_address(&owner, &mint);
            let resp = rpc
                .get_account_with_commitment(&ata, CommitmentConfig::confirmed())
                .await
                .context("get token account")?;
            let amount = match resp.value {
                Some(acc) => {
                    spl_token::state::Account::unpack(&acc.data)
                        .context("unpack token account")?
                        .amount
                }
                None => 0,
            };
            Ok((amount, m.decimals))
        })
        .await
    }

    pub async fn get_mint_decimals(&self, mint: Pubkey) -> eyre::Result<u8> {
        self.with_fallback_and_backoff("get mint decimals", |rpc| async move {
            let mint_acc = rpc.get_account(&mint).await.context("get mint account")?;
            let m = Mint::unpack(&mint_acc.data).context("unpack mint")?;
            Ok(m.decimals)
        })
        .await
    }

    pub async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> eyre::Result<u64> {
        self.with_fallback_and_backoff("rent exemption", |rpc| async move {
            let v = rpc
                .get_minimum_balance_for_rent_exemption(data_len)
                .await
                .context("rent exemption")?;
            Ok(v)
        })
        .await
    }

    pub async fn get_recent_performance_samples(
        &self,
        limit: usize,
    ) -> eyre::Result<Vec<RpcPerfSample>> {
        self.with_fallback_and_backoff("performance samples", |rpc| async move {
            let v = rpc
                .get_recent_performance_samples(Some(limit))
                .await
                .context("performance samples")?;
            Ok(v)
        })
        .await
    }

    pub async fn request_airdrop(
        &self,
        to: Pubkey,
        lamports: u64,
    ) -> Result<Signature, ChainError> {
        let sig = self
            .with_fallback_and_backoff("request airdrop", |rpc| async move {
                let sig = rpc
                    .request_airdrop(&to, lamports)
                    .await
                    .context("request airdrop")?;
                Ok(sig)
            })
            .await
            .map_err(|e| classify_send_error(&e))?;

        // Best-effort confirm; on some clusters it may take a moment.
        self.confirm_with_backoff(sig, "confirm airdrop").await?;
        Ok(sig)
    }

    async fn confirm_with_backoff(
        &self,
        sig: Signature,
        label: &'static str,
    ) -> Result<(), ChainError> {
        let cfg = BackoffConfig::confirmation();
        self.with_fallback_and_backoff_cfg(&cfg, label, |rpc| async move {
            let ok = rpc.confirm_transaction(&sig).await.context("confirm tx")?;
            if ok {
                Ok(())
            } else {
                eyre::bail!("transaction not yet confirmed")
            }
        })
        .await
        .map_err(|e| ChainError::Unavailable(format!("{e:#} (signature: {sig})")))
    }

    /// Simulate, broadcast, and confirm a signed legacy transaction.
    async fn broadcast_legacy(&self, tx: Transaction) -> Result<Signature, ChainError> {
        let sig = *tx
            .signatures
            .first()
            .ok_or_else(|| ChainError::Rejected("missing transaction signature".into()))?;

        let sim = self
            .with_fallback_and_backoff("simulate tx", |rpc| {
                let tx = tx.clone();
                async move {
                    let sim: RpcSimulateTransactionResult = rpc
                        .simulate_transaction(&tx)
                        .await
                        .context("simulate tx")?
                        .value;
                    Ok(sim)
                }
            })
            .await
            .map_err(|e| ChainError::Unavailable(format!("{e:#}")))?;
        if sim.err.is_some() {
            return Err(simulation_rejection(&sim));
        }

        self.with_fallback_and_backoff("send tx", |rpc| {
            let tx = tx.clone();
            async move {
                rpc.send_transaction(&tx).await.context("send tx")?;
                Ok(())
            }
        })
        .await
        .map_err(|e| classify_send_error(&e))?;

        self.confirm_with_backoff(sig, "confirm tx").await?;
        Ok(sig)
    }

    async fn broadcast_versioned(&self, tx: VersionedTransaction) -> Result<Signature, ChainError> {
        let sig = *tx
            .signatures
            .first()
            .ok_or_else(|| ChainError::Rejected("missing transaction signature".into()))?;

        let sim = self
            .with_fallback_and_backoff("simulate versioned tx", |rpc| {
                let tx = tx.clone();
                async move {
                    let sim: RpcSimulateTransactionResult = rpc
                        .simulate_transaction(&tx)
                        .await
                        .context("simulate versioned tx")?
                        .value;
                    Ok(sim)
                }
            })
            .await
            .map_err(|e| ChainError::Unavailable(format!("{e:#}")))?;
        if sim.err.is_some() {
            return Err(simulation_rejection(&sim));
        }

        self.with_fallback_and_backoff("send versioned tx", |rpc| {
            let tx = tx.clone();
            async move {
                rpc.send_transaction(&tx)
                    .await
                    .context("send versioned tx")?;
                Ok(())
            }
        })
        .await
        .map_err(|e| classify_send_error(&e))?;

        self.confirm_with_backoff(sig, "confirm versioned tx")
            .await?;
        Ok(sig)
    }

    /// Build, sign, and submit a legacy transaction from locally constructed
    /// instructions with the context keypair as sole signer and fee payer.
    pub async fn sign_and_send_instructions(
        &self,
        keypair: &Keypair,
        instructions: Vec<solana_sdk::instruction::Instruction>,
    ) -> Result<Signature, ChainError> {
        self.sign_and_send_instructions_multi(keypair, &[], instructions)
            .await
    }

    /// Same, with additional signers (e.g. a freshly generated mint keypair).
    pub async fn sign_and_send_instructions_multi(
        &self,
        fee_payer: &Keypair,
        additional_signers: &[&Keypair],
        instructions: Vec<solana_sdk::instruction::Instruction>,
    ) -> Result<Signature, ChainError> {
        let bh = self
            .get_latest_blockhash()
            .await
            .map_err(|e| ChainError::Unavailable(format!("{e:#}")))?;
        let mut signers: Vec<&Keypair> = Vec::with_capacity(1 + additional_signers.len());
        signers.push(fee_payer);
        signers.extend_from_slice(additional_signers);

        let msg = solana_sdk::message::Message::new(&instructions, Some(&fee_payer.pubkey()));
        let tx = Transaction::new(&signers, msg, bh);
        self.broadcast_legacy(tx).await
    }

    /// Remote-constructed transactions are untrusted input. Enforce a strict
    /// minimum before signing: the fee payer must be the user, and the
    /// required-signer count must match what the flow expects.
    fn validate_remote_message(
        user: Pubkey,
        msg: &VersionedMessage,
        expected_signers: u8,
        allowed_program_ids: Option<&[Pubkey]>,
    ) -> Result<(), ChainError> {
        let keys = msg.static_account_keys();
        let user_addr = Address::new_from_array(user.to_bytes());
        let fee_payer = keys
            .first()
            .ok_or_else(|| ChainError::Rejected("invalid transaction: missing fee payer".into()))?;
        if *fee_payer != user_addr {
            return Err(ChainError::Rejected(
                "refusing transaction: fee payer is not the agent wallet".into(),
            ));
        }
        let hdr = msg.header();
        if hdr.num_required_signatures != expected_signers {
            return Err(ChainError::Rejected(format!(
                "refusing transaction: expected {expected_signers} required signature(s), got {}",
                hdr.num_required_signatures
            )));
        }

        let Some(allowed) = allowed_program_ids else {
            return Ok(());
        };
        if allowed.is_empty() {
            return Err(ChainError::Rejected(
                "refusing transaction: empty program allowlist".into(),
            ));
        }
        let allowed_addrs: Vec<Address> = allowed
            .iter()
            .map(|pk| Address::new_from_array(pk.to_bytes()))
            .collect();
        let pids = program_ids(msg, keys).map_err(|e| ChainError::Rejected(format!("{e:#}")))?;
        if pids.is_empty() {
            return Err(ChainError::Rejected(
                "invalid transaction: missing instructions".into(),
            ));
        }
        // Require every instruction's program id to be allowlisted: remote tx
        // bytes can only invoke programs the flow explicitly permits.
        for pid in pids {
            if !allowed_addrs.iter().any(|a| pid == a) {
                return Err(ChainError::Rejected(
                    "refusing transaction: invokes a non-allowlisted program id".into(),
                ));
            }
        }
        Ok(())
    }

    fn deserialize_remote_tx(tx_bytes: &[u8]) -> Result<VersionedTransaction, ChainError> {
        bincode::DefaultOptions::new()
            .with_limit(MAX_REMOTE_TX_BYTES)
            .deserialize(tx_bytes)
            .map_err(|e| ChainError::Rejected(format!("deserialize versioned tx: {e}")))
    }

    /// Sign and submit a remotely constructed transaction with the context
    /// keypair as sole signer. With `allowed_program_ids`, every instruction
    /// must target an allowlisted program.
    pub async fn sign_and_send_versioned(
        &self,
        keypair: &Keypair,
        tx_bytes: &[u8],
        allowed_program_ids: Option<&[Pubkey]>,
    ) -> Result<Signature, ChainError> {
        let vt = Self::deserialize_remote_tx(tx_bytes)?;
        let msg: VersionedMessage = vt.message;
        Self::validate_remote_message(keypair.pubkey(), &msg, 1, allowed_program_ids)?;
        let signed = VersionedTransaction::try_new(msg, &[keypair])
            .map_err(|e| ChainError::Rejected(format!("sign tx: {e}")))?;
        self.broadcast_versioned(signed).await
    }

    /// Sign and submit a remotely constructed transaction that requires the
    /// wallet plus one co-signer (e.g. a freshly generated mint keypair).
    pub async fn sign_and_send_versioned_with_cosigner(
        &self,
        keypair: &Keypair,
        cosigner: &Keypair,
        tx_bytes: &[u8],
    ) -> Result<Signature, ChainError> {
        let vt = Self::deserialize_remote_tx(tx_bytes)?;
        let msg: VersionedMessage = vt.message;
        Self::validate_remote_message(keypair.pubkey(), &msg, 2, None)?;
        let signed = VersionedTransaction::try_new(msg, &[keypair, cosigner])
            .map_err(|e| ChainError::Rejected(format!("sign tx: {e}")))?;
        self.broadcast_versioned(signed).await
    }
}
