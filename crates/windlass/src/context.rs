use crate::{config::WindlassConfig, errors::OpError, solana::SolanaRpc};
use secrecy::{ExposeSecret as _, SecretString};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer as _};

/// The per-session agent context: one signing credential, one RPC endpoint
/// set, one optional auxiliary-service key. Immutable after construction;
/// every operation adapter borrows it.
pub struct AgentContext {
    keypair: Keypair,
    rpc: SolanaRpc,
    config: WindlassConfig,
    auxiliary_api_key: Option<SecretString>,
}

impl AgentContext {
    /// Build a context from a base58-encoded 64-byte Ed25519 keypair secret.
    ///
    /// Fails with a credential error before any adapter is reachable if the
    /// secret does not decode into valid signing key material.
    pub fn new(
        private_key: &SecretString,
        config: WindlassConfig,
        auxiliary_api_key: Option<SecretString>,
    ) -> Result<Self, OpError> {
        let bytes = bs58::decode(private_key.expose_secret().trim())
            .into_vec()
            .map_err(|e| OpError::Credential(format!("private key is not base58: {e}")))?;
        if bytes.len() != 64 {
            return Err(OpError::Credential(format!(
                "private key must decode to 64 bytes, got {}",
                bytes.len()
            )));
        }
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| OpError::Credential(format!("invalid ed25519 keypair: {e}")))?;

        let rpc = SolanaRpc::new(
            &config.rpc.solana_rpc_url,
            &config.rpc.solana_fallback_rpc_urls,
        );

        Ok(Self {
            keypair,
            rpc,
            config,
            auxiliary_api_key,
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub const fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub const fn rpc(&self) -> &SolanaRpc {
        &self.rpc
    }

    pub const fn config(&self) -> &WindlassConfig {
        &self.config
    }

    /// The auxiliary key is held for NL tooling; it is never logged and has
    /// no accessor that copies it out of `SecretString`.
    pub const fn auxiliary_api_key(&self) -> Option<&SecretString> {
        self.auxiliary_api_key.as_ref()
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("pubkey", &self.pubkey().to_string())
            .field("rpc_url", &self.config.rpc.solana_rpc_url)
            .field("auxiliary_api_key", &self.auxiliary_api_key().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> SecretString {
        SecretString::from(Keypair::new().to_base58_string())
    }

    #[test]
    fn valid_base58_secret_constructs() {
        let ctx = AgentContext::new(&test_secret(), WindlassConfig::default(), None);
        assert!(ctx.is_ok(), "construction failed: {ctx:?}");
    }

    #[test]
    fn invalid_base58_fails_with_credential_kind() {
        let err = AgentContext::new(
            &SecretString::from("not-base58-0OIl".to_owned()),
            WindlassConfig::default(),
            None,
        )
        .err();
        assert!(matches!(err, Some(OpError::Credential(_))), "got: {err:?}");
    }

    #[test]
    fn wrong_length_fails_with_credential_kind() {
        // 32 bytes of zeros: valid base58, wrong length for a keypair secret.
        let short = SecretString::from(bs58::encode([0_u8; 32]).into_string());
        let err = AgentContext::new(&short, WindlassConfig::default(), None).err();
        assert!(matches!(err, Some(OpError::Credential(_))), "got: {err:?}");
    }

    #[test]
    fn debug_never_prints_key_material() -> Result<(), OpError> {
        let secret = test_secret();
        let ctx = AgentContext::new(&secret, WindlassConfig::default(), None)?;
        let dbg = format!("{ctx:?}");
        assert!(!dbg.contains(secret.expose_secret()));
        Ok(())
    }
}
