use solana_sdk::pubkey::Pubkey;
use std::str::FromStr as _;

/// Well-known mainnet mints used as defaults across the toolkit.
pub const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const USDT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
pub const WSOL: &str = "So11111111111111111111111111111111111111112";
pub const JUPSOL: &str = "jupSoLaHXQiZZTSfEWMTRRgpnyFm8f6sZdosWBjx93v";
pub const JITOSOL: &str = "J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn";
pub const MSOL: &str = "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So";
pub const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

pub const SOL_DECIMALS: u32 = 9;
pub const USDC_DECIMALS: u32 = 6;

/// Resolve a token identifier: either a symbol from the table above
/// (case-insensitive) or a base58 mint address.
pub fn resolve_mint(s: &str) -> eyre::Result<Pubkey> {
    let mint = match s.trim() {
        t if t.eq_ignore_ascii_case("usdc") => USDC,
        t if t.eq_ignore_ascii_case("usdt") => USDT,
        t if t.eq_ignore_ascii_case("sol") || t.eq_ignore_ascii_case("wsol") => WSOL,
        t if t.eq_ignore_ascii_case("jupsol") => JUPSOL,
        t if t.eq_ignore_ascii_case("jitosol") => JITOSOL,
        t if t.eq_ignore_ascii_case("msol") => MSOL,
        t if t.eq_ignore_ascii_case("bonk") => BONK,
        t => t,
    };
    Pubkey::from_str(mint).map_err(|e| eyre::eyre!("invalid mint '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_symbols_and_raw_mints() -> eyre::Result<()> {
        assert_eq!(resolve_mint("USDC")?, Pubkey::from_str(USDC)?);
        assert_eq!(resolve_mint("sol")?, Pubkey::from_str(WSOL)?);
        assert_eq!(resolve_mint(JUPSOL)?, Pubkey::from_str(JUPSOL)?);
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(resolve_mint("not-a-mint").is_err());
    }
}
