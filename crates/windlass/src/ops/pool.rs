use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use spl_associated_token_account::get_associated_token_address;

use crate::{context::AgentContext, errors::OpError, solana::SolanaRpc, tokens};

/// Base key mixed into the customizable permissionless LB pair PDA seeds.
const ILM_BASE: &str = "MFGQxwAmB91SwuYX36okv2Qmdc9aMuHTwWGUrp4AtB1";
const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
const SYSVAR_RENT: &str = "SysvarRent111111111111111111111111111111111";

const MAX_BIN_ARRAY_SIZE: i32 = 70;
const BIN_ARRAY_BITMAP_SIZE: i32 = 512;
const BASIS_POINT_MAX: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    Slot,
    Timestamp,
}

impl ActivationType {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Slot => 0,
            Self::Timestamp => 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDlmmPoolRequest {
    /// Mint of token A (the pool's X side).
    pub token_a_mint: String,
    /// Mint of token B (the pool's Y side).
    pub token_b_mint: String,
    /// DLMM bin step in basis points.
    pub bin_step: u16,
    /// Initial pool price as a tokenA/tokenB UI ratio.
    pub initial_price: f64,
    /// Whether to round the initial price up when picking the active bin.
    #[serde(default)]
    pub price_rounding_up: bool,
    /// Pool trading fee in basis points.
    pub fee_bps: u16,
    pub activation_type: ActivationType,
    #[serde(default)]
    pub has_alpha_vault: bool,
    /// Activation point (slot or unix timestamp per `activation_type`).
    #[serde(default)]
    pub activation_point: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDlmmPoolResponse {
    pub signature: String,
    pub lb_pair: String,
    pub active_bin_id: i32,
}

/// Scale a UI price ratio into the per-lamport ratio the program works in.
fn price_per_lamport(token_x_decimals: u8, token_y_decimals: u8, price: f64) -> f64 {
    price * 10_f64.powi(i32::from(token_y_decimals) - i32::from(token_x_decimals))
}

/// The bin holding `price` on the (1 + bin_step/10000)^id curve.
fn bin_id_from_price(price: f64, bin_step: u16, round_down: bool) -> Option<i32> {
    if bin_step == 0 || !price.is_finite() || price <= 0.0 {
        return None;
    }
    let ratio = 1.0 + f64::from(bin_step) / f64::from(BASIS_POINT_MAX);
    let raw = price.ln() / ratio.ln();
    let rounded = if round_down { raw.floor() } else { raw.ceil() };
    if !rounded.is_finite() || rounded > f64::from(i32::MAX) || rounded < f64::from(i32::MIN) {
        return None;
    }
    #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
    let id = rounded as i32;
    Some(id)
}

/// `fee_bps * 10000 / bin_step`, required to be exact and to fit a u16.
fn base_factor_from_fee_bps(bin_step: u16, fee_bps: u16) -> Result<u16, OpError> {
    if bin_step == 0 {
        return Err(OpError::invalid("bin_step must be > 0"));
    }
    let num = u32::from(fee_bps) * BASIS_POINT_MAX;
    if num % u32::from(bin_step) != 0 {
        return Err(OpError::invalid(
            "cannot express fee_bps exactly for this bin_step",
        ));
    }
    let bf = num / u32::from(bin_step);
    if bf == 0 {
        return Err(OpError::invalid("fee_bps too small for this bin_step"));
    }
    u16::try_from(bf).map_err(|_| OpError::invalid("fee_bps too large for this bin_step"))
}

const fn bin_id_to_bin_array_index(bin_id: i32) -> i32 {
    bin_id.div_euclid(MAX_BIN_ARRAY_SIZE)
}

const fn overflows_default_bin_array_bitmap(bin_array_index: i32) -> bool {
    bin_array_index > BIN_ARRAY_BITMAP_SIZE - 1 || bin_array_index < -BIN_ARRAY_BITMAP_SIZE
}

fn sort_token_mints(token_x: Pubkey, token_y: Pubkey) -> (Pubkey, Pubkey) {
    if token_x.to_bytes() > token_y.to_bytes() {
        (token_y, token_x)
    } else {
        (token_x, token_y)
    }
}

fn derive_lb_pair(token_x: Pubkey, token_y: Pubkey, program_id: &Pubkey) -> eyre::Result<Pubkey> {
    let ilm_base = SolanaRpc::parse_pubkey(ILM_BASE)?;
    let (min_key, max_key) = sort_token_mints(token_x, token_y);
    let (pk, _bump) = Pubkey::find_program_address(
        &[
            ilm_base.to_bytes().as_ref(),
            min_key.to_bytes().as_ref(),
            max_key.to_bytes().as_ref(),
        ],
        program_id,
    );
    Ok(pk)
}

fn derive_reserve(token: Pubkey, lb_pair: Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[lb_pair.to_bytes().as_ref(), token.to_bytes().as_ref()],
        program_id,
    )
    .0
}

fn derive_oracle(lb_pair: Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"oracle", lb_pair.to_bytes().as_ref()], program_id).0
}

fn derive_bin_array_bitmap_extension(lb_pair: Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"bitmap", lb_pair.to_bytes().as_ref()], program_id).0
}

fn anchor_discriminator(ix_name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{ix_name}").as_bytes());
    let mut out = [0_u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

#[derive(BorshSerialize)]
struct CustomizableParams {
    active_id: i32,
    bin_step: u16,
    base_factor: u16,
    activation_type: u8,
    activation_point: Option<u64>,
    has_alpha_vault: bool,
    padding: [u8; 64],
}

fn build_initialize_ix(
    program_id: &Pubkey,
    token_x: Pubkey,
    token_y: Pubkey,
    funder: Pubkey,
    params: &CustomizableParams,
) -> Result<Instruction, OpError> {
    let lb_pair = derive_lb_pair(token_x, token_y, program_id)
        .map_err(|e| OpError::invalid(format!("{e:#}")))?;
    let reserve_x = derive_reserve(token_x, lb_pair, program_id);
    let reserve_y = derive_reserve(token_y, lb_pair, program_id);
    let oracle = derive_oracle(lb_pair, program_id);

    let active_bin_array_index = bin_id_to_bin_array_index(params.active_id);
    // Anchor optional account: pass the program id itself when absent.
    let bitmap_extension = if overflows_default_bin_array_bitmap(active_bin_array_index) {
        derive_bin_array_bitmap_extension(lb_pair, program_id)
    } else {
        *program_id
    };

    let user_token_x = get_associated_token_address(&funder, &token_x);
    let system_program =
        SolanaRpc::parse_pubkey(SYSTEM_PROGRAM).map_err(|e| OpError::invalid(format!("{e:#}")))?;
    let rent =
        SolanaRpc::parse_pubkey(SYSVAR_RENT).map_err(|e| OpError::invalid(format!("{e:#}")))?;

    let mut data = anchor_discriminator("initialize_customizable_permissionless_lb_pair").to_vec();
    let encoded = borsh::to_vec(params)
        .map_err(|e| OpError::invalid(format!("encode pool params: {e}")))?;
    data.extend_from_slice(&encoded);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(lb_pair, false),
            AccountMeta::new(bitmap_extension, false),
            AccountMeta::new_readonly(token_x, false),
            AccountMeta::new_readonly(token_y, false),
            AccountMeta::new(reserve_x, false),
            AccountMeta::new(reserve_y, false),
            AccountMeta::new(oracle, false),
            AccountMeta::new_readonly(user_token_x, false),
            AccountMeta::new(funder, true),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program, false),
            AccountMeta::new_readonly(rent, false),
        ],
        data,
    })
}

pub async fn run(
    ctx: &AgentContext,
    req: CreateDlmmPoolRequest,
) -> Result<CreateDlmmPoolResponse, OpError> {
    let token_x =
        tokens::resolve_mint(&req.token_a_mint).map_err(|e| OpError::invalid(e.to_string()))?;
    let token_y =
        tokens::resolve_mint(&req.token_b_mint).map_err(|e| OpError::invalid(e.to_string()))?;
    if token_x == token_y {
        return Err(OpError::invalid("token mints must differ"));
    }
    if !req.initial_price.is_finite() || req.initial_price <= 0.0 {
        return Err(OpError::invalid("initial_price must be > 0"));
    }
    let base_factor = base_factor_from_fee_bps(req.bin_step, req.fee_bps)?;
    let program_id = SolanaRpc::parse_pubkey(&ctx.config().http.dlmm_program_id)
        .map_err(|e| OpError::invalid(format!("dlmm_program_id: {e:#}")))?;

    let x_decimals = ctx
        .rpc()
        .get_mint_decimals(token_x)
        .await
        .map_err(OpError::from_rpc_read)?;
    let y_decimals = ctx
        .rpc()
        .get_mint_decimals(token_y)
        .await
        .map_err(OpError::from_rpc_read)?;

    let lamport_price = price_per_lamport(x_decimals, y_decimals, req.initial_price);
    let active_id = bin_id_from_price(lamport_price, req.bin_step, !req.price_rounding_up)
        .ok_or_else(|| OpError::invalid("initial_price out of range for this bin_step"))?;

    let params = CustomizableParams {
        active_id,
        bin_step: req.bin_step,
        base_factor,
        activation_type: req.activation_type.as_u8(),
        activation_point: req.activation_point,
        has_alpha_vault: req.has_alpha_vault,
        padding: [0_u8; 64],
    };

    let funder = ctx.pubkey();
    let ix = build_initialize_ix(&program_id, token_x, token_y, funder, &params)?;
    let lb_pair = derive_lb_pair(token_x, token_y, &program_id)
        .map_err(|e| OpError::invalid(format!("{e:#}")))?;

    let sig = ctx
        .rpc()
        .sign_and_send_instructions(ctx.keypair(), vec![ix])
        .await?;

    Ok(CreateDlmmPoolResponse {
        signature: sig.to_string(),
        lb_pair: lb_pair.to_string(),
        active_bin_id: active_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_id_at_unit_price_is_zero() {
        assert_eq!(bin_id_from_price(1.0, 25, true), Some(0));
        assert_eq!(bin_id_from_price(1.0, 25, false), Some(0));
    }

    #[test]
    fn bin_id_rounds_by_direction() {
        let ratio: f64 = 1.0 + 25.0 / 10_000.0;
        let between = ratio.powf(2.5);
        assert_eq!(bin_id_from_price(between, 25, true), Some(2));
        assert_eq!(bin_id_from_price(between, 25, false), Some(3));

        let below_par = ratio.powf(-1.5);
        assert_eq!(bin_id_from_price(below_par, 25, true), Some(-2));
        assert_eq!(bin_id_from_price(below_par, 25, false), Some(-1));
    }

    #[test]
    fn bin_id_rejects_degenerate_inputs() {
        assert_eq!(bin_id_from_price(0.0, 25, true), None);
        assert_eq!(bin_id_from_price(-1.0, 25, true), None);
        assert_eq!(bin_id_from_price(1.0, 0, true), None);
        assert_eq!(bin_id_from_price(f64::NAN, 25, true), None);
    }

    #[test]
    fn base_factor_requires_exact_division() {
        let bf = base_factor_from_fee_bps(25, 25);
        assert_eq!(bf.ok(), Some(10_000));
        assert!(base_factor_from_fee_bps(30, 25).is_err(), "inexact");
        assert!(base_factor_from_fee_bps(0, 25).is_err(), "zero bin step");
        assert!(base_factor_from_fee_bps(1, 10_000).is_err(), "overflow");
    }

    #[test]
    fn price_per_lamport_scales_by_decimal_gap() {
        let p = price_per_lamport(9, 6, 1.0);
        assert!((p - 0.001).abs() < 1e-12, "got {p}");
        let p = price_per_lamport(6, 6, 2.5);
        assert!((p - 2.5).abs() < 1e-12, "got {p}");
    }

    #[test]
    fn bin_array_index_floors_negative_ids() {
        assert_eq!(bin_id_to_bin_array_index(0), 0);
        assert_eq!(bin_id_to_bin_array_index(69), 0);
        assert_eq!(bin_id_to_bin_array_index(70), 1);
        assert_eq!(bin_id_to_bin_array_index(-1), -1);
        assert_eq!(bin_id_to_bin_array_index(-70), -1);
        assert_eq!(bin_id_to_bin_array_index(-71), -2);
    }

    #[test]
    fn bitmap_overflow_bounds() {
        assert!(!overflows_default_bin_array_bitmap(0));
        assert!(!overflows_default_bin_array_bitmap(511));
        assert!(overflows_default_bin_array_bitmap(512));
        assert!(!overflows_default_bin_array_bitmap(-512));
        assert!(overflows_default_bin_array_bitmap(-513));
    }

    #[test]
    fn pair_derivation_is_order_independent() -> eyre::Result<()> {
        let program = SolanaRpc::parse_pubkey(crate::config::DLMM_PROGRAM_ID)?;
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        assert_eq!(derive_lb_pair(a, b, &program)?, derive_lb_pair(b, a, &program)?);
        Ok(())
    }

    #[test]
    fn discriminator_is_eight_bytes_of_sha256() {
        let d = anchor_discriminator("initialize_customizable_permissionless_lb_pair");
        assert_eq!(d.len(), 8);
        // Stable across calls.
        assert_eq!(
            d,
            anchor_discriminator("initialize_customizable_permissionless_lb_pair")
        );
    }

    #[test]
    fn params_encode_optional_activation_point() -> std::io::Result<()> {
        let p = CustomizableParams {
            active_id: 1,
            bin_step: 25,
            base_factor: 10_000,
            activation_type: ActivationType::Timestamp.as_u8(),
            activation_point: None,
            has_alpha_vault: false,
            padding: [0_u8; 64],
        };
        let none_len = borsh::to_vec(&p)?.len();
        let p = CustomizableParams {
            activation_point: Some(42),
            ..p
        };
        let some_len = borsh::to_vec(&p)?.len();
        assert_eq!(some_len, none_len + 8);
        Ok(())
    }
}
