use eyre::Context as _;

/// Parse a UI decimal string ("1.5") into base units for a token with the
/// given number of decimals, without going through floats.
pub fn parse_ui_to_base(s: &str, decimals: u32) -> eyre::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        eyre::bail!("empty amount");
    }

    let (whole, frac) = match s.split_once('.') {
        Some((a, b)) => (a, b),
        None => (s, ""),
    };

    if whole.starts_with('-') {
        eyre::bail!("amount must be non-negative");
    }

    let whole_v: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().context("parse whole part")?
    };

    if frac.len() > decimals as usize {
        eyre::bail!("too many decimal places for token (decimals={decimals})");
    }

    let mut frac_s = frac.to_owned();
    while frac_s.len() < decimals as usize {
        frac_s.push('0');
    }
    let frac_v: u64 = if frac_s.is_empty() {
        0
    } else {
        frac_s.parse().context("parse fractional part")?
    };

    let scale = 10_u64
        .checked_pow(decimals)
        .ok_or_else(|| eyre::eyre!("decimals too large"))?;

    whole_v
        .checked_mul(scale)
        .and_then(|x| x.checked_add(frac_v))
        .ok_or_else(|| eyre::eyre!("amount overflow"))
}

/// Format a base-unit integer amount into a UI decimal string without floats.
///
/// Examples:
/// - base=1500000, decimals=6 => "1.5"
/// - base=1, decimals=6 => "0.000001"
pub fn format_base_to_ui(base: u64, decimals: u32) -> eyre::Result<String> {
    if decimals == 0 {
        return Ok(base.to_string());
    }
    let scale = 10_u64
        .checked_pow(decimals)
        .ok_or_else(|| eyre::eyre!("decimals too large"))?;
    let whole = base / scale;
    let frac = base % scale;
    if frac == 0 {
        return Ok(whole.to_string());
    }
    let mut frac_s = format!("{frac:0width$}", width = decimals as usize);
    while frac_s.ends_with('0') {
        frac_s.pop();
    }
    Ok(format!("{whole}.{frac_s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ui_basic() {
        let v1 = parse_ui_to_base("1", 6);
        assert!(v1.is_ok(), "parse failed: {v1:?}");
        assert_eq!(v1.ok(), Some(1_000_000));

        let v15 = parse_ui_to_base("1.5", 6);
        assert!(v15.is_ok(), "parse failed: {v15:?}");
        assert_eq!(v15.ok(), Some(1_500_000));

        let vsmall = parse_ui_to_base("0.000001", 6);
        assert!(vsmall.is_ok(), "parse failed: {vsmall:?}");
        assert_eq!(vsmall.ok(), Some(1));

        let vsol = parse_ui_to_base("2.5", 9);
        assert!(vsol.is_ok(), "parse failed: {vsol:?}");
        assert_eq!(vsol.ok(), Some(2_500_000_000));
    }

    #[test]
    fn parse_ui_rejects_bad_input() {
        assert!(parse_ui_to_base("1.0000001", 6).is_err(), "excess decimals");
        assert!(parse_ui_to_base("-1", 6).is_err(), "negative");
        assert!(parse_ui_to_base("", 6).is_err(), "empty");
        assert!(parse_ui_to_base("abc", 6).is_err(), "non-numeric");
    }

    #[test]
    fn format_base_round_trips() -> eyre::Result<()> {
        assert_eq!(format_base_to_ui(1_500_000, 6)?, "1.5");
        assert_eq!(format_base_to_ui(1, 6)?, "0.000001");
        assert_eq!(format_base_to_ui(10_000_000, 6)?, "10");
        assert_eq!(format_base_to_ui(42, 0)?, "42");
        Ok(())
    }
}
