use alloy::primitives::U256;
use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Format a raw token amount into a human-readable decimal string
pub fn format_units(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let base = U256::from(10u64).pow(U256::from(decimals as u64));
    let whole = amount / base;
    let frac = amount % base;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}

/// Parse a human-readable decimal amount into raw token units (truncating)
pub fn parse_units(value: &str, decimals: u8) -> Result<U256> {
    let parsed = Decimal::from_str(value.trim())
        .map_err(|e| anyhow!("invalid amount '{}': {}", value, e))?;
    if parsed.is_sign_negative() {
        return Err(anyhow!("amount must not be negative: {}", value));
    }
    let scale = Decimal::from_i128_with_scale(10i128.pow(decimals as u32), 0);
    let scaled = parsed
        .checked_mul(scale)
        .ok_or_else(|| anyhow!("amount too large: {}", value))?
        .trunc()
        .normalize();
    U256::from_str(&scaled.to_string()).map_err(|e| anyhow!("amount overflow: {}", e))
}

/// Format percentage for display
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Shorten an address/hash for log lines (0x1234..abcd)
pub fn short_hex(value: &str) -> String {
    if value.len() <= 12 {
        return value.to_string();
    }
    format!("{}..{}", &value[..6], &value[value.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(
            parse_units("1.0", 18).unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        // truncates dust beyond the token's precision
        assert_eq!(parse_units("0.0000019", 6).unwrap(), U256::from(1u64));
        assert!(parse_units("-1", 6).is_err());
        assert!(parse_units("abc", 6).is_err());
    }

    #[test]
    fn test_round_trip() {
        let raw = parse_units("123.456", 8).unwrap();
        assert_eq!(format_units(raw, 8), "123.456");
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(
            short_hex("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            "0xC02a..6Cc2"
        );
        assert_eq!(short_hex("0xabc"), "0xabc");
    }
}
