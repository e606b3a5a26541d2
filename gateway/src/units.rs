use alloy_primitives::U256;

use crate::error::{GatewayError, Result};

/// Decimals of ether (1 ether = 10^18 wei).
pub const ETHER_DECIMALS: u8 = 18;

/// Convert a human decimal string into its smallest-unit integer.
///
/// Accepts `digits` or `digits.digits` only; signs, exponents, separators and
/// bare dots are rejected. The whole and fractional parts are scaled as
/// integers, so any amount that fits in 256 bits converts exactly.
///
/// # Errors
///
/// Returns `GatewayError::InvalidAmount` for empty or malformed input, when
/// the input has more significant fractional digits than `decimals`, or when
/// the result overflows.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::invalid_amount(input, "amount is empty"));
    }

    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let has_dot = whole.len() != trimmed.len();
    if !is_digits(whole) || (has_dot && !is_digits(frac)) {
        return Err(GatewayError::invalid_amount(
            input,
            "expected a non-negative decimal number such as 0.01",
        ));
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > usize::from(decimals) {
        return Err(GatewayError::invalid_amount(
            input,
            format!("more than {decimals} decimal places"),
        ));
    }

    let too_large = || GatewayError::invalid_amount(input, "amount is too large");
    let whole = U256::from_str_radix(whole, 10).map_err(|_| too_large())?;
    let frac = if frac.is_empty() {
        U256::ZERO
    } else {
        let digits = U256::from_str_radix(frac, 10).map_err(|_| too_large())?;
        digits * pow10(u32::from(decimals) - frac.len() as u32)
    };

    whole
        .checked_mul(pow10(u32::from(decimals)))
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(too_large)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Format a smallest-unit integer as a decimal string.
///
/// Trailing fractional zeros are trimmed but one fractional digit is always
/// kept, so `0` formats as `"0.0"` and 1.5 ether as `"1.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let (whole, frac) = value.div_rem(pow10(u32::from(decimals)));
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{frac}")
    }
}

/// [`parse_units`] with 18 decimals.
pub fn parse_ether(input: &str) -> Result<U256> {
    parse_units(input, ETHER_DECIMALS)
}

/// [`format_units`] with 18 decimals.
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}
