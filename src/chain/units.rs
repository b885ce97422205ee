//! Native currency unit conversion
//!
//! Balances travel over RPC as integer base units (wei). Everything above
//! the RPC layer works in whole-coin `Decimal`s. Conversions here use
//! integer arithmetic only.

use alloy::primitives::U256;
use rust_decimal::Decimal;

use super::error::UnitsError;

/// Decimals of the chain's native currency
pub const NATIVE_DECIMALS: u32 = 18;

/// Convert a whole-coin amount to base units (`amount * 10^decimals`).
///
/// Digits below `10^-decimals` are truncated, never rounded.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<U256, UnitsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitsError::Negative(amount.to_string()));
    }

    let mantissa = amount.mantissa().unsigned_abs();
    let scale = amount.scale();

    if scale <= decimals {
        let factor = U256::from(10u64).pow(U256::from(decimals - scale));
        U256::from(mantissa)
            .checked_mul(factor)
            .ok_or_else(|| UnitsError::Overflow(amount.to_string()))
    } else {
        // Decimal scale is at most 28, so the divisor fits in u128
        let divisor = 10u128.pow(scale - decimals);
        Ok(U256::from(mantissa / divisor))
    }
}

/// Convert base units back to a whole-coin `Decimal`.
pub fn from_base_units(raw: u128, decimals: u32) -> Result<Decimal, UnitsError> {
    let unit = 10u128.pow(decimals);
    let whole = raw / unit;
    let frac = raw % unit;

    let whole = Decimal::try_from_i128_with_scale(whole as i128, 0)
        .map_err(|_| UnitsError::Overflow(raw.to_string()))?;
    let frac = Decimal::try_from_i128_with_scale(frac as i128, decimals)
        .map_err(|_| UnitsError::Overflow(raw.to_string()))?;

    whole
        .checked_add(frac)
        .map(|d| d.normalize())
        .ok_or_else(|| UnitsError::Overflow(raw.to_string()))
}

/// Parse a `0x`-prefixed hex quantity as returned by JSON-RPC
pub fn parse_quantity(hex_str: &str) -> Result<u128, std::num::ParseIntError> {
    let digits = hex_str.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
}
