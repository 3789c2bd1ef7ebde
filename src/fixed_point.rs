//! Integer-safe basis-point arithmetic on token amounts
//!
//! Every slippage floor and sell margin in the engine goes through these
//! helpers so that rounding is identical everywhere: results are floored,
//! never rounded up, and no value-moving amount ever touches floating point.

use alloy_primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::U256;

use crate::tx_orchestrator::TradeError;

/// One whole unit expressed in basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// `floor(amount * bps / 10000)` without intermediate overflow.
///
/// `bps` above [`BPS_DENOMINATOR`] is clamped, so the result never exceeds
/// `amount`.
pub fn bps_of(amount: U256, bps: u64) -> U256 {
    let bps = U256::from(bps.min(BPS_DENOMINATOR));
    let denom = U256::from(BPS_DENOMINATOR);
    // (q*D + r) * b / D == q*b + floor(r*b / D), and q*b <= amount
    let quotient = amount / denom;
    let remainder = amount % denom;
    quotient * bps + (remainder * bps) / denom
}

/// `amount - floor(amount * bps / 10000)`, clamped at zero.
pub fn apply_basis_point_reduction(amount: U256, bps: u64) -> U256 {
    amount.saturating_sub(bps_of(amount, bps))
}

/// Parse a human decimal string ("1.25") into smallest units.
///
/// Zero, negative and malformed amounts are rejected with
/// [`TradeError::Validation`], as are amounts with more fractional digits
/// than `decimals` can represent.
pub fn parse_amount(raw: &str, decimals: u8) -> Result<U256, TradeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TradeError::validation("amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(TradeError::validation(format!("amount {trimmed} is negative")));
    }

    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > usize::from(decimals) {
            return Err(TradeError::validation(format!(
                "amount {trimmed} has more than {decimals} fractional digits"
            )));
        }
    }

    let parsed = parse_units(trimmed, decimals)
        .map_err(|e| TradeError::validation(format!("amount {trimmed:?} is not a number: {e}")))?;

    let value = match parsed {
        ParseUnits::U256(value) => value,
        ParseUnits::I256(_) => {
            return Err(TradeError::validation(format!("amount {trimmed} is negative")))
        }
    };

    if value.is_zero() {
        return Err(TradeError::validation("amount must be greater than zero"));
    }
    Ok(value)
}

/// Render smallest units as a decimal string for logs and CLI output.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}
