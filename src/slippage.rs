//! Slippage protection
//!
//! Derives the minimum output a trade will accept from a quote. The bound
//! is always floored so it never exceeds the quoted output.

use alloy_primitives::U256;

use crate::fixed_point::{apply_basis_point_reduction, BPS_DENOMINATOR};
use crate::tx_orchestrator::TradeError;
use crate::types::{Quote, QuoteStatus};

/// `output - floor(output * tolerance_bps / 10000)`
pub fn minimum_acceptable(output: U256, tolerance_bps: u64) -> U256 {
    apply_basis_point_reduction(output, tolerance_bps)
}

/// Reject tolerances above the configured cap or above 100%
pub fn validate_tolerance(tolerance_bps: u64, max_bps: u64) -> Result<(), TradeError> {
    let cap = max_bps.min(BPS_DENOMINATOR);
    if tolerance_bps > cap {
        return Err(TradeError::validation(format!(
            "slippage {tolerance_bps} bps exceeds maximum of {cap} bps"
        )));
    }
    Ok(())
}

/// Minimum acceptable output for `quote`, or the reason the trade must stop
///
/// A zero floor on a non-zero quote is allowed through.
pub fn guard(quote: &Quote, tolerance_bps: u64) -> Result<U256, TradeError> {
    match &quote.status {
        QuoteStatus::Unavailable(reason) => return Err(TradeError::quote_unavailable(reason.clone())),
        QuoteStatus::ZeroInput => return Err(TradeError::AmountTooSmall),
        QuoteStatus::Available => {}
    }
    if quote.output_amount.is_zero() {
        return Err(TradeError::AmountTooSmall);
    }
    Ok(minimum_acceptable(quote.output_amount, tolerance_bps))
}
