//! Quote preview
//!
//! Read-only: asks the active route's pricing function what a trade would
//! return. Failures never propagate as errors; they come back as a zero
//! quote tagged [`QuoteStatus::Unavailable`] so callers can keep previewing.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

use crate::fixed_point::BPS_DENOMINATOR;
use crate::ledger::abi::{IBondingCurve, IERC20};
use crate::ledger::{read_call, Ledger, LedgerError};
use crate::metrics::metrics;
use crate::route::RoutePlan;
use crate::types::{AssetRef, CurveState, Quote, QuoteStatus, TradeSide};

/// Amount actually sold when `requested` would empty the balance
///
/// Selling the exact balance can revert on the contract's supply
/// accounting, so a full-balance sell keeps back `max(1, balance / 10000)`.
pub fn apply_sell_margin(requested: U256, balance: U256) -> U256 {
    if requested < balance {
        return requested;
    }
    let margin = (balance / U256::from(BPS_DENOMINATOR)).max(U256::from(1u64));
    balance.saturating_sub(margin)
}

#[derive(Debug, Clone)]
pub struct QuotePreviewEngine {
    ledger: Arc<dyn Ledger>,
}

impl QuotePreviewEngine {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Expected output for spending `amount_in` of the native asset
    pub async fn preview_buy(&self, plan: &RoutePlan, amount_in: U256) -> Quote {
        self.quote_exact(plan, TradeSide::Buy, amount_in).await
    }

    /// Expected output for selling `amount` of the asset held by `owner`
    ///
    /// Reads the owner's balance and applies the sell margin; the returned
    /// quote carries the adjusted input.
    pub async fn preview_sell(&self, plan: &RoutePlan, owner: Address, amount: U256) -> Quote {
        let route = plan.route();
        if amount.is_zero() {
            return Quote::zero(TradeSide::Sell, amount, route, QuoteStatus::ZeroInput);
        }
        match self.token_balance(plan.asset.token, owner).await {
            Ok(balance) => self.preview_sell_with_balance(plan, amount, balance).await,
            Err(e) => {
                metrics().record(|m| m.quote_unavailable.inc());
                warn!(token = %plan.asset.token, error = %e, "Balance read failed");
                Quote::zero(TradeSide::Sell, amount, route, QuoteStatus::Unavailable(e.to_string()))
            }
        }
    }

    /// Sell quote against a balance the caller already read
    pub async fn preview_sell_with_balance(&self, plan: &RoutePlan, amount: U256, balance: U256) -> Quote {
        let adjusted = apply_sell_margin(amount, balance);
        if adjusted != amount {
            debug!(
                requested = %amount,
                balance = %balance,
                adjusted = %adjusted,
                "Full-balance sell reduced by safety margin"
            );
        }
        self.quote_exact(plan, TradeSide::Sell, adjusted).await
    }

    /// Quote `amount_in` as-is, with no sell margin
    pub async fn quote_exact(&self, plan: &RoutePlan, side: TradeSide, amount_in: U256) -> Quote {
        let route = plan.route();
        if amount_in.is_zero() {
            return Quote::zero(side, amount_in, route, QuoteStatus::ZeroInput);
        }

        let result = match self.ledger.read(plan.quote_call(side, amount_in)).await {
            Ok(data) => plan.decode_quote(side, &data),
            Err(e) => Err(e),
        };

        match result {
            Ok(output_amount) => Quote {
                side,
                input_amount: amount_in,
                output_amount,
                route,
                status: QuoteStatus::Available,
            },
            Err(e) => {
                metrics().record(|m| m.quote_unavailable.inc());
                warn!(side = %side, route = %route, error = %e, "Quote unavailable");
                Quote::zero(side, amount_in, route, QuoteStatus::Unavailable(e.to_string()))
            }
        }
    }

    /// ERC-20 balance of `owner`
    pub async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, LedgerError> {
        Ok(read_call(self.ledger.as_ref(), token, &IERC20::balanceOfCall { owner }).await?._0)
    }

    /// Current curve reserves and graduation flag
    pub async fn curve_state(&self, asset: &AssetRef) -> Result<CurveState, LedgerError> {
        let state = read_call(self.ledger.as_ref(), asset.curve, &IBondingCurve::curveStateCall {}).await?;
        Ok(CurveState {
            virtual_reserve_in: state.virtualReserveIn,
            virtual_reserve_out: state.virtualReserveOut,
            target_in: state.targetIn,
            is_graduated: state.graduated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_balance_sell_margin() {
        let b = U256::from(1_000_000u64);
        assert_eq!(apply_sell_margin(b, b), U256::from(999_900u64));
    }

    #[test]
    fn test_small_balance_keeps_one_unit() {
        assert_eq!(apply_sell_margin(U256::from(50u64), U256::from(50u64)), U256::from(49u64));
        assert_eq!(apply_sell_margin(U256::from(1u64), U256::from(1u64)), U256::ZERO);
        assert_eq!(apply_sell_margin(U256::ZERO, U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_partial_sell_unchanged() {
        assert_eq!(
            apply_sell_margin(U256::from(10u64), U256::from(1_000u64)),
            U256::from(10u64)
        );
    }

    #[test]
    fn test_oversized_request_uses_balance() {
        assert_eq!(
            apply_sell_margin(U256::from(5_000_000u64), U256::from(1_000_000u64)),
            U256::from(999_900u64)
        );
    }

    proptest! {
        #[test]
        fn prop_margin_strictly_below_balance(a in any::<u128>(), b in 1u128..) {
            let (a, b) = (U256::from(a), U256::from(b));
            let sent = apply_sell_margin(a, b);
            prop_assert!(sent < b);
            if a >= b {
                let margin = (b / U256::from(10_000u64)).max(U256::from(1u64));
                prop_assert_eq!(sent, b - margin);
            } else {
                prop_assert_eq!(sent, a);
            }
        }
    }
}
