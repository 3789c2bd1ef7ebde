//! Route selection between the bonding curve and the post-graduation pool
//!
//! The graduation flag is owned by the curve contract and only ever flips
//! from false to true. The selector reads it fresh for every trade
//! preparation and latches the graduated state per asset, so a session never
//! routes back to the curve once it has seen graduation.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ContractsConfig;
use crate::ledger::abi::{IBondingCurve, IRouter};
use crate::ledger::{read_call, CallRequest, Ledger, LedgerError};
use crate::tx_orchestrator::TradeError;
use crate::types::{AssetRef, TradeSide};

/// Where a trade executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    BondingCurve,
    PoolSwap,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::BondingCurve => f.write_str("bonding_curve"),
            Route::PoolSwap => f.write_str("pool_swap"),
        }
    }
}

/// Lifecycle phase of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraduationPhase {
    PreGraduation,
    PostGraduation,
}

impl GraduationPhase {
    pub fn from_flag(is_graduated: bool) -> Self {
        if is_graduated {
            Self::PostGraduation
        } else {
            Self::PreGraduation
        }
    }

    pub fn route(self) -> Route {
        match self {
            Self::PreGraduation => Route::BondingCurve,
            Self::PostGraduation => Route::PoolSwap,
        }
    }
}

/// Reads the graduation flag and enforces per-session monotonicity
#[derive(Debug)]
pub struct RouteSelector {
    ledger: Arc<dyn Ledger>,
    graduated: DashSet<Address>,
}

impl RouteSelector {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            graduated: DashSet::new(),
        }
    }

    /// Current phase of `asset`
    ///
    /// Reads `isGraduated` from the curve contract unless this session has
    /// already observed graduation.
    pub async fn select(&self, asset: &AssetRef) -> Result<GraduationPhase, TradeError> {
        if self.graduated.contains(&asset.curve) {
            return Ok(GraduationPhase::PostGraduation);
        }

        let flag = read_call(self.ledger.as_ref(), asset.curve, &IBondingCurve::isGraduatedCall {})
            .await?
            ._0;

        if flag {
            if self.graduated.insert(asset.curve) {
                info!(token = %asset.token, "Asset graduated; routing through pool");
            }
            return Ok(GraduationPhase::PostGraduation);
        }

        debug!(token = %asset.token, "Asset on bonding curve");
        Ok(GraduationPhase::PreGraduation)
    }

    /// Whether this session has latched `asset` as graduated
    pub fn is_latched(&self, asset: &AssetRef) -> bool {
        self.graduated.contains(&asset.curve)
    }
}

/// Concrete call targets for one asset in one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    pub phase: GraduationPhase,
    pub asset: AssetRef,
    router: Address,
    quote_asset: Address,
    deadline_secs: u64,
}

impl RoutePlan {
    pub fn new(phase: GraduationPhase, asset: AssetRef, contracts: &ContractsConfig, deadline_secs: u64) -> Self {
        Self {
            phase,
            asset,
            router: contracts.router,
            quote_asset: contracts.quote_asset,
            deadline_secs,
        }
    }

    pub fn route(&self) -> Route {
        self.phase.route()
    }

    /// Contract that receives the trade call
    pub fn target(&self) -> Address {
        match self.phase {
            GraduationPhase::PreGraduation => self.asset.curve,
            GraduationPhase::PostGraduation => self.router,
        }
    }

    /// Address that must be approved to pull tokens, if any
    ///
    /// Buys pay in the native asset. A curve hosted by the token contract
    /// burns from the seller directly and needs no allowance.
    pub fn spender(&self, side: TradeSide) -> Option<Address> {
        match (side, self.phase) {
            (TradeSide::Buy, _) => None,
            (TradeSide::Sell, GraduationPhase::PreGraduation) => {
                (!self.asset.curve_is_token()).then_some(self.asset.curve)
            }
            (TradeSide::Sell, GraduationPhase::PostGraduation) => Some(self.router),
        }
    }

    /// Two-hop swap path
    pub fn path(&self, side: TradeSide) -> Vec<Address> {
        match side {
            TradeSide::Buy => vec![self.quote_asset, self.asset.token],
            TradeSide::Sell => vec![self.asset.token, self.quote_asset],
        }
    }

    pub fn deadline(&self, now: u64) -> U256 {
        U256::from(now.saturating_add(self.deadline_secs))
    }

    /// Pricing read for `amount_in` on this route
    pub fn quote_call(&self, side: TradeSide, amount_in: U256) -> CallRequest {
        match (self.phase, side) {
            (GraduationPhase::PreGraduation, TradeSide::Buy) => {
                CallRequest::call(self.asset.curve, &IBondingCurve::getBuyQuoteCall { amountIn: amount_in })
            }
            (GraduationPhase::PreGraduation, TradeSide::Sell) => {
                CallRequest::call(self.asset.curve, &IBondingCurve::getSellQuoteCall { amountIn: amount_in })
            }
            (GraduationPhase::PostGraduation, _) => CallRequest::call(
                self.router,
                &IRouter::getAmountsOutCall {
                    amountIn: amount_in,
                    path: self.path(side),
                },
            ),
        }
    }

    /// Decode the output amount from a [`quote_call`](Self::quote_call) response
    pub fn decode_quote(&self, side: TradeSide, data: &Bytes) -> Result<U256, LedgerError> {
        let decoded = match (self.phase, side) {
            (GraduationPhase::PreGraduation, TradeSide::Buy) => {
                IBondingCurve::getBuyQuoteCall::abi_decode_returns(data, true).map(|r| r.amountOut)
            }
            (GraduationPhase::PreGraduation, TradeSide::Sell) => {
                IBondingCurve::getSellQuoteCall::abi_decode_returns(data, true).map(|r| r.amountOut)
            }
            (GraduationPhase::PostGraduation, _) => {
                let amounts = IRouter::getAmountsOutCall::abi_decode_returns(data, true)
                    .map_err(|e| LedgerError::Decode(format!("getAmountsOut: {e}")))?
                    .amounts;
                return amounts
                    .last()
                    .copied()
                    .ok_or_else(|| LedgerError::Decode("getAmountsOut returned no amounts".into()));
            }
        };
        decoded.map_err(|e| LedgerError::Decode(format!("quote: {e}")))
    }

    /// State-changing trade call
    ///
    /// Buys attach `amount_in` as native value.
    pub fn trade_call(
        &self,
        side: TradeSide,
        amount_in: U256,
        min_out: U256,
        recipient: Address,
        now: u64,
    ) -> CallRequest {
        let target = self.target();
        let request = match (self.phase, side) {
            (GraduationPhase::PreGraduation, TradeSide::Buy) => {
                CallRequest::call(target, &IBondingCurve::buyCall { minAmountOut: min_out }).with_value(amount_in)
            }
            (GraduationPhase::PreGraduation, TradeSide::Sell) => CallRequest::call(
                target,
                &IBondingCurve::sellCall {
                    amountIn: amount_in,
                    minAmountOut: min_out,
                },
            ),
            (GraduationPhase::PostGraduation, TradeSide::Buy) => CallRequest::call(
                target,
                &IRouter::swapExactETHForTokensSupportingFeeOnTransferTokensCall {
                    amountOutMin: min_out,
                    path: self.path(side),
                    to: recipient,
                    deadline: self.deadline(now),
                },
            )
            .with_value(amount_in),
            (GraduationPhase::PostGraduation, TradeSide::Sell) => CallRequest::call(
                target,
                &IRouter::swapExactTokensForETHSupportingFeeOnTransferTokensCall {
                    amountIn: amount_in,
                    amountOutMin: min_out,
                    path: self.path(side),
                    to: recipient,
                    deadline: self.deadline(now),
                },
            ),
        };
        request.with_from(recipient)
    }
}
