//! Common types used throughout the engine

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::codec::TokenCreationParams;
use crate::fixed_point::BPS_DENOMINATOR;
use crate::route::Route;

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// Native quote asset in, traded asset out
    Buy,
    /// Traded asset in, native quote asset out
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("buy"),
            TradeSide::Sell => f.write_str("sell"),
        }
    }
}

/// A launchpad asset: its ERC-20 contract and the contract running its curve
///
/// For most launchpads both are the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub token: Address,
    pub curve: Address,
}

impl AssetRef {
    /// Asset whose token contract also hosts the curve
    pub fn self_curved(token: Address) -> Self {
        Self { token, curve: token }
    }

    pub fn curve_is_token(&self) -> bool {
        self.token == self.curve
    }
}

/// Snapshot of the bonding curve, owned by the external contract
///
/// `is_graduated` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveState {
    pub virtual_reserve_in: U256,
    pub virtual_reserve_out: U256,
    pub target_in: U256,
    pub is_graduated: bool,
}

impl CurveState {
    /// Progress towards graduation in basis points, capped at 10000
    pub fn progress_bps(&self) -> u64 {
        if self.is_graduated {
            return BPS_DENOMINATOR;
        }
        if self.target_in.is_zero() {
            return 0;
        }
        let scaled = self.virtual_reserve_in.saturating_mul(U256::from(BPS_DENOMINATOR)) / self.target_in;
        scaled.min(U256::from(BPS_DENOMINATOR)).to::<u64>()
    }
}

/// Why a quote carries the value it does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    Available,
    /// Input was zero; the ledger was not consulted
    ZeroInput,
    /// The pricing read failed or returned undecodable data
    Unavailable(String),
}

/// Expected output for a prospective trade. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub side: TradeSide,
    /// Amount that will actually be sent (after any sell margin)
    pub input_amount: U256,
    pub output_amount: U256,
    pub route: Route,
    pub status: QuoteStatus,
}

impl Quote {
    pub fn zero(side: TradeSide, input_amount: U256, route: Route, status: QuoteStatus) -> Self {
        Self {
            side,
            input_amount,
            output_amount: U256::ZERO,
            route,
            status,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.status, QuoteStatus::Available)
    }
}

/// A single user trade request, consumed by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub side: TradeSide,
    /// Human decimal string, e.g. "0.25"
    pub raw_amount: String,
    /// Decimals used to scale `raw_amount`
    pub token_decimals: u8,
    pub slippage_bps: u64,
}

impl TradeIntent {
    pub fn buy(raw_amount: impl Into<String>, decimals: u8, slippage_bps: u64) -> Self {
        Self {
            side: TradeSide::Buy,
            raw_amount: raw_amount.into(),
            token_decimals: decimals,
            slippage_bps,
        }
    }

    pub fn sell(raw_amount: impl Into<String>, decimals: u8, slippage_bps: u64) -> Self {
        Self {
            side: TradeSide::Sell,
            raw_amount: raw_amount.into(),
            token_decimals: decimals,
            slippage_bps,
        }
    }
}

/// Fresh allowance read for one spend. Never cached across trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceRecord {
    pub owner: Address,
    pub spender: Address,
    pub current_allowance: U256,
    pub required_amount: U256,
}

impl AllowanceRecord {
    pub fn is_sufficient(&self) -> bool {
        self.current_allowance >= self.required_amount
    }
}

/// A scored salt produced by the vanity miner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentCandidate {
    pub salt: B256,
    pub predicted_address: Address,
    pub score: u32,
    /// Zero-based attempt index that produced this candidate
    pub attempt: u64,
}

/// A request to create a new launchpad asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentIntent {
    pub params: TokenCreationParams,
    /// Salt search attempts; `None` uses the configured default
    pub mining_budget: Option<u64>,
    /// Native value sent with creation for the creator's first buy
    pub initial_buy: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_progress() {
        let mut state = CurveState {
            virtual_reserve_in: U256::from(25u64),
            virtual_reserve_out: U256::from(1_000u64),
            target_in: U256::from(100u64),
            is_graduated: false,
        };
        assert_eq!(state.progress_bps(), 2_500);

        state.virtual_reserve_in = U256::from(150u64);
        assert_eq!(state.progress_bps(), 10_000);

        state.target_in = U256::ZERO;
        assert_eq!(state.progress_bps(), 0);

        state.is_graduated = true;
        assert_eq!(state.progress_bps(), 10_000);
    }

    #[test]
    fn test_allowance_record() {
        let record = AllowanceRecord {
            owner: Address::repeat_byte(1),
            spender: Address::repeat_byte(2),
            current_allowance: U256::from(10u64),
            required_amount: U256::from(10u64),
        };
        assert!(record.is_sufficient());
    }

    #[test]
    fn test_side_serde() {
        assert_eq!(serde_json::to_string(&TradeSide::Sell).unwrap(), "\"sell\"");
        assert_eq!(TradeSide::Buy.to_string(), "buy");
    }
}
