//! Launchpad Engine - trade and deployment orchestration for bonding-curve assets
//!
//! Quotes buys and sells against a two-phase pricing model (bonding curve
//! before graduation, liquidity pool after), enforces slippage floors and
//! allowance sequencing before anything is signed, and mines vanity salts
//! for new asset deployments. All chain access goes through the injected
//! [`Ledger`] capability.

pub mod allowance;
pub mod codec;
pub mod config;
pub mod fixed_point;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod quote;
pub mod route;
pub mod slippage;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_orchestrator;
pub mod types;
pub mod vanity;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use allowance::{AllowanceManager, ApprovalOutcome};
pub use codec::{encode_creation_params, TokenCreationParams};
pub use config::Config;
pub use ledger::{Ledger, LedgerError, ReceiptOutcome};
pub use quote::{apply_sell_margin, QuotePreviewEngine};
pub use route::{GraduationPhase, Route, RoutePlan, RouteSelector};
pub use tx_orchestrator::{DeploymentReceipt, TradeError, TradeReceipt, TransactionOrchestrator, TxPhase};
pub use types::{AssetRef, DeploymentCandidate, DeploymentIntent, Quote, TradeIntent, TradeSide};
pub use vanity::{AddressPredictor, Create2Predictor, LedgerPredictor, MiningPolicy, VanityMiner};
