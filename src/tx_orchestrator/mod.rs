//! Transaction orchestration
//!
//! Sequences every value-moving action through a fixed lifecycle:
//!
//! - **errors**: the typed outcome taxonomy returned to callers
//! - **state**: the `TxPhase` state machine and its legal transitions
//! - **orchestrator**: trade and deployment flows built on the route
//!   selector, quote engine, allowance manager and vanity miner
//!
//! ## Guarantees
//!
//! - Slippage floors and allowances are computed from reads taken during
//!   the same preparation; the graduation flag is re-read immediately
//!   before the final call is built.
//! - Dry-run reverts stop the flow before anything is signed.
//! - After broadcast nothing is retried. A missing receipt surfaces as
//!   `TransactionTimedOut`, distinct from `TransactionFailed`.
//! - One operation per session; concurrent requests are rejected.

pub mod errors;
mod orchestrator;
mod state;

pub use errors::TradeError;
pub use orchestrator::{DeploymentReceipt, TradeReceipt, TransactionOrchestrator};
pub use state::TxPhase;
