//! Error types for trade and deployment orchestration
//!
//! Validation and quote problems are resolved locally and returned as typed,
//! non-fatal outcomes. Approval and submission failures carry the decoded
//! revert reason when one exists. Nothing that moves value is ever retried
//! automatically.

use thiserror::Error;

use crate::ledger::{LedgerError, TxHash};

/// Typed outcome of a failed trade or deployment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradeError {
    /// Non-positive, negative or non-numeric amount, or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The pricing read failed or could not be decoded
    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    /// Quote or post-slippage amount is zero
    #[error("Amount too small: quoted output is zero")]
    AmountTooSmall,

    /// Requested input exceeds what the owner holds
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        required: String,
        available: String,
    },

    /// Spending authorization could not be established
    #[error("Approval failed: {0}")]
    ApprovalFailed(String),

    /// Dry-run reverted before anything was broadcast
    ///
    /// `reason` is the decoded revert string when one was returned.
    #[error("Simulation reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    SimulationReverted { reason: Option<String> },

    /// The wallet declined to sign
    #[error("User rejected signing")]
    UserRejectedSigning,

    /// Broadcast succeeded but no receipt arrived in time
    ///
    /// The transaction may still be mined: fund state is unknown.
    #[error("Transaction {tx} not confirmed in time; outcome indeterminate")]
    TransactionTimedOut { tx: TxHash },

    /// Submission refused or mined with a failed status
    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    /// Another trade from this session is still in flight
    #[error("Another trade is already in flight for this session")]
    TradeInFlight,

    /// Ledger failure outside the categories above
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl TradeError {
    /// Whether the caller may safely repeat the same request as-is
    ///
    /// Only failures raised before anything was signed qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QuoteUnavailable(_) => true,
            Self::TradeInFlight => true,
            Self::Ledger(e) => e.is_transient(),

            Self::Validation(_) => false,
            Self::AmountTooSmall => false,
            Self::InsufficientBalance { .. } => false,
            Self::ApprovalFailed(_) => false,
            Self::SimulationReverted { .. } => false,
            Self::UserRejectedSigning => false,
            Self::TransactionTimedOut { .. } => false,
            Self::TransactionFailed { .. } => false,
        }
    }

    /// Error category for metrics and logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::QuoteUnavailable(_) => "quote",
            Self::AmountTooSmall => "amount",
            Self::InsufficientBalance { .. } => "balance",
            Self::ApprovalFailed(_) => "approval",
            Self::SimulationReverted { .. } => "simulation",
            Self::UserRejectedSigning => "signing",
            Self::TransactionTimedOut { .. } => "timeout",
            Self::TransactionFailed { .. } => "transaction",
            Self::TradeInFlight => "in_flight",
            Self::Ledger(_) => "ledger",
        }
    }
}

// Convenience constructors
impl TradeError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn quote_unavailable(reason: impl Into<String>) -> Self {
        Self::QuoteUnavailable(reason.into())
    }

    pub fn approval_failed(reason: impl Into<String>) -> Self {
        Self::ApprovalFailed(reason.into())
    }

    pub fn transaction_failed(reason: impl Into<String>) -> Self {
        Self::TransactionFailed {
            reason: reason.into(),
        }
    }

    /// Map a dry-run failure onto the taxonomy
    pub fn from_simulation(err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted { .. } => Self::SimulationReverted {
                reason: err.revert_reason(),
            },
            LedgerError::UserRejected => Self::UserRejectedSigning,
            other => Self::Ledger(other),
        }
    }

    /// Map a broadcast failure onto the taxonomy
    pub fn from_submission(err: LedgerError) -> Self {
        match err {
            LedgerError::UserRejected => Self::UserRejectedSigning,
            LedgerError::Reverted { .. } => Self::TransactionFailed {
                reason: err
                    .revert_reason()
                    .unwrap_or_else(|| "execution reverted".to_string()),
            },
            LedgerError::Rejected(reason) => Self::TransactionFailed { reason },
            other => Self::TransactionFailed {
                reason: other.to_string(),
            },
        }
    }
}
