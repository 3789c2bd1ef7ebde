//! Errors raised at the ledger boundary

use alloy_primitives::Bytes;
use alloy_sol_types::{Panic, Revert, SolError};
use thiserror::Error;

/// Failure reported by the external ledger capability
///
/// These are transport-level outcomes. The orchestrator maps them onto the
/// trade taxonomy in [`crate::tx_orchestrator::TradeError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Node unreachable, request dropped or malformed response envelope
    #[error("Transport error: {0}")]
    Transport(String),

    /// Dry-run or on-chain execution reverted
    ///
    /// `data` is the raw revert payload; see [`LedgerError::revert_reason`].
    #[error("Execution reverted{}", display_reason(.data))]
    Reverted {
        /// Raw revert data returned by the node
        data: Bytes,
    },

    /// The wallet declined to sign the prepared request
    #[error("User rejected signing")]
    UserRejected,

    /// The node refused the signed transaction (nonce, fee, pool limits)
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// Response bytes did not match the expected ABI shape
    #[error("Decode error: {0}")]
    Decode(String),
}

fn display_reason(data: &Bytes) -> String {
    match decode_reason(data) {
        Some(reason) => format!(": {reason}"),
        None => String::new(),
    }
}

/// Decode the standard `Error(string)` and `Panic(uint256)` payloads
pub fn decode_reason(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data, true) {
        return Some(revert.reason).filter(|r| !r.trim().is_empty());
    }
    if let Ok(panic) = Panic::abi_decode(data, true) {
        return Some(format!("panic code {:#x}", panic.code));
    }
    None
}

impl LedgerError {
    /// Decoded `Error(string)` / `Panic(uint256)` reason, when present
    pub fn revert_reason(&self) -> Option<String> {
        match self {
            Self::Reverted { data } => decode_reason(data),
            _ => None,
        }
    }

    /// Whether a read or receipt poll may succeed if repeated
    ///
    /// Value-moving calls are never retried regardless of this flag.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn reverted(data: impl Into<Bytes>) -> Self {
        Self::Reverted { data: data.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_reason_decoding() {
        let data = Revert { reason: "Slippage exceeded".into() }.abi_encode();
        let err = LedgerError::reverted(data);
        assert_eq!(err.revert_reason().as_deref(), Some("Slippage exceeded"));
        assert_eq!(err.to_string(), "Execution reverted: Slippage exceeded");
    }

    #[test]
    fn test_undecodable_revert() {
        let err = LedgerError::reverted(Bytes::new());
        assert_eq!(err.revert_reason(), None);
        assert_eq!(err.to_string(), "Execution reverted");
    }

    #[test]
    fn test_panic_decoding() {
        let data = Panic { code: alloy_primitives::U256::from(0x11u64) }.abi_encode();
        assert_eq!(decode_reason(&data).as_deref(), Some("panic code 0x11"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::transport("connection reset").is_transient());
        assert!(!LedgerError::UserRejected.is_transient());
        assert!(!LedgerError::Decode("bad".into()).is_transient());
    }
}
