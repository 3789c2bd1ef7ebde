//! Ledger boundary
//!
//! The engine never talks to a node directly. Every read, dry-run,
//! submission and receipt poll goes through the [`Ledger`] capability that
//! the embedding application injects (wallet signing included).
//!
//! Responses are normalised here: callers get typed return values decoded
//! from the contract ABI, never raw bytes.

use std::fmt;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod abi;
mod confirm;
mod errors;

pub use confirm::{await_receipt, ReceiptOutcome};
pub use errors::{decode_reason, LedgerError};

/// Transaction identifier returned on submission
pub type TxHash = B256;

/// A contract call, used for reads, dry-runs and as the body of submissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Sender; `None` lets the ledger use the connected wallet
    pub from: Option<Address>,
    /// Contract being called
    pub to: Address,
    /// ABI-encoded calldata
    pub data: Bytes,
    /// Native value attached to the call
    pub value: U256,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            data: data.into(),
            value: U256::ZERO,
        }
    }

    /// Build a request from a typed call
    pub fn call<C: SolCall>(to: Address, call: &C) -> Self {
        Self::new(to, call.abi_encode())
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// 4-byte function selector, if the calldata carries one
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }
}

/// Ready-to-sign request produced by a successful dry-run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub call: CallRequest,
    /// Gas estimate attached by the ledger, if it provides one
    pub gas_limit: Option<u64>,
}

/// Result of [`Ledger::simulate`]
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Return data of the dry-run
    pub result: Bytes,
    pub prepared: PreparedRequest,
}

/// Mined transaction receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: u64,
    pub gas_used: u64,
    /// Revert reason when `success` is false and the node exposes it
    pub revert_reason: Option<String>,
}

/// External ledger capability
///
/// Implementations wrap a node connection plus the wallet that signs
/// submissions. Only `submit` moves value.
#[async_trait]
pub trait Ledger: Send + Sync + fmt::Debug {
    /// Read-only call against the latest state
    async fn read(&self, call: CallRequest) -> Result<Bytes, LedgerError>;

    /// Dry-run a state-changing call; reverts must surface as
    /// [`LedgerError::Reverted`]
    async fn simulate(&self, call: CallRequest) -> Result<Simulation, LedgerError>;

    /// Sign and broadcast. Once this returns `Ok` the transaction cannot be
    /// withdrawn.
    async fn submit(&self, prepared: PreparedRequest) -> Result<TxHash, LedgerError>;

    /// Single receipt poll; `None` while the transaction is pending
    async fn get_receipt(&self, tx: TxHash) -> Result<Option<Receipt>, LedgerError>;

    /// Native-asset balance of `owner`
    async fn native_balance(&self, owner: Address) -> Result<U256, LedgerError>;

    /// Current unix time in seconds, used for swap deadlines
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Read `call` on `to` and decode it into the call's return type
pub async fn read_call<C>(ledger: &dyn Ledger, to: Address, call: &C) -> Result<C::Return, LedgerError>
where
    C: SolCall + Sync,
{
    let data = ledger.read(CallRequest::call(to, call)).await?;
    C::abi_decode_returns(&data, true)
        .map_err(|e| LedgerError::Decode(format!("{}: {}", C::SIGNATURE, e)))
}
