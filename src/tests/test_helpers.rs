//! Shared setup for scenario tests

use std::sync::Arc;

use alloy_primitives::U256;
use alloy_sol_types::{Revert, SolError};

use crate::codec::TokenCreationParams;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::test_utils::{fixtures, MockLedger};
use crate::tx_orchestrator::TransactionOrchestrator;

pub fn ledger_arc(ledger: &MockLedger) -> Arc<dyn Ledger> {
    Arc::new(ledger.clone())
}

pub fn orchestrator(ledger: &MockLedger) -> TransactionOrchestrator {
    orchestrator_with(ledger, fixtures::config())
}

pub fn orchestrator_with(ledger: &MockLedger, config: Config) -> TransactionOrchestrator {
    TransactionOrchestrator::new(ledger_arc(ledger), config, fixtures::owner())
}

pub fn revert_data(reason: &str) -> alloy_primitives::Bytes {
    Revert {
        reason: reason.to_string(),
    }
    .abi_encode()
    .into()
}

pub fn units(n: u64) -> U256 {
    U256::from(n)
}

pub fn creation_params() -> TokenCreationParams {
    TokenCreationParams {
        name: "Moon Cat".to_string(),
        symbol: "MCAT".to_string(),
        description: "the cat that went to the moon".to_string(),
        image_uri: "ipfs://moon-cat".to_string(),
        website: String::new(),
        twitter: "@mooncat".to_string(),
        telegram: String::new(),
        creator: fixtures::owner(),
    }
}
