//! Creation-parameter encoding
//!
//! The byte layout produced here is what the factory hashes when it predicts
//! and deploys a token, so it must match the contract exactly. No business
//! rules live here beyond input shape validation.

use alloy_primitives::{keccak256, Address, Bytes, B256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::ledger::abi::ITokenFactory::CreationParams;
use crate::tx_orchestrator::TradeError;

const MAX_NAME_LEN: usize = 32;
const MAX_SYMBOL_LEN: usize = 10;

/// User-facing creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCreationParams {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_uri: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub telegram: String,
    pub creator: Address,
}

impl TokenCreationParams {
    pub fn validate(&self) -> Result<(), TradeError> {
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(TradeError::validation(format!(
                "name must be 1..={MAX_NAME_LEN} characters, got {name_len}"
            )));
        }
        let symbol = self.symbol.trim();
        if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
            return Err(TradeError::validation(format!(
                "symbol must be 1..={MAX_SYMBOL_LEN} characters, got {}",
                symbol.len()
            )));
        }
        if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TradeError::validation(format!(
                "symbol {symbol:?} must be ASCII alphanumeric"
            )));
        }
        if self.creator.is_zero() {
            return Err(TradeError::validation("creator address is zero"));
        }
        Ok(())
    }
}

/// `keccak256(abi.encode(description, imageUri, website, twitter, telegram))`
pub fn metadata_hash(params: &TokenCreationParams) -> B256 {
    let encoded = (
        params.description.clone(),
        params.image_uri.clone(),
        params.website.clone(),
        params.twitter.clone(),
        params.telegram.clone(),
    )
        .abi_encode_params();
    keccak256(encoded)
}

/// Solidity struct passed to `predictTokenAddress` / `createToken`
pub fn to_sol(params: &TokenCreationParams) -> CreationParams {
    CreationParams {
        name: params.name.trim().to_string(),
        symbol: params.symbol.trim().to_string(),
        metadataHash: metadata_hash(params),
        creator: params.creator,
    }
}

/// `abi.encode(CreationParams)`
pub fn encode_creation_params(params: &TokenCreationParams) -> Bytes {
    Bytes::from(to_sol(params).abi_encode())
}
