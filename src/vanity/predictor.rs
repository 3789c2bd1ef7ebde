//! Deterministic deployment address prediction

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;

use crate::ledger::abi::ITokenFactory::{self, CreationParams};
use crate::ledger::{read_call, Ledger, LedgerError};

/// Maps encoded creation parameters plus a salt to the address the factory
/// would deploy to. Must be a pure function of its inputs.
#[async_trait]
pub trait AddressPredictor: Send + Sync + std::fmt::Debug {
    async fn predict_address(&self, encoded: &Bytes, salt: B256) -> Result<Address, LedgerError>;
}

/// Asks the factory contract through the ledger
#[derive(Debug, Clone)]
pub struct LedgerPredictor {
    ledger: Arc<dyn Ledger>,
    factory: Address,
}

impl LedgerPredictor {
    pub fn new(ledger: Arc<dyn Ledger>, factory: Address) -> Self {
        Self { ledger, factory }
    }
}

#[async_trait]
impl AddressPredictor for LedgerPredictor {
    async fn predict_address(&self, encoded: &Bytes, salt: B256) -> Result<Address, LedgerError> {
        let params = CreationParams::abi_decode(encoded, true)
            .map_err(|e| LedgerError::Decode(format!("creation params: {e}")))?;
        let call = ITokenFactory::predictTokenAddressCall { params, salt };
        Ok(read_call(self.ledger.as_ref(), self.factory, &call).await?._0)
    }
}

/// Local CREATE2 computation for factories that fold the creation
/// parameters into the salt
///
/// `effective = keccak256(encoded ++ salt)`, then the standard
/// `keccak256(0xff ++ factory ++ effective ++ init_code_hash)[12..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Create2Predictor {
    factory: Address,
    init_code_hash: B256,
}

impl Create2Predictor {
    pub fn new(factory: Address, init_code_hash: B256) -> Self {
        Self {
            factory,
            init_code_hash,
        }
    }

    pub fn effective_salt(encoded: &[u8], salt: B256) -> B256 {
        let mut preimage = Vec::with_capacity(encoded.len() + 32);
        preimage.extend_from_slice(encoded);
        preimage.extend_from_slice(salt.as_slice());
        keccak256(preimage)
    }

    pub fn compute(&self, encoded: &[u8], salt: B256) -> Address {
        let effective = Self::effective_salt(encoded, salt);
        self.factory.create2(effective.0, self.init_code_hash.0)
    }
}

#[async_trait]
impl AddressPredictor for Create2Predictor {
    async fn predict_address(&self, encoded: &Bytes, salt: B256) -> Result<Address, LedgerError> {
        Ok(self.compute(encoded, salt))
    }
}
