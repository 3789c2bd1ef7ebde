//! Test Utilities Module
//!
//! Scripted in-memory ledger and predictors for deterministic tests. No
//! network access; every response is driven by the state set on the mock.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use crate::ledger::abi::{IBondingCurve, IERC20, IRouter, ITokenFactory};
use crate::ledger::{CallRequest, Ledger, LedgerError, PreparedRequest, Receipt, Simulation, TxHash};
use crate::vanity::AddressPredictor;

/// Fixed clock returned by [`MockLedger::now`]
pub const MOCK_NOW: u64 = 1_700_000_000;

#[derive(Debug, Default)]
struct MockState {
    graduated: HashMap<Address, bool>,
    /// Flip a curve to graduated once it has been read this many times
    graduate_after_reads: HashMap<Address, u64>,
    graduation_reads: HashMap<Address, u64>,
    graduation_read_fails: bool,

    buy_quote: U256,
    sell_quote: U256,
    pool_quote: U256,
    quote_fails: bool,
    curve_state: (U256, U256, U256),

    native_balance: U256,
    token_balances: HashMap<(Address, Address), U256>,
    balance_read_fails: bool,
    allowances: HashMap<(Address, Address, Address), U256>,

    simulate_revert: Option<Bytes>,
    approve_revert: Option<Bytes>,
    submit_error: Option<LedgerError>,
    receipt_revert: Option<String>,

    pending_approvals: HashMap<TxHash, (Address, Address, Address, U256)>,
    simulations: Vec<CallRequest>,
    submissions: Vec<PreparedRequest>,
    approvals_submitted: u64,
    next_tx: u64,
}

/// Scripted [`Ledger`] implementation
///
/// Approvals take effect when their receipt is first polled, mirroring a
/// real chain where the allowance changes only once mined.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
    hold_receipts: Arc<AtomicBool>,
    receipt_polls: Arc<AtomicU64>,
    predictions: Arc<AtomicU64>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_graduated(&self, curve: Address, graduated: bool) {
        self.state().graduated.insert(curve, graduated);
    }

    /// Report graduation once `curve` has been read `reads` times
    pub fn graduate_after_reads(&self, curve: Address, reads: u64) {
        self.state().graduate_after_reads.insert(curve, reads);
    }

    pub fn set_graduation_read_fails(&self, fails: bool) {
        self.state().graduation_read_fails = fails;
    }

    pub fn graduation_reads(&self, curve: Address) -> u64 {
        self.state().graduation_reads.get(&curve).copied().unwrap_or_default()
    }

    pub fn set_buy_quote(&self, amount_out: U256) {
        self.state().buy_quote = amount_out;
    }

    pub fn set_sell_quote(&self, amount_out: U256) {
        self.state().sell_quote = amount_out;
    }

    pub fn set_pool_quote(&self, amount_out: U256) {
        self.state().pool_quote = amount_out;
    }

    pub fn set_quote_fails(&self, fails: bool) {
        self.state().quote_fails = fails;
    }

    pub fn set_curve_state(&self, reserve_in: U256, reserve_out: U256, target_in: U256) {
        self.state().curve_state = (reserve_in, reserve_out, target_in);
    }

    pub fn set_native_balance(&self, balance: U256) {
        self.state().native_balance = balance;
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, balance: U256) {
        self.state().token_balances.insert((token, owner), balance);
    }

    pub fn set_balance_read_fails(&self, fails: bool) {
        self.state().balance_read_fails = fails;
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state().allowances.insert((token, owner, spender), amount);
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Revert every non-approval dry-run with `data`
    pub fn set_simulate_revert(&self, data: Option<Bytes>) {
        self.state().simulate_revert = data;
    }

    pub fn set_approve_revert(&self, data: Option<Bytes>) {
        self.state().approve_revert = data;
    }

    pub fn set_submit_error(&self, err: Option<LedgerError>) {
        self.state().submit_error = err;
    }

    /// Mine subsequent transactions with a failed status
    pub fn set_receipt_revert(&self, reason: Option<String>) {
        self.state().receipt_revert = reason;
    }

    /// While set, receipt polls report "pending"
    pub fn hold_receipts(&self, hold: bool) {
        self.hold_receipts.store(hold, Ordering::SeqCst);
    }

    pub fn receipt_polls(&self) -> u64 {
        self.receipt_polls.load(Ordering::SeqCst)
    }

    pub fn approvals_submitted(&self) -> u64 {
        self.state().approvals_submitted
    }

    pub fn submissions(&self) -> Vec<PreparedRequest> {
        self.state().submissions.clone()
    }

    pub fn simulations(&self) -> Vec<CallRequest> {
        self.state().simulations.clone()
    }

    /// Number of `predictTokenAddress` reads served
    pub fn predictions(&self) -> u64 {
        self.predictions.load(Ordering::SeqCst)
    }

    fn read_graduation(&self, curve: Address) -> Result<Bytes, LedgerError> {
        let mut state = self.state();
        if state.graduation_read_fails {
            return Err(LedgerError::transport("isGraduated unavailable"));
        }
        let reads = state.graduation_reads.entry(curve).or_default();
        *reads += 1;
        let reads = *reads;
        if let Some(&after) = state.graduate_after_reads.get(&curve) {
            if reads > after {
                state.graduated.insert(curve, true);
            }
        }
        let flag = state.graduated.get(&curve).copied().unwrap_or(false);
        Ok((flag,).abi_encode_params().into())
    }
}

/// Deterministic address for a salt, shared by the mock factory and tests
pub fn mock_predicted_address(salt: B256) -> Address {
    Address::from_slice(&keccak256(salt)[12..])
}

#[async_trait]
impl Ledger for MockLedger {
    async fn read(&self, call: CallRequest) -> Result<Bytes, LedgerError> {
        let selector = call
            .selector()
            .ok_or_else(|| LedgerError::Decode("empty calldata".into()))?;

        match selector {
            IBondingCurve::isGraduatedCall::SELECTOR => self.read_graduation(call.to),
            IBondingCurve::getBuyQuoteCall::SELECTOR | IBondingCurve::getSellQuoteCall::SELECTOR => {
                let state = self.state();
                if state.quote_fails {
                    return Err(LedgerError::transport("quote read failed"));
                }
                let out = if selector == IBondingCurve::getBuyQuoteCall::SELECTOR {
                    state.buy_quote
                } else {
                    state.sell_quote
                };
                Ok((out, U256::ZERO).abi_encode_params().into())
            }
            IRouter::getAmountsOutCall::SELECTOR => {
                let decoded = IRouter::getAmountsOutCall::abi_decode(&call.data, true)
                    .map_err(|e| LedgerError::Decode(e.to_string()))?;
                let state = self.state();
                if state.quote_fails {
                    return Err(LedgerError::transport("quote read failed"));
                }
                Ok((vec![decoded.amountIn, state.pool_quote],).abi_encode_params().into())
            }
            IBondingCurve::curveStateCall::SELECTOR => {
                let (reserve_in, reserve_out, target) = self.state().curve_state;
                let graduated = self.state().graduated.get(&call.to).copied().unwrap_or(false);
                Ok((reserve_in, reserve_out, target, graduated).abi_encode_params().into())
            }
            IERC20::balanceOfCall::SELECTOR => {
                let decoded = IERC20::balanceOfCall::abi_decode(&call.data, true)
                    .map_err(|e| LedgerError::Decode(e.to_string()))?;
                let state = self.state();
                if state.balance_read_fails {
                    return Err(LedgerError::transport("balanceOf unavailable"));
                }
                let balance = state
                    .token_balances
                    .get(&(call.to, decoded.owner))
                    .copied()
                    .unwrap_or_default();
                Ok((balance,).abi_encode_params().into())
            }
            IERC20::allowanceCall::SELECTOR => {
                let decoded = IERC20::allowanceCall::abi_decode(&call.data, true)
                    .map_err(|e| LedgerError::Decode(e.to_string()))?;
                Ok((self.allowance(call.to, decoded.owner, decoded.spender),).abi_encode_params().into())
            }
            ITokenFactory::predictTokenAddressCall::SELECTOR => {
                let decoded = ITokenFactory::predictTokenAddressCall::abi_decode(&call.data, true)
                    .map_err(|e| LedgerError::Decode(e.to_string()))?;
                self.predictions.fetch_add(1, Ordering::SeqCst);
                Ok((mock_predicted_address(decoded.salt),).abi_encode_params().into())
            }
            other => Err(LedgerError::Decode(format!("unknown selector 0x{}", hex::encode(other)))),
        }
    }

    async fn simulate(&self, call: CallRequest) -> Result<Simulation, LedgerError> {
        let mut state = self.state();
        state.simulations.push(call.clone());

        let is_approve = call.selector() == Some(IERC20::approveCall::SELECTOR);
        let revert = if is_approve {
            state.approve_revert.clone()
        } else {
            state.simulate_revert.clone()
        };
        if let Some(data) = revert {
            return Err(LedgerError::Reverted { data });
        }

        let result: Bytes = if call.selector() == Some(ITokenFactory::createTokenCall::SELECTOR) {
            let decoded = ITokenFactory::createTokenCall::abi_decode(&call.data, true)
                .map_err(|e| LedgerError::Decode(e.to_string()))?;
            (mock_predicted_address(decoded.salt),).abi_encode_params().into()
        } else {
            Bytes::new()
        };

        Ok(Simulation {
            result,
            prepared: PreparedRequest {
                call,
                gas_limit: Some(200_000),
            },
        })
    }

    async fn submit(&self, prepared: PreparedRequest) -> Result<TxHash, LedgerError> {
        let mut state = self.state();
        if let Some(err) = state.submit_error.clone() {
            return Err(err);
        }

        state.next_tx += 1;
        let tx = keccak256(state.next_tx.to_be_bytes());

        if prepared.call.selector() == Some(IERC20::approveCall::SELECTOR) {
            let decoded = IERC20::approveCall::abi_decode(&prepared.call.data, true)
                .map_err(|e| LedgerError::Decode(e.to_string()))?;
            let owner = prepared.call.from.unwrap_or_default();
            state
                .pending_approvals
                .insert(tx, (prepared.call.to, owner, decoded.spender, decoded.value));
            state.approvals_submitted += 1;
        }
        state.submissions.push(prepared);
        Ok(tx)
    }

    async fn get_receipt(&self, tx: TxHash) -> Result<Option<Receipt>, LedgerError> {
        self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        if self.hold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut state = self.state();
        if let Some(reason) = state.receipt_revert.clone() {
            return Ok(Some(Receipt {
                tx_hash: tx,
                success: false,
                block_number: 1,
                gas_used: 50_000,
                revert_reason: Some(reason),
            }));
        }
        if let Some((token, owner, spender, value)) = state.pending_approvals.remove(&tx) {
            state.allowances.insert((token, owner, spender), value);
        }
        Ok(Some(Receipt {
            tx_hash: tx,
            success: true,
            block_number: 1,
            gas_used: 100_000,
            revert_reason: None,
        }))
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256, LedgerError> {
        Ok(self.state().native_balance)
    }

    fn now(&self) -> u64 {
        MOCK_NOW
    }
}

/// Predictor with call counting and an optional permanent failure
#[derive(Debug, Default)]
pub struct CountingPredictor {
    calls: AtomicU64,
    always_fail: bool,
}

impl CountingPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicU64::new(0),
            always_fail: true,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressPredictor for CountingPredictor {
    async fn predict_address(&self, _encoded: &Bytes, salt: B256) -> Result<Address, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(LedgerError::transport("predictor unavailable"));
        }
        Ok(mock_predicted_address(salt))
    }
}

/// Well-known addresses used across scenario tests
pub mod fixtures {
    use alloy_primitives::Address;

    use crate::config::{Config, ContractsConfig};
    use crate::types::AssetRef;

    pub fn owner() -> Address {
        Address::repeat_byte(0x0a)
    }

    pub fn token() -> Address {
        Address::repeat_byte(0x70)
    }

    pub fn router() -> Address {
        Address::repeat_byte(0xaa)
    }

    pub fn quote_asset() -> Address {
        Address::repeat_byte(0xee)
    }

    pub fn factory() -> Address {
        Address::repeat_byte(0xfa)
    }

    pub fn asset() -> AssetRef {
        AssetRef::self_curved(token())
    }

    pub fn config() -> Config {
        let mut config = Config {
            contracts: ContractsConfig {
                router: router(),
                quote_asset: quote_asset(),
                factory: factory(),
                init_code_hash: None,
            },
            ..Config::default()
        };
        config.trading.poll_interval_ms = 10;
        config.trading.confirmation_timeout_secs = 5;
        config.miner.budget = 16;
        config
    }
}
