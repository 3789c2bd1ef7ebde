//! Spending authorization
//!
//! Allowances are read fresh for every spend. When short, a single approval
//! for `U256::MAX` is sent and confirmed before returning. Concurrent callers
//! for the same (token, owner, spender) wait on a shared lock and re-check,
//! so at most one approval is ever in flight per key.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ledger::abi::IERC20;
use crate::ledger::{await_receipt, read_call, CallRequest, Ledger, LedgerError, ReceiptOutcome, TxHash};
use crate::metrics::metrics;
use crate::types::AllowanceRecord;

/// Result of [`AllowanceManager::ensure_allowance`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    AlreadySufficient,
    Approved { tx: TxHash },
    Failed { reason: String },
}

type AllowanceKey = (Address, Address, Address);

#[derive(Debug)]
pub struct AllowanceManager {
    ledger: Arc<dyn Ledger>,
    locks: DashMap<AllowanceKey, Arc<Mutex<()>>>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl AllowanceManager {
    pub fn new(ledger: Arc<dyn Ledger>, confirmation_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            ledger,
            locks: DashMap::new(),
            confirmation_timeout,
            poll_interval,
        }
    }

    /// Keys with an approval in progress or waiters queued
    #[cfg(test)]
    pub(crate) fn pending_keys(&self) -> usize {
        self.locks.len()
    }

    /// Fresh allowance read
    pub async fn read_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> Result<AllowanceRecord, LedgerError> {
        let current = read_call(self.ledger.as_ref(), token, &IERC20::allowanceCall { owner, spender })
            .await?
            ._0;
        Ok(AllowanceRecord {
            owner,
            spender,
            current_allowance: current,
            required_amount: required,
        })
    }

    /// Make sure `spender` may pull at least `required` of `token` from `owner`
    pub async fn ensure_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> ApprovalOutcome {
        let key = (token, owner, spender);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        // Drop the entry once nobody else holds or waits on it
        let lock = scopeguard::guard(lock, |lock| {
            drop(lock);
            self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        });
        let _held = lock.lock().await;

        let record = match self.read_allowance(token, owner, spender, required).await {
            Ok(record) => record,
            Err(e) => {
                warn!(token = %token, spender = %spender, error = %e, "Allowance read failed");
                return ApprovalOutcome::Failed {
                    reason: format!("allowance read failed: {e}"),
                };
            }
        };

        if record.is_sufficient() {
            debug!(
                token = %token,
                spender = %spender,
                current = %record.current_allowance,
                required = %required,
                "Allowance sufficient"
            );
            return ApprovalOutcome::AlreadySufficient;
        }

        info!(
            token = %token,
            spender = %spender,
            current = %record.current_allowance,
            required = %required,
            "Allowance short; requesting unlimited approval"
        );
        self.approve_unlimited(token, owner, spender).await
    }

    async fn approve_unlimited(&self, token: Address, owner: Address, spender: Address) -> ApprovalOutcome {
        let call = CallRequest::call(
            token,
            &IERC20::approveCall {
                spender,
                value: U256::MAX,
            },
        )
        .with_from(owner);

        let simulation = match self.ledger.simulate(call).await {
            Ok(sim) => sim,
            Err(e) => {
                return ApprovalOutcome::Failed {
                    reason: failure_reason("approval simulation", &e),
                }
            }
        };

        let tx = match self.ledger.submit(simulation.prepared).await {
            Ok(tx) => tx,
            Err(e) => {
                return ApprovalOutcome::Failed {
                    reason: failure_reason("approval submission", &e),
                }
            }
        };
        metrics().record(|m| m.approvals_sent.inc());
        info!(tx = %tx, token = %token, spender = %spender, "Approval broadcast");

        match await_receipt(self.ledger.as_ref(), tx, self.confirmation_timeout, self.poll_interval).await {
            ReceiptOutcome::Confirmed(receipt) if receipt.success => ApprovalOutcome::Approved { tx },
            ReceiptOutcome::Confirmed(receipt) => ApprovalOutcome::Failed {
                reason: format!(
                    "approval {tx} reverted: {}",
                    receipt.revert_reason.as_deref().unwrap_or("no reason given")
                ),
            },
            ReceiptOutcome::Indeterminate => ApprovalOutcome::Failed {
                reason: format!("approval {tx} not confirmed in time"),
            },
        }
    }
}

fn failure_reason(stage: &str, err: &LedgerError) -> String {
    match err {
        LedgerError::UserRejected => format!("{stage}: user rejected signing"),
        other => format!("{stage}: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&ApprovalOutcome::AlreadySufficient).unwrap();
        assert_eq!(json, r#"{"outcome":"already_sufficient"}"#);

        let json = serde_json::to_string(&ApprovalOutcome::Failed {
            reason: "nope".into(),
        })
        .unwrap();
        assert!(json.contains(r#""reason":"nope""#));
    }

    #[test]
    fn test_failure_reason() {
        assert_eq!(
            failure_reason("approval submission", &LedgerError::UserRejected),
            "approval submission: user rejected signing"
        );
    }
}
