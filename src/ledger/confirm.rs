//! Bounded receipt polling

use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, warn};

use super::{Ledger, Receipt, TxHash};

/// Outcome of waiting for a receipt
///
/// `Indeterminate` means the wait ran out, not that the transaction failed:
/// it may still be mined later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Confirmed(Receipt),
    Indeterminate,
}

/// Poll `tx` every `poll_interval` until a receipt arrives or `limit` elapses.
///
/// Poll errors are treated as "not yet" and polling continues; only the
/// deadline ends the wait without a receipt.
pub async fn await_receipt(
    ledger: &dyn Ledger,
    tx: TxHash,
    limit: Duration,
    poll_interval: Duration,
) -> ReceiptOutcome {
    let poll = async {
        let mut ticker = interval(poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: u32 = 0;
        loop {
            ticker.tick().await;
            polls += 1;
            match ledger.get_receipt(tx).await {
                Ok(Some(receipt)) => {
                    debug!(tx = %tx, polls, success = receipt.success, "Receipt received");
                    return receipt;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(tx = %tx, polls, error = %e, "Receipt poll failed, continuing");
                }
            }
        }
    };

    match timeout(limit, poll).await {
        Ok(receipt) => ReceiptOutcome::Confirmed(receipt),
        Err(_) => {
            warn!(tx = %tx, timeout_ms = limit.as_millis() as u64, "Confirmation timed out");
            ReceiptOutcome::Indeterminate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedger;

    #[tokio::test]
    async fn test_receipt_on_first_poll() {
        let ledger = MockLedger::new();
        let tx = TxHash::repeat_byte(0x11);

        let outcome = await_receipt(&ledger, tx, Duration::from_secs(1), Duration::from_millis(10)).await;
        match outcome {
            ReceiptOutcome::Confirmed(receipt) => {
                assert_eq!(receipt.tx_hash, tx);
                assert!(receipt.success);
            }
            ReceiptOutcome::Indeterminate => panic!("expected a receipt"),
        }
        assert_eq!(ledger.receipt_polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_indeterminate() {
        let ledger = MockLedger::new();
        ledger.hold_receipts(true);

        let outcome = await_receipt(
            &ledger,
            TxHash::repeat_byte(0x22),
            Duration::from_secs(2),
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(outcome, ReceiptOutcome::Indeterminate);
        assert!(ledger.receipt_polls() >= 4);
    }
}
