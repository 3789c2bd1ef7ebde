//! End-to-end trade flows

use alloy_primitives::U256;
use alloy_sol_types::SolCall;

use super::test_helpers::{orchestrator, orchestrator_with, revert_data, units};
use crate::allowance::ApprovalOutcome;
use crate::ledger::abi::{IBondingCurve, IERC20, IRouter};
use crate::ledger::LedgerError;
use crate::route::Route;
use crate::test_utils::{fixtures, MockLedger, MOCK_NOW};
use crate::tx_orchestrator::{TradeError, TxPhase};
use crate::types::TradeIntent;

fn funded_ledger() -> MockLedger {
    let ledger = MockLedger::new();
    ledger.set_native_balance(units(1_000_000));
    ledger
}

#[tokio::test]
async fn test_buy_pre_graduation_applies_slippage_floor() {
    let ledger = funded_ledger();
    ledger.set_buy_quote(units(953));
    let orch = orchestrator(&ledger);

    let receipt = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap();

    assert_eq!(receipt.route, Route::BondingCurve);
    assert_eq!(receipt.input_amount, units(100));
    assert_eq!(receipt.quoted_output, units(953));
    assert_eq!(receipt.min_output, units(944));
    assert_eq!(receipt.approval, None);
    assert!(receipt.receipt.success);
    assert_eq!(orch.phase(), TxPhase::Confirmed);

    let submissions = ledger.submissions();
    assert_eq!(submissions.len(), 1);
    let call = &submissions[0].call;
    assert_eq!(call.to, fixtures::token());
    assert_eq!(call.value, units(100));
    assert_eq!(call.from, Some(fixtures::owner()));
    let decoded = IBondingCurve::buyCall::abi_decode(&call.data, true).unwrap();
    assert_eq!(decoded.minAmountOut, units(944));
}

#[tokio::test]
async fn test_full_balance_sell_keeps_margin() {
    let ledger = funded_ledger();
    ledger.set_token_balance(fixtures::token(), fixtures::owner(), units(1_000_000));
    ledger.set_sell_quote(units(5_000));
    let orch = orchestrator(&ledger);

    let receipt = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::sell("1000000", 0, 100))
        .await
        .unwrap();

    assert_eq!(receipt.input_amount, units(999_900));
    // Curve hosted by the token contract: no allowance needed
    assert_eq!(receipt.approval, None);
    assert_eq!(ledger.approvals_submitted(), 0);

    let submissions = ledger.submissions();
    let decoded = IBondingCurve::sellCall::abi_decode(&submissions[0].call.data, true).unwrap();
    assert_eq!(decoded.amountIn, units(999_900));
    assert_eq!(decoded.minAmountOut, units(4_950));
}

#[tokio::test]
async fn test_pool_sell_approves_router_once() {
    let ledger = funded_ledger();
    ledger.set_graduated(fixtures::token(), true);
    ledger.set_token_balance(fixtures::token(), fixtures::owner(), units(1_000));
    ledger.set_pool_quote(units(70));
    let orch = orchestrator(&ledger);
    let intent = TradeIntent::sell("10", 0, 100);

    let first = orch.execute_trade(&fixtures::asset(), &intent).await.unwrap();
    assert_eq!(first.route, Route::PoolSwap);
    assert!(matches!(first.approval, Some(ApprovalOutcome::Approved { .. })));
    assert_eq!(
        ledger.allowance(fixtures::token(), fixtures::owner(), fixtures::router()),
        U256::MAX
    );

    let second = orch.execute_trade(&fixtures::asset(), &intent).await.unwrap();
    assert_eq!(second.approval, Some(ApprovalOutcome::AlreadySufficient));
    assert_eq!(ledger.approvals_submitted(), 1);

    let submissions = ledger.submissions();
    // approve, swap, swap
    assert_eq!(submissions.len(), 3);
    let approve = IERC20::approveCall::abi_decode(&submissions[0].call.data, true).unwrap();
    assert_eq!(approve.spender, fixtures::router());
    assert_eq!(approve.value, U256::MAX);

    let swap = IRouter::swapExactTokensForETHSupportingFeeOnTransferTokensCall::abi_decode(
        &submissions[1].call.data,
        true,
    )
    .unwrap();
    assert_eq!(swap.amountIn, units(10));
    assert_eq!(swap.amountOutMin, units(70));
    assert_eq!(swap.path, vec![fixtures::token(), fixtures::quote_asset()]);
    assert_eq!(swap.deadline, U256::from(MOCK_NOW + 600));
}

#[tokio::test]
async fn test_graduation_between_quote_and_build_reroutes() {
    let ledger = funded_ledger();
    // First read (route selection) sees the curve, the re-check sees graduation
    ledger.graduate_after_reads(fixtures::token(), 1);
    ledger.set_buy_quote(units(953));
    ledger.set_pool_quote(units(900));
    let orch = orchestrator(&ledger);

    let receipt = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap();

    assert_eq!(receipt.route, Route::PoolSwap);
    assert_eq!(receipt.quoted_output, units(900));
    assert_eq!(receipt.min_output, units(891));

    let call = &ledger.submissions()[0].call;
    assert_eq!(call.to, fixtures::router());
    let swap = IRouter::swapExactETHForTokensSupportingFeeOnTransferTokensCall::abi_decode(&call.data, true).unwrap();
    assert_eq!(swap.path, vec![fixtures::quote_asset(), fixtures::token()]);
    assert_eq!(swap.amountOutMin, units(891));
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_timeout_is_indeterminate() {
    let ledger = funded_ledger();
    ledger.set_buy_quote(units(953));
    ledger.hold_receipts(true);
    let orch = orchestrator(&ledger);

    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::TransactionTimedOut { .. }));
    assert!(!err.is_retryable());
    assert_eq!(orch.phase(), TxPhase::TimedOut);
    assert!(ledger.receipt_polls() > 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_trade_rejected_while_confirming() {
    let ledger = funded_ledger();
    ledger.set_buy_quote(units(953));
    ledger.hold_receipts(true);
    let orch = orchestrator(&ledger);
    let intent = TradeIntent::buy("100", 0, 100);
    let asset = fixtures::asset();

    let first = orch.execute_trade(&asset, &intent);
    let second = async {
        while orch.phase() != TxPhase::Confirming {
            tokio::task::yield_now().await;
        }
        let rejected = orch.execute_trade(&asset, &intent).await;
        ledger.hold_receipts(false);
        rejected
    };

    let (first, second) = tokio::join!(first, second);
    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), TradeError::TradeInFlight);
    assert_eq!(ledger.submissions().len(), 1);

    // The guard is released once the first trade settles
    assert!(orch
        .execute_trade(&fixtures::asset(), &intent)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_validation_failures_touch_nothing() {
    let ledger = funded_ledger();
    ledger.set_buy_quote(units(953));
    let orch = orchestrator(&ledger);

    for raw in ["0", "-1", "abc", "", "1.5"] {
        let err = orch
            .execute_trade(&fixtures::asset(), &TradeIntent::buy(raw, 0, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Validation(_)), "{raw:?}: {err}");
    }

    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 6_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));
    assert_eq!(orch.phase(), TxPhase::Failed);
    assert!(ledger.simulations().is_empty());
}

#[tokio::test]
async fn test_insufficient_native_balance() {
    let ledger = MockLedger::new();
    ledger.set_native_balance(units(50));
    ledger.set_buy_quote(units(953));
    let orch = orchestrator(&ledger);

    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TradeError::InsufficientBalance {
            required: "100".into(),
            available: "50".into()
        }
    );
}

#[tokio::test]
async fn test_empty_token_balance_cannot_sell() {
    let ledger = funded_ledger();
    let orch = orchestrator(&ledger);
    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::sell("5", 0, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn test_sell_balance_read_failure_is_quote_unavailable() {
    let ledger = funded_ledger();
    ledger.set_token_balance(fixtures::token(), fixtures::owner(), units(1_000));
    ledger.set_balance_read_fails(true);
    let orch = orchestrator(&ledger);

    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::sell("5", 0, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::QuoteUnavailable(_)), "{err:?}");
    assert!(err.is_retryable());
    assert!(ledger.simulations().is_empty());
    assert_eq!(orch.phase(), TxPhase::Failed);
}

#[tokio::test]
async fn test_quote_failures_stop_before_submission() {
    let ledger = funded_ledger();
    ledger.set_quote_fails(true);
    let orch = orchestrator(&ledger);
    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::QuoteUnavailable(_)));

    ledger.set_quote_fails(false);
    ledger.set_buy_quote(U256::ZERO);
    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap_err();
    assert_eq!(err, TradeError::AmountTooSmall);
    assert!(ledger.simulations().is_empty());
}

#[tokio::test]
async fn test_simulation_revert_is_terminal() {
    let ledger = funded_ledger();
    ledger.set_buy_quote(units(953));
    ledger.set_simulate_revert(Some(revert_data("Slippage exceeded")));
    let orch = orchestrator(&ledger);

    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TradeError::SimulationReverted {
            reason: Some("Slippage exceeded".into())
        }
    );
    assert!(ledger.submissions().is_empty());
    assert_eq!(orch.phase(), TxPhase::Failed);
}

#[tokio::test]
async fn test_signing_rejection_and_onchain_failure() {
    let ledger = funded_ledger();
    ledger.set_buy_quote(units(953));
    ledger.set_submit_error(Some(LedgerError::UserRejected));
    let orch = orchestrator(&ledger);
    let intent = TradeIntent::buy("100", 0, 100);

    let err = orch.execute_trade(&fixtures::asset(), &intent).await.unwrap_err();
    assert_eq!(err, TradeError::UserRejectedSigning);

    ledger.set_submit_error(None);
    ledger.set_receipt_revert(Some("TRANSFER_FAILED".into()));
    let err = orch.execute_trade(&fixtures::asset(), &intent).await.unwrap_err();
    assert_eq!(err, TradeError::transaction_failed("TRANSFER_FAILED"));
    assert_eq!(orch.phase(), TxPhase::Failed);
}

#[tokio::test]
async fn test_approval_failure_stops_trade() {
    let ledger = funded_ledger();
    ledger.set_graduated(fixtures::token(), true);
    ledger.set_token_balance(fixtures::token(), fixtures::owner(), units(1_000));
    ledger.set_pool_quote(units(70));
    ledger.set_approve_revert(Some(revert_data("approvals paused")));
    let orch = orchestrator(&ledger);

    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::sell("10", 0, 100))
        .await
        .unwrap_err();
    match err {
        TradeError::ApprovalFailed(reason) => assert!(reason.contains("approvals paused"), "{reason}"),
        other => panic!("unexpected {other:?}"),
    }
    // Only the approval dry-run happened
    assert_eq!(ledger.simulations().len(), 1);
    assert!(ledger.submissions().is_empty());
}

#[tokio::test]
async fn test_custom_slippage_cap() {
    let ledger = funded_ledger();
    ledger.set_buy_quote(units(953));
    let mut config = fixtures::config();
    config.trading.max_slippage_bps = 50;
    let orch = orchestrator_with(&ledger, config);

    let err = orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));
    assert!(orch
        .execute_trade(&fixtures::asset(), &TradeIntent::buy("100", 0, 50))
        .await
        .is_ok());
}
