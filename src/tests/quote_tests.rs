//! Quote preview against the scripted ledger

use super::test_helpers::{ledger_arc, units};
use crate::quote::QuotePreviewEngine;
use crate::route::{GraduationPhase, Route, RoutePlan};
use crate::test_utils::{fixtures, MockLedger};
use crate::types::{QuoteStatus, TradeSide};

fn plan(phase: GraduationPhase) -> RoutePlan {
    RoutePlan::new(phase, fixtures::asset(), &fixtures::config().contracts, 600)
}

#[tokio::test]
async fn test_zero_input_short_circuits() {
    let ledger = MockLedger::new();
    ledger.set_quote_fails(true);
    let engine = QuotePreviewEngine::new(ledger_arc(&ledger));

    let quote = engine.preview_buy(&plan(GraduationPhase::PreGraduation), units(0)).await;
    assert_eq!(quote.status, QuoteStatus::ZeroInput);
    assert_eq!(quote.output_amount, units(0));

    let quote = engine
        .preview_sell(&plan(GraduationPhase::PreGraduation), fixtures::owner(), units(0))
        .await;
    assert_eq!(quote.status, QuoteStatus::ZeroInput);
}

#[tokio::test]
async fn test_curve_and_pool_quotes() {
    let ledger = MockLedger::new();
    ledger.set_buy_quote(units(953));
    ledger.set_pool_quote(units(880));
    let engine = QuotePreviewEngine::new(ledger_arc(&ledger));

    let quote = engine.preview_buy(&plan(GraduationPhase::PreGraduation), units(100)).await;
    assert!(quote.is_available());
    assert_eq!(quote.route, Route::BondingCurve);
    assert_eq!(quote.output_amount, units(953));

    let quote = engine.preview_buy(&plan(GraduationPhase::PostGraduation), units(100)).await;
    assert_eq!(quote.route, Route::PoolSwap);
    assert_eq!(quote.output_amount, units(880));
}

#[tokio::test]
async fn test_sell_preview_applies_margin() {
    let ledger = MockLedger::new();
    ledger.set_token_balance(fixtures::token(), fixtures::owner(), units(1_000_000));
    ledger.set_sell_quote(units(42));
    let engine = QuotePreviewEngine::new(ledger_arc(&ledger));

    let quote = engine
        .preview_sell(&plan(GraduationPhase::PreGraduation), fixtures::owner(), units(1_000_000))
        .await;
    assert_eq!(quote.side, TradeSide::Sell);
    assert_eq!(quote.input_amount, units(999_900));
    assert_eq!(quote.output_amount, units(42));

    let quote = engine
        .preview_sell(&plan(GraduationPhase::PreGraduation), fixtures::owner(), units(10))
        .await;
    assert_eq!(quote.input_amount, units(10));
}

#[tokio::test]
async fn test_failed_read_yields_unavailable_zero_quote() {
    let ledger = MockLedger::new();
    ledger.set_quote_fails(true);
    let engine = QuotePreviewEngine::new(ledger_arc(&ledger));

    let quote = engine.preview_buy(&plan(GraduationPhase::PreGraduation), units(100)).await;
    assert!(matches!(quote.status, QuoteStatus::Unavailable(_)));
    assert_eq!(quote.output_amount, units(0));
    assert_eq!(quote.input_amount, units(100));
}

#[tokio::test]
async fn test_curve_state_read() {
    let ledger = MockLedger::new();
    ledger.set_curve_state(units(25), units(1_000), units(100));
    let engine = QuotePreviewEngine::new(ledger_arc(&ledger));

    let state = engine.curve_state(&fixtures::asset()).await.unwrap();
    assert_eq!(state.virtual_reserve_in, units(25));
    assert!(!state.is_graduated);
    assert_eq!(state.progress_bps(), 2_500);
}
