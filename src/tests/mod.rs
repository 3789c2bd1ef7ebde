//! Scenario tests driven by the scripted ledger

mod quote_tests;
mod test_helpers;
mod trade_flow_tests;
