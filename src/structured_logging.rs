//! Structured logging and pipeline context

use alloy_primitives::{Address, U256};

use crate::ledger::TxHash;
use crate::observability::CorrelationId;
use crate::types::TradeSide;

/// Structured logger for trade and deployment lifecycle events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: CorrelationId,
}

impl StructuredLogger {
    pub fn new(context_id: CorrelationId) -> Self {
        Self { context_id }
    }

    pub fn log_quote(&self, side: TradeSide, input: U256, output: U256, route: &str) {
        tracing::debug!(
            context_id = %self.context_id,
            side = %side,
            input = %input,
            output = %output,
            route = %route,
            "Quote computed"
        );
    }

    pub fn log_trade_attempt(&self, token: &Address, side: TradeSide, amount: U256, min_out: U256) {
        tracing::info!(
            context_id = %self.context_id,
            token = %token,
            side = %side,
            amount = %amount,
            min_out = %min_out,
            "Attempting trade"
        );
    }

    pub fn log_phase(&self, from: &str, to: &str) {
        tracing::debug!(
            context_id = %self.context_id,
            from = %from,
            to = %to,
            "Transaction phase change"
        );
    }

    pub fn log_submitted(&self, tx: &TxHash) {
        tracing::info!(
            context_id = %self.context_id,
            tx = %tx,
            "Transaction broadcast"
        );
    }

    pub fn log_outcome(&self, operation: &str, outcome: &str, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            operation = %operation,
            outcome = %outcome,
            latency_ms = %latency_ms,
            "Operation finished"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            message = %message,
            "Warning"
        );
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            context_id = %self.context_id,
            message = %message,
            "Error"
        );
    }
}

/// Per-operation context carried through one trade or deployment
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub correlation_id: CorrelationId,

    /// Operation name
    pub operation: String,

    /// Structured logger instance
    pub logger: StructuredLogger,
}

impl PipelineContext {
    /// Create a new pipeline context
    pub fn new(operation: &str) -> Self {
        let correlation_id = CorrelationId::new();
        Self {
            logger: StructuredLogger::new(correlation_id.clone()),
            correlation_id,
            operation: operation.to_string(),
        }
    }
}
