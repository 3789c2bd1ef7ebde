//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::MonitoringConfig;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,
    /// Mirrors `monitoring.enable_metrics`; nothing is recorded or rendered while false
    enabled: AtomicBool,

    // Counters
    pub trades_total: IntCounter,
    pub trade_outcomes: IntCounterVec,
    pub deployments_total: IntCounter,
    pub deployment_outcomes: IntCounterVec,
    pub approvals_sent: IntCounter,
    pub simulation_reverts: IntCounter,
    pub quote_unavailable: IntCounter,
    pub mining_attempts: IntCounter,
    pub mining_failures: IntCounter,

    // Gauges
    pub trades_in_flight: IntGauge,

    // Histograms
    pub trade_latency: Histogram,
    pub confirmation_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trades_total = IntCounter::with_opts(Opts::new(
            "trades_total",
            "Total number of trades attempted",
        ))?;

        let trade_outcomes = IntCounterVec::new(
            Opts::new("trade_outcomes_total", "Trade outcomes by result"),
            &["outcome"],
        )?;

        let deployments_total = IntCounter::with_opts(Opts::new(
            "deployments_total",
            "Total number of asset deployments attempted",
        ))?;

        let deployment_outcomes = IntCounterVec::new(
            Opts::new("deployment_outcomes_total", "Deployment outcomes by result"),
            &["outcome"],
        )?;

        let approvals_sent = IntCounter::with_opts(Opts::new(
            "approvals_sent_total",
            "Unlimited approval transactions broadcast",
        ))?;

        let simulation_reverts = IntCounter::with_opts(Opts::new(
            "simulation_reverts_total",
            "Dry-runs that reverted before submission",
        ))?;

        let quote_unavailable = IntCounter::with_opts(Opts::new(
            "quote_unavailable_total",
            "Quote reads that failed or could not be decoded",
        ))?;

        let mining_attempts = IntCounter::with_opts(Opts::new(
            "vanity_mining_attempts_total",
            "Salt candidates evaluated by the vanity miner",
        ))?;

        let mining_failures = IntCounter::with_opts(Opts::new(
            "vanity_mining_failures_total",
            "Address predictions that failed during mining",
        ))?;

        let trades_in_flight = IntGauge::with_opts(Opts::new(
            "trades_in_flight",
            "Number of trades currently in progress",
        ))?;

        let trade_latency = Histogram::with_opts(
            HistogramOpts::new("trade_latency_seconds", "End-to-end trade latency")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new("confirmation_latency_seconds", "Submit-to-receipt latency")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(trades_total.clone()))?;
        registry.register(Box::new(trade_outcomes.clone()))?;
        registry.register(Box::new(deployments_total.clone()))?;
        registry.register(Box::new(deployment_outcomes.clone()))?;
        registry.register(Box::new(approvals_sent.clone()))?;
        registry.register(Box::new(simulation_reverts.clone()))?;
        registry.register(Box::new(quote_unavailable.clone()))?;
        registry.register(Box::new(mining_attempts.clone()))?;
        registry.register(Box::new(mining_failures.clone()))?;
        registry.register(Box::new(trades_in_flight.clone()))?;
        registry.register(Box::new(trade_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            registry,
            enabled: AtomicBool::new(true),
            trades_total,
            trade_outcomes,
            deployments_total,
            deployment_outcomes,
            approvals_sent,
            simulation_reverts,
            quote_unavailable,
            mining_attempts,
            mining_failures,
            trades_in_flight,
            trade_latency,
            confirmation_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn apply_config(&self, monitoring: &MonitoringConfig) {
        self.set_enabled(monitoring.enable_metrics);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Run `update` only while collection is enabled
    pub fn record(&self, update: impl FnOnce(&Self)) {
        if self.is_enabled() {
            update(self);
        }
    }

    pub fn record_trade_outcome(&self, outcome: &str) {
        self.record(|m| m.trade_outcomes.with_label_values(&[outcome]).inc());
    }

    pub fn record_deployment_outcome(&self, outcome: &str) {
        self.record(|m| m.deployment_outcomes.with_label_values(&[outcome]).inc());
    }

    /// Prometheus text exposition; empty while disabled
    pub fn render(&self) -> String {
        if !self.is_enabled() {
            return String::new();
        }
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Prometheus text exposition of the global registry
pub fn render_metrics() -> String {
    metrics().render()
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counters_render() {
        metrics().record_trade_outcome("confirmed");
        metrics().mining_attempts.inc();
        let text = render_metrics();
        assert!(text.contains("trade_outcomes_total"));
        assert!(text.contains("outcome=\"confirmed\""));
        assert!(text.contains("vanity_mining_attempts_total"));
    }

    #[test]
    fn test_disabled_metrics_record_and_render_nothing() {
        let m = Metrics::new().unwrap();
        m.apply_config(&MonitoringConfig {
            enable_metrics: false,
            json_logs: false,
        });
        m.record(|m| m.trades_total.inc());
        m.record_trade_outcome("confirmed");
        assert_eq!(m.trades_total.get(), 0);
        assert_eq!(m.trade_outcomes.with_label_values(&["confirmed"]).get(), 0);
        assert!(m.render().is_empty());

        m.set_enabled(true);
        m.record(|m| m.trades_total.inc());
        assert_eq!(m.trades_total.get(), 1);
        assert!(m.render().contains("trades_total 1"));
    }

    #[test]
    fn test_fresh_registry() {
        let m = Metrics::new().unwrap();
        assert_eq!(m.trades_total.get(), 0);
        m.trades_total.inc();
        assert_eq!(m.trades_total.get(), 1);
    }
}
