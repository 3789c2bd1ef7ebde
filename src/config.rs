//! Configuration module for the launchpad engine
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::fixed_point::BPS_DENOMINATOR;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Contract addresses
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Trading configuration
    #[serde(default)]
    pub trading: TradingConfig,

    /// Vanity miner configuration
    #[serde(default)]
    pub miner: MinerConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Liquidity-pool router used after graduation
    #[serde(default)]
    pub router: Address,

    /// Wrapped native asset forming the other side of every pool
    #[serde(default)]
    pub quote_asset: Address,

    /// Token factory that predicts and deploys assets
    #[serde(default)]
    pub factory: Address,

    /// Creation code hash for local CREATE2 prediction.
    ///
    /// Optional; without it only ledger-backed prediction is available.
    #[serde(default)]
    pub init_code_hash: Option<B256>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Slippage tolerance used when a request does not specify one (basis points)
    #[serde(default = "default_slippage")]
    pub default_slippage_bps: u64,

    /// Maximum slippage tolerance accepted (basis points)
    #[serde(default = "default_max_slippage")]
    pub max_slippage_bps: u64,

    /// Swap validity window added to the current time
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// How long to wait for a receipt before reporting an indeterminate outcome
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Receipt poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Salt search attempts per deployment
    #[serde(default = "default_budget")]
    pub budget: u64,

    /// Concurrent predictor calls; 1 keeps the search sequential
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_slippage() -> u64 { 100 }
fn default_max_slippage() -> u64 { 5_000 }
fn default_deadline() -> u64 { 600 }
fn default_confirmation_timeout() -> u64 { 120 }
fn default_poll_interval() -> u64 { 1_500 }
fn default_budget() -> u64 { 2_000 }
fn default_fan_out() -> usize { 1 }
fn default_true() -> bool { true }

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: default_slippage(),
            max_slippage_bps: default_max_slippage(),
            deadline_secs: default_deadline(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            fan_out: default_fan_out(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            json_logs: false,
        }
    }
}

impl TradingConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// Reads `.env` if present, then applies `LAUNCHPAD_DEFAULT_SLIPPAGE_BPS`,
    /// `LAUNCHPAD_MAX_SLIPPAGE_BPS` and `LAUNCHPAD_MINER_BUDGET`.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Some(v) = env_u64("LAUNCHPAD_DEFAULT_SLIPPAGE_BPS")? {
            self.trading.default_slippage_bps = v;
        }
        if let Some(v) = env_u64("LAUNCHPAD_MAX_SLIPPAGE_BPS")? {
            self.trading.max_slippage_bps = v;
        }
        if let Some(v) = env_u64("LAUNCHPAD_MINER_BUDGET")? {
            self.miner.budget = v;
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.trading;
        if t.max_slippage_bps > BPS_DENOMINATOR {
            bail!("trading.max_slippage_bps must be <= {BPS_DENOMINATOR}, got {}", t.max_slippage_bps);
        }
        if t.default_slippage_bps > t.max_slippage_bps {
            bail!(
                "trading.default_slippage_bps ({}) exceeds max_slippage_bps ({})",
                t.default_slippage_bps,
                t.max_slippage_bps
            );
        }
        if t.confirmation_timeout_secs == 0 {
            bail!("trading.confirmation_timeout_secs must be > 0");
        }
        if t.poll_interval_ms == 0 {
            bail!("trading.poll_interval_ms must be > 0");
        }
        if self.miner.fan_out == 0 {
            bail!("miner.fan_out must be >= 1");
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> anyhow::Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{key}={raw:?} is not an unsigned integer")),
        Err(_) => Ok(None),
    }
}
