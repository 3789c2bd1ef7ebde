//! Launchpad - offline tooling for the launchpad engine
//!
//! Exposes the engine's pure computations from the command line:
//!
//! - **min-out**: slippage floor for a quoted output
//! - **sell-margin**: amount actually sold for a full-balance request
//! - **score**: vanity score of an address
//! - **encode**: creation-parameter encoding and metadata hash
//! - **mine**: salt search against a local CREATE2 predictor
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launchpad_engine::codec::{encode_creation_params, metadata_hash, TokenCreationParams};
use launchpad_engine::config::Config;
use launchpad_engine::metrics::{metrics, render_metrics};
use launchpad_engine::quote::apply_sell_margin;
use launchpad_engine::slippage::{minimum_acceptable, validate_tolerance};
use launchpad_engine::vanity::{score_address, Create2Predictor, MiningPolicy, VanityMiner};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "LAUNCHPAD_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Minimum acceptable output for a quote
    MinOut {
        /// Quoted output in smallest units
        #[arg(long)]
        quote: String,
        /// Slippage tolerance in basis points
        #[arg(long)]
        slippage_bps: Option<u64>,
    },
    /// Amount sold after the full-balance safety margin
    SellMargin {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        balance: String,
    },
    /// Vanity score of an address
    Score {
        #[arg(long)]
        address: Address,
        #[arg(long, default_value = "")]
        ticker: String,
    },
    /// Encode creation parameters from a TOML file
    Encode {
        #[arg(long)]
        params: PathBuf,
    },
    /// Mine a deployment salt with the local CREATE2 predictor
    Mine {
        #[arg(long)]
        params: PathBuf,
        /// Attempt budget; defaults to `miner.budget`
        #[arg(long)]
        budget: Option<u64>,
        /// Stop at the first address ending in this suffix
        #[arg(long)]
        suffix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    init_logging(args.verbose, config.monitoring.json_logs)?;
    metrics().apply_config(&config.monitoring);
    if !args.config.exists() {
        warn!("Config file {} not found, using defaults", args.config.display());
    }

    let output = match args.command {
        Command::MinOut { quote, slippage_bps } => {
            let quote = parse_u256(&quote, "quote")?;
            let bps = slippage_bps.unwrap_or(config.trading.default_slippage_bps);
            validate_tolerance(bps, config.trading.max_slippage_bps)?;
            json!({
                "quote": quote.to_string(),
                "slippage_bps": bps,
                "min_out": minimum_acceptable(quote, bps).to_string(),
            })
        }
        Command::SellMargin { amount, balance } => {
            let amount = parse_u256(&amount, "amount")?;
            let balance = parse_u256(&balance, "balance")?;
            json!({
                "requested": amount.to_string(),
                "balance": balance.to_string(),
                "sell_amount": apply_sell_margin(amount, balance).to_string(),
            })
        }
        Command::Score { address, ticker } => json!({
            "address": address.to_string(),
            "ticker": ticker,
            "score": score_address(&address, &ticker),
        }),
        Command::Encode { params } => {
            let params = load_params(&params)?;
            json!({
                "metadata_hash": metadata_hash(&params).to_string(),
                "encoded": encode_creation_params(&params).to_string(),
            })
        }
        Command::Mine { params, budget, suffix } => {
            let params = load_params(&params)?;
            let init_code_hash = config
                .contracts
                .init_code_hash
                .context("contracts.init_code_hash is required for offline mining")?;
            let predictor = Arc::new(Create2Predictor::new(config.contracts.factory, init_code_hash));
            let policy = match suffix {
                Some(suffix) => MiningPolicy::FirstSuffixMatch { suffix },
                None => MiningPolicy::BestScore,
            };
            let budget = budget.unwrap_or(config.miner.budget);
            info!(budget, fan_out = config.miner.fan_out, symbol = %params.symbol, "Mining deployment salt");

            let miner = VanityMiner::new(predictor)
                .with_fan_out(config.miner.fan_out)
                .with_policy(policy);
            let candidate = miner.mine(&params, budget).await;
            let exposition = render_metrics();
            if !exposition.is_empty() {
                debug!(metrics = %exposition, "Mining metrics");
            }
            match candidate {
                Some(candidate) => serde_json::to_value(&candidate)?,
                None => json!(null),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json_logs: bool) -> Result<()> {
    let env_filter = if verbose {
        "launchpad_engine=debug,launchpad=debug,info"
    } else {
        "launchpad_engine=info,launchpad=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        }))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Load configuration, falling back to defaults when the file is absent
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file_with_env(path)
    } else {
        Ok(Config::default())
    }
}

fn load_params(path: &Path) -> Result<TokenCreationParams> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading params {}", path.display()))?;
    let params: TokenCreationParams =
        toml::from_str(&content).with_context(|| format!("parsing params {}", path.display()))?;
    params.validate()?;
    Ok(params)
}

fn parse_u256(raw: &str, field: &str) -> Result<U256> {
    raw.trim()
        .parse::<U256>()
        .with_context(|| format!("{field} must be an unsigned integer, got {raw:?}"))
}
