//! Trade and deployment sequencing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::errors::TradeError;
use super::state::{PhaseCell, TxPhase};
use crate::allowance::{AllowanceManager, ApprovalOutcome};
use crate::codec;
use crate::config::Config;
use crate::fixed_point::parse_amount;
use crate::ledger::abi::ITokenFactory;
use crate::ledger::{
    await_receipt, CallRequest, Ledger, LedgerError, PreparedRequest, Receipt, ReceiptOutcome, TxHash,
};
use crate::metrics::{metrics, Timer};
use crate::observability::CorrelationId;
use crate::quote::QuotePreviewEngine;
use crate::route::{GraduationPhase, Route, RoutePlan, RouteSelector};
use crate::slippage;
use crate::structured_logging::PipelineContext;
use crate::types::{AssetRef, DeploymentCandidate, DeploymentIntent, Quote, TradeIntent, TradeSide};
use crate::vanity::{random_salt, AddressPredictor, LedgerPredictor, MiningPolicy, VanityMiner};

/// Confirmed trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub correlation_id: CorrelationId,
    pub side: TradeSide,
    pub route: Route,
    /// Amount actually sent, after any sell margin
    pub input_amount: U256,
    pub quoted_output: U256,
    pub min_output: U256,
    /// Present when the trade needed a spending authorization
    pub approval: Option<ApprovalOutcome>,
    pub receipt: Receipt,
}

/// Confirmed asset deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    pub correlation_id: CorrelationId,
    pub salt: B256,
    /// Address returned by the creation dry-run, or the mined prediction
    pub token_address: Option<Address>,
    /// Mined candidate; `None` when mining fell back to a random salt
    pub candidate: Option<DeploymentCandidate>,
    pub receipt: Receipt,
}

/// Sequences approve → simulate → submit → confirm for one session
///
/// A session owns one signing address. Only one trade or deployment runs at
/// a time; a concurrent request is rejected with [`TradeError::TradeInFlight`]
/// rather than queued.
#[derive(Debug)]
pub struct TransactionOrchestrator {
    ledger: Arc<dyn Ledger>,
    config: Config,
    owner: Address,
    routes: RouteSelector,
    quotes: QuotePreviewEngine,
    allowances: AllowanceManager,
    miner: VanityMiner,
    phase: PhaseCell,
    in_flight: AtomicBool,
}

impl TransactionOrchestrator {
    /// Orchestrator predicting deployment addresses through the factory
    pub fn new(ledger: Arc<dyn Ledger>, config: Config, owner: Address) -> Self {
        let predictor: Arc<dyn AddressPredictor> =
            Arc::new(LedgerPredictor::new(ledger.clone(), config.contracts.factory));
        Self::with_predictor(ledger, config, owner, predictor)
    }

    pub fn with_predictor(
        ledger: Arc<dyn Ledger>,
        config: Config,
        owner: Address,
        predictor: Arc<dyn AddressPredictor>,
    ) -> Self {
        metrics().apply_config(&config.monitoring);
        let trading = &config.trading;
        Self {
            routes: RouteSelector::new(ledger.clone()),
            quotes: QuotePreviewEngine::new(ledger.clone()),
            allowances: AllowanceManager::new(
                ledger.clone(),
                trading.confirmation_timeout(),
                trading.poll_interval(),
            ),
            miner: VanityMiner::new(predictor).with_fan_out(config.miner.fan_out),
            phase: PhaseCell::new(),
            in_flight: AtomicBool::new(false),
            ledger,
            config,
            owner,
        }
    }

    pub fn with_mining_policy(mut self, policy: MiningPolicy) -> Self {
        self.miner = self.miner.with_policy(policy);
        self
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Phase of the current (or last) operation
    pub fn phase(&self) -> TxPhase {
        self.phase.get()
    }

    pub fn routes(&self) -> &RouteSelector {
        &self.routes
    }

    pub fn quotes(&self) -> &QuotePreviewEngine {
        &self.quotes
    }

    pub fn allowances(&self) -> &AllowanceManager {
        &self.allowances
    }

    pub fn miner(&self) -> &VanityMiner {
        &self.miner
    }

    /// Execute one buy or sell of `asset`
    pub async fn execute_trade(&self, asset: &AssetRef, intent: &TradeIntent) -> Result<TradeReceipt, TradeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(token = %asset.token, phase = %self.phase(), "Trade rejected: another operation in flight");
            return Err(TradeError::TradeInFlight);
        }
        metrics().record(|m| m.trades_in_flight.inc());
        let _guard = scopeguard::guard((), |_| {
            metrics().record(|m| m.trades_in_flight.dec());
            self.in_flight.store(false, Ordering::Release);
        });

        metrics().record(|m| m.trades_total.inc());
        let ctx = PipelineContext::new("trade");
        let timer = Timer::new();
        self.phase.reset();

        let result = self.run_trade(&ctx, asset, intent).await;

        let outcome = self.settle(&ctx, &result);
        metrics().record_trade_outcome(outcome);
        metrics().record(|m| timer.observe_duration(&m.trade_latency));
        ctx.logger.log_outcome(&ctx.operation, outcome, timer.elapsed_ms());
        result
    }

    async fn run_trade(
        &self,
        ctx: &PipelineContext,
        asset: &AssetRef,
        intent: &TradeIntent,
    ) -> Result<TradeReceipt, TradeError> {
        let side = intent.side;
        let amount = parse_amount(&intent.raw_amount, intent.token_decimals)?;
        slippage::validate_tolerance(intent.slippage_bps, self.config.trading.max_slippage_bps)?;

        let phase = self.routes.select(asset).await?;
        let mut plan = self.plan(phase, asset);

        let mut quote = match side {
            TradeSide::Buy => {
                let balance = self.ledger.native_balance(self.owner).await?;
                if balance < amount {
                    return Err(insufficient(amount, balance));
                }
                self.quotes.preview_buy(&plan, amount).await
            }
            TradeSide::Sell => {
                let balance = self
                    .quotes
                    .token_balance(asset.token, self.owner)
                    .await
                    .map_err(|e| TradeError::quote_unavailable(e.to_string()))?;
                if balance.is_zero() {
                    return Err(insufficient(amount, balance));
                }
                self.quotes.preview_sell_with_balance(&plan, amount, balance).await
            }
        };
        log_quote(ctx, &quote);
        let mut min_out = slippage::guard(&quote, intent.slippage_bps)?;
        let amount_in = quote.input_amount;

        // Graduation can land between quoting and building; the flag only
        // moves forward, so this settles after at most one rebuild.
        let mut approval = None;
        loop {
            if let Some(spender) = plan.spender(side) {
                self.transition(ctx, TxPhase::Approving);
                let outcome = self
                    .allowances
                    .ensure_allowance(asset.token, self.owner, spender, amount_in)
                    .await;
                if let ApprovalOutcome::Failed { reason } = &outcome {
                    return Err(TradeError::approval_failed(reason.clone()));
                }
                approval = Some(outcome);
            }

            let current = self.routes.select(asset).await?;
            if current == plan.phase {
                break;
            }
            info!(
                context_id = %ctx.correlation_id,
                token = %asset.token,
                "Asset graduated after quoting; rebuilding on pool route"
            );
            plan = self.plan(current, asset);
            quote = self.quotes.quote_exact(&plan, side, amount_in).await;
            log_quote(ctx, &quote);
            min_out = slippage::guard(&quote, intent.slippage_bps)?;
        }

        let call = plan.trade_call(side, amount_in, min_out, self.owner, self.ledger.now());
        ctx.logger.log_trade_attempt(&asset.token, side, amount_in, min_out);
        let receipt = self.simulate_submit_confirm(ctx, call).await?;

        Ok(TradeReceipt {
            correlation_id: ctx.correlation_id.clone(),
            side,
            route: plan.route(),
            input_amount: amount_in,
            quoted_output: quote.output_amount,
            min_output: min_out,
            approval,
            receipt,
        })
    }

    /// Create a new asset, mining a vanity salt first
    pub async fn deploy(&self, intent: &DeploymentIntent) -> Result<DeploymentReceipt, TradeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(symbol = %intent.params.symbol, "Deployment rejected: another operation in flight");
            return Err(TradeError::TradeInFlight);
        }
        let _guard = scopeguard::guard((), |_| {
            self.in_flight.store(false, Ordering::Release);
        });

        metrics().record(|m| m.deployments_total.inc());
        let ctx = PipelineContext::new("deploy");
        let timer = Timer::new();
        self.phase.reset();

        let result = self.run_deploy(&ctx, intent).await;

        let outcome = self.settle(&ctx, &result);
        metrics().record_deployment_outcome(outcome);
        ctx.logger.log_outcome(&ctx.operation, outcome, timer.elapsed_ms());
        result
    }

    async fn run_deploy(&self, ctx: &PipelineContext, intent: &DeploymentIntent) -> Result<DeploymentReceipt, TradeError> {
        intent.params.validate()?;

        if !intent.initial_buy.is_zero() {
            let balance = self.ledger.native_balance(self.owner).await?;
            if balance < intent.initial_buy {
                return Err(insufficient(intent.initial_buy, balance));
            }
        }

        let budget = intent.mining_budget.unwrap_or(self.config.miner.budget);
        let candidate = self.miner.mine(&intent.params, budget).await;
        let salt = match &candidate {
            Some(c) => c.salt,
            None => {
                warn!(
                    context_id = %ctx.correlation_id,
                    budget,
                    "Vanity mining found nothing; deploying with a random salt"
                );
                random_salt()
            }
        };

        let call = CallRequest::call(
            self.config.contracts.factory,
            &ITokenFactory::createTokenCall {
                params: codec::to_sol(&intent.params),
                salt,
            },
        )
        .with_value(intent.initial_buy)
        .with_from(self.owner);

        self.transition(ctx, TxPhase::Simulating);
        let simulation = self
            .ledger
            .simulate(call)
            .await
            .map_err(|e| self.simulation_failed(ctx, e))?;

        let simulated = ITokenFactory::createTokenCall::abi_decode_returns(&simulation.result, true)
            .map(|r| r.token)
            .ok();
        if let (Some(simulated), Some(c)) = (simulated, &candidate) {
            if simulated != c.predicted_address {
                warn!(
                    context_id = %ctx.correlation_id,
                    predicted = %c.predicted_address,
                    simulated = %simulated,
                    "Dry-run address differs from mined prediction"
                );
            }
        }

        let receipt = self.submit_and_confirm(ctx, simulation.prepared).await?;

        Ok(DeploymentReceipt {
            correlation_id: ctx.correlation_id.clone(),
            salt,
            token_address: simulated.or_else(|| candidate.as_ref().map(|c| c.predicted_address)),
            candidate,
            receipt,
        })
    }

    async fn simulate_submit_confirm(&self, ctx: &PipelineContext, call: CallRequest) -> Result<Receipt, TradeError> {
        self.transition(ctx, TxPhase::Simulating);
        let simulation = self
            .ledger
            .simulate(call)
            .await
            .map_err(|e| self.simulation_failed(ctx, e))?;
        self.submit_and_confirm(ctx, simulation.prepared).await
    }

    async fn submit_and_confirm(
        &self,
        ctx: &PipelineContext,
        prepared: PreparedRequest,
    ) -> Result<Receipt, TradeError> {
        let tx = self
            .ledger
            .submit(prepared)
            .await
            .map_err(TradeError::from_submission)?;
        self.transition(ctx, TxPhase::Submitted);
        ctx.logger.log_submitted(&tx);
        self.confirm(ctx, tx).await
    }

    async fn confirm(&self, ctx: &PipelineContext, tx: TxHash) -> Result<Receipt, TradeError> {
        self.transition(ctx, TxPhase::Confirming);
        let trading = &self.config.trading;
        let timer = Timer::new();
        match await_receipt(
            self.ledger.as_ref(),
            tx,
            trading.confirmation_timeout(),
            trading.poll_interval(),
        )
        .await
        {
            ReceiptOutcome::Confirmed(receipt) if receipt.success => {
                metrics().record(|m| timer.observe_duration(&m.confirmation_latency));
                Ok(receipt)
            }
            ReceiptOutcome::Confirmed(receipt) => Err(TradeError::transaction_failed(
                receipt
                    .revert_reason
                    .unwrap_or_else(|| format!("transaction {tx} reverted on-chain")),
            )),
            ReceiptOutcome::Indeterminate => Err(TradeError::TransactionTimedOut { tx }),
        }
    }

    fn simulation_failed(&self, ctx: &PipelineContext, err: LedgerError) -> TradeError {
        if matches!(err, LedgerError::Reverted { .. }) {
            metrics().record(|m| m.simulation_reverts.inc());
        }
        let err = TradeError::from_simulation(err);
        ctx.logger.warn(&err.to_string());
        err
    }

    /// Move to the terminal phase matching `result`; returns the outcome label
    fn settle<T>(&self, ctx: &PipelineContext, result: &Result<T, TradeError>) -> &'static str {
        let (terminal, outcome) = match result {
            Ok(_) => (TxPhase::Confirmed, "confirmed"),
            Err(TradeError::TransactionTimedOut { .. }) => (TxPhase::TimedOut, "indeterminate"),
            Err(e) => (TxPhase::Failed, e.category()),
        };
        if let Err(e) = result {
            ctx.logger.error(&e.to_string());
            if self.phase().is_committed() {
                ctx.logger.warn("failed after broadcast; check the chain before retrying");
            }
        }
        self.transition(ctx, terminal);
        outcome
    }

    fn transition(&self, ctx: &PipelineContext, next: TxPhase) {
        let prev = self.phase.advance(next);
        if prev != next {
            ctx.logger.log_phase(prev.as_str(), next.as_str());
        }
    }

    fn plan(&self, phase: GraduationPhase, asset: &AssetRef) -> RoutePlan {
        RoutePlan::new(phase, *asset, &self.config.contracts, self.config.trading.deadline_secs)
    }
}

fn insufficient(required: U256, available: U256) -> TradeError {
    TradeError::InsufficientBalance {
        required: required.to_string(),
        available: available.to_string(),
    }
}

fn log_quote(ctx: &PipelineContext, quote: &Quote) {
    ctx.logger
        .log_quote(quote.side, quote.input_amount, quote.output_amount, &quote.route.to_string());
}
