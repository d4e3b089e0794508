//! The tick-based simulation loop.
//!
//! Each tick runs in two phases. The decide phase polls every active
//! trader's decision source concurrently; these calls are I/O-bound and may
//! suspend indefinitely, so they are rate-limited and bounded by a timeout.
//! The commit phase then applies the collected decisions strictly one at a
//! time, in submission order: book and portfolio mutation only ever happen
//! inside this serialized section, and a trade is only counted once its
//! ledger write has completed.

use std::collections::HashMap;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, error};

use agents::{DecisionSource, Portfolio, PortfolioMetrics};
use market::MarketEngine;
use types::{
    AgentAction, AgentId, InteractionKind, InteractionLog, MarketState, Price, ProposedAction,
    Symbol, now_millis,
};

use crate::config::SimulationConfig;
use crate::limiter::RateLimiter;

/// A participating agent: identity, portfolio, and decision source.
pub struct Trader {
    pub id: AgentId,
    pub portfolio: Portfolio,
    pub source: Box<dyn DecisionSource>,
}

impl Trader {
    pub fn new(id: impl Into<AgentId>, portfolio: Portfolio, source: Box<dyn DecisionSource>) -> Self {
        Self {
            id: id.into(),
            portfolio,
            source,
        }
    }
}

/// Counters describing simulation progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Ticks completed.
    pub tick: u64,
    /// Proposals received from decision sources.
    pub decisions: u64,
    /// Trades settled and persisted.
    pub trades_executed: u64,
    /// Hold decisions (including exhausted or sitting-out sources).
    pub holds: u64,
    /// Decision calls that timed out or returned nothing.
    pub missed_decisions: u64,
}

/// Drives the market: owns the engine and the traders.
pub struct SimulationRunner {
    engine: MarketEngine,
    traders: Vec<Trader>,
    config: SimulationConfig,
    limiter: RateLimiter,
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Build a runner. The rate limiter is supplied by the caller so several
    /// runners (or other consumers of the same decision backend) can share
    /// one budget.
    pub fn new(
        engine: MarketEngine,
        traders: Vec<Trader>,
        config: SimulationConfig,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            engine,
            traders,
            config,
            limiter,
            stats: SimulationStats::default(),
        }
    }

    /// Seed every trader's portfolio with the configured inventory of each
    /// asset at its current price. Called once before the first tick.
    pub fn seed_inventories(&mut self) {
        let qty = self.config.seed_inventory;
        if qty.is_zero() {
            return;
        }
        let prices: Vec<(Symbol, Price)> = self
            .engine
            .assets()
            .iter()
            .map(|asset| {
                let price = self.engine.get_state(asset).current_price;
                (asset.clone(), price)
            })
            .collect();

        for trader in &mut self.traders {
            for (asset, price) in &prices {
                trader.portfolio.seed_position(asset, qty, *price);
            }
        }
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    pub fn engine(&self) -> &MarketEngine {
        &self.engine
    }

    /// Cloned portfolio metric snapshots for every trader, marked to the
    /// engine's current prices. Observers read these; they never touch the
    /// live portfolios.
    pub fn agent_summaries(&self) -> Vec<(AgentId, PortfolioMetrics)> {
        let prices = self.engine.current_prices();
        self.traders
            .iter()
            .map(|t| (t.id.clone(), t.portfolio.metrics(prices)))
            .collect()
    }

    /// Run the given number of ticks.
    pub async fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.run_tick().await;
        }
    }

    /// Run one tick: concurrent decide phase, serialized commit phase.
    pub async fn run_tick(&mut self) {
        let decisions = self.decide_phase().await;
        self.commit_phase(decisions);
        self.stats.tick += 1;
    }

    /// Poll the active traders' decision sources concurrently.
    ///
    /// Each source observes a market snapshot taken at the start of the
    /// tick; nothing here mutates the engine. Results come back in
    /// submission (index) order.
    async fn decide_phase(&mut self) -> Vec<(usize, Option<ProposedAction>)> {
        let total = self.traders.len();
        if total == 0 {
            return Vec::new();
        }
        let active = self.config.traders_per_tick.min(total).max(1);
        let start = (self.stats.tick as usize * active) % total;

        // Snapshot states up front; each active trader focuses one asset,
        // rotating through the engine's asset list across ticks.
        let assets = self.engine.assets();
        let mut assignments: HashMap<usize, (Symbol, MarketState)> = HashMap::new();
        for slot in 0..active {
            let idx = (start + slot) % total;
            let asset = assets[(self.stats.tick as usize + idx) % assets.len()].clone();
            let state = self.engine.get_state(&asset);
            assignments.insert(idx, (asset, state));
        }

        let limiter = &self.limiter;
        let decision_timeout = self.config.decision_timeout;

        let mut polls = Vec::with_capacity(assignments.len());
        for (idx, trader) in self.traders.iter_mut().enumerate() {
            let Some((asset, state)) = assignments.remove(&idx) else {
                continue;
            };
            polls.push(async move {
                limiter.acquire().await;
                match timeout(decision_timeout, trader.source.propose(&state, &asset)).await {
                    Ok(proposal) => (idx, proposal),
                    Err(_) => {
                        debug!(trader = idx, "decision timed out; holding");
                        (idx, None)
                    }
                }
            });
        }

        let mut decisions = join_all(polls).await;
        decisions.sort_by_key(|(idx, _)| *idx);
        decisions
    }

    /// Apply decisions one at a time, in submission order.
    fn commit_phase(&mut self, decisions: Vec<(usize, Option<ProposedAction>)>) {
        let run_id = self.engine.run_id().map(str::to_string);

        for (idx, proposal) in decisions {
            let Some(proposal) = proposal else {
                self.stats.missed_decisions += 1;
                continue;
            };
            self.stats.decisions += 1;

            let trader = &mut self.traders[idx];
            let mut price = proposal.price;

            // Negotiation is consulted before commitment; an accepted
            // counter-offer replaces the proposed price and leaves a record.
            if proposal.action.is_trade() {
                let (negotiated, record) =
                    self.engine
                        .negotiate_price(&trader.id, proposal.action, &proposal.asset, price);
                if let Some(record) = record {
                    price = negotiated;
                    if let Err(e) = self.engine.ledger().record_interaction(&record) {
                        error!(error = %e, "failed to record negotiation");
                    }
                }
            }

            let executed = match self.engine.process_action(
                &trader.id,
                &mut trader.portfolio,
                proposal.action,
                &proposal.asset,
                price,
            ) {
                Ok(Some(_)) => {
                    self.stats.trades_executed += 1;
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    error!(error = %e, agent = %trader.id, "action could not be committed");
                    false
                }
            };

            if proposal.action == AgentAction::Hold {
                self.stats.holds += 1;
            }

            let log = InteractionLog {
                id: None,
                kind: InteractionKind::Action,
                agent_id: trader.id.clone(),
                counterparty_id: None,
                action: proposal.action,
                asset: proposal.asset.clone(),
                price: Price::from_float(if price.is_finite() { price } else { 0.0 }),
                details: format!("{} (executed: {})", proposal.rationale, executed),
                run_id: run_id.clone(),
                timestamp: now_millis(),
            };
            if let Err(e) = self.engine.ledger().record_interaction(&log) {
                error!(error = %e, "failed to record action");
            }
        }
    }
}
