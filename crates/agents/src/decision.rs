//! The boundary to the external decision layer.
//!
//! The core never produces trading decisions; it consumes them as opaque
//! [`ProposedAction`] tuples through the [`DecisionSource`] trait. The real
//! system plugs an LLM-backed source in here. This module ships two concrete
//! sources: a random one for demo liquidity and a scripted one for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use types::{AgentAction, MarketState, ProposedAction, Symbol};

/// Produces candidate actions for one agent.
///
/// Implementations may suspend indefinitely (network calls to an external
/// model); the runner bounds them with a timeout and treats a missing
/// decision as a hold.
#[async_trait]
pub trait DecisionSource: Send {
    /// Propose an action for the given asset, observing a market snapshot.
    ///
    /// Returning `None` is equivalent to holding.
    async fn propose(&mut self, state: &MarketState, asset: &Symbol) -> Option<ProposedAction>;
}

/// Configuration for a [`NoiseDecisionSource`].
#[derive(Debug, Clone)]
pub struct NoiseSourceConfig {
    /// Probability of proposing a trade each tick (0.0 to 1.0).
    pub trade_probability: f64,
    /// Maximum price deviation from the current price as a fraction.
    pub price_deviation: f64,
}

impl Default for NoiseSourceConfig {
    fn default() -> Self {
        Self {
            trade_probability: 0.6,
            price_deviation: 0.05,
        }
    }
}

/// A random decision source that generates market activity.
///
/// Proposes buys and sells near the current price, providing liquidity and
/// price discovery when no external decision layer is attached.
pub struct NoiseDecisionSource {
    config: NoiseSourceConfig,
    rng: StdRng,
}

impl NoiseDecisionSource {
    pub fn new(config: NoiseSourceConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a source with a fixed seed (for reproducible runs).
    pub fn with_seed(config: NoiseSourceConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl DecisionSource for NoiseDecisionSource {
    async fn propose(&mut self, state: &MarketState, asset: &Symbol) -> Option<ProposedAction> {
        if !self.rng.random_bool(self.config.trade_probability) {
            return Some(ProposedAction {
                action: AgentAction::Hold,
                asset: asset.clone(),
                price: state.current_price.to_float(),
                rationale: "sitting out this tick".to_string(),
            });
        }

        let action = if self.rng.random_bool(0.5) {
            AgentAction::Buy
        } else {
            AgentAction::Sell
        };

        let deviation = self
            .rng
            .random_range(-self.config.price_deviation..self.config.price_deviation);
        let price = (state.current_price.to_float() * (1.0 + deviation)).max(0.0001);

        Some(ProposedAction {
            action,
            asset: asset.clone(),
            price,
            rationale: format!("noise {} near {:.4}", action, price),
        })
    }
}

/// A decision source that replays a fixed queue of proposals.
///
/// Deterministic; used by the runner tests. Once the queue drains, every
/// further call holds.
#[derive(Debug, Default)]
pub struct ScriptedDecisionSource {
    queue: VecDeque<ProposedAction>,
}

impl ScriptedDecisionSource {
    pub fn new(proposals: impl IntoIterator<Item = ProposedAction>) -> Self {
        Self {
            queue: proposals.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DecisionSource for ScriptedDecisionSource {
    async fn propose(&mut self, _state: &MarketState, asset: &Symbol) -> Option<ProposedAction> {
        self.queue.pop_front().or_else(|| {
            Some(ProposedAction {
                action: AgentAction::Hold,
                asset: asset.clone(),
                price: 0.0,
                rationale: "script exhausted".to_string(),
            })
        })
    }
}
