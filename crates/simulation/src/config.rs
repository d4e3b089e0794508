//! Simulation configuration options.

use std::time::Duration;

use types::{Cash, Quantity};

/// Configuration for the simulation loop.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// How many traders act each tick (the rest sit out).
    pub traders_per_tick: usize,

    /// Upper bound on one decision call; a slower source is treated as a
    /// hold for that tick.
    pub decision_timeout: Duration,

    /// Starting cash per trader.
    pub initial_cash: Cash,

    /// Units of each asset seeded into every trader's portfolio at start.
    pub seed_inventory: Quantity,

    /// Decision calls allowed per rate-limit window.
    pub max_decisions_per_window: usize,

    /// Length of the rate-limit window.
    pub rate_window: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            traders_per_tick: 4,
            decision_timeout: Duration::from_secs(30),
            initial_cash: Cash::from_float(10_000.0),
            seed_inventory: Quantity(10),
            max_decisions_per_window: 30,
            rate_window: Duration::from_secs(60),
        }
    }
}

impl SimulationConfig {
    pub fn with_traders_per_tick(mut self, n: usize) -> Self {
        self.traders_per_tick = n;
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn with_initial_cash(mut self, cash: Cash) -> Self {
        self.initial_cash = cash;
        self
    }

    pub fn with_seed_inventory(mut self, qty: Quantity) -> Self {
        self.seed_inventory = qty;
        self
    }
}
