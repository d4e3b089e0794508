//! Runtime configuration for the agora binary.
//!
//! Defaults live here; the CLI (and its env fallbacks) override them.

use std::time::Duration;

/// Resolved configuration for one simulation run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite ledger path (`:memory:` keeps the run ephemeral).
    pub db_path: String,
    /// Ticks to run.
    pub ticks: u64,
    /// Number of traders to spawn.
    pub traders: usize,
    /// Traders acting per tick.
    pub traders_per_tick: usize,
    /// Assets traded this run.
    pub assets: Vec<String>,
    /// Seed price every asset starts at.
    pub seed_price: f64,
    /// Starting cash per trader.
    pub initial_cash: f64,
    /// Units of each asset seeded into every portfolio.
    pub seed_inventory: u64,
    /// Pause between ticks.
    pub tick_delay: Duration,
    /// Identifier scoping this run's ledger records.
    pub run_id: String,
    /// Fixed RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "market.db".to_string(),
            ticks: 50,
            traders: 8,
            traders_per_tick: 4,
            assets: vec!["AAPL".to_string(), "TSLA".to_string()],
            seed_price: 0.005,
            initial_cash: 10_000.0,
            seed_inventory: 10,
            tick_delay: Duration::from_millis(200),
            run_id: String::new(), // filled from the clock unless overridden
            rng_seed: None,
        }
    }
}

impl AppConfig {
    /// Parse a comma-separated asset list, dropping empty entries.
    pub fn parse_assets(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assets() {
        assert_eq!(
            AppConfig::parse_assets("AAPL, TSLA,,NVDA "),
            vec!["AAPL", "TSLA", "NVDA"]
        );
        assert!(AppConfig::parse_assets("").is_empty());
    }
}
