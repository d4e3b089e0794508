//! Simulation loop for the agora market.
//!
//! Coordinates the two-phase tick:
//! - **Decide** (concurrent): active traders' decision sources are polled in
//!   parallel against read-only market snapshots, rate-limited and bounded
//!   by a timeout
//! - **Commit** (serialized): decisions are applied one at a time in
//!   submission order (negotiate, log, process, log), so book and portfolio
//!   mutation never interleave

mod config;
mod limiter;
mod runner;

pub use config::SimulationConfig;
pub use limiter::RateLimiter;
pub use runner::{SimulationRunner, SimulationStats, Trader};
