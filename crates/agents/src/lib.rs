//! Agent-side state for the agora simulation.
//!
//! This crate provides:
//! - [`Portfolio`] - per-agent cash/position accounting with weighted-average
//!   cost basis, mutated only through trade settlement
//! - [`DecisionSource`] - the async boundary to the external decision layer
//!   (an LLM, a strategy, a script), consumed as opaque proposals

mod decision;
mod portfolio;

pub use decision::{DecisionSource, NoiseDecisionSource, NoiseSourceConfig, ScriptedDecisionSource};
pub use portfolio::{Portfolio, PortfolioMetrics, Position};
