//! Per-agent portfolio accounting.
//!
//! Tracks cash, positions, and profit/loss metrics. A portfolio is owned by
//! exactly one agent and mutated only through `execute_buy` / `execute_sell`
//! during settlement; both refuse the mutation outright rather than leaving
//! partial state behind.
//!
//! ## P&L Tracking
//!
//! Realized P&L uses weighted average cost basis:
//! - On buy: `new_avg = (old_qty * old_avg + buy_qty * buy_price) / (old_qty + buy_qty)`
//! - On sell: `realized_pnl += (sell_price - avg_cost) * sell_qty`

use std::collections::HashMap;

use serde::Serialize;
use types::{Cash, Price, Quantity, Symbol};

/// A held position in one asset.
///
/// Present in the portfolio only while `quantity > 0`; the entry (and its
/// cost basis) is removed as soon as the quantity reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Units held.
    pub quantity: Quantity,
    /// Weighted average price paid per unit.
    pub avg_cost: f64,
}

/// An agent's financial state.
#[derive(Debug, Clone)]
pub struct Portfolio {
    /// Available cash. Never negative.
    cash: Cash,
    /// Holdings by asset. No zero-quantity entries.
    positions: HashMap<Symbol, Position>,
    /// Locked-in profit/loss from closed positions.
    realized_pnl: Cash,
    /// Total settled trades.
    trade_count: u64,
    /// Starting cash, kept for ROI calculation.
    initial_capital: Cash,
}

impl Portfolio {
    /// Create a portfolio with the given starting cash.
    pub fn new(initial_cash: Cash) -> Self {
        Self {
            cash: initial_cash,
            positions: HashMap::new(),
            realized_pnl: Cash::ZERO,
            trade_count: 0,
            initial_capital: initial_cash,
        }
    }

    pub fn cash(&self) -> Cash {
        self.cash
    }

    /// Units held of an asset (zero when no entry exists).
    pub fn position(&self, asset: &str) -> Quantity {
        self.positions.get(asset).map_or(Quantity::ZERO, |p| p.quantity)
    }

    /// Weighted average cost basis for an asset, if held.
    pub fn cost_basis(&self, asset: &str) -> Option<f64> {
        self.positions.get(asset).map(|p| p.avg_cost)
    }

    pub fn positions(&self) -> &HashMap<Symbol, Position> {
        &self.positions
    }

    pub fn realized_pnl(&self) -> Cash {
        self.realized_pnl
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    /// Settle a buy: debit cash, credit the position.
    ///
    /// Returns `false` (and mutates nothing) when cash is insufficient.
    pub fn execute_buy(&mut self, asset: &str, qty: Quantity, price: Price) -> bool {
        if qty.is_zero() {
            return false;
        }

        let total_cost = price * qty;
        if self.cash < total_cost {
            return false;
        }

        self.cash -= total_cost;
        self.add_to_position(asset, qty, price);
        self.trade_count += 1;
        true
    }

    /// Settle a sell: debit the position, credit cash, realize P&L.
    ///
    /// Returns `false` (and mutates nothing) when the held quantity is
    /// insufficient.
    pub fn execute_sell(&mut self, asset: &str, qty: Quantity, price: Price) -> bool {
        if qty.is_zero() {
            return false;
        }

        let Some(position) = self.positions.get_mut(asset) else {
            return false;
        };
        if position.quantity < qty {
            return false;
        }

        let pnl = (price.to_float() - position.avg_cost) * qty.raw() as f64;
        self.realized_pnl += Cash::from_float(pnl);

        self.cash += price * qty;
        position.quantity -= qty;
        if position.quantity.is_zero() {
            self.positions.remove(asset);
        }

        self.trade_count += 1;
        true
    }

    /// Seed initial inventory while preserving total portfolio value.
    ///
    /// Buys `qty` units at `price` out of starting cash, without counting as
    /// a trade. Ignored when the price is not positive or cash is
    /// insufficient.
    pub fn seed_position(&mut self, asset: &str, qty: Quantity, price: Price) {
        if qty.is_zero() || !price.is_positive() {
            return;
        }
        let total_cost = price * qty;
        if self.cash < total_cost {
            return;
        }
        self.cash -= total_cost;
        self.add_to_position(asset, qty, price);
    }

    fn add_to_position(&mut self, asset: &str, qty: Quantity, price: Price) {
        let entry = self
            .positions
            .entry(asset.to_string())
            .or_insert(Position {
                quantity: Quantity::ZERO,
                avg_cost: 0.0,
            });

        let old_qty = entry.quantity.raw() as f64;
        let new_qty = old_qty + qty.raw() as f64;
        entry.avg_cost = (old_qty * entry.avg_cost + qty.raw() as f64 * price.to_float()) / new_qty;
        entry.quantity += qty;
    }

    /// Unrealized P&L across all held positions, marked to the given prices.
    ///
    /// Assets with no current price are valued at cost basis (zero
    /// unrealized contribution), matching how they entered the book.
    pub fn unrealized_pnl(&self, current_prices: &HashMap<Symbol, Price>) -> Cash {
        let mut total = 0.0;
        for (asset, position) in &self.positions {
            let market = current_prices
                .get(asset)
                .map_or(position.avg_cost, |p| p.to_float());
            total += (market - position.avg_cost) * position.quantity.raw() as f64;
        }
        Cash::from_float(total)
    }

    /// Total wealth: cash plus mark-to-market value of positions.
    pub fn portfolio_value(&self, current_prices: &HashMap<Symbol, Price>) -> Cash {
        let mut value = self.cash;
        for (asset, position) in &self.positions {
            if let Some(price) = current_prices.get(asset) {
                value += *price * position.quantity;
            }
        }
        value
    }

    /// Derived performance metrics. Pure view; never mutates.
    pub fn metrics(&self, current_prices: &HashMap<Symbol, Price>) -> PortfolioMetrics {
        let unrealized = self.unrealized_pnl(current_prices);
        let total_pnl = self.realized_pnl + unrealized;
        let initial = self.initial_capital.to_float();
        let roi = if initial > 0.0 {
            total_pnl.to_float() / initial * 100.0
        } else {
            0.0
        };

        PortfolioMetrics {
            cash: self.cash,
            positions: self
                .positions
                .iter()
                .map(|(asset, p)| (asset.clone(), p.quantity.raw()))
                .collect(),
            realized_pnl: self.realized_pnl,
            unrealized_pnl: unrealized,
            total_pnl,
            portfolio_value: self.portfolio_value(current_prices),
            roi,
            trade_count: self.trade_count,
        }
    }
}

/// Point-in-time performance snapshot of a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub cash: Cash,
    pub positions: HashMap<Symbol, u64>,
    pub realized_pnl: Cash,
    pub unrealized_pnl: Cash,
    pub total_pnl: Cash,
    pub portfolio_value: Cash,
    /// Total P&L as a percentage of initial capital.
    pub roi: f64,
    pub trade_count: u64,
}
