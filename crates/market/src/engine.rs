//! The market engine: central coordinator for trading actions.
//!
//! Single entry point that turns a proposed action into either a persisted
//! transaction or a no-op, while keeping the order books, the acting agent's
//! portfolio, and the ledger mutually consistent.
//!
//! Prices arrive from the decision layer as untrusted floats; everything is
//! validated here before any state is touched. Malformed input (unknown
//! asset, non-finite or non-positive price) resolves to "no transaction"
//! without an error.

use std::collections::HashMap;

use tracing::warn;

use agents::Portfolio;
use ledger::Ledger;
use types::{
    AgentAction, AgentId, InteractionKind, InteractionLog, MarketState, Price, Quantity, Symbol,
    Timestamp, Transaction, now_millis,
};

use crate::error::Result;
use crate::order_book::OrderBook;

/// Fallback seed price when the configured one is unusable.
const DEFAULT_SEED_PRICE: Price = Price(50); // 0.0050

/// Configuration for a [`MarketEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Recognized asset symbols. One order book per entry; the first entry
    /// is the fallback for unknown-asset state queries.
    pub assets: Vec<Symbol>,
    /// Price every asset starts at before its first trade.
    pub seed_price: Price,
    /// Identifier scoping one simulation execution; stamped onto every
    /// persisted record.
    pub run_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assets: vec!["AAPL".to_string(), "TSLA".to_string()],
            seed_price: DEFAULT_SEED_PRICE,
            run_id: None,
        }
    }
}

impl EngineConfig {
    pub fn new(assets: impl IntoIterator<Item = impl Into<Symbol>>) -> Self {
        Self {
            assets: assets.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_seed_price(mut self, price: Price) -> Self {
        self.seed_price = price;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// The engine driving the market logic.
///
/// Owns one [`OrderBook`] per recognized asset plus the cached last-trade
/// price for each. A portfolio is settled through an explicit `&mut`
/// capability passed into [`process_action`](Self::process_action) for the
/// duration of one call; the engine holds no agent state of its own.
pub struct MarketEngine {
    books: HashMap<Symbol, OrderBook>,
    /// Last trade price per asset, seeded from config.
    current_prices: HashMap<Symbol, Price>,
    /// Recognized assets in configuration order; the first is the fallback
    /// for out-of-range state queries.
    assets: Vec<Symbol>,
    seed_price: Price,
    ledger: Ledger,
    run_id: Option<String>,
}

impl MarketEngine {
    /// Build an engine over the given ledger.
    pub fn new(ledger: Ledger, config: EngineConfig) -> Self {
        let mut assets = config.assets;
        if assets.is_empty() {
            assets.push("AAPL".to_string());
        }
        let seed_price = if config.seed_price.is_positive() {
            config.seed_price
        } else {
            DEFAULT_SEED_PRICE
        };

        let books: HashMap<Symbol, OrderBook> = assets
            .iter()
            .map(|asset| (asset.clone(), OrderBook::new(asset.clone())))
            .collect();
        let current_prices = assets.iter().map(|a| (a.clone(), seed_price)).collect();

        Self {
            books,
            current_prices,
            assets,
            seed_price,
            ledger,
            run_id: config.run_id,
        }
    }

    /// Recognized asset symbols, in configuration order.
    pub fn assets(&self) -> &[Symbol] {
        &self.assets
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Cached last-trade price per asset.
    pub fn current_prices(&self) -> &HashMap<Symbol, Price> {
        &self.current_prices
    }

    /// Current market state for an asset.
    ///
    /// Unknown assets are redirected to the default asset rather than
    /// rejected; callers always get a usable snapshot.
    pub fn get_state(&self, asset: &str) -> MarketState {
        let target = if self.books.contains_key(asset) {
            asset
        } else {
            self.assets[0].as_str()
        };

        let order_book_summary = self
            .books
            .get(target)
            .map(|book| book.summary())
            .unwrap_or_default();

        MarketState {
            current_price: self
                .current_prices
                .get(target)
                .copied()
                .unwrap_or(self.seed_price),
            order_book_summary,
        }
    }

    /// Process an action submitted on behalf of an agent.
    ///
    /// The supplied portfolio is the settlement capability for this one
    /// call: a matched buy debits it, a matched sell credits it. On full
    /// success the transaction is persisted, the cached price updates, and
    /// the transaction is returned. Holds, malformed input, and failed
    /// settlement all resolve to `Ok(None)`.
    ///
    /// A ledger failure is the only error: the trade must not be reported
    /// as executed if it cannot be durably recorded.
    pub fn process_action(
        &mut self,
        agent_id: &AgentId,
        portfolio: &mut Portfolio,
        action: AgentAction,
        asset: &str,
        price: f64,
    ) -> Result<Option<Transaction>> {
        if !action.is_trade() {
            return Ok(None);
        }

        let Some(book) = self.books.get_mut(asset) else {
            return Ok(None);
        };

        if !price.is_finite() || price <= 0.0 {
            return Ok(None);
        }
        let limit = Price::from_float(price);
        if !limit.is_positive() {
            // Below fixed-point resolution; would rest or trade at zero
            return Ok(None);
        }

        let now = now_millis();
        let matched = match action {
            AgentAction::Buy => book.submit_buy(agent_id, limit, now),
            AgentAction::Sell => book.submit_sell(agent_id, limit, now),
            AgentAction::Hold => return Ok(None),
        };

        let Some(mut tx) = matched else {
            return Ok(None);
        };

        let settled = match action {
            AgentAction::Buy => portfolio.execute_buy(&tx.asset, Quantity::ONE, tx.price),
            _ => portfolio.execute_sell(&tx.asset, Quantity::ONE, tx.price),
        };

        if !settled {
            // Known consistency gap, kept deliberately: the matched resting
            // order has already left the book and is not restored, so the
            // counterparty's order is lost along with the trade. See
            // DESIGN.md for the rationale.
            warn!(
                agent = %agent_id,
                asset = %tx.asset,
                price = %tx.price,
                side = %action,
                "settlement failed after match; trade dropped"
            );
            return Ok(None);
        }

        tx.run_id = self.run_id.clone();
        let row_id = self.ledger.record_transaction(&tx)?;
        tx.id = Some(row_id);

        self.current_prices.insert(tx.asset.clone(), tx.price);
        Ok(Some(tx))
    }

    /// Offer a counter-price based on the current best quotes.
    ///
    /// For a buy below the best ask (or a sell above the best bid) the
    /// counter is the midpoint of the two; otherwise the original price
    /// comes back unchanged with no record. Advisory only: observes a
    /// snapshot, mutates nothing, and is re-validated at commit time.
    pub fn negotiate_price(
        &self,
        agent_id: &AgentId,
        action: AgentAction,
        asset: &str,
        price: f64,
    ) -> (f64, Option<InteractionLog>) {
        let Some(book) = self.books.get(asset) else {
            return (price, None);
        };
        if !price.is_finite() {
            return (price, None);
        }

        match action {
            AgentAction::Buy => {
                if let Some(best_ask) = book.best_ask()
                    && price < best_ask.to_float()
                {
                    let counter = (price + best_ask.to_float()) / 2.0;
                    let details =
                        format!("counter-offer between bid {} and ask {}", price, best_ask);
                    return (
                        counter,
                        Some(self.negotiation_log(agent_id, action, asset, counter, details, now_millis())),
                    );
                }
            }
            AgentAction::Sell => {
                if let Some(best_bid) = book.best_bid()
                    && price > best_bid.to_float()
                {
                    let counter = (price + best_bid.to_float()) / 2.0;
                    let details =
                        format!("counter-offer between ask {} and bid {}", price, best_bid);
                    return (
                        counter,
                        Some(self.negotiation_log(agent_id, action, asset, counter, details, now_millis())),
                    );
                }
            }
            AgentAction::Hold => {}
        }

        (price, None)
    }

    fn negotiation_log(
        &self,
        agent_id: &AgentId,
        action: AgentAction,
        asset: &str,
        counter_price: f64,
        details: String,
        timestamp: Timestamp,
    ) -> InteractionLog {
        InteractionLog {
            id: None,
            kind: InteractionKind::Negotiation,
            agent_id: agent_id.clone(),
            counterparty_id: None,
            action,
            asset: asset.to_string(),
            price: Price::from_float(counter_price),
            details,
            run_id: self.run_id.clone(),
            timestamp,
        }
    }
}
