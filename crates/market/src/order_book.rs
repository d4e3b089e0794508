//! Limit order book with price-time priority.
//!
//! One book per asset. Each side is a `BTreeMap` of price levels holding a
//! FIFO queue of resting orders: bids match from the highest price, asks
//! from the lowest, and within a price level the earliest submission matches
//! first. Side counts are tracked incrementally so a summary is O(1).
//!
//! Every match consumes exactly one resting order for exactly one unit and
//! satisfies exactly one incoming order; there are no partial fills and no
//! cancellation. Execution always happens at the resting order's price.

use std::collections::{BTreeMap, VecDeque};

use types::{
    AgentId, BookSummary, OrderSide, Price, RestingOrder, Symbol, Timestamp, Transaction,
};

/// In-memory limit order book for a single asset.
///
/// Pure data structure: it knows nothing about money or portfolios.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// The asset this book trades.
    asset: Symbol,
    /// Buy orders by price; best bid is the last key.
    bids: BTreeMap<Price, VecDeque<RestingOrder>>,
    /// Sell orders by price; best ask is the first key.
    asks: BTreeMap<Price, VecDeque<RestingOrder>>,
    /// Total resting bid orders (tracked incrementally).
    bids_count: usize,
    /// Total resting ask orders (tracked incrementally).
    asks_count: usize,
    /// Submission sequence; stamps each resting order for time priority.
    next_seq: u64,
}

impl OrderBook {
    /// Create an empty book for an asset.
    pub fn new(asset: impl Into<Symbol>) -> Self {
        Self {
            asset: asset.into(),
            ..Default::default()
        }
    }

    /// The asset this book trades.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Process a buy order.
    ///
    /// Matches against the best (lowest) resting ask when that ask's price
    /// is within the buyer's limit; the trade executes at the resting ask's
    /// price. Otherwise the bid rests in the book.
    pub fn submit_buy(
        &mut self,
        owner_id: &AgentId,
        price: Price,
        now: Timestamp,
    ) -> Option<Transaction> {
        if self.best_ask().is_some_and(|ask| ask <= price)
            && let Some(resting) = self.pop_best_ask()
        {
            return Some(Transaction {
                id: None,
                buyer_id: owner_id.clone(),
                seller_id: resting.owner_id,
                asset: self.asset.clone(),
                price: resting.price,
                timestamp: now,
                run_id: None,
            });
        }

        self.rest_order(OrderSide::Bid, owner_id, price, now);
        None
    }

    /// Process a sell order.
    ///
    /// Matches against the best (highest) resting bid when that bid's price
    /// covers the seller's limit; the trade executes at the resting bid's
    /// price. Otherwise the ask rests in the book.
    pub fn submit_sell(
        &mut self,
        owner_id: &AgentId,
        price: Price,
        now: Timestamp,
    ) -> Option<Transaction> {
        if self.best_bid().is_some_and(|bid| bid >= price)
            && let Some(resting) = self.pop_best_bid()
        {
            return Some(Transaction {
                id: None,
                buyer_id: resting.owner_id,
                seller_id: owner_id.clone(),
                asset: self.asset.clone(),
                price: resting.price,
                timestamp: now,
                run_id: None,
            });
        }

        self.rest_order(OrderSide::Ask, owner_id, price, now);
        None
    }

    /// Highest resting bid price.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest resting ask price.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Condensed view of the book. O(1).
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            bids_count: self.bids_count,
            asks_count: self.asks_count,
        }
    }

    /// Check if the book has any resting orders.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    fn rest_order(&mut self, side: OrderSide, owner_id: &AgentId, price: Price, now: Timestamp) {
        let order = RestingOrder {
            side,
            price,
            seq: self.next_seq,
            submitted_at: now,
            owner_id: owner_id.clone(),
            asset: self.asset.clone(),
        };
        self.next_seq += 1;

        match side {
            OrderSide::Bid => {
                self.bids.entry(price).or_default().push_back(order);
                self.bids_count += 1;
            }
            OrderSide::Ask => {
                self.asks.entry(price).or_default().push_back(order);
                self.asks_count += 1;
            }
        }
    }

    /// Remove and return the earliest order at the best ask price.
    fn pop_best_ask(&mut self) -> Option<RestingOrder> {
        let price = *self.asks.keys().next()?;
        let level = self.asks.get_mut(&price)?;
        let order = level.pop_front()?;
        let empty = level.is_empty();
        if empty {
            self.asks.remove(&price);
        }
        self.asks_count -= 1;
        Some(order)
    }

    /// Remove and return the earliest order at the best bid price.
    fn pop_best_bid(&mut self) -> Option<RestingOrder> {
        let price = *self.bids.keys().next_back()?;
        let level = self.bids.get_mut(&price)?;
        let order = level.pop_front()?;
        let empty = level.is_empty();
        if empty {
            self.bids.remove(&price);
        }
        self.bids_count -= 1;
        Some(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentId {
        AgentId::from(name)
    }

    #[test]
    fn test_new_book_is_empty() {
        let book = OrderBook::new("AAPL");
        assert_eq!(book.asset(), "AAPL");
        assert!(book.is_empty());

        let summary = book.summary();
        assert_eq!(summary.best_bid, None);
        assert_eq!(summary.best_ask, None);
        assert_eq!(summary.bids_count, 0);
        assert_eq!(summary.asks_count, 0);
    }

    #[test]
    fn test_buy_with_no_sellers_rests() {
        let mut book = OrderBook::new("AAPL");

        let result = book.submit_buy(&agent("buyer"), Price::from_float(10.0), 1);
        assert!(result.is_none());

        let summary = book.summary();
        assert_eq!(summary.best_bid, Some(Price::from_float(10.0)));
        assert_eq!(summary.bids_count, 1);
        assert_eq!(summary.asks_count, 0);
    }

    #[test]
    fn test_sell_with_no_buyers_rests() {
        let mut book = OrderBook::new("AAPL");

        let result = book.submit_sell(&agent("seller"), Price::from_float(9.0), 1);
        assert!(result.is_none());

        let summary = book.summary();
        assert_eq!(summary.best_ask, Some(Price::from_float(9.0)));
        assert_eq!(summary.asks_count, 1);
    }

    #[test]
    fn test_match_executes_at_maker_price() {
        let mut book = OrderBook::new("AAPL");

        // Seller rests first at 10.0 (maker)
        book.submit_sell(&agent("S"), Price::from_float(10.0), 1);

        // Buyer crosses at 11.0 (taker)
        let tx = book.submit_buy(&agent("B"), Price::from_float(11.0), 2).unwrap();

        assert_eq!(tx.price, Price::from_float(10.0));
        assert_eq!(tx.buyer_id, agent("B"));
        assert_eq!(tx.seller_id, agent("S"));
        assert_eq!(tx.asset, "AAPL");
        assert_eq!(book.summary().asks_count, 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_sell_match_executes_at_resting_bid_price() {
        let mut book = OrderBook::new("AAPL");

        book.submit_buy(&agent("B"), Price::from_float(12.0), 1);

        let tx = book.submit_sell(&agent("S"), Price::from_float(10.0), 2).unwrap();

        assert_eq!(tx.price, Price::from_float(12.0));
        assert_eq!(tx.buyer_id, agent("B"));
        assert_eq!(tx.seller_id, agent("S"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_incompatible_prices_do_not_match() {
        let mut book = OrderBook::new("AAPL");

        book.submit_buy(&agent("B1"), Price::from_float(5.0), 1);
        let result = book.submit_sell(&agent("S"), Price::from_float(10.0), 2);
        assert!(result.is_none());

        let summary = book.summary();
        assert_eq!(summary.best_bid, Some(Price::from_float(5.0)));
        assert_eq!(summary.best_ask, Some(Price::from_float(10.0)));
        assert_eq!(summary.bids_count, 1);
        assert_eq!(summary.asks_count, 1);
    }

    #[test]
    fn test_exact_price_crosses() {
        let mut book = OrderBook::new("AAPL");

        book.submit_sell(&agent("S"), Price::from_float(10.0), 1);
        let tx = book.submit_buy(&agent("B"), Price::from_float(10.0), 2);

        assert!(tx.is_some());
        assert_eq!(tx.unwrap().price, Price::from_float(10.0));
    }

    #[test]
    fn test_best_price_matches_first() {
        let mut book = OrderBook::new("AAPL");

        book.submit_sell(&agent("S1"), Price::from_float(11.0), 1);
        book.submit_sell(&agent("S2"), Price::from_float(10.0), 2);

        // Both asks within the buyer's limit; the cheaper one matches first
        let tx1 = book.submit_buy(&agent("B1"), Price::from_float(12.0), 3).unwrap();
        assert_eq!(tx1.price, Price::from_float(10.0));
        assert_eq!(tx1.seller_id, agent("S2"));

        let tx2 = book.submit_buy(&agent("B2"), Price::from_float(12.0), 4).unwrap();
        assert_eq!(tx2.price, Price::from_float(11.0));
        assert_eq!(tx2.seller_id, agent("S1"));

        assert_eq!(book.summary().asks_count, 0);
    }

    #[test]
    fn test_fifo_at_equal_price() {
        let mut book = OrderBook::new("AAPL");

        // Four sellers at the same price, submitted in order
        for name in ["S1", "S2", "S3", "S4"] {
            book.submit_sell(&agent(name), Price::from_float(10.0), 1);
        }

        // Buyers consume them in submission order
        for expected in ["S1", "S2", "S3", "S4"] {
            let tx = book.submit_buy(&agent("B"), Price::from_float(10.0), 2).unwrap();
            assert_eq!(tx.seller_id, agent(expected));
        }
        assert!(book.is_empty());
    }

    #[test]
    fn test_fifo_at_equal_price_bids() {
        let mut book = OrderBook::new("AAPL");

        book.submit_buy(&agent("B1"), Price::from_float(10.0), 1);
        book.submit_buy(&agent("B2"), Price::from_float(10.0), 2);

        let tx = book.submit_sell(&agent("S"), Price::from_float(10.0), 3).unwrap();
        assert_eq!(tx.buyer_id, agent("B1"));

        let tx = book.submit_sell(&agent("S"), Price::from_float(10.0), 4).unwrap();
        assert_eq!(tx.buyer_id, agent("B2"));
    }

    #[test]
    fn test_match_consumes_exactly_one_resting_order() {
        let mut book = OrderBook::new("AAPL");

        book.submit_sell(&agent("S1"), Price::from_float(10.0), 1);
        book.submit_sell(&agent("S2"), Price::from_float(10.0), 2);

        book.submit_buy(&agent("B"), Price::from_float(10.0), 3).unwrap();

        let summary = book.summary();
        assert_eq!(summary.asks_count, 1);
        assert_eq!(summary.best_ask, Some(Price::from_float(10.0)));
    }

    #[test]
    fn test_counts_track_matches_and_rests() {
        let mut book = OrderBook::new("AAPL");

        book.submit_buy(&agent("B1"), Price::from_float(9.0), 1);
        book.submit_buy(&agent("B2"), Price::from_float(8.0), 2);
        book.submit_sell(&agent("S1"), Price::from_float(11.0), 3);
        assert_eq!(book.summary().bids_count, 2);
        assert_eq!(book.summary().asks_count, 1);

        // Crosses the 9.0 bid
        book.submit_sell(&agent("S2"), Price::from_float(9.0), 4).unwrap();
        assert_eq!(book.summary().bids_count, 1);
        assert_eq!(book.summary().best_bid, Some(Price::from_float(8.0)));
    }

    #[test]
    fn test_empty_level_is_removed() {
        let mut book = OrderBook::new("AAPL");

        book.submit_sell(&agent("S"), Price::from_float(10.0), 1);
        book.submit_sell(&agent("S"), Price::from_float(11.0), 2);

        book.submit_buy(&agent("B"), Price::from_float(10.0), 3).unwrap();

        // The 10.0 level is gone; next best ask is 11.0
        assert_eq!(book.best_ask(), Some(Price::from_float(11.0)));
    }

    #[test]
    fn test_resting_orders_carry_increasing_seq() {
        let mut book = OrderBook::new("AAPL");

        book.submit_buy(&agent("B1"), Price::from_float(9.0), 5);
        book.submit_buy(&agent("B2"), Price::from_float(9.0), 5);

        let level = book.bids.get(&Price::from_float(9.0)).unwrap();
        assert!(level[0].seq < level[1].seq);
        assert_eq!(level[0].owner_id, agent("B1"));
        assert_eq!(level[0].side, OrderSide::Bid);
        assert_eq!(level[0].submitted_at, 5);
    }
}
