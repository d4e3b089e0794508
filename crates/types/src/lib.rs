//! Core types shared across the agora market simulation.
//!
//! This crate provides the data model used by every other crate: fixed-point
//! monetary values, agent and asset identifiers, order and transaction
//! records, and the snapshot types handed to the decision layer.

use derive_more::{Add, AddAssign, From, Into, Neg, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Constants
// =============================================================================

/// Fixed-point scale for Price and Cash types.
/// 10,000 = 1.0000, 15,000 = 1.5000, 100 = 0.0100
pub const PRICE_SCALE: i64 = 10_000;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a trading agent.
///
/// Agent identities originate outside the core (the decision layer names its
/// agents), so this is a string newtype rather than a numeric handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Asset ticker symbol (e.g., "AAPL", "TSLA").
pub type Symbol = String;

/// Wall clock timestamp in milliseconds since epoch.
pub type Timestamp = u64;

/// Current wall clock time in milliseconds since epoch.
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// =============================================================================
// Quantity Type (Newtype for units)
// =============================================================================

/// Number of asset units (newtype for type safety).
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Quantity(pub u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Every match in the core trades exactly one unit.
    pub const ONE: Quantity = Quantity(1);

    /// Get raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Check if zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating subtraction.
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Quantity(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qty({})", self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Allow `quantity == 5` comparisons
impl PartialEq<u64> for Quantity {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Fixed-Point Monetary Types
// =============================================================================

/// Fixed-point price with 4 decimal places.
///
/// # Examples
/// - `Price(10000)` = 1.00
/// - `Price(15000)` = 1.50
/// - `Price(100)` = 0.01
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    From,
    Into,
)]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Create a Price from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * PRICE_SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display/calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if price is positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Midpoint of two prices, rounding toward the lower one.
    #[inline]
    pub fn midpoint(self, other: Price) -> Price {
        Price((self.0 + other.0) / 2)
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({:.4})", self.to_float())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_float())
    }
}

/// Fixed-point cash balance with 4 decimal places.
///
/// Semantically identical to Price but represents account balances.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    From,
    Into,
)]
pub struct Cash(pub i64);

impl Cash {
    pub const ZERO: Cash = Cash(0);

    /// Create Cash from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * PRICE_SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display/calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if cash is negative.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Debug for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cash({:.4})", self.to_float())
    }
}

impl fmt::Display for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_float())
    }
}

impl Mul<Quantity> for Price {
    type Output = Cash;

    /// Multiply price by quantity to get total cash value.
    fn mul(self, qty: Quantity) -> Cash {
        Cash(self.0 * qty.0 as i64)
    }
}

impl Mul<Price> for Quantity {
    type Output = Cash;

    fn mul(self, price: Price) -> Cash {
        Cash(price.0 * self.0 as i64)
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Action an agent can take in a single simulation tick.
///
/// Anything that is not a buy or a sell has no market impact and is treated
/// as a hold at the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentAction {
    Buy,
    Sell,
    Hold,
}

impl AgentAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentAction::Buy => "buy",
            AgentAction::Sell => "sell",
            AgentAction::Hold => "hold",
        }
    }

    /// Whether this action can move the market.
    pub fn is_trade(self) -> bool {
        matches!(self, AgentAction::Buy | AgentAction::Sell)
    }
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(AgentAction::Buy),
            "sell" => Ok(AgentAction::Sell),
            "hold" => Ok(AgentAction::Hold),
            _ => Err(ParseEnumError {
                kind: "AgentAction",
                value: s.to_string(),
            }),
        }
    }
}

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Bid => OrderSide::Ask,
            OrderSide::Ask => OrderSide::Bid,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Bid => write!(f, "BID"),
            OrderSide::Ask => write!(f, "ASK"),
        }
    }
}

/// Error parsing one of the string-backed enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

// =============================================================================
// Orders & Transactions
// =============================================================================

/// An order resting in the book, awaiting a counter-order.
///
/// Immutable once resting; removed atomically when matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    /// Which side of the book this order rests on.
    pub side: OrderSide,
    /// Limit price. Always finite and positive by construction.
    pub price: Price,
    /// Monotonically increasing submission sequence within one book.
    /// Breaks ties between orders at the same price (earlier matches first).
    pub seq: u64,
    /// Wall clock time of submission.
    pub submitted_at: Timestamp,
    /// Agent that placed the order.
    pub owner_id: AgentId,
    /// Asset this order trades.
    pub asset: Symbol,
}

/// A successful trade between two agents.
///
/// Created only as the result of a match AND a successful portfolio
/// settlement; persisted exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger row id, assigned on persistence.
    pub id: Option<i64>,
    /// Agent that bought.
    pub buyer_id: AgentId,
    /// Agent that sold.
    pub seller_id: AgentId,
    /// Asset traded.
    pub asset: Symbol,
    /// Execution price (the resting order's price).
    pub price: Price,
    /// When the trade occurred.
    pub timestamp: Timestamp,
    /// Simulation run this trade belongs to.
    pub run_id: Option<String>,
}

/// What kind of event an interaction record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    /// An agent's submitted (or held) action.
    Action,
    /// A counter-offer produced before commitment.
    Negotiation,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Action => "action",
            InteractionKind::Negotiation => "negotiation",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(InteractionKind::Action),
            "negotiation" => Ok(InteractionKind::Negotiation),
            _ => Err(ParseEnumError {
                kind: "InteractionKind",
                value: s.to_string(),
            }),
        }
    }
}

/// Audit record of an agent interaction.
///
/// Softer than a Transaction: written even when no trade results (a hold, a
/// negotiation counter-offer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionLog {
    /// Ledger row id, assigned on persistence.
    pub id: Option<i64>,
    pub kind: InteractionKind,
    pub agent_id: AgentId,
    pub counterparty_id: Option<AgentId>,
    pub action: AgentAction,
    pub asset: Symbol,
    pub price: Price,
    /// Free-form detail: the agent's rationale, a counter-offer note.
    pub details: String,
    pub run_id: Option<String>,
    pub timestamp: Timestamp,
}

// =============================================================================
// Market Snapshots
// =============================================================================

/// Condensed view of one asset's order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BookSummary {
    /// Highest resting bid price, if any.
    pub best_bid: Option<Price>,
    /// Lowest resting ask price, if any.
    pub best_ask: Option<Price>,
    /// Total resting bid orders.
    pub bids_count: usize,
    /// Total resting ask orders.
    pub asks_count: usize,
}

impl BookSummary {
    /// Spread between best ask and best bid, when both sides are populated.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Snapshot of market conditions for one asset.
///
/// This is the "sensor" data handed to the decision layer. Derived on
/// request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    /// Last trade price, or the configured seed price before any trade.
    pub current_price: Price,
    pub order_book_summary: BookSummary,
}

/// A candidate action produced by the external decision layer.
///
/// The core never inspects `rationale`; the price is an untrusted float and
/// is validated at the engine boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub action: AgentAction,
    pub asset: Symbol,
    pub price: f64,
    pub rationale: String,
}

// =============================================================================
// Tests
// =============================================================================
