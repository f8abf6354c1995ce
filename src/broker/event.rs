//! Tagged broker events consumed by the reconciliation core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::AccountKey;
use crate::models::{BOOK_DEPTH, Direction};

/// Every callback the core reacts to, decoded at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    TradeTick(TradeTick),
    BookTick(BookTick),
    RelayOrder(RelayOrderEvent),
    RelayDeal(RelayDealEvent),
}

impl BrokerEvent {
    /// Returns `true` for events of the order/deal relay stream.
    pub fn is_relay(&self) -> bool {
        matches!(self, Self::RelayOrder(_) | Self::RelayDeal(_))
    }
}

/// Trade-side partial update of a quote.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTick {
    pub code: String,
    pub datetime: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub price_chg: Decimal,
    /// Cumulative session volume.
    pub volume: u64,
    pub indicative: bool,
}

/// Book-side partial update of a quote. Missing levels are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BookTick {
    pub code: String,
    pub datetime: DateTime<Utc>,
    pub bid_price: [Decimal; BOOK_DEPTH],
    pub bid_volume: [u64; BOOK_DEPTH],
    pub ask_price: [Decimal; BOOK_DEPTH],
    pub ask_volume: [u64; BOOK_DEPTH],
}

/// Operation a relay order event reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOperation {
    New,
    Cancel,
    UpdateQty,
    UpdatePrice,
    Other(String),
}

impl RelayOperation {
    pub fn parse(op_type: &str) -> Self {
        match op_type {
            "New" => Self::New,
            "Cancel" => Self::Cancel,
            "UpdateQty" => Self::UpdateQty,
            "UpdatePrice" => Self::UpdatePrice,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Order-state transition reported on the relay stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayOrderEvent {
    pub account: AccountKey,
    pub seqno: String,
    pub order_id: String,
    pub code: String,
    pub operation: RelayOperation,
    pub success: bool,
    pub message: String,
    pub cancel_quantity: u64,
    pub modified_price: Option<Decimal>,
    /// When the exchange processed the operation.
    pub exchange_time: Option<DateTime<Utc>>,
}

/// Fill reported on the relay stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayDealEvent {
    pub account: AccountKey,
    pub seqno: String,
    /// Per-fill exchange sequence; the dedup key.
    pub deal_id: String,
    pub code: String,
    pub direction: Direction,
    pub price: Decimal,
    pub volume: u64,
    pub datetime: DateTime<Utc>,
}
