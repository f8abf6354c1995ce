//! Order records and host-side order requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, Offset, OrderKind, OrderStatus};

/// Ledger view of one broker order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub kind: OrderKind,
    pub offset: Offset,
    pub price: Decimal,
    /// Requested volume; reduced by partial cancels.
    pub volume: u64,
    /// Cumulative filled volume.
    pub traded: u64,
    pub status: OrderStatus,
    /// Last status message from the broker.
    pub reference: String,
    pub datetime: Option<DateTime<Utc>>,
}

/// Host request to place an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub kind: OrderKind,
    #[serde(default)]
    pub offset: Offset,
    pub price: Decimal,
    pub volume: u64,
    #[serde(default)]
    pub reference: String,
}

impl OrderRequest {
    /// Creates a limit order request with no explicit offset.
    #[must_use]
    pub fn limit(symbol: &str, direction: Direction, price: Decimal, volume: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction,
            kind: OrderKind::Limit,
            offset: Offset::None,
            price,
            volume,
            reference: String::new(),
        }
    }

    /// Sets the order kind.
    #[must_use]
    pub fn with_kind(mut self, kind: OrderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the open/close intent.
    #[must_use]
    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }
}

/// Host request to cancel an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub order_id: String,
    pub symbol: String,
}
