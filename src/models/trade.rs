//! Fill records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Direction;

/// A single fill against an order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    /// Broker deal id, unique per fill.
    pub trade_id: String,
    pub order_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub price: Decimal,
    pub volume: u64,
    pub datetime: DateTime<Utc>,
}
