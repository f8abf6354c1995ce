//! Position records.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{AccountClass, Direction};

/// A position as reported by one broker query. Never merged with earlier
/// reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub account_class: AccountClass,
    pub direction: Direction,
    pub volume: u64,
    /// Volume carried over from the previous session.
    pub yd_volume: u64,
    /// Volume opened today and not yet settled.
    pub frozen: u64,
    pub price: Decimal,
    pub pnl: Decimal,
}
