//! Normalized domain records republished to the host platform.
//!
//! Everything in this module is broker-agnostic: raw Shioaji shapes live in
//! [`crate::broker`] and are converted at the boundary.

pub mod bar;
pub mod contract;
pub mod order;
pub mod position;
pub mod quote;
pub mod trade;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub use bar::{Bar, HistoryRequest, Interval};
pub use contract::{ContractRef, OptionTerms};
pub use order::{CancelRequest, Order, OrderRequest};
pub use position::Position;
pub use quote::{BOOK_DEPTH, Quote};
pub use trade::Trade;

/// Offset of the exchange's local clock (Asia/Taipei, no DST) from UTC.
pub const EXCHANGE_UTC_OFFSET_SECS: i64 = 8 * 60 * 60;

/// Converts a naive exchange-local datetime to UTC.
pub fn from_exchange_local(local: NaiveDateTime) -> DateTime<Utc> {
    (local - TimeDelta::seconds(EXCHANGE_UTC_OFFSET_SECS)).and_utc()
}

/// Converts broker epoch nanoseconds, which encode exchange-local wall time
/// as if it were UTC, to a true UTC instant.
pub fn from_local_epoch_nanos(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(ts) - TimeDelta::seconds(EXCHANGE_UTC_OFFSET_SECS)
}

/// Order or position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

/// How an order should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
    /// Fill-and-kill: fill what is available, cancel the rest.
    Fak,
    /// Fill-or-kill: fill completely or cancel.
    Fok,
    /// Host-side stop order. The broker has no native equivalent.
    Stop,
}

/// Open/close intent relative to an existing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Offset {
    /// Let the broker decide (cash equities, auto open/close futures).
    #[default]
    None,
    Open,
    Close,
    /// Day-trade close.
    CloseToday,
    CloseYesterday,
}

/// Order lifecycle state.
///
/// `Submitting → {NotTraded, Rejected}`,
/// `NotTraded → {PartTraded → AllTraded, Cancelled, Rejected}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitting,
    NotTraded,
    PartTraded,
    AllTraded,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Returns `true` for states no relay event may leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::AllTraded | Self::Cancelled | Self::Rejected)
    }
}

/// Instrument class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Equity,
    Future,
    Option,
}

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

/// Broker account class a position or order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    Stock,
    Futures,
}
