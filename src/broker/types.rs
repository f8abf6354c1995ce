//! Shapes exchanged with the broker session through request/response calls.
//!
//! These mirror the Shioaji SDK objects closely enough to deserialize their
//! JSON renderings; the reconciliation core converts them into
//! [`crate::models`] records through [`super::mapping`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::bar::RawTimestamp;

/// Broker order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

/// Broker price type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceType {
    /// Limit price.
    Lmt,
    /// Market price.
    Mkt,
    /// Market-range price (futures only).
    Mkp,
}

/// Broker time-in-force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Rest on the book for the day.
    Rod,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

/// Futures open/close type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcType {
    #[default]
    Auto,
    New,
    Cover,
    DayTrade,
}

/// Order status as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerStatus {
    Cancelled,
    Filled,
    PartFilled,
    Failed,
    PendingSubmit,
    PreSubmitted,
    Submitted,
    Inactive,
}

/// Account class code used by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "S")]
    Stock,
    #[serde(rename = "F")]
    Futures,
    #[serde(rename = "H")]
    Custody,
}

/// Identifies an account in relay payloads and status refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub broker_id: String,
    pub account_id: String,
}

/// An account returned by login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerAccount {
    pub account_type: AccountType,
    pub person_id: String,
    pub broker_id: String,
    pub account_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub signed: bool,
}

impl BrokerAccount {
    /// Returns the key relay payloads use for this account.
    pub fn key(&self) -> AccountKey {
        AccountKey {
            broker_id: self.broker_id.clone(),
            account_id: self.account_id.clone(),
        }
    }
}

/// Order parameters handed to the broker's placement call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub action: Action,
    pub price: Decimal,
    pub quantity: u64,
    pub price_type: PriceType,
    pub order_type: TimeInForce,
    #[serde(default)]
    pub octype: OcType,
}

/// The broker's full record of one placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerTrade {
    pub contract: TradeContract,
    pub order: TradeOrder,
    pub status: TradeStatus,
}

impl BrokerTrade {
    pub fn order_id(&self) -> &str {
        &self.order.id
    }

    pub fn seqno(&self) -> &str {
        &self.order.seqno
    }
}

/// Contract identity attached to a trade handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeContract {
    pub code: String,
    #[serde(default)]
    pub security_type: String,
}

/// Order half of a trade handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub id: String,
    pub seqno: String,
    #[serde(default)]
    pub ordno: String,
    pub account: AccountKey,
    pub action: Action,
    pub price: Decimal,
    pub quantity: u64,
    pub price_type: PriceType,
    pub order_type: TimeInForce,
    #[serde(default)]
    pub octype: OcType,
}

/// Status half of a trade handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatus {
    pub status: BrokerStatus,
    #[serde(default)]
    pub status_code: String,
    /// Epoch seconds of the order's submission.
    #[serde(default)]
    pub order_ts: Option<i64>,
    #[serde(default)]
    pub deal_quantity: u64,
    #[serde(default)]
    pub cancel_quantity: u64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub deals: Vec<TradeDeal>,
}

/// One fill inside a trade handle's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDeal {
    /// Exchange sequence of the fill; the same id relay deal events carry.
    pub seq: String,
    pub price: Decimal,
    pub quantity: u64,
    /// Epoch seconds.
    pub ts: i64,
}

/// Market-data stream kinds a contract can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStream {
    Tick,
    BidAsk,
}

/// Bulk contract catalog delivered once after login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub futures: Vec<CatalogCategory>,
    #[serde(default)]
    pub options: Vec<CatalogCategory>,
    #[serde(default)]
    pub stocks: Vec<CatalogCategory>,
}

impl Catalog {
    /// Total number of contracts across all classes.
    pub fn len(&self) -> usize {
        [&self.futures, &self.options, &self.stocks]
            .iter()
            .flat_map(|class| class.iter())
            .map(|category| category.contracts.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Contracts listed under one broker category (e.g. `"TXF"`, `"TSE"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub name: String,
    pub contracts: Vec<RawContract>,
}

/// A contract as the broker catalog lists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContract {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub delivery_month: String,
    /// `YYYY/MM/DD`, options and futures only.
    #[serde(default)]
    pub delivery_date: String,
    /// Price step for futures.
    #[serde(default)]
    pub unit: Option<Decimal>,
    #[serde(default)]
    pub limit_up: Decimal,
    #[serde(default)]
    pub limit_down: Decimal,
    #[serde(default)]
    pub reference: Decimal,
    #[serde(default)]
    pub strike_price: Option<Decimal>,
    /// `"C"` or `"P"`.
    #[serde(default)]
    pub option_right: Option<String>,
    #[serde(default)]
    pub underlying_code: Option<String>,
}

/// A point-in-time quote from the snapshot query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Epoch nanoseconds of exchange-local wall time.
    pub ts: i64,
    pub code: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub total_volume: u64,
    pub buy_price: Decimal,
    pub buy_volume: u64,
    pub sell_price: Decimal,
    pub sell_volume: u64,
}

/// A stock position row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStockPosition {
    pub code: String,
    pub direction: Action,
    pub quantity: u64,
    #[serde(default)]
    pub yd_quantity: u64,
    pub price: Decimal,
    pub pnl: Decimal,
    /// Zero once the stock is delisted.
    pub last_price: Decimal,
}

/// A futures open-position row. The broker pads its result with empty
/// rows, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFuturesPosition {
    #[serde(rename = "Code", default)]
    pub code: Option<String>,
    /// `"B"` or `"S"`.
    #[serde(rename = "OrderBS", default)]
    pub order_bs: Option<String>,
    #[serde(rename = "Volume", default)]
    pub volume: Option<Decimal>,
    #[serde(rename = "ContractAverPrice", default)]
    pub average_price: Option<Decimal>,
    #[serde(rename = "FlowProfitLoss", default)]
    pub flow_profit_loss: Option<Decimal>,
}

/// One row of the historical-bar query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawKBar {
    pub ts: RawTimestamp,
    #[serde(rename = "Open")]
    pub open: Decimal,
    #[serde(rename = "High")]
    pub high: Decimal,
    #[serde(rename = "Low")]
    pub low: Decimal,
    #[serde(rename = "Close")]
    pub close: Decimal,
    #[serde(rename = "Volume")]
    pub volume: u64,
    #[serde(rename = "Amount", default)]
    pub amount: Decimal,
}

/// Inclusive date range of a historical-bar query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
