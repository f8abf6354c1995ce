//! Raw payloads delivered by the broker's streaming callbacks.
//!
//! Only [`super::decode`] looks at these; everything downstream works with
//! the tagged [`super::BrokerEvent`] variants.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::types::{AccountKey, Action};

/// Trade tick for stocks, futures and options (`*_v1` quote format).
#[derive(Debug, Clone, Deserialize)]
pub struct TickPayload {
    pub code: String,
    /// Exchange-local datetime, e.g. `"2024-01-15 09:00:00.123456"`.
    pub datetime: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Change of `close` against the previous session's close.
    #[serde(default)]
    pub price_chg: Decimal,
    /// Volume of this tick.
    #[serde(default)]
    pub volume: u64,
    /// Cumulative session volume.
    #[serde(default)]
    pub total_volume: Option<u64>,
    /// `1` while the exchange publishes indicative prices.
    #[serde(default)]
    pub simtrade: u8,
}

/// Book tick carrying up to five levels per side.
#[derive(Debug, Clone, Deserialize)]
pub struct BidAskPayload {
    pub code: String,
    pub datetime: String,
    pub bid_price: Vec<Decimal>,
    pub bid_volume: Vec<u64>,
    pub ask_price: Vec<Decimal>,
    pub ask_volume: Vec<u64>,
}

/// Order-state relay payload (`*ORDER` topics).
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRelayPayload {
    pub operation: RelayOperationPayload,
    pub order: RelayOrderPayload,
    #[serde(default)]
    pub status: RelayStatusPayload,
    pub contract: RelayContractPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayOperationPayload {
    /// `"New"`, `"Cancel"`, `"UpdateQty"` or `"UpdatePrice"`.
    pub op_type: String,
    /// `"00"` on success.
    pub op_code: String,
    #[serde(default)]
    pub op_msg: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayOrderPayload {
    pub id: String,
    pub seqno: String,
    #[serde(default)]
    pub ordno: String,
    pub account: AccountKey,
    pub action: Action,
    pub price: Decimal,
    pub quantity: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayStatusPayload {
    #[serde(default)]
    pub exchange_ts: Option<f64>,
    #[serde(default)]
    pub modified_price: Option<Decimal>,
    #[serde(default)]
    pub cancel_quantity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayContractPayload {
    pub code: String,
}

/// Fill relay payload (`*DEAL` topics).
#[derive(Debug, Clone, Deserialize)]
pub struct DealRelayPayload {
    pub trade_id: String,
    pub seqno: String,
    #[serde(default)]
    pub ordno: String,
    /// Exchange sequence of this fill.
    pub exchange_seq: String,
    pub broker_id: String,
    pub account_id: String,
    pub action: Action,
    pub code: String,
    pub price: Decimal,
    pub quantity: u64,
    /// Epoch seconds, possibly fractional.
    pub ts: f64,
}
