//! Decodes raw callback payloads into [`BrokerEvent`]s.
//!
//! Relay callbacks arrive as `(topic, JSON)` pairs; the topic names the
//! account class and whether the payload is an order-state change or a fill.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use super::event::{BookTick, BrokerEvent, RelayDealEvent, RelayOperation, RelayOrderEvent, TradeTick};
use super::mapping::direction_from_action;
use super::payload::{BidAskPayload, DealRelayPayload, OrderRelayPayload, TickPayload};
use super::types::AccountKey;
use crate::GatewayError;
use crate::models::{BOOK_DEPTH, from_exchange_local};

/// Relay `op_code` reported for a successful operation.
pub const OP_CODE_SUCCESS: &str = "00";

const TICK_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Which half of the relay stream a topic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Order,
    Deal,
}

/// Classifies a relay topic, case-insensitively.
pub fn relay_kind(topic: &str) -> Option<RelayKind> {
    match topic.to_ascii_uppercase().as_str() {
        "FORDER" | "SORDER" | "TORDER" | "FUTURESORDER" | "STOCKORDER" => Some(RelayKind::Order),
        "FDEAL" | "SDEAL" | "TDEAL" | "FUTURESDEAL" | "STOCKDEAL" => Some(RelayKind::Deal),
        _ => None,
    }
}

/// Parses a naive exchange-local tick datetime.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if the string matches no tick layout.
pub fn parse_tick_datetime(text: &str) -> crate::Result<DateTime<Utc>> {
    TICK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
        .map(from_exchange_local)
        .ok_or_else(|| GatewayError::Decode(format!("tick datetime {text:?}")))
}

/// Decodes a trade tick.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if the datetime cannot be parsed.
pub fn decode_tick(payload: TickPayload) -> crate::Result<TradeTick> {
    Ok(TradeTick {
        datetime: parse_tick_datetime(&payload.datetime)?,
        volume: payload.total_volume.unwrap_or(payload.volume),
        indicative: payload.simtrade == 1,
        code: payload.code,
        open: payload.open,
        high: payload.high,
        low: payload.low,
        close: payload.close,
        price_chg: payload.price_chg,
    })
}

/// Decodes a book tick. Levels beyond the payload's length are zero.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if the datetime cannot be parsed.
pub fn decode_bidask(payload: BidAskPayload) -> crate::Result<BookTick> {
    Ok(BookTick {
        datetime: parse_tick_datetime(&payload.datetime)?,
        bid_price: levels(&payload.bid_price),
        bid_volume: levels(&payload.bid_volume),
        ask_price: levels(&payload.ask_price),
        ask_volume: levels(&payload.ask_volume),
        code: payload.code,
    })
}

fn levels<T: Copy + Default>(values: &[T]) -> [T; BOOK_DEPTH] {
    let mut out = [T::default(); BOOK_DEPTH];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = *value;
    }
    out
}

/// Decodes a relay callback.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] for an unknown topic or a payload that
/// does not match the topic's shape.
pub fn decode_relay(topic: &str, payload: serde_json::Value) -> crate::Result<BrokerEvent> {
    match relay_kind(topic) {
        Some(RelayKind::Order) => {
            let raw: OrderRelayPayload = serde_json::from_value(payload)
                .map_err(|e| GatewayError::Decode(format!("{topic}: {e}")))?;
            Ok(BrokerEvent::RelayOrder(order_event(raw)))
        }
        Some(RelayKind::Deal) => {
            let raw: DealRelayPayload = serde_json::from_value(payload)
                .map_err(|e| GatewayError::Decode(format!("{topic}: {e}")))?;
            deal_event(raw).map(BrokerEvent::RelayDeal)
        }
        None => {
            debug!(topic, "Unrecognized relay topic");
            Err(GatewayError::Decode(format!("unknown relay topic {topic:?}")))
        }
    }
}

/// Converts fractional epoch seconds, rounded to the millisecond.
fn from_epoch_secs(ts: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis((ts * 1000.0).round() as i64)
}

fn order_event(raw: OrderRelayPayload) -> RelayOrderEvent {
    RelayOrderEvent {
        account: raw.order.account,
        seqno: raw.order.seqno,
        order_id: raw.order.id,
        code: raw.contract.code,
        operation: RelayOperation::parse(&raw.operation.op_type),
        success: raw.operation.op_code == OP_CODE_SUCCESS,
        message: raw.operation.op_msg,
        cancel_quantity: raw.status.cancel_quantity,
        modified_price: raw.status.modified_price.filter(|p| *p != Decimal::ZERO),
        exchange_time: raw.status.exchange_ts.and_then(from_epoch_secs),
    }
}

fn deal_event(raw: DealRelayPayload) -> crate::Result<RelayDealEvent> {
    let datetime = from_epoch_secs(raw.ts)
        .ok_or_else(|| GatewayError::Decode(format!("deal ts {}", raw.ts)))?;
    Ok(RelayDealEvent {
        account: AccountKey {
            broker_id: raw.broker_id,
            account_id: raw.account_id,
        },
        seqno: raw.seqno,
        deal_id: raw.exchange_seq,
        code: raw.code,
        direction: direction_from_action(raw.action),
        price: raw.price,
        volume: raw.quantity,
        datetime,
    })
}
