//! Order and trade ledger.
//!
//! Orders enter the ledger from three sources: the placement
//! acknowledgement, relay events, and a full reload from the session. Each
//! order remembers the deal ids it has already counted, so a fill reported
//! by both the relay stream and a reload increments `traded` once. Trades
//! are keyed by deal id and published the first time a deal is seen,
//! whichever path reports it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::DateTime;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use crate::broker::mapping::{
    direction_from_action, offset_from_octype, order_kind_from_broker, status_from_broker,
};
use crate::broker::types::TradeDeal;
use crate::broker::{BrokerSession, BrokerTrade, RelayDealEvent, RelayOperation, RelayOrderEvent};
use crate::models::{Order, OrderStatus, Trade};
use crate::publish::{GatewayEvent, Publisher};
use crate::resolver::IdResolver;

/// An order plus the deal ids already counted into its `traded` volume.
#[derive(Debug, Clone)]
struct TrackedOrder {
    order: Order,
    deals: HashSet<String>,
}

impl TrackedOrder {
    /// Builds the order from a broker handle with every distinct deal on
    /// the handle counted once.
    fn from_handle(handle: &BrokerTrade) -> Self {
        let mut order = order_from_handle(handle);
        let mut deals = HashSet::new();
        for deal in &handle.status.deals {
            if deals.insert(deal.seq.clone()) {
                order.traded += deal.quantity;
            }
        }
        Self { order, deals }
    }
}

pub struct Ledger {
    orders: DashMap<String, TrackedOrder>,
    trades: DashMap<String, Trade>,
    session: Arc<dyn BrokerSession>,
    resolver: Arc<IdResolver>,
    publisher: Arc<dyn Publisher>,
}

impl Ledger {
    pub fn new(
        session: Arc<dyn BrokerSession>,
        resolver: Arc<IdResolver>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            orders: DashMap::new(),
            trades: DashMap::new(),
            session,
            resolver,
            publisher,
        }
    }

    /// Records the handle the broker returned for a placement.
    pub fn on_submit_ack(&self, trade: &BrokerTrade) -> Order {
        self.resolver.cache(trade);
        let fresh = order_from_handle(trade);

        let order = {
            let mut entry = self
                .orders
                .entry(fresh.order_id.clone())
                .or_insert_with(|| TrackedOrder {
                    order: fresh.clone(),
                    deals: HashSet::new(),
                });
            // A relay event may have overtaken the acknowledgement.
            if entry.order.status == OrderStatus::Submitting {
                entry.order.status = fresh.status;
                entry.order.price = fresh.price;
                entry.order.volume = fresh.volume;
            } else {
                debug!(order_id = fresh.order_id, status = ?entry.order.status, "Keeping relay status");
            }
            entry.order.clone()
        };
        self.publisher.publish(GatewayEvent::Order(order.clone()));
        order
    }

    /// Applies an order-state relay event.
    pub fn on_relay_order(&self, event: &RelayOrderEvent) {
        let fresh_trades = if self.orders.contains_key(&event.order_id) {
            Vec::new()
        } else {
            match self.materialize(event) {
                Some(trades) => trades,
                None => return,
            }
        };

        let order = {
            let Some(mut tracked) = self.orders.get_mut(&event.order_id) else {
                return;
            };
            apply_relay(&mut tracked.order, event);
            tracked.order.clone()
        };
        self.publisher.publish(GatewayEvent::Order(order));
        for trade in fresh_trades {
            self.publisher.publish(GatewayEvent::Trade(trade));
        }
    }

    /// Inserts an order for a relay event about an order placed outside
    /// this ledger, with the fills its handle already carries. Returns the
    /// trades not seen before, or `None` if the handle cannot be found.
    fn materialize(&self, event: &RelayOrderEvent) -> Option<Vec<Trade>> {
        match self.resolver.lookup(&event.account, &event.seqno) {
            Ok(handle) => {
                let tracked = TrackedOrder::from_handle(&handle);
                let fresh_trades = self.record_handle_trades(&handle, &tracked.order);
                self.orders
                    .entry(tracked.order.order_id.clone())
                    .or_insert(tracked);
                Some(fresh_trades)
            }
            Err(e) => {
                warn!(
                    order_id = event.order_id,
                    seqno = event.seqno,
                    error = %e,
                    "Dropping relay order event for unknown order"
                );
                None
            }
        }
    }

    /// Applies a fill reported on the relay stream.
    pub fn on_deal(&self, event: &RelayDealEvent) {
        let order_id = match self.resolver.lookup(&event.account, &event.seqno) {
            Ok(trade) => trade.order.id,
            Err(e) => {
                warn!(
                    deal_id = event.deal_id,
                    seqno = event.seqno,
                    error = %e,
                    "Dropping deal for unresolved order"
                );
                return;
            }
        };

        let trade = Trade {
            trade_id: event.deal_id.clone(),
            order_id: order_id.clone(),
            symbol: event.code.clone(),
            direction: event.direction,
            price: event.price,
            volume: event.volume,
            datetime: event.datetime,
        };

        let updated = match self.orders.get_mut(&order_id) {
            Some(mut tracked) => {
                if !tracked.deals.insert(event.deal_id.clone()) {
                    debug!(deal_id = event.deal_id, order_id, "Duplicate deal dropped");
                    return;
                }
                tracked.order.traded += event.volume;
                Some(tracked.order.clone())
            }
            None => {
                if self.trades.contains_key(&event.deal_id) {
                    debug!(deal_id = event.deal_id, order_id, "Duplicate deal dropped");
                    return;
                }
                warn!(deal_id = event.deal_id, order_id, "Deal for untracked order");
                None
            }
        };

        // Already stored if it first arrived while its order was untracked.
        let fresh = match self.trades.entry(trade.trade_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(trade.clone());
                true
            }
        };
        if fresh {
            self.publisher.publish(GatewayEvent::Trade(trade));
        }
        if let Some(order) = updated {
            self.publisher.publish(GatewayEvent::Order(order));
        }
    }

    /// Rebuilds every order from the session's trade handles.
    ///
    /// Each order's `traded` becomes the sum of its distinct deals. Every
    /// order is published; only trades the ledger had not seen before are.
    ///
    /// # Errors
    ///
    /// Returns the session's error if the status refresh fails.
    pub fn reload(&self) -> crate::Result<usize> {
        self.session.update_status(None)?;
        let handles = self.session.list_trades();

        for handle in &handles {
            self.resolver.cache(handle);
            let tracked = TrackedOrder::from_handle(handle);
            let fresh_trades = self.record_handle_trades(handle, &tracked.order);
            let order = tracked.order.clone();

            self.orders.insert(order.order_id.clone(), tracked);
            self.publisher.publish(GatewayEvent::Order(order));
            for trade in fresh_trades {
                self.publisher.publish(GatewayEvent::Trade(trade));
            }
        }

        info!(orders = handles.len(), "Ledger reloaded");
        Ok(handles.len())
    }

    /// Stores the handle's deals the ledger has not seen yet and returns
    /// them as trades, in handle order.
    fn record_handle_trades(&self, handle: &BrokerTrade, order: &Order) -> Vec<Trade> {
        let mut fresh = Vec::new();
        for deal in &handle.status.deals {
            if let Entry::Vacant(slot) = self.trades.entry(deal.seq.clone()) {
                let trade = trade_from_deal(handle, order, deal);
                slot.insert(trade.clone());
                fresh.push(trade);
            }
        }
        fresh
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|t| t.order.clone())
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.iter().map(|t| t.order.clone()).collect()
    }

    pub fn trade(&self, trade_id: &str) -> Option<Trade> {
        self.trades.get(trade_id).map(|t| t.clone())
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.trades.iter().map(|t| t.clone()).collect()
    }
}

/// Builds a ledger order from a broker trade handle. `traded` starts at 0;
/// see [`TrackedOrder::from_handle`].
fn order_from_handle(trade: &BrokerTrade) -> Order {
    let status = status_from_broker(trade.status.status);
    let volume = if status == OrderStatus::Cancelled {
        trade.order.quantity
    } else {
        trade.order.quantity.saturating_sub(trade.status.cancel_quantity)
    };
    Order {
        order_id: trade.order.id.clone(),
        symbol: trade.contract.code.clone(),
        direction: direction_from_action(trade.order.action),
        kind: order_kind_from_broker(trade.order.price_type, trade.order.order_type),
        offset: offset_from_octype(trade.order.octype),
        price: trade.order.price,
        volume,
        traded: 0,
        status,
        reference: trade.status.msg.clone(),
        datetime: trade
            .status
            .order_ts
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
    }
}

fn trade_from_deal(handle: &BrokerTrade, order: &Order, deal: &TradeDeal) -> Trade {
    Trade {
        trade_id: deal.seq.clone(),
        order_id: order.order_id.clone(),
        symbol: handle.contract.code.clone(),
        direction: order.direction,
        price: deal.price,
        volume: deal.quantity,
        datetime: DateTime::from_timestamp(deal.ts, 0).unwrap_or_default(),
    }
}

/// Applies one relay event to `order`. Terminal orders keep their state;
/// only the reference text changes.
fn apply_relay(order: &mut Order, event: &RelayOrderEvent) {
    if !event.success {
        order.reference = event.message.clone();
    }
    if order.status.is_terminal() {
        debug!(
            order_id = order.order_id,
            status = ?order.status,
            operation = ?event.operation,
            "Relay event ignored for terminal order"
        );
        return;
    }

    if !event.success {
        if event.operation == RelayOperation::New {
            order.status = OrderStatus::Rejected;
        } else {
            warn!(
                order_id = order.order_id,
                operation = ?event.operation,
                message = event.message,
                "Relay operation failed"
            );
        }
        return;
    }

    match &event.operation {
        RelayOperation::New => {
            if order.status == OrderStatus::Submitting {
                order.status = OrderStatus::NotTraded;
            }
            if order.datetime.is_none() {
                order.datetime = event.exchange_time;
            }
        }
        RelayOperation::Cancel => order.status = OrderStatus::Cancelled,
        RelayOperation::UpdateQty => {
            order.volume = order.volume.saturating_sub(event.cancel_quantity);
            if order.volume == 0 {
                order.status = OrderStatus::Cancelled;
            }
        }
        RelayOperation::UpdatePrice => {
            if let Some(price) = event.modified_price {
                order.price = price;
            }
        }
        RelayOperation::Other(op) => {
            debug!(order_id = order.order_id, operation = op, "Unhandled relay operation");
        }
    }
}
