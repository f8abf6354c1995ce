mod common;

use rust_decimal_macros::dec;

use sinopac_gateway::broker::paper::SessionCall;
use sinopac_gateway::broker::{
    BrokerEvent, BrokerSession, BrokerTrade, PaperSession, RelayDealEvent, RelayOperation,
    RelayOrderEvent,
};
use sinopac_gateway::models::{CancelRequest, Direction, OrderRequest, OrderStatus};

use common::{Harness, trade_handle};

fn buy(symbol: &str, volume: u64) -> OrderRequest {
    OrderRequest::limit(symbol, Direction::Buy, dec!(580), volume)
}

/// Builds a successful relay event for an order the paper session holds.
fn relay_for(harness: &Harness, order_id: &str, operation: RelayOperation) -> RelayOrderEvent {
    let handle = harness
        .session
        .list_trades()
        .into_iter()
        .find(|t| t.order.id == order_id)
        .unwrap();
    RelayOrderEvent {
        account: handle.order.account.clone(),
        seqno: handle.order.seqno.clone(),
        order_id: order_id.to_string(),
        code: handle.contract.code.clone(),
        operation,
        success: true,
        message: String::new(),
        cancel_quantity: 0,
        modified_price: None,
        exchange_time: None,
    }
}

#[test]
fn buy_100_then_partial_fill_40() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 100));
    assert!(!order_id.is_empty());
    assert_eq!(
        h.gateway.ledger().order(&order_id).unwrap().status,
        OrderStatus::Submitting
    );

    h.pump();
    let order = h.gateway.ledger().order(&order_id).unwrap();
    assert_eq!(order.status, OrderStatus::NotTraded);

    let deal = h.session.fill(&order_id, 40, dec!(580)).unwrap();
    h.gateway.handle_event(BrokerEvent::RelayDeal(deal));

    let order = h.gateway.ledger().order(&order_id).unwrap();
    assert_eq!(order.traded, 40);
    assert_eq!(order.volume, 100);
    assert_eq!(order.status, OrderStatus::NotTraded);

    let trades = h.publisher.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].order_id, order_id);
    assert_eq!(trades[0].volume, 40);
    assert_eq!(h.gateway.ledger().trade(&trades[0].trade_id), Some(trades[0].clone()));
}

#[test]
fn reload_is_idempotent() {
    let h = Harness::connected(PaperSession::new().with_trade(trade_handle()));

    let order = h.gateway.ledger().order("9f1e2d3c").unwrap();
    assert_eq!(order.traded, 3);
    assert_eq!(order.status, OrderStatus::PartTraded);
    assert_eq!(h.gateway.ledger().trades().len(), 2);

    for _ in 0..3 {
        h.gateway.reload();
    }

    let order = h.gateway.ledger().order("9f1e2d3c").unwrap();
    assert_eq!(order.traded, 3);
    assert_eq!(h.gateway.ledger().trades().len(), 2);
    assert!(h.publisher.trades().is_empty(), "known trades republished");
    assert_eq!(h.publisher.orders().len(), 3);
}

#[test]
fn fills_sum_once_across_reloads() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 100));
    h.pump();

    for volume in [10, 20, 30] {
        let deal = h.session.fill(&order_id, volume, dec!(580)).unwrap();
        h.gateway.handle_event(BrokerEvent::RelayDeal(deal));
    }
    h.gateway.reload();
    h.gateway.reload();

    let order = h.gateway.ledger().order(&order_id).unwrap();
    assert_eq!(order.traded, 60);
    assert_eq!(h.gateway.ledger().trades().len(), 3);
    assert_eq!(h.publisher.trades().len(), 3);
}

#[test]
fn reload_then_relay_counts_once() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 5));
    h.pump();

    let deal = h.session.fill(&order_id, 2, dec!(579)).unwrap();
    h.gateway.reload();
    assert_eq!(h.gateway.ledger().order(&order_id).unwrap().traded, 2);
    assert_eq!(h.publisher.trades().len(), 1);

    h.gateway.handle_event(BrokerEvent::RelayDeal(deal));
    assert_eq!(h.gateway.ledger().order(&order_id).unwrap().traded, 2);
    assert_eq!(h.publisher.trades().len(), 1);
}

#[test]
fn duplicate_relay_deal_is_dropped() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 5));
    h.pump();

    let deal = h.session.fill(&order_id, 1, dec!(580)).unwrap();
    h.gateway.handle_event(BrokerEvent::RelayDeal(deal.clone()));
    h.publisher.clear();
    h.gateway.handle_event(BrokerEvent::RelayDeal(deal));

    assert_eq!(h.gateway.ledger().order(&order_id).unwrap().traded, 1);
    assert!(h.publisher.events().is_empty());
}

#[test]
fn update_qty_of_whole_order_cancels_it() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 10));
    h.pump();

    let event = RelayOrderEvent {
        cancel_quantity: 10,
        ..relay_for(&h, &order_id, RelayOperation::UpdateQty)
    };
    h.gateway.handle_event(BrokerEvent::RelayOrder(event));

    let order = h.gateway.ledger().order(&order_id).unwrap();
    assert_eq!(order.volume, 0);
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[test]
fn failed_new_rejects_order() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 10));
    h.session.drain_events();

    let event = RelayOrderEvent {
        success: false,
        message: "insufficient margin".to_string(),
        ..relay_for(&h, &order_id, RelayOperation::New)
    };
    h.gateway.handle_event(BrokerEvent::RelayOrder(event));

    let order = h.gateway.ledger().order(&order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reference, "insufficient margin");

    // A late success for the same operation cannot revive it.
    let late = relay_for(&h, &order_id, RelayOperation::New);
    h.gateway.handle_event(BrokerEvent::RelayOrder(late));
    assert_eq!(
        h.gateway.ledger().order(&order_id).unwrap().status,
        OrderStatus::Rejected
    );
}

#[test]
fn cancel_is_confirmed_by_relay() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 10));
    h.pump();

    h.gateway.cancel_order(&CancelRequest {
        order_id: order_id.clone(),
        symbol: "2330".to_string(),
    });
    assert_eq!(
        h.gateway.ledger().order(&order_id).unwrap().status,
        OrderStatus::NotTraded
    );

    h.pump();
    assert_eq!(
        h.gateway.ledger().order(&order_id).unwrap().status,
        OrderStatus::Cancelled
    );
}

#[test]
fn relay_for_unknown_order_materializes_it() {
    let h = Harness::new(PaperSession::new().with_trade(trade_handle()));
    let handle = trade_handle();

    h.gateway.handle_event(BrokerEvent::RelayOrder(RelayOrderEvent {
        account: handle.order.account.clone(),
        seqno: handle.order.seqno.clone(),
        order_id: handle.order.id.clone(),
        code: handle.contract.code.clone(),
        operation: RelayOperation::UpdatePrice,
        success: true,
        message: String::new(),
        cancel_quantity: 0,
        modified_price: Some(dec!(17500)),
        exchange_time: None,
    }));

    let order = h.gateway.ledger().order("9f1e2d3c").unwrap();
    assert_eq!(order.symbol, "TXFA4");
    assert_eq!(order.direction, Direction::Sell);
    assert_eq!(order.price, dec!(17500));
    assert_eq!(h.publisher.orders().len(), 1);
}

fn relay_for_handle(handle: &BrokerTrade, operation: RelayOperation) -> RelayOrderEvent {
    RelayOrderEvent {
        account: handle.order.account.clone(),
        seqno: handle.order.seqno.clone(),
        order_id: handle.order.id.clone(),
        code: handle.contract.code.clone(),
        operation,
        success: true,
        message: String::new(),
        cancel_quantity: 0,
        modified_price: None,
        exchange_time: None,
    }
}

fn deal_for_handle(handle: &BrokerTrade, deal_id: &str, volume: u64) -> RelayDealEvent {
    RelayDealEvent {
        account: handle.order.account.clone(),
        seqno: handle.order.seqno.clone(),
        deal_id: deal_id.to_string(),
        code: handle.contract.code.clone(),
        direction: Direction::Sell,
        price: dec!(17505),
        volume,
        datetime: chrono::Utc::now(),
    }
}

#[test]
fn materialized_order_carries_handle_fills() {
    let h = Harness::new(PaperSession::new().with_trade(trade_handle()));
    let handle = trade_handle();

    h.gateway.handle_event(BrokerEvent::RelayOrder(relay_for_handle(
        &handle,
        RelayOperation::UpdatePrice,
    )));
    let order = h.gateway.ledger().order("9f1e2d3c").unwrap();
    assert_eq!(order.status, OrderStatus::PartTraded);
    assert_eq!(order.traded, 3);
    assert_eq!(h.publisher.trades().len(), 2);

    // The relay copy of a fill already on the handle.
    h.publisher.clear();
    h.gateway
        .handle_event(BrokerEvent::RelayDeal(deal_for_handle(&handle, "000101", 1)));
    assert_eq!(h.gateway.ledger().order("9f1e2d3c").unwrap().traded, 3);
    assert!(h.publisher.events().is_empty());

    h.gateway.reload();
    assert_eq!(h.gateway.ledger().order("9f1e2d3c").unwrap().traded, 3);
    assert!(h.publisher.trades().is_empty());
}

#[test]
fn deal_seen_before_materialize_is_published_once() {
    let h = Harness::new(PaperSession::new().with_trade(trade_handle()));
    let handle = trade_handle();
    let deal = deal_for_handle(&handle, "000103", 1);

    h.gateway.handle_event(BrokerEvent::RelayDeal(deal.clone()));
    h.gateway.handle_event(BrokerEvent::RelayOrder(relay_for_handle(
        &handle,
        RelayOperation::New,
    )));
    h.gateway.handle_event(BrokerEvent::RelayDeal(deal));

    let published: Vec<_> = h
        .publisher
        .trades()
        .into_iter()
        .filter(|t| t.trade_id == "000103")
        .collect();
    assert_eq!(published.len(), 1);
    // Two fills from the handle plus the relay deal.
    assert_eq!(h.gateway.ledger().order("9f1e2d3c").unwrap().traded, 4);
    assert_eq!(h.gateway.ledger().trades().len(), 3);
}

#[test]
fn reload_restores_volume_of_order_cancelled_by_update_qty() {
    let h = Harness::connected(PaperSession::new());
    let order_id = h.gateway.send_order(&buy("2330", 10));
    h.pump();

    h.gateway.cancel_order(&CancelRequest {
        order_id: order_id.clone(),
        symbol: "2330".to_string(),
    });
    h.session.drain_events();
    let event = RelayOrderEvent {
        cancel_quantity: 10,
        ..relay_for(&h, &order_id, RelayOperation::UpdateQty)
    };
    h.gateway.handle_event(BrokerEvent::RelayOrder(event));
    assert_eq!(h.gateway.ledger().order(&order_id).unwrap().volume, 0);

    // A cancelled handle reports its original quantity.
    h.gateway.reload();
    let order = h.gateway.ledger().order(&order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.volume, 10);
    assert_eq!(order.traded, 0);
}

#[test]
fn deal_for_untracked_order_publishes_trade_only() {
    let h = Harness::new(PaperSession::new().with_trade(trade_handle()));
    let handle = trade_handle();
    let deal = RelayDealEvent {
        account: handle.order.account.clone(),
        seqno: handle.order.seqno.clone(),
        deal_id: "000103".to_string(),
        code: "TXFA4".to_string(),
        direction: Direction::Sell,
        price: dec!(17505),
        volume: 1,
        datetime: chrono::Utc::now(),
    };
    h.gateway.handle_event(BrokerEvent::RelayDeal(deal));

    assert_eq!(h.publisher.trades().len(), 1);
    assert_eq!(h.publisher.trades()[0].order_id, "9f1e2d3c");
    assert!(h.publisher.orders().is_empty());
    assert!(h.gateway.ledger().order("9f1e2d3c").is_none());
}

#[test]
fn unresolved_deal_is_dropped_after_one_retry() {
    let h = Harness::new(PaperSession::new());
    let handle = trade_handle();
    let deal = RelayDealEvent {
        account: handle.order.account.clone(),
        seqno: "999999".to_string(),
        deal_id: "000200".to_string(),
        code: "TXFA4".to_string(),
        direction: Direction::Sell,
        price: dec!(17505),
        volume: 1,
        datetime: chrono::Utc::now(),
    };
    h.gateway.handle_event(BrokerEvent::RelayDeal(deal));

    assert!(h.publisher.events().is_empty());
    let lookups = h
        .session
        .count_calls(|c| matches!(c, SessionCall::TradeBySeqno(_)));
    assert_eq!(lookups, 2);
}
