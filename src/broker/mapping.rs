//! Fixed translation tables between broker enums and domain enums.

use super::types::{Action, BrokerStatus, OcType, PriceType, TimeInForce};
use crate::models::{Direction, Offset, OrderKind, OrderStatus};

pub fn direction_from_action(action: Action) -> Direction {
    match action {
        Action::Buy => Direction::Buy,
        Action::Sell => Direction::Sell,
    }
}

pub fn action_from_direction(direction: Direction) -> Action {
    match direction {
        Direction::Buy => Action::Buy,
        Direction::Sell => Action::Sell,
    }
}

/// Broker (price type, time-in-force) pair for an order kind, or `None` if
/// the broker has no equivalent.
pub fn order_kind_to_broker(kind: OrderKind) -> Option<(PriceType, TimeInForce)> {
    match kind {
        OrderKind::Limit => Some((PriceType::Lmt, TimeInForce::Rod)),
        OrderKind::Market => Some((PriceType::Mkt, TimeInForce::Ioc)),
        OrderKind::Fak => Some((PriceType::Lmt, TimeInForce::Ioc)),
        OrderKind::Fok => Some((PriceType::Lmt, TimeInForce::Fok)),
        OrderKind::Stop => None,
    }
}

/// Reverse of [`order_kind_to_broker`]. Pairs the table does not produce
/// read as limit orders.
pub fn order_kind_from_broker(price_type: PriceType, order_type: TimeInForce) -> OrderKind {
    match (price_type, order_type) {
        (PriceType::Mkt | PriceType::Mkp, _) => OrderKind::Market,
        (PriceType::Lmt, TimeInForce::Ioc) => OrderKind::Fak,
        (PriceType::Lmt, TimeInForce::Fok) => OrderKind::Fok,
        (PriceType::Lmt, TimeInForce::Rod) => OrderKind::Limit,
    }
}

/// Broker open/close type for an offset, or `None` if unsupported.
pub fn offset_to_octype(offset: Offset) -> Option<OcType> {
    match offset {
        Offset::None => Some(OcType::Auto),
        Offset::Open => Some(OcType::New),
        Offset::Close => Some(OcType::Cover),
        Offset::CloseToday => Some(OcType::DayTrade),
        Offset::CloseYesterday => None,
    }
}

pub fn offset_from_octype(octype: OcType) -> Offset {
    match octype {
        OcType::Auto => Offset::None,
        OcType::New => Offset::Open,
        OcType::Cover => Offset::Close,
        OcType::DayTrade => Offset::CloseToday,
    }
}

pub fn status_from_broker(status: BrokerStatus) -> OrderStatus {
    match status {
        BrokerStatus::Cancelled => OrderStatus::Cancelled,
        BrokerStatus::Failed => OrderStatus::Rejected,
        BrokerStatus::Filled => OrderStatus::AllTraded,
        BrokerStatus::PartFilled => OrderStatus::PartTraded,
        BrokerStatus::Submitted => OrderStatus::NotTraded,
        BrokerStatus::PreSubmitted | BrokerStatus::PendingSubmit | BrokerStatus::Inactive => {
            OrderStatus::Submitting
        }
    }
}

/// Parses the `"B"`/`"S"` side column of futures position rows.
pub fn direction_from_code(code: &str) -> Option<Direction> {
    match code.trim() {
        "B" => Some(Direction::Buy),
        "S" => Some(Direction::Sell),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_table() {
        assert_eq!(
            order_kind_to_broker(OrderKind::Limit),
            Some((PriceType::Lmt, TimeInForce::Rod))
        );
        assert_eq!(
            order_kind_to_broker(OrderKind::Market),
            Some((PriceType::Mkt, TimeInForce::Ioc))
        );
        assert_eq!(
            order_kind_to_broker(OrderKind::Fak),
            Some((PriceType::Lmt, TimeInForce::Ioc))
        );
        assert_eq!(
            order_kind_to_broker(OrderKind::Fok),
            Some((PriceType::Lmt, TimeInForce::Fok))
        );
        assert_eq!(order_kind_to_broker(OrderKind::Stop), None);
    }

    #[test]
    fn kind_table_reverses() {
        for kind in [OrderKind::Limit, OrderKind::Market, OrderKind::Fak, OrderKind::Fok] {
            let (price_type, order_type) = order_kind_to_broker(kind).unwrap();
            assert_eq!(order_kind_from_broker(price_type, order_type), kind);
        }
    }

    #[test]
    fn offset_table() {
        assert_eq!(offset_to_octype(Offset::None), Some(OcType::Auto));
        assert_eq!(offset_to_octype(Offset::Open), Some(OcType::New));
        assert_eq!(offset_to_octype(Offset::Close), Some(OcType::Cover));
        assert_eq!(offset_to_octype(Offset::CloseToday), Some(OcType::DayTrade));
        assert_eq!(offset_to_octype(Offset::CloseYesterday), None);
    }

    #[test]
    fn status_table() {
        use BrokerStatus::*;
        let expected = [
            (Cancelled, OrderStatus::Cancelled),
            (Failed, OrderStatus::Rejected),
            (Filled, OrderStatus::AllTraded),
            (PartFilled, OrderStatus::PartTraded),
            (PreSubmitted, OrderStatus::Submitting),
            (Submitted, OrderStatus::NotTraded),
            (PendingSubmit, OrderStatus::Submitting),
            (Inactive, OrderStatus::Submitting),
        ];
        for (broker, status) in expected {
            assert_eq!(status_from_broker(broker), status, "{broker:?}");
        }
    }

    #[test]
    fn futures_side_codes() {
        assert_eq!(direction_from_code("B"), Some(Direction::Buy));
        assert_eq!(direction_from_code("S "), Some(Direction::Sell));
        assert_eq!(direction_from_code(""), None);
    }
}
