//! Outbound records delivered to the host platform.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::{ContractRef, Order, Position, Quote, Trade};

/// A record published to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum GatewayEvent {
    Quote(Quote),
    Order(Order),
    Trade(Trade),
    Position(Position),
    Contract(ContractRef),
    /// Human-readable status line for the host's log window.
    Log(String),
}

/// Sink for published records. Called from every callback thread.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: GatewayEvent);

    /// Publishes a status line and mirrors it to the tracing log.
    fn write_log(&self, message: String) {
        info!(message = %message, "Gateway log");
        self.publish(GatewayEvent::Log(message));
    }
}

/// Forwards records over an unbounded tokio channel.
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ChannelPublisher {
    /// Creates a publisher and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&self, event: GatewayEvent) {
        if self.tx.send(event).is_err() {
            debug!("Publish channel closed, dropping event");
        }
    }
}

/// Keeps every published record in memory.
#[derive(Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<GatewayEvent>>,
}

impl MemoryPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GatewayEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn orders(&self) -> Vec<Order> {
        self.collect(|e| match e {
            GatewayEvent::Order(o) => Some(o.clone()),
            _ => None,
        })
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.collect(|e| match e {
            GatewayEvent::Trade(t) => Some(t.clone()),
            _ => None,
        })
    }

    pub fn quotes(&self) -> Vec<Quote> {
        self.collect(|e| match e {
            GatewayEvent::Quote(q) => Some(q.clone()),
            _ => None,
        })
    }

    pub fn positions(&self) -> Vec<Position> {
        self.collect(|e| match e {
            GatewayEvent::Position(p) => Some(p.clone()),
            _ => None,
        })
    }

    pub fn contracts(&self) -> Vec<ContractRef> {
        self.collect(|e| match e {
            GatewayEvent::Contract(c) => Some(c.clone()),
            _ => None,
        })
    }

    pub fn logs(&self) -> Vec<String> {
        self.collect(|e| match e {
            GatewayEvent::Log(line) => Some(line.clone()),
            _ => None,
        })
    }

    fn collect<T>(&self, pick: impl Fn(&GatewayEvent) -> Option<T>) -> Vec<T> {
        self.lock().iter().filter_map(pick).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GatewayEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&self, event: GatewayEvent) {
        self.lock().push(event);
    }
}
