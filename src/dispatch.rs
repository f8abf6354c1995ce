//! Delivers broker callbacks to the gateway on two independent streams.
//!
//! Market data runs on an async task. Relay events run on tokio's blocking
//! pool, one at a time, because resolving a sequence number may sleep
//! before its retry; a slow relay event never holds up ticks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broker::decode::{decode_bidask, decode_relay, decode_tick};
use crate::broker::payload::{BidAskPayload, TickPayload};
use crate::broker::BrokerEvent;
use crate::gateway::SinopacGateway;

/// Sending half of the dispatcher. Cheap to clone; one per callback
/// source.
#[derive(Clone)]
pub struct Dispatcher {
    market_tx: mpsc::UnboundedSender<BrokerEvent>,
    relay_tx: mpsc::UnboundedSender<BrokerEvent>,
}

/// Worker tasks draining the two streams.
pub struct DispatchWorkers {
    market: JoinHandle<()>,
    relay: JoinHandle<()>,
}

impl DispatchWorkers {
    /// Waits until both streams are drained. Every [`Dispatcher`] clone
    /// must be dropped first.
    pub async fn join(self) {
        if let Err(e) = self.market.await {
            warn!(error = %e, "Market data worker failed");
        }
        if let Err(e) = self.relay.await {
            warn!(error = %e, "Relay worker failed");
        }
    }
}

/// Starts both workers. Must be called inside a tokio runtime.
pub fn spawn(gateway: Arc<SinopacGateway>) -> (Dispatcher, DispatchWorkers) {
    let (market_tx, mut market_rx) = mpsc::unbounded_channel::<BrokerEvent>();
    let (relay_tx, mut relay_rx) = mpsc::unbounded_channel::<BrokerEvent>();

    let market_gateway = Arc::clone(&gateway);
    let market = tokio::spawn(async move {
        while let Some(event) = market_rx.recv().await {
            market_gateway.handle_event(event);
        }
        debug!("Market data stream closed");
    });

    let relay = tokio::task::spawn_blocking(move || {
        while let Some(event) = relay_rx.blocking_recv() {
            gateway.handle_event(event);
        }
        debug!("Relay stream closed");
    });

    info!("Dispatcher started");
    (Dispatcher { market_tx, relay_tx }, DispatchWorkers { market, relay })
}

impl Dispatcher {
    /// Routes a decoded event to its stream.
    pub fn send(&self, event: BrokerEvent) {
        let tx = if event.is_relay() {
            &self.relay_tx
        } else {
            &self.market_tx
        };
        if tx.send(event).is_err() {
            warn!("Dispatch worker stopped, dropping event");
        }
    }

    /// Trade-tick callback.
    pub fn on_tick(&self, payload: TickPayload) {
        match decode_tick(payload) {
            Ok(tick) => self.send(BrokerEvent::TradeTick(tick)),
            Err(e) => warn!(error = %e, "Dropping malformed tick"),
        }
    }

    /// Book-tick callback.
    pub fn on_bidask(&self, payload: BidAskPayload) {
        match decode_bidask(payload) {
            Ok(tick) => self.send(BrokerEvent::BookTick(tick)),
            Err(e) => warn!(error = %e, "Dropping malformed book tick"),
        }
    }

    /// Relay callback.
    pub fn on_relay(&self, topic: &str, payload: serde_json::Value) {
        match decode_relay(topic, payload) {
            Ok(event) => self.send(event),
            Err(e) => warn!(topic, error = %e, "Dropping relay message"),
        }
    }
}
