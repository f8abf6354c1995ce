//! Quote cache: merges trade ticks, book ticks and snapshots into one
//! [`Quote`] per instrument.
//!
//! The trade and book streams arrive on different threads with no ordering
//! between them. Each writer touches only its own field group under the
//! entry's lock, so neither can erase what the other wrote.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;

use crate::broker::{BookTick, RawSnapshot, TradeTick};
use crate::models::{ContractRef, Quote, from_local_epoch_nanos};
use crate::publish::{GatewayEvent, Publisher};

pub struct QuoteCache {
    quotes: DashMap<String, Quote>,
    publisher: Arc<dyn Publisher>,
}

impl QuoteCache {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            quotes: DashMap::new(),
            publisher,
        }
    }

    /// Overwrites the trade-side fields and publishes a copy.
    pub fn apply_trade_tick(&self, contract: &ContractRef, tick: &TradeTick) {
        let snapshot = {
            let mut quote = self
                .quotes
                .entry(contract.code.clone())
                .or_insert_with(|| Quote::new(contract, tick.datetime));
            quote.datetime = tick.datetime;
            quote.localtime = Utc::now();
            quote.indicative = tick.indicative;
            quote.last_price = tick.close;
            quote.volume = tick.volume;
            quote.open = tick.open;
            quote.high = tick.high;
            quote.low = tick.low;
            quote.pre_close = tick.close - tick.price_chg;
            quote.limit_up = contract.limit_up;
            quote.limit_down = contract.limit_down;
            quote.clone()
        };
        self.publisher.publish(GatewayEvent::Quote(snapshot));
    }

    /// Overwrites the five bid and ask levels and publishes a copy.
    pub fn apply_book_tick(&self, contract: &ContractRef, tick: &BookTick) {
        let snapshot = {
            let mut quote = self
                .quotes
                .entry(contract.code.clone())
                .or_insert_with(|| Quote::new(contract, tick.datetime));
            quote.localtime = Utc::now();
            quote.bid_price = tick.bid_price;
            quote.bid_volume = tick.bid_volume;
            quote.ask_price = tick.ask_price;
            quote.ask_volume = tick.ask_volume;
            quote.clone()
        };
        self.publisher.publish(GatewayEvent::Quote(snapshot));
    }

    /// Seeds or refreshes a quote from a snapshot query.
    ///
    /// A new quote takes its datetime from the snapshot; an existing one
    /// keeps its datetime and identity. Only the best bid and ask are
    /// written.
    pub fn apply_snapshot(&self, contract: &ContractRef, snapshot: &RawSnapshot) {
        let published = {
            let mut quote = self
                .quotes
                .entry(contract.code.clone())
                .or_insert_with(|| Quote::new(contract, from_local_epoch_nanos(snapshot.ts)));
            quote.localtime = Utc::now();
            quote.volume = snapshot.total_volume;
            quote.last_price = snapshot.close;
            quote.open = snapshot.open;
            quote.high = snapshot.high;
            quote.low = snapshot.low;
            quote.pre_close = contract.reference_price;
            quote.limit_up = contract.limit_up;
            quote.limit_down = contract.limit_down;
            quote.bid_price[0] = snapshot.buy_price;
            quote.bid_volume[0] = snapshot.buy_volume;
            quote.ask_price[0] = snapshot.sell_price;
            quote.ask_volume[0] = snapshot.sell_volume;
            quote.clone()
        };
        self.publisher.publish(GatewayEvent::Quote(published));
    }

    /// Returns a copy of the cached quote for `code`.
    pub fn get(&self, code: &str) -> Option<Quote> {
        self.quotes.get(code).map(|q| q.clone())
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
