//! The gateway facade the host platform drives.
//!
//! Host-facing operations never fail: every error is logged through the
//! publisher's log channel and answered with a safe default (an empty
//! order id, an empty position or bar list).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dashmap::DashSet;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info, warn};

use crate::GatewayError;
use crate::broker::mapping::{
    action_from_direction, direction_from_action, direction_from_code, offset_to_octype,
    order_kind_to_broker,
};
use crate::broker::{
    AccountType, BrokerAccount, BrokerEvent, BrokerOrder, BrokerSession, BrokerTrade, Catalog,
    DateRange, QuoteStream, RawFuturesPosition, RawKBar, RawStockPosition,
};
use crate::config::{AccountSelection, GatewayConfig};
use crate::directory::ContractDirectory;
use crate::ledger::Ledger;
use crate::models::bar::{normalize_timestamp, resample};
use crate::models::{
    AccountClass, Bar, CancelRequest, ContractRef, Direction, HistoryRequest, Interval, Order,
    OrderRequest, Position,
};
use crate::publish::{GatewayEvent, Publisher};
use crate::quotes::QuoteCache;
use crate::resolver::IdResolver;

pub struct SinopacGateway {
    session: Arc<dyn BrokerSession>,
    publisher: Arc<dyn Publisher>,
    directory: Arc<ContractDirectory>,
    quotes: QuoteCache,
    resolver: Arc<IdResolver>,
    ledger: Ledger,
    subscribed: DashSet<String>,
    connected: AtomicBool,
}

impl SinopacGateway {
    pub fn new(
        session: Arc<dyn BrokerSession>,
        publisher: Arc<dyn Publisher>,
        retry_delay: std::time::Duration,
    ) -> Self {
        let resolver = Arc::new(IdResolver::new(Arc::clone(&session), retry_delay));
        Self {
            directory: Arc::new(ContractDirectory::new(Arc::clone(&publisher))),
            quotes: QuoteCache::new(Arc::clone(&publisher)),
            ledger: Ledger::new(Arc::clone(&session), Arc::clone(&resolver), Arc::clone(&publisher)),
            resolver,
            session,
            publisher,
            subscribed: DashSet::new(),
            connected: AtomicBool::new(false),
        }
    }

    /// Logs in, selects default accounts, activates the certificate and
    /// loads the current orders and positions.
    ///
    /// Returns `false` if login fails; the gateway then stays
    /// disconnected.
    pub fn connect(&self, config: &GatewayConfig) -> bool {
        let directory = Arc::clone(&self.directory);
        let login = self.session.login(
            &config.login.person_id,
            config.login.password.as_str(),
            config.simulation,
            Box::new(move |catalog: Catalog| directory.load_catalog(&catalog)),
        );
        let accounts = match login {
            Ok(accounts) => accounts,
            Err(e) => {
                self.publisher.write_log(format!("login failed: {e}"));
                return false;
            }
        };
        self.publisher
            .write_log(format!("login succeeded [{}]", config.login.person_id));
        for account in &accounts {
            self.publisher.write_log(format!(
                "account {:?} {}-{} {}",
                account.account_type, account.broker_id, account.account_id, account.username
            ));
        }

        self.select_default_accounts(&accounts, config.accounts);

        if let (Some(path), Some(password)) = (&config.login.ca_path, &config.login.ca_password) {
            match self
                .session
                .activate_ca(path, password.as_str(), &config.login.person_id)
            {
                Ok(()) => self
                    .publisher
                    .write_log(format!("certificate activated for {}", config.login.person_id)),
                Err(e) => self
                    .publisher
                    .write_log(format!("certificate activation failed: {e}")),
            }
        }

        self.connected.store(true, Ordering::SeqCst);
        self.reload();
        self.query_position();
        true
    }

    fn select_default_accounts(&self, accounts: &[BrokerAccount], selection: AccountSelection) {
        self.select_default(accounts, AccountType::Stock, "stock", selection.stock);
        self.select_default(accounts, AccountType::Futures, "futures", selection.futures);
    }

    /// Sets the default account of one class by its index within that
    /// class. Classes with a single account keep the broker's default.
    fn select_default(&self, accounts: &[BrokerAccount], class: AccountType, label: &str, index: usize) {
        let candidates: Vec<&BrokerAccount> =
            accounts.iter().filter(|a| a.account_type == class).collect();
        for (i, account) in candidates.iter().enumerate() {
            self.publisher.write_log(format!(
                "{label} account [{i}] {}-{} {}",
                account.broker_id, account.account_id, account.username
            ));
        }
        if candidates.len() < 2 {
            return;
        }

        let Some(account) = candidates.get(index) else {
            self.publisher.write_log(format!(
                "default {label} account index {index} out of range ({} accounts)",
                candidates.len()
            ));
            return;
        };
        match self.session.set_default_account(account) {
            Ok(()) => self.publisher.write_log(format!(
                "default {label} account [{index}] {}-{} {}",
                account.broker_id, account.account_id, account.username
            )),
            Err(e) => self
                .publisher
                .write_log(format!("setting default {label} account failed: {e}")),
        }
    }

    /// Indexes the contract catalog.
    pub fn on_catalog_ready(&self, catalog: &Catalog) {
        self.directory.load_catalog(catalog);
    }

    /// Seeds the quote from a snapshot and subscribes to its tick and book
    /// streams. Subscribing twice is a no-op.
    pub fn subscribe(&self, code: &str) {
        if !self.subscribed.insert(code.to_string()) {
            return;
        }
        let Some(contract) = self.directory.get(code) else {
            self.subscribed.remove(code);
            self.publisher
                .write_log(format!("subscribe: no such contract [{code}]"));
            return;
        };

        match self.session.snapshots(&[contract.code.clone()]) {
            Ok(snapshots) => {
                if let Some(snapshot) = snapshots.first() {
                    self.quotes.apply_snapshot(&contract, snapshot);
                }
            }
            Err(e) => warn!(code, error = %e, "Snapshot query failed"),
        }

        for stream in [QuoteStream::Tick, QuoteStream::BidAsk] {
            if let Err(e) = self.session.subscribe(&contract.code, stream) {
                self.subscribed.remove(code);
                self.publisher
                    .write_log(format!("subscribe {code} {stream:?} failed: {e}"));
                return;
            }
        }
        self.publisher
            .write_log(format!("subscribed {} {}", contract.code, contract.display_name));
    }

    /// Places an order and returns its broker order id, or an empty string
    /// if it was rejected before reaching the broker or the broker call
    /// failed.
    pub fn send_order(&self, request: &OrderRequest) -> String {
        match self.place(request) {
            Ok(order) => order.order_id,
            Err(e) => {
                self.publisher
                    .write_log(format!("send order {} failed: {e}", request.symbol));
                String::new()
            }
        }
    }

    fn place(&self, request: &OrderRequest) -> crate::Result<Order> {
        let (price_type, order_type) = order_kind_to_broker(request.kind)
            .ok_or_else(|| GatewayError::Unsupported(format!("order kind {:?}", request.kind)))?;
        let octype = offset_to_octype(request.offset)
            .ok_or_else(|| GatewayError::Unsupported(format!("offset {:?}", request.offset)))?;
        let contract = self.directory.require(&request.symbol)?;

        let order = BrokerOrder {
            action: action_from_direction(request.direction),
            price: request.price,
            quantity: request.volume,
            price_type,
            order_type,
            octype,
        };
        let trade = self.session.place_order(&contract.code, &order)?;
        info!(
            order_id = trade.order.id,
            seqno = trade.order.seqno,
            symbol = contract.code,
            "Order placed"
        );
        Ok(self.ledger.on_submit_ack(&trade))
    }

    /// Requests cancellation. The order's status changes only when the
    /// relay stream confirms it.
    pub fn cancel_order(&self, request: &CancelRequest) {
        let Some(handle) = self.resolver.handle_for_order(&request.order_id) else {
            self.publisher
                .write_log(format!("cancel: order {} not found", request.order_id));
            return;
        };
        let on_ack = Box::new(|trade: &BrokerTrade| {
            info!(
                order_id = trade.order.id,
                status = ?trade.status.status,
                "Cancel acknowledged"
            );
        });
        if let Err(e) = self.session.cancel_order(&handle, on_ack) {
            self.publisher
                .write_log(format!("cancel order {} failed: {e}", request.order_id));
        }
    }

    /// Rebuilds the ledger from the session's trade handles.
    pub fn reload(&self) {
        if let Err(e) = self.ledger.reload() {
            self.publisher.write_log(format!("reload failed: {e}"));
        }
    }

    /// Queries stock and futures positions and publishes each one.
    pub fn query_position(&self) -> Vec<Position> {
        let mut positions = Vec::new();

        match self.session.list_stock_positions() {
            Ok(rows) => positions.extend(rows.iter().filter_map(|row| self.stock_position(row))),
            Err(e) => self
                .publisher
                .write_log(format!("stock position query failed: {e}")),
        }
        match self.session.list_futures_positions() {
            Ok(rows) => positions.extend(rows.iter().filter_map(futures_position)),
            Err(e) => self
                .publisher
                .write_log(format!("futures position query failed: {e}")),
        }

        for position in &positions {
            self.publisher.publish(GatewayEvent::Position(position.clone()));
        }
        positions
    }

    fn stock_position(&self, row: &RawStockPosition) -> Option<Position> {
        if row.last_price.is_zero() {
            self.publisher
                .write_log(format!("skipping {}: delisted", row.code));
            return None;
        }
        Some(Position {
            symbol: row.code.clone(),
            account_class: AccountClass::Stock,
            direction: direction_from_action(row.direction),
            volume: row.quantity,
            yd_volume: row.yd_quantity,
            frozen: row.quantity.saturating_sub(row.yd_quantity),
            price: row.price,
            pnl: row.pnl,
        })
    }

    /// Fetches one-minute bars, resamples them to the requested interval
    /// and keeps those inside the requested dates.
    pub fn query_history(&self, request: &HistoryRequest) -> Vec<Bar> {
        match self.history(request) {
            Ok(bars) => bars,
            Err(e) => {
                self.publisher
                    .write_log(format!("history query {} failed: {e}", request.symbol));
                Vec::new()
            }
        }
    }

    fn history(&self, request: &HistoryRequest) -> crate::Result<Vec<Bar>> {
        let contract = self.directory.require(&request.symbol)?;
        let range = DateRange {
            start: request.start,
            end: request.end,
        };
        let rows = self.session.kbars(&contract.code, range)?;

        let minutes: Vec<Bar> = rows
            .iter()
            .filter_map(|row| match minute_bar(&contract, row) {
                Ok(bar) => Some(bar),
                Err(e) => {
                    warn!(symbol = contract.code, error = %e, "Skipping history row");
                    None
                }
            })
            .collect();

        let (from, until) = window(request.start, request.end);
        let bars: Vec<Bar> = resample(minutes, request.interval)
            .into_iter()
            .filter(|bar| bar.datetime >= from && bar.datetime < until)
            .collect();
        debug!(symbol = contract.code, rows = rows.len(), bars = bars.len(), "History loaded");
        Ok(bars)
    }

    /// Logs out of the session.
    pub fn close(&self) {
        if let Err(e) = self.session.logout() {
            self.publisher.write_log(format!("logout failed: {e}"));
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Routes one decoded broker callback.
    pub fn handle_event(&self, event: BrokerEvent) {
        match event {
            BrokerEvent::TradeTick(tick) => match self.directory.get(&tick.code) {
                Some(contract) => self.quotes.apply_trade_tick(&contract, &tick),
                None => debug!(code = tick.code, "Tick for unknown contract"),
            },
            BrokerEvent::BookTick(tick) => match self.directory.get(&tick.code) {
                Some(contract) => self.quotes.apply_book_tick(&contract, &tick),
                None => debug!(code = tick.code, "Book tick for unknown contract"),
            },
            BrokerEvent::RelayOrder(event) => self.ledger.on_relay_order(&event),
            BrokerEvent::RelayDeal(event) => self.ledger.on_deal(&event),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn directory(&self) -> &ContractDirectory {
        &self.directory
    }

    pub fn quotes(&self) -> &QuoteCache {
        &self.quotes
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

fn futures_position(row: &RawFuturesPosition) -> Option<Position> {
    let symbol = row.code.as_deref().filter(|c| !c.is_empty())?;
    Some(Position {
        symbol: symbol.to_string(),
        account_class: AccountClass::Futures,
        direction: row
            .order_bs
            .as_deref()
            .and_then(direction_from_code)
            .unwrap_or(Direction::Sell),
        volume: row
            .volume
            .unwrap_or_default()
            .trunc()
            .to_u64()
            .unwrap_or_default(),
        yd_volume: 0,
        frozen: 0,
        price: row.average_price.unwrap_or_default(),
        pnl: row.flow_profit_loss.unwrap_or_default(),
    })
}

fn minute_bar(contract: &ContractRef, row: &RawKBar) -> crate::Result<Bar> {
    Ok(Bar {
        symbol: contract.code.clone(),
        datetime: normalize_timestamp(&row.ts)?,
        interval: Interval::Minute,
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        volume: row.volume,
        amount: row.amount,
    })
}

/// Half-open `[start 00:00, end + 1 day 00:00)` window.
fn window(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = end
        .succ_opt()
        .unwrap_or(end)
        .and_time(NaiveTime::MIN)
        .and_utc();
    (from, until)
}
