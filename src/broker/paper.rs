//! In-memory broker session for paper trading, replay and tests.
//!
//! [`PaperSession`] answers every [`BrokerSession`] call from canned data
//! and keeps a log of the calls it received. Orders it accepts produce the
//! same relay events a live session would; they queue up until
//! [`PaperSession::drain_events`] hands them to the dispatcher.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;

use super::event::{BrokerEvent, RelayDealEvent, RelayOperation, RelayOrderEvent};
use super::mapping::direction_from_action;
use super::types::{
    AccountKey, BrokerAccount, BrokerOrder, BrokerStatus, BrokerTrade, Catalog, DateRange,
    QuoteStream, RawFuturesPosition, RawKBar, RawSnapshot, RawStockPosition, TradeContract,
    TradeDeal, TradeOrder, TradeStatus,
};
use super::{BrokerSession, CancelCallback, CatalogCallback};
use crate::GatewayError;

/// A call received by the paper session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Login { person_id: String, simulation: bool },
    Logout,
    SetDefaultAccount(AccountKey),
    ActivateCa { path: String },
    Snapshots(Vec<String>),
    Subscribe(String, QuoteStream),
    PlaceOrder(String),
    CancelOrder(String),
    UpdateStatus(Option<AccountKey>),
    ListTrades,
    TradeBySeqno(String),
    ListStockPositions,
    ListFuturesPositions,
    KBars(String),
}

#[derive(Default)]
struct PaperState {
    accounts: Vec<BrokerAccount>,
    catalog: Catalog,
    login_error: Option<String>,
    place_error: Option<String>,
    position_error: Option<String>,
    snapshots: HashMap<String, RawSnapshot>,
    kbars: HashMap<String, Vec<RawKBar>>,
    stock_positions: Vec<RawStockPosition>,
    futures_positions: Vec<RawFuturesPosition>,
    trades: Vec<BrokerTrade>,
    hidden_seqno_lookups: usize,
    failing_status_refreshes: usize,
    default_account: Option<AccountKey>,
    next_order: u64,
    next_deal: u64,
    pending: VecDeque<BrokerEvent>,
    calls: Vec<SessionCall>,
}

/// Broker session backed by in-memory state.
#[derive(Default)]
pub struct PaperSession {
    state: Mutex<PaperState>,
}

impl PaperSession {
    /// Creates an empty session with no accounts and an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_accounts(self, accounts: Vec<BrokerAccount>) -> Self {
        self.lock().accounts = accounts;
        self
    }

    #[must_use]
    pub fn with_catalog(self, catalog: Catalog) -> Self {
        self.lock().catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_snapshot(self, snapshot: RawSnapshot) -> Self {
        self.lock().snapshots.insert(snapshot.code.clone(), snapshot);
        self
    }

    #[must_use]
    pub fn with_kbars(self, code: &str, rows: Vec<RawKBar>) -> Self {
        self.lock().kbars.insert(code.to_string(), rows);
        self
    }

    #[must_use]
    pub fn with_stock_positions(self, rows: Vec<RawStockPosition>) -> Self {
        self.lock().stock_positions = rows;
        self
    }

    #[must_use]
    pub fn with_futures_positions(self, rows: Vec<RawFuturesPosition>) -> Self {
        self.lock().futures_positions = rows;
        self
    }

    /// Adds a trade handle the session already knows about at login.
    #[must_use]
    pub fn with_trade(self, trade: BrokerTrade) -> Self {
        self.lock().trades.push(trade);
        self
    }

    /// Makes `login` fail with `message`.
    #[must_use]
    pub fn failing_login(self, message: &str) -> Self {
        self.lock().login_error = Some(message.to_string());
        self
    }

    /// Makes `place_order` fail with `message`.
    #[must_use]
    pub fn failing_orders(self, message: &str) -> Self {
        self.lock().place_error = Some(message.to_string());
        self
    }

    /// Makes both position queries fail with `message`.
    #[must_use]
    pub fn failing_positions(self, message: &str) -> Self {
        self.lock().position_error = Some(message.to_string());
        self
    }

    /// Makes the next `count` sequence-number lookups miss, as a live
    /// session does while a freshly placed order is not yet visible.
    pub fn hide_seqno_lookups(&self, count: usize) {
        self.lock().hidden_seqno_lookups = count;
    }

    /// Makes the next `count` status refreshes fail.
    pub fn fail_status_refreshes(&self, count: usize) {
        self.lock().failing_status_refreshes = count;
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.lock().calls.clone()
    }

    /// Counts received calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&SessionCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Removes and returns the relay events produced so far.
    pub fn drain_events(&self) -> Vec<BrokerEvent> {
        self.lock().pending.drain(..).collect()
    }

    /// Fills `quantity` of the order at `price`.
    ///
    /// Appends the deal to the order's handle and returns the relay deal
    /// event a live session would emit, or `None` for an unknown order.
    pub fn fill(&self, order_id: &str, quantity: u64, price: Decimal) -> Option<RelayDealEvent> {
        let mut state = self.lock();
        state.next_deal += 1;
        let deal_id = format!("D{:07}", state.next_deal);
        let now = Utc::now();

        let trade = state.trades.iter_mut().find(|t| t.order.id == order_id)?;
        trade.status.deals.push(TradeDeal {
            seq: deal_id.clone(),
            price,
            quantity,
            ts: now.timestamp(),
        });
        trade.status.deal_quantity += quantity;
        trade.status.status = if trade.status.deal_quantity >= trade.order.quantity {
            BrokerStatus::Filled
        } else {
            BrokerStatus::PartFilled
        };

        Some(RelayDealEvent {
            account: trade.order.account.clone(),
            seqno: trade.order.seqno.clone(),
            deal_id,
            code: trade.contract.code.clone(),
            direction: direction_from_action(trade.order.action),
            price,
            volume: quantity,
            datetime: now,
        })
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        // A poisoned lock only means a test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: SessionCall) -> MutexGuard<'_, PaperState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

fn relay_event(trade: &BrokerTrade, operation: RelayOperation, cancel_quantity: u64) -> BrokerEvent {
    BrokerEvent::RelayOrder(RelayOrderEvent {
        account: trade.order.account.clone(),
        seqno: trade.order.seqno.clone(),
        order_id: trade.order.id.clone(),
        code: trade.contract.code.clone(),
        operation,
        success: true,
        message: String::new(),
        cancel_quantity,
        modified_price: None,
        exchange_time: Some(Utc::now()),
    })
}

impl BrokerSession for PaperSession {
    fn login(
        &self,
        person_id: &str,
        _password: &str,
        simulation: bool,
        on_catalog: CatalogCallback,
    ) -> crate::Result<Vec<BrokerAccount>> {
        let (accounts, catalog) = {
            let state = self.record(SessionCall::Login {
                person_id: person_id.to_string(),
                simulation,
            });
            if let Some(message) = &state.login_error {
                return Err(GatewayError::Broker(message.clone()));
            }
            (state.accounts.clone(), state.catalog.clone())
        };
        on_catalog(catalog);
        Ok(accounts)
    }

    fn logout(&self) -> crate::Result<()> {
        self.record(SessionCall::Logout);
        Ok(())
    }

    fn list_accounts(&self) -> Vec<BrokerAccount> {
        self.lock().accounts.clone()
    }

    fn set_default_account(&self, account: &BrokerAccount) -> crate::Result<()> {
        let mut state = self.record(SessionCall::SetDefaultAccount(account.key()));
        state.default_account = Some(account.key());
        Ok(())
    }

    fn activate_ca(&self, path: &str, _password: &str, _person_id: &str) -> crate::Result<()> {
        self.record(SessionCall::ActivateCa {
            path: path.to_string(),
        });
        Ok(())
    }

    fn snapshots(&self, codes: &[String]) -> crate::Result<Vec<RawSnapshot>> {
        let state = self.record(SessionCall::Snapshots(codes.to_vec()));
        Ok(codes
            .iter()
            .filter_map(|code| state.snapshots.get(code).cloned())
            .collect())
    }

    fn subscribe(&self, code: &str, stream: QuoteStream) -> crate::Result<()> {
        self.record(SessionCall::Subscribe(code.to_string(), stream));
        Ok(())
    }

    fn place_order(&self, code: &str, order: &BrokerOrder) -> crate::Result<BrokerTrade> {
        let mut state = self.record(SessionCall::PlaceOrder(code.to_string()));
        if let Some(message) = &state.place_error {
            return Err(GatewayError::Broker(message.clone()));
        }

        state.next_order += 1;
        let n = state.next_order;
        let account = state
            .default_account
            .clone()
            .or_else(|| state.accounts.first().map(BrokerAccount::key))
            .unwrap_or_else(|| AccountKey {
                broker_id: "PAPER".to_string(),
                account_id: "0000000".to_string(),
            });

        let trade = BrokerTrade {
            contract: TradeContract {
                code: code.to_string(),
                security_type: String::new(),
            },
            order: TradeOrder {
                id: format!("p{n:07x}"),
                seqno: format!("{n:06}"),
                ordno: format!("W{n:04}"),
                account,
                action: order.action,
                price: order.price,
                quantity: order.quantity,
                price_type: order.price_type,
                order_type: order.order_type,
                octype: order.octype,
            },
            status: TradeStatus {
                status: BrokerStatus::PendingSubmit,
                status_code: String::new(),
                order_ts: Some(Utc::now().timestamp()),
                deal_quantity: 0,
                cancel_quantity: 0,
                msg: String::new(),
                deals: Vec::new(),
            },
        };

        let mut accepted = trade.clone();
        accepted.status.status = BrokerStatus::Submitted;
        state.pending.push_back(relay_event(&accepted, RelayOperation::New, 0));
        state.trades.push(accepted);
        Ok(trade)
    }

    fn cancel_order(&self, trade: &BrokerTrade, on_ack: CancelCallback) -> crate::Result<()> {
        let acked = {
            let mut state = self.record(SessionCall::CancelOrder(trade.order.id.clone()));
            let Some(held) = state.trades.iter_mut().find(|t| t.order.id == trade.order.id) else {
                return Err(GatewayError::Broker(format!("no order {}", trade.order.id)));
            };
            let remaining = held.order.quantity.saturating_sub(held.status.deal_quantity);
            held.status.status = BrokerStatus::Cancelled;
            held.status.cancel_quantity = remaining;
            let acked = held.clone();
            state
                .pending
                .push_back(relay_event(&acked, RelayOperation::Cancel, remaining));
            acked
        };
        on_ack(&acked);
        Ok(())
    }

    fn update_status(&self, account: Option<&AccountKey>) -> crate::Result<()> {
        let mut state = self.record(SessionCall::UpdateStatus(account.cloned()));
        if state.failing_status_refreshes > 0 {
            state.failing_status_refreshes -= 1;
            return Err(GatewayError::Broker("status refresh timed out".to_string()));
        }
        Ok(())
    }

    fn list_trades(&self) -> Vec<BrokerTrade> {
        self.record(SessionCall::ListTrades).trades.clone()
    }

    fn trade_by_seqno(&self, seqno: &str) -> Option<BrokerTrade> {
        let mut state = self.record(SessionCall::TradeBySeqno(seqno.to_string()));
        if state.hidden_seqno_lookups > 0 {
            state.hidden_seqno_lookups -= 1;
            return None;
        }
        state.trades.iter().find(|t| t.order.seqno == seqno).cloned()
    }

    fn list_stock_positions(&self) -> crate::Result<Vec<RawStockPosition>> {
        let state = self.record(SessionCall::ListStockPositions);
        match &state.position_error {
            Some(message) => Err(GatewayError::Broker(message.clone())),
            None => Ok(state.stock_positions.clone()),
        }
    }

    fn list_futures_positions(&self) -> crate::Result<Vec<RawFuturesPosition>> {
        let state = self.record(SessionCall::ListFuturesPositions);
        match &state.position_error {
            Some(message) => Err(GatewayError::Broker(message.clone())),
            None => Ok(state.futures_positions.clone()),
        }
    }

    fn kbars(&self, code: &str, _range: DateRange) -> crate::Result<Vec<RawKBar>> {
        let state = self.record(SessionCall::KBars(code.to_string()));
        state
            .kbars
            .get(code)
            .cloned()
            .ok_or_else(|| GatewayError::Broker(format!("no kbars for {code}")))
    }
}
