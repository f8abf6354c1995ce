//! Boundary to the broker's trading session.
//!
//! [`BrokerSession`] is the request/response surface of the vendor SDK;
//! streaming callbacks reach the core as [`BrokerEvent`]s produced by
//! [`decode`]. [`paper::PaperSession`] implements the trait in memory.

pub mod decode;
pub mod event;
pub mod mapping;
pub mod paper;
pub mod payload;
pub mod types;

pub use event::{BookTick, BrokerEvent, RelayDealEvent, RelayOperation, RelayOrderEvent, TradeTick};
pub use paper::PaperSession;
pub use types::{
    AccountKey, AccountType, Action, BrokerAccount, BrokerOrder, BrokerStatus, BrokerTrade,
    Catalog, CatalogCategory, DateRange, OcType, PriceType, QuoteStream, RawContract,
    RawFuturesPosition, RawKBar, RawSnapshot, RawStockPosition, TimeInForce,
};

/// Invoked once the broker acknowledges a cancel request.
pub type CancelCallback = Box<dyn FnOnce(&BrokerTrade) + Send>;

/// Invoked once the contract catalog finishes downloading after login.
pub type CatalogCallback = Box<dyn FnOnce(Catalog) + Send>;

/// Blocking request/response calls into the broker session.
///
/// Implementations must be callable from the market-data, relay and
/// control threads at once.
pub trait BrokerSession: Send + Sync {
    /// Logs in and returns the accounts available to `person_id`.
    /// `on_catalog` fires once the contract catalog is ready.
    fn login(
        &self,
        person_id: &str,
        password: &str,
        simulation: bool,
        on_catalog: CatalogCallback,
    ) -> crate::Result<Vec<BrokerAccount>>;

    fn logout(&self) -> crate::Result<()>;

    fn list_accounts(&self) -> Vec<BrokerAccount>;

    fn set_default_account(&self, account: &BrokerAccount) -> crate::Result<()>;

    /// Activates the order-signing certificate.
    fn activate_ca(&self, path: &str, password: &str, person_id: &str) -> crate::Result<()>;

    fn snapshots(&self, codes: &[String]) -> crate::Result<Vec<RawSnapshot>>;

    fn subscribe(&self, code: &str, stream: QuoteStream) -> crate::Result<()>;

    fn place_order(&self, code: &str, order: &BrokerOrder) -> crate::Result<BrokerTrade>;

    fn cancel_order(&self, trade: &BrokerTrade, on_ack: CancelCallback) -> crate::Result<()>;

    /// Refreshes the session's trade handles for one account, or all.
    fn update_status(&self, account: Option<&AccountKey>) -> crate::Result<()>;

    fn list_trades(&self) -> Vec<BrokerTrade>;

    fn trade_by_seqno(&self, seqno: &str) -> Option<BrokerTrade>;

    fn list_stock_positions(&self) -> crate::Result<Vec<RawStockPosition>>;

    fn list_futures_positions(&self) -> crate::Result<Vec<RawFuturesPosition>>;

    fn kbars(&self, code: &str, range: DateRange) -> crate::Result<Vec<RawKBar>>;
}
