//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use sinopac_gateway::SinopacGateway;
use sinopac_gateway::broker::{AccountType, BrokerAccount, BrokerTrade, Catalog, PaperSession};
use sinopac_gateway::config::{AccountSelection, GatewayConfig, LoginConfig};
use sinopac_gateway::publish::MemoryPublisher;

pub const CATALOG_JSON: &str = include_str!("../fixtures/catalog.json");
pub const TICK_JSON: &str = include_str!("../fixtures/tick.json");
pub const BIDASK_JSON: &str = include_str!("../fixtures/bidask.json");
pub const RELAY_ORDER_NEW_JSON: &str = include_str!("../fixtures/relay_order_new.json");
pub const RELAY_DEAL_JSON: &str = include_str!("../fixtures/relay_deal.json");
pub const TRADE_HANDLE_JSON: &str = include_str!("../fixtures/trade_handle.json");
pub const KBARS_JSON: &str = include_str!("../fixtures/kbars.json");
pub const STOCK_POSITIONS_JSON: &str = include_str!("../fixtures/stock_positions.json");
pub const FUTURES_POSITIONS_JSON: &str = include_str!("../fixtures/futures_positions.json");

pub const PERSON_ID: &str = "A123456789";

pub fn catalog() -> Catalog {
    serde_json::from_str(CATALOG_JSON).unwrap()
}

pub fn trade_handle() -> BrokerTrade {
    serde_json::from_str(TRADE_HANDLE_JSON).unwrap()
}

pub fn account(account_type: AccountType, broker_id: &str, account_id: &str) -> BrokerAccount {
    BrokerAccount {
        account_type,
        person_id: PERSON_ID.to_string(),
        broker_id: broker_id.to_string(),
        account_id: account_id.to_string(),
        username: "tester".to_string(),
        signed: true,
    }
}

/// One stock and one futures account.
pub fn accounts() -> Vec<BrokerAccount> {
    vec![
        account(AccountType::Stock, "9A95", "1234567"),
        account(AccountType::Futures, "F002000", "1234567"),
    ]
}

pub fn config(accounts: AccountSelection) -> GatewayConfig {
    GatewayConfig {
        login: LoginConfig {
            person_id: PERSON_ID.to_string(),
            password: Zeroizing::new("secret".to_string()),
            ca_path: None,
            ca_password: None,
        },
        accounts,
        simulation: true,
        resolve_retry_delay: Duration::from_millis(1),
    }
}

/// A gateway wired to `session` and a recording publisher. Not connected.
pub struct Harness {
    pub session: Arc<PaperSession>,
    pub publisher: Arc<MemoryPublisher>,
    pub gateway: SinopacGateway,
}

impl Harness {
    pub fn new(session: PaperSession) -> Self {
        let session = Arc::new(session);
        let publisher = Arc::new(MemoryPublisher::new());
        let gateway = SinopacGateway::new(
            session.clone(),
            publisher.clone(),
            Duration::from_millis(1),
        );
        Self {
            session,
            publisher,
            gateway,
        }
    }

    /// Builds a harness over a session holding the fixture catalog and
    /// accounts, connects it and clears the publisher.
    pub fn connected(session: PaperSession) -> Self {
        let harness = Self::new(session.with_catalog(catalog()).with_accounts(accounts()));
        assert!(harness.gateway.connect(&config(AccountSelection::default())));
        harness.publisher.clear();
        harness
    }

    /// Feeds every queued paper relay event through the gateway.
    pub fn pump(&self) {
        for event in self.session.drain_events() {
            self.gateway.handle_event(event);
        }
    }
}
