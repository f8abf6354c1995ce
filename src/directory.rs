//! Contract directory: the code → contract index built from the broker
//! catalog.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::warn;

use crate::GatewayError;
use crate::broker::{Catalog, CatalogCategory, RawContract};
use crate::models::{ContractRef, OptionRight, OptionTerms, Product};
use crate::publish::{GatewayEvent, Publisher};

const FUTURES_SIZE: u32 = 200;
const OPTIONS_SIZE: u32 = 50;
const EQUITY_SIZE: u32 = 1;
const EXPIRY_FORMAT: &str = "%Y/%m/%d";

/// Price step for options and equities.
const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Read-mostly index of every tradable instrument.
///
/// Written once when the catalog arrives; every later lookup is a shared
/// read. An empty directory fails every lookup.
pub struct ContractDirectory {
    contracts: DashMap<String, Arc<ContractRef>>,
    publisher: Arc<dyn Publisher>,
}

impl ContractDirectory {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            contracts: DashMap::new(),
            publisher,
        }
    }

    /// Indexes every contract in `catalog` and publishes each one.
    pub fn load_catalog(&self, catalog: &Catalog) {
        self.load_class(&catalog.futures, Product::Future, "futures");
        self.load_class(&catalog.options, Product::Option, "options");
        self.load_class(&catalog.stocks, Product::Equity, "stocks");
    }

    fn load_class(&self, categories: &[CatalogCategory], product: Product, label: &str) {
        let mut loaded = 0usize;
        for category in categories {
            for raw in &category.contracts {
                let contract = Arc::new(contract_from_raw(raw, &category.name, product));
                self.publisher
                    .publish(GatewayEvent::Contract(contract.as_ref().clone()));
                self.contracts.insert(contract.code.clone(), contract);
                loaded += 1;
            }
        }
        self.publisher
            .write_log(format!("{label} catalog loaded: {loaded} contracts"));
    }

    /// Looks up a contract by broker code.
    pub fn get(&self, code: &str) -> Option<Arc<ContractRef>> {
        self.contracts.get(code).map(|entry| Arc::clone(entry.value()))
    }

    /// Like [`get`](Self::get), but reports a miss as an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownInstrument`] if `code` is not indexed.
    pub fn require(&self, code: &str) -> crate::Result<Arc<ContractRef>> {
        self.get(code)
            .ok_or_else(|| GatewayError::UnknownInstrument(code.to_string()))
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

fn contract_from_raw(raw: &RawContract, category: &str, product: Product) -> ContractRef {
    let (size, tick_size, display_name) = match product {
        Product::Future => (
            FUTURES_SIZE,
            raw.unit.unwrap_or(Decimal::ONE),
            format!("{}{}", raw.name, raw.delivery_month),
        ),
        Product::Option => (
            OPTIONS_SIZE,
            CENT,
            format!("{}{}", raw.name, raw.delivery_month),
        ),
        Product::Equity => (EQUITY_SIZE, CENT, raw.name.clone()),
    };

    let option = (product == Product::Option).then(|| OptionTerms {
        strike: raw.strike_price.unwrap_or_default(),
        underlying: raw.underlying_code.clone().unwrap_or_default(),
        right: match raw.option_right.as_deref() {
            Some("C") => OptionRight::Call,
            _ => OptionRight::Put,
        },
        expiry: parse_expiry(&raw.code, &raw.delivery_date),
    });

    ContractRef {
        code: raw.code.clone(),
        display_name,
        product,
        category: category.to_string(),
        delivery_month: raw.delivery_month.clone(),
        size,
        tick_size,
        limit_up: raw.limit_up,
        limit_down: raw.limit_down,
        reference_price: raw.reference,
        option,
    }
}

fn parse_expiry(code: &str, text: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(text.trim(), EXPIRY_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(code, delivery_date = text, error = %e, "Unparsable option expiry");
            None
        }
    }
}
