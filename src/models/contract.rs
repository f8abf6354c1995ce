//! Contract (instrument metadata) records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{OptionRight, Product};

/// Immutable instrument metadata, created once when the broker catalog
/// arrives and shared read-only for the rest of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractRef {
    /// Unique broker code (e.g. `"TXFA4"`, `"2330"`).
    pub code: String,
    pub display_name: String,
    pub product: Product,
    /// Broker category the contract was listed under (e.g. `"TXF"`).
    pub category: String,
    /// Delivery month (`"202401"`), empty for equities.
    pub delivery_month: String,
    /// Contract multiplier.
    pub size: u32,
    /// Minimum price increment.
    pub tick_size: Decimal,
    pub limit_up: Decimal,
    pub limit_down: Decimal,
    pub reference_price: Decimal,
    pub option: Option<OptionTerms>,
}

/// Option-specific contract terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionTerms {
    pub strike: Decimal,
    pub underlying: String,
    pub right: OptionRight,
    /// `None` when the broker's delivery date could not be parsed.
    pub expiry: Option<NaiveDate>,
}
