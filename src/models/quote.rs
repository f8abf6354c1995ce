//! Quote records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::ContractRef;

/// Number of bid/ask levels carried by a quote.
pub const BOOK_DEPTH: usize = 5;

/// Latest market state for one instrument.
///
/// Trade-side fields (`last_price` through `pre_close`) and book-side fields
/// (`bid_*`, `ask_*`) are written by independent tick streams and never
/// overwrite each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub code: String,
    pub name: String,
    /// Exchange time of the last trade-side update.
    pub datetime: DateTime<Utc>,
    /// Local receipt time of the last update.
    pub localtime: DateTime<Utc>,
    /// Set while the exchange is publishing indicative (simulated-match)
    /// prices before the open.
    pub indicative: bool,

    // -- Trade side --
    pub last_price: Decimal,
    pub volume: u64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub pre_close: Decimal,
    pub limit_up: Decimal,
    pub limit_down: Decimal,

    // -- Book side --
    pub bid_price: [Decimal; BOOK_DEPTH],
    pub bid_volume: [u64; BOOK_DEPTH],
    pub ask_price: [Decimal; BOOK_DEPTH],
    pub ask_volume: [u64; BOOK_DEPTH],
}

impl Quote {
    /// Creates an empty quote for `contract` stamped at `datetime`.
    #[must_use]
    pub fn new(contract: &ContractRef, datetime: DateTime<Utc>) -> Self {
        Self {
            code: contract.code.clone(),
            name: contract.display_name.clone(),
            datetime,
            localtime: Utc::now(),
            indicative: false,
            last_price: Decimal::ZERO,
            volume: 0,
            open: Decimal::ZERO,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            pre_close: Decimal::ZERO,
            limit_up: contract.limit_up,
            limit_down: contract.limit_down,
            bid_price: [Decimal::ZERO; BOOK_DEPTH],
            bid_volume: [0; BOOK_DEPTH],
            ask_price: [Decimal::ZERO; BOOK_DEPTH],
            ask_volume: [0; BOOK_DEPTH],
        }
    }
}
