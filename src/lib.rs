//! Sinopac (Shioaji) broker gateway.
//!
//! Reconciles the broker session's streaming callbacks (ticks, book
//! updates, order-state relays, fills) and its request/response queries
//! into one consistent view of quotes, orders, trades and positions, and
//! republishes every change to the host platform through a
//! [`publish::Publisher`].

pub mod broker;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod models;
pub mod publish;
pub mod quotes;
pub mod replay;
pub mod resolver;

pub use error::{GatewayError, Result};
pub use gateway::SinopacGateway;
