//! Crate-level error types.
//!
//! [`GatewayError`] unifies every error source (configuration, broker
//! session, payload decoding, identifier resolution) behind a single enum.
//! Internal code propagates it with `?`; the gateway's event handlers catch
//! it at the boundary, log it, and fall back to a safe default so broker
//! anomalies never take the host process down.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Top-level error type returned by fallible internal APIs.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration values are missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A broker session call (login, query, placement) failed.
    #[error("broker error: {0}")]
    Broker(String),

    /// A relay sequence number could not be matched to a trade handle.
    #[error("sequence number {seqno} not resolved after retry")]
    Unresolved { seqno: String },

    /// The contract directory has no entry for this code.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// The order kind or offset has no broker equivalent.
    #[error("unsupported order: {0}")]
    Unsupported(String),

    /// A historical-bar timestamp could not be normalized.
    #[error("invalid timestamp: {0}")]
    Timestamp(String),

    /// A raw broker payload did not have the expected shape.
    #[error("malformed payload: {0}")]
    Decode(String),

    /// Reading a replay file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
