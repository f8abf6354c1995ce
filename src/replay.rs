//! Recorded broker callbacks, one JSON object per line.
//!
//! ```text
//! {"kind":"tick","payload":{"code":"2330","datetime":"2024-01-15 09:00:00",...}}
//! {"kind":"bidask","payload":{"code":"2330",...}}
//! {"kind":"relay","topic":"SDEAL","payload":{"trade_id":"...",...}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::GatewayError;
use crate::broker::BrokerEvent;
use crate::broker::decode::{decode_bidask, decode_relay, decode_tick};
use crate::broker::payload::{BidAskPayload, TickPayload};

/// One recorded callback.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReplayRecord {
    Tick { payload: TickPayload },
    Bidask { payload: BidAskPayload },
    Relay { topic: String, payload: serde_json::Value },
}

impl ReplayRecord {
    /// Decodes the recorded payload.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if the payload is malformed.
    pub fn decode(self) -> crate::Result<BrokerEvent> {
        match self {
            Self::Tick { payload } => decode_tick(payload).map(BrokerEvent::TradeTick),
            Self::Bidask { payload } => decode_bidask(payload).map(BrokerEvent::BookTick),
            Self::Relay { topic, payload } => decode_relay(&topic, payload),
        }
    }
}

/// Reads and decodes every record of a replay file.
///
/// # Errors
///
/// Returns [`GatewayError::Io`] if the file cannot be read, or
/// [`GatewayError::Decode`] naming the first bad line.
pub fn load(path: &Path) -> crate::Result<Vec<BrokerEvent>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(trimmed)
            .map_err(|e| GatewayError::Decode(format!("line {}: {e}", index + 1)))?;
        let event = record
            .decode()
            .map_err(|e| GatewayError::Decode(format!("line {}: {e}", index + 1)))?;
        events.push(event);
    }

    info!(path = %path.display(), events = events.len(), "Replay file loaded");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TICK: &str = r#"{"kind":"tick","payload":{"code":"2330","datetime":"2024-01-15 09:00:00","open":580,"high":582,"low":579,"close":581,"price_chg":3,"volume":2,"total_volume":120,"simtrade":0}}"#;

    #[test]
    fn loads_records_and_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# recorded session").unwrap();
        writeln!(file, "{TICK}").unwrap();
        writeln!(file).unwrap();

        let events = load(file.path()).unwrap();
        assert_eq!(events.len(), 1);
        let BrokerEvent::TradeTick(tick) = &events[0] else {
            panic!("expected trade tick");
        };
        assert_eq!(tick.volume, 120);
    }

    #[test]
    fn reports_bad_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{TICK}").unwrap();
        writeln!(file, r#"{{"kind":"relay","topic":"NOPE","payload":{{}}}}"#).unwrap();

        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/replay.jsonl")).unwrap_err();
        assert!(matches!(err, GatewayError::Io(_)));
    }
}
