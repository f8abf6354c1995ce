//! Maps relay sequence numbers and order ids to broker trade handles.
//!
//! Relay events identify orders by sequence number, but a freshly placed
//! order can be reported before the session lists it. A lookup miss is
//! retried once after a short delay before it is treated as an error.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::GatewayError;
use crate::broker::{AccountKey, BrokerSession, BrokerTrade};

pub struct IdResolver {
    session: Arc<dyn BrokerSession>,
    retry_delay: Duration,
    by_seqno: DashMap<String, BrokerTrade>,
    seqno_by_order: DashMap<String, String>,
}

impl IdResolver {
    pub fn new(session: Arc<dyn BrokerSession>, retry_delay: Duration) -> Self {
        Self {
            session,
            retry_delay,
            by_seqno: DashMap::new(),
            seqno_by_order: DashMap::new(),
        }
    }

    /// Remembers `trade` under its sequence number and order id.
    pub fn cache(&self, trade: &BrokerTrade) {
        self.seqno_by_order
            .insert(trade.order_id().to_string(), trade.seqno().to_string());
        self.by_seqno.insert(trade.seqno().to_string(), trade.clone());
    }

    pub fn cached_by_seqno(&self, seqno: &str) -> Option<BrokerTrade> {
        self.by_seqno.get(seqno).map(|t| t.clone())
    }

    /// Returns the cached handle for a broker order id.
    pub fn handle_for_order(&self, order_id: &str) -> Option<BrokerTrade> {
        let seqno = self.seqno_by_order.get(order_id)?.clone();
        self.cached_by_seqno(&seqno)
    }

    /// Returns the cached handle, resolving through the session on a miss.
    ///
    /// # Errors
    ///
    /// See [`resolve_by_seq`](Self::resolve_by_seq).
    pub fn lookup(&self, account: &AccountKey, seqno: &str) -> crate::Result<BrokerTrade> {
        match self.cached_by_seqno(seqno) {
            Some(trade) => Ok(trade),
            None => self.resolve_by_seq(account, seqno),
        }
    }

    /// Refreshes the account's status and looks the handle up by sequence
    /// number, retrying once after the configured delay.
    ///
    /// Blocks the calling thread for the retry delay on a first miss; call
    /// it from the relay thread only.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unresolved`] if both attempts miss, or the
    /// session's error if the second status refresh fails.
    pub fn resolve_by_seq(&self, account: &AccountKey, seqno: &str) -> crate::Result<BrokerTrade> {
        match self.try_resolve(account, seqno) {
            Ok(Some(trade)) => return Ok(trade),
            Ok(None) => debug!(
                seqno,
                delay_ms = self.retry_delay.as_millis() as u64,
                "Sequence number not visible yet, retrying"
            ),
            Err(e) => warn!(seqno, error = %e, "Sequence number lookup failed, retrying"),
        }
        std::thread::sleep(self.retry_delay);

        match self.try_resolve(account, seqno)? {
            Some(trade) => Ok(trade),
            None => {
                warn!(seqno, account_id = account.account_id, "Sequence number unresolved");
                Err(GatewayError::Unresolved {
                    seqno: seqno.to_string(),
                })
            }
        }
    }

    fn try_resolve(&self, account: &AccountKey, seqno: &str) -> crate::Result<Option<BrokerTrade>> {
        self.session.update_status(Some(account))?;
        let found = self.session.trade_by_seqno(seqno);
        if let Some(trade) = &found {
            self.cache(trade);
        }
        Ok(found)
    }
}
