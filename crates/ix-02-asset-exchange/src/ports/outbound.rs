//! # Outbound Ports
//!
//! What the Asset State Machine needs from its environment: a ledger
//! connector, a clock and a transition journal. Session events go out
//! through `shared_bus::EventPublisher`.

use crate::domain::{LedgerAction, LedgerReceipt, TransitionRecord};
use async_trait::async_trait;
use shared_types::{LedgerRef, SessionId, StatePayload};
use thiserror::Error;

/// Failure reported by a ledger connector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ConnectorError {
    /// Ledger-specific error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Whether resubmitting may succeed.
    pub retryable: bool,
}

impl ConnectorError {
    /// A failure worth retrying.
    pub fn retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that ends the session.
    pub fn fatal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }
}

/// Ledger connector - outbound port.
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    /// Submit an action to a ledger.
    async fn submit_transaction(
        &self,
        ledger: &LedgerRef,
        action: LedgerAction,
    ) -> Result<LedgerReceipt, ConnectorError>;

    /// Read ledger state at `address`.
    async fn query_state(
        &self,
        ledger: &LedgerRef,
        address: &str,
    ) -> Result<StatePayload, ConnectorError>;
}

/// Wall clock - outbound port.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> u64;
}

/// Append-only transition journal - outbound port.
///
/// A transition counts as recorded once `append` returns.
pub trait TransitionJournal: Send + Sync {
    /// Append a record; returns its sequence number.
    fn append(&self, record: TransitionRecord) -> Result<u64, String>;

    /// Records for one session, in append order.
    fn history(&self, session_id: &SessionId) -> Vec<TransitionRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_error_constructors() {
        let err = ConnectorError::retryable("BUSY", "try later");
        assert!(err.retryable);
        assert_eq!(err.to_string(), "BUSY: try later");
        assert!(!ConnectorError::fatal("REVERTED", "out of gas").retryable);
    }
}
