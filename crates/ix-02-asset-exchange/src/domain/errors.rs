//! # Domain Errors
//!
//! Error types for the Asset State Machine. Only `Remote` (non-retryable)
//! and `Expired` move a session; every other error leaves it untouched.

use shared_types::{SessionId, SessionState};
use thiserror::Error;

/// Asset exchange error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetExchangeError {
    /// No session with this id.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Edge not in the state machine.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: SessionState,
        /// Attempted state
        to: SessionState,
    },

    /// Preimage does not hash to the lock, or no valid claim is recorded.
    #[error("Invalid preimage")]
    InvalidPreimage,

    /// The time lock elapsed before the request was recorded.
    #[error("Session {session_id} expired at {time_lock}")]
    Expired {
        /// Session
        session_id: SessionId,
        /// Deadline that elapsed
        time_lock: u64,
    },

    /// Request context does not match the session's counterparty.
    #[error("Context mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// What the session is bound to
        expected: String,
        /// What the request carried
        actual: String,
    },

    /// Operation needs lock terms the session does not have.
    #[error("Missing lock terms for session {0}")]
    MissingLockTerms(SessionId),

    /// Lock terms rejected.
    #[error("Invalid lock terms: {0}")]
    InvalidLockTerms(String),

    /// Ledger connector failure.
    #[error("Remote error {code}: {message}")]
    Remote {
        /// Connector error code
        code: String,
        /// Connector message
        message: String,
        /// Whether the session stayed in place for a retry
        retryable: bool,
    },

    /// Transition could not be journaled.
    #[error("Journal error: {0}")]
    Journal(String),
}

impl AssetExchangeError {
    /// Whether the error left the session in its previous state.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Remote { retryable, .. } => *retryable,
            Self::Expired { .. } => false,
            _ => true,
        }
    }
}
