//! # Domain Value Objects
//!
//! Configuration, connector actions and operation outcomes.

use serde::{Deserialize, Serialize};
use shared_types::{AssetDescriptor, DigestAlgorithm, Hash, SessionState};

/// Asset exchange configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetExchangeConfig {
    /// Create an `INITIATED` session on first contact instead of rejecting.
    pub lazy_session_creation: bool,
    /// Shortest time lock accepted, counted from submission.
    pub min_time_lock_secs: u64,
    /// Bound on a single connector call.
    pub connector_timeout_ms: u64,
    /// Start a deadline timer per session.
    pub expiry_timers: bool,
    /// Seconds past the time lock a `CLAIM_PENDING` session has to be
    /// assigned before it expires too.
    pub assign_grace_secs: u64,
}

impl Default for AssetExchangeConfig {
    fn default() -> Self {
        Self {
            lazy_session_creation: false,
            min_time_lock_secs: 1,
            connector_timeout_ms: 5_000,
            expiry_timers: true,
            assign_grace_secs: 0,
        }
    }
}

/// Ledger action submitted through the connector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    /// Lock the asset under a hash lock and time lock.
    Lock {
        /// Asset to lock.
        asset: AssetDescriptor,
        /// Hash lock.
        hash_lock: Hash,
        /// Digest function.
        digest: DigestAlgorithm,
        /// Deadline, unix seconds.
        time_lock: u64,
    },
    /// Create the asset representation on the target ledger.
    Create {
        /// Asset.
        asset: AssetDescriptor,
    },
    /// Burn the locked asset.
    Extinguish {
        /// Asset id.
        asset_id: String,
    },
    /// Transfer ownership to the recipient.
    Assign {
        /// Asset id.
        asset_id: String,
        /// New owner.
        recipient: String,
        /// Revealed preimage.
        preimage: Vec<u8>,
    },
    /// Release the lock back to the original owner.
    Release {
        /// Asset id.
        asset_id: String,
        /// Owner to restore.
        owner: String,
    },
}

impl LedgerAction {
    /// Short action name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lock { .. } => "lock",
            Self::Create { .. } => "create",
            Self::Extinguish { .. } => "extinguish",
            Self::Assign { .. } => "assign",
            Self::Release { .. } => "release",
        }
    }

    /// Asset the action applies to.
    pub fn asset_id(&self) -> &str {
        match self {
            Self::Lock { asset, .. } | Self::Create { asset } => &asset.asset_id,
            Self::Extinguish { asset_id }
            | Self::Assign { asset_id, .. }
            | Self::Release { asset_id, .. } => asset_id,
        }
    }
}

/// Whether the ledger has applied a submitted action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    /// Applied and final.
    Confirmed,
    /// Accepted; confirmation arrives later as an event.
    Pending,
}

/// Connector receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Ledger transaction reference.
    pub tx_ref: String,
    /// Confirmation status.
    pub status: ReceiptStatus,
}

/// Result of a state machine operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The session moved.
    Applied {
        /// State before the operation
        from: SessionState,
        /// State after the operation
        to: SessionState,
    },
    /// Already at or past the requested state; nothing changed.
    Duplicate {
        /// Current state
        state: SessionState,
    },
    /// Evidence was stored but carried no transition.
    Recorded {
        /// Current state
        state: SessionState,
    },
}

impl TransitionOutcome {
    /// State after the operation.
    pub fn state(&self) -> SessionState {
        match self {
            Self::Applied { to, .. } => *to,
            Self::Duplicate { state } | Self::Recorded { state } => *state,
        }
    }

    /// Whether the session moved.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: AssetExchangeConfig =
            serde_json::from_str(r#"{"lazy_session_creation": true}"#).unwrap();
        assert!(config.lazy_session_creation);
        assert_eq!(config.connector_timeout_ms, 5_000);
    }

    #[test]
    fn test_action_names() {
        let action = LedgerAction::Release {
            asset_id: "a1".to_string(),
            owner: "alice".to_string(),
        };
        assert_eq!(action.name(), "release");
        assert_eq!(action.asset_id(), "a1");
    }

    #[test]
    fn test_outcome_state() {
        let applied = TransitionOutcome::Applied {
            from: SessionState::Locked,
            to: SessionState::AssetCreated,
        };
        assert!(applied.is_applied());
        assert_eq!(applied.state(), SessionState::AssetCreated);
        assert!(!TransitionOutcome::Duplicate {
            state: SessionState::Locked
        }
        .is_applied());
    }
}
