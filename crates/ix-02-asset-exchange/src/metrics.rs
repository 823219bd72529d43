//! # Asset Exchange Metrics
//!
//! Prometheus metrics for session lifecycles.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! ix-02-asset-exchange = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `ix_session_transitions_total` - Counter of transitions (by target state)
//! - `ix_sessions_terminal_total` - Counter of terminal entries (by state)
//! - `ix_claims_rejected_total` - Counter of rejected claims (by reason)
//! - `ix_connector_errors_total` - Counter of connector failures (by retryable)
//! - `ix_sessions_active` - Gauge of non-terminal sessions

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Transitions, labeled by target state
    pub static ref SESSION_TRANSITIONS: IntCounterVec = register_int_counter_vec!(
        "ix_session_transitions_total",
        "Total number of session transitions",
        &["to"]
    )
    .expect("Failed to create SESSION_TRANSITIONS metric");

    /// Terminal entries, labeled by state
    pub static ref SESSIONS_TERMINAL: IntCounterVec = register_int_counter_vec!(
        "ix_sessions_terminal_total",
        "Total number of sessions that reached a terminal state",
        &["state"]
    )
    .expect("Failed to create SESSIONS_TERMINAL metric");

    /// Rejected claims, labeled by reason
    pub static ref CLAIMS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "ix_claims_rejected_total",
        "Total number of rejected claims",
        &["reason"]
    )
    .expect("Failed to create CLAIMS_REJECTED metric");

    /// Connector failures, labeled by retryability
    pub static ref CONNECTOR_ERRORS: IntCounterVec = register_int_counter_vec!(
        "ix_connector_errors_total",
        "Total number of ledger connector failures",
        &["retryable"]
    )
    .expect("Failed to create CONNECTOR_ERRORS metric");

    /// Non-terminal sessions
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "ix_sessions_active",
        "Number of sessions not yet terminal"
    )
    .expect("Failed to create SESSIONS_ACTIVE metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a transition into `to`
#[cfg(feature = "metrics")]
pub fn record_transition(to: &str) {
    SESSION_TRANSITIONS.with_label_values(&[to]).inc();
}

/// Record a terminal entry
#[cfg(feature = "metrics")]
pub fn record_terminal(state: &str) {
    SESSIONS_TERMINAL.with_label_values(&[state]).inc();
}

/// Record a rejected claim
#[cfg(feature = "metrics")]
pub fn record_claim_rejected(reason: &str) {
    CLAIMS_REJECTED.with_label_values(&[reason]).inc();
}

/// Record a connector failure
#[cfg(feature = "metrics")]
pub fn record_connector_error(retryable: bool) {
    CONNECTOR_ERRORS
        .with_label_values(&[if retryable { "true" } else { "false" }])
        .inc();
}

/// Update the active session gauge
#[cfg(feature = "metrics")]
pub fn set_active_sessions(count: usize) {
    SESSIONS_ACTIVE.set(count as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_transition(_to: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_terminal(_state: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_claim_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_connector_error(_retryable: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn set_active_sessions(_count: usize) {}
