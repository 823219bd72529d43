//! # Driver Message Payloads
//!
//! Defines every driver-to-driver request and response payload.
//!
//! ## Design Rules
//!
//! - All payloads travel inside a `DriverEnvelope`.
//! - Payloads MUST NOT contain the calling driver's id (envelope authority);
//!   the one exception is `Query::requesting_driver`, which names the callback
//!   target of a state request and is covered by the query signature.
//! - Request/response pairs use the envelope's `correlation_id`.

use crate::entities::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// STATE EXCHANGE
// =============================================================================

/// Delivers a View to the driver that asked for it, or notifies a
/// subscribed driver of a remote event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteExternalStateMessage {
    /// Session the view belongs to.
    pub session_id: SessionId,
    /// Encoded View (view/proof codec framing).
    pub view_payload: Vec<u8>,
    /// Transaction that produced the view.
    pub ctx: ContractTransaction,
    /// Request id of the `RequestDriverState` this answers, if any.
    pub request_id: Option<String>,
    /// Subscription id this notification was produced for, if any.
    pub subscription_id: Option<String>,
}

impl WriteExternalStateMessage {
    /// Idempotency key: `(session_id, ctx)`.
    pub fn idempotency_key(&self) -> (SessionId, Hash) {
        (self.session_id.clone(), self.ctx.dedup_key())
    }
}

// =============================================================================
// ASSET EXCHANGE
// =============================================================================

/// Open a session bound to a counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    /// Caller-generated session id.
    pub session_id: SessionId,
    /// Remote participant.
    pub counterparty: Counterparty,
    /// Lock terms, when already agreed.
    pub lock_terms: Option<LockTerms>,
}

/// Lock the asset under the session's hash/time lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformLockRequest {
    /// Session.
    pub session_id: SessionId,
    /// Lock terms; required unless the session already carries them.
    pub lock_terms: Option<LockTerms>,
}

/// Create the asset on the counterparty side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAssetRequest {
    /// Session.
    pub session_id: SessionId,
}

/// Cooperatively abort the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtinguishRequest {
    /// Session.
    pub session_id: SessionId,
}

/// Assign the asset to the recipient after a valid claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignAssetRequest {
    /// Session.
    pub session_id: SessionId,
}

/// Reveal the preimage for the session's hash lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Session.
    pub session_id: SessionId,
    /// Candidate preimage.
    pub preimage: Vec<u8>,
    /// Transaction where the claim was observed, if any.
    pub ctx: Option<ContractTransaction>,
}

/// Read a session's status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusRequest {
    /// Session.
    pub session_id: SessionId,
}

// =============================================================================
// REQUEST / RESPONSE SETS
// =============================================================================

/// Every request a driver server accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverRequest {
    /// Ask for a View; the answer arrives via `WriteExternalState`.
    RequestDriverState(Query),
    /// Register an event subscription.
    SubscribeEvent(EventSubscriptionSpec),
    /// Ask the remote to sign the query backing a subscription.
    RequestSignedEventSubscriptionQuery(EventSubscriptionSpec),
    /// Remove a subscription by id.
    UnsubscribeEvent {
        /// Subscription id.
        subscription_id: String,
    },
    /// Deliver a View.
    WriteExternalState(WriteExternalStateMessage),
    /// Open a session.
    OpenSession(OpenSessionRequest),
    /// Lock.
    PerformLock(PerformLockRequest),
    /// Create.
    CreateAsset(CreateAssetRequest),
    /// Abort.
    Extinguish(ExtinguishRequest),
    /// Assign.
    AssignAsset(AssignAssetRequest),
    /// Claim.
    Claim(ClaimRequest),
    /// Status snapshot.
    SessionStatus(SessionStatusRequest),
}

impl DriverRequest {
    /// Schema registry name of the request.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RequestDriverState(_) => "RequestDriverState",
            Self::SubscribeEvent(_) => "SubscribeEvent",
            Self::RequestSignedEventSubscriptionQuery(_) => "RequestSignedEventSubscriptionQuery",
            Self::UnsubscribeEvent { .. } => "UnsubscribeEvent",
            Self::WriteExternalState(_) => "WriteExternalState",
            Self::OpenSession(_) => "OpenSession",
            Self::PerformLock(_) => "PerformLock",
            Self::CreateAsset(_) => "CreateAsset",
            Self::Extinguish(_) => "Extinguish",
            Self::AssignAsset(_) => "AssignAsset",
            Self::Claim(_) => "Claim",
            Self::SessionStatus(_) => "SessionStatus",
        }
    }

    /// Whether re-sending the request is harmless.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Self::RequestDriverState(_))
    }

    /// Session the request is scoped to, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::RequestDriverState(q) => Some(&q.session_id),
            Self::SubscribeEvent(spec) | Self::RequestSignedEventSubscriptionQuery(spec) => {
                spec.owner.as_ref()
            }
            Self::UnsubscribeEvent { .. } => None,
            Self::WriteExternalState(m) => Some(&m.session_id),
            Self::OpenSession(r) => Some(&r.session_id),
            Self::PerformLock(r) => Some(&r.session_id),
            Self::CreateAsset(r) => Some(&r.session_id),
            Self::Extinguish(r) => Some(&r.session_id),
            Self::AssignAsset(r) => Some(&r.session_id),
            Self::Claim(r) => Some(&r.session_id),
            Self::SessionStatus(r) => Some(&r.session_id),
        }
    }
}

/// Every response a driver server returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverResponse {
    /// Plain acknowledgement.
    Ack(Ack),
    /// A signed query (answer to `RequestSignedEventSubscriptionQuery`).
    Query(Query),
    /// A session snapshot (answer to `SessionStatus`).
    Status(SessionStatus),
}

impl DriverResponse {
    /// Schema registry name of the response.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Ack(_) => "Ack",
            Self::Query(_) => "SignedQuery",
            Self::Status(_) => "SessionStatusSnapshot",
        }
    }
}

// =============================================================================
// ACKNOWLEDGEMENT
// =============================================================================

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckStatus {
    /// Accepted.
    Ok,
    /// Rejected; see `code` and `message`.
    Error,
}

/// Error taxonomy carried across the wire so a client can rebuild it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckCode {
    /// A deadline elapsed.
    Timeout,
    /// Context does not match the session's counterparty or ledger.
    Mismatch,
    /// Preimage does not hash to the lock, or no claim was recorded.
    InvalidPreimage,
    /// The session's time lock elapsed.
    Expired,
    /// Ledger connector or remote driver error.
    Remote,
    /// Bytes could not be decoded or verified.
    Decode,
    /// No such session.
    SessionNotFound,
    /// The state machine has no such edge.
    InvalidTransition,
    /// Lock requested without lock terms.
    MissingLockTerms,
    /// Envelope failed authentication.
    Unauthorized,
    /// Anything else.
    Internal,
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Acknowledgement returned by every state-changing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// OK or ERROR.
    pub status: AckStatus,
    /// Human-readable detail.
    pub message: Option<String>,
    /// Error code when `status` is ERROR.
    pub code: Option<AckCode>,
}

impl Ack {
    /// Successful acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: AckStatus::Ok,
            message: None,
            code: None,
        }
    }

    /// Successful acknowledgement with a note.
    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Ok,
            message: Some(message.into()),
            code: None,
        }
    }

    /// Error acknowledgement.
    pub fn error(code: AckCode, message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            message: Some(message.into()),
            code: Some(code),
        }
    }

    /// Whether the request was accepted.
    pub fn is_ok(&self) -> bool {
        self.status == AckStatus::Ok
    }
}
