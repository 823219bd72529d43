//! # Driver Errors
//!
//! Every component error converts into `DriverError` with `?`. At the
//! server each one becomes an `Ack { status: ERROR, code, message }`; the
//! client turns an error `Ack` back into `DriverError::Remote`.

use super::config::ConfigError;
use ix_01_view_proof::DecodeError;
use ix_02_asset_exchange::AssetExchangeError;
use ix_03_event_subscription::EventSubscriptionError;
use shared_types::{Ack, AckCode, DriverId, MessageError};
use thiserror::Error;

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No route to the driver.
    #[error("driver {0} unreachable")]
    Unreachable(DriverId),

    /// Wire bytes could not be produced or parsed.
    #[error("wire codec error: {0}")]
    Codec(String),
}

impl From<MessageError> for TransportError {
    fn from(e: MessageError) -> Self {
        TransportError::Codec(e.to_string())
    }
}

/// Driver error types.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A deadline elapsed.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The caller gave up on a pending request.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Request context does not match what it claims to answer.
    #[error("context mismatch: {0}")]
    Mismatch(String),

    /// Caller not allowed to make this request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The remote driver answered with an error `Ack`.
    #[error("remote error {code}: {message}")]
    Remote {
        /// Remote error code
        code: AckCode,
        /// Remote message
        message: String,
    },

    /// The response does not fit the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Asset state machine error.
    #[error(transparent)]
    Exchange(#[from] AssetExchangeError),

    /// View decode or verification error.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Subscription manager error.
    #[error(transparent)]
    Subscription(#[from] EventSubscriptionError),

    /// Envelope verification or payload codec error.
    #[error(transparent)]
    Envelope(#[from] MessageError),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DriverError {
    /// Wire code for this error.
    pub fn code(&self) -> AckCode {
        match self {
            Self::Timeout(_) => AckCode::Timeout,
            Self::Cancelled(_) | Self::Config(_) => AckCode::Internal,
            Self::Mismatch(_) => AckCode::Mismatch,
            Self::Unauthorized(_) => AckCode::Unauthorized,
            Self::Remote { code, .. } => *code,
            Self::UnexpectedResponse(_) | Self::Decode(_) => AckCode::Decode,
            Self::Exchange(e) => match e {
                AssetExchangeError::SessionNotFound(_) => AckCode::SessionNotFound,
                AssetExchangeError::InvalidTransition { .. } => AckCode::InvalidTransition,
                AssetExchangeError::InvalidPreimage => AckCode::InvalidPreimage,
                AssetExchangeError::Expired { .. } => AckCode::Expired,
                AssetExchangeError::Mismatch { .. } => AckCode::Mismatch,
                AssetExchangeError::MissingLockTerms(_)
                | AssetExchangeError::InvalidLockTerms(_) => AckCode::MissingLockTerms,
                AssetExchangeError::Remote { .. } => AckCode::Remote,
                AssetExchangeError::Journal(_) => AckCode::Internal,
            },
            Self::Subscription(_) => AckCode::Internal,
            Self::Envelope(e) => match e {
                MessageError::Codec(_)
                | MessageError::UnknownMessageType { .. }
                | MessageError::UnsupportedVersion { .. } => AckCode::Decode,
                _ => AckCode::Unauthorized,
            },
            Self::Transport(_) => AckCode::Remote,
        }
    }

    /// Whether resending an idempotent request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Remote { code, .. } => *code == AckCode::Timeout,
            Self::Exchange(e) => matches!(e, AssetExchangeError::Remote { retryable: true, .. }),
            _ => false,
        }
    }

    /// Error `Ack` for this error.
    pub fn to_ack(&self) -> Ack {
        Ack::error(self.code(), self.to_string())
    }

    /// Rebuild the remote taxonomy from an error `Ack`; `Ok` passes through.
    pub fn check_ack(ack: Ack) -> Result<Ack, DriverError> {
        if ack.is_ok() {
            return Ok(ack);
        }
        Err(Self::Remote {
            code: ack.code.unwrap_or(AckCode::Internal),
            message: ack.message.unwrap_or_default(),
        })
    }
}
