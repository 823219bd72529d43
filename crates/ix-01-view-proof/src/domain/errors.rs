//! # Domain Errors

use thiserror::Error;

/// Why a View was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Bad magic, unsupported version, truncated or undecodable body.
    #[error("Malformed view: {0}")]
    Malformed(String),

    /// Frame larger than the configured limit.
    #[error("View too large: {size} bytes exceeds limit of {max}")]
    Oversized {
        /// Size of the frame or body.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Notarizations do not satisfy the network's trust anchor.
    #[error("Untrusted view from network {network}: {reason}")]
    Untrusted {
        /// Network declared in the view's meta.
        network: String,
        /// What failed.
        reason: String,
    },
}

impl DecodeError {
    pub(crate) fn untrusted(network: &str, reason: impl Into<String>) -> Self {
        Self::Untrusted {
            network: network.to_string(),
            reason: reason.into(),
        }
    }
}
