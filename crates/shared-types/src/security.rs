//! # Envelope Security
//!
//! The single implementation of driver envelope validation. Every driver
//! server runs inbound envelopes through `EnvelopeVerifier` before dispatch.
//!
//! ## Security Properties
//!
//! - **HMAC-SHA256 Seals**: Envelopes are sealed with a per-driver key
//! - **Time-Bounded Validity**: Envelopes expire after `max_age` seconds
//! - **Nonce Replay Prevention**: Each nonce is valid only once within the window
//! - **Known Types Only**: Tags missing from the schema registry are rejected

use crate::entities::DriverId;
use crate::envelope::DriverEnvelope;
use crate::errors::MessageError;
use crate::registry::schema_registry;
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default allowed clock skew for future timestamps (seconds).
pub const MAX_FUTURE_SKEW: u64 = 10;

/// Default maximum age for valid timestamps (seconds).
pub const MAX_AGE: u64 = 60;

/// Duration to retain nonces in cache (2x the validity window).
pub const NONCE_CACHE_TTL: Duration = Duration::from_secs(120);

/// Maximum nonce cache size before forced cleanup.
pub const MAX_NONCE_CACHE_SIZE: usize = 100_000;

// =============================================================================
// NONCE CACHE
// =============================================================================

/// Thread-safe nonce cache for replay prevention.
///
/// Expired nonces are evicted once the cache reaches its size bound.
#[derive(Debug)]
pub struct NonceCache {
    cache: RwLock<HashMap<Uuid, Instant>>,
    ttl: Duration,
}

impl NonceCache {
    /// Creates a new empty nonce cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(NONCE_CACHE_TTL)
    }

    /// Creates a nonce cache retaining entries for `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates a nonce cache wrapped in Arc for shared ownership.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns `true` if the nonce is fresh (and records it), `false` on replay.
    pub fn check_and_insert(&self, nonce: Uuid) -> bool {
        let now = Instant::now();
        let mut cache = self.cache.write();

        if cache.len() >= MAX_NONCE_CACHE_SIZE {
            cache.retain(|_, exp| *exp > now);
        }

        if let Some(&exp) = cache.get(&nonce) {
            if exp > now {
                return false;
            }
        }

        cache.insert(nonce, now + self.ttl);
        true
    }

    /// Returns the current number of cached nonces.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NonceCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HMAC
// =============================================================================

/// Validates an HMAC-SHA256 seal in constant time.
pub fn validate_hmac_signature(message_bytes: &[u8], seal: &[u8; 32], shared_secret: &[u8]) -> bool {
    let mut mac = match HmacSha256::new_from_slice(shared_secret) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(message_bytes);
    mac.verify_slice(seal).is_ok()
}

/// Computes an HMAC-SHA256 seal.
pub fn sign_message(message_bytes: &[u8], shared_secret: &[u8]) -> Result<[u8; 32], MessageError> {
    let mut mac =
        HmacSha256::new_from_slice(shared_secret).map_err(|_| MessageError::InvalidSeal)?;
    mac.update(message_bytes);
    Ok(mac.finalize().into_bytes().into())
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Validates `now - max_age <= timestamp <= now + max_future_skew`.
pub fn validate_timestamp(
    timestamp: u64,
    now: u64,
    max_age: u64,
    max_future_skew: u64,
) -> Result<(), MessageError> {
    if timestamp.saturating_add(max_age) < now || timestamp > now.saturating_add(max_future_skew)
    {
        return Err(MessageError::TimestampOutOfRange { timestamp, now });
    }
    Ok(())
}

/// Returns the current Unix timestamp, or 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// KEYS
// =============================================================================

/// Retrieves the shared secret used to seal a driver's envelopes.
pub trait KeyProvider: Send + Sync {
    /// `None` if the driver is unknown (reject).
    fn shared_secret(&self, driver: &DriverId) -> Option<Vec<u8>>;
}

/// Derives per-driver keys from a network master secret.
#[derive(Clone)]
pub struct DerivedKeyProvider {
    master_secret: Vec<u8>,
}

impl DerivedKeyProvider {
    /// Creates a new key provider with the given master secret.
    pub fn new(master_secret: Vec<u8>) -> Self {
        Self { master_secret }
    }
}

impl KeyProvider for DerivedKeyProvider {
    fn shared_secret(&self, driver: &DriverId) -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.master_secret).ok()?;
        mac.update(b"ix-driver-key");
        mac.update(driver.as_str().as_bytes());
        Some(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for DerivedKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKeyProvider([REDACTED])")
    }
}

// =============================================================================
// ENVELOPE VERIFIER
// =============================================================================

/// Performs every envelope check, in order:
///
/// 1. Version
/// 2. Registered message type
/// 3. Recipient
/// 4. Timestamp window
/// 5. Seal
/// 6. Nonce (only after the seal, so forged envelopes cannot burn nonces)
pub struct EnvelopeVerifier<K: KeyProvider> {
    local: DriverId,
    nonce_cache: Arc<NonceCache>,
    key_provider: K,
    max_age: u64,
    max_future_skew: u64,
}

impl<K: KeyProvider> EnvelopeVerifier<K> {
    /// Creates a verifier for envelopes addressed to `local`.
    pub fn new(local: DriverId, nonce_cache: Arc<NonceCache>, key_provider: K) -> Self {
        Self {
            local,
            nonce_cache,
            key_provider,
            max_age: MAX_AGE,
            max_future_skew: MAX_FUTURE_SKEW,
        }
    }

    /// Overrides the timestamp window.
    pub fn with_window(mut self, max_age: u64, max_future_skew: u64) -> Self {
        self.max_age = max_age;
        self.max_future_skew = max_future_skew;
        self
    }

    /// Verifies an inbound envelope.
    pub fn verify(&self, envelope: &DriverEnvelope) -> Result<(), MessageError> {
        if envelope.version != DriverEnvelope::CURRENT_VERSION {
            return Err(MessageError::UnsupportedVersion {
                received: envelope.version,
                supported: DriverEnvelope::CURRENT_VERSION,
            });
        }

        if schema_registry().by_tag(envelope.message_type).is_none() {
            return Err(MessageError::UnknownMessageType {
                tag: envelope.message_type,
            });
        }

        if envelope.recipient != self.local {
            return Err(MessageError::Misrouted {
                recipient: envelope.recipient.to_string(),
                local: self.local.to_string(),
            });
        }

        validate_timestamp(
            envelope.timestamp,
            current_timestamp(),
            self.max_age,
            self.max_future_skew,
        )?;

        let secret = self
            .key_provider
            .shared_secret(&envelope.sender)
            .ok_or_else(|| MessageError::UnknownSender {
                sender: envelope.sender.to_string(),
            })?;
        if !validate_hmac_signature(&envelope.signing_bytes()?, &envelope.seal, &secret) {
            return Err(MessageError::InvalidSeal);
        }

        if !self.nonce_cache.check_and_insert(envelope.nonce) {
            return Err(MessageError::ReplayDetected {
                nonce: envelope.nonce.to_string(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
