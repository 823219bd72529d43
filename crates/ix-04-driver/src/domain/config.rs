//! Driver configuration with validation.
//!
//! Loaded from TOML, then overridden from `IX_*` environment variables,
//! then validated before the node starts. Every timing constant lives here.

use ix_01_view_proof::{NotaryKey, TrustAnchor};
use ix_02_asset_exchange::AssetExchangeConfig;
use ix_03_event_subscription::SubscriptionConfig;
use serde::{Deserialize, Serialize};
use shared_types::{DriverId, LedgerProtocol, LedgerRef, SignatureScheme};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "IX_";

/// Shortest master secret accepted, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Main driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// This driver's id on the relay network
    pub driver_id: String,
    /// Network this driver serves
    pub network_id: String,
    /// Ledger name within the network
    pub ledger: String,
    /// Ledger family, stamped on served views
    pub protocol: LedgerProtocol,
    /// Hex master secret shared by the relay network; per-driver envelope
    /// keys are derived from it
    pub master_secret: String,
    /// Reject state queries that carry no valid signature
    pub require_signed_queries: bool,
    /// Expiry sweeper period
    pub sweep_interval_secs: u64,
    /// Timeouts
    pub timeouts: TimeoutConfig,
    /// Client retries
    pub retry: RetryPolicy,
    /// Notification delivery
    pub delivery: DeliveryConfig,
    /// Signing key for served views and queries
    pub notary: NotaryConfig,
    /// Accepted signers per remote network
    pub trust_anchors: Vec<TrustAnchor>,
    /// Asset state machine
    pub asset_exchange: AssetExchangeConfig,
    /// Subscription manager
    pub subscriptions: SubscriptionConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver_id: "driver-local".to_string(),
            network_id: "local-net".to_string(),
            ledger: "main".to_string(),
            protocol: LedgerProtocol::Fabric,
            master_secret: String::new(),
            require_signed_queries: false,
            sweep_interval_secs: 5,
            timeouts: TimeoutConfig::default(),
            retry: RetryPolicy::default(),
            delivery: DeliveryConfig::default(),
            notary: NotaryConfig::default(),
            trust_anchors: Vec::new(),
            asset_exchange: AssetExchangeConfig::default(),
            subscriptions: SubscriptionConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&raw)
    }

    /// Parse TOML text; missing fields take their defaults.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `IX_*` overrides from `vars` (normally `std::env::vars()`).
    /// Returns the names that were applied.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<Vec<String>, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = Vec::new();
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "DRIVER_ID" => self.driver_id = value,
                "NETWORK_ID" => self.network_id = value,
                "LEDGER" => self.ledger = value,
                "MASTER_SECRET" => self.master_secret = value,
                "NOTARY_SEED" => self.notary.seed = value,
                "REQUEST_TIMEOUT_MS" => self.timeouts.request_ms = parse_var(&name, &value)?,
                "VIEW_DEADLINE_MS" => self.timeouts.view_deadline_ms = parse_var(&name, &value)?,
                "RETRY_MAX_ATTEMPTS" => self.retry.max_attempts = parse_var(&name, &value)?,
                "SWEEP_INTERVAL_SECS" => self.sweep_interval_secs = parse_var(&name, &value)?,
                "LAZY_SESSIONS" => {
                    self.asset_exchange.lazy_session_creation = parse_var(&name, &value)?
                }
                "REQUIRE_SIGNED_QUERIES" => {
                    self.require_signed_queries = parse_var(&name, &value)?
                }
                _ => continue,
            }
            applied.push(name);
        }
        Ok(applied)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver_id.trim().is_empty() {
            return Err(ConfigError::Invalid("driver_id cannot be empty".into()));
        }
        if self.network_id.trim().is_empty() || self.ledger.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "network_id and ledger cannot be empty".into(),
            ));
        }
        let secret = self.master_secret_bytes()?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidSecret(format!(
                "master_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.timeouts.request_ms == 0 || self.timeouts.view_deadline_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request and view deadline timeouts cannot be 0".into(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval_secs cannot be 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 || self.delivery.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts cannot be 0".into()));
        }
        if !self.notary.seed.is_empty() {
            self.notary.seed_bytes()?;
        }
        for anchor in &self.trust_anchors {
            if anchor.threshold == 0 {
                return Err(ConfigError::Invalid(format!(
                    "trust anchor for {} has threshold 0",
                    anchor.network_id
                )));
            }
            if !anchor.is_satisfiable() {
                return Err(ConfigError::Invalid(format!(
                    "trust anchor for {} needs {} signers but lists {} keys",
                    anchor.network_id,
                    anchor.threshold,
                    anchor.keys.len()
                )));
            }
        }
        Ok(())
    }

    /// This driver's id
    pub fn driver(&self) -> DriverId {
        DriverId::new(self.driver_id.clone())
    }

    /// The ledger this driver fronts
    pub fn ledger_ref(&self) -> LedgerRef {
        LedgerRef::new(self.network_id.clone(), self.ledger.clone())
    }

    /// Decoded master secret
    pub fn master_secret_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        hex::decode(self.master_secret.trim())
            .map_err(|e| ConfigError::InvalidSecret(format!("master_secret: {e}")))
    }

    /// Notary key from the configured seed, or a fresh one when no seed is
    /// set.
    pub fn notary_key(&self) -> Result<NotaryKey, ConfigError> {
        if self.notary.seed.is_empty() {
            return Ok(NotaryKey::generate(self.notary.scheme));
        }
        NotaryKey::from_seed(self.notary.scheme, self.notary.seed_bytes()?)
            .map_err(|e| ConfigError::InvalidSecret(format!("notary seed: {e}")))
    }

    /// Signer id for the notary, defaulting to the driver id.
    pub fn notary_signer(&self) -> String {
        if self.notary.signer_id.is_empty() {
            self.driver_id.clone()
        } else {
            self.notary.signer_id.clone()
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on one request/response exchange
    pub request_ms: u64,
    /// Default wait for a `RequestDriverState` answer
    pub view_deadline_ms: u64,
    /// Oldest envelope accepted
    pub envelope_max_age_secs: u64,
    /// Furthest future envelope timestamp accepted
    pub envelope_future_skew_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 5_000,
            view_deadline_ms: 30_000,
            envelope_max_age_secs: shared_types::MAX_AGE,
            envelope_future_skew_secs: shared_types::MAX_FUTURE_SKEW,
        }
    }
}

impl TimeoutConfig {
    /// Request timeout as a `Duration`
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    /// View deadline as a `Duration`
    pub fn view_deadline(&self) -> Duration {
        Duration::from_millis(self.view_deadline_ms)
    }
}

/// Retry policy for idempotent client calls that time out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts in total, first one included
    pub max_attempts: u32,
    /// Backoff before the first retry
    pub initial_backoff_ms: u64,
    /// Backoff ceiling
    pub max_backoff_ms: u64,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Random extra delay, up to this many milliseconds
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            multiplier: 2.0,
            jitter_ms: 0,
        }
    }
}

/// Notification delivery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Attempts before a notification goes to the dead letter topic
    pub max_attempts: u32,
    /// Backoff between attempts
    pub retry: RetryPolicy,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry: RetryPolicy {
                initial_backoff_ms: 200,
                max_backoff_ms: 5_000,
                ..RetryPolicy::default()
            },
        }
    }
}

/// Notary configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryConfig {
    /// Signer name; empty means the driver id
    pub signer_id: String,
    /// Key scheme
    pub scheme: SignatureScheme,
    /// Hex 32-byte seed; empty generates a key at startup
    pub seed: String,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            signer_id: String::new(),
            scheme: SignatureScheme::Ed25519,
            seed: String::new(),
        }
    }
}

impl NotaryConfig {
    fn seed_bytes(&self) -> Result<[u8; 32], ConfigError> {
        let bytes = hex::decode(self.seed.trim())
            .map_err(|e| ConfigError::InvalidSecret(format!("notary seed: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| ConfigError::InvalidSecret("notary seed must be 32 bytes".into()))
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {reason}")]
    Io {
        /// Path given
        path: String,
        /// OS error
        reason: String,
    },
    /// TOML did not parse
    #[error("cannot parse config: {0}")]
    Parse(String),
    /// Environment override did not parse
    #[error("invalid value for {name}: {value}")]
    InvalidOverride {
        /// Variable name
        name: String,
        /// Value given
        value: String,
    },
    /// Bad key material
    #[error("invalid secret: {0}")]
    InvalidSecret(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
        name: name.to_string(),
        value: value.to_string(),
    })
}
