//! # Core Domain Entities
//!
//! Defines the entities exchanged between interop drivers.
//!
//! ## Clusters
//!
//! - **Identity**: `SessionId`, `DriverId`, `LedgerRef`, `Counterparty`
//! - **Evidence**: `View`, `ViewMeta`, `ViewPayload`, `Notarization`,
//!   `ContractTransaction`, `StatePayload`
//! - **Queries**: `Query`, `EventQuery`, `EventSubscriptionSpec`
//! - **Assets**: `AssetDescriptor`, `AssetAmount`, `LockTerms`
//! - **Lifecycle**: `SessionState`, `AssetStatus`, `SessionStatus`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// Re-export U256 from primitive-types for fungible amounts
pub use primitive_types::U256;

/// A 32-byte digest (SHA-256 or BLAKE3).
pub type Hash = [u8; 32];

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Caller-generated, globally unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a driver (one per ledger-side participant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(String);

impl DriverId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a ledger inside a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRef {
    /// Network the ledger belongs to (also the trust-anchor key).
    pub network: String,
    /// Ledger (channel, chain, parachain) inside the network.
    pub ledger: String,
}

impl LedgerRef {
    /// Create a ledger reference.
    pub fn new(network: impl Into<String>, ledger: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ledger: ledger.into(),
        }
    }
}

impl fmt::Display for LedgerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.ledger)
    }
}

/// The remote participant a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    /// Remote driver.
    pub driver: DriverId,
    /// Remote ledger; every context-bearing request must name it.
    pub ledger: LedgerRef,
}

// =============================================================================
// CLUSTER B: EVIDENCE
// =============================================================================

/// Ledger family that produced a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerProtocol {
    /// Ethereum mainnet or testnets.
    Ethereum,
    /// Hyperledger Besu.
    Besu,
    /// Polkadot / Substrate.
    Polkadot,
    /// Hyperledger Fabric.
    Fabric,
    /// Corda.
    Corda,
}

/// Metadata of the transaction that produced a view.
///
/// Binds a view to one on-chain event and is the dedup key for notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractTransaction {
    /// Ledger the event was emitted on.
    pub ledger: LedgerRef,
    /// Emitting contract address.
    pub contract_address: String,
    /// Event name (topic).
    pub event_name: String,
    /// Block number containing the transaction.
    pub block_ref: u64,
    /// Transaction identifier.
    pub tx_id: String,
}

impl ContractTransaction {
    /// Stable digest over every field, used as the dedup/idempotency key.
    pub fn dedup_key(&self) -> Hash {
        let mut hasher = Sha256::new();
        put_str(&mut hasher, &self.ledger.network);
        put_str(&mut hasher, &self.ledger.ledger);
        put_str(&mut hasher, &self.contract_address);
        put_str(&mut hasher, &self.event_name);
        hasher.update(self.block_ref.to_be_bytes());
        put_str(&mut hasher, &self.tx_id);
        hasher.finalize().into()
    }
}

/// Closed set of ledger state shapes a driver can return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatePayload {
    /// Unstructured bytes, interpreted by the application.
    Opaque(Vec<u8>),
    /// A hash-lock preimage revealed on-chain by a claim.
    Preimage(Vec<u8>),
    /// Receipt of an applied lock.
    LockReceipt {
        /// Ledger transaction reference.
        tx_ref: String,
    },
    /// Structured contract call output, as JSON text.
    Json(String),
    /// A fungible balance.
    Balance(U256),
}

impl StatePayload {
    /// Build a JSON payload from a value.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::Json(value.to_string())
    }

    /// Parse a JSON payload back into a value.
    pub fn as_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Json(text) => serde_json::from_str(text).ok(),
            _ => None,
        }
    }

    fn digest_into(&self, hasher: &mut Sha256) {
        match self {
            Self::Opaque(bytes) => {
                hasher.update([0u8]);
                put_bytes(hasher, bytes);
            }
            Self::Preimage(bytes) => {
                hasher.update([1u8]);
                put_bytes(hasher, bytes);
            }
            Self::LockReceipt { tx_ref } => {
                hasher.update([2u8]);
                put_str(hasher, tx_ref);
            }
            Self::Json(text) => {
                hasher.update([3u8]);
                put_str(hasher, text);
            }
            Self::Balance(amount) => {
                hasher.update([4u8]);
                let mut buf = [0u8; 32];
                amount.to_big_endian(&mut buf);
                hasher.update(buf);
            }
        }
    }
}

/// Signature scheme used by a notarizing network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// Ed25519 (32-byte keys, 64-byte signatures).
    Ed25519,
    /// secp256k1 ECDSA (33-byte compressed keys, 64-byte r||s signatures).
    Secp256k1,
}

/// One attestation over a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notarization {
    /// Organization or node that signed.
    pub signer_id: String,
    /// Scheme of `public_key` / `signature`.
    pub scheme: SignatureScheme,
    /// Signer public key (checked against the trust anchor).
    pub public_key: Vec<u8>,
    /// Signature over `View::signing_digest`.
    pub signature: Vec<u8>,
}

/// Which network produced a view and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMeta {
    /// Originating network (selects the trust anchor).
    pub network_id: String,
    /// Ledger family.
    pub protocol: LedgerProtocol,
    /// Unix seconds at notarization.
    pub timestamp: u64,
}

/// State bytes plus the attestations over them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPayload {
    /// The state.
    pub data: StatePayload,
    /// Attestations; empty until notarized.
    pub notarizations: Vec<Notarization>,
}

/// A signed snapshot of remote ledger state plus its binding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Network and time of notarization.
    pub meta: ViewMeta,
    /// Transaction that produced the state.
    pub contract_context: ContractTransaction,
    /// State and attestations.
    pub payload: ViewPayload,
}

impl View {
    /// Digest every notarization signs: meta, context and data, not the
    /// notarizations themselves.
    pub fn signing_digest(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(b"ix-view-v1");
        put_str(&mut hasher, &self.meta.network_id);
        hasher.update([self.meta.protocol as u8]);
        hasher.update(self.meta.timestamp.to_be_bytes());
        hasher.update(self.contract_context.dedup_key());
        self.payload.data.digest_into(&mut hasher);
        hasher.finalize().into()
    }

    /// Whether the view carries at least one attestation.
    pub fn is_notarized(&self) -> bool {
        !self.payload.notarizations.is_empty()
    }
}

// =============================================================================
// CLUSTER C: QUERIES AND SUBSCRIPTIONS
// =============================================================================

/// A state query addressed to a remote driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Correlates the async `WriteExternalState` answer with the request.
    pub request_id: String,
    /// Session on whose behalf the query runs.
    pub session_id: SessionId,
    /// Driver that will receive the answer.
    pub requesting_driver: DriverId,
    /// Ledger to read.
    pub target: LedgerRef,
    /// Contract/function address, e.g. `htlc:getLock:asset-7`.
    pub address: String,
    /// Freshness nonce.
    pub nonce: String,
    /// Signature by the issuing driver, when signed.
    pub signature: Option<Vec<u8>>,
    /// Public key of the signer, when signed.
    pub certificate: Option<Vec<u8>>,
}

impl Query {
    /// Key under which a newer view supersedes an older one.
    pub fn view_key(&self) -> String {
        format!("{}#{}", self.target, self.address)
    }

    /// Digest the issuing driver signs.
    pub fn signing_digest(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(b"ix-query-v1");
        put_str(&mut hasher, &self.request_id);
        put_str(&mut hasher, self.session_id.as_str());
        put_str(&mut hasher, self.requesting_driver.as_str());
        put_str(&mut hasher, &self.target.network);
        put_str(&mut hasher, &self.target.ledger);
        put_str(&mut hasher, &self.address);
        put_str(&mut hasher, &self.nonce);
        hasher.finalize().into()
    }
}

/// Inclusive lexicographic range over contract addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    /// Lowest address included.
    pub start: String,
    /// Highest address included.
    pub end: String,
}

impl AddressRange {
    /// Whether `address` falls inside the range.
    pub fn contains(&self, address: &str) -> bool {
        self.start.as_str() <= address && address <= self.end.as_str()
    }
}

/// Filter over remote ledger events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventQuery {
    /// Ledger to watch.
    pub ledger: LedgerRef,
    /// Exact contract address; `None` matches any.
    pub contract_address: Option<String>,
    /// Exact event name; `None` matches any.
    pub event_name: Option<String>,
    /// Address range; `None` matches any.
    pub address_range: Option<AddressRange>,
}

impl EventQuery {
    /// Whether an emitted event matches this filter.
    pub fn matches(&self, ctx: &ContractTransaction) -> bool {
        if self.ledger != ctx.ledger {
            return false;
        }
        if let Some(contract) = &self.contract_address {
            if contract != &ctx.contract_address {
                return false;
            }
        }
        if let Some(event) = &self.event_name {
            if event != &ctx.event_name {
                return false;
            }
        }
        match &self.address_range {
            Some(range) => range.contains(&ctx.contract_address),
            None => true,
        }
    }
}

/// Where notifications for a subscription go.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryTarget {
    /// A local session's state machine.
    Session(SessionId),
    /// A remote driver, called back with `WriteExternalState`.
    Callback(DriverId),
}

/// A standing registration for remote event notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscriptionSpec {
    /// Event filter.
    pub query: EventQuery,
    /// Delivery target.
    pub target: DeliveryTarget,
    /// Session whose terminal state tears the subscription down.
    pub owner: Option<SessionId>,
}

impl EventSubscriptionSpec {
    /// Deterministic id: identical `(query, target)` pairs map to one id on
    /// every driver.
    pub fn subscription_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"ix-sub-v1");
        put_str(&mut hasher, &self.query.ledger.network);
        put_str(&mut hasher, &self.query.ledger.ledger);
        put_opt(&mut hasher, self.query.contract_address.as_deref());
        put_opt(&mut hasher, self.query.event_name.as_deref());
        match &self.query.address_range {
            Some(range) => {
                hasher.update([1u8]);
                put_str(&mut hasher, &range.start);
                put_str(&mut hasher, &range.end);
            }
            None => hasher.update([0u8]),
        }
        match &self.target {
            DeliveryTarget::Session(id) => {
                hasher.update([0u8]);
                put_str(&mut hasher, id.as_str());
            }
            DeliveryTarget::Callback(driver) => {
                hasher.update([1u8]);
                put_str(&mut hasher, driver.as_str());
            }
        }
        let digest: Hash = hasher.finalize().into();
        format!("sub-{}", hex::encode(&digest[..16]))
    }
}

// =============================================================================
// CLUSTER D: ASSETS
// =============================================================================

/// Ledger-agreed digest function for hash locks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256 (EVM-compatible HTLC contracts).
    #[default]
    Sha256,
    /// BLAKE3.
    Blake3,
}

/// What is being locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetAmount {
    /// Fungible quantity.
    Fungible(U256),
    /// Non-fungible token reference.
    Token(String),
}

/// Description of the asset under coordination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Asset identifier on the origin ledger.
    pub asset_id: String,
    /// Owner before the lock.
    pub owner: String,
    /// Party that receives the asset on assignment.
    pub recipient: String,
    /// Amount or token reference.
    pub amount: AssetAmount,
    /// Ledger holding the asset.
    pub origin_ledger: LedgerRef,
}

/// Hash-lock / time-lock pair plus the asset they guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockTerms {
    /// Digest the claimant must reveal a preimage for.
    pub hash_lock: Hash,
    /// Digest function for `hash_lock`.
    pub digest: DigestAlgorithm,
    /// Absolute deadline, unix seconds.
    pub time_lock: u64,
    /// Locked asset.
    pub asset: AssetDescriptor,
}

// =============================================================================
// CLUSTER E: LIFECYCLE
// =============================================================================

/// Session state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing locked yet.
    #[default]
    Initiated,
    /// Lock submitted to the ledger, awaiting confirmation.
    LockRequested,
    /// Lock applied.
    Locked,
    /// Asset created on the counterparty side.
    AssetCreated,
    /// Valid preimage revealed before the deadline.
    ClaimPending,
    /// Asset assigned to the recipient (success).
    Assigned,
    /// Cooperatively aborted.
    Extinguished,
    /// Unrecoverable remote error.
    Failed,
    /// Deadline elapsed, asset reverted.
    Expired,
}

impl SessionState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (self, next) {
            (Self::Initiated, Self::LockRequested) => true,
            (Self::LockRequested, Self::Locked) => true,
            (Self::Locked, Self::AssetCreated) => true,
            (Self::AssetCreated, Self::ClaimPending) => true,
            (Self::ClaimPending, Self::Assigned) => true,
            (Self::Locked | Self::AssetCreated, Self::Extinguished) => true,
            (from, Self::Expired) => from.is_expirable(),
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Assigned | Self::Extinguished | Self::Failed | Self::Expired
        )
    }

    /// Whether the time lock still applies. Every non-terminal state,
    /// `ClaimPending` included, expires.
    pub fn is_expirable(&self) -> bool {
        !self.is_terminal()
    }

    /// Position along the success path (`Initiated` .. `Assigned`).
    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::Initiated => Some(0),
            Self::LockRequested => Some(1),
            Self::Locked => Some(2),
            Self::AssetCreated => Some(3),
            Self::ClaimPending => Some(4),
            Self::Assigned => Some(5),
            Self::Extinguished | Self::Failed | Self::Expired => None,
        }
    }

    /// Upper-case protocol name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::LockRequested => "LOCK_REQUESTED",
            Self::Locked => "LOCKED",
            Self::AssetCreated => "ASSET_CREATED",
            Self::ClaimPending => "CLAIM_PENDING",
            Self::Assigned => "ASSIGNED",
            Self::Extinguished => "EXTINGUISHED",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the asset record driven by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetStatus {
    /// Locked under the hash/time lock.
    Locked,
    /// Created on the counterparty side.
    Created,
    /// Assigned to the recipient.
    Assigned,
    /// Destroyed by a cooperative abort.
    Extinguished,
    /// Returned to its pre-lock owner after expiry.
    Reverted,
}

/// Read-only snapshot of a session, returned by status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session.
    pub session_id: SessionId,
    /// Current state.
    pub state: SessionState,
    /// Asset record status, once locked.
    pub asset_status: Option<AssetStatus>,
    /// Current asset owner, once locked.
    pub asset_owner: Option<String>,
    /// Reason recorded on terminal entry.
    pub failure_reason: Option<String>,
}

// =============================================================================
// DIGEST HELPERS
// =============================================================================

fn put_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn put_str(hasher: &mut Sha256, s: &str) {
    put_bytes(hasher, s.as_bytes());
}

fn put_opt(hasher: &mut Sha256, s: Option<&str>) {
    match s {
        Some(s) => {
            hasher.update([1u8]);
            put_str(hasher, s);
        }
        None => hasher.update([0u8]),
    }
}
