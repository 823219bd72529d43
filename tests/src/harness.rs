//! # Test Harness
//!
//! Drivers wired the way `node-runtime` wires them, except that each gets an
//! in-memory ledger and a manual clock so tests can move time.
//!
//! Seeds double as identities: driver `n` notarizes with `[n; 32]`, and
//! every driver trusts the networks it is told to trust by seed.

use std::sync::Arc;
use std::time::Duration;

use ix_01_view_proof::{Notary, NotaryKey, TrustAnchor};
use ix_02_asset_exchange::{
    create_hash_lock, AssetExchangeApi, AssetExchangeService, InMemoryLedgerConnector,
    ManualClock, Preimage,
};
use ix_04_driver::{DriverClient, DriverConfig, DriverNode, InMemoryNetwork, NotaryConfig};
use shared_types::{
    AssetAmount, AssetDescriptor, ContractTransaction, Counterparty, DigestAlgorithm, DriverId,
    LedgerProtocol, LedgerRef, LockTerms, OpenSessionRequest, SessionId, StatePayload, View,
    ViewMeta, ViewPayload, U256,
};

/// Shared master secret every test driver derives its channel keys from.
pub const MASTER: &[u8] = b"relay-network-master-secret";

/// Start time of every manual clock.
pub const GENESIS: u64 = 1_700_000_000;

/// Time lock used by `lock_terms`, seconds after `GENESIS`.
pub const LOCK_TTL: u64 = 3_600;

/// Who a driver is and which networks it trusts.
#[derive(Clone, Debug)]
pub struct Identity {
    /// Driver id
    pub driver: &'static str,
    /// Network the driver fronts
    pub network: &'static str,
    /// Notary seed byte
    pub seed: u8,
}

/// `driver-a` on `net-a`.
pub const A: Identity = Identity {
    driver: "driver-a",
    network: "net-a",
    seed: 1,
};

/// `driver-b` on `net-b`.
pub const B: Identity = Identity {
    driver: "driver-b",
    network: "net-b",
    seed: 2,
};

/// `driver-c` on `net-c`; nobody trusts it unless told to.
pub const C: Identity = Identity {
    driver: "driver-c",
    network: "net-c",
    seed: 3,
};

/// Notary an identity signs with.
pub fn notary(identity: &Identity) -> Notary {
    Notary::new(
        identity.driver,
        NotaryKey::ed25519_from_seed([identity.seed; 32]),
    )
}

/// Configuration for `identity`, trusting the networks of `trusted`.
/// Timeouts are short so failure paths finish quickly.
pub fn config(identity: &Identity, trusted: &[&Identity]) -> DriverConfig {
    let mut config = DriverConfig {
        driver_id: identity.driver.into(),
        network_id: identity.network.into(),
        ledger: "main".into(),
        master_secret: hex::encode(MASTER),
        notary: NotaryConfig {
            seed: hex::encode([identity.seed; 32]),
            ..NotaryConfig::default()
        },
        trust_anchors: trusted
            .iter()
            .map(|peer| TrustAnchor::new(peer.network, 1, vec![notary(peer).trusted_key()]))
            .collect(),
        ..DriverConfig::default()
    };
    config.timeouts.request_ms = 500;
    config.retry.initial_backoff_ms = 10;
    config.retry.max_backoff_ms = 50;
    config.delivery.retry.initial_backoff_ms = 10;
    config.delivery.retry.max_backoff_ms = 50;
    config
}

/// A running driver with handles on its ledger and clock.
pub struct Driver {
    /// The node
    pub node: Arc<DriverNode>,
    /// Ledger behind the node
    pub ledger: Arc<InMemoryLedgerConnector>,
    /// Clock of the node's state machine
    pub clock: Arc<ManualClock>,
}

impl Driver {
    /// Build `config` on `network`, attach and start it.
    pub fn spawn(
        network: &Arc<InMemoryNetwork>,
        config: DriverConfig,
        ledger: InMemoryLedgerConnector,
    ) -> Self {
        let ledger = Arc::new(ledger);
        let clock = Arc::new(ManualClock::new(GENESIS));
        let node = DriverNode::builder(config)
            .transport(network.clone())
            .connector(ledger.clone())
            .clock(clock.clone())
            .build()
            .expect("driver builds");
        node.attach(network);
        node.start();
        Self {
            node,
            ledger,
            clock,
        }
    }

    /// Driver id
    pub fn id(&self) -> &DriverId {
        self.node.id()
    }

    /// Ledger the driver fronts
    pub fn ledger_ref(&self) -> LedgerRef {
        self.node.config().ledger_ref()
    }

    /// This driver as someone else's counterparty
    pub fn as_counterparty(&self) -> Counterparty {
        Counterparty {
            driver: self.id().clone(),
            ledger: self.ledger_ref(),
        }
    }

    /// Driver client
    pub fn client(&self) -> &Arc<DriverClient> {
        self.node.client()
    }

    /// Asset state machine
    pub fn exchange(&self) -> &Arc<AssetExchangeService> {
        self.node.exchange()
    }
}

/// Two drivers that trust each other.
pub struct TwoDrivers {
    /// Shared transport
    pub network: Arc<InMemoryNetwork>,
    /// Initiator
    pub a: Driver,
    /// Holder of the asset ledger
    pub b: Driver,
}

impl TwoDrivers {
    /// Default pair; B confirms locks at once.
    pub fn new() -> Self {
        Self::build(|_| {}, InMemoryLedgerConnector::new())
    }

    /// Pair with `tweak` applied to both configs and `a_ledger` behind A.
    pub fn build(tweak: impl Fn(&mut DriverConfig), a_ledger: InMemoryLedgerConnector) -> Self {
        let network = InMemoryNetwork::new();
        let mut config_a = config(&A, &[&B]);
        let mut config_b = config(&B, &[&A]);
        tweak(&mut config_a);
        tweak(&mut config_b);
        let a = Driver::spawn(&network, config_a, a_ledger);
        let b = Driver::spawn(&network, config_b, InMemoryLedgerConnector::new());
        Self { network, a, b }
    }

    /// Third driver on the same network, trusting `trusted`.
    pub fn join(&self, identity: &Identity, trusted: &[&Identity]) -> Driver {
        Driver::spawn(
            &self.network,
            config(identity, trusted),
            InMemoryLedgerConnector::new(),
        )
    }

    /// Open `id` on A locally and on B through A's client, both sides
    /// carrying `terms`.
    pub async fn open_session(&self, id: &str, terms: Option<LockTerms>) -> SessionId {
        let session = SessionId::new(id);
        self.a
            .exchange()
            .open_session(session.clone(), self.b.as_counterparty(), terms.clone())
            .await
            .expect("local open");
        let ack = self
            .a
            .client()
            .open_session(
                self.b.id(),
                OpenSessionRequest {
                    session_id: session.clone(),
                    counterparty: self.a.as_counterparty(),
                    lock_terms: terms,
                },
            )
            .await
            .expect("remote open");
        assert!(ack.is_ok());
        session
    }
}

impl Default for TwoDrivers {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock terms for an asset held on `holder`'s ledger, hash-locked to
/// `preimage` and expiring `LOCK_TTL` after `GENESIS`.
pub fn lock_terms(holder: &Driver, asset_id: &str, preimage: &Preimage) -> LockTerms {
    LockTerms {
        hash_lock: create_hash_lock(DigestAlgorithm::Sha256, preimage.as_bytes()),
        digest: DigestAlgorithm::Sha256,
        time_lock: GENESIS + LOCK_TTL,
        asset: AssetDescriptor {
            asset_id: asset_id.into(),
            owner: "alice".into(),
            recipient: "bob".into(),
            amount: AssetAmount::Fungible(U256::from(100u64)),
            origin_ledger: holder.ledger_ref(),
        },
    }
}

/// Unsigned view of an event on `ledger`.
pub fn event_view(ledger: LedgerRef, event: &str, tx_id: &str, data: StatePayload) -> View {
    View {
        meta: ViewMeta {
            network_id: ledger.network.clone(),
            protocol: LedgerProtocol::Fabric,
            timestamp: shared_types::current_timestamp(),
        },
        contract_context: ContractTransaction {
            ledger,
            contract_address: "htlc".into(),
            event_name: event.into(),
            block_ref: 1,
            tx_id: tx_id.into(),
        },
        payload: ViewPayload {
            data,
            notarizations: vec![],
        },
    }
}

/// Poll `condition` until it holds or `within` passes.
pub async fn eventually(within: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
