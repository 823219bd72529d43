//! # Driver Node
//!
//! Wires one driver: asset state machine, subscription manager, view codec,
//! notary, client, server and delivery worker, all sharing one event bus.
//!
//! ```text
//! ledger event --observe_event--> bus(Ledger) --SubscriptionManager--> bus(Notification)
//!     --DeliveryWorker--> local session | remote WriteExternalState
//! session terminal --bus(Session)--> SubscriptionManager teardown
//! ```

use crate::adapters::InMemoryNetwork;
use crate::client::DriverClient;
use crate::delivery::DeliveryWorker;
use crate::domain::{ConfigError, DriverConfig, DriverError, PendingViews};
use crate::ports::{DriverTransport, EnvelopeHandler};
use crate::server::DriverServer;
use ix_01_view_proof::{Notary, NotaryKey, TrustStore, TrustedKey, ViewCodec, ViewCodecApi};
use ix_02_asset_exchange::{
    AssetExchangeApi, AssetExchangeService, Clock, InMemoryJournal, InMemoryLedgerConnector,
    LedgerConnector, SystemClock, TransitionJournal,
};
use ix_03_event_subscription::SubscriptionManager;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, InMemoryEventBus, InteropEvent};
use shared_types::{DerivedKeyProvider, DriverId, View};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Builder for `DriverNode`.
pub struct DriverNodeBuilder {
    config: DriverConfig,
    transport: Option<Arc<dyn DriverTransport>>,
    connector: Option<Arc<dyn LedgerConnector>>,
    clock: Option<Arc<dyn Clock>>,
    journal: Option<Arc<dyn TransitionJournal>>,
    bus: Option<Arc<InMemoryEventBus>>,
    notary_key: Option<NotaryKey>,
}

impl DriverNodeBuilder {
    /// Transport used to reach other drivers.
    pub fn transport(mut self, transport: Arc<dyn DriverTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Ledger connector (in-memory when unset).
    pub fn connector(mut self, connector: Arc<dyn LedgerConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Clock (system clock when unset).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Transition journal (in-memory when unset).
    pub fn journal(mut self, journal: Arc<dyn TransitionJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Event bus (a fresh one when unset).
    pub fn bus(mut self, bus: Arc<InMemoryEventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Notary key, instead of the one derived from configuration.
    pub fn notary_key(mut self, key: NotaryKey) -> Self {
        self.notary_key = Some(key);
        self
    }

    /// Validate configuration and wire the node. Nothing runs until
    /// `DriverNode::start`.
    pub fn build(self) -> Result<Arc<DriverNode>, DriverError> {
        let config = self.config;
        config.validate()?;
        let transport = self
            .transport
            .ok_or_else(|| ConfigError::Invalid("a driver node needs a transport".into()))?;

        let keys = DerivedKeyProvider::new(config.master_secret_bytes()?);
        let bus = self.bus.unwrap_or_else(|| Arc::new(InMemoryEventBus::new()));
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(InMemoryLedgerConnector::new()));
        let exchange = AssetExchangeService::builder(connector)
            .config(config.asset_exchange.clone())
            .clock(self.clock.unwrap_or_else(|| Arc::new(SystemClock)))
            .journal(
                self.journal
                    .unwrap_or_else(|| Arc::new(InMemoryJournal::new())),
            )
            .bus(Arc::clone(&publisher))
            .build();

        let subscriptions = Arc::new(SubscriptionManager::new(
            Arc::clone(&publisher),
            config.subscriptions.clone(),
        ));
        let trust = Arc::new(TrustStore::with_anchors(config.trust_anchors.clone()));
        let codec = Arc::new(ViewCodec::new(trust));

        let notary_key = match self.notary_key {
            Some(key) => key,
            None => config.notary_key()?,
        };
        let notary = Arc::new(Notary::new(config.notary_signer(), notary_key));

        let client = Arc::new(
            DriverClient::new(
                config.driver(),
                keys.clone(),
                transport,
                Arc::new(PendingViews::new()),
            )
            .with_notary(Arc::clone(&notary))
            .with_codec(Arc::clone(&codec))
            .with_retry(config.retry.clone())
            .with_timeouts(config.timeouts.clone()),
        );
        let server = Arc::new(DriverServer::new(
            &config,
            keys,
            Arc::clone(&exchange),
            Arc::clone(&subscriptions),
            Arc::clone(&codec),
            Arc::clone(&notary),
            Arc::clone(&client),
        ));
        let delivery = Arc::new(DeliveryWorker::new(
            Arc::clone(&server),
            Arc::clone(&client),
            publisher,
            config.delivery.clone(),
        ));

        info!(
            driver = %config.driver_id,
            ledger = %config.ledger_ref(),
            anchors = config.trust_anchors.len(),
            "[ix-04] Driver node wired"
        );
        Ok(Arc::new(DriverNode {
            id: config.driver(),
            config,
            bus,
            exchange,
            subscriptions,
            codec,
            notary,
            client,
            server,
            delivery,
            tasks: Mutex::new(Vec::new()),
        }))
    }
}

/// One running driver.
pub struct DriverNode {
    id: DriverId,
    config: DriverConfig,
    bus: Arc<InMemoryEventBus>,
    exchange: Arc<AssetExchangeService>,
    subscriptions: Arc<SubscriptionManager>,
    codec: Arc<ViewCodec>,
    notary: Arc<Notary>,
    client: Arc<DriverClient>,
    server: Arc<DriverServer>,
    delivery: Arc<DeliveryWorker>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DriverNode {
    /// Start building a node from `config`.
    pub fn builder(config: DriverConfig) -> DriverNodeBuilder {
        DriverNodeBuilder {
            config,
            transport: None,
            connector: None,
            clock: None,
            journal: None,
            bus: None,
            notary_key: None,
        }
    }

    /// Start the subscription listener, the delivery worker and the expiry
    /// sweeper.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }
        tasks.push(self.subscriptions.spawn(&self.bus));
        tasks.push(self.delivery.spawn(&self.bus));

        let node = Arc::downgrade(self);
        let period = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(node) = node.upgrade() else {
                    break;
                };
                node.sweep_once().await;
            }
        }));
        info!(driver = %self.id, "[ix-04] Driver node started");
    }

    /// Stop background tasks. In-flight requests finish on their own.
    pub fn shutdown(&self) {
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            task.abort();
        }
        info!(driver = %self.id, "[ix-04] Driver node stopped");
    }

    /// Serve requests arriving on `network`.
    pub fn attach(&self, network: &InMemoryNetwork) {
        let handler: Arc<dyn EnvelopeHandler> = self.server.clone();
        network.register(self.id.clone(), Arc::downgrade(&handler));
    }

    /// Expire overdue sessions and drop pending requests past the view
    /// deadline. Returns how many sessions expired.
    pub async fn sweep_once(&self) -> usize {
        let expired = self.exchange.sweep_expired().await;
        let abandoned = self
            .client
            .pending()
            .remove_expired(self.config.timeouts.view_deadline());
        if expired > 0 || abandoned > 0 {
            debug!(
                driver = %self.id,
                expired,
                abandoned,
                "[ix-04] Sweep finished"
            );
        }
        expired
    }

    /// Feed an event observed on a ledger into the subscription pipeline.
    /// Unsigned views are notarized with this driver's key first.
    pub async fn observe_event(&self, mut view: View) -> Result<usize, DriverError> {
        if !view.is_notarized() {
            self.notary.notarize(&mut view);
        }
        let ctx = view.contract_context.clone();
        let view_payload = self.codec.encode(&view)?;
        debug!(
            driver = %self.id,
            tx_id = %ctx.tx_id,
            event = %ctx.event_name,
            "[ix-04] Ledger event observed"
        );
        Ok(self
            .bus
            .publish(InteropEvent::RemoteEventObserved { view_payload, ctx })
            .await)
    }

    /// This driver's id
    pub fn id(&self) -> &DriverId {
        &self.id
    }

    /// Configuration the node was built with
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Key other drivers must trust for views this node serves
    pub fn trusted_key(&self) -> TrustedKey {
        self.notary.trusted_key()
    }

    /// Event bus
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Asset state machine
    pub fn exchange(&self) -> &Arc<AssetExchangeService> {
        &self.exchange
    }

    /// Subscription manager
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    /// View codec and trust store
    pub fn codec(&self) -> &Arc<ViewCodec> {
        &self.codec
    }

    /// Driver client
    pub fn client(&self) -> &Arc<DriverClient> {
        &self.client
    }

    /// Driver server
    pub fn server(&self) -> &Arc<DriverServer> {
        &self.server
    }

    /// Notification delivery worker
    pub fn delivery(&self) -> &Arc<DeliveryWorker> {
        &self.delivery
    }
}

impl Drop for DriverNode {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
