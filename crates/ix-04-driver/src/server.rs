//! # Driver Server
//!
//! Callee side of the driver protocol. Verifies each inbound envelope,
//! opens the request and dispatches it to the asset state machine, the
//! subscription manager or the ledger connector. Every outcome goes back as
//! a sealed response; failures become error `Ack`s.
//!
//! ## Request Checks
//!
//! | Check | Error |
//! |-------|-------|
//! | Envelope seal, window, nonce, recipient | `Unauthorized` |
//! | Type tag matches the payload | `Decode` |
//! | Session exists (or lazy creation on) | `SessionNotFound` |
//! | Sender is the session's counterparty | `Mismatch` |
//! | Context names the counterparty ledger | `Mismatch` |
//! | Callback target is the sender | `Unauthorized` |
//! | Subscription sessions not yet terminal | `Mismatch` |
//! | Query signer listed for the requester's network | `Unauthorized` |
//! | View network is the context ledger's network | `Mismatch` |
//!
//! ## WriteExternalState
//!
//! decode + verify -> context check -> record view -> resolve pending
//! request -> apply event -> remember delivery

use crate::algorithms::{ack_for_outcome, view_key_for};
use crate::client::DriverClient;
use crate::domain::{DriverConfig, DriverError, PendingViews, TransportError};
use crate::ports::EnvelopeHandler;
use async_trait::async_trait;
use ix_01_view_proof::{Notary, ViewCodec, ViewCodecApi};
use ix_02_asset_exchange::{AssetExchangeApi, AssetExchangeService, Preimage};
use ix_03_event_subscription::{
    EventSubscriptionApi, EventSubscriptionError, NotificationDedup, SubscriptionManager,
};
use shared_bus::Notification;
use shared_types::{
    Ack, ContractTransaction, DeliveryTarget, DerivedKeyProvider, DriverEnvelope, DriverId,
    DriverRequest, DriverResponse, EnvelopeVerifier, EventSubscriptionSpec, KeyProvider,
    LedgerProtocol, LedgerRef, MessageError, NonceCache, Query, SessionId, View, ViewMeta,
    ViewPayload, WriteExternalStateMessage,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Event name stamped on views served for a state query.
pub const STATE_QUERY_EVENT: &str = "StateQuery";

/// Driver server.
pub struct DriverServer {
    local: DriverId,
    ledger: LedgerRef,
    protocol: LedgerProtocol,
    require_signed_queries: bool,
    request_timeout: Duration,
    keys: DerivedKeyProvider,
    verifier: EnvelopeVerifier<DerivedKeyProvider>,
    exchange: Arc<AssetExchangeService>,
    subscriptions: Arc<SubscriptionManager>,
    codec: Arc<ViewCodec>,
    notary: Arc<Notary>,
    client: Arc<DriverClient>,
    pending: Arc<PendingViews>,
    dedup: NotificationDedup,
}

impl DriverServer {
    /// Create a server. Callbacks go out through `client`, whose pending
    /// store is the one answers are resolved into.
    pub fn new(
        config: &DriverConfig,
        keys: DerivedKeyProvider,
        exchange: Arc<AssetExchangeService>,
        subscriptions: Arc<SubscriptionManager>,
        codec: Arc<ViewCodec>,
        notary: Arc<Notary>,
        client: Arc<DriverClient>,
    ) -> Self {
        let local = config.driver();
        let verifier = EnvelopeVerifier::new(local.clone(), NonceCache::new_shared(), keys.clone())
            .with_window(
                config.timeouts.envelope_max_age_secs,
                config.timeouts.envelope_future_skew_secs,
            );
        let pending = Arc::clone(client.pending());
        Self {
            local,
            ledger: config.ledger_ref(),
            protocol: config.protocol,
            require_signed_queries: config.require_signed_queries,
            request_timeout: config.timeouts.request(),
            keys,
            verifier,
            exchange,
            subscriptions,
            codec,
            notary,
            client,
            pending,
            dedup: NotificationDedup::new(&config.subscriptions),
        }
    }

    /// This driver's id
    pub fn local(&self) -> &DriverId {
        &self.local
    }

    /// Apply a notification addressed to a local session, as if its
    /// session's counterparty had written it.
    pub async fn deliver_local(&self, notification: &Notification) -> Result<Ack, DriverError> {
        let DeliveryTarget::Session(session_id) = &notification.target else {
            return Err(DriverError::Mismatch(format!(
                "notification {} is not for a local session",
                notification.subscription_id
            )));
        };
        self.exchange.ensure_session(session_id).await?;
        let counterparty = self.exchange.counterparty(session_id).ok_or_else(|| {
            DriverError::Mismatch(format!("session {} has no counterparty yet", session_id))
        })?;

        let message = WriteExternalStateMessage {
            session_id: session_id.clone(),
            view_payload: notification.view_payload.clone(),
            ctx: notification.ctx.clone(),
            request_id: None,
            subscription_id: Some(notification.subscription_id.clone()),
        };
        self.apply_write(&counterparty.driver, message, &notification.target)
            .await
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    async fn dispatch(&self, envelope: &DriverEnvelope) -> Result<DriverResponse, DriverError> {
        self.verifier.verify(envelope)?;
        let request: DriverRequest = envelope.open()?;
        if envelope.type_name() != Some(request.type_name()) {
            return Err(MessageError::Codec(format!(
                "type tag {} does not carry {}",
                envelope.message_type,
                request.type_name()
            ))
            .into());
        }

        let sender = &envelope.sender;
        debug!(
            request = request.type_name(),
            sender = %sender,
            correlation_id = %envelope.correlation_id,
            session_id = ?request.session_id(),
            "[ix-04] Dispatching request"
        );

        let ack = match request {
            DriverRequest::RequestDriverState(query) => self.serve_state(sender, query).await?,
            DriverRequest::SubscribeEvent(spec) => self.subscribe(sender, spec).await?,
            DriverRequest::RequestSignedEventSubscriptionQuery(spec) => {
                return self.signed_query(sender, spec).await.map(DriverResponse::Query);
            }
            DriverRequest::UnsubscribeEvent { subscription_id } => {
                self.unsubscribe(sender, &subscription_id).await?
            }
            DriverRequest::WriteExternalState(message) => {
                self.exchange.ensure_session(&message.session_id).await?;
                let target = DeliveryTarget::Session(message.session_id.clone());
                self.apply_write(sender, message, &target).await?
            }
            DriverRequest::OpenSession(request) => {
                if &request.counterparty.driver != sender {
                    return Err(DriverError::Mismatch(format!(
                        "session {} names counterparty {} but was opened by {}",
                        request.session_id, request.counterparty.driver, sender
                    )));
                }
                let outcome = self
                    .exchange
                    .open_session(request.session_id, request.counterparty, request.lock_terms)
                    .await?;
                ack_for_outcome(&outcome)
            }
            DriverRequest::PerformLock(request) => {
                self.admit(&request.session_id, sender).await?;
                let outcome = self
                    .exchange
                    .perform_lock(&request.session_id, request.lock_terms)
                    .await?;
                ack_for_outcome(&outcome)
            }
            DriverRequest::CreateAsset(request) => {
                self.admit(&request.session_id, sender).await?;
                ack_for_outcome(&self.exchange.create_asset(&request.session_id).await?)
            }
            DriverRequest::Extinguish(request) => {
                self.admit(&request.session_id, sender).await?;
                ack_for_outcome(&self.exchange.extinguish(&request.session_id).await?)
            }
            DriverRequest::AssignAsset(request) => {
                self.admit(&request.session_id, sender).await?;
                ack_for_outcome(&self.exchange.assign_asset(&request.session_id).await?)
            }
            DriverRequest::Claim(request) => {
                self.exchange.ensure_session(&request.session_id).await?;
                match &request.ctx {
                    Some(ctx) => {
                        self.exchange
                            .check_context(&request.session_id, sender, ctx)
                            .await?
                    }
                    None => self.check_sender(&request.session_id, sender)?,
                }
                let preimage = Preimage::new(request.preimage);
                ack_for_outcome(&self.exchange.claim(&request.session_id, preimage).await?)
            }
            DriverRequest::SessionStatus(request) => {
                self.admit(&request.session_id, sender).await?;
                let status = self.exchange.status(&request.session_id).await?;
                return Ok(DriverResponse::Status(status));
            }
        };
        Ok(DriverResponse::Ack(ack))
    }

    /// Session exists (created lazily when allowed) and `sender` may act
    /// on it.
    async fn admit(&self, session_id: &SessionId, sender: &DriverId) -> Result<(), DriverError> {
        self.exchange.ensure_session(session_id).await?;
        self.check_sender(session_id, sender)
    }

    /// Requests without a context can only be checked against the bound
    /// counterparty driver. Unbound sessions accept anyone until bound.
    fn check_sender(&self, session_id: &SessionId, sender: &DriverId) -> Result<(), DriverError> {
        match self.exchange.counterparty(session_id) {
            Some(bound) if &bound.driver != sender => Err(DriverError::Mismatch(format!(
                "session {} is bound to {}, not {}",
                session_id, bound.driver, sender
            ))),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // STATE EXCHANGE
    // =========================================================================

    /// Read our ledger for `query`, then call the requester back with the
    /// notarized view. The ack only says the query was accepted.
    async fn serve_state(&self, sender: &DriverId, query: Query) -> Result<Ack, DriverError> {
        if &query.requesting_driver != sender {
            return Err(DriverError::Unauthorized(format!(
                "query {} names {} but was sent by {}",
                query.request_id, query.requesting_driver, sender
            )));
        }
        if query.target != self.ledger {
            return Err(DriverError::Mismatch(format!(
                "query {} targets {}, this driver serves {}",
                query.request_id, query.target, self.ledger
            )));
        }
        self.admit(&query.session_id, sender).await?;
        if query.signature.is_some() || self.require_signed_queries {
            // Only a bound session says which network the requester signs for
            let trusted = self
                .exchange
                .counterparty(&query.session_id)
                .is_some_and(|bound| self.codec.verify_query(&query, &bound.ledger.network));
            if !trusted {
                return Err(DriverError::Unauthorized(format!(
                    "query {} carries no trusted signature",
                    query.request_id
                )));
            }
        }

        let read = self
            .exchange
            .connector()
            .query_state(&query.target, &query.address);
        let data = match tokio::time::timeout(self.request_timeout, read).await {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                return Err(DriverError::Remote {
                    code: shared_types::AckCode::Remote,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(DriverError::Timeout(format!(
                    "ledger read {} on {}",
                    query.address, query.target
                )))
            }
        };

        let ctx = ContractTransaction {
            ledger: query.target.clone(),
            contract_address: query.address.clone(),
            event_name: STATE_QUERY_EVENT.to_string(),
            block_ref: 0,
            tx_id: query.request_id.clone(),
        };
        let mut view = View {
            meta: ViewMeta {
                network_id: self.ledger.network.clone(),
                protocol: self.protocol,
                timestamp: shared_types::current_timestamp(),
            },
            contract_context: ctx.clone(),
            payload: ViewPayload {
                data,
                notarizations: Vec::new(),
            },
        };
        self.notary.notarize(&mut view);
        let view_payload = self.codec.encode(&view)?;

        let message = WriteExternalStateMessage {
            session_id: query.session_id.clone(),
            view_payload,
            ctx,
            request_id: Some(query.request_id.clone()),
            subscription_id: None,
        };
        let client = Arc::clone(&self.client);
        let requester = sender.clone();
        let request_id = query.request_id.clone();
        tokio::spawn(async move {
            match client.write_external_state(&requester, message).await {
                Ok(_) => debug!(request_id = %request_id, to = %requester, "[ix-04] View delivered"),
                Err(e) => warn!(
                    request_id = %request_id,
                    to = %requester,
                    error = %e,
                    "[ix-04] View callback failed"
                ),
            }
        });

        info!(
            request_id = %query.request_id,
            session_id = %query.session_id,
            requester = %sender,
            address = %query.address,
            "[ix-04] Serving driver state"
        );
        Ok(Ack::ok_with(query.request_id))
    }

    async fn apply_write(
        &self,
        sender: &DriverId,
        message: WriteExternalStateMessage,
        target: &DeliveryTarget,
    ) -> Result<Ack, DriverError> {
        let session_id = &message.session_id;
        let view = self.codec.decode(&message.view_payload)?;
        // The anchor that vouched for the view must be the ledger's own
        if view.meta.network_id != message.ctx.ledger.network {
            return Err(DriverError::Mismatch(format!(
                "view notarized for {} describes ledger {}",
                view.meta.network_id, message.ctx.ledger
            )));
        }
        if view.contract_context != message.ctx {
            return Err(DriverError::Mismatch(format!(
                "view context {} does not match message context {}",
                view.contract_context.tx_id, message.ctx.tx_id
            )));
        }
        if message.subscription_id.is_some() && self.dedup.already_delivered(target, &message.ctx)
        {
            debug!(
                session_id = %session_id,
                tx_id = %message.ctx.tx_id,
                "[ix-04] Notification already applied"
            );
            return Ok(Ack::ok_with("duplicate notification"));
        }
        if let Some(request_id) = &message.request_id {
            if let Some(expected) = self.pending.session_of(request_id) {
                if &expected != session_id {
                    return Err(DriverError::Mismatch(format!(
                        "request {} belongs to session {}, not {}",
                        request_id, expected, session_id
                    )));
                }
            }
        }

        self.exchange
            .check_context(session_id, sender, &message.ctx)
            .await?;
        self.exchange
            .record_view(session_id, view_key_for(&message.ctx), view.clone())
            .await?;
        if let Some(request_id) = &message.request_id {
            self.pending.resolve(request_id, view.clone());
        }
        let outcome = self.exchange.apply_event(session_id, &view).await?;
        if message.subscription_id.is_some() {
            self.dedup
                .record_delivery(target, &message.ctx, shared_types::current_timestamp());
        }
        Ok(ack_for_outcome(&outcome))
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// A remote may register subscriptions that call itself back, or that
    /// feed a local session it is the counterparty of.
    async fn authorize_spec(
        &self,
        sender: &DriverId,
        spec: &EventSubscriptionSpec,
    ) -> Result<(), DriverError> {
        match &spec.target {
            DeliveryTarget::Callback(driver) if driver != sender => {
                return Err(DriverError::Unauthorized(format!(
                    "{} cannot subscribe on behalf of {}",
                    sender, driver
                )))
            }
            DeliveryTarget::Callback(_) => {}
            DeliveryTarget::Session(session_id) => self.admit(session_id, sender).await?,
        }
        if let Some(owner) = &spec.owner {
            self.admit(owner, sender).await?;
        }
        Ok(())
    }

    /// Subscriptions bound to a finished session would never be torn down.
    async fn ensure_live(&self, spec: &EventSubscriptionSpec) -> Result<(), DriverError> {
        let target = match &spec.target {
            DeliveryTarget::Session(session_id) => Some(session_id),
            DeliveryTarget::Callback(_) => None,
        };
        for session_id in spec.owner.iter().chain(target) {
            let state = self.exchange.status(session_id).await?.state;
            if state.is_terminal() {
                return Err(DriverError::Mismatch(format!(
                    "session {} is already {}",
                    session_id, state
                )));
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        sender: &DriverId,
        spec: EventSubscriptionSpec,
    ) -> Result<Ack, DriverError> {
        self.authorize_spec(sender, &spec).await?;
        self.ensure_live(&spec).await?;
        let (id, created) = self.subscriptions.subscribe(spec.clone())?;
        // A session stores its terminal state before teardown runs, so a
        // second look catches one that ended while we were inserting.
        if let Err(e) = self.ensure_live(&spec).await {
            if created {
                let _ = self.subscriptions.unsubscribe(&id);
            }
            return Err(e);
        }
        info!(
            subscription_id = %id,
            subscriber = %sender,
            created,
            "[ix-04] Subscription registered"
        );
        Ok(Ack::ok_with(id))
    }

    async fn signed_query(
        &self,
        sender: &DriverId,
        spec: EventSubscriptionSpec,
    ) -> Result<Query, DriverError> {
        self.authorize_spec(sender, &spec).await?;
        self.ensure_live(&spec).await?;
        let id = spec.subscription_id();
        let mut query =
            self.subscriptions
                .query_for(&id, sender.clone(), Uuid::new_v4().to_string())?;
        self.notary.sign_query(&mut query);
        Ok(query)
    }

    async fn unsubscribe(&self, sender: &DriverId, id: &str) -> Result<Ack, DriverError> {
        let subscription = self
            .subscriptions
            .get(id)
            .ok_or_else(|| EventSubscriptionError::NotFound(id.to_string()))?;
        self.authorize_spec(sender, &subscription.spec).await?;
        self.subscriptions.unsubscribe(id)?;
        info!(subscription_id = %id, subscriber = %sender, "[ix-04] Subscription removed");
        Ok(Ack::ok())
    }
}

#[async_trait]
impl EnvelopeHandler for DriverServer {
    async fn handle(&self, envelope: DriverEnvelope) -> Result<DriverEnvelope, TransportError> {
        let key = self
            .keys
            .shared_secret(&self.local)
            .ok_or_else(|| TransportError::Codec(format!("no envelope key for {}", self.local)))?;

        let response = match self.dispatch(&envelope).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    sender = %envelope.sender,
                    correlation_id = %envelope.correlation_id,
                    code = %e.code(),
                    error = %e,
                    "[ix-04] Request rejected"
                );
                DriverResponse::Ack(e.to_ack())
            }
        };
        Ok(envelope.reply(response.type_name(), &response, &key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryNetwork;
    use crate::domain::NotaryConfig;
    use crate::node::DriverNode;
    use ix_01_view_proof::{NotaryKey, TrustAnchor};
    use shared_types::{
        AckCode, Counterparty, EventQuery, OpenSessionRequest, SessionState, StatePayload,
    };

    const MASTER: &[u8] = b"relay-network-master-secret";

    fn remote_notary() -> Notary {
        Notary::new("driver-a", NotaryKey::ed25519_from_seed([1u8; 32]))
    }

    fn node() -> Arc<DriverNode> {
        let config = DriverConfig {
            driver_id: "driver-b".into(),
            network_id: "net-b".into(),
            master_secret: hex::encode(MASTER),
            notary: NotaryConfig {
                seed: hex::encode([2u8; 32]),
                ..NotaryConfig::default()
            },
            trust_anchors: vec![TrustAnchor::new(
                "net-a",
                1,
                vec![remote_notary().trusted_key()],
            )],
            ..DriverConfig::default()
        };
        DriverNode::builder(config)
            .transport(InMemoryNetwork::new())
            .build()
            .unwrap()
    }

    fn sealed(from: &str, request: &DriverRequest, master: &[u8]) -> DriverEnvelope {
        let sender = DriverId::new(from);
        let key = DerivedKeyProvider::new(master.to_vec())
            .shared_secret(&sender)
            .unwrap();
        DriverEnvelope::seal(
            request.type_name(),
            sender,
            DriverId::new("driver-b"),
            Uuid::new_v4(),
            request,
            &key,
        )
        .unwrap()
    }

    async fn ask(node: &DriverNode, from: &str, request: DriverRequest) -> DriverResponse {
        let response = node
            .server()
            .handle(sealed(from, &request, MASTER))
            .await
            .unwrap();
        response.open().unwrap()
    }

    fn error_code(response: DriverResponse) -> Option<AckCode> {
        match response {
            DriverResponse::Ack(ack) => ack.code,
            _ => None,
        }
    }

    async fn open(node: &DriverNode, session: &SessionId) {
        let response = ask(
            node,
            "driver-a",
            DriverRequest::OpenSession(OpenSessionRequest {
                session_id: session.clone(),
                counterparty: Counterparty {
                    driver: DriverId::new("driver-a"),
                    ledger: LedgerRef::new("net-a", "main"),
                },
                lock_terms: None,
            }),
        )
        .await;
        assert_eq!(error_code(response), None);
    }

    fn remote_view(tx: &str) -> View {
        let mut view = View {
            meta: ViewMeta {
                network_id: "net-a".into(),
                protocol: LedgerProtocol::Besu,
                timestamp: 1,
            },
            contract_context: ContractTransaction {
                ledger: LedgerRef::new("net-a", "main"),
                contract_address: "0xhtlc".into(),
                event_name: "Noted".into(),
                block_ref: 4,
                tx_id: tx.into(),
            },
            payload: ViewPayload {
                data: StatePayload::Opaque(vec![4]),
                notarizations: vec![],
            },
        };
        remote_notary().notarize(&mut view);
        view
    }

    #[tokio::test]
    async fn test_forged_seal_rejected() {
        let node = node();
        let request = DriverRequest::CreateAsset(shared_types::CreateAssetRequest {
            session_id: SessionId::new("s1"),
        });
        let response = node
            .server()
            .handle(sealed("driver-a", &request, b"some-other-master-secret"))
            .await
            .unwrap();
        let response: DriverResponse = response.open().unwrap();
        assert_eq!(error_code(response), Some(AckCode::Unauthorized));
    }

    #[tokio::test]
    async fn test_open_session_for_someone_else_rejected() {
        let node = node();
        let response = ask(
            &node,
            "driver-c",
            DriverRequest::OpenSession(OpenSessionRequest {
                session_id: SessionId::new("s1"),
                counterparty: Counterparty {
                    driver: DriverId::new("driver-a"),
                    ledger: LedgerRef::new("net-a", "main"),
                },
                lock_terms: None,
            }),
        )
        .await;
        assert_eq!(error_code(response), Some(AckCode::Mismatch));
    }

    #[tokio::test]
    async fn test_write_from_wrong_driver_is_mismatch() {
        let node = node();
        let session = SessionId::new("s1");
        open(&node, &session).await;

        let view = remote_view("tx-1");
        let message = WriteExternalStateMessage {
            session_id: session.clone(),
            view_payload: node.codec().encode(&view).unwrap(),
            ctx: view.contract_context.clone(),
            request_id: None,
            subscription_id: None,
        };
        let response = ask(&node, "driver-c", DriverRequest::WriteExternalState(message)).await;
        assert_eq!(error_code(response), Some(AckCode::Mismatch));
        assert!(node
            .exchange()
            .view(&session, &view_key_for(&view.contract_context))
            .is_none());
    }

    #[tokio::test]
    async fn test_write_with_swapped_context_is_mismatch() {
        let node = node();
        let session = SessionId::new("s1");
        open(&node, &session).await;

        let view = remote_view("tx-1");
        let mut ctx = view.contract_context.clone();
        ctx.tx_id = "tx-2".into();
        let message = WriteExternalStateMessage {
            session_id: session.clone(),
            view_payload: node.codec().encode(&view).unwrap(),
            ctx,
            request_id: None,
            subscription_id: None,
        };
        let response = ask(&node, "driver-a", DriverRequest::WriteExternalState(message)).await;
        assert_eq!(error_code(response), Some(AckCode::Mismatch));
        let status = node.exchange().status(&session).await.unwrap();
        assert_eq!(status.state, SessionState::Initiated);
    }

    #[tokio::test]
    async fn test_view_notarized_for_other_network_is_mismatch() {
        let node = node();
        let session = SessionId::new("s1");
        open(&node, &session).await;

        // net-c is trusted, but it cannot vouch for net-a's ledger
        let net_c = Notary::new("driver-c", NotaryKey::ed25519_from_seed([3u8; 32]));
        node.codec()
            .trust_store()
            .insert(TrustAnchor::new("net-c", 1, vec![net_c.trusted_key()]));
        let mut view = remote_view("tx-1");
        view.meta.network_id = "net-c".into();
        view.payload.notarizations.clear();
        net_c.notarize(&mut view);
        let message = WriteExternalStateMessage {
            session_id: session.clone(),
            view_payload: node.codec().encode(&view).unwrap(),
            ctx: view.contract_context.clone(),
            request_id: None,
            subscription_id: None,
        };
        let response = ask(&node, "driver-a", DriverRequest::WriteExternalState(message)).await;
        assert_eq!(error_code(response), Some(AckCode::Mismatch));
        assert!(node
            .exchange()
            .view(&session, &view_key_for(&view.contract_context))
            .is_none());
    }

    #[tokio::test]
    async fn test_untrusted_view_rejected() {
        let node = node();
        let session = SessionId::new("s1");
        open(&node, &session).await;

        let mut view = remote_view("tx-1");
        view.payload.notarizations.clear();
        Notary::new("mallory", NotaryKey::ed25519_from_seed([9u8; 32])).notarize(&mut view);
        let message = WriteExternalStateMessage {
            session_id: session.clone(),
            view_payload: node.codec().encode(&view).unwrap(),
            ctx: view.contract_context.clone(),
            request_id: None,
            subscription_id: None,
        };
        let response = ask(&node, "driver-a", DriverRequest::WriteExternalState(message)).await;
        assert_eq!(error_code(response), Some(AckCode::Decode));
    }

    #[tokio::test]
    async fn test_callback_subscription_for_other_driver_rejected() {
        let node = node();
        let spec = EventSubscriptionSpec {
            query: EventQuery {
                ledger: LedgerRef::new("net-b", "main"),
                contract_address: None,
                event_name: Some("Claimed".into()),
                address_range: None,
            },
            target: DeliveryTarget::Callback(DriverId::new("driver-c")),
            owner: None,
        };
        let response = ask(&node, "driver-a", DriverRequest::SubscribeEvent(spec.clone())).await;
        assert_eq!(error_code(response), Some(AckCode::Unauthorized));

        let own = EventSubscriptionSpec {
            target: DeliveryTarget::Callback(DriverId::new("driver-a")),
            ..spec
        };
        let first = ask(&node, "driver-a", DriverRequest::SubscribeEvent(own.clone())).await;
        let again = ask(&node, "driver-a", DriverRequest::SubscribeEvent(own.clone())).await;
        assert_eq!(first, again);
        assert_eq!(node.subscriptions().total_subscriptions(), 1);

        let signed = ask(
            &node,
            "driver-a",
            DriverRequest::RequestSignedEventSubscriptionQuery(own),
        )
        .await;
        let DriverResponse::Query(query) = signed else {
            panic!("expected a signed query");
        };
        // Signed by this driver, for its own network
        let local = Notary::new("driver-b", NotaryKey::ed25519_from_seed([2u8; 32]));
        let own = TrustAnchor::new("net-b", 1, vec![local.trusted_key()]);
        assert!(ix_01_view_proof::verify_query_signature(
            &query,
            &own,
            &ix_01_view_proof::VerifierSet::standard()
        ));
    }

    #[tokio::test]
    async fn test_state_query_signed_by_unlisted_key_rejected() {
        let node = node();
        let session = SessionId::new("s1");
        open(&node, &session).await;

        let mut query = Query {
            request_id: "req-1".into(),
            session_id: session.clone(),
            requesting_driver: DriverId::new("driver-a"),
            target: node.config().ledger_ref(),
            address: "balance:alice".into(),
            nonce: "n1".into(),
            signature: None,
            certificate: None,
        };
        Notary::new("mallory", NotaryKey::ed25519_from_seed([9u8; 32])).sign_query(&mut query);
        let response = ask(
            &node,
            "driver-a",
            DriverRequest::RequestDriverState(query.clone()),
        )
        .await;
        assert_eq!(error_code(response), Some(AckCode::Unauthorized));

        remote_notary().sign_query(&mut query);
        let response = ask(&node, "driver-a", DriverRequest::RequestDriverState(query)).await;
        assert_ne!(error_code(response), Some(AckCode::Unauthorized));
    }

    #[tokio::test]
    async fn test_local_notification_applied_once() {
        let node = node();
        let session = SessionId::new("s1");
        open(&node, &session).await;

        let view = remote_view("tx-7");
        let notification = Notification {
            subscription_id: "sub-1".into(),
            target: DeliveryTarget::Session(session.clone()),
            session_id: session.clone(),
            view_payload: node.codec().encode(&view).unwrap(),
            ctx: view.contract_context.clone(),
        };
        let first = node.server().deliver_local(&notification).await.unwrap();
        assert_ne!(first.message.as_deref(), Some("duplicate notification"));
        let second = node.server().deliver_local(&notification).await.unwrap();
        assert_eq!(second.message.as_deref(), Some("duplicate notification"));
    }
}
