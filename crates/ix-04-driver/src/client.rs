//! # Driver Client
//!
//! Caller side of the driver protocol. Every call seals a `DriverRequest`
//! into an envelope, sends it through the transport with a deadline and
//! verifies the sealed response.
//!
//! ## Retries
//!
//! Idempotent requests that fail with a retryable error (transport timeout,
//! unreachable peer, remote `Timeout` ack) are resent with exponential
//! backoff. Each attempt gets a fresh nonce and keeps the correlation id.
//! `RequestDriverState` is never resent: its answer arrives by callback and
//! a resend would produce a second one.

use crate::algorithms::{backoff_for_attempt, should_retry};
use crate::domain::{DriverError, PendingView, PendingViews, RetryPolicy, TimeoutConfig};
use crate::ports::DriverTransport;
use ix_01_view_proof::{Notary, TrustStore, ViewCodec, ViewCodecApi};
use shared_types::{
    Ack, AssignAssetRequest, ClaimRequest, CreateAssetRequest, DerivedKeyProvider, DriverEnvelope,
    DriverId, DriverRequest, DriverResponse, EnvelopeVerifier, EventSubscriptionSpec,
    ExtinguishRequest, KeyProvider, NonceCache, OpenSessionRequest, PerformLockRequest, Query,
    SessionId, SessionStatus, SessionStatusRequest, View, WriteExternalStateMessage,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Driver client.
pub struct DriverClient {
    local: DriverId,
    keys: DerivedKeyProvider,
    verifier: EnvelopeVerifier<DerivedKeyProvider>,
    transport: Arc<dyn DriverTransport>,
    pending: Arc<PendingViews>,
    notary: Option<Arc<Notary>>,
    codec: Arc<ViewCodec>,
    retry: RetryPolicy,
    timeouts: TimeoutConfig,
}

impl DriverClient {
    /// Create a client for `local`.
    pub fn new(
        local: DriverId,
        keys: DerivedKeyProvider,
        transport: Arc<dyn DriverTransport>,
        pending: Arc<PendingViews>,
    ) -> Self {
        let timeouts = TimeoutConfig::default();
        let verifier = EnvelopeVerifier::new(local.clone(), NonceCache::new_shared(), keys.clone())
            .with_window(timeouts.envelope_max_age_secs, timeouts.envelope_future_skew_secs);
        Self {
            local,
            keys,
            verifier,
            transport,
            pending,
            notary: None,
            codec: Arc::new(ViewCodec::new(Arc::new(TrustStore::new()))),
            retry: RetryPolicy::default(),
            timeouts,
        }
    }

    /// Sign outgoing state queries with `notary`.
    pub fn with_notary(mut self, notary: Arc<Notary>) -> Self {
        self.notary = Some(notary);
        self
    }

    /// Check peer-signed queries against `codec`'s trust anchors.
    pub fn with_codec(mut self, codec: Arc<ViewCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override timeouts, including the response envelope window.
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.verifier = EnvelopeVerifier::new(
            self.local.clone(),
            NonceCache::new_shared(),
            self.keys.clone(),
        )
        .with_window(timeouts.envelope_max_age_secs, timeouts.envelope_future_skew_secs);
        self.timeouts = timeouts;
        self
    }

    /// This driver's id
    pub fn local(&self) -> &DriverId {
        &self.local
    }

    /// Requests waiting for a `WriteExternalState` answer
    pub fn pending(&self) -> &Arc<PendingViews> {
        &self.pending
    }

    // =========================================================================
    // STATE EXCHANGE
    // =========================================================================

    /// Send `query` to `to` and return the handle its view will arrive on.
    ///
    /// Fills in `requesting_driver`, a request id and a nonce when absent,
    /// and signs the query when a notary is configured. The pending entry is
    /// registered before sending so an early callback is never lost.
    pub async fn begin_request_driver_state(
        &self,
        to: &DriverId,
        mut query: Query,
    ) -> Result<PendingView, DriverError> {
        query.requesting_driver = self.local.clone();
        if query.request_id.is_empty() {
            query.request_id = Uuid::new_v4().to_string();
        }
        if query.nonce.is_empty() {
            query.nonce = Uuid::new_v4().to_string();
        }
        if let Some(notary) = &self.notary {
            notary.sign_query(&mut query);
        }

        let pending = self.pending.register(&query.request_id, &query.session_id);
        debug!(
            request_id = %query.request_id,
            session_id = %query.session_id,
            to = %to,
            target = %query.target,
            "[ix-04] Requesting driver state"
        );
        // On error the handle drops and takes its entry with it
        self.call_ack(to, DriverRequest::RequestDriverState(query))
            .await?;
        Ok(pending)
    }

    /// Request a view and wait for it until `deadline` (the configured view
    /// deadline when `None`).
    pub async fn request_driver_state(
        &self,
        to: &DriverId,
        query: Query,
        deadline: Option<Duration>,
    ) -> Result<View, DriverError> {
        let pending = self.begin_request_driver_state(to, query).await?;
        pending
            .wait(deadline.unwrap_or_else(|| self.timeouts.view_deadline()))
            .await
    }

    /// Deliver a view to `to`.
    pub async fn write_external_state(
        &self,
        to: &DriverId,
        message: WriteExternalStateMessage,
    ) -> Result<Ack, DriverError> {
        self.call_ack(to, DriverRequest::WriteExternalState(message))
            .await
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Register `spec` on `to`. Returns the subscription id, the same for
    /// every identical `(query, target)`.
    pub async fn subscribe_event(
        &self,
        to: &DriverId,
        spec: EventSubscriptionSpec,
    ) -> Result<String, DriverError> {
        let id = spec.subscription_id();
        self.call_ack(to, DriverRequest::SubscribeEvent(spec)).await?;
        Ok(id)
    }

    /// Remove a subscription on `to`.
    pub async fn unsubscribe_event(
        &self,
        to: &DriverId,
        subscription_id: &str,
    ) -> Result<Ack, DriverError> {
        self.call_ack(
            to,
            DriverRequest::UnsubscribeEvent {
                subscription_id: subscription_id.to_string(),
            },
        )
        .await
    }

    /// Ask `to` for the signed query backing a subscription it holds.
    pub async fn request_signed_event_subscription_query(
        &self,
        to: &DriverId,
        spec: EventSubscriptionSpec,
    ) -> Result<Query, DriverError> {
        let watched = spec.query.ledger.clone();
        let response = self
            .call(to, DriverRequest::RequestSignedEventSubscriptionQuery(spec))
            .await?;
        let query = match response {
            DriverResponse::Query(query) => query,
            other => {
                return Err(DriverError::UnexpectedResponse(format!(
                    "expected SignedQuery, got {}",
                    other.type_name()
                )))
            }
        };
        if query.target != watched {
            return Err(DriverError::Mismatch(format!(
                "query {} targets {}, subscription watches {}",
                query.request_id, query.target, watched
            )));
        }
        // Signed by the driver fronting the watched ledger
        if !self.codec.verify_query(&query, &watched.network) {
            return Err(DriverError::Unauthorized(format!(
                "query {} from {} carries no signature trusted for {}",
                query.request_id, to, watched.network
            )));
        }
        Ok(query)
    }

    // =========================================================================
    // ASSET EXCHANGE
    // =========================================================================

    /// Open a session on `to`.
    pub async fn open_session(
        &self,
        to: &DriverId,
        request: OpenSessionRequest,
    ) -> Result<Ack, DriverError> {
        self.call_ack(to, DriverRequest::OpenSession(request)).await
    }

    /// Lock on `to`.
    pub async fn perform_lock(
        &self,
        to: &DriverId,
        request: PerformLockRequest,
    ) -> Result<Ack, DriverError> {
        self.call_ack(to, DriverRequest::PerformLock(request)).await
    }

    /// Create the asset on `to`.
    pub async fn create_asset(
        &self,
        to: &DriverId,
        session_id: &SessionId,
    ) -> Result<Ack, DriverError> {
        self.call_ack(
            to,
            DriverRequest::CreateAsset(CreateAssetRequest {
                session_id: session_id.clone(),
            }),
        )
        .await
    }

    /// Abort the exchange on `to`.
    pub async fn extinguish(
        &self,
        to: &DriverId,
        session_id: &SessionId,
    ) -> Result<Ack, DriverError> {
        self.call_ack(
            to,
            DriverRequest::Extinguish(ExtinguishRequest {
                session_id: session_id.clone(),
            }),
        )
        .await
    }

    /// Assign the asset on `to`.
    pub async fn assign_asset(
        &self,
        to: &DriverId,
        session_id: &SessionId,
    ) -> Result<Ack, DriverError> {
        self.call_ack(
            to,
            DriverRequest::AssignAsset(AssignAssetRequest {
                session_id: session_id.clone(),
            }),
        )
        .await
    }

    /// Reveal a preimage to `to`.
    pub async fn claim(&self, to: &DriverId, request: ClaimRequest) -> Result<Ack, DriverError> {
        self.call_ack(to, DriverRequest::Claim(request)).await
    }

    /// Session snapshot from `to`.
    pub async fn session_status(
        &self,
        to: &DriverId,
        session_id: &SessionId,
    ) -> Result<SessionStatus, DriverError> {
        let response = self
            .call(
                to,
                DriverRequest::SessionStatus(SessionStatusRequest {
                    session_id: session_id.clone(),
                }),
            )
            .await?;
        match response {
            DriverResponse::Status(status) => Ok(status),
            other => Err(DriverError::UnexpectedResponse(format!(
                "expected SessionStatusSnapshot, got {}",
                other.type_name()
            ))),
        }
    }

    // =========================================================================
    // CALL MACHINERY
    // =========================================================================

    async fn call_ack(&self, to: &DriverId, request: DriverRequest) -> Result<Ack, DriverError> {
        match self.call(to, request).await? {
            DriverResponse::Ack(ack) => Ok(ack),
            other => Err(DriverError::UnexpectedResponse(format!(
                "expected Ack, got {}",
                other.type_name()
            ))),
        }
    }

    /// One logical call, retried per policy. Error acks come back as
    /// `DriverError::Remote`.
    async fn call(
        &self,
        to: &DriverId,
        request: DriverRequest,
    ) -> Result<DriverResponse, DriverError> {
        let key = self.local_key()?;
        let correlation_id = Uuid::new_v4();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let result = self.attempt(to, &request, correlation_id, &key).await;
            match result {
                Err(e)
                    if request.is_idempotent()
                        && e.is_retryable()
                        && should_retry(&self.retry, attempts) =>
                {
                    let backoff = backoff_for_attempt(&self.retry, attempts - 1);
                    warn!(
                        request = request.type_name(),
                        to = %to,
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "[ix-04] Retrying call"
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    async fn attempt(
        &self,
        to: &DriverId,
        request: &DriverRequest,
        correlation_id: Uuid,
        key: &[u8],
    ) -> Result<DriverResponse, DriverError> {
        let envelope = DriverEnvelope::seal(
            request.type_name(),
            self.local.clone(),
            to.clone(),
            correlation_id,
            request,
            key,
        )?;

        let response =
            match tokio::time::timeout(self.timeouts.request(), self.transport.send(envelope)).await
            {
                Ok(sent) => sent?,
                Err(_) => {
                    return Err(DriverError::Timeout(format!(
                        "{} to {} after {}ms",
                        request.type_name(),
                        to,
                        self.timeouts.request_ms
                    )))
                }
            };

        self.open_response(to, correlation_id, &response)
    }

    fn open_response(
        &self,
        to: &DriverId,
        correlation_id: Uuid,
        envelope: &DriverEnvelope,
    ) -> Result<DriverResponse, DriverError> {
        self.verifier.verify(envelope)?;
        if envelope.correlation_id != correlation_id || &envelope.sender != to {
            return Err(DriverError::UnexpectedResponse(format!(
                "response {} from {} does not answer {} to {}",
                envelope.correlation_id, envelope.sender, correlation_id, to
            )));
        }

        let response: DriverResponse = envelope.open()?;
        if envelope.type_name() != Some(response.type_name()) {
            return Err(DriverError::UnexpectedResponse(format!(
                "type tag {} does not match {}",
                envelope.message_type,
                response.type_name()
            )));
        }
        if let DriverResponse::Ack(ack) = response {
            return DriverError::check_ack(ack).map(DriverResponse::Ack);
        }
        Ok(response)
    }

    fn local_key(&self) -> Result<Vec<u8>, DriverError> {
        self.keys.shared_secret(&self.local).ok_or_else(|| {
            DriverError::Unauthorized(format!("no envelope key for {}", self.local))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransportError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared_types::{AckCode, LedgerRef};
    use std::sync::atomic::{AtomicU32, Ordering};

    const MASTER: &[u8] = b"0123456789abcdef-relay-master";

    /// Answers every request with `reply`, after hanging on the first
    /// `hang` requests.
    struct ScriptedPeer {
        keys: DerivedKeyProvider,
        hang: u32,
        seen: AtomicU32,
        reply: Mutex<DriverResponse>,
    }

    impl ScriptedPeer {
        fn new(hang: u32, reply: DriverResponse) -> Arc<Self> {
            Arc::new(Self {
                keys: DerivedKeyProvider::new(MASTER.to_vec()),
                hang,
                seen: AtomicU32::new(0),
                reply: Mutex::new(reply),
            })
        }
    }

    #[async_trait]
    impl DriverTransport for ScriptedPeer {
        async fn send(&self, envelope: DriverEnvelope) -> Result<DriverEnvelope, TransportError> {
            let n = self.seen.fetch_add(1, Ordering::SeqCst);
            if n < self.hang {
                return std::future::pending().await;
            }
            let key = self
                .keys
                .shared_secret(&envelope.recipient)
                .ok_or_else(|| TransportError::Codec("no key".into()))?;
            let reply = self.reply.lock().clone();
            Ok(envelope.reply(reply.type_name(), &reply, &key)?)
        }
    }

    fn client(peer: Arc<ScriptedPeer>) -> DriverClient {
        DriverClient::new(
            DriverId::new("driver-a"),
            DerivedKeyProvider::new(MASTER.to_vec()),
            peer,
            Arc::new(PendingViews::new()),
        )
        .with_timeouts(TimeoutConfig {
            request_ms: 100,
            ..TimeoutConfig::default()
        })
        .with_retry(RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 10,
            ..RetryPolicy::default()
        })
    }

    fn query() -> Query {
        Query {
            request_id: String::new(),
            session_id: SessionId::new("s1"),
            requesting_driver: DriverId::new("someone-else"),
            target: LedgerRef::new("net-b", "channel-1"),
            address: "htlc:getLock:asset-7".into(),
            nonce: String::new(),
            signature: None,
            certificate: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_call_retried_after_timeout() {
        let peer = ScriptedPeer::new(2, DriverResponse::Ack(Ack::ok_with("LOCKED")));
        let client = client(Arc::clone(&peer));

        let ack = client
            .create_asset(&DriverId::new("driver-b"), &SessionId::new("s1"))
            .await
            .unwrap();
        assert_eq!(ack.message.as_deref(), Some("LOCKED"));
        assert_eq!(peer.seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_returns_timeout() {
        let peer = ScriptedPeer::new(10, DriverResponse::Ack(Ack::ok()));
        let client = client(Arc::clone(&peer));

        let err = client
            .assign_asset(&DriverId::new("driver-b"), &SessionId::new("s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout(_)));
        assert_eq!(peer.seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_request_never_resent() {
        let peer = ScriptedPeer::new(1, DriverResponse::Ack(Ack::ok()));
        let client = client(Arc::clone(&peer));

        let err = client
            .begin_request_driver_state(&DriverId::new("driver-b"), query())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DriverError::Timeout(_)));
        assert_eq!(peer.seen.load(Ordering::SeqCst), 1);
        assert_eq!(client.pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_ack_becomes_remote_error() {
        let peer = ScriptedPeer::new(
            0,
            DriverResponse::Ack(Ack::error(AckCode::InvalidPreimage, "digest mismatch")),
        );
        let client = client(peer);

        let err = client
            .claim(
                &DriverId::new("driver-b"),
                ClaimRequest {
                    session_id: SessionId::new("s1"),
                    preimage: b"wrong".to_vec(),
                    ctx: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Remote {
                code: AckCode::InvalidPreimage,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_state_request_registers_pending() {
        let peer = ScriptedPeer::new(0, DriverResponse::Ack(Ack::ok()));
        let client = client(peer);

        let pending = client
            .begin_request_driver_state(&DriverId::new("driver-b"), query())
            .await
            .unwrap();
        assert!(!pending.request_id().is_empty());
        assert!(client.pending().is_pending(pending.request_id()));
        assert!(pending.cancel());
        assert_eq!(client.pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unsigned_subscription_query_rejected() {
        let mut unsigned = query();
        unsigned.request_id = "sub-1".into();
        let peer = ScriptedPeer::new(0, DriverResponse::Query(unsigned));
        let client = client(peer);

        let spec = EventSubscriptionSpec {
            query: shared_types::EventQuery {
                ledger: LedgerRef::new("net-b", "channel-1"),
                contract_address: Some("htlc".into()),
                event_name: None,
                address_range: None,
            },
            target: shared_types::DeliveryTarget::Callback(DriverId::new("driver-a")),
            owner: None,
        };
        let err = client
            .request_signed_event_subscription_query(&DriverId::new("driver-b"), spec)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_subscription_query_needs_trusted_signer() {
        use ix_01_view_proof::{NotaryKey, TrustAnchor};

        let driver_b = Notary::new("driver-b", NotaryKey::ed25519_from_seed([2u8; 32]));
        let trust = TrustStore::with_anchors([TrustAnchor::new(
            "net-b",
            1,
            vec![driver_b.trusted_key()],
        )]);
        let spec = EventSubscriptionSpec {
            query: shared_types::EventQuery {
                ledger: LedgerRef::new("net-b", "channel-1"),
                contract_address: Some("htlc".into()),
                event_name: None,
                address_range: None,
            },
            target: shared_types::DeliveryTarget::Callback(DriverId::new("driver-a")),
            owner: None,
        };

        let mut forged = query();
        forged.request_id = "sub-1".into();
        Notary::new("mallory", NotaryKey::generate(shared_types::SignatureScheme::Ed25519))
            .sign_query(&mut forged);
        let peer = ScriptedPeer::new(0, DriverResponse::Query(forged.clone()));
        let codec = Arc::new(ViewCodec::new(Arc::new(trust)));
        let client = client(peer).with_codec(Arc::clone(&codec));
        let err = client
            .request_signed_event_subscription_query(&DriverId::new("driver-b"), spec.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Unauthorized(_)));

        let mut signed = forged;
        driver_b.sign_query(&mut signed);
        let peer = ScriptedPeer::new(0, DriverResponse::Query(signed.clone()));
        let client = self::client(peer).with_codec(codec);
        let query = client
            .request_signed_event_subscription_query(&DriverId::new("driver-b"), spec)
            .await
            .unwrap();
        assert_eq!(query, signed);
    }

    #[tokio::test]
    async fn test_wrong_response_type_rejected() {
        let peer = ScriptedPeer::new(0, DriverResponse::Ack(Ack::ok()));
        let client = client(peer);

        let err = client
            .session_status(&DriverId::new("driver-b"), &SessionId::new("s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::UnexpectedResponse(_)));
    }
}
