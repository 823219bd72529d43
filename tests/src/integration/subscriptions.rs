//! # Event Subscriptions
//!
//! A subscribes at B for events on B's ledger. B observes an event, matches
//! it, and calls A back with a notarized view that drives A's session.
//!
//! ```text
//! B ledger event ──observe_event──→ B subscriptions ──Notification──→
//!   B delivery ──WriteExternalState──→ A server ──apply_event──→ A session
//! ```

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::harness::{event_view, eventually, lock_terms, notary, TwoDrivers, B};
    use ix_01_view_proof::{verify_query_signature, TrustAnchor, VerifierSet, ViewCodecApi};
    use ix_02_asset_exchange::{AssetExchangeApi, InMemoryLedgerConnector, Preimage};
    use ix_03_event_subscription::EventSubscriptionApi;
    use ix_04_driver::view_key_for;
    use shared_bus::{EventFilter, EventTopic};
    use shared_types::{
        AckCode, DeliveryTarget, EventQuery, EventSubscriptionSpec, SessionId, SessionState,
        StatePayload,
    };

    fn spec(pair: &TwoDrivers, session: &SessionId, event: Option<&str>) -> EventSubscriptionSpec {
        EventSubscriptionSpec {
            query: EventQuery {
                ledger: pair.b.ledger_ref(),
                contract_address: Some("htlc".into()),
                event_name: event.map(str::to_string),
                address_range: None,
            },
            target: DeliveryTarget::Callback(pair.a.id().clone()),
            owner: Some(session.clone()),
        }
    }

    /// Pair whose A side waits for lock confirmations, with a session in
    /// `LOCK_REQUESTED` on A.
    async fn pair_with_requested_lock(id: &str) -> (TwoDrivers, SessionId) {
        let pair = TwoDrivers::build(|_| {}, InMemoryLedgerConnector::new().with_pending_locks());
        let preimage = Preimage::new(id.as_bytes().to_vec());
        let terms = lock_terms(&pair.a, "asset-a", &preimage);
        let session = pair.open_session(id, Some(terms)).await;
        pair.a
            .exchange()
            .perform_lock(&session, None)
            .await
            .unwrap();
        assert_eq!(
            pair.a.exchange().status(&session).await.unwrap().state,
            SessionState::LockRequested
        );
        (pair, session)
    }

    #[tokio::test]
    async fn test_remote_lock_event_confirms_local_lock() {
        let (pair, session) = pair_with_requested_lock("s-confirm").await;

        let id = pair
            .a
            .client()
            .subscribe_event(pair.b.id(), spec(&pair, &session, Some("LockApplied")))
            .await
            .unwrap();
        assert_eq!(pair.b.node.subscriptions().total_subscriptions(), 1);
        assert!(pair.b.node.subscriptions().get(&id).is_some());

        let view = event_view(
            pair.b.ledger_ref(),
            "LockApplied",
            "tx-lock-1",
            StatePayload::LockReceipt {
                tx_ref: "tx-lock-1".into(),
            },
        );
        let key = view_key_for(&view.contract_context);
        assert!(pair.b.node.observe_event(view).await.unwrap() > 0);

        let exchange = pair.a.exchange().clone();
        let watched = session.clone();
        assert!(
            eventually(Duration::from_secs(2), || exchange.view(&watched, &key).is_some()).await,
            "notification never reached A"
        );
        let status = pair.a.exchange().status(&session).await.unwrap();
        assert_eq!(status.state, SessionState::Locked);
    }

    #[tokio::test]
    async fn test_redelivered_event_applied_once() {
        let (pair, session) = pair_with_requested_lock("s-dedup").await;
        let mut dead_letters = pair
            .b
            .node
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::DeadLetterQueue]));
        pair.a
            .client()
            .subscribe_event(pair.b.id(), spec(&pair, &session, None))
            .await
            .unwrap();

        let view = event_view(
            pair.b.ledger_ref(),
            "LockApplied",
            "tx-lock-2",
            StatePayload::LockReceipt {
                tx_ref: "tx-lock-2".into(),
            },
        );
        let key = view_key_for(&view.contract_context);
        pair.b.node.observe_event(view.clone()).await.unwrap();

        let exchange = pair.a.exchange().clone();
        let watched = session.clone();
        assert!(eventually(Duration::from_secs(2), || exchange.view(&watched, &key).is_some()).await);

        // Same ledger transaction observed again
        pair.b.node.observe_event(view).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let locked = pair
            .a
            .exchange()
            .history(&session)
            .iter()
            .filter(|r| r.to == SessionState::Locked)
            .count();
        assert_eq!(locked, 1);
        assert!(matches!(dead_letters.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_unmatched_event_not_delivered() {
        let (pair, session) = pair_with_requested_lock("s-filter").await;
        pair.a
            .client()
            .subscribe_event(pair.b.id(), spec(&pair, &session, Some("LockApplied")))
            .await
            .unwrap();

        let view = event_view(
            pair.b.ledger_ref(),
            "Transfer",
            "tx-other",
            StatePayload::Opaque(vec![7]),
        );
        let key = view_key_for(&view.contract_context);
        assert!(pair.b.node.observe_event(view).await.unwrap() > 0);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(pair.a.exchange().view(&session, &key), None);
        assert_eq!(
            pair.a.exchange().status(&session).await.unwrap().state,
            SessionState::LockRequested
        );
    }

    #[tokio::test]
    async fn test_signed_query_and_unsubscribe() {
        let (pair, session) = pair_with_requested_lock("s-signed").await;
        let client = pair.a.client();
        let spec = spec(&pair, &session, Some("LockApplied"));
        let id = client.subscribe_event(pair.b.id(), spec.clone()).await.unwrap();

        let query = client
            .request_signed_event_subscription_query(pair.b.id(), spec)
            .await
            .unwrap();
        assert_eq!(query.requesting_driver, *pair.a.id());
        assert_eq!(query.session_id, session);
        let anchor = TrustAnchor::new(B.network, 1, vec![notary(&B).trusted_key()]);
        assert!(verify_query_signature(&query, &anchor, &VerifierSet::standard()));
        assert!(pair.a.node.codec().verify_query(&query, B.network));

        client.unsubscribe_event(pair.b.id(), &id).await.unwrap();
        assert_eq!(pair.b.node.subscriptions().total_subscriptions(), 0);

        let err = client.unsubscribe_event(pair.b.id(), &id).await.unwrap_err();
        assert_ne!(err.code(), AckCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_cannot_subscribe_for_another_driver() {
        let (pair, session) = pair_with_requested_lock("s-spoof").await;
        let mut spec = spec(&pair, &session, None);
        spec.target = DeliveryTarget::Callback(pair.b.id().clone());

        let err = pair
            .a
            .client()
            .subscribe_event(pair.b.id(), spec)
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Unauthorized);
        assert_eq!(pair.b.node.subscriptions().total_subscriptions(), 0);
    }

    /// Session on B, locked on B's own ledger.
    async fn pair_with_local_lock(id: &str) -> (TwoDrivers, SessionId) {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(id.as_bytes().to_vec());
        let terms = lock_terms(&pair.b, "asset-b", &preimage);
        let session = pair.open_session(id, Some(terms)).await;
        pair.b
            .exchange()
            .perform_lock(&session, None)
            .await
            .unwrap();
        assert_eq!(
            pair.b.exchange().status(&session).await.unwrap().state,
            SessionState::Locked
        );
        (pair, session)
    }

    #[tokio::test]
    async fn test_cannot_subscribe_for_finished_session() {
        let (pair, session) = pair_with_local_lock("s-finished").await;
        pair.b.exchange().extinguish(&session).await.unwrap();

        let client = pair.a.client();
        let err = client
            .subscribe_event(pair.b.id(), spec(&pair, &session, None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Mismatch);

        let mut feeding = spec(&pair, &session, None);
        feeding.owner = None;
        feeding.target = DeliveryTarget::Session(session.clone());
        let err = client
            .subscribe_event(pair.b.id(), feeding.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Mismatch);

        let err = client
            .request_signed_event_subscription_query(pair.b.id(), feeding)
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Mismatch);
        assert_eq!(pair.b.node.subscriptions().total_subscriptions(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscribe_racing_session_end_leaves_nothing() {
        for round in 0..8 {
            let (pair, session) = pair_with_local_lock(&format!("s-race-{round}")).await;
            let client = pair.a.client().clone();
            let to = pair.b.id().clone();
            let wanted = spec(&pair, &session, None);
            let subscribing =
                tokio::spawn(async move { client.subscribe_event(&to, wanted).await });
            let exchange = pair.b.exchange().clone();
            let ending = session.clone();
            let extinguishing = tokio::spawn(async move { exchange.extinguish(&ending).await });

            let _ = subscribing.await.unwrap();
            extinguishing.await.unwrap().unwrap();

            let subscriptions = pair.b.node.subscriptions().clone();
            assert!(
                eventually(Duration::from_secs(2), || subscriptions.total_subscriptions() == 0)
                    .await,
                "subscription outlived session {session}"
            );
        }
    }
}
