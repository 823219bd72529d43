//! # Asset Exchange Flows
//!
//! A drives the HTLC state machine on B's side of a session:
//!
//! ```text
//! open -> performLock -> (LOCKED) -> createAsset -> claim -> assign
//! ```
//!
//! plus the ways it stops early: expiry, cooperative extinguish, and
//! concurrent callers racing the same transition.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::harness::{eventually, lock_terms, TwoDrivers, LOCK_TTL};
    use ix_02_asset_exchange::{AssetExchangeApi, LedgerAction, Preimage};
    use shared_types::{
        AckCode, AssetStatus, ClaimRequest, DeliveryTarget, EventQuery, EventSubscriptionSpec,
        PerformLockRequest, SessionState,
    };

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_lock_create_claim_assign() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"open sesame".to_vec());
        let terms = lock_terms(&pair.b, "asset-1", &preimage);
        let session = pair.open_session("s-happy", Some(terms)).await;
        let b = pair.b.id();
        let client = pair.a.client();

        let ack = client
            .perform_lock(
                b,
                PerformLockRequest {
                    session_id: session.clone(),
                    lock_terms: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(ack.message.as_deref(), Some("LOCKED"));

        let ack = client.create_asset(b, &session).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("ASSET_CREATED"));

        let ack = client
            .claim(
                b,
                ClaimRequest {
                    session_id: session.clone(),
                    preimage: preimage.as_bytes().to_vec(),
                    ctx: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(ack.message.as_deref(), Some("CLAIM_PENDING"));

        let ack = client.assign_asset(b, &session).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("ASSIGNED"));

        let status = client.session_status(b, &session).await.unwrap();
        assert_eq!(status.state, SessionState::Assigned);
        assert_eq!(status.asset_status, Some(AssetStatus::Assigned));
        assert_eq!(status.asset_owner.as_deref(), Some("bob"));

        // One ledger action per step, in order
        let actions = pair.b.ledger.submitted();
        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], LedgerAction::Lock { .. }));
        assert!(matches!(actions[1], LedgerAction::Create { .. }));
        assert!(matches!(actions[2], LedgerAction::Assign { .. }));

        let states: Vec<_> = pair
            .b
            .exchange()
            .history(&session)
            .into_iter()
            .map(|r| r.to)
            .collect();
        assert_eq!(
            states,
            vec![
                SessionState::LockRequested,
                SessionState::Locked,
                SessionState::AssetCreated,
                SessionState::ClaimPending,
                SessionState::Assigned,
            ]
        );
    }

    #[tokio::test]
    async fn test_wrong_preimage_keeps_session_open() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"right".to_vec());
        let session = pair
            .open_session("s-preimage", Some(lock_terms(&pair.b, "asset-2", &preimage)))
            .await;
        let b = pair.b.id();
        let client = pair.a.client();
        client
            .perform_lock(
                b,
                PerformLockRequest {
                    session_id: session.clone(),
                    lock_terms: None,
                },
            )
            .await
            .unwrap();
        client.create_asset(b, &session).await.unwrap();

        let err = client
            .claim(
                b,
                ClaimRequest {
                    session_id: session.clone(),
                    preimage: b"wrong".to_vec(),
                    ctx: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::InvalidPreimage);

        let status = client.session_status(b, &session).await.unwrap();
        assert_eq!(status.state, SessionState::AssetCreated);
    }

    #[tokio::test]
    async fn test_steps_out_of_order_rejected() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"p".to_vec());
        let session = pair
            .open_session("s-order", Some(lock_terms(&pair.b, "asset-3", &preimage)))
            .await;

        let err = pair
            .a
            .client()
            .assign_asset(pair.b.id(), &session)
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::InvalidTransition);
        assert!(pair.b.ledger.submitted().is_empty());
    }

    // =========================================================================
    // EXPIRY
    // =========================================================================

    #[tokio::test]
    async fn test_claim_after_deadline_expires_session() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"too late".to_vec());
        let session = pair
            .open_session("s-expiry", Some(lock_terms(&pair.b, "asset-4", &preimage)))
            .await;
        let b = pair.b.id();
        let client = pair.a.client();
        client
            .perform_lock(
                b,
                PerformLockRequest {
                    session_id: session.clone(),
                    lock_terms: None,
                },
            )
            .await
            .unwrap();
        client.create_asset(b, &session).await.unwrap();

        // One second past the time lock
        pair.b.clock.advance(LOCK_TTL + 1);

        let err = client
            .claim(
                b,
                ClaimRequest {
                    session_id: session.clone(),
                    preimage: preimage.as_bytes().to_vec(),
                    ctx: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Expired);

        let status = client.session_status(b, &session).await.unwrap();
        assert_eq!(status.state, SessionState::Expired);
        assert_eq!(status.asset_status, Some(AssetStatus::Reverted));
        assert_eq!(status.asset_owner.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_sweep_expires_idle_session() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"idle".to_vec());
        let session = pair
            .open_session("s-idle", Some(lock_terms(&pair.b, "asset-5", &preimage)))
            .await;
        pair.a
            .client()
            .perform_lock(
                pair.b.id(),
                PerformLockRequest {
                    session_id: session.clone(),
                    lock_terms: None,
                },
            )
            .await
            .unwrap();

        pair.b.clock.advance(LOCK_TTL + 1);
        assert_eq!(pair.b.node.sweep_once().await, 1);
        assert_eq!(pair.b.node.sweep_once().await, 0);

        let status = pair.b.exchange().status(&session).await.unwrap();
        assert_eq!(status.state, SessionState::Expired);
    }

    // =========================================================================
    // EXTINGUISH AND TEARDOWN
    // =========================================================================

    #[tokio::test]
    async fn test_extinguish_tears_down_session_subscriptions() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"abort".to_vec());
        let session = pair
            .open_session("s-abort", Some(lock_terms(&pair.b, "asset-6", &preimage)))
            .await;
        let b = pair.b.id();
        let client = pair.a.client();

        let spec = EventSubscriptionSpec {
            query: EventQuery {
                ledger: pair.b.ledger_ref(),
                contract_address: Some("htlc".into()),
                event_name: None,
                address_range: None,
            },
            target: DeliveryTarget::Callback(pair.a.id().clone()),
            owner: Some(session.clone()),
        };
        client.subscribe_event(b, spec).await.unwrap();
        assert_eq!(pair.b.node.subscriptions().total_subscriptions(), 1);

        client
            .perform_lock(
                b,
                PerformLockRequest {
                    session_id: session.clone(),
                    lock_terms: None,
                },
            )
            .await
            .unwrap();
        let ack = client.extinguish(b, &session).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("EXTINGUISHED"));

        let subscriptions = pair.b.node.subscriptions().clone();
        assert!(
            eventually(Duration::from_secs(2), || subscriptions.total_subscriptions() == 0).await,
            "terminal session keeps its subscriptions"
        );

        // Terminal sessions refuse further steps
        let err = client.create_asset(b, &session).await.unwrap_err();
        assert_eq!(err.code(), AckCode::InvalidTransition);
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[tokio::test]
    async fn test_concurrent_locks_submit_once() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"race".to_vec());
        let session = pair
            .open_session("s-race", Some(lock_terms(&pair.b, "asset-7", &preimage)))
            .await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let client = pair.a.client().clone();
            let b = pair.b.id().clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                client
                    .perform_lock(
                        &b,
                        PerformLockRequest {
                            session_id: session,
                            lock_terms: None,
                        },
                    )
                    .await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            let ack = handle.await.unwrap().unwrap();
            if ack.message.as_deref() == Some("LOCKED") {
                applied += 1;
            } else {
                assert!(ack.message.unwrap_or_default().starts_with("duplicate"));
            }
        }
        assert_eq!(applied, 1);

        let locks = pair
            .b
            .ledger
            .submitted()
            .into_iter()
            .filter(|a| matches!(a, LedgerAction::Lock { .. }))
            .count();
        assert_eq!(locks, 1);
    }
}
