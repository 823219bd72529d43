//! # Failure Modes
//!
//! Lost responses, unreachable peers, a third driver poking at a session it
//! is not part of, and views signed by nobody the receiver trusts.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::harness::{event_view, lock_terms, notary, TwoDrivers, A, B, C};
    use ix_01_view_proof::ViewCodecApi;
    use ix_02_asset_exchange::{AssetExchangeApi, LedgerAction, Preimage};
    use ix_04_driver::{view_key_for, DriverError, TransportError};
    use shared_types::{
        AckCode, ClaimRequest, PerformLockRequest, SessionState, StatePayload,
        WriteExternalStateMessage,
    };

    // =========================================================================
    // TRANSPORT
    // =========================================================================

    #[tokio::test]
    async fn test_lost_response_retried_without_double_lock() {
        let pair = TwoDrivers::build(
            |config| config.timeouts.request_ms = 150,
            Default::default(),
        );
        let preimage = Preimage::new(b"retry".to_vec());
        let session = pair
            .open_session("s-retry", Some(lock_terms(&pair.b, "asset-r", &preimage)))
            .await;

        // B locks, but A never sees the first answer
        pair.network.drop_responses(pair.b.id(), 1);
        let ack = pair
            .a
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
        assert!(ack.message.unwrap_or_default().starts_with("duplicate"));

        let locks = pair
            .b
            .ledger
            .submitted()
            .into_iter()
            .filter(|a| matches!(a, LedgerAction::Lock { .. }))
            .count();
        assert_eq!(locks, 1);
    }

    #[tokio::test]
    async fn test_partitioned_peer_unreachable() {
        let pair = TwoDrivers::new();
        let session = pair.open_session("s-partition", None).await;
        pair.network.partition(pair.b.id());

        let err = pair
            .a
            .client()
            .session_status(pair.b.id(), &session)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Transport(TransportError::Unreachable(_))
        ));

        pair.network.heal(pair.b.id());
        let status = pair
            .a
            .client()
            .session_status(pair.b.id(), &session)
            .await
            .unwrap();
        assert_eq!(status.state, SessionState::Initiated);
    }

    #[tokio::test]
    async fn test_slow_ledger_times_out_request() {
        let pair = TwoDrivers::build(
            |config| {
                config.timeouts.request_ms = 100;
                config.retry.max_attempts = 1;
            },
            Default::default(),
        );
        let preimage = Preimage::new(b"slow".to_vec());
        let session = pair
            .open_session("s-slow", Some(lock_terms(&pair.b, "asset-s", &preimage)))
            .await;
        pair.b.ledger.set_delay(Some(Duration::from_millis(400)));

        let err = pair
            .a
            .client()
            .perform_lock(
                pair.b.id(),
                PerformLockRequest {
                    session_id: session.clone(),
                    lock_terms: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Timeout);
        assert!(err.is_retryable());
    }

    // =========================================================================
    // SESSION BINDING
    // =========================================================================

    #[tokio::test]
    async fn test_third_driver_cannot_drive_session() {
        let pair = TwoDrivers::new();
        let preimage = Preimage::new(b"mine".to_vec());
        let session = pair
            .open_session("s-bound", Some(lock_terms(&pair.b, "asset-m", &preimage)))
            .await;
        let c = pair.join(&C, &[&A, &B]);

        let err = c
            .client()
            .perform_lock(
                pair.b.id(),
                PerformLockRequest {
                    session_id: session.clone(),
                    lock_terms: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Mismatch);

        let err = c
            .client()
            .claim(
                pair.b.id(),
                ClaimRequest {
                    session_id: session.clone(),
                    preimage: preimage.as_bytes().to_vec(),
                    ctx: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Mismatch);

        let status = pair.b.exchange().status(&session).await.unwrap();
        assert_eq!(status.state, SessionState::Initiated);
        assert!(pair.b.ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_view_from_wrong_ledger_rejected() {
        let pair = TwoDrivers::new();
        let session = pair.open_session("s-ledger", None).await;

        // Signed by B's trusted key but describing A's own ledger
        let mut view = event_view(
            pair.a.ledger_ref(),
            "Noted",
            "tx-wrong",
            StatePayload::Opaque(vec![1]),
        );
        view.meta.network_id = B.network.into();
        notary(&B).notarize(&mut view);
        let ctx = view.contract_context.clone();
        let view_payload = pair.b.node.codec().encode(&view).unwrap();

        let err = pair
            .b
            .client()
            .write_external_state(
                pair.a.id(),
                WriteExternalStateMessage {
                    session_id: session.clone(),
                    view_payload,
                    ctx: ctx.clone(),
                    request_id: None,
                    subscription_id: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Mismatch);
        assert_eq!(pair.a.exchange().view(&session, &view_key_for(&ctx)), None);
    }

    // =========================================================================
    // TRUST
    // =========================================================================

    #[tokio::test]
    async fn test_untrusted_view_rejected() {
        let pair = TwoDrivers::new();
        let c = pair.join(&C, &[&A]);

        // A binds a session to C but does not trust net-c
        let session = shared_types::SessionId::new("s-untrusted");
        pair.a
            .exchange()
            .open_session(session.clone(), c.as_counterparty(), None)
            .await
            .unwrap();

        let mut view = event_view(c.ledger_ref(), "Noted", "tx-c", StatePayload::Opaque(vec![3]));
        notary(&C).notarize(&mut view);
        let ctx = view.contract_context.clone();
        let view_payload = c.node.codec().encode(&view).unwrap();

        let err = c
            .client()
            .write_external_state(
                pair.a.id(),
                WriteExternalStateMessage {
                    session_id: session.clone(),
                    view_payload,
                    ctx: ctx.clone(),
                    request_id: None,
                    subscription_id: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Decode);
        assert_eq!(pair.a.exchange().view(&session, &view_key_for(&ctx)), None);
    }
}
