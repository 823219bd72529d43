//! # State Requests
//!
//! `RequestDriverState` is acknowledged at once; the View arrives later as a
//! `WriteExternalState` callback. These tests cover the answer, the
//! deadline, caller cancellation and the checks on the callback itself.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::harness::{notary, TwoDrivers, B};
    use ix_02_asset_exchange::AssetExchangeApi;
    use ix_04_driver::{view_key_for, DriverError, STATE_QUERY_EVENT};
    use shared_types::{AckCode, Query, SessionId, StatePayload};

    fn query(pair: &TwoDrivers, session: &SessionId, address: &str) -> Query {
        Query {
            request_id: String::new(),
            session_id: session.clone(),
            requesting_driver: pair.a.id().clone(),
            target: pair.b.ledger_ref(),
            address: address.into(),
            nonce: String::new(),
            signature: None,
            certificate: None,
        }
    }

    #[tokio::test]
    async fn test_view_arrives_by_callback() {
        let pair = TwoDrivers::new();
        let session = pair.open_session("s-state", None).await;
        pair.b.ledger.put_state(
            pair.b.ledger_ref(),
            "balance:alice",
            StatePayload::Json(r#"{"balance":100}"#.into()),
        );

        let q = query(&pair, &session, "balance:alice");
        let view = pair
            .a
            .client()
            .request_driver_state(pair.b.id(), q.clone(), Some(Duration::from_secs(2)))
            .await
            .unwrap();

        assert_eq!(view.payload.data, StatePayload::Json(r#"{"balance":100}"#.into()));
        assert_eq!(view.contract_context.event_name, STATE_QUERY_EVENT);
        assert_eq!(view.contract_context.contract_address, "balance:alice");
        assert_eq!(view.meta.network_id, "net-b");
        assert_eq!(
            view.payload.notarizations[0].signer_id,
            notary(&B).trusted_key().signer_id
        );

        // Stored on A's session under the ledger#address key
        let key = view_key_for(&view.contract_context);
        assert_eq!(key, q.view_key());
        assert_eq!(pair.a.exchange().view(&session, &key), Some(view));
        assert_eq!(pair.a.client().pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_state_fails_fast() {
        let pair = TwoDrivers::new();
        let session = pair.open_session("s-missing", None).await;

        let err = pair
            .a
            .client()
            .request_driver_state(
                pair.b.id(),
                query(&pair, &session, "nothing-here"),
                Some(Duration::from_secs(2)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Remote { .. }));
        assert_eq!(pair.a.client().pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_no_callback_times_out() {
        let pair = TwoDrivers::new();
        let session = pair.open_session("s-deadline", None).await;
        pair.b
            .ledger
            .put_state(pair.b.ledger_ref(), "k", StatePayload::Opaque(vec![1]));

        // A can still send but B's callback has nowhere to go
        pair.network.disconnect(pair.a.id());

        let err = pair
            .a
            .client()
            .request_driver_state(
                pair.b.id(),
                query(&pair, &session, "k"),
                Some(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout(_)));
        assert_eq!(err.code(), AckCode::Timeout);
        assert_eq!(pair.a.client().pending().pending_count(), 0);
        assert_eq!(pair.a.exchange().view(&session, "net-b/main#k"), None);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let pair = TwoDrivers::new();
        let session = pair.open_session("s-cancel", None).await;
        pair.b
            .ledger
            .put_state(pair.b.ledger_ref(), "k", StatePayload::Opaque(vec![1]));
        pair.network.disconnect(pair.a.id());

        let pending = pair
            .a
            .client()
            .begin_request_driver_state(pair.b.id(), query(&pair, &session, "k"))
            .await
            .unwrap();
        let request_id = pending.request_id().to_string();
        assert!(pair.a.client().pending().is_pending(&request_id));

        let canceller = pending.canceller();
        let waiter = tokio::spawn(pending.wait(Duration::from_secs(5)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(canceller.cancel());

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, DriverError::Cancelled(_)));
        assert!(!pair.a.client().pending().is_pending(&request_id));
    }

    #[tokio::test]
    async fn test_query_for_other_ledger_rejected() {
        let pair = TwoDrivers::new();
        let session = pair.open_session("s-target", None).await;

        let mut q = query(&pair, &session, "k");
        q.target = pair.a.ledger_ref();
        let err = pair
            .a
            .client()
            .request_driver_state(pair.b.id(), q, Some(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), AckCode::Mismatch);
    }
}
