//! # Event Matching
//!
//! Pure functions: which subscriptions an emitted event reaches, what the
//! notification looks like, and the key a target dedups it under.

use crate::domain::EventSubscription;
use shared_bus::Notification;
use shared_crypto::sha256_hash;
use shared_types::{ContractTransaction, DeliveryTarget, Hash};

/// Subscriptions whose query matches `ctx`, ordered by id.
pub fn matching_subscriptions<'a>(
    subscriptions: impl IntoIterator<Item = &'a EventSubscription>,
    ctx: &ContractTransaction,
) -> Vec<&'a EventSubscription> {
    let mut matched: Vec<_> = subscriptions
        .into_iter()
        .filter(|sub| sub.spec.query.matches(ctx))
        .collect();
    matched.sort_by(|a, b| a.id.cmp(&b.id));
    matched
}

/// Notification carrying `view_payload` to the subscription's target.
pub fn build_notification(
    subscription: &EventSubscription,
    view_payload: &[u8],
    ctx: &ContractTransaction,
) -> Notification {
    Notification {
        subscription_id: subscription.id.clone(),
        target: subscription.spec.target.clone(),
        session_id: subscription.session_id(),
        view_payload: view_payload.to_vec(),
        ctx: ctx.clone(),
    }
}

/// Dedup key for one event at one target.
///
/// Two subscriptions with the same target and a shared event collapse to a
/// single delivery.
pub fn delivery_key(target: &DeliveryTarget, ctx: &ContractTransaction) -> Hash {
    let mut bytes = Vec::with_capacity(64);
    match target {
        DeliveryTarget::Session(id) => {
            bytes.push(0u8);
            bytes.extend_from_slice(id.as_str().as_bytes());
        }
        DeliveryTarget::Callback(driver) => {
            bytes.push(1u8);
            bytes.extend_from_slice(driver.as_str().as_bytes());
        }
    }
    bytes.push(0xff);
    bytes.extend_from_slice(&ctx.dedup_key());
    sha256_hash(&bytes)
}
