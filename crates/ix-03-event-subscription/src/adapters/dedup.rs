//! Target-side notification dedup.
//!
//! Delivery is at-least-once, so a target may see the same event more than
//! once. Keys combine the target with the emitting `ContractTransaction`.
//! A target checks before applying and records only once the event is
//! applied, so a failed attempt can still be retried.

use crate::algorithms::delivery_key;
use crate::domain::SubscriptionConfig;
use parking_lot::Mutex;
use shared_bus::{DedupError, TimeBoundedDedupCache};
use shared_types::{ContractTransaction, DeliveryTarget};
use tracing::debug;

/// Bounded, time-windowed record of applied notifications.
pub struct NotificationDedup {
    cache: Mutex<TimeBoundedDedupCache>,
}

impl NotificationDedup {
    /// Dedup with the window and bound from `config`.
    pub fn new(config: &SubscriptionConfig) -> Self {
        Self {
            cache: Mutex::new(TimeBoundedDedupCache::with_config(
                config.dedup_window_secs,
                config.dedup_max_entries,
            )),
        }
    }

    /// Whether `target` already applied the event emitted by `ctx`.
    pub fn already_delivered(&self, target: &DeliveryTarget, ctx: &ContractTransaction) -> bool {
        self.cache.lock().contains(&delivery_key(target, ctx))
    }

    /// Remember that `target` applied the event. Returns `false` if it had
    /// already been recorded within the window.
    pub fn record_delivery(
        &self,
        target: &DeliveryTarget,
        ctx: &ContractTransaction,
        now: u64,
    ) -> bool {
        match self.cache.lock().check_and_add(delivery_key(target, ctx), now) {
            Ok(()) => true,
            Err(DedupError::Duplicate { key, first_seen }) => {
                debug!(
                    tx_id = %ctx.tx_id,
                    key = %key,
                    first_seen,
                    "[ix-03] Delivery already recorded"
                );
                false
            }
        }
    }

    /// Remembered keys.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for NotificationDedup {
    fn default() -> Self {
        Self::new(&SubscriptionConfig::default())
    }
}
