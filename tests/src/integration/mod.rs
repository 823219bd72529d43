//! Two-driver integration flows.

pub mod asset_exchange_flows;
pub mod failure_modes;
pub mod state_requests;
pub mod subscriptions;
