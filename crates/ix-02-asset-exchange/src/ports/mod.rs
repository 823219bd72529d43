//! # Ports Module
//!
//! Inbound API and outbound dependencies.

pub mod inbound;
pub mod outbound;

pub use inbound::AssetExchangeApi;
pub use outbound::{Clock, ConnectorError, LedgerConnector, TransitionJournal};
