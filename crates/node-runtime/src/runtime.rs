//! The runtime around one driver node.

use anyhow::{Context, Result};
use ix_04_driver::{DriverConfig, DriverNode, InMemoryNetwork};
use std::sync::Arc;
use tracing::info;

/// One driver node and the transport it serves on.
pub struct NodeRuntime {
    node: Arc<DriverNode>,
    network: Arc<InMemoryNetwork>,
}

impl NodeRuntime {
    /// Build a node on a fresh in-memory network.
    pub fn new(config: DriverConfig) -> Result<Self> {
        Self::with_network(config, InMemoryNetwork::new())
    }

    /// Build a node on `network`, shared with other drivers in the process.
    pub fn with_network(config: DriverConfig, network: Arc<InMemoryNetwork>) -> Result<Self> {
        let node = DriverNode::builder(config)
            .transport(network.clone())
            .build()
            .context("Failed to build driver node")?;
        node.attach(&network);
        Ok(Self { node, network })
    }

    /// Start background tasks.
    pub fn start(&self) {
        let config = self.node.config();
        info!("===========================================");
        info!("  Relay Driver Runtime v{}", ix_04_driver::VERSION);
        info!("===========================================");
        info!("Driver: {}", self.node.id());
        info!("Ledger: {}", config.ledger_ref());
        info!("Trust anchors: {}", config.trust_anchors.len());
        let key = self.node.trusted_key();
        info!("Notary: {} ({})", key.signer_id, hex::encode(&key.public_key));
        self.node.start();
    }

    /// Stop background tasks.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.node.shutdown();
        info!("Shutdown complete");
    }

    /// The driver node
    pub fn node(&self) -> &Arc<DriverNode> {
        &self.node
    }

    /// The transport the node is attached to
    pub fn network(&self) -> &Arc<InMemoryNetwork> {
        &self.network
    }
}
