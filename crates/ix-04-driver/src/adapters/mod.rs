//! # Adapters Module

pub mod network;

pub use network::InMemoryNetwork;
