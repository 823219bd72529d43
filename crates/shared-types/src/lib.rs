//! # Shared Types Crate
//!
//! This crate contains the data model shared by every interop driver crate:
//! sessions, views, queries, asset descriptors, the driver request/response
//! set, and the sealed `DriverEnvelope` that carries them between drivers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-driver types are defined here.
//! - **Envelope Integrity**: `DriverEnvelope` is the sole wrapper for
//!   driver-to-driver traffic; it is versioned, timestamped and HMAC-sealed.
//! - **Envelope Authority**: the envelope's `sender` is the authoritative
//!   identity of the calling driver; payloads never restate it.
//! - **Closed Payload Shapes**: ledger state travels as `StatePayload`, a
//!   tagged union with an opaque-bytes fallback, never as an untyped value.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;
pub mod registry;
pub mod security;

pub use entities::*;
pub use envelope::DriverEnvelope;
pub use errors::*;
pub use ipc::*;
pub use registry::{schema_registry, MessageSchema, SchemaRegistry};
pub use security::*;
