//! # Schema Registry
//!
//! Process-wide table of driver message types: name → wire tag and schema
//! version. Built once on first access and read-only afterwards, so lookups
//! take no lock.
//!
//! Envelopes carry the tag; a receiver rejects tags it does not know.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// One registered message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSchema {
    /// Type name, as returned by `DriverRequest::type_name`.
    pub name: &'static str,
    /// Wire tag carried in `DriverEnvelope::message_type`.
    pub tag: u16,
    /// Payload schema version.
    pub version: u16,
}

/// Immutable name/tag index.
#[derive(Debug)]
pub struct SchemaRegistry {
    by_name: HashMap<&'static str, MessageSchema>,
    by_tag: HashMap<u16, MessageSchema>,
}

const SCHEMAS: &[(&str, u16, u16)] = &[
    // Requests
    ("RequestDriverState", 0x0101, 1),
    ("SubscribeEvent", 0x0102, 1),
    ("RequestSignedEventSubscriptionQuery", 0x0103, 1),
    ("UnsubscribeEvent", 0x0104, 1),
    ("WriteExternalState", 0x0105, 1),
    ("OpenSession", 0x0201, 1),
    ("PerformLock", 0x0202, 1),
    ("CreateAsset", 0x0203, 1),
    ("Extinguish", 0x0204, 1),
    ("AssignAsset", 0x0205, 1),
    ("Claim", 0x0206, 1),
    ("SessionStatus", 0x0207, 1),
    // Responses
    ("Ack", 0x8001, 1),
    ("SignedQuery", 0x8002, 1),
    ("SessionStatusSnapshot", 0x8003, 1),
];

impl SchemaRegistry {
    fn build() -> Self {
        let mut by_name = HashMap::with_capacity(SCHEMAS.len());
        let mut by_tag = HashMap::with_capacity(SCHEMAS.len());
        for &(name, tag, version) in SCHEMAS {
            let schema = MessageSchema { name, tag, version };
            by_name.insert(name, schema);
            by_tag.insert(tag, schema);
        }
        Self { by_name, by_tag }
    }

    /// Look up a message type by name.
    pub fn by_name(&self, name: &str) -> Option<MessageSchema> {
        self.by_name.get(name).copied()
    }

    /// Look up a message type by wire tag.
    pub fn by_tag(&self, tag: u16) -> Option<MessageSchema> {
        self.by_tag.get(&tag).copied()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

lazy_static! {
    static ref SCHEMA_REGISTRY: SchemaRegistry = SchemaRegistry::build();
}

/// The process-wide registry.
pub fn schema_registry() -> &'static SchemaRegistry {
    &SCHEMA_REGISTRY
}
