//! # Algorithms Module
//!
//! Framing and notarization checks.

pub mod framing;
pub mod verification;

pub use framing::{
    decode_frame, encode_frame, CODEC_VERSION, DEFAULT_MAX_VIEW_BYTES, FRAME_HEADER_LEN,
    VIEW_MAGIC,
};
pub use verification::{verify_notarizations, verify_query_signature};
