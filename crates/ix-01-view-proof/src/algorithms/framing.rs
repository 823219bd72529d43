//! # View Framing
//!
//! `magic | version | length | bincode(View)`. The body uses fixed-width
//! integers and rejects trailing bytes, so one View has exactly one encoding.

use crate::domain::DecodeError;
use bincode::Options;
use shared_types::View;

/// Frame magic.
pub const VIEW_MAGIC: [u8; 4] = *b"IXVW";

/// Current codec version.
pub const CODEC_VERSION: u16 = 1;

/// Magic + version + body length.
pub const FRAME_HEADER_LEN: usize = 10;

/// Default upper bound on a frame.
pub const DEFAULT_MAX_VIEW_BYTES: usize = 4 * 1024 * 1024;

fn body_options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

/// Encode a View into a frame no larger than `max_bytes`.
pub fn encode_frame(view: &View, max_bytes: usize) -> Result<Vec<u8>, DecodeError> {
    let body_size = body_options()
        .serialized_size(view)
        .map_err(|e| DecodeError::Malformed(e.to_string()))? as usize;
    if FRAME_HEADER_LEN + body_size > max_bytes {
        return Err(DecodeError::Oversized {
            size: FRAME_HEADER_LEN + body_size,
            max: max_bytes,
        });
    }
    let body = body_options()
        .serialize(view)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let body_len = u32::try_from(body.len()).map_err(|_| DecodeError::Oversized {
        size: body.len(),
        max: max_bytes,
    })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    frame.extend_from_slice(&VIEW_MAGIC);
    frame.extend_from_slice(&CODEC_VERSION.to_be_bytes());
    frame.extend_from_slice(&body_len.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Parse a frame into a View. Performs no trust checks.
pub fn decode_frame(bytes: &[u8], max_bytes: usize) -> Result<View, DecodeError> {
    if bytes.len() > max_bytes {
        return Err(DecodeError::Oversized {
            size: bytes.len(),
            max: max_bytes,
        });
    }
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(DecodeError::Malformed(format!(
            "frame truncated: {} bytes, header needs {}",
            bytes.len(),
            FRAME_HEADER_LEN
        )));
    }
    if bytes[0..4] != VIEW_MAGIC {
        return Err(DecodeError::Malformed("bad magic".to_string()));
    }

    let version = u16::from_be_bytes([bytes[4], bytes[5]]);
    if version != CODEC_VERSION {
        return Err(DecodeError::Malformed(format!(
            "unsupported codec version {version}, expected {CODEC_VERSION}"
        )));
    }

    let declared = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    let body = &bytes[FRAME_HEADER_LEN..];
    if body.len() != declared {
        return Err(DecodeError::Malformed(format!(
            "body length {} does not match header {declared}",
            body.len()
        )));
    }

    body_options()
        .with_limit(max_bytes as u64)
        .deserialize(body)
        .map_err(|e| DecodeError::Malformed(e.to_string()))
}
