//! Trailer Reframing
//!
//! gRPC delivers trailing metadata as HTTP trailers, which gRPC-Web
//! clients cannot read. The transcoder reframes that metadata into one
//! final length-delimited frame appended to the body:
//!
//! ```text
//! +------------------+
//! | 0x80             |  trailer flag (MSB set)
//! +------------------+
//! | 4 bytes: length  |  big-endian payload length
//! +------------------+
//! | header text      |  "key: value\r\n" per value, keys lower-cased
//! +------------------+
//! ```
//!
//! The trailer set is computed lazily at finalize time: pending headers
//! minus the `trailer` announcement key and every key the real sink has
//! already exposed as an ordinary header.

use bytes::{BufMut, Bytes, BytesMut};

use crate::framing::{FRAME_HEADER_SIZE, TRAILER_FRAME_FLAG};
use crate::headers::{copy_headers, header_keys, HeaderMap, HeaderRule};

/// Header announcing trailer fields; never forwarded
pub const TRAILER_HEADER: &str = "trailer";

/// Transport-level prefix marking a header as a trailer field
pub const TRAILER_PREFIX: &str = "trailer:";

/// Serialize a header multimap into a complete trailer frame.
///
/// Pure and deterministic. Keys are written as stored; callers produce
/// the lower-cased wire form via [`extract_trailing_headers`]. A block
/// over `u32::MAX` bytes would be a precondition violation, not a
/// recoverable state.
pub fn encode_trailer_frame(trailers: &HeaderMap) -> Bytes {
    let mut block = BytesMut::new();
    for (name, values) in trailers.iter() {
        for value in values {
            block.extend_from_slice(name.as_bytes());
            block.extend_from_slice(b": ");
            block.extend_from_slice(value.as_bytes());
            block.extend_from_slice(b"\r\n");
        }
    }

    let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + block.len());
    frame.put_u8(TRAILER_FRAME_FLAG);
    frame.put_u32(block.len() as u32);
    frame.extend_from_slice(&block);
    frame.freeze()
}

/// Compute the trailer set for a response.
///
/// Takes every pending entry except the `trailer` announcement key and
/// the keys already present on the flushed map, strips the transport
/// trailer prefix, and lower-cases key names per the gRPC-Web wire spec.
pub fn extract_trailing_headers(pending: &HeaderMap, flushed: &HeaderMap) -> HeaderMap {
    let mut skip = vec![TRAILER_HEADER.to_string()];
    skip.extend(header_keys(flushed));

    let mut trailers = HeaderMap::new();
    copy_headers(
        &mut trailers,
        pending,
        &[
            HeaderRule::Skip(skip),
            HeaderRule::StripKeyPrefix(TRAILER_PREFIX.to_string()),
            HeaderRule::LowercaseKeys,
        ],
    );
    trailers
}
