//! gRPC-Web Message Framing (5-byte header)
//!
//! Every unit in a gRPC-Web response stream carries a 5 byte header:
//!
//! ```text
//! +------------------+
//! | 1 byte: flags    |  bit 0 = compressed, bit 7 = trailer frame
//! +------------------+
//! | 4 bytes: length  |  big-endian payload length
//! +------------------+
//! | N bytes: payload |  message bytes, or header text for trailers
//! +------------------+
//! ```
//!
//! A response is zero or more data frames (high bit clear) followed by
//! exactly one trailer frame (flags = 0x80, payload = header text).

use bytes::{BufMut, Bytes, BytesMut};

/// Frame header size (1 byte flags + 4 bytes length)
pub const FRAME_HEADER_SIZE: usize = 5;

/// Flags value marking a trailer frame (MSB set: metadata, not a message)
pub const TRAILER_FRAME_FLAG: u8 = 0x80;

/// Flags bit marking a compressed message
pub const COMPRESSED_FLAG: u8 = 0x01;

/// Maximum payload size accepted by the decoders (default: 4MB)
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Frame decoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer does not contain a complete frame
    InsufficientData {
        /// Required bytes
        required: usize,
        /// Available bytes
        available: usize,
    },
    /// Declared payload length exceeds the limit
    MessageTooLarge {
        /// Declared size
        size: usize,
        /// Maximum allowed
        max: usize,
    },
    /// Flags byte carries bits outside the known set
    InvalidFlags(u8),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData {
                required,
                available,
            } => {
                write!(f, "insufficient data: need {} bytes, have {}", required, available)
            }
            Self::MessageTooLarge { size, max } => {
                write!(f, "message too large: {} bytes (max: {})", size, max)
            }
            Self::InvalidFlags(flags) => write!(f, "invalid frame flags: {:#04x}", flags),
        }
    }
}

impl std::error::Error for FrameError {}

/// One decoded frame of a gRPC-Web stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcFrame {
    /// Flags byte as it appeared on the wire
    pub flags: u8,
    /// Frame payload
    pub data: Vec<u8>,
}

impl GrpcFrame {
    /// Create a data frame (uncompressed message)
    pub fn message(data: Vec<u8>) -> Self {
        Self { flags: 0, data }
    }

    /// Create a trailer frame carrying a serialized header block
    pub fn trailer(data: Vec<u8>) -> Self {
        Self {
            flags: TRAILER_FRAME_FLAG,
            data,
        }
    }

    /// Check the trailer bit
    pub fn is_trailer(&self) -> bool {
        self.flags & TRAILER_FRAME_FLAG != 0
    }

    /// Check the compression bit
    pub fn is_compressed(&self) -> bool {
        self.flags & COMPRESSED_FLAG != 0
    }

    /// Encode to header + payload bytes
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.data.len());
        buf.put_u8(self.flags);
        buf.put_u32(self.data.len() as u32);
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    /// Total encoded size (header + payload)
    pub fn total_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.data.len()
    }
}

/// Decode a single frame from the front of `buf`.
///
/// Returns `(frame, bytes_consumed)` on success, `InsufficientData` when
/// the buffer does not yet hold a complete frame.
pub fn decode_frame(buf: &[u8]) -> Result<(GrpcFrame, usize), FrameError> {
    decode_frame_with_max_size(buf, MAX_MESSAGE_SIZE)
}

/// Decode a single frame with a custom payload size limit
pub fn decode_frame_with_max_size(
    buf: &[u8],
    max_size: usize,
) -> Result<(GrpcFrame, usize), FrameError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Err(FrameError::InsufficientData {
            required: FRAME_HEADER_SIZE,
            available: buf.len(),
        });
    }

    let flags = buf[0];
    if flags & !(TRAILER_FRAME_FLAG | COMPRESSED_FLAG) != 0 {
        return Err(FrameError::InvalidFlags(flags));
    }

    let length = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if length > max_size {
        return Err(FrameError::MessageTooLarge {
            size: length,
            max: max_size,
        });
    }

    let total_len = FRAME_HEADER_SIZE + length;
    if buf.len() < total_len {
        return Err(FrameError::InsufficientData {
            required: total_len,
            available: buf.len(),
        });
    }

    let data = buf[FRAME_HEADER_SIZE..total_len].to_vec();
    Ok((GrpcFrame { flags, data }, total_len))
}

/// Incremental frame decoder over a partially delivered stream.
///
/// Buffers incomplete frames between pushes.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append stream bytes to the internal buffer
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decode the next complete frame, if one is buffered
    pub fn decode_next(&mut self) -> Result<Option<GrpcFrame>, FrameError> {
        match decode_frame(&self.buffer) {
            Ok((frame, consumed)) => {
                self.buffer.drain(..consumed);
                Ok(Some(frame))
            }
            Err(FrameError::InsufficientData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check whether undecoded bytes remain
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}
