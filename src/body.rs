//! Layered Body Encoding
//!
//! The response body is staged into an intermediate buffer through an
//! encoder chain selected once per response:
//!
//! ```text
//! Binary               bytes ──────────────────────▶ buffer
//! Binary + gzip        bytes ───────────▶ gzip ────▶ buffer
//! Base64Text           bytes ─▶ base64 ────────────▶ buffer
//! Base64Text + gzip    bytes ─▶ base64 ─▶ gzip ────▶ buffer
//! ```
//!
//! `flush()` finalizes the current chain (emitting base64 padding for
//! the bytes written since the last flush, ending the gzip member) and
//! rebuilds a fresh chain over the same buffer. The resulting body is
//! one or more independently padded base64 segments (each inside its own
//! gzip member when compression is on); clients decode segment by
//! segment, which the gRPC-Web protocol permits.
//!
//! `flush()` has no error channel. Finalization faults are logged and
//! swallowed; with the buffer-backed sinks used here they cannot occur in
//! practice.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::engine::GeneralPurpose;
use base64::write::EncoderWriter;
use flate2::write::GzEncoder;
use ftlog::error;

use crate::config::{CompressionMode, EncodingMode, GrpcWebConfig};

type Base64Writer<W> = EncoderWriter<'static, GeneralPurpose, W>;

/// Shared handle over the intermediate body buffer.
///
/// The orchestrator and the encoder chain hold clones of the same
/// buffer; writes through the handle never fail.
#[derive(Debug, Clone, Default)]
pub struct BodyBuffer(Rc<RefCell<Vec<u8>>>);

impl BodyBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered byte count
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Take the buffered bytes, leaving the buffer empty
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl Write for BodyBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The active encoder chain. Replaced wholesale on every flush.
enum EncoderChain {
    Identity(BodyBuffer),
    Gzip(GzEncoder<BodyBuffer>),
    Base64(Base64Writer<BodyBuffer>),
    Base64Gzip(Base64Writer<GzEncoder<BodyBuffer>>),
}

impl EncoderChain {
    /// Finalize the chain: pad the base64 segment, end the gzip member.
    ///
    /// Identity has no state to finalize. Faults are logged and
    /// swallowed; the flush contract has no error channel.
    fn finish(self) {
        match self {
            Self::Identity(_) => {}
            Self::Gzip(gz) => {
                if let Err(e) = gz.finish() {
                    error!("[gRPC-Web] ignoring error finalizing gzip member: {}", e);
                }
            }
            Self::Base64(mut enc) => {
                if let Err(e) = enc.finish() {
                    error!("[gRPC-Web] ignoring error flushing base64 encoder: {}", e);
                }
            }
            Self::Base64Gzip(mut enc) => match enc.finish() {
                Ok(gz) => {
                    if let Err(e) = gz.finish() {
                        error!("[gRPC-Web] ignoring error finalizing gzip member: {}", e);
                    }
                }
                Err(e) => {
                    error!("[gRPC-Web] ignoring error flushing base64 encoder: {}", e);
                }
            },
        }
    }
}

/// Streaming body encoder over the intermediate buffer.
pub struct BodyEncoder {
    buf: BodyBuffer,
    chain: EncoderChain,
    encoding: EncodingMode,
    compression: CompressionMode,
    level: flate2::Compression,
}

impl BodyEncoder {
    /// Build an encoder writing into `buf`, with the chain selected by
    /// the response configuration.
    pub fn new(buf: BodyBuffer, config: &GrpcWebConfig) -> Self {
        let encoding = config.encoding;
        let compression = config.compression;
        let level = config.gzip_level();
        Self {
            chain: build_chain(buf.clone(), encoding, compression, level),
            buf,
            encoding,
            compression,
            level,
        }
    }

    /// Write bytes through the chain.
    ///
    /// Reports the full input length on success; the chain never
    /// short-writes into the buffer.
    pub fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match &mut self.chain {
            EncoderChain::Identity(w) => w.write_all(data)?,
            EncoderChain::Gzip(w) => w.write_all(data)?,
            EncoderChain::Base64(w) => w.write_all(data)?,
            EncoderChain::Base64Gzip(w) => w.write_all(data)?,
        }
        Ok(data.len())
    }

    /// Close the current segment and start a fresh one.
    ///
    /// No error channel: finalization faults are logged and swallowed.
    pub fn flush(&mut self) {
        // The placeholder writes nothing at construction, so the old
        // chain's tail bytes land in the buffer in order.
        let old = std::mem::replace(
            &mut self.chain,
            EncoderChain::Identity(self.buf.clone()),
        );
        old.finish();
        self.chain = build_chain(
            self.buf.clone(),
            self.encoding,
            self.compression,
            self.level,
        );
    }
}

fn build_chain(
    buf: BodyBuffer,
    encoding: EncodingMode,
    compression: CompressionMode,
    level: flate2::Compression,
) -> EncoderChain {
    match (encoding, compression) {
        (EncodingMode::Binary, CompressionMode::None) => EncoderChain::Identity(buf),
        (EncodingMode::Binary, CompressionMode::Gzip) => {
            EncoderChain::Gzip(GzEncoder::new(buf, level))
        }
        (EncodingMode::Base64Text, CompressionMode::None) => {
            EncoderChain::Base64(EncoderWriter::new(buf, &BASE64_STANDARD))
        }
        (EncodingMode::Base64Text, CompressionMode::Gzip) => EncoderChain::Base64Gzip(
            EncoderWriter::new(GzEncoder::new(buf, level), &BASE64_STANDARD),
        ),
    }
}
