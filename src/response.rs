//! gRPC-Web Response Orchestration
//!
//! [`GrpcWebResponse`] wraps the real output of one RPC response and
//! produces the trailer-less gRPC-Web stream. The whole body is staged
//! into an intermediate buffer: the final header set, including the
//! computed CORS exposure list, must be on the real sink before any
//! body byte, but the full key set is only known once headers are first
//! touched.
//!
//! Lifecycle per response:
//!
//! 1. The host sets response metadata through [`GrpcWebResponse::headers`]
//! 2. Body bytes go through [`GrpcWebResponse::write`], which prepares
//!    the real headers on first call and stages bytes through the body
//!    encoder
//! 3. Metadata set after the body started (or carrying the transport
//!    trailer prefix) becomes trailing metadata
//! 4. [`GrpcWebResponse::finish`] flushes the staged body and appends
//!    the trailer frame
//!
//! One instance per call, exclusively owned by the task handling it;
//! internal sharing is `Rc`-based and the type is not `Send`.

use std::io;

use crate::body::{BodyBuffer, BodyEncoder};
use crate::config::{CompressionMode, GrpcWebConfig, GRPC_CONTENT_TYPE};
use crate::headers::{copy_headers, header_keys, HeaderMap, HeaderRule};
use crate::status::{encode_grpc_message, GrpcStatusCode, GRPC_MESSAGE, GRPC_STATUS};
use crate::trailers::{encode_trailer_frame, extract_trailing_headers, TRAILER_HEADER, TRAILER_PREFIX};

/// CORS header listing the response headers a browser may read
const EXPOSE_HEADERS: &str = "access-control-expose-headers";

/// Forced content encoding when the gzip layer is active
const CONTENT_ENCODING: &str = "content-encoding";

/// The real response output, provided by the host server.
///
/// Blocking and cancellation are the sink's own affair; errors it
/// returns propagate unmodified out of the orchestrator.
pub trait ResponseSink {
    /// The flushed header map: what has actually been exposed
    fn headers(&mut self) -> &mut HeaderMap;

    /// Forward a transport-level status line
    fn write_status(&mut self, code: u16) -> io::Result<()>;

    /// Write body bytes
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush buffered output to the client
    fn flush(&mut self) -> io::Result<()>;
}

/// Response orchestrator: owns the header lifecycle, stages body bytes
/// through the body encoder, and reframes trailing metadata on finish.
pub struct GrpcWebResponse<S: ResponseSink> {
    sink: S,
    /// Pending headers as set by the RPC layer
    headers: HeaderMap,
    body: BodyBuffer,
    encoder: BodyEncoder,
    content_type: &'static str,
    compression: CompressionMode,
    wrote_headers: bool,
    wrote_body: bool,
}

impl<S: ResponseSink> GrpcWebResponse<S> {
    /// Wrap a sink for one response. Encoding and compression are fixed
    /// here for the response's lifetime.
    pub fn new(sink: S, config: &GrpcWebConfig) -> Self {
        let body = BodyBuffer::new();
        let encoder = BodyEncoder::new(body.clone(), config);
        Self {
            sink,
            headers: HeaderMap::new(),
            body,
            encoder,
            content_type: config.content_type(),
            compression: config.compression,
            wrote_headers: false,
            wrote_body: false,
        }
    }

    /// The mutable pending header map.
    ///
    /// Entries set before the body starts become response headers;
    /// entries set after (or prefixed with `trailer:`) end up in the
    /// trailer frame.
    pub fn headers(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Record the call status on the pending map.
    ///
    /// The fields land in the trailer frame unless the response headers
    /// were already exposed carrying them. Messages are percent-encoded
    /// per the gRPC wire spec.
    pub fn set_grpc_status(&mut self, code: GrpcStatusCode, message: Option<&str>) {
        self.headers.set(GRPC_STATUS, &code.to_string());
        match message {
            Some(m) if !m.is_empty() => {
                self.headers.set(GRPC_MESSAGE, &encode_grpc_message(m));
            }
            _ => self.headers.remove(GRPC_MESSAGE),
        }
    }

    /// Stage body bytes.
    ///
    /// The first call prepares the real sink's headers. Bytes are held
    /// in the intermediate buffer until [`finish`](Self::finish). Always
    /// reports the full input length on success.
    pub fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.prepare_headers();
        self.wrote_body = true;
        self.encoder.write(data)
    }

    /// Forward a transport-level status line, preparing headers first.
    ///
    /// The RPC's own result travels in the trailer frame, not here.
    pub fn write_status(&mut self, code: u16) -> io::Result<()> {
        self.prepare_headers();
        self.sink.write_status(code)
    }

    /// Flush the real sink, but never on an untouched response, where
    /// it would force an implicit 200 status prematurely.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.wrote_headers || self.wrote_body {
            self.sink.flush()?;
        }
        Ok(())
    }

    /// Finalize the response: flush the staged body to the sink and
    /// append the trailer frame.
    ///
    /// A response that never saw a header or body write gets a
    /// synthesized 200 status, with `grpc-status`/`grpc-message` kept
    /// out of the ordinary headers so they appear only in the trailer
    /// frame.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.wrote_headers || self.wrote_body {
            self.encoder.flush();
            let body = self.body.take();
            self.sink.write_all(&body)?;
            self.sink.flush()?;
        } else {
            self.write_status(200)?;
            self.sink.headers().remove(GRPC_STATUS);
            self.sink.headers().remove(GRPC_MESSAGE);
        }
        self.write_trailers()
    }

    /// Consume the orchestrator, returning the sink
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Borrow the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Copy pending headers onto the real sink and finalize the header
    /// set. Runs at most once per response.
    fn prepare_headers(&mut self) {
        if self.wrote_headers {
            return;
        }

        copy_headers(
            self.sink.headers(),
            &self.headers,
            &[
                HeaderRule::skip([TRAILER_HEADER]),
                HeaderRule::StripKeyPrefix(TRAILER_PREFIX.to_string()),
                HeaderRule::replace_value("content-type", GRPC_CONTENT_TYPE, self.content_type),
                HeaderRule::LowercaseKeys,
            ],
        );

        // Everything exposed so far, plus the status fields the client
        // must always be able to read from the trailer frame.
        let mut exposed = header_keys(self.sink.headers());
        for name in [GRPC_STATUS, GRPC_MESSAGE] {
            if !exposed.iter().any(|k| k.eq_ignore_ascii_case(name)) {
                exposed.push(name.to_string());
            }
        }

        let flushed = self.sink.headers();
        flushed.set(EXPOSE_HEADERS, &exposed.join(", "));
        if self.compression.is_enabled() {
            flushed.set(CONTENT_ENCODING, "gzip");
        }

        self.wrote_headers = true;
    }

    /// Build the trailer frame from pending-minus-flushed metadata and
    /// send it through the body encoder, so text-mode clients can decode
    /// the whole stream uniformly.
    fn write_trailers(&mut self) -> io::Result<()> {
        let trailers = extract_trailing_headers(&self.headers, self.sink.headers());
        let frame = encode_trailer_frame(&trailers);

        self.encoder.write(&frame)?;
        self.encoder.flush();
        let tail = self.body.take();
        self.sink.write_all(&tail)?;
        self.sink.flush()
    }
}
