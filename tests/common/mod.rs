//! Shared test helpers: recording sink and wire-format decoding.

use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::MultiGzDecoder;
use std::io::Read;

use veil_grpcweb::{FrameDecoder, GrpcFrame, HeaderMap, ResponseSink};

/// Sink recording everything the orchestrator sends to the client.
#[derive(Default)]
pub struct RecordingSink {
    pub headers: HeaderMap,
    pub status: Option<u16>,
    pub written: Vec<u8>,
    pub flushes: usize,
}

impl ResponseSink for RecordingSink {
    fn headers(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, code: u16) -> io::Result<()> {
        self.status = Some(code);
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Sink whose body writes fail, for error propagation tests.
#[derive(Default)]
pub struct BrokenSink {
    pub headers: HeaderMap,
}

impl ResponseSink for BrokenSink {
    fn headers(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, _code: u16) -> io::Result<()> {
        Ok(())
    }

    fn write_all(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Split a base64 text stream into its independently padded segments and
/// decode each one.
///
/// Scans 4-character quanta; a quantum carrying padding closes the
/// current segment. Only valid for streams whose non-final segments are
/// padded, which holds for the fixtures used here.
pub fn decode_base64_segments(text: &[u8]) -> Vec<Vec<u8>> {
    let mut raw_segments = Vec::new();
    let mut current = Vec::new();
    for quantum in text.chunks(4) {
        current.extend_from_slice(quantum);
        if quantum.contains(&b'=') {
            raw_segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        raw_segments.push(current);
    }

    raw_segments
        .iter()
        .map(|seg| STANDARD.decode(seg).expect("segment must decode on its own"))
        .collect()
}

/// Decompress a (possibly multi-member) gzip stream.
pub fn gunzip_all(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data)
        .read_to_end(&mut out)
        .expect("gzip stream must decode");
    out
}

/// Parse a raw byte stream into its gRPC-Web frames.
pub fn parse_frames(data: &[u8]) -> Vec<GrpcFrame> {
    let mut decoder = FrameDecoder::new();
    decoder.push(data);

    let mut frames = Vec::new();
    while let Some(frame) = decoder.decode_next().expect("well-formed frames") {
        frames.push(frame);
    }
    assert!(!decoder.has_pending(), "trailing garbage after last frame");
    frames
}

/// Parse a trailer frame payload (`key: value\r\n` lines) into a map.
pub fn parse_trailer_block(payload: &[u8]) -> HeaderMap {
    let text = std::str::from_utf8(payload).expect("trailer block is ASCII text");
    let mut map = HeaderMap::new();
    for line in text.split("\r\n").filter(|l| !l.is_empty()) {
        let (name, value) = line.split_once(": ").expect("trailer line format");
        map.add(name, value);
    }
    map
}
