//! End-to-end transcoding tests over the public API.
//!
//! Each test drives a full response through `GrpcWebResponse` against a
//! recording sink and decodes the produced stream the way a gRPC-Web
//! client would.

mod common;

use common::*;
use veil_grpcweb::{
    BodyBuffer, BodyEncoder, CompressionMode, EncodingMode, GrpcStatusCode, GrpcWebConfig,
    GrpcWebResponse, GRPC_WEB_CONTENT_TYPE, GRPC_WEB_TEXT_CONTENT_TYPE,
};

/// A single length-delimited message: flag 0, length 5, "hello"
const HELLO_FRAME: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o'];

fn config(encoding: EncodingMode, compression: CompressionMode) -> GrpcWebConfig {
    GrpcWebConfig {
        encoding,
        compression,
        ..GrpcWebConfig::default()
    }
}

// ====================
// Round trips per mode
// ====================

#[test]
fn test_binary_uncompressed_round_trip() {
    let cfg = config(EncodingMode::Binary, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.headers().set("content-type", "application/grpc");
    resp.write(HELLO_FRAME).unwrap();
    resp.headers().set("grpc-status", "0");
    resp.finish().unwrap();

    let sink = resp.into_inner();
    assert_eq!(sink.headers.get("content-type"), Some(GRPC_WEB_CONTENT_TYPE));

    let frames = parse_frames(&sink.written);
    assert_eq!(frames.len(), 2);
    assert!(!frames[0].is_trailer());
    assert_eq!(frames[0].data, &HELLO_FRAME[5..]);
    assert!(frames[1].is_trailer());

    let trailers = parse_trailer_block(&frames[1].data);
    assert_eq!(trailers.get("grpc-status"), Some("0"));
}

#[test]
fn test_text_uncompressed_round_trip() {
    let cfg = config(EncodingMode::Base64Text, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.headers().set("content-type", "application/grpc");
    resp.write(HELLO_FRAME).unwrap();
    resp.headers().set("grpc-status", "0");
    resp.finish().unwrap();

    let sink = resp.into_inner();
    assert_eq!(
        sink.headers.get("content-type"),
        Some(GRPC_WEB_TEXT_CONTENT_TYPE)
    );

    // Body and trailer frame arrive as separate base64 segments; the
    // decoded concatenation is the binary-mode stream.
    let segments = decode_base64_segments(&sink.written);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0], HELLO_FRAME);

    let stream: Vec<u8> = segments.concat();
    let frames = parse_frames(&stream);
    assert_eq!(frames.len(), 2);
    assert!(frames[1].is_trailer());
    assert_eq!(
        parse_trailer_block(&frames[1].data).get("grpc-status"),
        Some("0")
    );
}

#[test]
fn test_binary_gzip_round_trip() {
    let cfg = config(EncodingMode::Binary, CompressionMode::Gzip);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.headers().set("content-type", "application/grpc");
    resp.write(HELLO_FRAME).unwrap();
    resp.headers().set("grpc-status", "0");
    resp.finish().unwrap();

    let sink = resp.into_inner();
    assert_eq!(sink.headers.get("content-encoding"), Some("gzip"));

    let stream = gunzip_all(&sink.written);
    let frames = parse_frames(&stream);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].data, b"hello");
    assert!(frames[1].is_trailer());
}

#[test]
fn test_text_gzip_round_trip() {
    let cfg = config(EncodingMode::Base64Text, CompressionMode::Gzip);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.write(HELLO_FRAME).unwrap();
    resp.headers().set("grpc-status", "0");
    resp.finish().unwrap();

    let sink = resp.into_inner();
    assert_eq!(sink.headers.get("content-encoding"), Some("gzip"));

    // gzip is the outermost layer; beneath it sits the base64 text.
    let text = gunzip_all(&sink.written);
    let segments = decode_base64_segments(&text);
    let stream: Vec<u8> = segments.concat();

    let frames = parse_frames(&stream);
    assert_eq!(frames.len(), 2);
    assert!(frames[1].is_trailer());
}

// ====================
// Header semantics
// ====================

#[test]
fn test_header_exclusivity() {
    let cfg = config(EncodingMode::Binary, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.headers().set("x-early", "before-body");
    resp.write(HELLO_FRAME).unwrap();
    resp.headers().set("x-late", "after-body");
    resp.headers().set("grpc-status", "0");
    resp.finish().unwrap();

    let sink = resp.into_inner();
    assert_eq!(sink.headers.get("x-early"), Some("before-body"));
    assert!(!sink.headers.contains("x-late"));

    let frames = parse_frames(&sink.written);
    let trailers = parse_trailer_block(&frames.last().unwrap().data);
    assert_eq!(trailers.get("x-late"), Some("after-body"));
    // No key may appear both as an ordinary header and in the trailer
    // frame.
    for key in trailers.keys() {
        assert!(
            !sink.headers.contains(key),
            "key '{}' leaked into both header sets",
            key
        );
    }
}

#[test]
fn test_cors_exposure_list() {
    let cfg = config(EncodingMode::Binary, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.headers().set("content-type", "application/grpc");
    resp.headers().set("X-Request-Id", "abc123");
    resp.write(HELLO_FRAME).unwrap();
    resp.finish().unwrap();

    let sink = resp.into_inner();
    let exposed = sink.headers.get("access-control-expose-headers").unwrap();

    // Every flushed key plus the status fields, even though neither
    // grpc-status nor grpc-message is present as a header.
    assert_eq!(
        exposed,
        "content-type, x-request-id, grpc-status, grpc-message"
    );
    assert!(!sink.headers.contains("grpc-status"));
    assert!(!sink.headers.contains("grpc-message"));
}

#[test]
fn test_trailer_prefix_stripped() {
    let cfg = config(EncodingMode::Binary, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.write(HELLO_FRAME).unwrap();
    resp.headers().set("Trailer:X-Checksum", "deadbeef");
    resp.finish().unwrap();

    let sink = resp.into_inner();
    let frames = parse_frames(&sink.written);
    let trailers = parse_trailer_block(&frames.last().unwrap().data);
    assert_eq!(trailers.get("x-checksum"), Some("deadbeef"));
}

#[test]
fn test_idempotent_header_preparation() {
    let cfg = config(EncodingMode::Binary, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.headers().set("content-type", "application/grpc");
    resp.write(HELLO_FRAME).unwrap();
    resp.write_status(200).unwrap();
    resp.finish().unwrap();

    let sink = resp.into_inner();
    // Rules ran exactly once: no double rewrite, no duplicate CORS
    // entries, a single content-type value.
    assert_eq!(sink.headers.get_all("content-type"), &[GRPC_WEB_CONTENT_TYPE]);
    assert_eq!(
        sink.headers.get_all("access-control-expose-headers").len(),
        1
    );
}

// ====================
// Empty responses
// ====================

#[test]
fn test_empty_response_binary() {
    let cfg = config(EncodingMode::Binary, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.set_grpc_status(GrpcStatusCode::Unimplemented, Some("no handler"));
    resp.finish().unwrap();

    let sink = resp.into_inner();
    assert_eq!(sink.status, Some(200));
    assert!(!sink.headers.contains("grpc-status"));
    assert!(!sink.headers.contains("grpc-message"));

    let frames = parse_frames(&sink.written);
    assert_eq!(frames.len(), 1);
    assert!(frames[0].is_trailer());

    let trailers = parse_trailer_block(&frames[0].data);
    assert_eq!(trailers.get("grpc-status"), Some("12"));
    assert_eq!(trailers.get("grpc-message"), Some("no%20handler"));
}

#[test]
fn test_empty_response_text_mode() {
    let cfg = config(EncodingMode::Base64Text, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(RecordingSink::default(), &cfg);

    resp.set_grpc_status(GrpcStatusCode::Ok, None);
    resp.finish().unwrap();

    let sink = resp.into_inner();
    assert_eq!(sink.status, Some(200));

    // The whole stream is one base64 segment holding only the trailer
    // frame.
    let segments = decode_base64_segments(&sink.written);
    assert_eq!(segments.len(), 1);
    let frames = parse_frames(&segments[0]);
    assert_eq!(frames.len(), 1);
    assert!(frames[0].is_trailer());
}

// ====================
// Body encoder segments
// ====================

#[test]
fn test_multi_segment_base64_body() {
    let buf = BodyBuffer::new();
    let cfg = config(EncodingMode::Base64Text, CompressionMode::None);
    let mut encoder = BodyEncoder::new(buf.clone(), &cfg);

    encoder.write(b"first chunk").unwrap();
    encoder.flush();
    encoder.write(b"second chunk").unwrap();
    encoder.flush();

    let segments = decode_base64_segments(&buf.take());
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0], b"first chunk");
    assert_eq!(segments[1], b"second chunk");

    let joined: Vec<u8> = segments.concat();
    assert_eq!(joined, b"first chunksecond chunk");
}

// ====================
// Failure propagation
// ====================

#[test]
fn test_sink_write_error_propagates_from_finish() {
    let cfg = config(EncodingMode::Binary, CompressionMode::None);
    let mut resp = GrpcWebResponse::new(BrokenSink::default(), &cfg);

    // Body writes only stage into the buffer and cannot fail here.
    resp.write(HELLO_FRAME).unwrap();

    let err = resp.finish().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
}

// ====================
// Content negotiation handoff
// ====================

#[test]
fn test_config_from_negotiated_content_type() {
    let text = GrpcWebConfig::from_content_type("application/grpc-web-text+proto");
    assert_eq!(text.encoding, EncodingMode::Base64Text);

    let binary = GrpcWebConfig::from_content_type("application/grpc-web+proto");
    assert_eq!(binary.encoding, EncodingMode::Binary);
}
