//! gRPC-Web レスポンス変換設定
//!
//! Per-response transcoding configuration. The host proxy decides during
//! content negotiation whether a call is gRPC-Web and which wire format
//! the client asked for; this module carries the outcome into the
//! response pipeline. Compression is a config field read once at response
//! construction; there is no process-wide toggle.

use serde::Deserialize;

/// The standard gRPC content-type, rewritten on the way out
pub const GRPC_CONTENT_TYPE: &str = "application/grpc";

/// gRPC-Web binary content type
pub const GRPC_WEB_CONTENT_TYPE: &str = "application/grpc-web";

/// gRPC-Web text content type (fully base64 encoded stream)
pub const GRPC_WEB_TEXT_CONTENT_TYPE: &str = "application/grpc-web-text";

/// Check if a content-type token indicates a gRPC-Web request
#[inline]
pub fn is_grpc_web_content_type(content_type: &str) -> bool {
    content_type.len() >= GRPC_WEB_CONTENT_TYPE.len()
        && content_type[..GRPC_WEB_CONTENT_TYPE.len()]
            .eq_ignore_ascii_case(GRPC_WEB_CONTENT_TYPE)
}

/// Check if a content-type token selects the text (base64) format
#[inline]
pub fn is_grpc_web_text(content_type: &str) -> bool {
    content_type.len() >= GRPC_WEB_TEXT_CONTENT_TYPE.len()
        && content_type[..GRPC_WEB_TEXT_CONTENT_TYPE.len()]
            .eq_ignore_ascii_case(GRPC_WEB_TEXT_CONTENT_TYPE)
}

/// Body encoding mode, fixed for the lifetime of one response
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EncodingMode {
    /// Raw binary frames (`application/grpc-web`)
    #[default]
    Binary,
    /// Base64-encoded stream (`application/grpc-web-text`)
    Base64Text,
}

impl<'de> Deserialize<'de> for EncodingMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "binary" => Ok(EncodingMode::Binary),
            "text" => Ok(EncodingMode::Base64Text),
            other => Err(serde::de::Error::custom(format!(
                "unknown encoding mode: '{}', expected 'binary' or 'text'",
                other
            ))),
        }
    }
}

/// Body compression mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMode {
    /// No compression layer
    None,
    /// Gzip layer beneath the body encoder
    Gzip,
}

impl Default for CompressionMode {
    fn default() -> Self {
        Self::Gzip
    }
}

impl CompressionMode {
    /// Check whether a compression layer is active
    #[inline]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Gzip)
    }
}

impl<'de> Deserialize<'de> for CompressionMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "none" => Ok(CompressionMode::None),
            "gzip" => Ok(CompressionMode::Gzip),
            other => Err(serde::de::Error::custom(format!(
                "unknown compression mode: '{}', expected 'none' or 'gzip'",
                other
            ))),
        }
    }
}

/// デフォルト値関数
fn default_compression_level() -> u32 { 9 }

/// Per-response transcoding configuration
#[derive(Deserialize, Clone, Debug)]
pub struct GrpcWebConfig {
    /// Body encoding mode
    ///
    /// - `"binary"`: raw frames (default)
    /// - `"text"`: base64-encoded stream
    #[serde(default)]
    pub encoding: EncodingMode,

    /// Body compression
    ///
    /// - `"gzip"`: gzip layer + `content-encoding: gzip` (default)
    /// - `"none"`: no compression layer
    #[serde(default)]
    pub compression: CompressionMode,

    /// Gzip compression level (0-9)
    ///
    /// デフォルト: 9
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

impl Default for GrpcWebConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingMode::default(),
            compression: CompressionMode::default(),
            compression_level: default_compression_level(),
        }
    }
}

impl GrpcWebConfig {
    /// Derive the encoding mode from a request content-type token,
    /// keeping the default compression settings
    pub fn from_content_type(content_type: &str) -> Self {
        let encoding = if is_grpc_web_text(content_type) {
            EncodingMode::Base64Text
        } else {
            EncodingMode::Binary
        };
        Self {
            encoding,
            ..Self::default()
        }
    }

    /// Config without a compression layer
    pub fn uncompressed(encoding: EncodingMode) -> Self {
        Self {
            encoding,
            compression: CompressionMode::None,
            ..Self::default()
        }
    }

    /// The content-type token to advertise on the response
    pub fn content_type(&self) -> &'static str {
        match self.encoding {
            EncodingMode::Binary => GRPC_WEB_CONTENT_TYPE,
            EncodingMode::Base64Text => GRPC_WEB_TEXT_CONTENT_TYPE,
        }
    }

    /// Gzip level clamped into flate2's supported range
    pub(crate) fn gzip_level(&self) -> flate2::Compression {
        flate2::Compression::new(self.compression_level.min(9))
    }
}
