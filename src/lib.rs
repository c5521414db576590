//! gRPC-Web Response Transcoding
//!
//! gRPC のレスポンスストリーム（ヘッダー、length-delimited ボディ、
//! HTTP トレイラー）を、トレイラーを読めないクライアント向けの
//! gRPC-Web 単一ストリーム形式へ変換します。
//!
//! ## 機能
//!
//! - **Headers**: 宣言的ルールによるヘッダーコピーと書き換え
//!   （content-type 変換、CORS 公開リスト算出）
//! - **Body**: base64 テキストエンコード、gzip 圧縮のレイヤリング
//! - **Trailers**: トレイラーメタデータを 0x80 フレームへ再フレーム化
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use veil_grpcweb::{GrpcWebConfig, GrpcWebResponse};
//!
//! let config = GrpcWebConfig::from_content_type(request_content_type);
//! let mut response = GrpcWebResponse::new(sink, &config);
//!
//! response.headers().set("content-type", "application/grpc");
//! response.write(&message_frame)?;
//! response.headers().set("grpc-status", "0");
//! response.finish()?;
//! ```

pub mod body;
pub mod config;
pub mod framing;
pub mod headers;
pub mod response;
pub mod status;
pub mod trailers;

// Re-exports
pub use body::{BodyBuffer, BodyEncoder};
pub use config::{
    is_grpc_web_content_type, is_grpc_web_text, CompressionMode, EncodingMode, GrpcWebConfig,
    GRPC_CONTENT_TYPE, GRPC_WEB_CONTENT_TYPE, GRPC_WEB_TEXT_CONTENT_TYPE,
};
pub use framing::{decode_frame, FrameDecoder, FrameError, GrpcFrame, TRAILER_FRAME_FLAG};
pub use headers::{copy_headers, header_keys, HeaderMap, HeaderRule};
pub use response::{GrpcWebResponse, ResponseSink};
pub use status::{GrpcStatusCode, GRPC_MESSAGE, GRPC_STATUS};
pub use trailers::{encode_trailer_frame, extract_trailing_headers};
