//! gRPC Status Codes (0-16)
//!
//! gRPC carries call status via the `grpc-status` trailer field, with an
//! optional percent-encoded `grpc-message`. In gRPC-Web both travel inside
//! the trailer frame, never as ordinary response headers.
//! See: https://grpc.github.io/grpc/core/md_doc_statuscodes.html

use std::fmt;

/// Trailer field carrying the numeric status code
pub const GRPC_STATUS: &str = "grpc-status";

/// Trailer field carrying the percent-encoded status message
pub const GRPC_MESSAGE: &str = "grpc-message";

/// gRPC status code values (0-16)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GrpcStatusCode {
    /// Not an error; returned on success
    #[default]
    Ok = 0,
    /// The operation was cancelled
    Cancelled = 1,
    /// Unknown error
    Unknown = 2,
    /// Client specified an invalid argument
    InvalidArgument = 3,
    /// Deadline expired before operation could complete
    DeadlineExceeded = 4,
    /// Requested entity was not found
    NotFound = 5,
    /// Entity that we attempted to create already exists
    AlreadyExists = 6,
    /// Caller does not have permission
    PermissionDenied = 7,
    /// Resource has been exhausted
    ResourceExhausted = 8,
    /// Operation rejected due to failed precondition
    FailedPrecondition = 9,
    /// Operation was aborted
    Aborted = 10,
    /// Operation was attempted past the valid range
    OutOfRange = 11,
    /// Operation is not implemented
    Unimplemented = 12,
    /// Internal error
    Internal = 13,
    /// Service is currently unavailable
    Unavailable = 14,
    /// Unrecoverable data loss or corruption
    DataLoss = 15,
    /// Request does not have valid authentication credentials
    Unauthenticated = 16,
}

impl GrpcStatusCode {
    /// Create from numeric value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Cancelled),
            2 => Some(Self::Unknown),
            3 => Some(Self::InvalidArgument),
            4 => Some(Self::DeadlineExceeded),
            5 => Some(Self::NotFound),
            6 => Some(Self::AlreadyExists),
            7 => Some(Self::PermissionDenied),
            8 => Some(Self::ResourceExhausted),
            9 => Some(Self::FailedPrecondition),
            10 => Some(Self::Aborted),
            11 => Some(Self::OutOfRange),
            12 => Some(Self::Unimplemented),
            13 => Some(Self::Internal),
            14 => Some(Self::Unavailable),
            15 => Some(Self::DataLoss),
            16 => Some(Self::Unauthenticated),
            _ => None,
        }
    }

    /// Parse from a grpc-status trailer value
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<u8>().ok().and_then(Self::from_u8)
    }

    /// Get numeric value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a success status
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Check if this is an error status
    pub fn is_error(self) -> bool {
        self != Self::Ok
    }
}

impl fmt::Display for GrpcStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Percent-encode a status message for the grpc-message field.
///
/// Unreserved characters pass through, everything else becomes `%XX`
/// per the gRPC HTTP/2 wire spec.
pub fn encode_grpc_message(message: &str) -> String {
    message
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                c.to_string()
            } else {
                format!("%{:02X}", c as u32)
            }
        })
        .collect()
}
