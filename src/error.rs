//! HTTP/2 error types
//!
//! Errors are split into the two classes RFC 7540 Section 5.4 defines:
//! connection errors are fatal and answered with GOAWAY before the transport
//! closes; stream errors are answered with RST_STREAM and only take down the
//! offending stream.

use std::fmt;

/// HTTP/2 engine errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection error: fatal, triggers GOAWAY with `code`
    #[error("connection error {code}: {reason}")]
    Connection { code: ErrorCode, reason: String },

    /// Stream error: recoverable, triggers RST_STREAM on `stream_id`
    #[error("stream {stream_id} error {code}")]
    Stream { stream_id: u32, code: ErrorCode },

    /// Client preface did not match "PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"
    #[error("missing or malformed connection preface")]
    BadPreface,

    /// Peer closed the transport
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid settings value supplied locally (builder misuse, not wire input)
    #[error("invalid settings value: {0}")]
    InvalidSettings(String),
}

impl Error {
    /// Connection-level PROTOCOL_ERROR
    pub fn protocol(reason: impl Into<String>) -> Self {
        Error::Connection {
            code: ErrorCode::ProtocolError,
            reason: reason.into(),
        }
    }

    /// Connection-level FRAME_SIZE_ERROR
    pub fn frame_size(reason: impl Into<String>) -> Self {
        Error::Connection {
            code: ErrorCode::FrameSizeError,
            reason: reason.into(),
        }
    }

    /// Connection-level COMPRESSION_ERROR
    ///
    /// Every HPACK failure lands here: the compressor state is shared per
    /// connection and cannot be resynchronized once it diverges.
    pub fn compression(reason: impl Into<String>) -> Self {
        Error::Connection {
            code: ErrorCode::CompressionError,
            reason: reason.into(),
        }
    }

    /// Connection-level FLOW_CONTROL_ERROR
    pub fn flow_control(reason: impl Into<String>) -> Self {
        Error::Connection {
            code: ErrorCode::FlowControlError,
            reason: reason.into(),
        }
    }

    /// Stream-level error with the given code
    pub fn stream(stream_id: u32, code: ErrorCode) -> Self {
        Error::Stream { stream_id, code }
    }

    /// The GOAWAY code this error maps to, if it is connection-fatal
    pub fn connection_code(&self) -> Option<ErrorCode> {
        match self {
            Error::Connection { code, .. } => Some(*code),
            Error::BadPreface => Some(ErrorCode::ProtocolError),
            _ => None,
        }
    }
}

/// HTTP/2 error codes as defined in RFC 7540 Section 7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// Graceful shutdown
    NoError = 0x0,
    /// Protocol error detected
    ProtocolError = 0x1,
    /// Implementation fault
    InternalError = 0x2,
    /// Flow-control limits exceeded
    FlowControlError = 0x3,
    /// Settings not acknowledged
    SettingsTimeout = 0x4,
    /// Frame received for closed stream
    StreamClosed = 0x5,
    /// Frame size incorrect
    FrameSizeError = 0x6,
    /// Stream not processed
    RefusedStream = 0x7,
    /// Stream cancelled
    Cancel = 0x8,
    /// Compression state not updated
    CompressionError = 0x9,
    /// TCP connection error for CONNECT method
    ConnectError = 0xa,
    /// Processing capacity exceeded
    EnhanceYourCalm = 0xb,
    /// Negotiated TLS parameters not acceptable
    InadequateSecurity = 0xc,
    /// Use HTTP/1.1 for the request
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Convert error code to u32
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Create error code from u32; unknown codes map to InternalError
    /// so a GOAWAY carrying a future code still parses.
    pub fn from_u32(code: u32) -> Self {
        match code {
            0x0 => ErrorCode::NoError,
            0x1 => ErrorCode::ProtocolError,
            0x2 => ErrorCode::InternalError,
            0x3 => ErrorCode::FlowControlError,
            0x4 => ErrorCode::SettingsTimeout,
            0x5 => ErrorCode::StreamClosed,
            0x6 => ErrorCode::FrameSizeError,
            0x7 => ErrorCode::RefusedStream,
            0x8 => ErrorCode::Cancel,
            0x9 => ErrorCode::CompressionError,
            0xa => ErrorCode::ConnectError,
            0xb => ErrorCode::EnhanceYourCalm,
            0xc => ErrorCode::InadequateSecurity,
            0xd => ErrorCode::Http11Required,
            _ => ErrorCode::InternalError,
        }
    }

    /// Get error name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::NoError => "NO_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::FlowControlError => "FLOW_CONTROL_ERROR",
            ErrorCode::SettingsTimeout => "SETTINGS_TIMEOUT",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
            ErrorCode::FrameSizeError => "FRAME_SIZE_ERROR",
            ErrorCode::RefusedStream => "REFUSED_STREAM",
            ErrorCode::Cancel => "CANCEL",
            ErrorCode::CompressionError => "COMPRESSION_ERROR",
            ErrorCode::ConnectError => "CONNECT_ERROR",
            ErrorCode::EnhanceYourCalm => "ENHANCE_YOUR_CALM",
            ErrorCode::InadequateSecurity => "INADEQUATE_SECURITY",
            ErrorCode::Http11Required => "HTTP_1_1_REQUIRED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u32())
    }
}

/// Result type for HTTP/2 operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ErrorCode::NoError.as_u32(), 0x0);
        assert_eq!(ErrorCode::ProtocolError.as_u32(), 0x1);
        assert_eq!(ErrorCode::Http11Required.as_u32(), 0xd);

        assert_eq!(ErrorCode::from_u32(0x9), ErrorCode::CompressionError);
        assert_eq!(ErrorCode::from_u32(0xff), ErrorCode::InternalError);
    }

    #[test]
    fn test_error_classes() {
        let err = Error::compression("bad index");
        assert_eq!(err.connection_code(), Some(ErrorCode::CompressionError));

        let err = Error::stream(3, ErrorCode::RefusedStream);
        assert_eq!(err.connection_code(), None);

        let err = Error::BadPreface;
        assert_eq!(err.connection_code(), Some(ErrorCode::ProtocolError));
    }

    #[test]
    fn test_error_display() {
        let err = Error::protocol("test error");
        assert_eq!(
            err.to_string(),
            "connection error PROTOCOL_ERROR (0x1): test error"
        );
    }
}
