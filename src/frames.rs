//! HTTP/2 frame types
//!
//! Typed representations of the ten frame types from RFC 7540 Section 6.
//! The wire layout lives in [`crate::codec`]; these structs carry the
//! already-parsed view a handler works with.

use crate::error::ErrorCode;
use bytes::Bytes;
use std::fmt;

/// HTTP/2 frame types (RFC 7540 Section 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    Goaway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

impl FrameType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns None for unknown types; RFC 7540 Section 4.1 requires those
    /// frames to be ignored, not rejected.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x0 => Some(FrameType::Data),
            0x1 => Some(FrameType::Headers),
            0x2 => Some(FrameType::Priority),
            0x3 => Some(FrameType::RstStream),
            0x4 => Some(FrameType::Settings),
            0x5 => Some(FrameType::PushPromise),
            0x6 => Some(FrameType::Ping),
            0x7 => Some(FrameType::Goaway),
            0x8 => Some(FrameType::WindowUpdate),
            0x9 => Some(FrameType::Continuation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrameType::Data => "DATA",
            FrameType::Headers => "HEADERS",
            FrameType::Priority => "PRIORITY",
            FrameType::RstStream => "RST_STREAM",
            FrameType::Settings => "SETTINGS",
            FrameType::PushPromise => "PUSH_PROMISE",
            FrameType::Ping => "PING",
            FrameType::Goaway => "GOAWAY",
            FrameType::WindowUpdate => "WINDOW_UPDATE",
            FrameType::Continuation => "CONTINUATION",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u8())
    }
}

/// HTTP/2 frame flags octet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// END_STREAM flag (0x1)
    pub const END_STREAM: u8 = 0x1;
    /// ACK flag (0x1) - SETTINGS and PING reuse the bit
    pub const ACK: u8 = 0x1;
    /// END_HEADERS flag (0x4)
    pub const END_HEADERS: u8 = 0x4;
    /// PADDED flag (0x8)
    pub const PADDED: u8 = 0x8;
    /// PRIORITY flag (0x20)
    pub const PRIORITY: u8 = 0x20;

    pub fn empty() -> Self {
        FrameFlags(0)
    }

    pub fn from_u8(flags: u8) -> Self {
        FrameFlags(flags)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn is_set(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    pub fn is_end_stream(&self) -> bool {
        self.is_set(Self::END_STREAM)
    }

    pub fn is_ack(&self) -> bool {
        self.is_set(Self::ACK)
    }

    pub fn is_end_headers(&self) -> bool {
        self.is_set(Self::END_HEADERS)
    }

    pub fn is_padded(&self) -> bool {
        self.is_set(Self::PADDED)
    }

    pub fn has_priority(&self) -> bool {
        self.is_set(Self::PRIORITY)
    }
}

/// The 9-octet frame header, as read off the wire
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    /// Payload length (24 bits on the wire)
    pub length: usize,
    /// Raw type octet; may be an unknown type
    pub frame_type: u8,
    pub flags: FrameFlags,
    /// 31-bit stream id, reserved bit stripped
    pub stream_id: u32,
}

/// Stream dependency from HEADERS/PRIORITY (RFC 7540 Section 5.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySpec {
    /// Stream this one depends on (0 = the virtual root)
    pub depends_on: u32,
    pub exclusive: bool,
    /// Wire weight octet; effective weight is this plus one (1..=256)
    pub weight: u8,
}

impl PrioritySpec {
    pub fn new(depends_on: u32, exclusive: bool, weight: u8) -> Self {
        PrioritySpec {
            depends_on,
            exclusive,
            weight,
        }
    }

    /// Effective weight in 1..=256
    pub fn effective_weight(&self) -> u16 {
        self.weight as u16 + 1
    }
}

impl Default for PrioritySpec {
    fn default() -> Self {
        // RFC 7540 Section 5.3.5: default is a non-exclusive dependency on
        // stream 0 with weight 16.
        PrioritySpec {
            depends_on: 0,
            exclusive: false,
            weight: 15,
        }
    }
}

/// DATA frame (RFC 7540 Section 6.1)
#[derive(Debug, Clone)]
pub struct DataFrame {
    pub stream_id: u32,
    /// Payload with any padding already stripped
    pub data: Bytes,
    pub end_stream: bool,
    /// Padding octet count, when the PADDED flag was set
    pub pad_length: Option<u8>,
}

impl DataFrame {
    pub fn new(stream_id: u32, data: Bytes, end_stream: bool) -> Self {
        DataFrame {
            stream_id,
            data,
            end_stream,
            pad_length: None,
        }
    }

    /// Octets charged against flow control: payload plus padding plus the
    /// pad-length octet itself (RFC 7540 Section 6.9).
    pub fn flow_controlled_len(&self) -> usize {
        match self.pad_length {
            Some(pad) => self.data.len() + pad as usize + 1,
            None => self.data.len(),
        }
    }
}

/// HEADERS frame (RFC 7540 Section 6.2)
#[derive(Debug, Clone)]
pub struct HeadersFrame {
    pub stream_id: u32,
    /// Header block fragment (may need CONTINUATION frames to complete)
    pub fragment: Bytes,
    pub end_stream: bool,
    pub end_headers: bool,
    pub priority: Option<PrioritySpec>,
    pub pad_length: Option<u8>,
}

impl HeadersFrame {
    pub fn new(stream_id: u32, fragment: Bytes, end_stream: bool, end_headers: bool) -> Self {
        HeadersFrame {
            stream_id,
            fragment,
            end_stream,
            end_headers,
            priority: None,
            pad_length: None,
        }
    }
}

/// PRIORITY frame (RFC 7540 Section 6.3)
#[derive(Debug, Clone, Copy)]
pub struct PriorityFrame {
    pub stream_id: u32,
    pub priority: PrioritySpec,
}

/// RST_STREAM frame (RFC 7540 Section 6.4)
#[derive(Debug, Clone, Copy)]
pub struct RstStreamFrame {
    pub stream_id: u32,
    pub error_code: ErrorCode,
}

/// PUSH_PROMISE frame (RFC 7540 Section 6.6)
#[derive(Debug, Clone)]
pub struct PushPromiseFrame {
    pub stream_id: u32,
    pub promised_stream_id: u32,
    pub fragment: Bytes,
    pub end_headers: bool,
    pub pad_length: Option<u8>,
}

/// PING frame (RFC 7540 Section 6.7)
#[derive(Debug, Clone, Copy)]
pub struct PingFrame {
    pub ack: bool,
    pub data: [u8; 8],
}

impl PingFrame {
    pub fn new(data: [u8; 8]) -> Self {
        PingFrame { ack: false, data }
    }

    pub fn ack(data: [u8; 8]) -> Self {
        PingFrame { ack: true, data }
    }
}

/// GOAWAY frame (RFC 7540 Section 6.8)
#[derive(Debug, Clone)]
pub struct GoawayFrame {
    pub last_stream_id: u32,
    pub error_code: ErrorCode,
    pub debug_data: Bytes,
}

impl GoawayFrame {
    pub fn new(last_stream_id: u32, error_code: ErrorCode, debug_data: Bytes) -> Self {
        GoawayFrame {
            last_stream_id,
            error_code,
            debug_data,
        }
    }
}

/// WINDOW_UPDATE frame (RFC 7540 Section 6.9)
#[derive(Debug, Clone, Copy)]
pub struct WindowUpdateFrame {
    /// 0 addresses the connection-level window
    pub stream_id: u32,
    pub increment: u32,
}

/// CONTINUATION frame (RFC 7540 Section 6.10)
#[derive(Debug, Clone)]
pub struct ContinuationFrame {
    pub stream_id: u32,
    pub fragment: Bytes,
    pub end_headers: bool,
}
