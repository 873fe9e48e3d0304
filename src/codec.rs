//! HTTP/2 frame encoding and decoding
//!
//! Binary marshal/unmarshal of the 9-octet frame header and the per-type
//! payload layouts from RFC 7540 Section 6. Decoding validates the layout
//! rules that are independent of connection state (fixed payload sizes,
//! padding bounds, stream-id-zero rules); state-dependent checks live in the
//! dispatch loop.

use crate::error::{Error, ErrorCode, Result};
use crate::frames::*;
use crate::transport::Transport;
use bytes::{BufMut, Bytes, BytesMut};

/// HTTP/2 frame header size (9 octets)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Largest payload the length field can express (2^24 - 1)
pub const MAX_FRAME_SIZE_LIMIT: usize = 0x00FF_FFFF;

/// Frame codec: stateless marshal/unmarshal helpers plus transport reads.
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame header
    pub fn encode_header(
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: u32,
        length: usize,
    ) -> [u8; FRAME_HEADER_SIZE] {
        let mut header = [0u8; FRAME_HEADER_SIZE];

        header[0] = ((length >> 16) & 0xFF) as u8;
        header[1] = ((length >> 8) & 0xFF) as u8;
        header[2] = (length & 0xFF) as u8;
        header[3] = frame_type.as_u8();
        header[4] = flags.as_u8();

        // Reserved bit always sent as zero
        let stream_id = stream_id & 0x7FFF_FFFF;
        header[5..9].copy_from_slice(&stream_id.to_be_bytes());

        header
    }

    /// Decode a frame header. Never fails: unknown types are carried through
    /// as their raw octet so the dispatch loop can skip them.
    pub fn decode_header(bytes: &[u8; FRAME_HEADER_SIZE]) -> FrameHeader {
        let length =
            ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize);
        let stream_id =
            u32::from_be_bytes([bytes[5] & 0x7F, bytes[6], bytes[7], bytes[8]]);

        FrameHeader {
            length,
            frame_type: bytes[3],
            flags: FrameFlags::from_u8(bytes[4]),
            stream_id,
        }
    }

    /// Read one frame (header + payload) from the transport.
    ///
    /// `max_frame_size` is the locally advertised SETTINGS_MAX_FRAME_SIZE;
    /// a longer payload is a FRAME_SIZE_ERROR before any of it is read.
    /// The payload lands in `scratch`, which is cleared first; callers copy
    /// out anything that must outlive the frame.
    pub fn read_frame<T: Transport>(
        transport: &mut T,
        max_frame_size: u32,
        scratch: &mut BytesMut,
    ) -> Result<FrameHeader> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        transport.read_exact(&mut header)?;
        let frame_header = Self::decode_header(&header);

        if frame_header.length > max_frame_size as usize {
            return Err(Error::frame_size(format!(
                "frame payload {} exceeds SETTINGS_MAX_FRAME_SIZE {}",
                frame_header.length, max_frame_size
            )));
        }

        scratch.clear();
        scratch.resize(frame_header.length, 0);
        if frame_header.length > 0 {
            transport.read_exact(&mut scratch[..])?;
        }

        Ok(frame_header)
    }

    // ---- payload decode -------------------------------------------------

    /// Strip the PADDED prefix/suffix, returning the unpadded range and the
    /// pad length. Pad length >= remaining payload is a PROTOCOL_ERROR
    /// (RFC 7540 Section 6.1).
    fn unpad(flags: FrameFlags, payload: &[u8]) -> Result<(&[u8], Option<u8>)> {
        if !flags.is_padded() {
            return Ok((payload, None));
        }
        let (&pad, rest) = payload
            .split_first()
            .ok_or_else(|| Error::frame_size("padded frame shorter than pad-length octet"))?;
        if pad as usize >= rest.len() + 1 {
            return Err(Error::protocol("pad length exceeds frame payload"));
        }
        Ok((&rest[..rest.len() - pad as usize], Some(pad)))
    }

    fn parse_priority(buf: &[u8]) -> PrioritySpec {
        let raw = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        PrioritySpec {
            depends_on: raw & 0x7FFF_FFFF,
            exclusive: raw & 0x8000_0000 != 0,
            weight: buf[4],
        }
    }

    /// Decode a DATA payload
    pub fn decode_data(header: &FrameHeader, payload: &[u8]) -> Result<DataFrame> {
        if header.stream_id == 0 {
            return Err(Error::protocol("DATA frame on stream 0"));
        }
        let (data, pad_length) = Self::unpad(header.flags, payload)?;
        Ok(DataFrame {
            stream_id: header.stream_id,
            data: Bytes::copy_from_slice(data),
            end_stream: header.flags.is_end_stream(),
            pad_length,
        })
    }

    /// Decode a HEADERS payload (padding and optional priority fields)
    pub fn decode_headers(header: &FrameHeader, payload: &[u8]) -> Result<HeadersFrame> {
        if header.stream_id == 0 {
            return Err(Error::protocol("HEADERS frame on stream 0"));
        }
        let (body, pad_length) = Self::unpad(header.flags, payload)?;

        let (priority, fragment) = if header.flags.has_priority() {
            if body.len() < 5 {
                return Err(Error::frame_size("HEADERS priority fields truncated"));
            }
            let spec = Self::parse_priority(&body[..5]);
            if spec.depends_on == header.stream_id {
                return Err(Error::stream(header.stream_id, ErrorCode::ProtocolError));
            }
            (Some(spec), &body[5..])
        } else {
            (None, body)
        };

        Ok(HeadersFrame {
            stream_id: header.stream_id,
            fragment: Bytes::copy_from_slice(fragment),
            end_stream: header.flags.is_end_stream(),
            end_headers: header.flags.is_end_headers(),
            priority,
            pad_length,
        })
    }

    /// Decode a PRIORITY payload (always 5 octets)
    pub fn decode_priority(header: &FrameHeader, payload: &[u8]) -> Result<PriorityFrame> {
        if header.stream_id == 0 {
            return Err(Error::protocol("PRIORITY frame on stream 0"));
        }
        if payload.len() != 5 {
            // RFC 7540 Section 6.3: stream error, not connection error
            return Err(Error::stream(header.stream_id, ErrorCode::FrameSizeError));
        }
        let priority = Self::parse_priority(payload);
        if priority.depends_on == header.stream_id {
            return Err(Error::stream(header.stream_id, ErrorCode::ProtocolError));
        }
        Ok(PriorityFrame {
            stream_id: header.stream_id,
            priority,
        })
    }

    /// Decode a RST_STREAM payload (always 4 octets)
    pub fn decode_rst_stream(header: &FrameHeader, payload: &[u8]) -> Result<RstStreamFrame> {
        if header.stream_id == 0 {
            return Err(Error::protocol("RST_STREAM frame on stream 0"));
        }
        if payload.len() != 4 {
            return Err(Error::frame_size("RST_STREAM payload must be 4 octets"));
        }
        Ok(RstStreamFrame {
            stream_id: header.stream_id,
            error_code: ErrorCode::from_u32(u32::from_be_bytes([
                payload[0], payload[1], payload[2], payload[3],
            ])),
        })
    }

    /// Decode a PUSH_PROMISE payload
    pub fn decode_push_promise(header: &FrameHeader, payload: &[u8]) -> Result<PushPromiseFrame> {
        if header.stream_id == 0 {
            return Err(Error::protocol("PUSH_PROMISE frame on stream 0"));
        }
        let (body, pad_length) = Self::unpad(header.flags, payload)?;
        if body.len() < 4 {
            return Err(Error::frame_size("PUSH_PROMISE missing promised stream id"));
        }
        let promised =
            u32::from_be_bytes([body[0] & 0x7F, body[1], body[2], body[3]]);
        Ok(PushPromiseFrame {
            stream_id: header.stream_id,
            promised_stream_id: promised,
            fragment: Bytes::copy_from_slice(&body[4..]),
            end_headers: header.flags.is_end_headers(),
            pad_length,
        })
    }

    /// Decode a PING payload (always 8 octets, stream 0)
    pub fn decode_ping(header: &FrameHeader, payload: &[u8]) -> Result<PingFrame> {
        if header.stream_id != 0 {
            return Err(Error::protocol("PING frame on non-zero stream"));
        }
        if payload.len() != 8 {
            return Err(Error::frame_size("PING payload must be 8 octets"));
        }
        let mut data = [0u8; 8];
        data.copy_from_slice(payload);
        Ok(PingFrame {
            ack: header.flags.is_ack(),
            data,
        })
    }

    /// Decode a GOAWAY payload
    pub fn decode_goaway(header: &FrameHeader, payload: &[u8]) -> Result<GoawayFrame> {
        if header.stream_id != 0 {
            return Err(Error::protocol("GOAWAY frame on non-zero stream"));
        }
        if payload.len() < 8 {
            return Err(Error::frame_size("GOAWAY payload must be at least 8 octets"));
        }
        Ok(GoawayFrame {
            last_stream_id: u32::from_be_bytes([
                payload[0] & 0x7F,
                payload[1],
                payload[2],
                payload[3],
            ]),
            error_code: ErrorCode::from_u32(u32::from_be_bytes([
                payload[4], payload[5], payload[6], payload[7],
            ])),
            debug_data: Bytes::copy_from_slice(&payload[8..]),
        })
    }

    /// Decode a WINDOW_UPDATE payload (always 4 octets)
    pub fn decode_window_update(
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<WindowUpdateFrame> {
        if payload.len() != 4 {
            return Err(Error::frame_size("WINDOW_UPDATE payload must be 4 octets"));
        }
        let increment =
            u32::from_be_bytes([payload[0] & 0x7F, payload[1], payload[2], payload[3]]);
        Ok(WindowUpdateFrame {
            stream_id: header.stream_id,
            increment,
        })
    }

    /// Decode a CONTINUATION payload (bare header block fragment)
    pub fn decode_continuation(
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<ContinuationFrame> {
        if header.stream_id == 0 {
            return Err(Error::protocol("CONTINUATION frame on stream 0"));
        }
        Ok(ContinuationFrame {
            stream_id: header.stream_id,
            fragment: Bytes::copy_from_slice(payload),
            end_headers: header.flags.is_end_headers(),
        })
    }

    // ---- encode ---------------------------------------------------------

    /// Encode a DATA frame
    pub fn encode_data(frame: &DataFrame) -> Bytes {
        let mut flags = FrameFlags::empty();
        if frame.end_stream {
            flags.set(FrameFlags::END_STREAM);
        }
        let mut payload_len = frame.data.len();
        if let Some(pad) = frame.pad_length {
            flags.set(FrameFlags::PADDED);
            payload_len += 1 + pad as usize;
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload_len);
        buf.put_slice(&Self::encode_header(
            FrameType::Data,
            flags,
            frame.stream_id,
            payload_len,
        ));
        if let Some(pad) = frame.pad_length {
            buf.put_u8(pad);
        }
        buf.put_slice(&frame.data);
        if let Some(pad) = frame.pad_length {
            buf.put_bytes(0, pad as usize);
        }
        buf.freeze()
    }

    /// Encode a HEADERS frame
    pub fn encode_headers(frame: &HeadersFrame) -> Bytes {
        let mut flags = FrameFlags::empty();
        if frame.end_stream {
            flags.set(FrameFlags::END_STREAM);
        }
        if frame.end_headers {
            flags.set(FrameFlags::END_HEADERS);
        }
        let mut payload_len = frame.fragment.len();
        if frame.priority.is_some() {
            flags.set(FrameFlags::PRIORITY);
            payload_len += 5;
        }
        if let Some(pad) = frame.pad_length {
            flags.set(FrameFlags::PADDED);
            payload_len += 1 + pad as usize;
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload_len);
        buf.put_slice(&Self::encode_header(
            FrameType::Headers,
            flags,
            frame.stream_id,
            payload_len,
        ));
        if let Some(pad) = frame.pad_length {
            buf.put_u8(pad);
        }
        if let Some(priority) = &frame.priority {
            let mut dep = priority.depends_on;
            if priority.exclusive {
                dep |= 0x8000_0000;
            }
            buf.put_u32(dep);
            buf.put_u8(priority.weight);
        }
        buf.put_slice(&frame.fragment);
        if let Some(pad) = frame.pad_length {
            buf.put_bytes(0, pad as usize);
        }
        buf.freeze()
    }

    /// Encode a PRIORITY frame
    pub fn encode_priority(frame: &PriorityFrame) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + 5);
        buf.put_slice(&Self::encode_header(
            FrameType::Priority,
            FrameFlags::empty(),
            frame.stream_id,
            5,
        ));
        let mut dep = frame.priority.depends_on;
        if frame.priority.exclusive {
            dep |= 0x8000_0000;
        }
        buf.put_u32(dep);
        buf.put_u8(frame.priority.weight);
        buf.freeze()
    }

    /// Encode a RST_STREAM frame
    pub fn encode_rst_stream(frame: &RstStreamFrame) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + 4);
        buf.put_slice(&Self::encode_header(
            FrameType::RstStream,
            FrameFlags::empty(),
            frame.stream_id,
            4,
        ));
        buf.put_u32(frame.error_code.as_u32());
        buf.freeze()
    }

    /// Encode a SETTINGS frame carrying the given raw parameter payload
    /// (pairs already packed by [`crate::settings::Settings::pack`]).
    pub fn encode_settings(payload: &[u8], ack: bool) -> Bytes {
        let flags = if ack {
            FrameFlags::from_u8(FrameFlags::ACK)
        } else {
            FrameFlags::empty()
        };
        let payload = if ack { &[][..] } else { payload };

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
        buf.put_slice(&Self::encode_header(
            FrameType::Settings,
            flags,
            0,
            payload.len(),
        ));
        buf.put_slice(payload);
        buf.freeze()
    }

    /// Encode a PUSH_PROMISE frame
    pub fn encode_push_promise(frame: &PushPromiseFrame) -> Bytes {
        let mut flags = FrameFlags::empty();
        if frame.end_headers {
            flags.set(FrameFlags::END_HEADERS);
        }
        let payload_len = 4 + frame.fragment.len();

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload_len);
        buf.put_slice(&Self::encode_header(
            FrameType::PushPromise,
            flags,
            frame.stream_id,
            payload_len,
        ));
        buf.put_u32(frame.promised_stream_id & 0x7FFF_FFFF);
        buf.put_slice(&frame.fragment);
        buf.freeze()
    }

    /// Encode a PING frame
    pub fn encode_ping(frame: &PingFrame) -> Bytes {
        let flags = if frame.ack {
            FrameFlags::from_u8(FrameFlags::ACK)
        } else {
            FrameFlags::empty()
        };
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + 8);
        buf.put_slice(&Self::encode_header(FrameType::Ping, flags, 0, 8));
        buf.put_slice(&frame.data);
        buf.freeze()
    }

    /// Encode a GOAWAY frame
    pub fn encode_goaway(frame: &GoawayFrame) -> Bytes {
        let payload_len = 8 + frame.debug_data.len();
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload_len);
        buf.put_slice(&Self::encode_header(
            FrameType::Goaway,
            FrameFlags::empty(),
            0,
            payload_len,
        ));
        buf.put_u32(frame.last_stream_id & 0x7FFF_FFFF);
        buf.put_u32(frame.error_code.as_u32());
        buf.put_slice(&frame.debug_data);
        buf.freeze()
    }

    /// Encode a WINDOW_UPDATE frame
    pub fn encode_window_update(frame: &WindowUpdateFrame) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + 4);
        buf.put_slice(&Self::encode_header(
            FrameType::WindowUpdate,
            FrameFlags::empty(),
            frame.stream_id,
            4,
        ));
        buf.put_u32(frame.increment & 0x7FFF_FFFF);
        buf.freeze()
    }

    /// Encode a CONTINUATION frame
    pub fn encode_continuation(frame: &ContinuationFrame) -> Bytes {
        let mut flags = FrameFlags::empty();
        if frame.end_headers {
            flags.set(FrameFlags::END_HEADERS);
        }
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + frame.fragment.len());
        buf.put_slice(&Self::encode_header(
            FrameType::Continuation,
            flags,
            frame.stream_id,
            frame.fragment.len(),
        ));
        buf.put_slice(&frame.fragment);
        buf.freeze()
    }
}
