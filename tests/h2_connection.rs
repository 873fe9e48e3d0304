//! Connection-level integration tests
//!
//! Each test scripts the client side of a connection as raw octets, runs the
//! dispatch loop over an in-memory transport, and inspects both the sink
//! events and the frames the server wrote back.

use bytes::Bytes;
use h2wire::codec::{FrameCodec, FRAME_HEADER_SIZE};
use h2wire::connection::{ConnectionBuilder, RequestSink, CONNECTION_PREFACE};
use h2wire::error::{Error, ErrorCode, Result};
use h2wire::frames::*;
use h2wire::hpack::{Encoder, HeaderField};
use h2wire::settings::SettingsBuilder;
use h2wire::transport::Transport;
use std::cell::RefCell;
use std::io::{self, Read};
use std::rc::Rc;

/// In-memory transport: reads from a scripted byte stream, captures writes.
struct MockTransport {
    input: io::Cursor<Vec<u8>>,
    output: Rc<RefCell<Vec<u8>>>,
}

impl MockTransport {
    fn new(input: Vec<u8>) -> (Self, Rc<RefCell<Vec<u8>>>) {
        let output = Rc::new(RefCell::new(Vec::new()));
        (
            MockTransport {
                input: io::Cursor::new(input),
                output: Rc::clone(&output),
            },
            output,
        )
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct CollectSink {
    headers: Vec<(u32, Vec<(Vec<u8>, Vec<u8>)>, bool)>,
    data: Vec<(u32, Vec<u8>, bool)>,
    resets: Vec<(u32, ErrorCode)>,
    goaways: Vec<(u32, ErrorCode)>,
}

impl RequestSink for CollectSink {
    fn on_headers(
        &mut self,
        stream_id: u32,
        headers: Vec<HeaderField>,
        end_stream: bool,
    ) -> Result<()> {
        let pairs = headers.into_iter().map(|h| (h.name, h.value)).collect();
        self.headers.push((stream_id, pairs, end_stream));
        Ok(())
    }

    fn on_data(&mut self, stream_id: u32, data: Bytes, end_stream: bool) -> Result<()> {
        self.data.push((stream_id, data.to_vec(), end_stream));
        Ok(())
    }

    fn on_stream_reset(&mut self, stream_id: u32, code: ErrorCode) {
        self.resets.push((stream_id, code));
    }

    fn on_goaway(&mut self, last_stream_id: u32, code: ErrorCode) {
        self.goaways.push((last_stream_id, code));
    }
}

/// Split captured server output back into (header, payload) frames.
fn parse_frames(wire: &[u8]) -> Vec<(FrameHeader, Vec<u8>)> {
    let mut frames = Vec::new();
    let mut rest = wire;
    while rest.len() >= FRAME_HEADER_SIZE {
        let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
        header_bytes.copy_from_slice(&rest[..FRAME_HEADER_SIZE]);
        let header = FrameCodec::decode_header(&header_bytes);
        let end = FRAME_HEADER_SIZE + header.length;
        frames.push((header, rest[FRAME_HEADER_SIZE..end].to_vec()));
        rest = &rest[end..];
    }
    assert!(rest.is_empty(), "trailing partial frame in server output");
    frames
}

fn client_goaway() -> Bytes {
    FrameCodec::encode_goaway(&GoawayFrame::new(0, ErrorCode::NoError, Bytes::new()))
}

fn request_block(encoder: &mut Encoder) -> Vec<u8> {
    encoder.encode(&[
        HeaderField::new(":method", "GET"),
        HeaderField::new(":scheme", "http"),
        HeaderField::new(":path", "/"),
        HeaderField::new(":authority", "test.local"),
    ])
}

/// Run accept + serve over a scripted input, returning the serve result,
/// the sink, and the server's output frames.
fn run_scripted(input: Vec<u8>) -> (Result<()>, CollectSink, Vec<(FrameHeader, Vec<u8>)>) {
    let (transport, output) = MockTransport::new(input);
    let mut conn = ConnectionBuilder::new().build(transport);
    let mut sink = CollectSink::default();

    let result = conn.accept().and_then(|()| conn.serve(&mut sink));
    let frames = parse_frames(&output.borrow());
    (result, sink, frames)
}

fn scripted_input(frames: &[Bytes]) -> Vec<u8> {
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&FrameCodec::encode_settings(&[], false));
    for frame in frames {
        input.extend_from_slice(frame);
    }
    input.extend_from_slice(&client_goaway());
    input
}

#[test]
fn test_settings_exchange_and_ping_echo() {
    let ping = FrameCodec::encode_ping(&PingFrame::new(*b"\x01\x02\x03\x04\x05\x06\x07\x08"));
    let (result, sink, frames) = run_scripted(scripted_input(&[ping]));

    result.unwrap();
    assert_eq!(sink.goaways, vec![(0, ErrorCode::NoError)]);

    // Server speaks SETTINGS first, then acks the client's
    assert_eq!(frames[0].0.frame_type, FrameType::Settings.as_u8());
    assert!(!frames[0].0.flags.is_ack());
    assert_eq!(frames[1].0.frame_type, FrameType::Settings.as_u8());
    assert!(frames[1].0.flags.is_ack());

    let (ping_header, ping_payload) = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::Ping.as_u8())
        .expect("no PING in server output");
    assert!(ping_header.flags.is_ack());
    assert_eq!(ping_payload.as_slice(), b"\x01\x02\x03\x04\x05\x06\x07\x08");
}

#[test]
fn test_request_headers_reach_the_sink() {
    let mut encoder = Encoder::new(4096);
    let block = request_block(&mut encoder);
    let headers = FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::from(block),
        true,
        true,
    ));

    let (result, sink, _) = run_scripted(scripted_input(&[headers]));
    result.unwrap();

    assert_eq!(sink.headers.len(), 1);
    let (stream_id, fields, end_stream) = &sink.headers[0];
    assert_eq!(*stream_id, 1);
    assert!(*end_stream);
    assert_eq!(fields[0], (b":method".to_vec(), b"GET".to_vec()));
    assert_eq!(fields[3], (b":authority".to_vec(), b"test.local".to_vec()));
}

#[test]
fn test_header_block_split_across_continuation() {
    let mut encoder = Encoder::new(4096);
    let block = request_block(&mut encoder);
    let split = block.len() / 2;

    let headers = FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::copy_from_slice(&block[..split]),
        true,
        false,
    ));
    let continuation = FrameCodec::encode_continuation(&ContinuationFrame {
        stream_id: 1,
        fragment: Bytes::copy_from_slice(&block[split..]),
        end_headers: true,
    });

    let (result, sink, _) = run_scripted(scripted_input(&[headers, continuation]));
    result.unwrap();
    assert_eq!(sink.headers.len(), 1);
    assert_eq!(sink.headers[0].1.len(), 4);
}

#[test]
fn test_data_is_flow_accounted_and_replenished() {
    let mut encoder = Encoder::new(4096);
    let block = request_block(&mut encoder);
    let headers = FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::from(block),
        false,
        true,
    ));
    let data = FrameCodec::encode_data(&DataFrame::new(
        1,
        Bytes::from_static(b"hello"),
        true,
    ));

    let (result, sink, frames) = run_scripted(scripted_input(&[headers, data]));
    result.unwrap();

    assert_eq!(sink.data, vec![(1, b"hello".to_vec(), true)]);

    // Connection-level window replenished by exactly the data length
    let update = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::WindowUpdate.as_u8() && h.stream_id == 0)
        .expect("no connection WINDOW_UPDATE");
    assert_eq!(
        u32::from_be_bytes([update.1[0], update.1[1], update.1[2], update.1[3]]),
        5
    );
}

#[test]
fn test_malformed_hpack_is_fatal() {
    // Index 62 with an empty dynamic table
    let headers = FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::from_static(&[0xbe]),
        true,
        true,
    ));

    let (result, _, frames) = run_scripted(scripted_input(&[headers]));
    let err = result.unwrap_err();
    assert_eq!(err.connection_code(), Some(ErrorCode::CompressionError));

    let (_, goaway_payload) = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::Goaway.as_u8())
        .expect("no GOAWAY in server output");
    let code = u32::from_be_bytes([
        goaway_payload[4],
        goaway_payload[5],
        goaway_payload[6],
        goaway_payload[7],
    ]);
    assert_eq!(ErrorCode::from_u32(code), ErrorCode::CompressionError);
}

#[test]
fn test_orphan_continuation_is_fatal() {
    let continuation = FrameCodec::encode_continuation(&ContinuationFrame {
        stream_id: 1,
        fragment: Bytes::from_static(&[0x82]),
        end_headers: true,
    });

    let (result, _, frames) = run_scripted(scripted_input(&[continuation]));
    let err = result.unwrap_err();
    assert_eq!(err.connection_code(), Some(ErrorCode::ProtocolError));
    assert!(frames
        .iter()
        .any(|(h, _)| h.frame_type == FrameType::Goaway.as_u8()));
}

#[test]
fn test_frames_before_initial_settings_are_fatal() {
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&FrameCodec::encode_ping(&PingFrame::new([0; 8])));

    let (transport, _) = MockTransport::new(input);
    let mut conn = ConnectionBuilder::new().build(transport);
    let mut sink = CollectSink::default();
    conn.accept().unwrap();

    let err = conn.serve(&mut sink).unwrap_err();
    assert_eq!(err.connection_code(), Some(ErrorCode::ProtocolError));
}

#[test]
fn test_bad_preface_rejected() {
    let (transport, _) = MockTransport::new(b"GET / HTTP/1.1\r\nHost: test\r\n\r\n".to_vec());
    let mut conn = ConnectionBuilder::new().build(transport);
    assert!(matches!(conn.accept(), Err(Error::BadPreface)));
}

#[test]
fn test_stream_zero_window_update_increment_is_fatal() {
    let update = FrameCodec::encode_window_update(&WindowUpdateFrame {
        stream_id: 0,
        increment: 0,
    });
    // encode masks nothing here; a zero increment goes out as zero
    let (result, _, _) = run_scripted(scripted_input(&[update]));
    assert_eq!(
        result.unwrap_err().connection_code(),
        Some(ErrorCode::ProtocolError)
    );
}

#[test]
fn test_concurrency_limit_refuses_with_rst() {
    let settings = SettingsBuilder::new()
        .max_concurrent_streams(1)
        .build()
        .unwrap();

    let mut encoder = Encoder::new(4096);
    let first = FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::from(request_block(&mut encoder)),
        false,
        true,
    ));
    let second = FrameCodec::encode_headers(&HeadersFrame::new(
        3,
        Bytes::from(request_block(&mut encoder)),
        false,
        true,
    ));

    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&FrameCodec::encode_settings(&[], false));
    input.extend_from_slice(&first);
    input.extend_from_slice(&second);
    input.extend_from_slice(&client_goaway());

    let (transport, output) = MockTransport::new(input);
    let mut conn = ConnectionBuilder::new().settings(settings).build(transport);
    let mut sink = CollectSink::default();
    conn.accept().unwrap();
    conn.serve(&mut sink).unwrap();

    // First stream accepted, second refused but HPACK state stayed intact
    assert_eq!(sink.headers.len(), 1);
    assert_eq!(sink.resets, vec![(3, ErrorCode::RefusedStream)]);

    let frames = parse_frames(&output.borrow());
    let (rst_header, rst_payload) = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::RstStream.as_u8())
        .expect("no RST_STREAM in server output");
    assert_eq!(rst_header.stream_id, 3);
    let code = u32::from_be_bytes([
        rst_payload[0],
        rst_payload[1],
        rst_payload[2],
        rst_payload[3],
    ]);
    assert_eq!(ErrorCode::from_u32(code), ErrorCode::RefusedStream);
}

#[test]
fn test_oversized_header_block_is_fatal() {
    let settings = SettingsBuilder::new()
        .max_header_list_size(1024)
        .build()
        .unwrap();

    // One 8 KB cookie, far past the advertised limit even compressed
    let mut encoder = Encoder::new(4096);
    let block = encoder.encode(&[
        HeaderField::new(":method", "GET"),
        HeaderField::new(":scheme", "http"),
        HeaderField::new(":path", "/"),
        HeaderField::new(":authority", "test.local"),
        HeaderField::new("cookie", "x".repeat(8192)),
    ]);

    // Drip the block in 512-octet fragments so each frame alone stays
    // under the limit; the accumulation check has to catch it
    let chunks: Vec<&[u8]> = block.chunks(512).collect();
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&FrameCodec::encode_settings(&[], false));
    input.extend_from_slice(&FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::copy_from_slice(chunks[0]),
        true,
        false,
    )));
    for (i, chunk) in chunks.iter().enumerate().skip(1) {
        input.extend_from_slice(&FrameCodec::encode_continuation(&ContinuationFrame {
            stream_id: 1,
            fragment: Bytes::copy_from_slice(chunk),
            end_headers: i == chunks.len() - 1,
        }));
    }

    let (transport, output) = MockTransport::new(input);
    let mut conn = ConnectionBuilder::new().settings(settings).build(transport);
    let mut sink = CollectSink::default();
    conn.accept().unwrap();

    let err = conn.serve(&mut sink).unwrap_err();
    assert_eq!(err.connection_code(), Some(ErrorCode::EnhanceYourCalm));
    assert!(sink.headers.is_empty());

    let frames = parse_frames(&output.borrow());
    let (_, goaway_payload) = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::Goaway.as_u8())
        .expect("no GOAWAY in server output");
    let code = u32::from_be_bytes([
        goaway_payload[4],
        goaway_payload[5],
        goaway_payload[6],
        goaway_payload[7],
    ]);
    assert_eq!(ErrorCode::from_u32(code), ErrorCode::EnhanceYourCalm);
}

#[test]
fn test_oversized_header_list_resets_the_stream() {
    // The standard request block is a handful of octets on the wire but
    // 174 octets of header list under the name + value + 32 accounting
    let settings = SettingsBuilder::new()
        .max_header_list_size(100)
        .build()
        .unwrap();

    let mut encoder = Encoder::new(4096);
    let headers = FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::from(request_block(&mut encoder)),
        true,
        true,
    ));

    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&FrameCodec::encode_settings(&[], false));
    input.extend_from_slice(&headers);
    input.extend_from_slice(&client_goaway());

    let (transport, output) = MockTransport::new(input);
    let mut conn = ConnectionBuilder::new().settings(settings).build(transport);
    let mut sink = CollectSink::default();
    conn.accept().unwrap();
    conn.serve(&mut sink).unwrap();

    // Block decoded for table sync, request never delivered
    assert!(sink.headers.is_empty());
    assert_eq!(sink.resets, vec![(1, ErrorCode::EnhanceYourCalm)]);

    let frames = parse_frames(&output.borrow());
    let (rst_header, rst_payload) = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::RstStream.as_u8())
        .expect("no RST_STREAM in server output");
    assert_eq!(rst_header.stream_id, 1);
    let code = u32::from_be_bytes([
        rst_payload[0],
        rst_payload[1],
        rst_payload[2],
        rst_payload[3],
    ]);
    assert_eq!(ErrorCode::from_u32(code), ErrorCode::EnhanceYourCalm);
}

#[test]
fn test_response_headers_and_body() {
    let mut encoder = Encoder::new(4096);
    let request = FrameCodec::encode_headers(&HeadersFrame::new(
        1,
        Bytes::from(request_block(&mut encoder)),
        true,
        true,
    ));

    let (transport, output) = MockTransport::new(scripted_input(&[request]));
    let mut conn = ConnectionBuilder::new().build(transport);
    let mut sink = CollectSink::default();
    conn.accept().unwrap();
    conn.serve(&mut sink).unwrap();

    conn.send_headers(1, &[HeaderField::new(":status", "200")], false)
        .unwrap();
    let sent = conn.send_data(1, b"hi", true).unwrap();
    assert_eq!(sent, 2);

    let frames = parse_frames(&output.borrow());
    let response = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::Headers.as_u8())
        .expect("no HEADERS in server output");
    assert_eq!(response.0.stream_id, 1);
    assert!(response.0.flags.is_end_headers());
    // :status 200 is static table index 8
    assert_eq!(response.1.as_slice(), &[0x88]);

    let (data_header, data_payload) = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::Data.as_u8())
        .expect("no DATA in server output");
    assert!(data_header.flags.is_end_stream());
    assert_eq!(data_payload.as_slice(), b"hi");
}

#[test]
fn test_h2c_upgrade_settings_apply() {
    let (transport, _) = MockTransport::new(Vec::new());
    let mut conn = ConnectionBuilder::new().build(transport);

    // enable_push 0, max streams 100, initial window 2^30
    assert!(conn.accept_upgrade("AAMAAABkAARAAAAAAAIAAAAA"));
    assert!(!conn.remote_settings().enable_push);
    assert_eq!(conn.remote_settings().max_concurrent_streams, Some(100));
    assert_eq!(conn.remote_settings().initial_window_size, 1 << 30);
}

#[test]
fn test_h2c_upgrade_failure_falls_back() {
    let (transport, _) = MockTransport::new(Vec::new());
    let mut conn = ConnectionBuilder::new().build(transport);

    assert!(!conn.accept_upgrade("not base64url!!"));
    // Settings untouched by the failed upgrade
    assert_eq!(conn.remote_settings(), &h2wire::Settings::default());
}
