//! Per-connection HTTP/2 engine: preface handshake, settings negotiation,
//! and the frame dispatch loop.
//!
//! One connection owns one `Connection` value and drives it from one task;
//! frames are processed strictly in arrival order because both HPACK state
//! and stream state are order-dependent. "Suspend until more bytes" is a
//! blocking [`Transport::read`]; distinct connections run on distinct
//! threads or tasks and share nothing.

use crate::codec::FrameCodec;
use crate::error::{Error, ErrorCode, Result};
use crate::flow_control::Window;
use crate::frames::*;
use crate::hpack::{Decoder, Encoder, HeaderField};
use crate::priority::PriorityTree;
use crate::settings::Settings;
use crate::stream::StreamTable;
use crate::transport::Transport;
use bytes::{Bytes, BytesMut};
use tracing::{debug, error, trace, warn};

/// The 24 octets every HTTP/2 client sends first.
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Receiver for decoded protocol events, implemented by the request model
/// sitting above the engine. Header lists and data are owned copies; nothing
/// borrows the engine's scratch buffer.
pub trait RequestSink {
    /// A complete header block arrived on `stream_id`.
    fn on_headers(
        &mut self,
        stream_id: u32,
        headers: Vec<HeaderField>,
        end_stream: bool,
    ) -> Result<()>;

    /// Request body octets arrived on `stream_id`.
    fn on_data(&mut self, stream_id: u32, data: Bytes, end_stream: bool) -> Result<()>;

    /// The peer promised a stream (never happens server-side in practice).
    fn on_push_promise(
        &mut self,
        stream_id: u32,
        promised_stream_id: u32,
        headers: Vec<HeaderField>,
    ) -> Result<()> {
        let _ = (stream_id, promised_stream_id, headers);
        Ok(())
    }

    /// A stream was reset, by the peer or by the engine.
    fn on_stream_reset(&mut self, stream_id: u32, code: ErrorCode) {
        let _ = (stream_id, code);
    }

    /// The peer started shutting the connection down.
    fn on_goaway(&mut self, last_stream_id: u32, code: ErrorCode) {
        let _ = (last_stream_id, code);
    }
}

/// Builder for a server-side connection.
pub struct ConnectionBuilder {
    local: Settings,
    is_tls: bool,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        ConnectionBuilder {
            local: Settings::default(),
            is_tls: false,
        }
    }

    /// Settings this server will advertise.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.local = settings;
        self
    }

    /// Mark the transport as TLS (ALPN-negotiated h2 rather than h2c).
    pub fn tls(mut self, is_tls: bool) -> Self {
        self.is_tls = is_tls;
        self
    }

    pub fn build<T: Transport>(self, transport: T) -> Connection<T> {
        let local = self.local;
        let remote = Settings::default();
        let scratch = BytesMut::with_capacity(local.max_frame_size as usize);
        Connection {
            decoder: Decoder::new(local.header_table_size as usize),
            encoder: Encoder::new(remote.header_table_size as usize),
            send_window: Window::new(remote.initial_window_size),
            recv_window: Window::new(local.initial_window_size),
            local,
            remote,
            streams: StreamTable::new(),
            priorities: PriorityTree::new(),
            scratch,
            transport,
            last_processed_stream_id: 0,
            peer_settings_received: false,
            local_settings_acked: false,
            goaway_sent: false,
            goaway_received: None,
            is_tls: self.is_tls,
        }
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Server side of one HTTP/2 connection.
pub struct Connection<T: Transport> {
    transport: T,
    /// Settings we advertised; governs what the peer may send us
    local: Settings,
    /// Settings the peer advertised; governs what we may send
    remote: Settings,
    decoder: Decoder,
    encoder: Encoder,
    streams: StreamTable,
    priorities: PriorityTree,
    /// Connection-level window for octets we send
    send_window: Window,
    /// Connection-level window for octets the peer sends
    recv_window: Window,
    /// Payload buffer reused for every frame read
    scratch: BytesMut,
    last_processed_stream_id: u32,
    peer_settings_received: bool,
    local_settings_acked: bool,
    goaway_sent: bool,
    goaway_received: Option<u32>,
    is_tls: bool,
}

impl<T: Transport> Connection<T> {
    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    pub fn local_settings(&self) -> &Settings {
        &self.local
    }

    pub fn remote_settings(&self) -> &Settings {
        &self.remote
    }

    pub fn last_processed_stream_id(&self) -> u32 {
        self.last_processed_stream_id
    }

    /// Whether the peer acknowledged our SETTINGS yet.
    pub fn settings_acked(&self) -> bool {
        self.local_settings_acked
    }

    /// Accept a freshly negotiated HTTP/2 connection: verify the client
    /// preface and send our SETTINGS. The client's own SETTINGS frame is
    /// handled by the first [`Connection::serve`] iteration.
    pub fn accept(&mut self) -> Result<()> {
        let mut preface = [0u8; 24];
        self.transport
            .read_exact(&mut preface)
            .map_err(|_| Error::BadPreface)?;
        if preface != *CONNECTION_PREFACE {
            return Err(Error::BadPreface);
        }
        debug!("client preface verified");

        let payload = self.local.pack();
        self.transport
            .write_all(&FrameCodec::encode_settings(&payload, false))?;
        Ok(())
    }

    /// Stage the peer's settings from an `HTTP2-Settings` upgrade header.
    ///
    /// Returns `false` when the header is unusable, in which case the caller
    /// answers 400 and stays on HTTP/1.1. On success the decoded settings
    /// are treated as implicitly acknowledged; the client still sends the
    /// preface after the 101 response, so [`Connection::accept`] follows.
    pub fn accept_upgrade(&mut self, http2_settings: &str) -> bool {
        let mut staged = self.remote.clone();
        if !staged.decode_from_upgrade(http2_settings) {
            warn!("h2c upgrade rejected, falling back to HTTP/1.1");
            return false;
        }
        if self.apply_remote_settings(staged).is_err() {
            warn!("h2c upgrade settings unusable, falling back to HTTP/1.1");
            return false;
        }
        debug!("h2c upgrade settings applied");
        true
    }

    /// Run the dispatch loop until the connection ends.
    ///
    /// Returns `Ok(())` on orderly shutdown (GOAWAY seen, then the peer
    /// closed). Connection errors send GOAWAY, close the transport, and are
    /// returned; stream errors send RST_STREAM and the loop continues.
    pub fn serve<S: RequestSink>(&mut self, sink: &mut S) -> Result<()> {
        while self.serve_one(sink)? {}
        Ok(())
    }

    /// Process exactly one frame. Returns `false` once the connection has
    /// shut down in an orderly fashion. Callers interleaving responses with
    /// frame processing drive this directly instead of [`Connection::serve`].
    pub fn serve_one<S: RequestSink>(&mut self, sink: &mut S) -> Result<bool> {
        let header = match FrameCodec::read_frame(
            &mut self.transport,
            self.local.max_frame_size,
            &mut self.scratch,
        ) {
            Ok(header) => header,
            Err(Error::Io(err)) if self.goaway_received.is_some() => {
                debug!(%err, "transport closed after GOAWAY, orderly shutdown");
                return Ok(false);
            }
            Err(err) => return self.fail(err).map(|_| false),
        };

        match self.dispatch(&header, sink) {
            Ok(()) => {}
            Err(Error::Stream { stream_id, code }) => {
                warn!(stream_id, %code, "resetting stream");
                self.reset_stream(stream_id, code)?;
                sink.on_stream_reset(stream_id, code);
            }
            Err(err) => return self.fail(err).map(|_| false),
        }

        self.streams.reap_closed();
        Ok(true)
    }

    /// Send GOAWAY for a fatal error, close the transport, surface the error.
    fn fail(&mut self, err: Error) -> Result<()> {
        if let Some(code) = err.connection_code() {
            error!(%err, %code, "connection error, sending GOAWAY");
            let goaway = GoawayFrame::new(
                self.last_processed_stream_id,
                code,
                Bytes::new(),
            );
            // The peer may already be gone; the GOAWAY is best-effort
            let _ = self.transport.write_all(&FrameCodec::encode_goaway(&goaway));
            self.goaway_sent = true;
        }
        let _ = self.transport.close();
        Err(err)
    }

    fn dispatch<S: RequestSink>(&mut self, header: &FrameHeader, sink: &mut S) -> Result<()> {
        let Some(frame_type) = FrameType::from_u8(header.frame_type) else {
            trace!(
                frame_type = header.frame_type,
                stream_id = header.stream_id,
                "ignoring unknown frame type"
            );
            return Ok(());
        };
        trace!(
            %frame_type,
            stream_id = header.stream_id,
            length = header.length,
            "dispatching frame"
        );

        // The client preface ends with a SETTINGS frame; anything else
        // first is a protocol violation (RFC 7540 Section 3.5)
        if !self.peer_settings_received && frame_type != FrameType::Settings {
            return Err(Error::protocol(format!(
                "expected initial SETTINGS, got {frame_type}"
            )));
        }

        match frame_type {
            FrameType::Data => {
                let frame = FrameCodec::decode_data(header, &self.scratch)?;
                self.handle_data(frame, sink)
            }
            FrameType::Headers => {
                let frame = FrameCodec::decode_headers(header, &self.scratch)?;
                self.handle_headers(frame, sink)
            }
            FrameType::Priority => {
                let frame = FrameCodec::decode_priority(header, &self.scratch)?;
                self.priorities.update(frame.stream_id, &frame.priority)
            }
            FrameType::RstStream => {
                let frame = FrameCodec::decode_rst_stream(header, &self.scratch)?;
                self.handle_rst_stream(frame, sink)
            }
            FrameType::Settings => self.handle_settings(header),
            FrameType::PushPromise => {
                let frame = FrameCodec::decode_push_promise(header, &self.scratch)?;
                self.handle_push_promise(frame, sink)
            }
            FrameType::Ping => {
                let frame = FrameCodec::decode_ping(header, &self.scratch)?;
                self.handle_ping(frame)
            }
            FrameType::Goaway => {
                let frame = FrameCodec::decode_goaway(header, &self.scratch)?;
                self.handle_goaway(frame, sink)
            }
            FrameType::WindowUpdate => {
                let frame = FrameCodec::decode_window_update(header, &self.scratch)?;
                self.handle_window_update(frame)
            }
            FrameType::Continuation => Err(Error::protocol(
                "CONTINUATION without a header block in progress",
            )),
        }
    }

    // ---- receive handlers -----------------------------------------------

    fn handle_data<S: RequestSink>(&mut self, frame: DataFrame, sink: &mut S) -> Result<()> {
        if self.streams.is_idle_client_id(frame.stream_id) {
            return Err(Error::protocol(format!(
                "DATA on idle stream {}",
                frame.stream_id
            )));
        }

        let flow_len = frame.flow_controlled_len();
        self.recv_window.consume(flow_len).map_err(|_| {
            Error::flow_control("peer overran the connection receive window")
        })?;

        // Flow-controlled octets count against the connection window even
        // when the stream is already gone, so the replenish must happen on
        // the error paths too
        let accounted = self.account_stream_data(&frame, flow_len);
        if let Err(err) = accounted {
            self.replenish_recv_windows(frame.stream_id, flow_len, true)?;
            return Err(err);
        }

        self.last_processed_stream_id = frame.stream_id;
        sink.on_data(frame.stream_id, frame.data, frame.end_stream)?;

        // Replenish both windows right away; backpressure policy lives in
        // the request model, not the engine
        self.replenish_recv_windows(frame.stream_id, flow_len, frame.end_stream)?;
        Ok(())
    }

    fn account_stream_data(&mut self, frame: &DataFrame, flow_len: usize) -> Result<()> {
        let stream = self
            .streams
            .get_mut(frame.stream_id)
            .ok_or(Error::stream(frame.stream_id, ErrorCode::StreamClosed))?;
        stream
            .recv_window
            .consume(flow_len)
            .map_err(|_| Error::stream(frame.stream_id, ErrorCode::FlowControlError))?;
        stream.recv_data(frame.end_stream)
    }

    fn replenish_recv_windows(
        &mut self,
        stream_id: u32,
        amount: usize,
        stream_done: bool,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let increment = amount as u32;
        self.recv_window
            .expand(increment)
            .map_err(|_| Error::flow_control("connection receive window overflow"))?;
        self.transport
            .write_all(&FrameCodec::encode_window_update(&WindowUpdateFrame {
                stream_id: 0,
                increment,
            }))?;

        if !stream_done {
            if let Some(stream) = self.streams.get_mut(stream_id) {
                stream
                    .recv_window
                    .expand(increment)
                    .map_err(|_| Error::stream(stream_id, ErrorCode::FlowControlError))?;
                self.transport
                    .write_all(&FrameCodec::encode_window_update(&WindowUpdateFrame {
                        stream_id,
                        increment,
                    }))?;
            }
        }
        Ok(())
    }

    fn handle_headers<S: RequestSink>(
        &mut self,
        frame: HeadersFrame,
        sink: &mut S,
    ) -> Result<()> {
        let stream_id = frame.stream_id;
        let end_stream = frame.end_stream;
        let block = self.read_header_block(stream_id, frame.fragment, frame.end_headers)?;

        // Decode before any refusal: the dynamic table must advance for
        // every block the peer compressed, or later blocks desynchronize
        let headers = self.decoder.decode(&block)?;

        if let Some(priority) = frame.priority {
            self.priorities.update(stream_id, &priority)?;
        }

        // New streams are refused past the advertised concurrency limit and
        // after we announced shutdown; the block above still advanced the
        // HPACK state either way
        let over_limit = self.streams.get(stream_id).is_none()
            && (self.goaway_sent
                || self
                    .local
                    .max_concurrent_streams
                    .is_some_and(|max| self.streams.active_count() >= max as usize));

        let stream = self.streams.open_client_stream(
            stream_id,
            self.remote.initial_window_size,
            self.local.initial_window_size,
        )?;
        stream.recv_headers(end_stream)?;

        if over_limit {
            return Err(Error::stream(stream_id, ErrorCode::RefusedStream));
        }
        if self.header_list_exceeds_limit(&headers) {
            return Err(Error::stream(stream_id, ErrorCode::EnhanceYourCalm));
        }

        self.last_processed_stream_id = stream_id;
        debug!(stream_id, fields = headers.len(), end_stream, "header block decoded");
        sink.on_headers(stream_id, headers, end_stream)
    }

    /// Accumulate a header block across CONTINUATION frames. Until
    /// END_HEADERS arrives, no other frame may intervene on any stream.
    ///
    /// Accumulation is bounded by the advertised
    /// SETTINGS_MAX_HEADER_LIST_SIZE: no representation compresses a field
    /// below its list-size accounting, so encoded octets past the limit
    /// cannot decode under it. Aborting mid-block leaves the HPACK tables
    /// unsynchronizable, which makes the overflow connection-fatal.
    fn read_header_block(
        &mut self,
        stream_id: u32,
        first_fragment: Bytes,
        end_headers: bool,
    ) -> Result<Bytes> {
        let limit = self.local.max_header_list_size.map(|v| v as usize);
        let too_large = |len: usize| matches!(limit, Some(max) if len > max);
        if too_large(first_fragment.len()) {
            return Err(header_block_too_large());
        }
        if end_headers {
            return Ok(first_fragment);
        }
        let mut block = BytesMut::from(&first_fragment[..]);
        loop {
            let header = FrameCodec::read_frame(
                &mut self.transport,
                self.local.max_frame_size,
                &mut self.scratch,
            )?;
            if FrameType::from_u8(header.frame_type) != Some(FrameType::Continuation) {
                return Err(Error::protocol(
                    "header block interrupted by a non-CONTINUATION frame",
                ));
            }
            let cont = FrameCodec::decode_continuation(&header, &self.scratch)?;
            if cont.stream_id != stream_id {
                return Err(Error::protocol(format!(
                    "CONTINUATION stream id {} does not match block stream {stream_id}",
                    cont.stream_id
                )));
            }
            block.extend_from_slice(&cont.fragment);
            if too_large(block.len()) {
                return Err(header_block_too_large());
            }
            if cont.end_headers {
                return Ok(block.freeze());
            }
        }
    }

    /// RFC 7540 Section 6.5.2 accounting for SETTINGS_MAX_HEADER_LIST_SIZE:
    /// name octets plus value octets plus 32 per field, uncompressed.
    fn header_list_exceeds_limit(&self, headers: &[HeaderField]) -> bool {
        match self.local.max_header_list_size {
            Some(max) => {
                headers.iter().map(|h| h.table_size()).sum::<usize>() > max as usize
            }
            None => false,
        }
    }

    fn handle_rst_stream<S: RequestSink>(
        &mut self,
        frame: RstStreamFrame,
        sink: &mut S,
    ) -> Result<()> {
        if self.streams.is_idle_client_id(frame.stream_id) {
            return Err(Error::protocol(format!(
                "RST_STREAM on idle stream {}",
                frame.stream_id
            )));
        }
        if let Some(stream) = self.streams.get_mut(frame.stream_id) {
            stream.reset();
            self.priorities.remove(frame.stream_id);
            sink.on_stream_reset(frame.stream_id, frame.error_code);
        }
        Ok(())
    }

    fn handle_settings(&mut self, header: &FrameHeader) -> Result<()> {
        if header.stream_id != 0 {
            return Err(Error::protocol("SETTINGS frame on non-zero stream"));
        }
        if header.flags.is_ack() {
            if header.length != 0 {
                return Err(Error::frame_size("SETTINGS ACK with a payload"));
            }
            self.local_settings_acked = true;
            debug!("peer acknowledged our settings");
            return Ok(());
        }

        let mut staged = self.remote.clone();
        staged.unpack(&self.scratch)?;
        self.apply_remote_settings(staged)?;
        self.peer_settings_received = true;

        self.transport
            .write_all(&FrameCodec::encode_settings(&[], true))?;
        Ok(())
    }

    /// Fold a new remote settings view into the engine state: the encoder's
    /// table ceiling and every stream's send window re-base on it. A window
    /// pushed past 2^31-1 by the re-base is a connection FLOW_CONTROL_ERROR
    /// (RFC 7540 Section 6.9.2).
    fn apply_remote_settings(&mut self, staged: Settings) -> Result<()> {
        if staged.header_table_size != self.remote.header_table_size {
            self.encoder
                .set_table_size(staged.header_table_size as usize);
        }
        if staged.initial_window_size != self.remote.initial_window_size {
            self.streams
                .update_send_windows(staged.initial_window_size)?;
        }
        self.remote = staged;
        Ok(())
    }

    fn handle_push_promise<S: RequestSink>(
        &mut self,
        frame: PushPromiseFrame,
        sink: &mut S,
    ) -> Result<()> {
        if !self.local.enable_push {
            return Err(Error::protocol("PUSH_PROMISE while push is disabled"));
        }
        let block =
            self.read_header_block(frame.stream_id, frame.fragment, frame.end_headers)?;
        // Decode unconditionally to keep the dynamic table in sync
        let headers = self.decoder.decode(&block)?;
        if self.header_list_exceeds_limit(&headers) {
            return Err(Error::stream(frame.stream_id, ErrorCode::EnhanceYourCalm));
        }

        self.streams.reserve_remote_stream(
            frame.promised_stream_id,
            self.remote.initial_window_size,
            self.local.initial_window_size,
        )?;
        sink.on_push_promise(frame.stream_id, frame.promised_stream_id, headers)
    }

    fn handle_ping(&mut self, frame: PingFrame) -> Result<()> {
        if frame.ack {
            trace!("PING ack received");
            return Ok(());
        }
        self.transport
            .write_all(&FrameCodec::encode_ping(&PingFrame::ack(frame.data)))?;
        Ok(())
    }

    fn handle_goaway<S: RequestSink>(&mut self, frame: GoawayFrame, sink: &mut S) -> Result<()> {
        debug!(
            last_stream_id = frame.last_stream_id,
            code = %frame.error_code,
            "peer sent GOAWAY"
        );
        self.goaway_received = Some(frame.last_stream_id);
        sink.on_goaway(frame.last_stream_id, frame.error_code);
        Ok(())
    }

    fn handle_window_update(&mut self, frame: WindowUpdateFrame) -> Result<()> {
        if frame.stream_id == 0 {
            if frame.increment == 0 {
                return Err(Error::protocol("connection WINDOW_UPDATE with increment 0"));
            }
            return self.send_window.expand(frame.increment).map_err(|_| {
                Error::flow_control("connection send window overflow")
            });
        }

        if frame.increment == 0 {
            return Err(Error::stream(frame.stream_id, ErrorCode::ProtocolError));
        }
        if self.streams.is_idle_client_id(frame.stream_id) {
            return Err(Error::protocol(format!(
                "WINDOW_UPDATE on idle stream {}",
                frame.stream_id
            )));
        }
        match self.streams.get_mut(frame.stream_id) {
            Some(stream) => stream
                .send_window
                .expand(frame.increment)
                .map_err(|_| Error::stream(frame.stream_id, ErrorCode::FlowControlError)),
            // Updates may trail a stream we already closed; ignore them
            None => Ok(()),
        }
    }

    // ---- send side ------------------------------------------------------

    /// Encode and send a response header block, splitting into HEADERS plus
    /// CONTINUATION frames when it exceeds the peer's max frame size.
    pub fn send_headers(
        &mut self,
        stream_id: u32,
        headers: &[HeaderField],
        end_stream: bool,
    ) -> Result<()> {
        let block = self.encoder.encode(headers);
        let max = self.remote.max_frame_size as usize;

        let stream = self
            .streams
            .get_mut(stream_id)
            .ok_or(Error::stream(stream_id, ErrorCode::StreamClosed))?;
        stream.send_headers(end_stream)?;

        let mut chunks = block.chunks(max.max(1));
        let first = chunks.next().unwrap_or(&[]);
        let rest: Vec<&[u8]> = chunks.collect();

        let frame = HeadersFrame::new(
            stream_id,
            Bytes::copy_from_slice(first),
            end_stream,
            rest.is_empty(),
        );
        self.transport.write_all(&FrameCodec::encode_headers(&frame))?;

        let last = rest.len();
        for (i, chunk) in rest.into_iter().enumerate() {
            let cont = ContinuationFrame {
                stream_id,
                fragment: Bytes::copy_from_slice(chunk),
                end_headers: i + 1 == last,
            };
            self.transport
                .write_all(&FrameCodec::encode_continuation(&cont))?;
        }
        Ok(())
    }

    /// Send body octets, bounded by both flow-control windows and the
    /// peer's max frame size. Returns how many octets were actually sent;
    /// the caller retries the remainder after WINDOW_UPDATEs arrive.
    pub fn send_data(&mut self, stream_id: u32, data: &[u8], end_stream: bool) -> Result<usize> {
        let stream = self
            .streams
            .get_mut(stream_id)
            .ok_or(Error::stream(stream_id, ErrorCode::StreamClosed))?;
        if !stream.state.can_send_data() {
            return Err(Error::stream(stream_id, ErrorCode::StreamClosed));
        }

        let budget = self
            .send_window
            .available()
            .min(stream.send_window.available())
            .max(0) as usize;
        let sendable = data.len().min(budget);
        let finishing = end_stream && sendable == data.len();

        let mut offset = 0;
        let max = self.remote.max_frame_size as usize;
        while offset < sendable || (finishing && sendable == 0 && offset == 0) {
            let end = (offset + max).min(sendable);
            let chunk = &data[offset..end];
            let frame = DataFrame::new(
                stream_id,
                Bytes::copy_from_slice(chunk),
                finishing && end == sendable,
            );
            self.transport.write_all(&FrameCodec::encode_data(&frame))?;
            offset = end;
            if chunk.is_empty() {
                break;
            }
        }

        if sendable > 0 {
            self.send_window.consume(sendable).map_err(|_| {
                Error::flow_control("connection send window accounting underflow")
            })?;
            let stream = self
                .streams
                .get_mut(stream_id)
                .ok_or(Error::stream(stream_id, ErrorCode::StreamClosed))?;
            stream
                .send_window
                .consume(sendable)
                .map_err(|_| Error::stream(stream_id, ErrorCode::FlowControlError))?;
        }
        if finishing {
            if let Some(stream) = self.streams.get_mut(stream_id) {
                stream.send_end_stream();
            }
        }
        Ok(sendable)
    }

    /// Promise a pushed response on a fresh even stream id. Fails when the
    /// peer disabled push or the id space is exhausted.
    pub fn push_promise(
        &mut self,
        stream_id: u32,
        request_headers: &[HeaderField],
    ) -> Result<u32> {
        if !self.remote.enable_push {
            return Err(Error::protocol("peer disabled server push"));
        }
        let promised = {
            let stream = self.streams.reserve_push_stream(
                self.remote.initial_window_size,
                self.local.initial_window_size,
            )?;
            stream.id
        };
        let fragment = self.encoder.encode(request_headers);
        let frame = PushPromiseFrame {
            stream_id,
            promised_stream_id: promised,
            fragment: Bytes::from(fragment),
            end_headers: true,
            pad_length: None,
        };
        self.transport
            .write_all(&FrameCodec::encode_push_promise(&frame))?;
        Ok(promised)
    }

    /// Reset one stream and keep the connection going.
    pub fn reset_stream(&mut self, stream_id: u32, code: ErrorCode) -> Result<()> {
        if let Some(stream) = self.streams.get_mut(stream_id) {
            stream.reset();
        }
        self.priorities.remove(stream_id);
        self.transport
            .write_all(&FrameCodec::encode_rst_stream(&RstStreamFrame {
                stream_id,
                error_code: code,
            }))?;
        Ok(())
    }

    /// Begin a graceful local shutdown: announce the last stream we will
    /// process and stop accepting new ones.
    pub fn go_away(&mut self, code: ErrorCode) -> Result<()> {
        let frame = GoawayFrame::new(self.last_processed_stream_id, code, Bytes::new());
        self.transport.write_all(&FrameCodec::encode_goaway(&frame))?;
        self.goaway_sent = true;
        Ok(())
    }

    /// Send an unsolicited PING to measure liveness.
    pub fn ping(&mut self, data: [u8; 8]) -> Result<()> {
        self.transport
            .write_all(&FrameCodec::encode_ping(&PingFrame::new(data)))?;
        Ok(())
    }
}

fn header_block_too_large() -> Error {
    Error::Connection {
        code: ErrorCode::EnhanceYourCalm,
        reason: "header block exceeds SETTINGS_MAX_HEADER_LIST_SIZE".into(),
    }
}
