//! Stream lifecycle (RFC 7540 Section 5.1)
//!
//! Odd ids are client-initiated, even ids are server-initiated (push). A
//! stream comes into being on HEADERS or PUSH_PROMISE and leaves the table
//! once CLOSED.

use crate::error::{Error, ErrorCode, Result};
use crate::flow_control::Window;
use crate::frames::PrioritySpec;
use std::collections::HashMap;
use tracing::debug;

/// Largest legal stream id, 2^31 - 1.
pub const MAX_STREAM_ID: u32 = 0x7FFF_FFFF;

/// RFC 7540 Section 5.1 states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    /// True once no further transitions are possible.
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed)
    }

    /// Whether the peer may still send DATA on this stream.
    pub fn can_recv_data(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    /// Whether we may still send DATA on this stream.
    pub fn can_send_data(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedRemote)
    }
}

/// One request/response exchange.
#[derive(Debug)]
pub struct Stream {
    pub id: u32,
    pub state: StreamState,
    pub priority: PrioritySpec,
    pub send_window: Window,
    pub recv_window: Window,
}

impl Stream {
    pub fn new(id: u32, send_initial: u32, recv_initial: u32) -> Self {
        Stream {
            id,
            state: StreamState::Idle,
            priority: PrioritySpec::default(),
            send_window: Window::new(send_initial),
            recv_window: Window::new(recv_initial),
        }
    }

    /// Peer's HEADERS arrived. IDLE opens; RESERVED_REMOTE moves to
    /// HALF_CLOSED_LOCAL; a second HEADERS on an open stream is trailers
    /// and must carry END_STREAM.
    pub fn recv_headers(&mut self, end_stream: bool) -> Result<()> {
        self.state = match self.state {
            StreamState::Idle => {
                if end_stream {
                    StreamState::HalfClosedRemote
                } else {
                    StreamState::Open
                }
            }
            StreamState::Open => {
                // Trailers (RFC 7540 Section 8.1)
                if !end_stream {
                    return Err(Error::stream(self.id, ErrorCode::ProtocolError));
                }
                StreamState::HalfClosedRemote
            }
            StreamState::ReservedRemote => {
                if end_stream {
                    StreamState::Closed
                } else {
                    StreamState::HalfClosedLocal
                }
            }
            StreamState::HalfClosedRemote | StreamState::Closed => {
                return Err(Error::stream(self.id, ErrorCode::StreamClosed));
            }
            other => {
                return Err(Error::protocol(format!(
                    "HEADERS received in state {other:?} on stream {}",
                    self.id
                )));
            }
        };
        Ok(())
    }

    /// Peer's DATA arrived. Legal only while the remote half is open.
    pub fn recv_data(&mut self, end_stream: bool) -> Result<()> {
        if !self.state.can_recv_data() {
            return Err(Error::stream(self.id, ErrorCode::StreamClosed));
        }
        if end_stream {
            self.close_remote_half();
        }
        Ok(())
    }

    /// We sent HEADERS (response or push response).
    pub fn send_headers(&mut self, end_stream: bool) -> Result<()> {
        self.state = match self.state {
            StreamState::Idle | StreamState::Open => {
                if end_stream {
                    StreamState::HalfClosedLocal
                } else {
                    StreamState::Open
                }
            }
            StreamState::ReservedLocal => {
                if end_stream {
                    StreamState::Closed
                } else {
                    StreamState::HalfClosedRemote
                }
            }
            StreamState::HalfClosedRemote => {
                if end_stream {
                    StreamState::Closed
                } else {
                    StreamState::HalfClosedRemote
                }
            }
            other => {
                return Err(Error::protocol(format!(
                    "cannot send HEADERS in state {other:?} on stream {}",
                    self.id
                )));
            }
        };
        Ok(())
    }

    /// We sent (or are about to send) END_STREAM on DATA.
    pub fn send_end_stream(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        };
    }

    /// RST_STREAM in either direction forces CLOSED.
    pub fn reset(&mut self) {
        self.state = StreamState::Closed;
    }

    fn close_remote_half(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        };
    }
}

/// All live streams of one connection plus the even-id push allocator.
#[derive(Debug)]
pub struct StreamTable {
    streams: HashMap<u32, Stream>,
    /// Next server-initiated (even) id
    next_push_id: u32,
    /// Highest client-initiated id seen; lower unseen odd ids are implicitly
    /// closed (RFC 7540 Section 5.1.1)
    max_client_id: u32,
}

impl StreamTable {
    pub fn new() -> Self {
        StreamTable {
            streams: HashMap::new(),
            next_push_id: 2,
            max_client_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    /// Streams counting against SETTINGS_MAX_CONCURRENT_STREAMS.
    pub fn active_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|(_, s)| {
                matches!(
                    s.state,
                    StreamState::Open
                        | StreamState::HalfClosedLocal
                        | StreamState::HalfClosedRemote
                )
            })
            .count()
    }

    /// Fetch or create the stream for a client-initiated HEADERS. A new id
    /// must be odd and higher than every id seen before; anything else means
    /// the peer reused or rewound ids.
    pub fn open_client_stream(
        &mut self,
        id: u32,
        send_initial: u32,
        recv_initial: u32,
    ) -> Result<&mut Stream> {
        // An existing entry means trailers or a violation; the state
        // machine decides which
        if !self.streams.contains_key(&id) {
            if id % 2 == 0 {
                return Err(Error::protocol(format!(
                    "client used server-initiated stream id {id}"
                )));
            }
            if id <= self.max_client_id {
                return Err(Error::protocol(format!(
                    "stream id {id} not greater than previous {}",
                    self.max_client_id
                )));
            }
            self.max_client_id = id;
            debug!(stream_id = id, "opening client stream");
        }
        Ok(self
            .streams
            .entry(id)
            .or_insert_with(|| Stream::new(id, send_initial, recv_initial)))
    }

    /// Reserve the next server-initiated stream id for a push. Connection
    /// error once the even id space is spent.
    pub fn reserve_push_stream(
        &mut self,
        send_initial: u32,
        recv_initial: u32,
    ) -> Result<&mut Stream> {
        let id = self.next_push_id;
        if id > MAX_STREAM_ID {
            return Err(Error::Connection {
                code: ErrorCode::ProtocolError,
                reason: "server stream ids exhausted".into(),
            });
        }
        self.next_push_id += 2;
        let mut stream = Stream::new(id, send_initial, recv_initial);
        stream.state = StreamState::ReservedLocal;
        debug!(stream_id = id, "reserving push stream");
        Ok(self.streams.entry(id).or_insert(stream))
    }

    /// Record a PUSH_PROMISE we received names this even id (servers never
    /// see these; kept for completeness of the state table).
    pub fn reserve_remote_stream(
        &mut self,
        id: u32,
        send_initial: u32,
        recv_initial: u32,
    ) -> Result<&mut Stream> {
        if id % 2 != 0 || self.streams.contains_key(&id) {
            return Err(Error::protocol(format!(
                "invalid promised stream id {id}"
            )));
        }
        let mut stream = Stream::new(id, send_initial, recv_initial);
        stream.state = StreamState::ReservedRemote;
        Ok(self.streams.entry(id).or_insert(stream))
    }

    /// Whether `id` is a client id the peer never opened. Frames other than
    /// PRIORITY on such a stream are a connection error.
    pub fn is_idle_client_id(&self, id: u32) -> bool {
        id % 2 == 1 && id > self.max_client_id
    }

    /// Drop CLOSED streams.
    pub fn reap_closed(&mut self) {
        self.streams.retain(|_, s| !s.state.is_closed());
    }

    /// Re-base every stream's send window after the peer changed
    /// SETTINGS_INITIAL_WINDOW_SIZE.
    pub fn update_send_windows(&mut self, new_initial: u32) -> Result<()> {
        for stream in self.streams.values_mut() {
            stream
                .send_window
                .update_initial_size(new_initial)
                .map_err(|_| {
                    Error::flow_control(format!(
                        "initial window change overflows stream {}",
                        stream.id
                    ))
                })?;
        }
        Ok(())
    }
}

impl Default for StreamTable {
    fn default() -> Self {
        StreamTable::new()
    }
}
