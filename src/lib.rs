//! h2wire, a server-side HTTP/2 protocol engine.
//!
//! Implements HPACK header compression (RFC 7541) and HTTP/2 framing and
//! stream management (RFC 7540) over a caller-supplied byte transport. The
//! engine decodes frames, maintains connection and stream state, and hands
//! decoded requests to a [`connection::RequestSink`] implemented by the
//! HTTP model above it.
//!
//! # Layout
//!
//! - [`hpack`]: the HPACK codec (integers, Huffman, tables, blocks)
//! - [`frames`] and [`codec`]: typed frames and their wire marshalling
//! - [`settings`]: the SETTINGS registry and h2c upgrade decode
//! - [`stream`], [`flow_control`], [`priority`]: per-stream protocol state
//! - [`transport`]: the byte-stream capability and a TCP adapter
//! - [`connection`]: preface handshake and the frame dispatch loop
//!
//! # Example
//!
//! ```no_run
//! use h2wire::connection::{ConnectionBuilder, RequestSink};
//! use h2wire::error::Result;
//! use h2wire::hpack::HeaderField;
//! use h2wire::settings::SettingsBuilder;
//! use h2wire::transport::{bind_listener, TcpTransport};
//! use bytes::Bytes;
//!
//! struct Responder;
//!
//! impl RequestSink for Responder {
//!     fn on_headers(&mut self, id: u32, _h: Vec<HeaderField>, _end: bool) -> Result<()> {
//!         println!("request on stream {id}");
//!         Ok(())
//!     }
//!     fn on_data(&mut self, _id: u32, _data: Bytes, _end: bool) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let listener = bind_listener("127.0.0.1:8080".parse().unwrap())?;
//!     let settings = SettingsBuilder::new().max_concurrent_streams(128).build()?;
//!     let (socket, _) = listener.accept()?;
//!     let transport = TcpTransport::new(socket)?;
//!     let mut conn = ConnectionBuilder::new().settings(settings).build(transport);
//!     conn.accept()?;
//!     conn.serve(&mut Responder)
//! }
//! ```

pub mod base64url;
pub mod codec;
pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frames;
pub mod hpack;
pub mod priority;
pub mod settings;
pub mod stream;
pub mod transport;

pub use connection::{Connection, ConnectionBuilder, RequestSink, CONNECTION_PREFACE};
pub use error::{Error, ErrorCode, Result};
pub use frames::{FrameFlags, FrameType};
pub use hpack::{HeaderField, Indexing};
pub use settings::{Settings, SettingsBuilder};
pub use transport::{negotiate_alpn, TcpTransport, Transport};
