//! Byte-transport capability and the TCP adapter.
//!
//! The protocol engine only ever needs three operations from whatever
//! carries its bytes: read, write, close. TLS, proxies, and in-memory test
//! pipes all fit behind [`Transport`]; the engine composes over it instead
//! of wrapping a socket type.

use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use tracing::debug;

/// The ALPN protocol id for HTTP/2 over TLS.
pub const ALPN_H2: &[u8] = b"h2";
/// Fallback protocol when the peer does not offer h2.
pub const ALPN_HTTP11: &[u8] = b"http/1.1";

/// Minimal byte-stream capability the connection engine runs on.
///
/// `read` blocks until at least one octet is available and returns 0 only
/// at end of stream.
pub trait Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;

    /// Fill `buf` completely, failing with `UnexpectedEof` if the peer
    /// closes mid-read.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transport closed mid-frame",
                    ))
                }
                n => filled += n,
            }
        }
        Ok(())
    }
}

/// Select the application protocol for a TLS handshake: `h2` when offered,
/// otherwise `http/1.1`. The caller passes the client's offered list in
/// preference order and owns the outcome.
pub fn negotiate_alpn(offered: &[&[u8]]) -> &'static [u8] {
    if offered.iter().any(|p| *p == ALPN_H2) {
        ALPN_H2
    } else {
        ALPN_HTTP11
    }
}

/// Cleartext TCP transport.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wrap an accepted stream, disabling Nagle so frames go out promptly.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(TcpTransport { stream })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        debug!("closing tcp transport");
        self.stream.shutdown(std::net::Shutdown::Both)
    }
}

/// Bind a listener with address reuse and a deep accept backlog, tuned the
/// same way for every platform via socket2.
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = Domain::for_address(addr);
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    debug!(%addr, "listener bound");
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_alpn_prefers_h2() {
        assert_eq!(negotiate_alpn(&[b"http/1.1", b"h2"]), ALPN_H2);
        assert_eq!(negotiate_alpn(&[b"h2"]), ALPN_H2);
    }

    #[test]
    fn test_alpn_falls_back() {
        assert_eq!(negotiate_alpn(&[b"http/1.1"]), ALPN_HTTP11);
        assert_eq!(negotiate_alpn(&[]), ALPN_HTTP11);
        assert_eq!(negotiate_alpn(&[b"spdy/3"]), ALPN_HTTP11);
    }

    #[test]
    fn test_read_exact_over_loopback() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let writer = thread::spawn(move || {
            let mut peer = TcpStream::connect(addr).unwrap();
            // Two writes; read_exact must stitch them together
            peer.write_all(b"hel").unwrap();
            peer.write_all(b"lo").unwrap();
        });

        let (accepted, _) = listener.accept().unwrap();
        let mut transport = TcpTransport::new(accepted).unwrap();
        let mut buf = [0u8; 5];
        transport.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        writer.join().unwrap();
    }

    #[test]
    fn test_read_exact_reports_early_close() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let writer = thread::spawn(move || {
            let mut peer = TcpStream::connect(addr).unwrap();
            peer.write_all(b"ab").unwrap();
        });

        let (accepted, _) = listener.accept().unwrap();
        let mut transport = TcpTransport::new(accepted).unwrap();
        let mut buf = [0u8; 10];
        let err = transport.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        writer.join().unwrap();
    }
}
