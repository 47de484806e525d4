use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SegmentStream;

/// TCP listener for the stream transport.
///
/// Boards listen; the master connects. The mock board in the CLI uses this
/// side as well.
pub struct StreamListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl StreamListener {
    /// Bind and listen on `addr`. Port 0 picks an ephemeral port.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(%addr, "listening on stream transport");

        Ok(Self { listener, addr })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<SegmentStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(SegmentStream::from_tcp(stream))
    }

    /// Connect to a listening board (blocking).
    pub fn connect(addr: SocketAddr) -> Result<SegmentStream> {
        let stream =
            TcpStream::connect(addr).map_err(|source| TransportError::Connect { addr, source })?;
        debug!(%addr, "connected to stream transport");
        Ok(SegmentStream::from_tcp(stream))
    }

    /// Connect with an upper bound on the connection attempt.
    pub fn connect_timeout(addr: SocketAddr, timeout: Duration) -> Result<SegmentStream> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|source| TransportError::Connect { addr, source })?;
        debug!(%addr, ?timeout, "connected to stream transport");
        Ok(SegmentStream::from_tcp(stream))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp-stream"
    }
}
