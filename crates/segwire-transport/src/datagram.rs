use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Largest datagram the link expects to carry; every registered frame is
/// far smaller.
pub const DEFAULT_MAX_DATAGRAM: usize = 512;

/// UDP endpoint for the datagram transport.
///
/// Each datagram carries exactly one frame, so no reassembly is needed on
/// this path. Loss and reordering are not handled here.
pub struct DatagramSocket {
    socket: UdpSocket,
    addr: SocketAddr,
    max_datagram: usize,
}

impl DatagramSocket {
    /// Bind a datagram endpoint on `addr`. Port 0 picks an ephemeral port.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_max(addr, DEFAULT_MAX_DATAGRAM)
    }

    /// Bind with an explicit maximum datagram size for receives.
    pub fn bind_with_max(addr: SocketAddr, max_datagram: usize) -> Result<Self> {
        let socket =
            UdpSocket::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        let addr = socket
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(%addr, "bound datagram transport");

        Ok(Self {
            socket,
            addr,
            max_datagram,
        })
    }

    /// Bind an ephemeral sender socket of the same address family as `remote`.
    pub fn ephemeral_for(remote: SocketAddr) -> Result<Self> {
        let local = if remote.is_ipv6() {
            SocketAddr::from(([0u16; 8], 0))
        } else {
            SocketAddr::from(([0u8; 4], 0))
        };
        Self::bind(local)
    }

    /// Send one datagram to `target`.
    pub fn send_to(&self, payload: &[u8], target: SocketAddr) -> Result<()> {
        let written = self.socket.send_to(payload, target)?;
        if written != payload.len() {
            return Err(TransportError::ShortDatagram {
                written,
                len: payload.len(),
            });
        }
        debug!(%target, len = payload.len(), "sent datagram");
        Ok(())
    }

    /// Receive one datagram (blocking, subject to the read timeout).
    ///
    /// Datagrams larger than the configured maximum are rejected instead of
    /// being silently cut.
    pub fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; self.max_datagram + 1];
        let (len, from) = self.socket.recv_from(&mut buf)?;
        if len > self.max_datagram {
            return Err(TransportError::DatagramTruncated {
                capacity: self.max_datagram,
            });
        }
        buf.truncate(len);
        debug!(%from, len, "received datagram");
        Ok((buf, from))
    }

    /// Set read timeout for `recv_from`.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Enable sending to broadcast addresses.
    pub fn set_broadcast(&self, broadcast: bool) -> Result<()> {
        self.socket.set_broadcast(broadcast).map_err(Into::into)
    }

    /// The address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "udp-datagram"
    }
}

impl std::fmt::Debug for DatagramSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramSocket")
            .field("addr", &self.addr)
            .field("max_datagram", &self.max_datagram)
            .finish()
    }
}
