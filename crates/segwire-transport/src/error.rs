use std::net::SocketAddr;

/// Errors that can occur in link transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A datagram did not fit the receive buffer and was cut short.
    #[error("datagram truncated (buffer {capacity} bytes)")]
    DatagramTruncated { capacity: usize },

    /// A datagram could not be sent in a single write.
    #[error("short datagram write ({written} of {len} bytes)")]
    ShortDatagram { written: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
