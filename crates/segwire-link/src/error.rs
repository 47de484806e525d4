/// Errors that can occur on a master or board link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] segwire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] segwire_frame::FrameError),

    /// The remote end closed the connection.
    #[error("link disconnected: {0}")]
    Disconnected(String),

    /// No frame arrived within the configured read timeout.
    #[error("no frame within {0:?}")]
    Timeout(std::time::Duration),

    /// Only EMERGENCY_STOP may travel over the datagram transport.
    #[error("{0} cannot be sent over the datagram transport")]
    DatagramNotAllowed(segwire_frame::CommandType),
}

impl LinkError {
    /// Whether the error only reflects an idle read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Map frame errors from a blocking read into link-level errors.
pub(crate) fn from_read_error(
    err: segwire_frame::FrameError,
    timeout: Option<std::time::Duration>,
    peer: std::net::SocketAddr,
) -> LinkError {
    use segwire_frame::FrameError;
    use std::io::ErrorKind;

    match err {
        FrameError::ConnectionClosed => LinkError::Disconnected(format!("{peer} closed the stream")),
        FrameError::Io(io)
            if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
        {
            LinkError::Timeout(timeout.unwrap_or_default())
        }
        FrameError::Io(io)
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
            ) =>
        {
            LinkError::Disconnected(format!("{peer}: {io}"))
        }
        other => LinkError::Frame(other),
    }
}
