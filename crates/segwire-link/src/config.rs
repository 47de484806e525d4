use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use segwire_frame::FrameConfig;
use segwire_transport::datagram::DEFAULT_MAX_DATAGRAM;
use segwire_transport::{DEFAULT_DATAGRAM_PORT, DEFAULT_STREAM_PORT};

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Addressing and timing for a board link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// TCP port carrying commands and feedback. Default: 5000.
    pub stream_port: u16,
    /// UDP port accepting emergency stops. Default: 6000.
    pub datagram_port: u16,
    pub connect_timeout: Duration,
    /// Largest datagram accepted. Default: 512 bytes.
    pub max_datagram: usize,
    pub frame: FrameConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            stream_port: DEFAULT_STREAM_PORT,
            datagram_port: DEFAULT_DATAGRAM_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_datagram: DEFAULT_MAX_DATAGRAM,
            frame: FrameConfig::default(),
        }
    }
}

impl LinkConfig {
    pub fn stream_addr(&self, ip: IpAddr) -> SocketAddr {
        SocketAddr::new(ip, self.stream_port)
    }

    pub fn datagram_addr(&self, ip: IpAddr) -> SocketAddr {
        SocketAddr::new(ip, self.datagram_port)
    }

    pub fn with_ports(mut self, stream_port: u16, datagram_port: u16) -> Self {
        self.stream_port = stream_port;
        self.datagram_port = datagram_port;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.frame.read_timeout = timeout;
        self
    }
}
