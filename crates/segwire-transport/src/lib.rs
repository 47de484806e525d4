//! Network endpoints for the master/board link.
//!
//! Two transports carry segment controller frames:
//! - a byte stream (TCP) for commands and feedback, which does not preserve
//!   frame boundaries
//! - datagrams (UDP), one frame per datagram, used for low-latency
//!   emergency stops
//!
//! This is the lowest layer of segwire. Framing lives in `segwire-frame`.

pub mod datagram;
pub mod error;
pub mod stream;
pub mod traits;

pub use datagram::DatagramSocket;
pub use error::{Result, TransportError};
pub use stream::StreamListener;
pub use traits::SegmentStream;

/// Default TCP port for command and feedback streams.
pub const DEFAULT_STREAM_PORT: u16 = 5000;

/// Default UDP port for emergency-stop datagrams.
pub const DEFAULT_DATAGRAM_PORT: u16 = 6000;
