//! Packet protocol between a master controller and segment motor-controller
//! boards.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP stream and UDP datagram endpoints
//! - [`frame`]: checksum, layout registry, encoder, decoder and stream reassembly
//! - [`link`]: master and board connections (behind `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use segwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use segwire_frame::*;
}

/// Re-export link types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use segwire_link::*;
}
