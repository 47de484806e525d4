//! Connection management for master and segment-board links.
//!
//! The master holds a [`BoardLink`] per board: commands out and feedback
//! in over TCP, with emergency stops optionally fired over UDP. A board
//! accepts the master through a [`BoardListener`], receives emergency stops
//! on a [`CommandDatagram`] and tracks its reaction in [`BoardState`].

pub mod board;
pub mod config;
pub mod datagram;
pub mod error;
pub mod master;
pub mod state;

pub use board::{BoardListener, MasterLink};
pub use config::{LinkConfig, DEFAULT_CONNECT_TIMEOUT};
pub use datagram::{send_command_datagram, send_emergency_stop, CommandDatagram};
pub use error::{LinkError, Result};
pub use master::BoardLink;
pub use state::{BoardState, Disposition};
