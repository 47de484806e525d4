use crate::packet_type::{Direction, PacketKind};

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not start with the magic header of its direction.
    #[error("invalid frame magic (expected {expected:#06x}, found {found:#06x})")]
    BadMagic { expected: u16, found: u16 },

    /// The type id has no registered layout for the direction.
    #[error("unknown packet type {type_id:#04x} for {direction}")]
    UnknownPacketType { direction: Direction, type_id: u8 },

    /// The buffer is too short to carry a packet type byte.
    #[error("frame too short ({len} bytes)")]
    TooShort { len: usize },

    /// The buffer length differs from the registered frame length.
    #[error("{packet} frame length mismatch (expected {expected} bytes, got {actual})")]
    LengthMismatch {
        packet: PacketKind,
        expected: usize,
        actual: usize,
    },

    /// The trailing checksum does not match the frame content.
    #[error("{packet} checksum mismatch (stored {stored:#06x}, computed {computed:#06x})")]
    ChecksumMismatch {
        packet: PacketKind,
        stored: u16,
        computed: u16,
    },

    /// A checksum-valid frame carries a field value outside its domain.
    #[error("{packet} field `{field}` has invalid value {value:#04x}")]
    MalformedPacket {
        packet: PacketKind,
        field: &'static str,
        value: u8,
    },

    /// A command value was rejected before encoding.
    #[error("malformed {packet} command: {reason}")]
    MalformedCommand { packet: PacketKind, reason: String },

    /// The stream ended in the middle of a frame.
    #[error("stream ended mid-frame ({buffered} bytes buffered)")]
    TruncatedFrame {
        buffered: usize,
        expected: Option<usize>,
    },

    /// More bytes arrived than the reassembler may hold.
    #[error("reassembly buffer full ({size} bytes, max {max})")]
    BufferOverflow { size: usize, max: usize },

    /// Packet fields disagree with the registered layout.
    #[error("{packet} fields do not match registered layout at `{field}`")]
    LayoutMismatch {
        packet: PacketKind,
        field: &'static str,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    pub(crate) fn malformed_command(packet: PacketKind, reason: impl Into<String>) -> Self {
        FrameError::MalformedCommand {
            packet,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
