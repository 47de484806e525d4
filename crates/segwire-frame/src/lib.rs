//! Fixed-layout frame codec for segment motor-controller boards.
//!
//! Every frame is:
//! - A 2-byte little-endian magic identifying the direction
//!   (`0xAA55` master to board, `0xBB55` board to master)
//! - A 1-byte packet type and a 1-byte segment id
//! - A 4-byte board timestamp (feedback only)
//! - A packed little-endian payload whose layout is fixed per type
//! - A 2-byte little-endian CRC-16/CCITT-FALSE over everything before it
//!
//! Frame length is implied by the type, so TCP streams are split with a
//! [`StreamReassembler`] and UDP datagrams carry exactly one frame.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod packet;
pub mod packet_type;
pub mod reader;
pub mod reassembler;
pub mod schema;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::SegmentCodec;
pub use codec::{
    decode, decode_command, decode_feedback, encode, encode_command, encode_feedback, FrameConfig,
    DEFAULT_MAX_BUFFERED, DEFAULT_READ_CHUNK,
};
pub use error::{FrameError, Result};
pub use packet::{
    Command, CommandBody, Coefficients, Diagnostics, ErrorCode, Feedback, FeedbackBody,
    HomingMode, Jog, JogUnit, MotorSample, MotorState, OperatingMode, Orientation, Packet,
    SegmentId, StatusFlags, Trajectory, MOTOR_COUNT,
};
pub use packet_type::{
    CommandType, Direction, FeedbackType, PacketKind, BROADCAST_SEGMENT, MAGIC_BOARD_TO_MASTER,
    MAGIC_MASTER_TO_BOARD,
};
pub use reader::FrameReader;
pub use reassembler::{ReassemblyState, StreamReassembler};
pub use schema::{lookup, Schema};
pub use writer::FrameWriter;
