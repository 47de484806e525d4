use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::checksum::{self, CHECKSUM_LEN};
use crate::error::{FrameError, Result};
use crate::packet::{Command, CommandBody, Feedback, FeedbackBody, Packet, SegmentId};
use crate::packet_type::{Direction, PacketKind, PROBE_LEN, TYPE_OFFSET};
use crate::schema::{self, Schema};

const SEGMENT_OFFSET: usize = 3;
const TIMESTAMP_OFFSET: usize = 4;

/// Encode a packet into its wire frame.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────┬───────────┬──────────────────┬──────────┬──────────┐
/// │ Magic (2B) │ Type (1) │ Segment 1 │ Timestamp (4B)   │ Payload  │ CRC (2B) │
/// │ LE         │          │           │ feedback only    │ packed   │ LE       │
/// └────────────┴──────────┴───────────┴──────────────────┴──────────┴──────────┘
/// ```
///
/// Commands are validated before any byte is written. On error `dst` is
/// left as it was.
pub fn encode(packet: &Packet, dst: &mut BytesMut) -> Result<()> {
    if let Packet::Command(command) = packet {
        command.validate()?;
    }

    let schema = schema::schema_for(packet.kind())?;
    let start = dst.len();
    match write_frame(schema, packet, dst) {
        Ok(()) => {
            trace!(packet = %schema.kind, bytes = schema.frame_len, "encoded frame");
            Ok(())
        }
        Err(err) => {
            dst.truncate(start);
            Err(err)
        }
    }
}

fn write_frame(schema: &'static Schema, packet: &Packet, dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    dst.reserve(schema.frame_len);
    dst.put_u16_le(packet.direction().magic());
    dst.put_u8(schema.kind.id());
    dst.put_u8(packet.segment().get());

    let values = match packet {
        Packet::Command(command) => command.body.to_fields(),
        Packet::Feedback(feedback) => {
            dst.put_u32_le(feedback.timestamp);
            feedback.body.to_fields()
        }
    };
    schema::pack(schema, &values, dst)?;

    let crc = checksum::checksum(&dst[start..]);
    dst.put_u16_le(crc);

    let written = dst.len() - start;
    if written != schema.frame_len {
        return Err(FrameError::LengthMismatch {
            packet: schema.kind,
            expected: schema.frame_len,
            actual: written,
        });
    }
    Ok(())
}

/// Encode a command into a standalone frame.
pub fn encode_command(command: &Command) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    encode(&Packet::Command(*command), &mut buf)?;
    Ok(buf.freeze())
}

/// Encode feedback into a standalone frame.
pub fn encode_feedback(feedback: &Feedback) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    encode(&Packet::Feedback(*feedback), &mut buf)?;
    Ok(buf.freeze())
}

/// Decode one complete frame travelling in `direction`.
///
/// Checks run in a fixed order: length probe, type lookup, frame length,
/// magic, checksum, then field domains.
pub fn decode(buf: &[u8], direction: Direction) -> Result<Packet> {
    if buf.len() < PROBE_LEN {
        return Err(FrameError::TooShort { len: buf.len() });
    }

    let schema = schema::lookup(direction, buf[TYPE_OFFSET])?;
    if buf.len() != schema.frame_len {
        return Err(FrameError::LengthMismatch {
            packet: schema.kind,
            expected: schema.frame_len,
            actual: buf.len(),
        });
    }

    let found = u16::from_le_bytes([buf[0], buf[1]]);
    if found != direction.magic() {
        return Err(FrameError::BadMagic {
            expected: direction.magic(),
            found,
        });
    }

    let body_end = buf.len() - CHECKSUM_LEN;
    let stored = u16::from_le_bytes([buf[body_end], buf[body_end + 1]]);
    let computed = checksum::checksum(&buf[..body_end]);
    if stored != computed {
        return Err(FrameError::ChecksumMismatch {
            packet: schema.kind,
            stored,
            computed,
        });
    }

    let segment = SegmentId::new(buf[SEGMENT_OFFSET]);
    let values = schema::unpack(schema, &buf[schema.header_len()..body_end])?;
    let packet = match schema.kind {
        PacketKind::Command(_) => Packet::Command(Command {
            segment,
            body: CommandBody::from_fields(schema, &values)?,
        }),
        PacketKind::Feedback(_) => {
            let ts = &buf[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4];
            Packet::Feedback(Feedback {
                segment,
                timestamp: u32::from_le_bytes([ts[0], ts[1], ts[2], ts[3]]),
                body: FeedbackBody::from_fields(schema, &values)?,
            })
        }
    };

    trace!(packet = %schema.kind, %segment, "decoded frame");
    Ok(packet)
}

/// Decode a master-to-board frame.
pub fn decode_command(buf: &[u8]) -> Result<Command> {
    match decode(buf, Direction::MasterToBoard)? {
        Packet::Command(command) => Ok(command),
        Packet::Feedback(feedback) => Err(FrameError::UnknownPacketType {
            direction: Direction::MasterToBoard,
            type_id: feedback.kind().id(),
        }),
    }
}

/// Decode a board-to-master frame.
pub fn decode_feedback(buf: &[u8]) -> Result<Feedback> {
    match decode(buf, Direction::BoardToMaster)? {
        Packet::Feedback(feedback) => Ok(feedback),
        Packet::Command(command) => Err(FrameError::UnknownPacketType {
            direction: Direction::BoardToMaster,
            type_id: command.kind().id(),
        }),
    }
}

/// Default size of a single blocking read.
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Default cap on bytes a reassembler holds between frames. Default: 64 KiB.
pub const DEFAULT_MAX_BUFFERED: usize = 64 * 1024;

/// Configuration for blocking frame I/O.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
    /// Bytes requested from the stream per read. Default: 1 KiB.
    pub read_chunk_size: usize,
    /// Most bytes a reassembler may hold before it gives up on the stream.
    /// Never below the largest registered frame.
    pub max_buffered: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            read_timeout: None,
            write_timeout: None,
            read_chunk_size: DEFAULT_READ_CHUNK,
            max_buffered: DEFAULT_MAX_BUFFERED,
        }
    }
}

impl FrameConfig {
    pub fn with_read_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}
