//! Stream reassembly for TCP byte streams.
//!
//! A stream carries frames back to back with no delimiter. The type byte at
//! offset 2 selects the registered layout, and that layout's fixed length
//! tells the reassembler how many bytes make up the frame.
//!
//! - `AwaitingHeader`: need [`PROBE_LEN`] bytes to read the type id
//! - `AwaitingBody`: layout known, need `frame_len` bytes in total

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::{self, FrameConfig};
use crate::error::{FrameError, Result};
use crate::packet::Packet;
use crate::packet_type::{Direction, PacketKind, PROBE_LEN, TYPE_OFFSET};
use crate::schema;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Parsing state of a [`StreamReassembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyState {
    /// Waiting for enough bytes to read the type id.
    AwaitingHeader,
    /// Type id resolved, waiting for the rest of the frame.
    AwaitingBody { packet: PacketKind, frame_len: usize },
}

/// Pull the next complete frame out of `buf`, advancing `state`.
///
/// An unregistered type id leaves no way to find the next frame boundary,
/// so the whole buffer is discarded and the state resets.
pub(crate) fn split_frame(
    state: &mut ReassemblyState,
    buf: &mut BytesMut,
    direction: Direction,
) -> Result<Option<Bytes>> {
    loop {
        match *state {
            ReassemblyState::AwaitingHeader => {
                if buf.len() < PROBE_LEN {
                    return Ok(None);
                }
                match schema::lookup(direction, buf[TYPE_OFFSET]) {
                    Ok(schema) => {
                        *state = ReassemblyState::AwaitingBody {
                            packet: schema.kind,
                            frame_len: schema.frame_len,
                        };
                    }
                    Err(err) => {
                        warn!(
                            %direction,
                            discarded = buf.len(),
                            "unknown packet type in stream, dropping buffered bytes"
                        );
                        buf.clear();
                        return Err(err);
                    }
                }
            }
            ReassemblyState::AwaitingBody { frame_len, .. } => {
                if buf.len() < frame_len {
                    return Ok(None);
                }
                *state = ReassemblyState::AwaitingHeader;
                return Ok(Some(buf.split_to(frame_len).freeze()));
            }
        }
    }
}

/// Reject a buffer that grew past `max` bytes.
fn check_capacity(buffered: usize, max: usize) -> Result<()> {
    if buffered > max {
        return Err(FrameError::BufferOverflow {
            size: buffered,
            max,
        });
    }
    Ok(())
}

/// Error for a stream that ended with a partial frame buffered.
pub(crate) fn truncated(state: ReassemblyState, buffered: usize) -> FrameError {
    let expected = match state {
        ReassemblyState::AwaitingHeader => None,
        ReassemblyState::AwaitingBody { frame_len, .. } => Some(frame_len),
    };
    FrameError::TruncatedFrame { buffered, expected }
}

/// Accumulates arbitrary chunks and yields whole frames in arrival order.
#[derive(Debug)]
pub struct StreamReassembler {
    buf: BytesMut,
    state: ReassemblyState,
    direction: Direction,
    max_buffered: usize,
}

impl StreamReassembler {
    pub fn new(direction: Direction) -> Self {
        Self::with_config(direction, &FrameConfig::default())
    }

    /// Create a reassembler bounded by `config.max_buffered`.
    pub fn with_config(direction: Direction, config: &FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: ReassemblyState::AwaitingHeader,
            direction,
            max_buffered: config.max_buffered.max(schema::max_frame_len()),
        }
    }

    /// Append received bytes.
    ///
    /// Fails with `BufferOverflow` and drops everything buffered when the
    /// accumulator would exceed its limit; drain frames between pushes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        if let Err(err) = check_capacity(self.buf.len() + chunk.len(), self.max_buffered) {
            warn!(
                direction = %self.direction,
                buffered = self.buf.len(),
                incoming = chunk.len(),
                "reassembly buffer full, dropping buffered bytes"
            );
            self.reset();
            return Err(err);
        }
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    /// Next complete raw frame, or `None` until more bytes arrive.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        split_frame(&mut self.state, &mut self.buf, self.direction)
    }

    /// Next complete frame, decoded.
    ///
    /// A frame that fails magic or checksum validation is consumed and
    /// reported; the bytes after it stay buffered.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        let Some(frame) = self.next_frame()? else {
            return Ok(None);
        };
        match codec::decode(&frame, self.direction) {
            Ok(packet) => Ok(Some(packet)),
            Err(err) => {
                debug!(error = %err, len = frame.len(), "discarding invalid frame");
                Err(err)
            }
        }
    }

    /// Signal end of stream. Fails if a partial frame is still buffered.
    pub fn finish(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let err = truncated(self.state, self.buf.len());
        self.reset();
        Err(err)
    }

    pub fn state(&self) -> ReassemblyState {
        self.state
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn max_buffered(&self) -> usize {
        self.max_buffered
    }

    /// Drop buffered bytes and start over.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = ReassemblyState::AwaitingHeader;
    }
}
