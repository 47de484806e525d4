use std::io::{ErrorKind, Read};

use bytes::Bytes;
use segwire_transport::SegmentStream;

use crate::codec::{self, FrameConfig};
use crate::error::{FrameError, Result};
use crate::packet::{Command, Feedback, Packet};
use crate::packet_type::Direction;
use crate::reassembler::StreamReassembler;
use crate::schema;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally. Callers always get whole frames.
pub struct FrameReader<T> {
    inner: T,
    reassembler: StreamReassembler,
    chunk: Vec<u8>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a frame reader for frames travelling in `direction`.
    pub fn new(inner: T, direction: Direction) -> Self {
        Self::with_config(inner, direction, FrameConfig::default())
    }

    pub fn with_config(inner: T, direction: Direction, config: FrameConfig) -> Self {
        let reassembler = StreamReassembler::with_config(direction, &config);
        // A drained accumulator holds less than one frame, so a chunk of this
        // size can never overflow it.
        let headroom = reassembler.max_buffered() - schema::max_frame_len();
        let chunk_size = config.read_chunk_size.min(headroom).max(1);
        Self {
            inner,
            reassembler,
            chunk: vec![0u8; chunk_size],
            config,
        }
    }

    /// Read the next raw frame (blocking).
    ///
    /// Returns `ConnectionClosed` on EOF at a frame boundary and
    /// `TruncatedFrame` on EOF inside a frame.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.reassembler.next_frame()? {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.reassembler.finish()?;
                return Err(FrameError::ConnectionClosed);
            }

            self.reassembler.push(&self.chunk[..read])?;
        }
    }

    /// Read and decode the next frame (blocking).
    pub fn read_packet(&mut self) -> Result<Packet> {
        let frame = self.read_frame()?;
        codec::decode(&frame, self.reassembler.direction())
    }

    pub fn read_command(&mut self) -> Result<Command> {
        let frame = self.read_frame()?;
        codec::decode_command(&frame)
    }

    pub fn read_feedback(&mut self) -> Result<Feedback> {
        let frame = self.read_frame()?;
        codec::decode_feedback(&frame)
    }

    /// Direction of the frames this reader expects.
    pub fn direction(&self) -> Direction {
        self.reassembler.direction()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<SegmentStream> {
    /// Create a frame reader for a TCP stream and apply the read timeout.
    pub fn with_config_stream(
        inner: SegmentStream,
        direction: Direction,
        config: FrameConfig,
    ) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, direction, config))
    }
}

pub(crate) fn transport_to_frame_error(err: segwire_transport::TransportError) -> FrameError {
    match err {
        segwire_transport::TransportError::Io(io)
        | segwire_transport::TransportError::Accept(io) => FrameError::Io(io),
        segwire_transport::TransportError::Bind { source, .. }
        | segwire_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
