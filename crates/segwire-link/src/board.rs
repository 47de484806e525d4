use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use segwire_frame::{codec, Command, Direction, Feedback, FrameReader, FrameWriter};
use segwire_transport::{SegmentStream, StreamListener};
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{from_read_error, Result};

/// Board-side listener accepting the master's stream connection.
pub struct BoardListener {
    listener: StreamListener,
    config: LinkConfig,
}

impl BoardListener {
    /// Bind on `ip` at the configured stream port.
    pub fn bind(ip: IpAddr, config: LinkConfig) -> Result<Self> {
        Self::bind_addr(config.stream_addr(ip), config)
    }

    pub fn bind_addr(addr: SocketAddr, config: LinkConfig) -> Result<Self> {
        let listener = StreamListener::bind(addr)?;
        Ok(Self { listener, config })
    }

    /// Accept the next master connection.
    pub fn accept(&self) -> Result<MasterLink> {
        let stream = self.listener.accept()?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let reader_stream = stream.try_clone()?;

        let reader = FrameReader::with_config_stream(
            reader_stream,
            Direction::MasterToBoard,
            self.config.frame.clone(),
        )?;
        let writer = FrameWriter::with_config_stream(stream, self.config.frame.clone())?;

        info!(%peer, "master connected");
        Ok(MasterLink {
            reader,
            writer,
            peer,
            read_timeout: self.config.frame.read_timeout,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

/// Board-side view of a connected master.
pub struct MasterLink {
    reader: FrameReader<SegmentStream>,
    writer: FrameWriter<SegmentStream>,
    peer: SocketAddr,
    read_timeout: Option<Duration>,
}

impl MasterLink {
    /// Block for the next command, subject to the read timeout.
    ///
    /// A timeout keeps any partially received frame buffered, so polling
    /// with a short timeout is safe.
    pub fn recv(&mut self) -> Result<Command> {
        self.recv_frame().map(|(command, _)| command)
    }

    /// Like [`MasterLink::recv`], also returning the frame bytes.
    pub fn recv_frame(&mut self) -> Result<(Command, Bytes)> {
        let frame = self
            .reader
            .read_frame()
            .map_err(|err| from_read_error(err, self.read_timeout, self.peer))?;
        let command = codec::decode_command(&frame)?;
        Ok((command, frame))
    }

    pub fn send(&mut self, feedback: &Feedback) -> Result<()> {
        self.writer.send_feedback(feedback)?;
        debug!(packet = %feedback.kind(), timestamp = feedback.timestamp, "sent feedback");
        Ok(())
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.read_timeout = timeout;
        Ok(())
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl std::fmt::Debug for MasterLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterLink").field("peer", &self.peer).finish()
    }
}
