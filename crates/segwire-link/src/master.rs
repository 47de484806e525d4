use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use segwire_frame::{
    codec, Command, Direction, Feedback, FrameReader, FrameWriter, OperatingMode, SegmentId,
};
use segwire_transport::{SegmentStream, StreamListener};
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::datagram::send_emergency_stop;
use crate::error::{from_read_error, Result};

/// Master-side connection to one segment board.
///
/// Commands go out on the stream, feedback comes back on it, and
/// emergency stops can additionally be fired over UDP.
pub struct BoardLink {
    reader: FrameReader<SegmentStream>,
    writer: FrameWriter<SegmentStream>,
    peer: SocketAddr,
    datagram_target: SocketAddr,
    config: LinkConfig,
}

impl BoardLink {
    /// Connect to the board at `ip` using the configured ports.
    pub fn connect(ip: IpAddr, config: LinkConfig) -> Result<Self> {
        let stream_addr = config.stream_addr(ip);
        let datagram_target = config.datagram_addr(ip);
        Self::connect_addrs(stream_addr, datagram_target, config)
    }

    /// Connect with explicit stream and datagram endpoints.
    pub fn connect_addrs(
        stream_addr: SocketAddr,
        datagram_target: SocketAddr,
        config: LinkConfig,
    ) -> Result<Self> {
        let stream = StreamListener::connect_timeout(stream_addr, config.connect_timeout)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let reader_stream = stream.try_clone()?;

        let reader = FrameReader::with_config_stream(
            reader_stream,
            Direction::BoardToMaster,
            config.frame.clone(),
        )?;
        let writer = FrameWriter::with_config_stream(stream, config.frame.clone())?;

        info!(%peer, "connected to board");
        Ok(Self {
            reader,
            writer,
            peer,
            datagram_target,
            config,
        })
    }

    /// Encode and send a command over the stream.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.writer.send_command(command)?;
        debug!(packet = %command.kind(), segment = %command.segment, "sent command");
        Ok(())
    }

    /// Block for the next feedback frame.
    pub fn recv(&mut self) -> Result<Feedback> {
        self.recv_frame().map(|(feedback, _)| feedback)
    }

    /// Block for the next feedback frame, keeping its wire bytes.
    pub fn recv_frame(&mut self) -> Result<(Feedback, Bytes)> {
        let timeout = self.config.frame.read_timeout;
        let frame = self
            .reader
            .read_frame()
            .map_err(|err| from_read_error(err, timeout, self.peer))?;
        let feedback = codec::decode_feedback(&frame)?;
        Ok((feedback, frame))
    }

    pub fn emergency_stop(&mut self, segment: impl Into<SegmentId>, reason: u8) -> Result<()> {
        self.send(&Command::emergency_stop(segment, reason))
    }

    /// Fire EMERGENCY_STOP at the board's datagram port.
    pub fn emergency_stop_datagram(&self, segment: impl Into<SegmentId>, reason: u8) -> Result<()> {
        send_emergency_stop(self.datagram_target, segment, reason)
    }

    pub fn set_mode(&mut self, segment: impl Into<SegmentId>, mode: OperatingMode) -> Result<()> {
        self.send(&Command::set_mode(segment, mode))
    }

    /// Stream peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn datagram_target(&self) -> SocketAddr {
        self.datagram_target
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Close both halves of the stream.
    pub fn shutdown(&self) -> Result<()> {
        self.writer.get_ref().shutdown()?;
        Ok(())
    }
}

impl std::fmt::Debug for BoardLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardLink")
            .field("peer", &self.peer)
            .field("datagram_target", &self.datagram_target)
            .finish()
    }
}
