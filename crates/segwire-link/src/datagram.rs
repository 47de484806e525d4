use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use segwire_frame::{codec, Command, CommandType, SegmentId};
use segwire_transport::{DatagramSocket, TransportError};
use tracing::{info, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// Send a command as a single datagram.
///
/// Only EMERGENCY_STOP travels over UDP; anything else is refused before
/// a socket is opened.
pub fn send_command_datagram(target: SocketAddr, command: &Command) -> Result<()> {
    if command.command_type() != CommandType::EmergencyStop {
        return Err(LinkError::DatagramNotAllowed(command.command_type()));
    }
    let frame = codec::encode_command(command)?;
    let socket = DatagramSocket::ephemeral_for(target)?;
    socket.send_to(&frame, target)?;
    info!(%target, segment = %command.segment, "sent emergency stop datagram");
    Ok(())
}

/// Send EMERGENCY_STOP over UDP to one board.
pub fn send_emergency_stop(
    target: SocketAddr,
    segment: impl Into<SegmentId>,
    reason: u8,
) -> Result<()> {
    send_command_datagram(target, &Command::emergency_stop(segment, reason))
}

/// Board-side receiver for commands arriving on the datagram port.
#[derive(Debug)]
pub struct CommandDatagram {
    socket: DatagramSocket,
    read_timeout: Option<Duration>,
}

impl CommandDatagram {
    /// Bind on `ip` at the configured datagram port.
    pub fn bind(ip: IpAddr, config: &LinkConfig) -> Result<Self> {
        Self::bind_addr(config.datagram_addr(ip), config)
    }

    pub fn bind_addr(addr: SocketAddr, config: &LinkConfig) -> Result<Self> {
        let socket = DatagramSocket::bind_with_max(addr, config.max_datagram)?;
        socket.set_read_timeout(config.frame.read_timeout)?;
        Ok(Self {
            socket,
            read_timeout: config.frame.read_timeout,
        })
    }

    /// Receive and decode one command datagram.
    ///
    /// A datagram holds exactly one frame; anything else fails decoding.
    pub fn recv(&self) -> Result<(Command, SocketAddr)> {
        let (datagram, from) = match self.socket.recv_from() {
            Ok(received) => received,
            Err(TransportError::Io(io))
                if matches!(
                    io.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Err(LinkError::Timeout(self.read_timeout.unwrap_or_default()));
            }
            Err(err) => return Err(err.into()),
        };
        match codec::decode_command(&datagram) {
            Ok(command) => Ok((command, from)),
            Err(err) => {
                warn!(%from, len = datagram.len(), error = %err, "rejected datagram");
                Err(err.into())
            }
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use segwire_frame::{FrameError, OperatingMode};

    use super::*;

    fn loopback_receiver() -> CommandDatagram {
        let cfg = LinkConfig::default().with_read_timeout(Some(Duration::from_secs(5)));
        CommandDatagram::bind_addr("127.0.0.1:0".parse().unwrap(), &cfg)
            .expect("datagram receiver should bind")
    }

    #[test]
    fn emergency_stop_over_datagram() {
        let receiver = loopback_receiver();
        send_emergency_stop(receiver.local_addr(), SegmentId::BROADCAST, 0x01)
            .expect("datagram should send");

        let (command, _from) = receiver.recv().expect("datagram should arrive");
        assert_eq!(command, Command::broadcast_stop(0x01));
    }

    #[test]
    fn other_commands_refused() {
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let err = send_command_datagram(target, &Command::set_mode(1, OperatingMode::Idle))
            .unwrap_err();
        assert!(matches!(
            err,
            LinkError::DatagramNotAllowed(CommandType::SetMode)
        ));
    }

    #[test]
    fn corrupted_datagram_rejected() {
        let receiver = loopback_receiver();
        let mut frame = codec::encode_command(&Command::emergency_stop(2, 0))
            .unwrap()
            .to_vec();
        frame[4] ^= 0xFF;
        let sender = DatagramSocket::ephemeral_for(receiver.local_addr()).unwrap();
        sender.send_to(&frame, receiver.local_addr()).unwrap();

        let err = receiver.recv().unwrap_err();
        assert!(matches!(
            err,
            LinkError::Frame(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn recv_times_out() {
        let cfg = LinkConfig::default().with_read_timeout(Some(Duration::from_millis(20)));
        let receiver = CommandDatagram::bind_addr("127.0.0.1:0".parse().unwrap(), &cfg).unwrap();
        assert!(receiver.recv().unwrap_err().is_timeout());
    }
}
