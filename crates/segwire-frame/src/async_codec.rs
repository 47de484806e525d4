//! Tokio codec for framed async streams.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec;
use crate::error::FrameError;
use crate::packet::Packet;
use crate::packet_type::Direction;
use crate::reassembler::{split_frame, truncated, ReassemblyState};

/// Decodes frames travelling in one direction and encodes any packet.
#[derive(Debug)]
pub struct SegmentCodec {
    direction: Direction,
    state: ReassemblyState,
}

impl SegmentCodec {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            state: ReassemblyState::AwaitingHeader,
        }
    }

    /// Codec for the board side: decodes commands.
    pub fn board() -> Self {
        Self::new(Direction::MasterToBoard)
    }

    /// Codec for the master side: decodes feedback.
    pub fn master() -> Self {
        Self::new(Direction::BoardToMaster)
    }
}

impl Decoder for SegmentCodec {
    type Item = Packet;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, FrameError> {
        match split_frame(&mut self.state, src, self.direction)? {
            Some(frame) => codec::decode(&frame, self.direction).map(Some),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, FrameError> {
        if let Some(packet) = self.decode(src)? {
            return Ok(Some(packet));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let err = truncated(self.state, src.len());
        src.clear();
        self.state = ReassemblyState::AwaitingHeader;
        Err(err)
    }
}

impl Encoder<Packet> for SegmentCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), FrameError> {
        codec::encode(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::packet::{Command, Diagnostics, Feedback, MotorState, OperatingMode};

    #[tokio::test]
    async fn framed_roundtrip_over_duplex() {
        let (client, server) = tokio::io::duplex(64);
        let mut sink = FramedWrite::new(client, SegmentCodec::board());
        let mut stream = FramedRead::new(server, SegmentCodec::board());

        let commands = [
            Command::set_mode(2, OperatingMode::Operation),
            Command::broadcast_stop(0x03),
        ];
        let writer = tokio::spawn(async move {
            for c in commands {
                sink.send(Packet::Command(c)).await.unwrap();
            }
        });

        for expected in commands {
            let got = stream.next().await.unwrap().unwrap();
            assert_eq!(got, Packet::Command(expected));
        }
        writer.await.unwrap();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn eof_mid_frame_is_truncated() {
        let frame =
            codec::encode_feedback(&Feedback::diagnostics(1, 0, Diagnostics::default())).unwrap();
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(&frame[..12]).await.unwrap();
        drop(client);

        let mut stream = FramedRead::new(server, SegmentCodec::master());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            FrameError::TruncatedFrame {
                buffered: 12,
                expected: Some(26)
            }
        ));
    }

    #[test]
    fn decoder_waits_for_full_frame() {
        let frame =
            codec::encode_feedback(&Feedback::motor_state(4, 9, MotorState::default())).unwrap();
        let mut codec = SegmentCodec::master();
        let mut buf = BytesMut::from(&frame[..50]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&frame[50..]);
        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.segment().get(), 4);
        assert!(buf.is_empty());
    }
}
