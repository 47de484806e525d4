use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use segwire_transport::SegmentStream;

use crate::codec::{self, FrameConfig};
use crate::error::{FrameError, Result};
use crate::packet::{Command, Feedback, Packet};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 128;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send one packet, then flush.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        self.buf.clear();
        codec::encode(packet, &mut self.buf)?;
        self.write_buffered()?;
        self.flush()
    }

    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        self.send(&Packet::Command(*command))
    }

    pub fn send_feedback(&mut self, feedback: &Feedback) -> Result<()> {
        self.send(&Packet::Feedback(*feedback))
    }

    /// Write an already-encoded frame verbatim.
    pub fn write_raw(&mut self, frame: &[u8]) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(frame);
        self.write_buffered()?;
        self.flush()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<SegmentStream> {
    /// Create a frame writer for a TCP stream and apply the write timeout.
    pub fn with_config_stream(inner: SegmentStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{decode_command, decode_feedback};
    use crate::packet::{Diagnostics, OperatingMode, SegmentId};
    use crate::packet_type::Direction;
    use crate::reader::FrameReader;

    #[test]
    fn write_single_command() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_command(&Command::broadcast_stop(0x01)).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, vec![0x55, 0xAA, 0x02, 0xFF, 0x01, 0x0A, 0xD8]);
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let feedback = Feedback::diagnostics(2, 10, Diagnostics::default());
        writer.send_command(&Command::set_zero_offset(1)).unwrap();
        writer.send_feedback(&feedback).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.len(), 6 + 26);
        assert_eq!(decode_command(&wire[..6]).unwrap(), Command::set_zero_offset(1));
        assert_eq!(decode_feedback(&wire[6..]).unwrap(), feedback);
    }

    #[test]
    fn invalid_command_writes_nothing() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer
            .send_command(&Command::set_zero_offset(SegmentId::BROADCAST))
            .unwrap_err();
        assert!(matches!(err, FrameError::MalformedCommand { .. }));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send_command(&Command::set_zero_offset(1)).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn write_raw_passes_bytes_through() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_raw(&[1, 2, 3]).unwrap();
        assert_eq!(writer.into_inner().into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send_command(&Command::set_zero_offset(1)).unwrap();

        assert_eq!(writer.into_inner().data.len(), 6);
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let writer_impl = WouldBlockWriteThenFlush {
            wrote_once: false,
            flush_would_block: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send_command(&Command::set_zero_offset(1)).unwrap();

        assert_eq!(writer.into_inner().data.len(), 6);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer
            .send_command(&Command::set_zero_offset(1))
            .unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn applies_write_timeout_for_tcp_stream() {
        let listener = segwire_transport::StreamListener::bind("127.0.0.1:0".parse().unwrap())
            .unwrap();
        let addr = listener.local_addr();
        let connector =
            std::thread::spawn(move || segwire_transport::StreamListener::connect(addr).unwrap());
        let stream = listener.accept().unwrap();
        let _client = connector.join().unwrap();

        let cfg = FrameConfig::default().with_write_timeout(std::time::Duration::from_millis(10));
        assert!(FrameWriter::with_config_stream(stream, cfg).is_ok());
    }

    #[test]
    fn written_bytes_read_back() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer
            .send_command(&Command::set_mode(3, OperatingMode::Homing))
            .unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = FrameReader::new(Cursor::new(wire), Direction::MasterToBoard);
        assert_eq!(
            reader.read_command().unwrap(),
            Command::set_mode(3, OperatingMode::Homing)
        );
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct WouldBlockWriteThenFlush {
        wrote_once: bool,
        flush_would_block: bool,
        data: Vec<u8>,
    }

    impl Write for WouldBlockWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_would_block {
                self.flush_would_block = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
