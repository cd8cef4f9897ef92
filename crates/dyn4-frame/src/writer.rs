use bytes::BytesMut;
use dyn4_transport::{DriveLink, TransportError};
use tracing::debug;

use crate::codec::{encode_frame, hex_bytes, Frame, FrameConfig, MAX_FRAME_LEN};
use crate::error::Result;

/// Writes complete request frames to a [`DriveLink`].
pub struct FrameWriter<L> {
    inner: L,
    buf: BytesMut,
    config: FrameConfig,
}

impl<L: DriveLink> FrameWriter<L> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: L) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: L, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_LEN),
            config,
        }
    }

    /// Write an already built frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(frame.as_bytes());
        self.flush_buf()
    }

    /// Encode and send a request.
    ///
    /// A truncated write surfaces as [`TransportError::ShortWrite`]; nothing
    /// is retried here.
    pub fn send(&mut self, drive_id: u8, function_id: u8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(drive_id, function_id, payload, &mut self.buf)?;
        self.flush_buf()
    }

    fn flush_buf(&mut self) -> Result<()> {
        if self.config.trace_frames {
            debug!(frame = %hex_bytes(&self.buf), "sending frame");
        }

        let written = self.inner.write_bytes(&self.buf)?;
        if written != self.buf.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: self.buf.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    /// Consume the writer and return the inner link.
    pub fn into_inner(self) -> L {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use dyn4_transport::MockLink;

    use super::*;
    use crate::codec::checksum_ok;
    use crate::error::FrameError;
    use crate::reader::FrameReader;

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(MockLink::new());
        writer.send(0, 0x09, &[0]).unwrap();

        let link = writer.into_inner();
        assert_eq!(link.written(), &[vec![0x00u8, 0x89, 0x80, 0x89]]);
        assert!(checksum_ok(&link.written()[0]));
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(MockLink::new());
        writer.send(1, 0x18, &[0]).unwrap();
        writer.send(1, 0x0e, &[0x1b]).unwrap();

        let link = writer.into_inner();
        assert_eq!(link.written().len(), 2);
        assert_eq!(link.written()[0][1], 0x98);
        assert_eq!(link.written()[1][2], 0x9b);
    }

    #[test]
    fn write_frame_method() {
        let frame = Frame::new(4, 0x07, &[0x2b]).unwrap();
        let mut writer = FrameWriter::new(MockLink::new());
        writer.write_frame(&frame).unwrap();

        assert_eq!(writer.get_ref().written()[0], frame.as_bytes());
    }

    #[test]
    fn short_write_is_transport_error() {
        let mut link = MockLink::new();
        link.cap_writes(3);
        let mut writer = FrameWriter::new(link);

        let err = writer.send(0, 0x09, &[0]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::ShortWrite {
                written: 3,
                expected: 4
            })
        ));
    }

    #[test]
    fn encode_errors_do_not_touch_link() {
        let mut writer = FrameWriter::new(MockLink::new());
        let err = writer.send(0, 0x0a, &[1, 2, 3, 4, 5]).unwrap_err();

        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().written().is_empty());
    }

    #[test]
    fn written_bytes_read_back() {
        let mut writer = FrameWriter::new(MockLink::new());
        writer.send(7, 0x1b, &[0x40, 0, 0, 1]).unwrap();

        let sent = writer.into_inner().written()[0].clone();
        let mut echo = MockLink::new();
        echo.push_bytes(&sent);

        let frame = FrameReader::new(&mut echo).read_frame().unwrap();
        assert_eq!(frame.as_bytes(), sent.as_slice());
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(MockLink::new());

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _ = writer.config();
        let _inner = writer.into_inner();
    }
}
