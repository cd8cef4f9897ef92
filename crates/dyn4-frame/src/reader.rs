use bytes::{BufMut, BytesMut};
use dyn4_transport::DriveLink;
use tracing::{debug, trace};

use crate::codec::{
    frame_len_for_code, hex_bytes, is_frame_start, length_code_of, Frame, FrameConfig,
    MAX_FRAME_LEN,
};
use crate::error::{FrameError, Result};

/// Reads complete frames from a [`DriveLink`], one byte at a time.
///
/// A byte with the high bit clear always restarts the frame in progress, so
/// line noise costs at most the frame it lands in.
pub struct FrameReader<L> {
    inner: L,
    buf: BytesMut,
    config: FrameConfig,
}

impl<L: DriveLink> FrameReader<L> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: L) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: L, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_LEN),
            config,
        }
    }

    /// Read the next complete, checksum-valid frame (blocking).
    ///
    /// Returns `Err(FrameError::Timeout)` if any single byte read waits
    /// longer than the configured timeout. A partial frame is dropped.
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.buf.clear();
        let mut expected_len = None;

        loop {
            let mut byte = [0u8; 1];
            if self.inner.read_bytes(&mut byte, self.config.read_timeout)? == 0 {
                if !self.buf.is_empty() {
                    debug!(partial = %hex_bytes(&self.buf), "timed out mid-frame");
                }
                return Err(FrameError::Timeout(self.config.read_timeout));
            }
            let byte = byte[0];

            if is_frame_start(byte) {
                if !self.buf.is_empty() {
                    debug!(discarded = %hex_bytes(&self.buf), "frame restarted before completion");
                }
                self.buf.clear();
                expected_len = None;
            } else if self.buf.is_empty() {
                trace!(byte, "skipping continuation byte outside a frame");
                continue;
            }

            self.buf.put_u8(byte);
            if self.buf.len() == 2 {
                expected_len = Some(frame_len_for_code(length_code_of(byte)));
            }

            if expected_len == Some(self.buf.len()) {
                let bytes = self.buf.split().freeze();
                if self.config.trace_frames {
                    debug!(frame = %hex_bytes(&bytes), "received frame");
                }
                return Frame::verified(bytes);
            }
        }
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    /// Consume the reader and return the inner link.
    pub fn into_inner(self) -> L {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
