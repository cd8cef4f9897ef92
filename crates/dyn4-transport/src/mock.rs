//! Scripted link for exercising the protocol layers without hardware.
//!
//! ```
//! use std::time::Duration;
//! use dyn4_transport::{DriveLink, MockLink};
//!
//! let mut link = MockLink::new();
//! link.push_bytes(&[0x00, 0x90]);
//! link.push_timeout();
//!
//! let mut byte = [0u8; 1];
//! assert_eq!(link.read_bytes(&mut byte, Duration::ZERO).unwrap(), 1);
//! assert_eq!(byte[0], 0x00);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::DriveLink;

/// One scripted outcome for the read side of a [`MockLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A single byte arriving from the drive.
    Byte(u8),
    /// The read window elapses with nothing on the line.
    Timeout,
    /// The read primitive itself fails.
    Fail(std::io::ErrorKind),
}

/// In-memory [`DriveLink`] that replays a script and records writes.
///
/// Once the script runs dry every read times out, which mirrors a drive
/// that has stopped talking.
#[derive(Debug, Default)]
pub struct MockLink {
    script: VecDeque<ReadEvent>,
    written: Vec<Vec<u8>>,
    write_cap: Option<usize>,
    flushes: usize,
}

impl MockLink {
    /// Create an empty mock link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes, delivered one per read.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.script.extend(bytes.iter().copied().map(ReadEvent::Byte));
        self
    }

    /// Queue one elapsed read window.
    pub fn push_timeout(&mut self) -> &mut Self {
        self.script.push_back(ReadEvent::Timeout);
        self
    }

    /// Queue a failing read.
    pub fn push_failure(&mut self, kind: std::io::ErrorKind) -> &mut Self {
        self.script.push_back(ReadEvent::Fail(kind));
        self
    }

    /// Accept at most `cap` bytes per write, simulating a truncated write.
    pub fn cap_writes(&mut self, cap: usize) -> &mut Self {
        self.write_cap = Some(cap);
        self
    }

    /// Every buffer handed to `write_bytes`, in order.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Number of `flush_input` calls seen.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Scripted read events not consumed yet.
    pub fn pending(&self) -> usize {
        self.script.len()
    }
}

impl DriveLink for MockLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        let accepted = self.write_cap.map_or(bytes.len(), |cap| cap.min(bytes.len()));
        self.written.push(bytes[..accepted].to_vec());
        Ok(accepted)
    }

    fn read_bytes(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut filled = 0usize;
        while filled < buf.len() {
            match self.script.front() {
                Some(ReadEvent::Byte(b)) => {
                    buf[filled] = *b;
                    filled += 1;
                    self.script.pop_front();
                }
                Some(ReadEvent::Timeout) => {
                    // A timeout ends the current read; consume it only if it
                    // is what this read observes.
                    if filled == 0 {
                        self.script.pop_front();
                    }
                    break;
                }
                Some(ReadEvent::Fail(kind)) => {
                    if filled > 0 {
                        break;
                    }
                    let kind = *kind;
                    self.script.pop_front();
                    return Err(TransportError::Io(std::io::Error::from(kind)));
                }
                None => break,
            }
        }
        Ok(filled)
    }

    fn flush_input(&mut self) -> Result<()> {
        self.flushes += 1;
        while let Some(ReadEvent::Byte(_)) = self.script.front() {
            self.script.pop_front();
        }
        Ok(())
    }
}
