use std::time::Duration;

use crate::error::Result;

/// A byte channel to one or more drives sharing a serial line.
///
/// Implementations are blocking. A read that sees no data within `timeout`
/// returns `Ok(0)`; only genuine link failures are errors. Only one request
/// may be in flight at a time, so a link is always used through `&mut`.
pub trait DriveLink {
    /// Write `bytes` to the line, returning how many were accepted.
    ///
    /// Callers treat a count other than `bytes.len()` as a truncated write.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Discard anything the drive sent that has not been read yet.
    fn flush_input(&mut self) -> Result<()>;
}

impl<T: DriveLink + ?Sized> DriveLink for &mut T {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).write_bytes(bytes)
    }

    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_bytes(buf, timeout)
    }

    fn flush_input(&mut self) -> Result<()> {
        (**self).flush_input()
    }
}

impl<T: DriveLink + ?Sized> DriveLink for Box<T> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).write_bytes(bytes)
    }

    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_bytes(buf, timeout)
    }

    fn flush_input(&mut self) -> Result<()> {
        (**self).flush_input()
    }
}
