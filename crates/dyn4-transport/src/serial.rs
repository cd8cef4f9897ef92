use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::DriveLink;

/// Line rate the DYN4 ships with.
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// Per-byte read timeout used while waiting on a reply.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Upper bound on bytes discarded by one `flush_input` call.
///
/// A drive that streams continuously would otherwise keep the drain loop
/// spinning forever.
const MAX_DRAIN_BYTES: usize = 4096;

/// Serial line settings.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Baud rate. Default: 38400.
    pub baud_rate: u32,
    /// Initial read timeout. Default: 50 ms.
    pub read_timeout: Duration,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// A [`DriveLink`] over a local serial device (e.g. `/dev/ttyUSB0`).
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
    timeout: Duration,
}

impl SerialLink {
    /// Open `path` with default line settings.
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_config(path, &LinkConfig::default())
    }

    /// Open `path` with explicit line settings.
    ///
    /// Stale input left over from a previous session is drained before
    /// returning.
    pub fn open_with_config(path: &str, config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(path, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;

        info!(port = path, baud = config.baud_rate, "opened serial link");

        let mut link = Self {
            port,
            name: path.to_string(),
            timeout: config.read_timeout,
        };
        link.flush_input()?;
        Ok(link)
    }

    /// Device path this link was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn apply_timeout(&mut self, timeout: Duration) -> Result<()> {
        if self.timeout != timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }
        Ok(())
    }
}

impl DriveLink for SerialLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        loop {
            match self.port.write(bytes) {
                Ok(n) => {
                    self.port.flush()?;
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.apply_timeout(timeout)?;
        loop {
            match self.port.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn flush_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input)?;

        let mut drained = 0usize;
        let mut byte = [0u8; 1];
        while drained < MAX_DRAIN_BYTES {
            if self.read_bytes(&mut byte, DEFAULT_READ_TIMEOUT)? == 0 {
                break;
            }
            drained += 1;
        }
        if drained > 0 {
            debug!(port = %self.name, drained, "discarded stale input");
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
