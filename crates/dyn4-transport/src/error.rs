/// Errors that can occur on the drive link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link accepted fewer bytes than were handed to it.
    #[error("truncated write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },
}

impl From<serialport::Error> for TransportError {
    fn from(err: serialport::Error) -> Self {
        TransportError::Io(err.into())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
