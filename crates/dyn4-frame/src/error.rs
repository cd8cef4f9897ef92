use std::time::Duration;

use dyn4_transport::TransportError;

/// Errors that can occur while encoding, reading or validating frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A request was built with no payload values.
    #[error("frame payload must carry at least one value")]
    EmptyPayload,

    /// The payload does not fit the 2-bit length code.
    #[error("payload too large ({size} values, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// No complete frame arrived within the read timeout.
    #[error("no complete frame within {0:?}")]
    Timeout(Duration),

    /// The trailing checksum byte does not match the frame contents.
    #[error("checksum mismatch (computed 0x{computed:02x}, received 0x{received:02x})")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// The bytes do not form a well-shaped frame.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// The function identifier is not legal for a general read.
    #[error("unknown function identifier 0x{0:02x}")]
    UnknownFunctionId(u8),

    /// The underlying link failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
