use std::fmt;

use dyn4_frame::{DriveFunction, FrameError};
use dyn4_transport::TransportError;

/// Why an inbound function identifier could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnrecognizedKind {
    /// 0x00..=0x0a or above 0x1e: the drive must never report these.
    Unallowed,
    /// Inside the reply range, but with no known meaning.
    Unknown,
}

impl fmt::Display for UnrecognizedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnrecognizedKind::Unallowed => f.write_str("unallowed"),
            UnrecognizedKind::Unknown => f.write_str("unknown"),
        }
    }
}

/// Errors that can occur in drive operations.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    /// Link-level failure, including truncated writes.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level failure that is not retried.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Drive addresses are five bits wide.
    #[error("drive id {0} out of range (0..=31)")]
    InvalidDriveId(u8),

    /// The requested function has no reply mapping, or is not a legal
    /// general-read code.
    #[error("unknown function identifier 0x{0:02x}")]
    UnknownFunctionId(u8),

    /// The reply's length code disagrees with the function's fixed width.
    #[error(
        "unexpected length code {received} for function 0x{function_id:02x} (expected {expected})"
    )]
    UnexpectedLength {
        function_id: u8,
        received: u8,
        expected: u8,
    },

    /// The reply carries a function identifier the host cannot decode.
    #[error("{kind} function 0x{function_id:02x} in reply")]
    Unrecognized {
        function_id: u8,
        kind: UnrecognizedKind,
    },

    /// The drive answered, but never with the expected function.
    #[error("no {expected} reply after {attempts} attempts")]
    UnexpectedFunction {
        expected: DriveFunction,
        attempts: u32,
    },

    /// Nothing arrived at all within the retry budget.
    #[error("drive did not answer after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// A decoded reply does not have the shape its function promises.
    #[error("reply for {0} has an unexpected value shape")]
    UnexpectedValue(DriveFunction),

    /// An argument cannot be represented on the wire.
    #[error("{what} out of range: {value}")]
    ValueOutOfRange { what: &'static str, value: i64 },

    /// Statistics were requested over no samples.
    #[error("cannot summarise an empty sample series")]
    EmptySeries,
}

pub type Result<T> = std::result::Result<T, DriveError>;
