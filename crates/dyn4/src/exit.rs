use std::fmt;
use std::io;

use dyn4_drive::DriveError;
use dyn4_frame::FrameError;
use dyn4_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Open { source, .. } => match source.kind() {
            serialport::ErrorKind::Io(kind) => io_code(kind),
            _ => TRANSPORT_ERROR,
        },
        TransportError::Io(source) => io_code(source.kind()),
        TransportError::ShortWrite { .. } => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::ChecksumMismatch { .. }
        | FrameError::Malformed(_)
        | FrameError::UnknownFunctionId(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn drive_error(context: &str, err: DriveError) -> CliError {
    match err {
        DriveError::Transport(err) => transport_error(context, err),
        DriveError::Frame(err) => frame_error(context, err),
        DriveError::InvalidDriveId(_)
        | DriveError::UnknownFunctionId(_)
        | DriveError::ValueOutOfRange { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        DriveError::UnexpectedLength { .. }
        | DriveError::Unrecognized { .. }
        | DriveError::UnexpectedValue(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DriveError::UnexpectedFunction { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        DriveError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
