//! Command/response session for DMM DYN4 servo drives.
//!
//! This is the "just works" layer. Open a [`DriveSession`] over any
//! [`dyn4_transport::DriveLink`], ask for a parameter, get a typed value
//! back. Request framing, reply matching and retries happen underneath.

pub mod decode;
pub mod error;
pub mod measure;
pub mod session;
pub mod stats;
pub mod value;

pub use decode::{decode_response, sign_extended, Response};
pub use error::{DriveError, Result, UnrecognizedKind};
pub use measure::{
    rpm_from_counts, TorqueReport, DEFAULT_SPEED_INTERVAL, DEFAULT_TORQUE_WINDOW,
    ENCODER_COUNTS_PER_REV,
};
pub use session::{DriveSession, Parameter, SessionConfig, DEFAULT_MAX_ATTEMPTS, MAX_DRIVE_ID};
pub use stats::Summary;
pub use value::{
    Alarm, DecodedValue, DriveConfig, DriveStatus, InputMode, Positioning, ServoMode,
};
