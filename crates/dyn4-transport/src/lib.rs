//! Byte-oriented link abstraction for DMM DYN4 servo drives.
//!
//! The drive talks over a plain serial line. Everything above this crate sees
//! the line through the [`DriveLink`] trait:
//! - [`SerialLink`] drives a real serial port
//! - [`MockLink`] replays scripted bytes for tests
//!
//! This is the lowest layer. Framing lives in `dyn4-frame`.

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use mock::{MockLink, ReadEvent};
pub use serial::{LinkConfig, SerialLink, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use traits::DriveLink;
