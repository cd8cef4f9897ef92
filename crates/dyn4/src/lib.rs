//! Host-side control of DMM DYN4 servo drives over RS-232.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte link abstraction (serial port, scripted mock)
//! - [`frame`]: 7-bit continuation-marked frame codec and function tables
//! - [`drive`]: request/response session, value decoding and measurements
//!
//! ```no_run
//! use dyn4::drive::DriveSession;
//! use dyn4::transport::SerialLink;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let link = SerialLink::open("/dev/ttyUSB0")?;
//! let mut drive = DriveSession::new(link, 0)?;
//! let status = drive.read_status()?;
//! println!("in position: {}", status.in_position);
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use dyn4_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use dyn4_frame::*;
}

/// Re-export drive session types.
pub mod drive {
    pub use dyn4_drive::*;
}
