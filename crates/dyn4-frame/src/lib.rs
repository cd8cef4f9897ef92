//! Frame codec for the DMM DYN4 serial protocol.
//!
//! Every frame is a short run of bytes carrying seven data bits each:
//! - byte 0: drive address, high bit clear (the only start-of-frame marker)
//! - byte 1: function identifier plus a 2-bit length code, high bit set
//! - 1 to 4 payload bytes, high bit set
//! - a modulo-128 checksum byte, high bit set
//!
//! The reader resynchronises on its own: any byte with the high bit clear
//! starts a new frame.

pub mod codec;
pub mod error;
pub mod function;
pub mod reader;
pub mod writer;

pub use codec::{
    checksum, checksum_ok, encode_frame, frame_len_for_code, hex_bytes, split_7bit, Frame,
    FrameConfig, MAX_FRAME_LEN, MAX_PAYLOAD, MIN_FRAME_LEN,
};
pub use error::{FrameError, Result};
pub use function::{classify_drive_code, verify_func_id, DriveCode, DriveFunction, HostFunction};
pub use reader::FrameReader;
pub use writer::FrameWriter;
