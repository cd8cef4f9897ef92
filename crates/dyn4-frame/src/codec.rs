use std::fmt::Write as _;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// High bit set on every byte of a frame except the first.
pub const CONTINUATION: u8 = 0x80;

/// Low seven bits of a byte carry data.
pub const DATA_MASK: u8 = 0x7f;

/// Drive addresses and function identifiers are five bits wide.
pub const ID_MASK: u8 = 0x1f;

/// Shortest frame: address, function, one payload byte, checksum.
pub const MIN_FRAME_LEN: usize = 4;

/// Longest frame the 2-bit length code can describe.
pub const MAX_FRAME_LEN: usize = MIN_FRAME_LEN + 3;

/// Maximum number of payload values in one frame.
pub const MAX_PAYLOAD: usize = 4;

const LENGTH_CODE_SHIFT: u8 = 5;
const LENGTH_CODE_MASK: u8 = 0x03;

/// Total frame length announced by a length code.
pub fn frame_len_for_code(length_code: u8) -> usize {
    MIN_FRAME_LEN + usize::from(length_code & LENGTH_CODE_MASK)
}

/// Extract the length code from a frame's function byte.
pub fn length_code_of(function_byte: u8) -> u8 {
    (function_byte >> LENGTH_CODE_SHIFT) & LENGTH_CODE_MASK
}

/// Whether `byte` opens a new frame.
pub fn is_frame_start(byte: u8) -> bool {
    byte & CONTINUATION == 0
}

/// Checksum byte for the given leading bytes of a frame.
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    CONTINUATION | (sum & DATA_MASK)
}

/// Whether the last byte of `frame` is a valid checksum for the rest.
pub fn checksum_ok(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((last, body)) => {
            let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
            (sum ^ last) & DATA_MASK == 0
        }
        None => false,
    }
}

/// A single wire frame, either built for sending or read off the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Build a request frame.
    pub fn new(drive_id: u8, function_id: u8, payload: &[u8]) -> Result<Self> {
        let mut buf = BytesMut::with_capacity(MAX_FRAME_LEN);
        encode_frame(drive_id, function_id, payload, &mut buf)?;
        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Validate raw bytes as a complete frame.
    ///
    /// Checks the start marker, the continuation markers, the announced
    /// length and the checksum, in that order.
    pub fn from_wire(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < MIN_FRAME_LEN {
            return Err(FrameError::Malformed("frame shorter than 4 bytes"));
        }
        if !is_frame_start(bytes[0]) {
            return Err(FrameError::Malformed("first byte has continuation bit set"));
        }
        if bytes[1..].iter().any(|b| is_frame_start(*b)) {
            return Err(FrameError::Malformed("continuation bit missing"));
        }
        if frame_len_for_code(length_code_of(bytes[1])) != bytes.len() {
            return Err(FrameError::Malformed("length code disagrees with frame size"));
        }
        Self::verified(bytes)
    }

    /// Wrap bytes whose shape is already known good, checking the checksum.
    pub(crate) fn verified(bytes: Bytes) -> Result<Self> {
        if !checksum_ok(&bytes) {
            let (received, body) = bytes
                .split_last()
                .map(|(last, body)| (*last, body))
                .unwrap_or((0, &[][..]));
            return Err(FrameError::ChecksumMismatch {
                computed: checksum(body),
                received,
            });
        }
        Ok(Self { bytes })
    }

    /// Address of the drive that sent, or should receive, this frame.
    pub fn drive_id(&self) -> u8 {
        self.bytes[0] & DATA_MASK
    }

    /// Five-bit function identifier.
    pub fn function_id(&self) -> u8 {
        self.bytes[1] & ID_MASK
    }

    /// Two-bit length code from the function byte.
    pub fn length_code(&self) -> u8 {
        length_code_of(self.bytes[1])
    }

    /// Payload bytes between the function byte and the checksum, markers intact.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[2..self.bytes.len() - 1]
    }

    /// Trailing checksum byte.
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// The complete wire encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame length on the wire.
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────────────┬──────────────────┬──────────────┐
/// │ 0 | drive id │ 1 | len | func id │ 1 | value  (x N) │ 1 | checksum │
/// │ b7=0  b4..b0 │ b7  b6b5   b4..b0 │ b7   b6..b0      │ b7   b6..b0  │
/// └──────────────┴───────────────────┴──────────────────┴──────────────┘
/// ```
/// `len` is `N - 1`, and the checksum is the low seven bits of the sum of
/// every preceding byte.
pub fn encode_frame(
    drive_id: u8,
    function_id: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let length_code = (payload.len() - 1) as u8;
    let start = dst.len();
    dst.reserve(MIN_FRAME_LEN + payload.len() - 1);
    dst.put_u8(drive_id & ID_MASK);
    dst.put_u8(CONTINUATION | (length_code << LENGTH_CODE_SHIFT) | (function_id & ID_MASK));
    for value in payload {
        dst.put_u8(CONTINUATION | (value & DATA_MASK));
    }
    let sum = checksum(&dst[start..]);
    dst.put_u8(sum);
    Ok(())
}

/// Split a signed value into `groups` seven-bit groups, most significant first.
///
/// Only the low `7 * groups` bits survive, which is what the drive expects
/// for two's-complement quantities.
pub fn split_7bit(value: i32, groups: usize) -> Vec<u8> {
    (0..groups)
        .rev()
        .map(|i| ((value >> (7 * i)) as u8) & DATA_MASK)
        .collect()
}

/// Render frame bytes the way the drive manual lists them (`00 90 a0 b0`).
pub fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Configuration shared by the frame reader and writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// How long to wait for each byte of a reply. Default: 50 ms.
    pub read_timeout: Duration,
    /// Emit every frame sent or received as a debug event.
    pub trace_frames: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            read_timeout: dyn4_transport::DEFAULT_READ_TIMEOUT,
            trace_frames: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_general_read_request() {
        let mut buf = BytesMut::new();
        encode_frame(0, 0x0e, &[0x1b], &mut buf).unwrap();

        // 0x00 + 0x8e + 0x9b = 0x129 -> low seven bits 0x29
        assert_eq!(buf.as_ref(), &[0x00, 0x8e, 0x9b, 0xa9]);
        assert!(checksum_ok(&buf));
    }

    #[test]
    fn encode_sets_length_code() {
        let mut buf = BytesMut::new();
        encode_frame(3, 0x0a, &[0, 0, 0, 50], &mut buf).unwrap();

        assert_eq!(buf.len(), 7);
        assert_eq!(buf[0], 0x03);
        assert_eq!(buf[1], 0x80 | (3 << 5) | 0x0a);
        assert_eq!(length_code_of(buf[1]), 3);
        assert_eq!(&buf[2..6], &[0x80, 0x80, 0x80, 0x80 | 50]);
        assert!(checksum_ok(&buf));
    }

    #[test]
    fn encode_masks_out_of_range_fields() {
        let mut buf = BytesMut::new();
        encode_frame(0xff, 0xff, &[0xff], &mut buf).unwrap();

        assert_eq!(buf[0], 0x1f);
        assert_eq!(buf[1], 0x9f);
        assert_eq!(buf[2], 0xff);
    }

    #[test]
    fn encode_appends_after_existing_bytes() {
        let mut buf = BytesMut::from(&[0xaa, 0xbb][..]);
        encode_frame(1, 0x19, &[0], &mut buf).unwrap();

        assert_eq!(buf.len(), 6);
        assert!(checksum_ok(&buf[2..]));
    }

    #[test]
    fn encode_rejects_empty_payload() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0, 0x10, &[], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::EmptyPayload));
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0, 0x10, &[1, 2, 3, 4, 5], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 5, max: 4 }));
    }

    #[test]
    fn checksum_relation_holds_for_reply() {
        // Is_MainGain = 0x20 from drive 0
        let frame = [0x00, 0x90, 0xa0, checksum(&[0x00, 0x90, 0xa0])];
        assert!(checksum_ok(&frame));

        let mut corrupt = frame;
        corrupt[2] ^= 0x01;
        assert!(!checksum_ok(&corrupt));
    }

    #[test]
    fn checksum_ok_rejects_empty() {
        assert!(!checksum_ok(&[]));
    }

    #[test]
    fn from_wire_accepts_valid_frame() {
        let frame = Frame::new(5, 0x18, &[1, 2, 3, 4]).unwrap();
        let parsed = Frame::from_wire(frame.as_bytes().to_vec()).unwrap();

        assert_eq!(parsed.drive_id(), 5);
        assert_eq!(parsed.function_id(), 0x18);
        assert_eq!(parsed.length_code(), 3);
        assert_eq!(parsed.payload(), &[0x81, 0x82, 0x83, 0x84]);
        assert_eq!(parsed.wire_size(), 7);
    }

    #[test]
    fn from_wire_rejects_short_frame() {
        let err = Frame::from_wire(vec![0x00, 0x90, 0x90]).unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn from_wire_rejects_missing_start_marker() {
        let err = Frame::from_wire(vec![0x80, 0x90, 0x90, 0xa0]).unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn from_wire_rejects_missing_continuation() {
        let err = Frame::from_wire(vec![0x00, 0x90, 0x10, 0xa0]).unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn from_wire_rejects_length_code_disagreement() {
        // length code 3 announces 7 bytes, only 4 present
        let body = [0x00, 0x80 | (3 << 5) | 0x18, 0x81];
        let mut bytes = body.to_vec();
        bytes.push(checksum(&body));

        let err = Frame::from_wire(bytes).unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn from_wire_reports_checksum_mismatch() {
        let err = Frame::from_wire(vec![0x00, 0x90, 0xa0, 0x80]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChecksumMismatch {
                computed: 0xb0,
                received: 0x80
            }
        ));
    }

    #[test]
    fn split_7bit_orders_groups_msb_first() {
        assert_eq!(split_7bit(50, 4), vec![0, 0, 0, 50]);
        assert_eq!(split_7bit(0x3fff, 2), vec![0x7f, 0x7f]);
        assert_eq!(split_7bit(-1, 4), vec![0x7f, 0x7f, 0x7f, 0x7f]);
        assert_eq!(split_7bit(1 << 21, 4), vec![1, 0, 0, 0]);
    }

    #[test]
    fn hex_bytes_formats_lowercase_pairs() {
        assert_eq!(hex_bytes(&[0x00, 0x90, 0xa0, 0xb0]), "00 90 a0 b0");
        assert_eq!(hex_bytes(&[]), "");
    }

    #[test]
    fn default_config() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.read_timeout, Duration::from_millis(50));
        assert!(!cfg.trace_frames);
    }

    #[test]
    fn frame_len_table() {
        assert_eq!(frame_len_for_code(0), 4);
        assert_eq!(frame_len_for_code(1), 5);
        assert_eq!(frame_len_for_code(2), 6);
        assert_eq!(frame_len_for_code(3), 7);
    }
}
