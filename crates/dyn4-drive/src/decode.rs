use dyn4_frame::codec::DATA_MASK;
use dyn4_frame::{classify_drive_code, DriveCode, DriveFunction, Frame};
use tracing::warn;

use crate::error::{DriveError, Result, UnrecognizedKind};
use crate::value::{Alarm, DecodedValue, DriveConfig, DriveStatus};

/// A reply frame turned into a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub drive_id: u8,
    pub function: DriveFunction,
    pub value: DecodedValue,
}

/// Decode a checksum-valid reply frame.
///
/// Fixed-width replies must carry their fixed length code, otherwise the
/// frame is rejected with [`DriveError::UnexpectedLength`]. Unallowed and
/// unknown function identifiers never produce a value.
pub fn decode_response(frame: &Frame) -> Result<Response> {
    let function_id = frame.function_id();
    let function = match classify_drive_code(function_id) {
        DriveCode::Known(function) => function,
        DriveCode::Unallowed(code) => {
            return Err(DriveError::Unrecognized {
                function_id: code,
                kind: UnrecognizedKind::Unallowed,
            })
        }
        DriveCode::Unknown(code) => {
            return Err(DriveError::Unrecognized {
                function_id: code,
                kind: UnrecognizedKind::Unknown,
            })
        }
    };

    if let Some(expected) = function.expected_length_code() {
        if frame.length_code() != expected {
            return Err(DriveError::UnexpectedLength {
                function_id,
                received: frame.length_code(),
                expected,
            });
        }
    }

    let payload = frame.payload();
    let value = match function {
        DriveFunction::IsGearNumber => DecodedValue::GearPair(
            join_14bit(payload[0], payload[1]),
            join_14bit(payload[2], payload[3]),
        ),
        DriveFunction::IsStatus => {
            let status = DriveStatus::from_bits(payload[0] & DATA_MASK);
            if let Alarm::Reserved(code) = status.alarm {
                warn!(code, "drive reported an undocumented alarm code");
            }
            DecodedValue::Status(status)
        }
        DriveFunction::IsConfig => {
            DecodedValue::Config(DriveConfig::from_bits(payload[0] & DATA_MASK))
        }
        DriveFunction::IsAbsPos32 | DriveFunction::IsTrqCurrent => {
            DecodedValue::SignedInteger(sign_extended(payload))
        }
        _ => DecodedValue::Scalar7(payload[0] & DATA_MASK),
    };

    Ok(Response {
        drive_id: frame.drive_id(),
        function,
        value,
    })
}

/// Combine 7-bit groups, most significant first, sign-extending from bit 6
/// of the first group.
pub fn sign_extended(payload: &[u8]) -> i32 {
    let mut groups = payload.iter();
    let Some(&first) = groups.next() else {
        return 0;
    };

    // Shifting left drops the continuation bit, the arithmetic shift back
    // copies bit 6 into bit 7.
    let mut value = i32::from(((first << 1) as i8) >> 1);
    for &group in groups {
        value = (value << 7) | i32::from(group & DATA_MASK);
    }
    value
}

fn join_14bit(high: u8, low: u8) -> u16 {
    (u16::from(high & DATA_MASK) << 7) | u16::from(low & DATA_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function_id: u8, payload: &[u8]) -> Frame {
        Frame::new(0, function_id, payload).unwrap()
    }

    #[test]
    fn single_group_sign_extension() {
        assert_eq!(sign_extended(&[0xff]), -1);
        assert_eq!(sign_extended(&[0x80]), 0);
        assert_eq!(sign_extended(&[0xc0]), -64);
        assert_eq!(sign_extended(&[0xbf]), 63);
    }

    #[test]
    fn multi_group_sign_extension() {
        assert_eq!(sign_extended(&[0xff, 0xff]), -1);
        assert_eq!(sign_extended(&[0x80, 0x81]), 1);
        assert_eq!(sign_extended(&[0xc0, 0x80, 0x80, 0x80]), -(1 << 27));
        assert_eq!(sign_extended(&[0xbf, 0xff, 0xff, 0xff]), (1 << 27) - 1);
        assert_eq!(sign_extended(&[]), 0);
    }

    #[test]
    fn trq_current_minus_one() {
        let response = decode_response(&frame(0x1e, &[0x7f])).unwrap();
        assert_eq!(response.function, DriveFunction::IsTrqCurrent);
        assert_eq!(response.value, DecodedValue::SignedInteger(-1));
    }

    #[test]
    fn trq_current_zero() {
        let response = decode_response(&frame(0x1e, &[0x00])).unwrap();
        assert_eq!(response.value, DecodedValue::SignedInteger(0));
    }

    #[test]
    fn abs_pos_takes_any_width() {
        for width in 1..=4usize {
            let payload = vec![0x7f; width];
            let response = decode_response(&frame(0x1b, &payload)).unwrap();
            assert_eq!(response.value, DecodedValue::SignedInteger(-1));
        }
    }

    #[test]
    fn gear_pair() {
        let response = decode_response(&frame(0x18, &[1, 2, 3, 4])).unwrap();
        assert_eq!(response.value, DecodedValue::GearPair(130, 388));
    }

    #[test]
    fn gear_pair_with_wrong_length_is_rejected() {
        let err = decode_response(&frame(0x18, &[1])).unwrap_err();
        assert!(matches!(
            err,
            DriveError::UnexpectedLength {
                function_id: 0x18,
                received: 0,
                expected: 3
            }
        ));
    }

    #[test]
    fn scalar_with_wrong_length_is_rejected() {
        let err = decode_response(&frame(0x10, &[1, 2])).unwrap_err();
        assert!(matches!(err, DriveError::UnexpectedLength { expected: 0, .. }));
    }

    #[test]
    fn scalar_replies() {
        for code in 0x10..=0x17u8 {
            let response = decode_response(&frame(code, &[0x55])).unwrap();
            assert_eq!(response.function.code(), code);
            assert_eq!(response.value, DecodedValue::Scalar7(0x55));
        }
    }

    #[test]
    fn status_reply() {
        let response = decode_response(&frame(0x19, &[0x22])).unwrap();
        let status = response.value.as_status().unwrap();
        assert!(status.in_position);
        assert!(status.motor_free);
        assert!(status.motion_busy);
        assert_eq!(status.alarm, Alarm::None);
    }

    #[test]
    fn reserved_alarm_still_decodes() {
        let response = decode_response(&frame(0x19, &[7 << 2])).unwrap();
        assert_eq!(response.value.as_status().unwrap().alarm, Alarm::Reserved(7));
    }

    #[test]
    fn config_reply() {
        let response = decode_response(&frame(0x1a, &[0x24])).unwrap();
        assert_eq!(response.value, DecodedValue::Config(DriveConfig::default()));
    }

    #[test]
    fn unallowed_codes_never_decode() {
        for code in (0x00..=0x0au8).chain(0x1f..=0x1f) {
            let err = decode_response(&frame(code, &[0])).unwrap_err();
            assert!(matches!(
                err,
                DriveError::Unrecognized {
                    kind: UnrecognizedKind::Unallowed,
                    ..
                }
            ));
        }
    }

    #[test]
    fn unknown_codes_never_decode() {
        for code in [0x0b, 0x0f, 0x1c, 0x1d] {
            let err = decode_response(&frame(code, &[0])).unwrap_err();
            assert!(matches!(
                err,
                DriveError::Unrecognized {
                    kind: UnrecognizedKind::Unknown,
                    ..
                }
            ));
        }
    }

    #[test]
    fn drive_id_is_carried() {
        let frame = Frame::new(17, 0x16, &[17]).unwrap();
        let response = decode_response(&frame).unwrap();
        assert_eq!(response.drive_id, 17);
        assert_eq!(response.value, DecodedValue::Scalar7(17));
    }
}
