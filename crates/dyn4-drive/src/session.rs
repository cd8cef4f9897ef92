use dyn4_frame::codec::DATA_MASK;
use dyn4_frame::{
    split_7bit, verify_func_id, DriveFunction, FrameConfig, FrameError, FrameReader, FrameWriter,
    HostFunction,
};
use dyn4_transport::DriveLink;
use tracing::{debug, warn};

use crate::decode::decode_response;
use crate::error::{DriveError, Result};
use crate::value::{DecodedValue, DriveConfig, DriveStatus};

/// Highest address a drive can be given.
pub const MAX_DRIVE_ID: u8 = 31;

/// Reply attempts per request when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Largest magnitude `Turn_ConstSpeed` can carry (28-bit two's complement).
const SPEED_LIMIT: i32 = 1 << 27;

/// Configuration for a drive session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Frames (or timeouts) to consume while waiting for a matching reply.
    /// Default: 3.
    pub max_attempts: u32,
    /// Per-byte timeout and frame tracing.
    pub frame: FrameConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            frame: FrameConfig::default(),
        }
    }
}

/// Single-byte tuning parameters the host can both read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    MainGain,
    SpeedGain,
    IntGain,
    TrqCons,
    HighSpeed,
    HighAccel,
    PosOnRange,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::MainGain,
        Parameter::SpeedGain,
        Parameter::IntGain,
        Parameter::TrqCons,
        Parameter::HighSpeed,
        Parameter::HighAccel,
        Parameter::PosOnRange,
    ];

    /// Request that writes this parameter.
    pub fn setter(self) -> HostFunction {
        match self {
            Parameter::MainGain => HostFunction::SetMainGain,
            Parameter::SpeedGain => HostFunction::SetSpeedGain,
            Parameter::IntGain => HostFunction::SetIntGain,
            Parameter::TrqCons => HostFunction::SetTrqCons,
            Parameter::HighSpeed => HostFunction::SetHighSpeed,
            Parameter::HighAccel => HostFunction::SetHighAccel,
            Parameter::PosOnRange => HostFunction::SetPosOnRange,
        }
    }

    /// Request that reads this parameter back.
    pub fn getter(self) -> HostFunction {
        match self {
            Parameter::MainGain => HostFunction::ReadMainGain,
            Parameter::SpeedGain => HostFunction::ReadSpeedGain,
            Parameter::IntGain => HostFunction::ReadIntGain,
            Parameter::TrqCons => HostFunction::ReadTrqCons,
            Parameter::HighSpeed => HostFunction::ReadHighSpeed,
            Parameter::HighAccel => HostFunction::ReadHighAccel,
            Parameter::PosOnRange => HostFunction::ReadPosOnRange,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Parameter::MainGain => "main_gain",
            Parameter::SpeedGain => "speed_gain",
            Parameter::IntGain => "int_gain",
            Parameter::TrqCons => "trq_cons",
            Parameter::HighSpeed => "high_speed",
            Parameter::HighAccel => "high_accel",
            Parameter::PosOnRange => "pos_on_range",
        }
    }
}

/// Request/response session with one drive.
///
/// Every request is a single frame; the reply is matched on its function
/// identifier alone. Unrelated frames, corrupted frames and silent read
/// windows each use up one attempt of the budget.
pub struct DriveSession<L> {
    link: L,
    drive_id: u8,
    config: SessionConfig,
}

impl<L: DriveLink> DriveSession<L> {
    /// Open a session with default configuration.
    pub fn new(link: L, drive_id: u8) -> Result<Self> {
        Self::with_config(link, drive_id, SessionConfig::default())
    }

    /// Open a session with explicit configuration.
    pub fn with_config(link: L, drive_id: u8, config: SessionConfig) -> Result<Self> {
        if drive_id > MAX_DRIVE_ID {
            return Err(DriveError::InvalidDriveId(drive_id));
        }
        if config.max_attempts == 0 {
            return Err(DriveError::ValueOutOfRange {
                what: "max_attempts",
                value: 0,
            });
        }
        Ok(Self {
            link,
            drive_id,
            config,
        })
    }

    pub fn drive_id(&self) -> u8 {
        self.drive_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Turn hex tracing of every frame on or off.
    pub fn set_trace_frames(&mut self, enabled: bool) {
        self.config.frame.trace_frames = enabled;
    }

    /// Discard anything the drive sent that nobody asked for.
    pub fn flush(&mut self) -> Result<()> {
        self.link.flush_input()?;
        Ok(())
    }

    /// Send a read request for `function` and return the reply to wait for.
    ///
    /// Fails with [`DriveError::UnknownFunctionId`] when the request has no
    /// reply, i.e. it is not a read.
    pub fn request(&mut self, function: HostFunction) -> Result<DriveFunction> {
        let expected = function
            .reply()
            .ok_or(DriveError::UnknownFunctionId(function.code()))?;
        self.send(function, &[0])?;
        Ok(expected)
    }

    /// Send `General_Read` for a drive-side code and return the reply to
    /// wait for.
    pub fn general_read(&mut self, code: u8) -> Result<DriveFunction> {
        let expected = verify_func_id(code).map_err(|_| DriveError::UnknownFunctionId(code))?;
        self.send(HostFunction::GeneralRead, &[code])?;
        Ok(expected)
    }

    /// Wait for the reply to `expected`.
    ///
    /// Returns [`DriveError::Timeout`] if the line stayed silent for the
    /// whole budget and [`DriveError::UnexpectedFunction`] if frames arrived
    /// but none matched. A matching reply with the wrong length is not
    /// retried.
    pub fn check_response(&mut self, expected: DriveFunction) -> Result<DecodedValue> {
        let attempts = self.config.max_attempts;
        let mut reader = FrameReader::with_config(&mut self.link, self.config.frame.clone());
        let mut frames_seen = 0u32;

        for attempt in 1..=attempts {
            let frame = match reader.read_frame() {
                Ok(frame) => frame,
                Err(FrameError::Timeout(after)) => {
                    debug!(attempt, ?after, expected = %expected, "no reply");
                    continue;
                }
                Err(FrameError::ChecksumMismatch { computed, received }) => {
                    frames_seen += 1;
                    warn!(attempt, computed, received, "dropping corrupted reply");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            frames_seen += 1;

            if frame.function_id() == expected.code() {
                let response = decode_response(&frame)?;
                if response.drive_id != self.drive_id {
                    warn!(
                        from = response.drive_id,
                        session = self.drive_id,
                        "reply carries another drive id"
                    );
                }
                return Ok(response.value);
            }

            match decode_response(&frame) {
                Ok(other) => debug!(
                    attempt,
                    expected = %expected,
                    received = %other.function,
                    "skipping unrelated reply"
                ),
                Err(e) => warn!(attempt, error = %e, "skipping undecodable reply"),
            }
        }

        if frames_seen == 0 {
            Err(DriveError::Timeout { attempts })
        } else {
            Err(DriveError::UnexpectedFunction { expected, attempts })
        }
    }

    /// Request `function` and wait for its reply.
    pub fn read(&mut self, function: HostFunction) -> Result<DecodedValue> {
        let expected = self.request(function)?;
        self.check_response(expected)
    }

    /// Read a drive-side quantity through `General_Read`.
    pub fn read_general(&mut self, function: DriveFunction) -> Result<DecodedValue> {
        let expected = self.general_read(function.code())?;
        self.check_response(expected)
    }

    pub fn read_parameter(&mut self, parameter: Parameter) -> Result<u8> {
        self.read_scalar(parameter.getter())
    }

    pub fn read_main_gain(&mut self) -> Result<u8> {
        self.read_parameter(Parameter::MainGain)
    }

    pub fn read_speed_gain(&mut self) -> Result<u8> {
        self.read_parameter(Parameter::SpeedGain)
    }

    pub fn read_int_gain(&mut self) -> Result<u8> {
        self.read_parameter(Parameter::IntGain)
    }

    pub fn read_trq_cons(&mut self) -> Result<u8> {
        self.read_parameter(Parameter::TrqCons)
    }

    pub fn read_high_speed(&mut self) -> Result<u8> {
        self.read_parameter(Parameter::HighSpeed)
    }

    pub fn read_high_accel(&mut self) -> Result<u8> {
        self.read_parameter(Parameter::HighAccel)
    }

    pub fn read_pos_on_range(&mut self) -> Result<u8> {
        self.read_parameter(Parameter::PosOnRange)
    }

    /// Address the drive reports for itself.
    pub fn read_drive_id(&mut self) -> Result<u8> {
        self.read_scalar(HostFunction::ReadDriveId)
    }

    /// Gear ratio numerator and denominator.
    pub fn read_gear_number(&mut self) -> Result<(u16, u16)> {
        let value = self.read(HostFunction::ReadGearNumber)?;
        value
            .as_gear_pair()
            .ok_or(DriveError::UnexpectedValue(DriveFunction::IsGearNumber))
    }

    pub fn read_status(&mut self) -> Result<DriveStatus> {
        let value = self.read(HostFunction::ReadDriveStatus)?;
        value
            .as_status()
            .ok_or(DriveError::UnexpectedValue(DriveFunction::IsStatus))
    }

    pub fn read_config(&mut self) -> Result<DriveConfig> {
        let value = self.read(HostFunction::ReadDriveConfig)?;
        value
            .as_config()
            .ok_or(DriveError::UnexpectedValue(DriveFunction::IsConfig))
    }

    /// Absolute encoder position in counts.
    pub fn read_abs_pos32(&mut self) -> Result<i32> {
        self.read_signed(DriveFunction::IsAbsPos32)
    }

    /// Instantaneous torque current, signed.
    pub fn read_trq_current(&mut self) -> Result<i32> {
        self.read_signed(DriveFunction::IsTrqCurrent)
    }

    /// Write the configuration byte.
    pub fn set_config(&mut self, config: &DriveConfig) -> Result<()> {
        self.send(HostFunction::SetDriveConfig, &[config.to_bits()])
    }

    /// Spin at a constant speed; the sign selects the direction.
    pub fn set_speed(&mut self, rpm: i32) -> Result<()> {
        if !(-SPEED_LIMIT..SPEED_LIMIT).contains(&rpm) {
            return Err(DriveError::ValueOutOfRange {
                what: "speed",
                value: i64::from(rpm),
            });
        }
        self.send(HostFunction::TurnConstSpeed, &split_7bit(rpm, 4))
    }

    /// Write a single-byte tuning parameter.
    pub fn set_parameter(&mut self, parameter: Parameter, value: u8) -> Result<()> {
        if value > DATA_MASK {
            return Err(DriveError::ValueOutOfRange {
                what: parameter.name(),
                value: i64::from(value),
            });
        }
        self.send(parameter.setter(), &[value])
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Close the session and return the link.
    pub fn into_inner(self) -> L {
        self.link
    }

    fn send(&mut self, function: HostFunction, payload: &[u8]) -> Result<()> {
        FrameWriter::with_config(&mut self.link, self.config.frame.clone()).send(
            self.drive_id,
            function.code(),
            payload,
        )?;
        Ok(())
    }

    fn read_scalar(&mut self, function: HostFunction) -> Result<u8> {
        let expected = self.request(function)?;
        let value = self.check_response(expected)?;
        value.as_scalar().ok_or(DriveError::UnexpectedValue(expected))
    }

    fn read_signed(&mut self, function: DriveFunction) -> Result<i32> {
        let value = self.read_general(function)?;
        value.as_signed().ok_or(DriveError::UnexpectedValue(function))
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use dyn4_frame::{checksum, Frame};
    use dyn4_transport::{MockLink, TransportError};

    use super::*;
    use crate::value::{Alarm, InputMode, Positioning, ServoMode};

    fn reply(function_id: u8, payload: &[u8]) -> Vec<u8> {
        Frame::new(0, function_id, payload)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    fn session(link: &mut MockLink) -> DriveSession<&mut MockLink> {
        DriveSession::new(link, 0).unwrap()
    }

    #[test]
    fn drive_id_is_range_checked() {
        assert!(matches!(
            DriveSession::new(MockLink::new(), 32),
            Err(DriveError::InvalidDriveId(32))
        ));
        assert!(DriveSession::new(MockLink::new(), 31).is_ok());
    }

    #[test]
    fn zero_attempt_budget_is_rejected() {
        let config = SessionConfig {
            max_attempts: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            DriveSession::with_config(MockLink::new(), 0, config),
            Err(DriveError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn read_status_sends_request_and_decodes() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x19, &[0x22]));

        let status = session(&mut link).read_status().unwrap();
        assert!(status.in_position);
        assert!(status.motor_free);
        assert!(status.motion_busy);
        assert_eq!(status.alarm, Alarm::None);

        assert_eq!(link.written(), &[vec![0x00u8, 0x89, 0x80, 0x89]]);
    }

    #[test]
    fn request_addresses_the_session_drive() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x10, &[40]));

        let mut session = DriveSession::new(&mut link, 5).unwrap();
        assert_eq!(session.read_main_gain().unwrap(), 40);

        let sent = &link.written()[0];
        assert_eq!(sent[0], 5);
        assert_eq!(sent[1] & 0x1f, 0x18);
    }

    #[test]
    fn request_rejects_functions_without_reply() {
        let mut link = MockLink::new();
        let err = session(&mut link).request(HostFunction::SetOrigin).unwrap_err();
        assert!(matches!(err, DriveError::UnknownFunctionId(0x00)));
        assert!(link.written().is_empty());
    }

    #[test]
    fn general_read_carries_code_as_payload() {
        let mut link = MockLink::new();
        let expected = session(&mut link).general_read(0x1b).unwrap();

        assert_eq!(expected, DriveFunction::IsAbsPos32);
        let sent = &link.written()[0];
        assert_eq!(sent[1], 0x8e);
        assert_eq!(sent[2], 0x9b);
    }

    #[test]
    fn general_read_rejects_codes_outside_reply_set() {
        let mut link = MockLink::new();
        let mut session = session(&mut link);
        for code in [0x00, 0x0f, 0x1c, 0x1d, 0x1f, 0x40] {
            assert!(matches!(
                session.general_read(code),
                Err(DriveError::UnknownFunctionId(c)) if c == code
            ));
        }
        assert!(link.written().is_empty());
    }

    #[test]
    fn match_on_third_attempt() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x19, &[0]))
            .push_bytes(&reply(0x1a, &[0]))
            .push_bytes(&reply(0x10, &[9]));

        let value = session(&mut link)
            .check_response(DriveFunction::IsMainGain)
            .unwrap();
        assert_eq!(value, DecodedValue::Scalar7(9));
    }

    #[test]
    fn three_unrelated_frames_exhaust_budget() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x19, &[0]))
            .push_bytes(&reply(0x1a, &[0]))
            .push_bytes(&reply(0x11, &[0]))
            .push_bytes(&reply(0x10, &[9]));

        let err = session(&mut link)
            .check_response(DriveFunction::IsMainGain)
            .unwrap_err();
        assert!(matches!(
            err,
            DriveError::UnexpectedFunction {
                expected: DriveFunction::IsMainGain,
                attempts: 3
            }
        ));
        // The fourth frame is left on the line.
        assert!(link.pending() > 0);
    }

    #[test]
    fn silent_drive_times_out() {
        let mut link = MockLink::new();
        let err = session(&mut link)
            .check_response(DriveFunction::IsStatus)
            .unwrap_err();
        assert!(matches!(err, DriveError::Timeout { attempts: 3 }));
    }

    #[test]
    fn timeout_then_reply_succeeds() {
        let mut link = MockLink::new();
        link.push_timeout().push_bytes(&reply(0x16, &[3]));

        assert_eq!(session(&mut link).read_drive_id().unwrap(), 3);
    }

    #[test]
    fn corrupted_frame_uses_an_attempt() {
        let body = [0x00, 0x90, 0x81];
        let mut link = MockLink::new();
        link.push_bytes(&body)
            .push_bytes(&[checksum(&body) ^ 0x01])
            .push_bytes(&reply(0x10, &[1]));

        assert_eq!(session(&mut link).read_main_gain().unwrap(), 1);
    }

    #[test]
    fn corrupted_frames_only_count_as_unexpected() {
        let body = [0x00, 0x90, 0x81];
        let bad = checksum(&body) ^ 0x01;
        let mut link = MockLink::new();
        for _ in 0..3 {
            link.push_bytes(&body).push_bytes(&[bad]);
        }

        let err = session(&mut link).read_main_gain().unwrap_err();
        assert!(matches!(err, DriveError::UnexpectedFunction { .. }));
    }

    #[test]
    fn unallowed_reply_is_skipped() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x05, &[0]))
            .push_bytes(&reply(0x1c, &[0]))
            .push_bytes(&reply(0x12, &[77]));

        assert_eq!(session(&mut link).read_int_gain().unwrap(), 77);
    }

    #[test]
    fn wrong_length_on_expected_function_is_hard_error() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x18, &[1]))
            .push_bytes(&reply(0x18, &[1, 2, 3, 4]));

        let err = session(&mut link).read_gear_number().unwrap_err();
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
    fn gear_number() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x18, &[1, 2, 3, 4]));

        assert_eq!(session(&mut link).read_gear_number().unwrap(), (130, 388));
        assert_eq!(link.written()[0][1] & 0x1f, 0x1f);
    }

    #[test]
    fn abs_pos_and_trq_current_use_general_read() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x1b, &split_7bit(-1000, 4)))
            .push_bytes(&reply(0x1e, &[0x7f]));

        let mut session = session(&mut link);
        assert_eq!(session.read_abs_pos32().unwrap(), -1000);
        assert_eq!(session.read_trq_current().unwrap(), -1);

        let written = link.written();
        assert_eq!(written[0][2], 0x9b);
        assert_eq!(written[1][2], 0x9e);
    }

    #[test]
    fn every_parameter_round_trips_through_getter() {
        for parameter in Parameter::ALL {
            let reply_code = parameter.getter().reply().unwrap().code();
            let mut link = MockLink::new();
            link.push_bytes(&reply(reply_code, &[21]));

            assert_eq!(session(&mut link).read_parameter(parameter).unwrap(), 21);
        }
    }

    #[test]
    fn read_config() {
        let mut link = MockLink::new();
        link.push_bytes(&reply(0x1a, &[0b0010_1010]));

        let config = session(&mut link).read_config().unwrap();
        assert_eq!(config.input_mode, InputMode::PulseDir);
        assert_eq!(config.positioning, Positioning::Relative);
        assert_eq!(config.servo_mode, ServoMode::Speed);
        assert!(config.servo_enabled);
    }

    #[test]
    fn set_config_writes_bits() {
        let mut link = MockLink::new();
        session(&mut link).set_config(&DriveConfig::default()).unwrap();

        let sent = &link.written()[0];
        assert_eq!(sent[1], 0x87);
        assert_eq!(sent[2], 0x80 | 0x24);
    }

    #[test]
    fn set_speed_encodes_four_groups() {
        let mut link = MockLink::new();
        session(&mut link).set_speed(-1).unwrap();

        let sent = &link.written()[0];
        assert_eq!(sent.len(), 7);
        assert_eq!(sent[1], 0x80 | (3 << 5) | 0x0a);
        assert_eq!(&sent[2..6], &[0xffu8, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn set_speed_positive() {
        let mut link = MockLink::new();
        session(&mut link).set_speed(1000).unwrap();

        assert_eq!(&link.written()[0][2..6], &[0x80u8, 0x80, 0x87, 0xe8]);
    }

    #[test]
    fn set_speed_range() {
        let mut link = MockLink::new();
        let mut session = session(&mut link);
        assert!(session.set_speed((1 << 27) - 1).is_ok());
        assert!(session.set_speed(-(1 << 27)).is_ok());
        assert!(matches!(
            session.set_speed(1 << 27),
            Err(DriveError::ValueOutOfRange { what: "speed", .. })
        ));
    }

    #[test]
    fn set_parameter_checks_seven_bits() {
        let mut link = MockLink::new();
        let mut session = session(&mut link);
        session.set_parameter(Parameter::HighSpeed, 127).unwrap();
        assert!(matches!(
            session.set_parameter(Parameter::HighSpeed, 128),
            Err(DriveError::ValueOutOfRange { .. })
        ));

        let sent = &link.written()[0];
        assert_eq!(sent[1] & 0x1f, 0x14);
        assert_eq!(sent[2], 0xff);
    }

    #[test]
    fn short_write_is_not_retried() {
        let mut link = MockLink::new();
        link.cap_writes(2);

        let err = session(&mut link).read_status().unwrap_err();
        assert!(matches!(
            err,
            DriveError::Frame(FrameError::Transport(TransportError::ShortWrite { .. }))
        ));
        assert_eq!(link.written().len(), 1);
    }

    #[test]
    fn link_failure_is_not_retried() {
        let mut link = MockLink::new();
        link.push_failure(ErrorKind::BrokenPipe)
            .push_bytes(&reply(0x19, &[0]));

        let err = session(&mut link).read_status().unwrap_err();
        assert!(matches!(err, DriveError::Frame(FrameError::Transport(_))));
    }

    #[test]
    fn flush_reaches_link() {
        let mut link = MockLink::new();
        link.push_bytes(&[1, 2, 3]);

        session(&mut link).flush().unwrap();
        assert_eq!(link.flushes(), 1);
        assert_eq!(link.pending(), 0);
    }

    #[test]
    fn custom_attempt_budget() {
        let mut link = MockLink::new();
        for _ in 0..4 {
            link.push_bytes(&reply(0x19, &[0]));
        }
        link.push_bytes(&reply(0x10, &[5]));

        let config = SessionConfig {
            max_attempts: 5,
            ..SessionConfig::default()
        };
        let mut session = DriveSession::with_config(&mut link, 0, config).unwrap();
        assert_eq!(session.read_main_gain().unwrap(), 5);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut session = DriveSession::new(MockLink::new(), 3).unwrap();
        session.set_trace_frames(true);

        assert_eq!(session.drive_id(), 3);
        assert!(session.config().frame.trace_frames);
        let _ = session.get_ref();
        let _ = session.get_mut();
        let _inner = session.into_inner();
    }
}
