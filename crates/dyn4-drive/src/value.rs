//! Typed views of reply payloads.

use serde::Serialize;

/// Value carried by a decoded reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedValue {
    /// A single unsigned 7-bit quantity (gains, limits, the drive id).
    Scalar7(u8),
    /// A sign-extended multi-group quantity (absolute position, torque current).
    SignedInteger(i32),
    /// Two 14-bit numbers: the gear ratio numerator and denominator.
    GearPair(u16, u16),
    /// Decoded status bitfield.
    Status(DriveStatus),
    /// Decoded configuration bitfield.
    Config(DriveConfig),
}

impl DecodedValue {
    pub fn as_scalar(&self) -> Option<u8> {
        match self {
            DecodedValue::Scalar7(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_signed(&self) -> Option<i32> {
        match self {
            DecodedValue::SignedInteger(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_gear_pair(&self) -> Option<(u16, u16)> {
        match self {
            DecodedValue::GearPair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<DriveStatus> {
        match self {
            DecodedValue::Status(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<DriveConfig> {
        match self {
            DecodedValue::Config(c) => Some(*c),
            _ => None,
        }
    }
}

/// Alarm code held in status bits 2..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alarm {
    None,
    LostPhase,
    OverCurrent,
    OverheatOrOverpower,
    CorruptCommand,
    /// Codes 5..=7 are not documented.
    Reserved(u8),
}

impl Alarm {
    pub fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Alarm::None,
            1 => Alarm::LostPhase,
            2 => Alarm::OverCurrent,
            3 => Alarm::OverheatOrOverpower,
            4 => Alarm::CorruptCommand,
            other => Alarm::Reserved(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Alarm::None => 0,
            Alarm::LostPhase => 1,
            Alarm::OverCurrent => 2,
            Alarm::OverheatOrOverpower => 3,
            Alarm::CorruptCommand => 4,
            Alarm::Reserved(c) => c & 0x07,
        }
    }

    /// Operator-facing description.
    pub fn description(self) -> &'static str {
        match self {
            Alarm::None => "no alarm",
            Alarm::LostPhase => "lost phase: position error exceeded the window",
            Alarm::OverCurrent => "over current",
            Alarm::OverheatOrOverpower => "overheat or overpower",
            Alarm::CorruptCommand => "checksum error in received command",
            Alarm::Reserved(_) => "reserved alarm code",
        }
    }

    pub fn is_active(self) -> bool {
        self != Alarm::None
    }
}

/// Drive status as reported by `Is_Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriveStatus {
    /// Bit 0 clear.
    pub in_position: bool,
    /// Bit 1.
    pub motor_free: bool,
    /// Bits 2..=4.
    pub alarm: Alarm,
    /// Bit 5.
    pub motion_busy: bool,
    /// Bit 6, the level of the JP3 pin 2 input.
    pub pin2: bool,
}

impl DriveStatus {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            in_position: bits & 0x01 == 0,
            motor_free: bits & 0x02 != 0,
            alarm: Alarm::from_code((bits >> 2) & 0x07),
            motion_busy: bits & 0x20 != 0,
            pin2: bits & 0x40 != 0,
        }
    }

    pub fn to_bits(&self) -> u8 {
        let mut bits = 0;
        if !self.in_position {
            bits |= 0x01;
        }
        if self.motor_free {
            bits |= 0x02;
        }
        bits |= self.alarm.code() << 2;
        if self.motion_busy {
            bits |= 0x20;
        }
        if self.pin2 {
            bits |= 0x40;
        }
        bits
    }
}

/// Command source selected by configuration bits 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Rs232,
    CwCcw,
    PulseDir,
    Analog,
}

impl InputMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => InputMode::Rs232,
            1 => InputMode::CwCcw,
            2 => InputMode::PulseDir,
            _ => InputMode::Analog,
        }
    }

    fn bits(self) -> u8 {
        match self {
            InputMode::Rs232 => 0,
            InputMode::CwCcw => 1,
            InputMode::PulseDir => 2,
            InputMode::Analog => 3,
        }
    }
}

/// Configuration bit 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    Relative,
    Absolute,
}

/// Control loop selected by configuration bits 3..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServoMode {
    Position,
    Speed,
    Torque,
    Reserved,
}

impl ServoMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ServoMode::Position,
            1 => ServoMode::Speed,
            2 => ServoMode::Torque,
            _ => ServoMode::Reserved,
        }
    }

    fn bits(self) -> u8 {
        match self {
            ServoMode::Position => 0,
            ServoMode::Speed => 1,
            ServoMode::Torque => 2,
            ServoMode::Reserved => 3,
        }
    }
}

/// Drive configuration as reported by `Is_Config` and written by
/// `Set_Drive_Config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriveConfig {
    pub input_mode: InputMode,
    pub positioning: Positioning,
    pub servo_mode: ServoMode,
    /// Bit 5.
    pub servo_enabled: bool,
    /// Bit 6 has no documented meaning; it is carried through unchanged.
    pub reserved_bit6: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Rs232,
            positioning: Positioning::Absolute,
            servo_mode: ServoMode::Position,
            servo_enabled: true,
            reserved_bit6: false,
        }
    }
}

impl DriveConfig {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            input_mode: InputMode::from_bits(bits),
            positioning: if bits & 0x04 != 0 {
                Positioning::Absolute
            } else {
                Positioning::Relative
            },
            servo_mode: ServoMode::from_bits(bits >> 3),
            servo_enabled: bits & 0x20 != 0,
            reserved_bit6: bits & 0x40 != 0,
        }
    }

    pub fn to_bits(&self) -> u8 {
        let mut bits = self.input_mode.bits() | (self.servo_mode.bits() << 3);
        if self.positioning == Positioning::Absolute {
            bits |= 0x04;
        }
        if self.servo_enabled {
            bits |= 0x20;
        }
        if self.reserved_bit6 {
            bits |= 0x40;
        }
        bits
    }
}
