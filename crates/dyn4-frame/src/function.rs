//! Function identifier tables.
//!
//! The host and the drive number their functions independently: a request
//! for `Read_MainGain` (0x18) is answered by `Is_MainGain` (0x10). Both
//! tables are fixed by the drive firmware.

use crate::error::{FrameError, Result};

/// Function identifiers the host sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HostFunction {
    SetOrigin = 0x00,
    GoAbsolutePos = 0x01,
    MakeLinearLine = 0x02,
    GoRelativePos = 0x03,
    MakeCircularArc = 0x04,
    AssignDriveId = 0x05,
    ReadDriveId = 0x06,
    SetDriveConfig = 0x07,
    ReadDriveConfig = 0x08,
    ReadDriveStatus = 0x09,
    TurnConstSpeed = 0x0a,
    SquareWave = 0x0b,
    SinWave = 0x0c,
    SsFrequency = 0x0d,
    GeneralRead = 0x0e,
    ForMotorDefine = 0x0f,
    SetMainGain = 0x10,
    SetSpeedGain = 0x11,
    SetIntGain = 0x12,
    SetTrqCons = 0x13,
    SetHighSpeed = 0x14,
    SetHighAccel = 0x15,
    SetPosOnRange = 0x16,
    SetGearNumber = 0x17,
    ReadMainGain = 0x18,
    ReadSpeedGain = 0x19,
    ReadIntGain = 0x1a,
    ReadTrqCons = 0x1b,
    ReadHighSpeed = 0x1c,
    ReadHighAccel = 0x1d,
    ReadPosOnRange = 0x1e,
    ReadGearNumber = 0x1f,
}

const HOST_FUNCTIONS: [HostFunction; 32] = [
    HostFunction::SetOrigin,
    HostFunction::GoAbsolutePos,
    HostFunction::MakeLinearLine,
    HostFunction::GoRelativePos,
    HostFunction::MakeCircularArc,
    HostFunction::AssignDriveId,
    HostFunction::ReadDriveId,
    HostFunction::SetDriveConfig,
    HostFunction::ReadDriveConfig,
    HostFunction::ReadDriveStatus,
    HostFunction::TurnConstSpeed,
    HostFunction::SquareWave,
    HostFunction::SinWave,
    HostFunction::SsFrequency,
    HostFunction::GeneralRead,
    HostFunction::ForMotorDefine,
    HostFunction::SetMainGain,
    HostFunction::SetSpeedGain,
    HostFunction::SetIntGain,
    HostFunction::SetTrqCons,
    HostFunction::SetHighSpeed,
    HostFunction::SetHighAccel,
    HostFunction::SetPosOnRange,
    HostFunction::SetGearNumber,
    HostFunction::ReadMainGain,
    HostFunction::ReadSpeedGain,
    HostFunction::ReadIntGain,
    HostFunction::ReadTrqCons,
    HostFunction::ReadHighSpeed,
    HostFunction::ReadHighAccel,
    HostFunction::ReadPosOnRange,
    HostFunction::ReadGearNumber,
];

impl HostFunction {
    /// Look up a host identifier. Every 5-bit code is assigned.
    pub fn from_code(code: u8) -> Option<Self> {
        HOST_FUNCTIONS.get(usize::from(code)).copied()
    }

    /// Wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Name as printed in the drive manual.
    pub fn name(self) -> &'static str {
        match self {
            HostFunction::SetOrigin => "Set_Origin",
            HostFunction::GoAbsolutePos => "Go_Absolute_Pos",
            HostFunction::MakeLinearLine => "Make_LinearLine",
            HostFunction::GoRelativePos => "Go_Relative_Pos",
            HostFunction::MakeCircularArc => "Make_CircularArc",
            HostFunction::AssignDriveId => "Assign_Drive_ID",
            HostFunction::ReadDriveId => "Read_Drive_ID",
            HostFunction::SetDriveConfig => "Set_Drive_Config",
            HostFunction::ReadDriveConfig => "Read_Drive_Config",
            HostFunction::ReadDriveStatus => "Read_Drive_Status",
            HostFunction::TurnConstSpeed => "Turn_ConstSpeed",
            HostFunction::SquareWave => "Square_Wave",
            HostFunction::SinWave => "Sin_Wave",
            HostFunction::SsFrequency => "SS_Frequency",
            HostFunction::GeneralRead => "General_Read",
            HostFunction::ForMotorDefine => "ForMotorDefine",
            HostFunction::SetMainGain => "Set_MainGain",
            HostFunction::SetSpeedGain => "Set_SpeedGain",
            HostFunction::SetIntGain => "Set_IntGain",
            HostFunction::SetTrqCons => "Set_TrqCons",
            HostFunction::SetHighSpeed => "Set_HighSpeed",
            HostFunction::SetHighAccel => "Set_HighAccel",
            HostFunction::SetPosOnRange => "Set_Pos_OnRange",
            HostFunction::SetGearNumber => "Set_GearNumber",
            HostFunction::ReadMainGain => "Read_MainGain",
            HostFunction::ReadSpeedGain => "Read_SpeedGain",
            HostFunction::ReadIntGain => "Read_IntGain",
            HostFunction::ReadTrqCons => "Read_TrqCons",
            HostFunction::ReadHighSpeed => "Read_HighSpeed",
            HostFunction::ReadHighAccel => "Read_HighAccel",
            HostFunction::ReadPosOnRange => "Read_Pos_OnRange",
            HostFunction::ReadGearNumber => "Read_GearNumber",
        }
    }

    /// Drive-side function that answers this request, for read requests.
    ///
    /// `General_Read` is not listed: its reply depends on the code carried in
    /// its payload (see [`verify_func_id`]).
    pub fn reply(self) -> Option<DriveFunction> {
        match self {
            HostFunction::ReadDriveId => Some(DriveFunction::IsDriveId),
            HostFunction::ReadDriveConfig => Some(DriveFunction::IsConfig),
            HostFunction::ReadDriveStatus => Some(DriveFunction::IsStatus),
            HostFunction::ReadMainGain => Some(DriveFunction::IsMainGain),
            HostFunction::ReadSpeedGain => Some(DriveFunction::IsSpeedGain),
            HostFunction::ReadIntGain => Some(DriveFunction::IsIntGain),
            HostFunction::ReadTrqCons => Some(DriveFunction::IsTrqCons),
            HostFunction::ReadHighSpeed => Some(DriveFunction::IsHighSpeed),
            HostFunction::ReadHighAccel => Some(DriveFunction::IsHighAccel),
            HostFunction::ReadPosOnRange => Some(DriveFunction::IsPosOnRange),
            HostFunction::ReadGearNumber => Some(DriveFunction::IsGearNumber),
            _ => None,
        }
    }
}

impl std::fmt::Display for HostFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.code())
    }
}

/// Function identifiers the drive reports in its replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DriveFunction {
    IsMainGain = 0x10,
    IsSpeedGain = 0x11,
    IsIntGain = 0x12,
    IsTrqCons = 0x13,
    IsHighSpeed = 0x14,
    IsHighAccel = 0x15,
    IsDriveId = 0x16,
    IsPosOnRange = 0x17,
    IsGearNumber = 0x18,
    IsStatus = 0x19,
    IsConfig = 0x1a,
    IsAbsPos32 = 0x1b,
    IsTrqCurrent = 0x1e,
}

impl DriveFunction {
    /// Look up a drive identifier.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x10 => Some(DriveFunction::IsMainGain),
            0x11 => Some(DriveFunction::IsSpeedGain),
            0x12 => Some(DriveFunction::IsIntGain),
            0x13 => Some(DriveFunction::IsTrqCons),
            0x14 => Some(DriveFunction::IsHighSpeed),
            0x15 => Some(DriveFunction::IsHighAccel),
            0x16 => Some(DriveFunction::IsDriveId),
            0x17 => Some(DriveFunction::IsPosOnRange),
            0x18 => Some(DriveFunction::IsGearNumber),
            0x19 => Some(DriveFunction::IsStatus),
            0x1a => Some(DriveFunction::IsConfig),
            0x1b => Some(DriveFunction::IsAbsPos32),
            0x1e => Some(DriveFunction::IsTrqCurrent),
            _ => None,
        }
    }

    /// Wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Name as printed in the drive manual.
    pub fn name(self) -> &'static str {
        match self {
            DriveFunction::IsMainGain => "Is_MainGain",
            DriveFunction::IsSpeedGain => "Is_SpeedGain",
            DriveFunction::IsIntGain => "Is_IntGain",
            DriveFunction::IsTrqCons => "Is_TrqCons",
            DriveFunction::IsHighSpeed => "Is_HighSpeed",
            DriveFunction::IsHighAccel => "Is_HighAccel",
            DriveFunction::IsDriveId => "Is_Drive_ID",
            DriveFunction::IsPosOnRange => "Is_Pos_OnRange",
            DriveFunction::IsGearNumber => "Is_GearNumber",
            DriveFunction::IsStatus => "Is_Status",
            DriveFunction::IsConfig => "Is_Config",
            DriveFunction::IsAbsPos32 => "Is_AbsPos32",
            DriveFunction::IsTrqCurrent => "Is_TrqCurrent",
        }
    }

    /// Length code a reply must carry, or `None` when the drive picks the
    /// width (signed quantities).
    pub fn expected_length_code(self) -> Option<u8> {
        match self {
            DriveFunction::IsGearNumber => Some(3),
            DriveFunction::IsAbsPos32 | DriveFunction::IsTrqCurrent => None,
            _ => Some(0),
        }
    }
}

impl std::fmt::Display for DriveFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.code())
    }
}

/// How an inbound function identifier is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCode {
    /// A reply the host knows how to decode.
    Known(DriveFunction),
    /// 0x00..=0x0a or above 0x1e: never a valid reply.
    Unallowed(u8),
    /// Inside the reply range but not assigned.
    Unknown(u8),
}

/// Sort an inbound function identifier into known, unallowed or unknown.
pub fn classify_drive_code(code: u8) -> DriveCode {
    match code {
        0x00..=0x0a => DriveCode::Unallowed(code),
        c if c > 0x1e => DriveCode::Unallowed(c),
        c => match DriveFunction::from_code(c) {
            Some(function) => DriveCode::Known(function),
            None => DriveCode::Unknown(c),
        },
    }
}

/// Guard for the `General_Read` path.
///
/// Only codes 0x10..=0x1b and 0x1e may be requested; anything else fails
/// with [`FrameError::UnknownFunctionId`].
pub fn verify_func_id(code: u8) -> Result<DriveFunction> {
    match code {
        0x10..=0x1b | 0x1e => {
            DriveFunction::from_code(code).ok_or(FrameError::UnknownFunctionId(code))
        }
        _ => Err(FrameError::UnknownFunctionId(code)),
    }
}
