use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use dyn4_drive::{
    DriveSession, InputMode, Parameter, Positioning, ServoMode, SessionConfig, MAX_DRIVE_ID,
};
use dyn4_frame::FrameConfig;
use dyn4_transport::{LinkConfig, SerialLink, DEFAULT_BAUD_RATE};
use tracing::debug;

use crate::exit::{drive_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod config;
pub mod dump;
pub mod read;
pub mod speed;
pub mod status;
pub mod torque;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read every parameter the drive reports.
    Dump,
    /// Read the status register.
    Status,
    /// Read the configuration register.
    Config,
    /// Read a single value.
    Read(ReadArgs),
    /// Write the configuration register.
    SetConfig(SetConfigArgs),
    /// Write a single tuning parameter.
    Set(SetArgs),
    /// Spin at a constant speed.
    SetSpeed(SetSpeedArgs),
    /// Estimate speed from two position samples.
    MeasureSpeed(MeasureSpeedArgs),
    /// Sample torque current over a window and print statistics.
    Torque(TorqueArgs),
    /// Poll the status register until interrupted.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Serial line and session options shared by every drive command.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial device the drive is attached to.
    #[arg(long, env = "DYN4_PORT", default_value = "/dev/ttyUSB0", global = true)]
    pub port: String,

    /// Drive address.
    #[arg(
        long,
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=MAX_DRIVE_ID as i64),
        global = true
    )]
    pub drive_id: u8,

    /// Line rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, global = true)]
    pub baud: u32,

    /// Per-byte reply timeout (e.g. 50ms, 1s).
    #[arg(long, default_value = "50ms", global = true)]
    pub timeout: String,

    /// Frames or timeouts to consume while waiting for a reply.
    #[arg(long, default_value_t = 3, global = true)]
    pub attempts: u32,

    /// Log every frame sent and received as hex.
    #[arg(long, global = true)]
    pub trace_frames: bool,
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Dump => dump::run(link, format),
        Command::Status => status::run(link, format),
        Command::Config => config::run_read(link, format),
        Command::Read(args) => read::run(args, link, format),
        Command::SetConfig(args) => config::run_set(args, link, format),
        Command::Set(args) => read::run_set(args, link),
        Command::SetSpeed(args) => speed::run_set(args, link),
        Command::MeasureSpeed(args) => speed::run_measure(args, link, format),
        Command::Torque(args) => torque::run(args, link, format),
        Command::Watch(args) => watch::run(args, link, format),
        Command::Version(args) => version::run(args),
    }
}

/// Values `read` can fetch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReadTarget {
    MainGain,
    SpeedGain,
    IntGain,
    TrqCons,
    HighSpeed,
    HighAccel,
    PosOnRange,
    DriveId,
    GearNumber,
    Status,
    Config,
    AbsPos,
    TrqCurrent,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Value to read.
    pub target: ReadTarget,
}

/// Writable single-byte parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ParameterArg {
    MainGain,
    SpeedGain,
    IntGain,
    TrqCons,
    HighSpeed,
    HighAccel,
    PosOnRange,
}

impl From<ParameterArg> for Parameter {
    fn from(arg: ParameterArg) -> Self {
        match arg {
            ParameterArg::MainGain => Parameter::MainGain,
            ParameterArg::SpeedGain => Parameter::SpeedGain,
            ParameterArg::IntGain => Parameter::IntGain,
            ParameterArg::TrqCons => Parameter::TrqCons,
            ParameterArg::HighSpeed => Parameter::HighSpeed,
            ParameterArg::HighAccel => Parameter::HighAccel,
            ParameterArg::PosOnRange => Parameter::PosOnRange,
        }
    }
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Parameter to write.
    pub parameter: ParameterArg,
    /// New value (0..=127).
    pub value: u8,
    /// Read the parameter back after writing it.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputModeArg {
    Rs232,
    CwCcw,
    PulseDir,
    Analog,
}

impl From<InputModeArg> for InputMode {
    fn from(arg: InputModeArg) -> Self {
        match arg {
            InputModeArg::Rs232 => InputMode::Rs232,
            InputModeArg::CwCcw => InputMode::CwCcw,
            InputModeArg::PulseDir => InputMode::PulseDir,
            InputModeArg::Analog => InputMode::Analog,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PositioningArg {
    Relative,
    Absolute,
}

impl From<PositioningArg> for Positioning {
    fn from(arg: PositioningArg) -> Self {
        match arg {
            PositioningArg::Relative => Positioning::Relative,
            PositioningArg::Absolute => Positioning::Absolute,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ServoModeArg {
    Position,
    Speed,
    Torque,
}

impl From<ServoModeArg> for ServoMode {
    fn from(arg: ServoModeArg) -> Self {
        match arg {
            ServoModeArg::Position => ServoMode::Position,
            ServoModeArg::Speed => ServoMode::Speed,
            ServoModeArg::Torque => ServoMode::Torque,
        }
    }
}

/// Fields left out keep the value currently stored in the drive.
#[derive(Args, Debug, Default)]
pub struct SetConfigArgs {
    /// Command source.
    #[arg(long)]
    pub input_mode: Option<InputModeArg>,
    /// Absolute or relative positioning.
    #[arg(long)]
    pub positioning: Option<PositioningArg>,
    /// Control loop.
    #[arg(long)]
    pub servo_mode: Option<ServoModeArg>,
    /// Enable the servo.
    #[arg(long, conflicts_with = "servo_off")]
    pub servo_on: bool,
    /// Release the servo (motor free).
    #[arg(long)]
    pub servo_off: bool,
}

#[derive(Args, Debug)]
pub struct SetSpeedArgs {
    /// Target speed in rpm; negative reverses.
    #[arg(allow_negative_numbers = true)]
    pub rpm: i32,
}

#[derive(Args, Debug)]
pub struct MeasureSpeedArgs {
    /// Gap between the two position samples (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct TorqueArgs {
    /// Sampling window (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub duration: String,
    /// Include every raw sample in the output.
    #[arg(long)]
    pub samples: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Delay between polls (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub interval: String,
    /// Exit after N polls.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open the serial port and start a session with the configured drive.
pub fn open_session(link: &LinkArgs) -> CliResult<DriveSession<SerialLink>> {
    let read_timeout = parse_duration(&link.timeout)?;
    let line = LinkConfig {
        baud_rate: link.baud,
        read_timeout,
        ..LinkConfig::default()
    };
    let serial = SerialLink::open_with_config(&link.port, &line)
        .map_err(|err| transport_error("open failed", err))?;

    let config = SessionConfig {
        max_attempts: link.attempts,
        frame: FrameConfig {
            read_timeout,
            trace_frames: link.trace_frames,
        },
    };
    debug!(port = %link.port, drive_id = link.drive_id, ?config, "starting session");
    DriveSession::with_config(serial, link.drive_id, config)
        .map_err(|err| drive_error("session setup failed", err))
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
