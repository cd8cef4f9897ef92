use dyn4_drive::{DecodedValue, DriveSession, Parameter};
use dyn4_frame::{DriveFunction, HostFunction};
use dyn4_transport::DriveLink;
use serde::Serialize;
use tracing::info;

use crate::cmd::{open_session, LinkArgs, ReadArgs, ReadTarget, SetArgs};
use crate::exit::{drive_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{config_rows, print_record, row, status_rows, OutputFormat, Record, Rows};

#[derive(Serialize)]
struct ReadOutput {
    target: &'static str,
    function: &'static str,
    value: DecodedValue,
}

impl ReadTarget {
    fn name(self) -> &'static str {
        match self {
            ReadTarget::MainGain => "main_gain",
            ReadTarget::SpeedGain => "speed_gain",
            ReadTarget::IntGain => "int_gain",
            ReadTarget::TrqCons => "trq_cons",
            ReadTarget::HighSpeed => "high_speed",
            ReadTarget::HighAccel => "high_accel",
            ReadTarget::PosOnRange => "pos_on_range",
            ReadTarget::DriveId => "drive_id",
            ReadTarget::GearNumber => "gear_number",
            ReadTarget::Status => "status",
            ReadTarget::Config => "config",
            ReadTarget::AbsPos => "abs_pos",
            ReadTarget::TrqCurrent => "trq_current",
        }
    }
}

/// How a target is fetched from the drive.
enum Route {
    Request(HostFunction),
    General(DriveFunction),
}

fn route(target: ReadTarget) -> Route {
    match target {
        ReadTarget::MainGain => Route::Request(HostFunction::ReadMainGain),
        ReadTarget::SpeedGain => Route::Request(HostFunction::ReadSpeedGain),
        ReadTarget::IntGain => Route::Request(HostFunction::ReadIntGain),
        ReadTarget::TrqCons => Route::Request(HostFunction::ReadTrqCons),
        ReadTarget::HighSpeed => Route::Request(HostFunction::ReadHighSpeed),
        ReadTarget::HighAccel => Route::Request(HostFunction::ReadHighAccel),
        ReadTarget::PosOnRange => Route::Request(HostFunction::ReadPosOnRange),
        ReadTarget::DriveId => Route::Request(HostFunction::ReadDriveId),
        ReadTarget::GearNumber => Route::Request(HostFunction::ReadGearNumber),
        ReadTarget::Status => Route::Request(HostFunction::ReadDriveStatus),
        ReadTarget::Config => Route::Request(HostFunction::ReadDriveConfig),
        ReadTarget::AbsPos => Route::General(DriveFunction::IsAbsPos32),
        ReadTarget::TrqCurrent => Route::General(DriveFunction::IsTrqCurrent),
    }
}

fn fetch<L: DriveLink>(
    drive: &mut DriveSession<L>,
    target: ReadTarget,
) -> CliResult<(DriveFunction, DecodedValue)> {
    let context = format!("read {} failed", target.name());
    let result = match route(target) {
        Route::Request(host) => match host.reply() {
            Some(function) => drive.read(host).map(|value| (function, value)),
            None => {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!("{context}: {host} has no reply"),
                ))
            }
        },
        Route::General(function) => drive.read_general(function).map(|value| (function, value)),
    };
    result.map_err(|err| drive_error(&context, err))
}

fn value_rows(name: &str, value: &DecodedValue) -> Rows {
    match value {
        DecodedValue::Scalar7(v) => vec![row(name, v)],
        DecodedValue::SignedInteger(v) => vec![row(name, v)],
        DecodedValue::GearPair(num, den) => vec![row(name, format!("{num}/{den}"))],
        DecodedValue::Status(status) => status_rows(status),
        DecodedValue::Config(config) => config_rows(config),
    }
}

pub fn run(args: ReadArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut drive = open_session(link)?;
    let (function, value) = fetch(&mut drive, args.target)?;

    let out = ReadOutput {
        target: args.target.name(),
        function: function.name(),
        value,
    };
    let record = Record {
        kind: "read",
        drive_id: drive.drive_id(),
        data: &out,
        rows: value_rows(args.target.name(), &value),
    };
    print_record(&record, format);
    Ok(SUCCESS)
}

pub fn run_set(args: SetArgs, link: &LinkArgs) -> CliResult<i32> {
    let parameter: Parameter = args.parameter.into();
    let mut drive = open_session(link)?;
    drive
        .set_parameter(parameter, args.value)
        .map_err(|err| drive_error("write parameter failed", err))?;
    info!(parameter = parameter.name(), value = args.value, "parameter written");

    if args.verify {
        let readback = drive
            .read_parameter(parameter)
            .map_err(|err| drive_error("read back failed", err))?;
        if readback != args.value {
            return Err(CliError::new(
                DATA_INVALID,
                format!(
                    "{} reads back as {readback}, wrote {}",
                    parameter.name(),
                    args.value
                ),
            ));
        }
    }
    Ok(SUCCESS)
}
