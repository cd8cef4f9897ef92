use dyn4_drive::{DriveConfig, DriveSession, DriveStatus, Parameter};
use dyn4_transport::DriveLink;
use serde::Serialize;

use crate::cmd::{open_session, LinkArgs};
use crate::exit::{drive_error, CliResult, SUCCESS};
use crate::output::{config_rows, print_record, row, status_rows, OutputFormat, Record};

#[derive(Serialize)]
struct DumpOutput {
    status: DriveStatus,
    main_gain: u8,
    speed_gain: u8,
    int_gain: u8,
    trq_cons: u8,
    high_speed: u8,
    high_accel: u8,
    pos_on_range: u8,
    gear_number: (u16, u16),
    config: DriveConfig,
    abs_pos: i32,
    trq_current: i32,
}

fn read_param<L: DriveLink>(drive: &mut DriveSession<L>, parameter: Parameter) -> CliResult<u8> {
    drive
        .read_parameter(parameter)
        .map_err(|err| drive_error(&format!("read {} failed", parameter.name()), err))
}

pub fn run(link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut drive = open_session(link)?;
    let status = drive
        .read_status()
        .map_err(|err| drive_error("read status failed", err))?;
    let out = DumpOutput {
        status,
        main_gain: read_param(&mut drive, Parameter::MainGain)?,
        speed_gain: read_param(&mut drive, Parameter::SpeedGain)?,
        int_gain: read_param(&mut drive, Parameter::IntGain)?,
        trq_cons: read_param(&mut drive, Parameter::TrqCons)?,
        high_speed: read_param(&mut drive, Parameter::HighSpeed)?,
        high_accel: read_param(&mut drive, Parameter::HighAccel)?,
        pos_on_range: read_param(&mut drive, Parameter::PosOnRange)?,
        gear_number: drive
            .read_gear_number()
            .map_err(|err| drive_error("read gear number failed", err))?,
        config: drive
            .read_config()
            .map_err(|err| drive_error("read config failed", err))?,
        abs_pos: drive
            .read_abs_pos32()
            .map_err(|err| drive_error("read position failed", err))?,
        trq_current: drive
            .read_trq_current()
            .map_err(|err| drive_error("read torque current failed", err))?,
    };

    let mut rows = status_rows(&out.status);
    rows.extend([
        row("main_gain", out.main_gain),
        row("speed_gain", out.speed_gain),
        row("int_gain", out.int_gain),
        row("trq_cons", out.trq_cons),
        row("high_speed", out.high_speed),
        row("high_accel", out.high_accel),
        row("pos_on_range", out.pos_on_range),
        row(
            "gear_number",
            format!("{}/{}", out.gear_number.0, out.gear_number.1),
        ),
    ]);
    rows.extend(config_rows(&out.config));
    rows.push(row("abs_pos", out.abs_pos));
    rows.push(row("trq_current", out.trq_current));

    let record = Record {
        kind: "dump",
        drive_id: drive.drive_id(),
        data: &out,
        rows,
    };
    print_record(&record, format);
    Ok(SUCCESS)
}
