use serde::Serialize;
use tracing::info;

use crate::cmd::{open_session, parse_duration, LinkArgs, MeasureSpeedArgs, SetSpeedArgs};
use crate::exit::{drive_error, CliResult, SUCCESS};
use crate::output::{print_record, row, OutputFormat, Record};

#[derive(Serialize)]
struct SpeedOutput {
    rpm: f64,
    interval_ms: u128,
}

pub fn run_set(args: SetSpeedArgs, link: &LinkArgs) -> CliResult<i32> {
    let mut drive = open_session(link)?;
    drive
        .set_speed(args.rpm)
        .map_err(|err| drive_error("set speed failed", err))?;
    info!(rpm = args.rpm, "constant speed commanded");
    Ok(SUCCESS)
}

pub fn run_measure(
    args: MeasureSpeedArgs,
    link: &LinkArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let mut drive = open_session(link)?;
    let rpm = drive
        .measure_speed(interval)
        .map_err(|err| drive_error("measure speed failed", err))?;

    let out = SpeedOutput {
        rpm,
        interval_ms: interval.as_millis(),
    };
    let record = Record {
        kind: "speed",
        drive_id: drive.drive_id(),
        data: &out,
        rows: vec![
            row("rpm", format!("{rpm:.2}")),
            row("interval_ms", out.interval_ms),
        ],
    };
    print_record(&record, format);
    Ok(SUCCESS)
}
