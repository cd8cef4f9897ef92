use dyn4_drive::Summary;
use serde::Serialize;

use crate::cmd::{open_session, parse_duration, LinkArgs, TorqueArgs};
use crate::exit::{drive_error, CliResult, SUCCESS};
use crate::output::{print_record, row, summary_rows, OutputFormat, Record};

#[derive(Serialize)]
struct TorqueOutput<'a> {
    count: usize,
    elapsed_ms: u128,
    signed: &'a Summary,
    absolute: &'a Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<&'a [i32]>,
}

pub fn run(args: TorqueArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let window = parse_duration(&args.duration)?;
    let mut drive = open_session(link)?;
    let report = drive
        .integrate_trq_current(window)
        .map_err(|err| drive_error("torque sampling failed", err))?;

    let out = TorqueOutput {
        count: report.samples.len(),
        elapsed_ms: report.elapsed.as_millis(),
        signed: &report.signed,
        absolute: &report.absolute,
        samples: args.samples.then_some(report.samples.as_slice()),
    };

    let mut rows = vec![row("samples", out.count), row("elapsed_ms", out.elapsed_ms)];
    rows.extend(summary_rows("signed", &report.signed));
    rows.extend(summary_rows("abs", &report.absolute));

    let record = Record {
        kind: "torque",
        drive_id: drive.drive_id(),
        data: &out,
        rows,
    };
    print_record(&record, format);
    Ok(SUCCESS)
}
