use crate::cmd::{open_session, LinkArgs};
use crate::exit::{drive_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, status_rows, OutputFormat, Record};

pub fn run(link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut drive = open_session(link)?;
    let status = drive
        .read_status()
        .map_err(|err| drive_error("read status failed", err))?;

    let record = Record {
        kind: "status",
        drive_id: drive.drive_id(),
        data: &status,
        rows: status_rows(&status),
    };
    print_record(&record, format);

    // An active alarm is reported, not hidden behind a zero exit.
    Ok(if status.alarm.is_active() { FAILURE } else { SUCCESS })
}
