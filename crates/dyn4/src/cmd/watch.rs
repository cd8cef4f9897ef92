use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::cmd::{open_session, parse_duration, LinkArgs, WatchArgs};
use crate::exit::{drive_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_record, status_rows, OutputFormat, Record};

/// Sleep granularity between polls; Ctrl-C is checked once per tick.
const TICK: Duration = Duration::from_millis(50);

pub fn run(args: WatchArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let mut drive = open_session(link)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut polls = 0usize;
    let mut last = None;

    while running.load(Ordering::SeqCst) {
        let status = drive
            .read_status()
            .map_err(|err| drive_error("read status failed", err))?;

        if last != Some(status) {
            debug!(bits = status.to_bits(), "status changed");
        }
        last = Some(status);

        let record = Record {
            kind: "status",
            drive_id: drive.drive_id(),
            data: &status,
            rows: status_rows(&status),
        };
        print_record(&record, format);
        polls = polls.saturating_add(1);

        if let Some(count) = args.count {
            if polls >= count {
                return Ok(SUCCESS);
            }
        }

        let mut waited = Duration::ZERO;
        while waited < interval && running.load(Ordering::SeqCst) {
            let step = TICK.min(interval - waited);
            thread::sleep(step);
            waited += step;
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
