use dyn4_drive::{DriveConfig, DriveSession};
use dyn4_transport::DriveLink;
use tracing::info;

use crate::cmd::{open_session, LinkArgs, SetConfigArgs};
use crate::exit::{drive_error, CliResult, SUCCESS};
use crate::output::{config_rows, print_record, OutputFormat, Record};

pub fn run_read(link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut drive = open_session(link)?;
    let config = read_config(&mut drive)?;
    print_config(&config, drive.drive_id(), format);
    Ok(SUCCESS)
}

pub fn run_set(args: SetConfigArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut drive = open_session(link)?;

    let current = if args.is_complete() {
        DriveConfig::default()
    } else {
        read_config(&mut drive)?
    };
    let config = args.apply(current);

    drive
        .set_config(&config)
        .map_err(|err| drive_error("write config failed", err))?;
    info!(bits = config.to_bits(), "configuration written");

    print_config(&config, drive.drive_id(), format);
    Ok(SUCCESS)
}

impl SetConfigArgs {
    fn is_complete(&self) -> bool {
        self.input_mode.is_some()
            && self.positioning.is_some()
            && self.servo_mode.is_some()
            && (self.servo_on || self.servo_off)
    }

    fn apply(&self, mut config: DriveConfig) -> DriveConfig {
        if let Some(mode) = self.input_mode {
            config.input_mode = mode.into();
        }
        if let Some(positioning) = self.positioning {
            config.positioning = positioning.into();
        }
        if let Some(mode) = self.servo_mode {
            config.servo_mode = mode.into();
        }
        if self.servo_on {
            config.servo_enabled = true;
        }
        if self.servo_off {
            config.servo_enabled = false;
        }
        config
    }
}

fn read_config<L: DriveLink>(drive: &mut DriveSession<L>) -> CliResult<DriveConfig> {
    drive
        .read_config()
        .map_err(|err| drive_error("read config failed", err))
}

fn print_config(config: &DriveConfig, drive_id: u8, format: OutputFormat) {
    let record = Record {
        kind: "config",
        drive_id,
        data: config,
        rows: config_rows(config),
    };
    print_record(&record, format);
}
