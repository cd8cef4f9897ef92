mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, LinkArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "dyn4", version, about = "DMM DYN4 servo drive CLI")]
struct Cli {
    #[command(flatten)]
    link: LinkArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level, cli.link.trace_frames);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.link, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ReadTarget;

    #[test]
    fn parses_read_subcommand() {
        let cli =
            Cli::try_parse_from(["dyn4", "read", "main-gain"]).expect("read args should parse");

        assert!(matches!(
            cli.command,
            Command::Read(ref args) if args.target == ReadTarget::MainGain
        ));
        assert_eq!(cli.link.port, "/dev/ttyUSB0");
        assert_eq!(cli.link.drive_id, 0);
        assert_eq!(cli.link.attempts, 3);
        assert_eq!(cli.link.baud, 38_400);
    }

    #[test]
    fn global_link_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dyn4",
            "status",
            "--port",
            "/dev/ttyS1",
            "--drive-id",
            "7",
            "--trace-frames",
        ])
        .expect("global options should parse after the subcommand");

        assert_eq!(cli.link.port, "/dev/ttyS1");
        assert_eq!(cli.link.drive_id, 7);
        assert!(cli.link.trace_frames);
    }

    #[test]
    fn rejects_drive_id_above_31() {
        let err = Cli::try_parse_from(["dyn4", "--drive-id", "32", "status"])
            .expect_err("drive id 32 should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn set_speed_accepts_negative_rpm() {
        let cli = Cli::try_parse_from(["dyn4", "set-speed", "-250"])
            .expect("negative rpm should parse");
        assert!(matches!(cli.command, Command::SetSpeed(ref args) if args.rpm == -250));
    }

    #[test]
    fn servo_on_and_off_conflict() {
        let err = Cli::try_parse_from(["dyn4", "set-config", "--servo-on", "--servo-off"])
            .expect_err("conflicting servo flags should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_torque_and_watch_options() {
        let cli = Cli::try_parse_from(["dyn4", "torque", "--duration", "2s", "--samples"])
            .expect("torque args should parse");
        assert!(matches!(
            cli.command,
            Command::Torque(ref args) if args.samples && args.duration == "2s"
        ));

        let cli = Cli::try_parse_from(["dyn4", "watch", "--count", "5"])
            .expect("watch args should parse");
        assert!(matches!(cli.command, Command::Watch(ref args) if args.count == Some(5)));
    }
}
