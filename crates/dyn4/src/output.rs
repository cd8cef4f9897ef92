use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dyn4_drive::{DriveConfig, DriveStatus, Summary};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub type Rows = Vec<(String, String)>;

/// One result to print: a serializable body plus its human-readable rows.
pub struct Record<'a, T: Serialize> {
    pub kind: &'a str,
    pub drive_id: u8,
    pub data: &'a T,
    pub rows: Rows,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_id: String,
    drive_id: u8,
    timestamp: String,
    data: &'a T,
}

pub fn print_record<T: Serialize>(record: &Record<'_, T>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = Envelope {
                schema_id: format!("dyn4.cli.v1.{}", record.kind),
                drive_id: record.drive_id,
                timestamp: now_unix_seconds(),
                data: record.data,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in &record.rows {
                table.add_row(vec![field.clone(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = record
                .rows
                .iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("drive={} {line}", record.drive_id);
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout().lock();
            for (_, value) in &record.rows {
                let _ = writeln!(out, "{value}");
            }
            let _ = out.flush();
        }
    }
}

pub fn row(field: &str, value: impl ToString) -> (String, String) {
    (field.to_string(), value.to_string())
}

pub fn status_rows(status: &DriveStatus) -> Rows {
    vec![
        row("in_position", status.in_position),
        row("motor_free", status.motor_free),
        row("alarm", status.alarm.description()),
        row("motion_busy", status.motion_busy),
        row("pin2", status.pin2),
    ]
}

pub fn config_rows(config: &DriveConfig) -> Rows {
    vec![
        row("input_mode", format!("{:?}", config.input_mode)),
        row("positioning", format!("{:?}", config.positioning)),
        row("servo_mode", format!("{:?}", config.servo_mode)),
        row("servo_enabled", config.servo_enabled),
        row("reserved_bit6", config.reserved_bit6),
        row("bits", format!("0x{:02x}", config.to_bits())),
    ]
}

pub fn summary_rows(prefix: &str, summary: &Summary) -> Rows {
    vec![
        row(&format!("{prefix}.min"), summary.min),
        row(&format!("{prefix}.max"), summary.max),
        row(&format!("{prefix}.mean"), format!("{:.3}", summary.mean)),
        row(&format!("{prefix}.median"), summary.median),
        row(&format!("{prefix}.stddev"), format!("{:.3}", summary.stddev)),
    ]
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use dyn4_drive::Alarm;

    use super::*;

    #[test]
    fn status_rows_describe_alarm() {
        let mut status = DriveStatus::from_bits(0);
        status.alarm = Alarm::OverCurrent;

        let rows = status_rows(&status);
        assert_eq!(rows.len(), 5);
        assert!(rows.contains(&row("alarm", "over current")));
        assert!(rows.contains(&row("in_position", true)));
    }

    #[test]
    fn config_rows_include_raw_bits() {
        let rows = config_rows(&DriveConfig::default());
        assert!(rows.contains(&row("bits", "0x24")));
        assert!(rows.contains(&row("servo_mode", "Position")));
    }

    #[test]
    fn summary_rows_are_prefixed() {
        let summary = Summary::from_samples(&[1.0, 3.0]).unwrap();
        let rows = summary_rows("abs", &summary);
        assert_eq!(rows[0], row("abs.min", 1));
        assert_eq!(rows[2], row("abs.mean", "2.000"));
    }
}
