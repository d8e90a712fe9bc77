/// Output formatting: volume listing, property table, JSON, and errors.
use std::io::{self, Write};

use comfy_table::{Table, presets::ASCII_FULL};
use serde_json::{Map, Value};
use tracing::debug;

use super::args::OutputFormat;
use crate::cinder::Volume;
use crate::types::ErrorOutput;

/// Output context passed to all formatters.
pub struct OutputCtx {
    pub format: OutputFormat,
}

impl OutputCtx {
    /// Construct from CLI args.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Start a named stage timer. Logs elapsed time at debug level on drop.
    #[must_use]
    pub fn timer(&self, label: &'static str) -> StageTimer {
        StageTimer::new(label)
    }
}

// --- Volume listing ---

/// One listing line for an in-use volume.
///
/// Missing names, sizes and types print as `None`; the trailing space is part
/// of the format scripts already parse.
#[must_use]
pub fn volume_line(volume: &Volume) -> String {
    format!(
        "Name: '{}' {} Size:{}G Type:{} ",
        volume.name.as_deref().unwrap_or("None"),
        volume.id,
        volume.size.map_or_else(|| "None".to_owned(), |s| s.to_string()),
        volume.volume_type.as_deref().unwrap_or("None"),
    )
}

/// Write one line per volume, in the order given.
///
/// # Errors
///
/// Returns `io::Error` if writing fails.
pub fn write_volume_list<'v, W: Write>(
    out: &mut W,
    volumes: impl IntoIterator<Item = &'v Volume>,
) -> io::Result<()> {
    for volume in volumes {
        writeln!(out, "{}", volume_line(volume))?;
    }
    Ok(())
}

// --- Single-volume report ---

/// Write a volume report (a key-sorted mapping) in the requested format.
///
/// # Errors
///
/// Returns `io::Error` if writing or JSON encoding fails.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &Map<String, Value>,
    ctx: &OutputCtx,
) -> io::Result<()> {
    match ctx.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)
        }
        OutputFormat::Table => write_report_table(out, report),
    }
}

fn write_report_table<W: Write>(out: &mut W, report: &Map<String, Value>) -> io::Result<()> {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(["Property", "Value"]);

    let mut keys: Vec<&String> = report.keys().collect();
    keys.sort();
    for key in keys {
        table.add_row([key.as_str(), &render_value(&report[key.as_str()])]);
    }

    writeln!(out, "{table}")
}

/// Table cell text for a report value.
///
/// Strings print bare, `null` as `-`, lists of strings one per line, and
/// anything else as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_owned(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(Value::is_string) && !items.is_empty() => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

// --- Error output ---

/// Write a structured error to stderr.
pub fn write_error(err: &ErrorOutput, format: OutputFormat) {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match format {
        OutputFormat::Json => {
            let s = serde_json::to_string_pretty(err).unwrap_or_default();
            let _ = writeln!(out, "{s}");
        }
        OutputFormat::Table => {
            let _ = writeln!(out, "Error: {}", err.error.message);
        }
    }
}

// --- Stage timer ---

/// A RAII timer that logs elapsed milliseconds on drop.
///
/// Created via [`OutputCtx::timer`]. Silent unless debug logging is enabled.
pub struct StageTimer {
    label: &'static str,
    start: std::time::Instant,
}

impl StageTimer {
    #[must_use]
    fn new(label: &'static str) -> Self {
        Self {
            label,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let ms = self.start.elapsed().as_secs_f64() * 1000.0;
        debug!(stage = self.label, elapsed_ms = ms, "stage finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn volume(value: Value) -> Volume {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_volume_line() {
        let v = volume(json!({
            "id": "6edbc2f4-1507-44f8-ac0d-eed1d2608d38",
            "name": "data01",
            "size": 10,
            "volume_type": "3par",
            "status": "in-use"
        }));
        assert_eq!(
            volume_line(&v),
            "Name: 'data01' 6edbc2f4-1507-44f8-ac0d-eed1d2608d38 Size:10G Type:3par "
        );
    }

    #[test]
    fn test_volume_line_missing_fields() {
        let v = volume(json!({"id": "abc", "name": null, "size": 1, "status": "in-use"}));
        assert_eq!(volume_line(&v), "Name: 'None' abc Size:1G Type:None ");

        let v = volume(json!({"id": "abc", "status": "in-use"}));
        assert_eq!(volume_line(&v), "Name: 'None' abc Size:NoneG Type:None ");
    }

    #[test]
    fn test_report_table_sorted() {
        let report = json!({
            "status": "in-use",
            "id": "abc",
            "system-paths": ["/dev/sdb", "/dev/sdc"],
            "description": null,
            "size": 1
        });
        let mut out = Vec::new();
        write_report(
            &mut out,
            report.as_object().unwrap(),
            &OutputCtx::new(OutputFormat::Table),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();

        let pos = |needle: &str| text.find(needle).unwrap();
        assert!(pos("Property") < pos("description"));
        assert!(pos("description") < pos("id"));
        assert!(pos("id") < pos("size"));
        assert!(pos("size") < pos("status"));
        assert!(pos("status") < pos("system-paths"));
        assert!(text.contains("/dev/sdb"));
        assert!(text.contains("/dev/sdc"));
    }

    #[test]
    fn test_report_json() {
        let report = json!({"status": "available", "id": "abc"});
        let mut out = Vec::new();
        write_report(
            &mut out,
            report.as_object().unwrap(),
            &OutputCtx::new(OutputFormat::Json),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n  \"id\": \"abc\",\n  \"status\": \"available\"\n}\n"
        );
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!(null)), "-");
        assert_eq!(render_value(&json!("x")), "x");
        assert_eq!(render_value(&json!(["/a", "/b"])), "/a\n/b");
        assert_eq!(render_value(&json!([])), "[]");
        assert_eq!(render_value(&json!({"k": 1})), "{\"k\":1}");
        assert_eq!(render_value(&json!(false)), "false");
    }
}
