//! CSV export of a session's committed splits.
//!
//! Rows are in commit order (oldest first), the reverse of the display order.

use std::path::Path;

use crate::clock::format_hms;
use crate::error::{SessionError, SessionResult};
use crate::ledger::SplitEntry;
use crate::logging::{log, obj, v_str, Domain, Level};

pub const EXPORT_HEADER: &str = "split,segment_time,rta_time";

/// Quote a field containing a comma, quote or newline; inner quotes are doubled.
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Milliseconds as seconds with exactly three decimals.
pub fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

pub fn export_row(entry: &SplitEntry) -> String {
    format!(
        "{},{},{}",
        escape_field(&entry.name),
        format_seconds(entry.segment_ms),
        format_hms(entry.clock_seconds_at_commit)
    )
}

pub fn export_history(entries: &[SplitEntry]) -> String {
    let mut out = String::from(EXPORT_HEADER);
    out.push('\n');
    for entry in entries {
        out.push_str(&export_row(entry));
        out.push('\n');
    }
    out
}

pub fn write_export(path: &Path, text: &str) -> SessionResult<()> {
    std::fs::write(path, text).map_err(|e| SessionError::Export {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    log(
        Level::Info,
        Domain::Export,
        "exported",
        obj(&[
            ("path", v_str(&path.display().to_string())),
            ("rows", serde_json::json!(text.lines().count().saturating_sub(1))),
        ]),
    );
    Ok(())
}
