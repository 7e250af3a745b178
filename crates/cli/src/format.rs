//! Output formatting for reports and errors.

use ccsim_core::StatusReport;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Render the final report.
pub fn format_report(report: &StatusReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => report.to_string(),
        OutputMode::Json => serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!("{{\"error\": \"report serialization failed: {}\"}}", e)),
    }
}

/// Render an error, including its chain of causes.
pub fn format_error(err: &anyhow::Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!("(error) {:#}", err),
        OutputMode::Json => serde_json::json!({ "error": format!("{:#}", err) }).to_string(),
    }
}
