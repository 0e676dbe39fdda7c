//! JSON output formatter

use super::OutputFormatter;
use crate::diagnostic::{AnalysisError, Diagnostic, SecondaryLocation};
use crate::engine::{AnalysisResult, PassState};
use crate::metrics::Measures;
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_default()
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    files: Vec<JsonFile<'a>>,
    summary: JsonSummary<'a>,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    state: PassState,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    diagnostics: Vec<JsonDiagnostic<'a>>,
    analysis_errors: &'a [AnalysisError],
    measures: &'a Measures,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    rule_key: &'a str,
    severity: String,
    message: &'a str,
    pointer: &'a str,
    file: String,
    line: usize,
    column: usize,
    end_line: usize,
    end_column: usize,
    #[serde(skip_serializing_if = "no_flows")]
    flows: &'a [SecondaryLocation],
    #[serde(skip_serializing_if = "Option::is_none")]
    gap: Option<f64>,
}

fn no_flows(flows: &&[SecondaryLocation]) -> bool {
    flows.is_empty()
}

impl<'a> From<&'a Diagnostic> for JsonDiagnostic<'a> {
    fn from(d: &'a Diagnostic) -> Self {
        Self {
            rule_key: &d.rule_key,
            severity: d.severity.to_string(),
            message: &d.message,
            pointer: &d.pointer,
            file: d.range.file.display().to_string(),
            line: d.range.start_line,
            column: d.range.start_column,
            end_line: d.range.end_line,
            end_column: d.range.end_column,
            flows: &d.flows,
            gap: d.gap,
        }
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    files_processed: usize,
    files_skipped: usize,
    files_failed: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    analysis_error_count: usize,
    measures: &'a Measures,
    duration_ms: u128,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &AnalysisResult) -> String {
        let files = result
            .files
            .iter()
            .filter(|f| !f.skipped)
            .map(|f| JsonFile {
                path: f.path.display().to_string(),
                state: f.state,
                version: f.version.map(|v| v.to_string()),
                diagnostics: f.diagnostics.iter().map(JsonDiagnostic::from).collect(),
                analysis_errors: &f.analysis_errors,
                measures: &f.measures,
            })
            .collect();

        let output = JsonOutput {
            files,
            summary: JsonSummary {
                files_processed: result.files_processed,
                files_skipped: result.files_skipped,
                files_failed: result.files_failed,
                error_count: result.error_count,
                warning_count: result.warning_count,
                info_count: result.info_count,
                analysis_error_count: result.analysis_error_count,
                measures: &result.measures,
                duration_ms: result.duration.as_millis(),
            },
        };

        self.render(&output)
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        self.render(&JsonDiagnostic::from(diagnostic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Severity, TextRange};
    use crate::pointer::Pointer;
    use std::path::PathBuf;

    fn diagnostic() -> Diagnostic {
        Diagnostic::new(
            "allowed-methods",
            Severity::Error,
            "Use the only methods allowed",
            &Pointer::parse("/paths/~1a/get"),
            TextRange {
                file: PathBuf::from("api.yaml"),
                start_line: 7,
                start_column: 4,
                end_line: 7,
                end_column: 7,
            },
        )
    }

    #[test]
    fn test_json_format_diagnostic() {
        let output = JsonFormatter::new().format_diagnostic(&diagnostic());
        assert!(output.contains("\"rule_key\":\"allowed-methods\""));
        assert!(output.contains("\"severity\":\"error\""));
        assert!(output.contains("\"pointer\":\"/paths/~1a/get\""));
        assert!(output.contains("\"line\":7"));
        assert!(!output.contains("flows"));
    }

    #[test]
    fn test_json_format_result() {
        let result = AnalysisResult {
            files_processed: 5,
            error_count: 2,
            warning_count: 3,
            ..Default::default()
        };

        let output = JsonFormatter::new().format(&result);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["files_processed"], 5);
        assert_eq!(value["summary"]["error_count"], 2);
        assert_eq!(value["summary"]["warning_count"], 3);
        assert!(value["files"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_json_pretty() {
        let output = JsonFormatter::new().pretty().format_diagnostic(&diagnostic());
        assert!(output.contains('\n'));
    }
}
