//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::{AnalysisResult, FileResult};
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show secondary locations
    pub show_flows: bool,

    /// Show the measures of each file
    pub show_metrics: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_flows: true,
            show_metrics: false,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Info => s.blue(),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.colored {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_file(&self, file: &FileResult) -> String {
        let mut output = String::new();
        if self.colored {
            output.push_str(&format!("{}\n", file.path.display().to_string().underline()));
        } else {
            output.push_str(&format!("{}\n", file.path.display()));
        }

        for error in &file.analysis_errors {
            output.push_str(&format!(
                "{}:{}:{}: {}: {}\n",
                error.file.display(),
                error.line,
                error.column,
                self.paint("analysis error", Color::Magenta),
                error.message
            ));
        }
        for diag in &file.diagnostics {
            output.push_str(&self.format_diagnostic(diag));
        }

        if self.show_metrics {
            let measures: Vec<String> = file
                .measures
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            output.push_str(&format!(
                "   {} metrics: {} (complexity {})\n",
                self.paint("=", Color::Blue),
                measures.join(" "),
                file.measures.rating()
            ));
        }
        output
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{} {}", count, if count == 1 { one } else { many })
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &AnalysisResult) -> String {
        let mut output = String::new();

        for file in &result.files {
            let quiet = file.diagnostics.is_empty() && file.analysis_errors.is_empty();
            if file.skipped || (quiet && !self.show_metrics) {
                continue;
            }
            output.push_str(&self.format_file(file));
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&format!(
                "{} processed",
                plural(result.files_processed, "file", "files")
            ));
            if result.files_skipped > 0 {
                output.push_str(&format!(", {} skipped", result.files_skipped));
            }

            let mut counts = Vec::new();
            if result.error_count > 0 {
                counts.push(self.paint(&plural(result.error_count, "error", "errors"), Color::Red));
            }
            if result.warning_count > 0 {
                counts.push(self.paint(&plural(result.warning_count, "warning", "warnings"), Color::Yellow));
            }
            if result.info_count > 0 {
                counts.push(self.paint(&plural(result.info_count, "info", "infos"), Color::Blue));
            }
            if result.analysis_error_count > 0 {
                counts.push(self.paint(
                    &plural(result.analysis_error_count, "analysis error", "analysis errors"),
                    Color::Magenta,
                ));
            }
            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            if self.show_metrics && !result.measures.is_empty() {
                let totals: Vec<String> = result
                    .measures
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect();
                output.push_str(&format!("Totals: {}\n", totals.join(" ")));
            }

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let mut output = format!(
            "{}: {}[{}]: {}\n",
            diag.range,
            self.severity_str(diag.severity),
            self.paint(&diag.rule_key, Color::Cyan),
            diag.message
        );

        if self.show_flows {
            for flow in &diag.flows {
                output.push_str(&format!(
                    "   {} {}: {}\n",
                    self.paint("|", Color::Blue),
                    flow.range,
                    flow.message
                ));
            }
        }

        output
    }
}
