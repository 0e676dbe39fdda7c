//! Output formatters for analysis results

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::{ColorMode, OutputConfig, OutputFormat};
use crate::diagnostic::Diagnostic;
use crate::engine::AnalysisResult;
use std::io::IsTerminal;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire analysis result
    fn format(&self, result: &AnalysisResult) -> String;

    /// Format a single diagnostic
    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String;
}

/// Formatter selected by the output settings
pub fn formatter(config: &OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => {
            let colored = match config.color {
                ColorMode::Always => true,
                ColorMode::Never => false,
                ColorMode::Auto => std::io::stdout().is_terminal(),
            };
            let mut text = TextFormatter::new();
            text.colored = colored;
            text.show_metrics = config.metrics;
            Box::new(text)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    }
}
