//! Diagnostic types for analysis results

use crate::pointer::Pointer;
use crate::reader::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Category of a document problem found while reading or building the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemKind {
    /// Unparsable bytes; the tree is partial or empty
    Syntax,
    /// A key repeated within one map; the first occurrence is kept
    DuplicateKey,
    /// Node does not match its grammar shape
    Shape,
    /// `$ref` target does not exist in the document
    UnresolvedReference,
    /// `$ref` chain revisits a pointer already being resolved
    CircularReference,
    /// Root has neither `swagger: "2.0"` nor `openapi: "3.x"`
    UnknownVersion,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::Syntax => write!(f, "syntax"),
            ProblemKind::DuplicateKey => write!(f, "duplicate-key"),
            ProblemKind::Shape => write!(f, "shape"),
            ProblemKind::UnresolvedReference => write!(f, "unresolved-reference"),
            ProblemKind::CircularReference => write!(f, "circular-reference"),
            ProblemKind::UnknownVersion => write!(f, "unknown-version"),
        }
    }
}

/// A recoverable problem in the analysed document.
///
/// The pointer always resolves to a node of the built tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub kind: ProblemKind,
    pub pointer: Pointer,
    pub message: String,
    pub span: Span,
}

impl ValidationError {
    pub fn new(kind: ProblemKind, pointer: Pointer, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            pointer,
            message: message.into(),
            span,
        }
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == ProblemKind::Syntax
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} ({})",
            self.span.start.line, self.span.start.column, self.message, self.kind
        )
    }
}

/// Text range in a file, as consumed by issue sinks.
///
/// Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub file: PathBuf,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl TextRange {
    pub fn new(file: PathBuf, span: &Span) -> Self {
        Self {
            file,
            start_line: span.start.line,
            start_column: span.start.column,
            end_line: span.end.line,
            end_column: span.end.column,
        }
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file.display(),
            self.start_line,
            self.start_column
        )
    }
}

/// A document problem reported to the user apart from rule issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisError {
    pub file: PathBuf,
    /// 1-based
    pub line: usize,
    /// 0-based
    pub column: usize,
    pub message: String,
}

impl AnalysisError {
    pub fn new(file: PathBuf, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            file,
            line,
            column,
            message: message.into(),
        }
    }

    pub fn from_validation(file: PathBuf, error: &ValidationError) -> Self {
        Self::new(
            file,
            error.span.start.line,
            error.span.start.column,
            error.message.clone(),
        )
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

/// Secondary location of a rendered diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryLocation {
    pub range: TextRange,
    pub message: String,
}

/// A rule finding translated to file coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule key that triggered this diagnostic
    pub rule_key: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Pointer of the primary location
    pub pointer: String,
    /// Primary location
    pub range: TextRange,
    /// Secondary locations forming a flow
    #[serde(default)]
    pub flows: Vec<SecondaryLocation>,
    /// Remediation gap
    #[serde(default)]
    pub gap: Option<f64>,
}

impl Diagnostic {
    pub fn new(rule_key: &str, severity: Severity, message: &str, pointer: &Pointer, range: TextRange) -> Self {
        Self {
            rule_key: rule_key.to_string(),
            severity,
            message: message.to_string(),
            pointer: pointer.to_string(),
            range,
            flows: Vec::new(),
            gap: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Position;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("hint".parse::<Severity>(), Ok(Severity::Info));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_text_range_from_span() {
        let span = Span::new(0, Position::new(6, 2, 40), Position::new(6, 15, 53));
        let range = TextRange::new(PathBuf::from("api.yaml"), &span);
        assert_eq!(range.start_line, 6);
        assert_eq!(range.start_column, 2);
        assert_eq!(range.end_column, 15);
        assert_eq!(range.to_string(), "api.yaml:6:2");
    }

    #[test]
    fn test_validation_error_display() {
        let span = Span::new(0, Position::new(3, 2, 10), Position::new(3, 8, 16));
        let err = ValidationError::new(
            ProblemKind::Shape,
            Pointer::parse("/info"),
            "Missing required properties: [version]",
            span,
        );
        assert_eq!(
            err.to_string(),
            "3:2: Missing required properties: [version] (shape)"
        );
    }
}
