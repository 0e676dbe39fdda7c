//! Verification harness for rules
//!
//! A fixture is an ordinary document annotated with comments:
//!
//! ```yaml
//! paths:
//!   /pets/mine: # Noncompliant {{Declare '/pets/mine' before '/pets/{id}', which masks it.}}
//! ```
//!
//! `# Noncompliant` expects one issue whose primary location starts on the
//! line of the comment. `@+N` / `@-N` shifts the expected line, and each
//! `{{message}}` expects one issue with exactly that message. The rule is
//! run through the same dispatcher the engine uses; every issue must be
//! expected and every expectation met.

use crate::engine::RuleSet;
use crate::rule::Rule;
use crate::tree::{Document, LocateError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use thiserror::Error;

static NONCOMPLIANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s*Noncompliant\b(.*)$").expect("valid annotation pattern"));

static OFFSET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@([+-]\d+)").expect("valid offset pattern"));

static MESSAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid message pattern"));

/// Verification failure
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid annotation: {text}")]
    InvalidAnnotation { line: usize, text: String },

    #[error("issue cannot be located: {0}")]
    Locate(#[from] LocateError),

    #[error("{}", format_mismatch(.missing, .unexpected))]
    Mismatch {
        missing: Vec<Expected>,
        unexpected: Vec<Expected>,
    },
}

fn format_mismatch(missing: &[Expected], unexpected: &[Expected]) -> String {
    let mut out = String::from("rule issues do not match the fixture");
    for e in missing {
        out.push_str(&format!("\n  missing:    {}", e));
    }
    for e in unexpected {
        out.push_str(&format!("\n  unexpected: {}", e));
    }
    out
}

/// An expected (or actual) issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    /// 1-based line of the primary location
    pub line: usize,
    /// `None` accepts any message
    pub message: Option<String>,
}

impl Expected {
    fn accepts(&self, actual: &Expected) -> bool {
        self.line == actual.line && self.message.as_ref().map_or(true, |m| Some(m) == actual.message.as_ref())
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "line {}: {}", self.line, m),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// Collect the expectations of an annotated fixture
pub fn expectations(content: &str) -> Result<Vec<Expected>, VerifyError> {
    let mut expected = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let Some(caps) = NONCOMPLIANT.captures(line) else {
            continue;
        };
        let rest = caps.get(1).map_or("", |m| m.as_str());
        let number = index + 1;

        let target = match OFFSET.captures(rest) {
            Some(offset) => {
                let delta: i64 = offset[1].parse().map_err(|_| VerifyError::InvalidAnnotation {
                    line: number,
                    text: rest.trim().to_string(),
                })?;
                let shifted = number as i64 + delta;
                if shifted < 1 {
                    return Err(VerifyError::InvalidAnnotation {
                        line: number,
                        text: rest.trim().to_string(),
                    });
                }
                shifted as usize
            }
            None => number,
        };

        let messages: Vec<String> = MESSAGE.captures_iter(rest).map(|c| c[1].to_string()).collect();
        if messages.is_empty() {
            expected.push(Expected {
                line: target,
                message: None,
            });
        } else {
            expected.extend(messages.into_iter().map(|m| Expected {
                line: target,
                message: Some(m),
            }));
        }
    }
    Ok(expected)
}

/// Run `rule` over an annotated fixture and compare its issues
pub fn verify_str(content: &str, rule: Box<dyn Rule>) -> Result<(), VerifyError> {
    verify_document(&Document::parse(content, "fixture.yaml"), rule)
}

/// Like [`verify_str`] for a fixture on disk
pub fn verify(path: &Path, rule: Box<dyn Rule>) -> Result<(), VerifyError> {
    let content = std::fs::read_to_string(path)?;
    verify_document(&Document::parse(&content, path), rule)
}

fn verify_document(document: &Document, rule: Box<dyn Rule>) -> Result<(), VerifyError> {
    let mut missing = expectations(document.text())?;

    let mut set = RuleSet::new(vec![rule]);
    let mut unexpected = Vec::new();
    for found in set.run(document) {
        let range = document.locate(&found.issue.primary)?;
        let actual = Expected {
            line: range.start_line,
            message: Some(found.issue.message),
        };
        match missing.iter().position(|e| e.accepts(&actual)) {
            Some(index) => {
                missing.remove(index);
            }
            None => unexpected.push(actual),
        }
    }

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(VerifyError::Mismatch { missing, unexpected })
    }
}

/// Panicking form of [`verify_str`] for use in tests
pub fn assert_verified(content: &str, rule: Box<dyn Rule>) {
    if let Err(e) = verify_str(content, rule) {
        panic!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{v2, NodeKind};
    use crate::rule::{Issue, RuleError};
    use crate::tree::Node;

    struct InfoRule;

    impl Rule for InfoRule {
        fn key(&self) -> &'static str {
            "info"
        }

        fn description(&self) -> &'static str {
            "Flags info"
        }

        fn subscribed_kinds(&self) -> Vec<NodeKind> {
            vec![v2::Kind::Info.into()]
        }

        fn visit(&mut self, node: Node<'_>) -> Result<Vec<Issue>, RuleError> {
            Ok(vec![Issue::at(&node, "info found")])
        }
    }

    const DOC: &str = "swagger: '2.0'\ninfo: # Noncompliant {{info found}}\n  title: t\n  version: '1'\npaths: {}\n";

    #[test]
    fn test_expectations() {
        let content = "a: 1 # Noncompliant\n# Noncompliant@+1 {{one}} {{two}}\nb: 2\nc: 3 # Noncompliant @-2\n";
        let expected = expectations(content).unwrap();
        assert_eq!(
            expected,
            vec![
                Expected { line: 1, message: None },
                Expected { line: 3, message: Some("one".to_string()) },
                Expected { line: 3, message: Some("two".to_string()) },
                Expected { line: 2, message: None },
            ]
        );
    }

    #[test]
    fn test_offset_before_first_line() {
        assert!(matches!(
            expectations("# Noncompliant @-3\n"),
            Err(VerifyError::InvalidAnnotation { line: 1, .. })
        ));
    }

    #[test]
    fn test_verified() {
        assert!(verify_str(DOC, Box::new(InfoRule)).is_ok());
    }

    #[test]
    fn test_wrong_message() {
        let doc = DOC.replace("info found", "other");
        match verify_str(&doc, Box::new(InfoRule)) {
            Err(VerifyError::Mismatch { missing, unexpected }) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(unexpected, vec![Expected { line: 2, message: Some("info found".to_string()) }]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_issue() {
        let doc = DOC.replace(" # Noncompliant {{info found}}", "");
        let err = verify_str(&doc, Box::new(InfoRule)).unwrap_err();
        assert!(err.to_string().contains("unexpected: line 2: info found"));
    }

    #[test]
    fn test_verify_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.yaml");
        std::fs::write(&path, DOC).unwrap();
        assert!(verify(&path, Box::new(InfoRule)).is_ok());
        assert!(matches!(
            verify(&dir.path().join("absent.yaml"), Box::new(InfoRule)),
            Err(VerifyError::Io(_))
        ));
    }
}
