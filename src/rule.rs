//! Rule contract
//!
//! A rule subscribes to node kinds and is handed each node of those kinds
//! during the single traversal of a document. Rules see the tree through
//! read-only [`Node`] handles and report [`Issue`]s addressed by pointer.

use crate::diagnostic::Severity;
use crate::grammar::NodeKind;
use crate::pointer::Pointer;
use crate::tree::{Document, Node};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Rule configuration or execution failure
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid value for parameter '{param}' of rule {rule}: {message}")]
    InvalidParam {
        rule: String,
        param: String,
        message: String,
    },

    #[error("unknown rule: {0}")]
    UnknownRule(String),

    #[error("{0}")]
    Failed(String),
}

/// Secondary location of an issue
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub pointer: Pointer,
    pub message: String,
}

/// A finding reported by a rule
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub message: String,
    pub primary: Pointer,
    pub flows: Vec<Flow>,
    pub gap: Option<f64>,
}

impl Issue {
    pub fn new(primary: Pointer, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            primary,
            flows: Vec::new(),
            gap: None,
        }
    }

    /// Issue located on `node`
    pub fn at(node: &Node<'_>, message: impl Into<String>) -> Self {
        Self::new(node.pointer().clone(), message)
    }

    pub fn with_secondary(mut self, node: &Node<'_>, message: impl Into<String>) -> Self {
        self.flows.push(Flow {
            pointer: node.pointer().clone(),
            message: message.into(),
        });
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = Some(gap);
        self
    }
}

/// Opaque rule properties supplied by the activation layer
#[derive(Debug, Clone, Default)]
pub struct RuleParams {
    rule: String,
    values: HashMap<String, serde_yaml::Value>,
}

impl RuleParams {
    pub fn new(rule: &str, values: HashMap<String, serde_yaml::Value>) -> Self {
        Self {
            rule: rule.to_string(),
            values,
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn invalid(&self, param: &str, message: impl Into<String>) -> RuleError {
        RuleError::InvalidParam {
            rule: self.rule.clone(),
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// String property; numbers and booleans are rendered as text
    pub fn string(&self, name: &str) -> Result<Option<String>, RuleError> {
        match self.values.get(name) {
            None | Some(serde_yaml::Value::Null) => Ok(None),
            Some(serde_yaml::Value::String(s)) => Ok(Some(s.clone())),
            Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
            Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(self.invalid(name, "expected a string")),
        }
    }

    /// List property: a sequence of strings or a comma-separated string
    pub fn list(&self, name: &str) -> Result<Option<Vec<String>>, RuleError> {
        match self.values.get(name) {
            Some(serde_yaml::Value::Sequence(items)) => items
                .iter()
                .map(|v| match v {
                    serde_yaml::Value::String(s) => Ok(s.clone()),
                    _ => Err(self.invalid(name, "expected a list of strings")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            _ => Ok(self.string(name)?.map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })),
        }
    }

    /// Regular expression property
    pub fn regex(&self, name: &str) -> Result<Option<Regex>, RuleError> {
        match self.string(name)? {
            Some(pattern) => Regex::new(&pattern)
                .map(Some)
                .map_err(|e| self.invalid(name, e.to_string())),
            None => Ok(None),
        }
    }
}

/// A semantic check run over the document tree.
///
/// A fresh instance is created for every document pass, so fields may
/// accumulate state for the current document only.
pub trait Rule: Send {
    /// Unique rule key (e.g., "allowed-methods")
    fn key(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Default severity of the rule's issues
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    /// Node kinds whose nodes are passed to [`Rule::visit`]
    fn subscribed_kinds(&self) -> Vec<NodeKind>;

    /// Apply rule properties; called before the pass starts
    fn configure(&mut self, params: &RuleParams) -> Result<(), RuleError> {
        let _ = params;
        Ok(())
    }

    /// Called once per document, before the traversal
    fn visit_document(&mut self, document: &Document) -> Result<Vec<Issue>, RuleError> {
        let _ = document;
        Ok(Vec::new())
    }

    /// Called for every node of a subscribed kind, in pre-order
    fn visit(&mut self, node: Node<'_>) -> Result<Vec<Issue>, RuleError>;
}

/// Catalog entry: how to create a rule
#[derive(Clone, Copy)]
pub struct RuleSpec {
    pub key: &'static str,
    pub factory: fn() -> Box<dyn Rule>,
}

impl RuleSpec {
    pub fn create(&self) -> Box<dyn Rule> {
        (self.factory)()
    }
}

impl fmt::Debug for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSpec").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_string_and_list() {
        let params = RuleParams::new("r", HashMap::new())
            .with("pattern", "get|post")
            .with("limit", 3)
            .with("methods", "get, post ,,put");
        assert_eq!(params.string("pattern").unwrap().as_deref(), Some("get|post"));
        assert_eq!(params.string("limit").unwrap().as_deref(), Some("3"));
        assert_eq!(params.string("absent").unwrap(), None);
        assert_eq!(
            params.list("methods").unwrap().unwrap(),
            vec!["get", "post", "put"]
        );
    }

    #[test]
    fn test_params_list_from_sequence() {
        let seq = serde_yaml::Value::Sequence(vec!["a".into(), "b".into()]);
        let params = RuleParams::default().with("items", seq);
        assert_eq!(params.list("items").unwrap().unwrap(), vec!["a", "b"]);

        let bad = serde_yaml::Value::Sequence(vec![1.into()]);
        let params = RuleParams::default().with("items", bad);
        assert!(params.list("items").is_err());
    }

    #[test]
    fn test_params_regex() {
        let params = RuleParams::new("allowed-methods", HashMap::new())
            .with("ok", "^(get|put)$")
            .with("bad", "(unclosed");
        assert!(params.regex("ok").unwrap().unwrap().is_match("get"));
        let err = params.regex("bad").unwrap_err();
        assert!(err.to_string().contains("parameter 'bad' of rule allowed-methods"));
    }

    #[test]
    fn test_issue_builders() {
        let issue = Issue::new(Pointer::parse("/paths/~1a"), "msg").with_gap(2.5);
        assert_eq!(issue.primary.to_string(), "/paths/~1a");
        assert_eq!(issue.gap, Some(2.5));
        assert!(issue.flows.is_empty());
    }
}
