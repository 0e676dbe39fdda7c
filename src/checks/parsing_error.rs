use super::PARSING_ERROR_KEY;
use crate::diagnostic::Severity;
use crate::grammar::NodeKind;
use crate::rule::{Issue, Rule, RuleError};
use crate::tree::{Document, Node};

/// Reports every problem found while reading and typing the document
#[derive(Debug, Default)]
pub struct ParsingError;

impl Rule for ParsingError {
    fn key(&self) -> &'static str {
        PARSING_ERROR_KEY
    }

    fn description(&self) -> &'static str {
        "Documents must be well-formed and match their grammar"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn subscribed_kinds(&self) -> Vec<NodeKind> {
        Vec::new()
    }

    fn visit_document(&mut self, document: &Document) -> Result<Vec<Issue>, RuleError> {
        Ok(document
            .errors()
            .iter()
            .map(|e| Issue::new(e.pointer.clone(), e.message.clone()))
            .collect())
    }

    fn visit(&mut self, _node: Node<'_>) -> Result<Vec<Issue>, RuleError> {
        Ok(Vec::new())
    }
}
