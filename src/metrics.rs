//! Document metrics
//!
//! Counts paths, operations and schemas, computes a complexity score and
//! derives comment/code line counts from the spans of the built tree.

use crate::tree::{Document, Node};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Metric identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKey {
    PathsCount,
    OperationsCount,
    SchemasCount,
    Complexity,
    CommentLines,
    CodeLines,
}

impl MetricKey {
    pub const ALL: [MetricKey; 6] = [
        MetricKey::PathsCount,
        MetricKey::OperationsCount,
        MetricKey::SchemasCount,
        MetricKey::Complexity,
        MetricKey::CommentLines,
        MetricKey::CodeLines,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetricKey::PathsCount => "paths-count",
            MetricKey::OperationsCount => "operations-count",
            MetricKey::SchemasCount => "schemas-count",
            MetricKey::Complexity => "complexity",
            MetricKey::CommentLines => "comment-lines",
            MetricKey::CodeLines => "code-lines",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

/// Complexity rating levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityRating {
    /// Simple, easy to maintain (1-10)
    Low,
    /// Moderate complexity (11-20)
    Moderate,
    /// High complexity (21-50)
    High,
    /// Very high complexity (51+)
    VeryHigh,
}

impl fmt::Display for ComplexityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityRating::Low => write!(f, "low"),
            ComplexityRating::Moderate => write!(f, "moderate"),
            ComplexityRating::High => write!(f, "high"),
            ComplexityRating::VeryHigh => write!(f, "very high"),
        }
    }
}

/// Metric values of one document (or a sum over several)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Measures(BTreeMap<MetricKey, u64>);

impl Measures {
    pub fn get(&self, key: MetricKey) -> u64 {
        self.0.get(&key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: MetricKey, value: u64) {
        self.0.insert(key, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, u64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Add every value of `other` to this one
    pub fn merge(&mut self, other: &Measures) {
        for (key, value) in other.iter() {
            *self.0.entry(key).or_insert(0) += value;
        }
    }

    pub fn rating(&self) -> ComplexityRating {
        match self.get(MetricKey::Complexity) {
            0..=10 => ComplexityRating::Low,
            11..=20 => ComplexityRating::Moderate,
            21..=50 => ComplexityRating::High,
            _ => ComplexityRating::VeryHigh,
        }
    }
}

/// Accumulates metrics while nodes are visited in pre-order
#[derive(Debug, Default)]
pub struct MetricsCollector {
    paths: u64,
    operations: u64,
    schemas: u64,
    decision_points: u64,
    code_lines: BTreeSet<usize>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit(&mut self, node: &Node<'_>) {
        self.track_lines(node);

        let Some(kind) = node.kind() else {
            return;
        };
        if kind.is_path() {
            self.paths += 1;
        }
        if kind.is_operation() {
            self.operations += 1;
        }
        if kind.is_schema() {
            self.schemas += 1;
        }

        // A reference node's branches are counted where its target is declared
        if node.is_ref() {
            return;
        }
        if kind.is_security() {
            self.decision_points += extra(node.elements().len());
        }
        if kind.declares_enum() {
            self.decision_points += extra(node.at("enum").elements().len());
        }
        if kind.is_schema() {
            self.decision_points += node.at("oneOf").elements().len() as u64;
            self.decision_points += node.at("anyOf").elements().len() as u64;
            if !node.at("not").is_missing() {
                self.decision_points += 1;
            }
        }
    }

    fn track_lines(&mut self, node: &Node<'_>) {
        if let Some(key) = node.key_span().filter(|s| !s.is_empty()) {
            self.code_lines.extend(key.lines());
        }
        let Some(span) = node.span().filter(|s| !s.is_empty()) else {
            return;
        };
        if node.children().is_empty() {
            self.code_lines.extend(span.lines());
        } else {
            self.code_lines.insert(span.start.line);
            self.code_lines.insert(span.end.line);
        }
    }

    pub fn finish(self, document: &Document) -> Measures {
        let comment_lines = document
            .text()
            .lines()
            .enumerate()
            .filter(|(i, line)| {
                line.trim_start().starts_with('#') && !self.code_lines.contains(&(i + 1))
            })
            .count() as u64;

        let mut measures = Measures::default();
        measures.set(MetricKey::PathsCount, self.paths);
        measures.set(MetricKey::OperationsCount, self.operations);
        measures.set(MetricKey::SchemasCount, self.schemas);
        measures.set(MetricKey::Complexity, self.decision_points + 1);
        measures.set(MetricKey::CommentLines, comment_lines);
        measures.set(MetricKey::CodeLines, self.code_lines.len() as u64);
        measures
    }
}

/// Alternatives beyond the first
fn extra(count: usize) -> u64 {
    count.saturating_sub(1) as u64
}

/// Compute the metrics of a document in a standalone traversal
pub fn collect(document: &Document) -> Measures {
    let mut collector = MetricsCollector::new();
    for node in document.walk() {
        collector.visit(&node);
    }
    collector.finish(document)
}
