//! oaslint - OpenAPI/Swagger contract analyser
//!
//! Validates Swagger 2.0 and OpenAPI 3.x documents against a versioned
//! grammar and a catalog of rules, producing located issues and metrics.
//!
//! # Architecture
//!
//! ```text
//! bytes -> reader (RawValue + spans) -> tree (typed Pointer Tree)
//!       -> engine (single-pass rule dispatch + metrics) -> issues, measures
//! ```
//!
//! # Writing a rule
//!
//! ```
//! use oaslint::grammar::{v2, NodeKind};
//! use oaslint::rule::{Issue, Rule, RuleError};
//! use oaslint::tree::Node;
//!
//! struct SummaryRequired;
//!
//! impl Rule for SummaryRequired {
//!     fn key(&self) -> &'static str {
//!         "summary-required"
//!     }
//!
//!     fn description(&self) -> &'static str {
//!         "Operations must have a summary"
//!     }
//!
//!     fn subscribed_kinds(&self) -> Vec<NodeKind> {
//!         vec![v2::Kind::Operation.into()]
//!     }
//!
//!     fn visit(&mut self, node: Node<'_>) -> Result<Vec<Issue>, RuleError> {
//!         if node.at("summary").is_missing() {
//!             return Ok(vec![Issue::at(&node, "Add a summary")]);
//!         }
//!         Ok(Vec::new())
//!     }
//! }
//! ```

pub mod checks;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod grammar;
pub mod metrics;
pub mod output;
pub mod pointer;
pub mod reader;
pub mod rule;
pub mod tree;
pub mod verifier;

// Re-export main types
pub use config::Config;
pub use diagnostic::{AnalysisError, Diagnostic, ProblemKind, Severity, TextRange, ValidationError};
pub use engine::{AnalysisResult, CancelFlag, Engine, FileResult, PassState, RuleSet, RuleTiming};
pub use grammar::{NodeKind, Version};
pub use metrics::{collect as collect_metrics, Measures, MetricKey};
pub use pointer::Pointer;
pub use rule::{Issue, Rule, RuleError, RuleParams};
pub use tree::{Document, Node};
