//! Analysis engine
//!
//! [`RuleSet`] is the single-pass dispatcher: a registry from node kind to
//! the rules subscribed to it, consulted for every node of one pre-order
//! traversal. [`Engine`] wraps it with configuration, file reading, issue
//! location and parallel multi-file analysis.

use crate::checks::builtin_rules;
use crate::config::Config;
use crate::diagnostic::{AnalysisError, Diagnostic, SecondaryLocation, Severity, TextRange};
use crate::grammar::{self, NodeKind, Version};
use crate::metrics::{Measures, MetricsCollector};
use crate::pointer::Pointer;
use crate::rule::{Issue, Rule, RuleError, RuleSpec};
use crate::tree::{Document, Node};
use log::{debug, trace, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rule key of diagnostics produced when a rule fails
pub const FAULT_RULE_KEY: &str = "rule-execution-fault";

/// Lifecycle of one document pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassState {
    Idle,
    TreeBuilt,
    Traversing,
    Done,
    /// The document could not be read
    Failed,
}

impl PassState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Done | PassState::Failed)
    }

    fn can_move_to(self, next: PassState) -> bool {
        matches!(
            (self, next),
            (PassState::Idle, PassState::TreeBuilt)
                | (PassState::Idle, PassState::Failed)
                | (PassState::TreeBuilt, PassState::Traversing)
                | (PassState::Traversing, PassState::Done)
        )
    }

    fn advance(&mut self, next: PassState, path: &Path) {
        debug_assert!(self.can_move_to(next), "{} -> {}", self, next);
        trace!("{}: {} -> {}", path.display(), self, next);
        *self = next;
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassState::Idle => write!(f, "idle"),
            PassState::TreeBuilt => write!(f, "tree-built"),
            PassState::Traversing => write!(f, "traversing"),
            PassState::Done => write!(f, "done"),
            PassState::Failed => write!(f, "failed"),
        }
    }
}

/// Cooperative cancellation, checked before each document
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-rule timing statistics
#[derive(Debug, Clone, Default)]
pub struct RuleTiming {
    /// Rule key
    pub rule_key: String,
    /// Total time spent in the rule's visits
    pub total_time: Duration,
    /// Number of nodes handed to the rule
    pub evaluation_count: usize,
    /// Number of issues reported
    pub issue_count: usize,
}

impl RuleTiming {
    pub fn new(rule_key: &str) -> Self {
        Self {
            rule_key: rule_key.to_string(),
            ..Default::default()
        }
    }

    /// Average time per visit
    pub fn avg_time(&self) -> Duration {
        if self.evaluation_count > 0 {
            self.total_time / self.evaluation_count as u32
        } else {
            Duration::ZERO
        }
    }
}

/// An issue tagged with the rule that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RuleIssue {
    pub rule_key: &'static str,
    pub severity: Severity,
    pub issue: Issue,
    /// The rule failed; the issue describes the failure
    pub fault: bool,
}

/// Activated rules plus the kind-keyed dispatch registry
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
    registry: HashMap<NodeKind, Vec<usize>>,
    timings: HashMap<String, RuleTiming>,
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        let mut registry: HashMap<NodeKind, Vec<usize>> = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            for kind in rule.subscribed_kinds() {
                let subscribers = registry.entry(kind).or_default();
                if !subscribers.contains(&index) {
                    subscribers.push(index);
                }
            }
        }
        Self {
            rules,
            registry,
            timings: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.key())
    }

    /// Rule indices subscribed to `kind`, in activation order
    pub fn subscribers(&self, kind: NodeKind) -> &[usize] {
        self.registry.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn into_timings(self) -> HashMap<String, RuleTiming> {
        self.timings
    }

    /// Run every rule over the document in one pre-order traversal
    pub fn run(&mut self, document: &Document) -> Vec<RuleIssue> {
        self.run_with(document, |_| {})
    }

    /// Like [`RuleSet::run`], handing every visited node to `observe` first
    pub fn run_with<F>(&mut self, document: &Document, mut observe: F) -> Vec<RuleIssue>
    where
        F: FnMut(&Node<'_>),
    {
        let mut out = Vec::new();
        let root = Pointer::root();
        for index in 0..self.rules.len() {
            self.invoke(index, &root, false, &mut out, |rule| rule.visit_document(document));
        }

        for node in document.walk() {
            observe(&node);
            let Some(kind) = node.kind() else {
                continue;
            };
            let Some(subscribers) = self.registry.get(&kind).cloned() else {
                continue;
            };
            for index in subscribers {
                trace!("{} -> {}", node.pointer(), self.rules[index].key());
                self.invoke(index, node.pointer(), true, &mut out, |rule| rule.visit(node.clone()));
            }
        }

        debug!(
            "{}: {} rule(s), {} issue(s)",
            document.path().display(),
            self.rules.len(),
            out.len()
        );
        out
    }

    fn invoke<F>(&mut self, index: usize, at: &Pointer, counted: bool, out: &mut Vec<RuleIssue>, call: F)
    where
        F: FnOnce(&mut dyn Rule) -> Result<Vec<Issue>, RuleError>,
    {
        let rule = &mut self.rules[index];
        let key = rule.key();
        let severity = rule.severity();

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(rule.as_mut())));
        let elapsed = start.elapsed();

        let timing = self
            .timings
            .entry(key.to_string())
            .or_insert_with(|| RuleTiming::new(key));
        timing.total_time += elapsed;
        if counted {
            timing.evaluation_count += 1;
        }

        let failure = match outcome {
            Ok(Ok(issues)) => {
                timing.issue_count += issues.len();
                out.extend(issues.into_iter().map(|issue| RuleIssue {
                    rule_key: key,
                    severity,
                    issue,
                    fault: false,
                }));
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        warn!("rule {} failed at '{}': {}", key, at, failure);
        out.push(RuleIssue {
            rule_key: key,
            severity: Severity::Error,
            issue: Issue::new(at.clone(), format!("Rule {} failed: {}", key, failure)),
            fault: true,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Outcome of one document pass
#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: PathBuf,
    pub state: PassState,
    /// Cancelled before the pass started
    pub skipped: bool,
    pub version: Option<Version>,
    pub diagnostics: Vec<Diagnostic>,
    pub analysis_errors: Vec<AnalysisError>,
    pub measures: Measures,
    pub timings: HashMap<String, RuleTiming>,
}

impl FileResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            state: PassState::Idle,
            skipped: false,
            version: None,
            diagnostics: Vec::new(),
            analysis_errors: Vec::new(),
            measures: Measures::default(),
            timings: HashMap::new(),
        }
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }
}

/// Result of analysing a set of files
#[derive(Debug, Default)]
pub struct AnalysisResult {
    /// Per-file results, in input order
    pub files: Vec<FileResult>,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub analysis_error_count: usize,
    /// Sum of the measures of all analysed files
    pub measures: Measures,
    pub duration: Duration,
    pub rule_timings: HashMap<String, RuleTiming>,
}

impl AnalysisResult {
    pub fn add(&mut self, file: FileResult) {
        if file.skipped {
            self.files_skipped += 1;
        } else {
            self.files_processed += 1;
        }
        if file.state == PassState::Failed {
            self.files_failed += 1;
        }
        self.error_count += file.error_count();
        self.warning_count += file.warning_count();
        self.info_count += file.info_count();
        self.analysis_error_count += file.analysis_errors.len();
        self.measures.merge(&file.measures);

        for (key, timing) in &file.timings {
            let entry = self
                .rule_timings
                .entry(key.clone())
                .or_insert_with(|| RuleTiming::new(key));
            entry.total_time += timing.total_time;
            entry.evaluation_count += timing.evaluation_count;
            entry.issue_count += timing.issue_count;
        }
        self.files.push(file);
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    pub fn analysis_errors(&self) -> impl Iterator<Item = &AnalysisError> {
        self.files.iter().flat_map(|f| f.analysis_errors.iter())
    }

    pub fn issue_count(&self) -> usize {
        self.error_count + self.warning_count + self.info_count
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0 && self.analysis_error_count == 0
    }

    /// Exit code (0 = clean, 1 = issues, 2 = analysis errors)
    pub fn exit_code(&self) -> i32 {
        if self.analysis_error_count > 0 {
            2
        } else if self.issue_count() > 0 {
            1
        } else {
            0
        }
    }

    /// Rule timings sorted by total time (descending)
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.rule_timings.values().collect();
        timings.sort_by(|a, b| {
            b.total_time
                .cmp(&a.total_time)
                .then_with(|| a.rule_key.cmp(&b.rule_key))
        });
        timings
    }

    /// Format timing statistics as a table
    pub fn format_timings(&self) -> String {
        let timings = self.sorted_timings();
        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        let mut output = String::from("Rule Timing Statistics:\n");
        output.push_str(&format!(
            "{:<32} {:>12} {:>12} {:>10} {:>8}\n",
            "Rule", "Total", "Avg", "Visits", "Issues"
        ));
        output.push_str(&"-".repeat(78));
        output.push('\n');
        for timing in timings {
            output.push_str(&format!(
                "{:<32} {:>10.2}ms {:>10.2}µs {:>10} {:>8}\n",
                timing.rule_key,
                timing.total_time.as_secs_f64() * 1000.0,
                timing.avg_time().as_secs_f64() * 1_000_000.0,
                timing.evaluation_count,
                timing.issue_count
            ));
        }
        output
    }
}

/// Configured analyser for OpenAPI documents
pub struct Engine {
    config: Config,
    catalog: Vec<RuleSpec>,
}

impl Engine {
    /// Engine running the built-in rules activated by `config`
    pub fn new(config: Config) -> Result<Self, RuleError> {
        Self::with_rules(config, builtin_rules())
    }

    /// Engine over a custom catalog. Rule parameters are validated here, so
    /// a misconfigured rule is reported before any file is analysed.
    pub fn with_rules(config: Config, catalog: Vec<RuleSpec>) -> Result<Self, RuleError> {
        grammar::init();

        for key in config.rules.params.keys() {
            if !catalog.iter().any(|spec| spec.key == key) {
                return Err(RuleError::UnknownRule(key.clone()));
            }
        }

        let catalog: Vec<RuleSpec> = catalog
            .into_iter()
            .filter(|spec| config.is_rule_enabled(spec.key))
            .collect();
        for spec in &catalog {
            spec.create().configure(&config.rule_params(spec.key))?;
        }
        debug!("{} rule(s) active", catalog.len());

        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Keys of the activated rules
    pub fn active_rules(&self) -> Vec<&'static str> {
        self.catalog.iter().map(|spec| spec.key).collect()
    }

    fn rule_set(&self, path: &Path) -> RuleSet {
        let mut rules = Vec::with_capacity(self.catalog.len());
        for spec in &self.catalog {
            if self.config.should_ignore_rule_for_file(spec.key, path) {
                debug!("{}: rule {} ignored", path.display(), spec.key);
                continue;
            }
            let mut rule = spec.create();
            match rule.configure(&self.config.rule_params(spec.key)) {
                Ok(()) => rules.push(rule),
                Err(e) => warn!("{}", e),
            }
        }
        RuleSet::new(rules)
    }

    /// Analyse several files, in parallel unless disabled in the config
    pub fn analyze(&self, files: &[PathBuf], cancel: &CancelFlag) -> AnalysisResult {
        let start = Instant::now();

        let sequential = || -> Vec<FileResult> {
            files
                .iter()
                .enumerate()
                .map(|(source, f)| self.analyze_file(f, source, cancel))
                .collect()
        };

        let results = if self.config.engine.parallel {
            let jobs = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| {
                    files
                        .par_iter()
                        .enumerate()
                        .map(|(source, f)| self.analyze_file(f, source, cancel))
                        .collect::<Vec<_>>()
                }),
                Err(e) => {
                    warn!("thread pool unavailable ({}), analysing sequentially", e);
                    sequential()
                }
            }
        } else {
            sequential()
        };

        let mut combined = AnalysisResult::default();
        for result in results {
            combined.add(result);
        }
        combined.duration = start.elapsed();
        combined
    }

    /// Analyse one file. `source` identifies the file in spans.
    pub fn analyze_file(&self, path: &Path, source: usize, cancel: &CancelFlag) -> FileResult {
        if cancel.is_cancelled() {
            debug!("{}: cancelled, pass skipped", path.display());
            let mut result = FileResult::new(path);
            result.skipped = true;
            return result;
        }

        match std::fs::read(path) {
            Ok(bytes) => self.run_pass(&Document::read(&bytes, path, source)),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                let mut result = FileResult::new(path);
                result.state.advance(PassState::Failed, path);
                result.analysis_errors.push(AnalysisError::new(
                    path.to_path_buf(),
                    1,
                    0,
                    format!("Unable to read file: {}", e),
                ));
                result
            }
        }
    }

    /// Analyse in-memory content
    pub fn analyze_content(&self, content: &str, path: &Path) -> FileResult {
        self.run_pass(&Document::parse(content, path))
    }

    /// Dispatch rules and collect metrics over an already built document
    pub fn run_pass(&self, document: &Document) -> FileResult {
        let path = document.path();
        let mut result = FileResult::new(path);
        result.state.advance(PassState::TreeBuilt, path);
        result.version = document.version();
        result.analysis_errors = document
            .errors()
            .iter()
            .map(|e| AnalysisError::from_validation(path.to_path_buf(), e))
            .collect();

        let mut rules = self.rule_set(path);
        result.state.advance(PassState::Traversing, path);
        let mut collector = MetricsCollector::new();
        let issues = rules.run_with(document, |node| collector.visit(node));
        result.measures = collector.finish(document);
        result.timings = rules.into_timings();

        for found in issues {
            let diagnostic = self.to_diagnostic(document, found, &mut result.analysis_errors);
            result.diagnostics.push(diagnostic);
        }

        result.state.advance(PassState::Done, path);
        result
    }

    fn to_diagnostic(&self, document: &Document, found: RuleIssue, errors: &mut Vec<AnalysisError>) -> Diagnostic {
        let (key, severity) = if found.fault {
            (FAULT_RULE_KEY, Severity::Error)
        } else {
            let severity = self
                .config
                .get_severity_override(found.rule_key)
                .unwrap_or(found.severity);
            (found.rule_key, severity)
        };

        let issue = found.issue;
        let range = locate(document, &issue.primary, found.rule_key, errors);
        let mut diagnostic = Diagnostic::new(key, severity, &issue.message, &issue.primary, range);
        diagnostic.flows = issue
            .flows
            .iter()
            .map(|flow| SecondaryLocation {
                range: locate(document, &flow.pointer, found.rule_key, errors),
                message: flow.message.clone(),
            })
            .collect();
        diagnostic.gap = issue.gap;
        diagnostic
    }
}

/// Source range of an issue location. A pointer that does not resolve is an
/// internal fault: it is reported as an analysis error and the issue is
/// kept at the start of the file.
fn locate(document: &Document, pointer: &Pointer, rule_key: &str, errors: &mut Vec<AnalysisError>) -> TextRange {
    match document.locate(pointer) {
        Ok(range) => range,
        Err(e) => {
            warn!("{}: issue of rule {}: {}", document.path().display(), rule_key, e);
            errors.push(AnalysisError::new(
                document.path().to_path_buf(),
                1,
                0,
                format!("Unable to locate issue of rule {}: {}", rule_key, e),
            ));
            TextRange {
                file: document.path().to_path_buf(),
                start_line: 1,
                start_column: 0,
                end_line: 1,
                end_column: 0,
            }
        }
    }
}
