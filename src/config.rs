//! Analyser configuration
//!
//! Looked up in the working directory, then in the home directory, under
//! the names in [`CONFIG_NAMES`]. A file may `extends:` presets or other
//! files; later sources override earlier ones.

use crate::diagnostic::Severity;
use crate::rule::RuleParams;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File names searched by [`Config::load_default`], in order
pub const CONFIG_NAMES: [&str; 6] = [
    ".oaslintrc.yaml",
    ".oaslintrc.yml",
    ".oaslintrc.json",
    "oaslint.yaml",
    "oaslint.yml",
    "oaslint.json",
];

const MAX_EXTENDS_DEPTH: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub parallel: bool,

    /// Worker threads; 0 uses one per CPU
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

impl EngineConfig {
    fn overlay(&mut self, other: EngineConfig) {
        self.parallel = other.parallel;
        if other.jobs > 0 {
            self.jobs = other.jobs;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: ColorMode,
    pub verbose: bool,
    /// Print per-file measures
    pub metrics: bool,
}

impl OutputConfig {
    fn overlay(&mut self, other: OutputConfig) {
        if other.format != OutputFormat::default() {
            self.format = other.format;
        }
        if other.color != ColorMode::default() {
            self.color = other.color;
        }
        self.verbose |= other.verbose;
        self.metrics |= other.metrics;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("text") {
            Ok(OutputFormat::Text)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(OutputFormat::Json)
        } else {
            Err(format!("unknown output format '{}', expected text or json", s))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Which files a directory argument expands to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        let owned = |patterns: &[&str]| -> Vec<String> { patterns.iter().map(|p| p.to_string()).collect() };
        Self {
            include: owned(&["**/*.yaml", "**/*.yml", "**/*.json"]),
            exclude: owned(&["**/node_modules/**", "**/target/**"]),
        }
    }
}

impl FilesConfig {
    fn overlay(&mut self, other: FilesConfig) {
        append_unique(&mut self.include, other.include);
        append_unique(&mut self.exclude, other.exclude);
    }
}

fn append_unique(into: &mut Vec<String>, from: Vec<String>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Rule activation and per-rule settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub disabled: Vec<String>,

    /// When non-empty, only these rules run
    pub enabled: Vec<String>,

    pub severity: HashMap<String, Severity>,

    /// Glob pattern -> rule keys (or `all`) not run on matching files
    pub per_file: HashMap<String, Vec<String>>,

    /// Rule key -> property -> value, handed to `Rule::configure`
    pub params: HashMap<String, HashMap<String, serde_yaml::Value>>,
}

impl RulesConfig {
    fn overlay(&mut self, other: RulesConfig) {
        append_unique(&mut self.disabled, other.disabled);
        if !other.enabled.is_empty() {
            self.enabled = other.enabled;
        }
        self.severity.extend(other.severity);
        for (pattern, keys) in other.per_file {
            append_unique(self.per_file.entry(pattern).or_default(), keys);
        }
        for (rule, values) in other.params {
            self.params.entry(rule).or_default().extend(values);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Presets (`recommended`, `strict`, `minimal`) or paths relative to
    /// the including file
    pub extends: Vec<String>,
    pub engine: EngineConfig,
    pub output: OutputConfig,
    pub files: FilesConfig,
    pub rules: RulesConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in configuration by name
    pub fn preset(name: &str) -> Option<Self> {
        let mut config = Self::default();
        match name {
            "recommended" => {}
            "strict" => {
                config.rules.severity = crate::checks::builtin_rules()
                    .into_iter()
                    .map(|spec| (spec.key.to_string(), Severity::Error))
                    .collect();
            }
            "minimal" => config.rules.enabled = vec![crate::checks::PARSING_ERROR_KEY.to_string()],
            _ => return None,
        }
        Some(config)
    }

    /// Read a configuration file and everything it extends
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_nested(path, 0)
    }

    fn load_nested(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        if depth >= MAX_EXTENDS_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "{}: extends nested more than {} levels",
                path.display(),
                MAX_EXTENDS_DEPTH
            )));
        }
        debug!("loading config {}", path.display());

        let own = Self::parse_file(path)?;
        if own.extends.is_empty() {
            return Ok(own);
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut combined = Self::default();
        for name in &own.extends {
            let base = match Self::preset(name) {
                Some(preset) => preset,
                None => Self::load_nested(&dir.join(name), depth + 1)?,
            };
            combined.merge(base);
        }
        combined.merge(own);
        Ok(combined)
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(serde_yaml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            other => Err(ConfigError::Invalid(format!(
                "{}: unsupported config format '{}'",
                path.display(),
                other.unwrap_or("")
            ))),
        }
    }

    /// Overlay `other` on top of this configuration
    pub fn merge(&mut self, other: Self) {
        self.engine.overlay(other.engine);
        self.output.overlay(other.output);
        self.files.overlay(other.files);
        self.rules.overlay(other.rules);
    }

    /// Configuration file found in the working or home directory, if any
    pub fn discover() -> Option<PathBuf> {
        let dirs = [Some(PathBuf::from(".")), dirs::home_dir()];
        dirs.into_iter()
            .flatten()
            .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }

    /// Load the discovered configuration, or the defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::discover() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
        enabled_rules: Option<Vec<String>>,
    ) {
        self.output.format = format.unwrap_or(self.output.format);
        self.output.verbose = verbose.unwrap_or(self.output.verbose);
        self.engine.jobs = jobs.unwrap_or(self.engine.jobs);
        append_unique(&mut self.rules.disabled, disabled_rules.unwrap_or_default());
        if let Some(only) = enabled_rules {
            self.rules.enabled = only;
        }
    }

    pub fn is_rule_enabled(&self, rule_key: &str) -> bool {
        let listed = |keys: &[String]| keys.iter().any(|k| k == rule_key);
        !listed(&self.rules.disabled) && (self.rules.enabled.is_empty() || listed(&self.rules.enabled))
    }

    pub fn get_severity_override(&self, rule_key: &str) -> Option<Severity> {
        self.rules.severity.get(rule_key).copied()
    }

    /// Properties configured for a rule
    pub fn rule_params(&self, rule_key: &str) -> RuleParams {
        let values = self.rules.params.get(rule_key).cloned().unwrap_or_default();
        RuleParams::new(rule_key, values)
    }

    /// Whether a `per_file` entry turns `rule_key` off for `file`
    pub fn should_ignore_rule_for_file(&self, rule_key: &str, file: &Path) -> bool {
        self.rules
            .per_file
            .iter()
            .filter(|(_, keys)| keys.iter().any(|k| k == "all" || k == rule_key))
            .any(|(pattern, _)| match globset::Glob::new(pattern) {
                Ok(glob) => glob.compile_matcher().is_match(file),
                Err(e) => {
                    warn!("ignoring per_file pattern '{}': {}", pattern, e);
                    false
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert!(config.engine.parallel);
        assert_eq!(config.engine.jobs, 0);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.output.color, ColorMode::Auto);
        assert!(config.files.include.contains(&"**/*.yml".to_string()));
        assert!(config.is_rule_enabled("media-type"));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("Json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("sarif".parse::<OutputFormat>().unwrap_err().contains("sarif"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::new();
        config.rules.disabled.push("activity-log".to_string());
        config.merge_cli(
            Some(OutputFormat::Json),
            None,
            Some(2),
            Some(vec!["media-type".to_string(), "activity-log".to_string()]),
            None,
        );

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.verbose);
        assert_eq!(config.engine.jobs, 2);
        assert_eq!(config.rules.disabled, vec!["activity-log", "media-type"]);
    }

    #[test]
    fn test_select_and_disable() {
        let mut config = Config::new();
        config.merge_cli(
            None,
            None,
            None,
            Some(vec!["allowed-methods".to_string()]),
            Some(vec!["allowed-methods".to_string(), "media-type".to_string()]),
        );
        assert!(config.is_rule_enabled("media-type"));
        assert!(!config.is_rule_enabled("allowed-methods"));
        assert!(!config.is_rule_enabled("activity-log"));
    }

    #[test]
    fn test_merge_precedence() {
        let mut base = Config::new();
        base.engine.jobs = 8;
        base.output.format = OutputFormat::Json;
        base.rules.severity.insert("media-type".to_string(), Severity::Error);
        base.rules
            .params
            .entry("allowed-methods".to_string())
            .or_default()
            .insert("list-methods".to_string(), "get".into());

        let mut other = Config::new();
        other.engine.parallel = false;
        other.rules.severity.insert("media-type".to_string(), Severity::Info);
        other.files.include.push("**/*.oas".to_string());

        base.merge(other);
        assert!(!base.engine.parallel);
        assert_eq!(base.engine.jobs, 8);
        assert_eq!(base.output.format, OutputFormat::Json);
        assert_eq!(base.get_severity_override("media-type"), Some(Severity::Info));
        assert_eq!(base.files.include.len(), 4);
        assert_eq!(
            base.rule_params("allowed-methods").string("list-methods").unwrap().as_deref(),
            Some("get")
        );
    }

    #[test]
    fn test_per_file_ignore() {
        let mut config = Config::new();
        config
            .rules
            .per_file
            .insert("**/legacy/**".to_string(), vec!["all".to_string()]);
        config
            .rules
            .per_file
            .insert("**/*.json".to_string(), vec!["media-type".to_string()]);
        config
            .rules
            .per_file
            .insert("[broken".to_string(), vec!["all".to_string()]);

        assert!(config.should_ignore_rule_for_file("allowed-methods", Path::new("api/legacy/v1.yaml")));
        assert!(config.should_ignore_rule_for_file("media-type", Path::new("api/v2.json")));
        assert!(!config.should_ignore_rule_for_file("allowed-methods", Path::new("api/v2.json")));
    }

    #[test]
    fn test_yaml_document() {
        let yaml = r#"
engine:
  parallel: false
  jobs: 4
output:
  format: json
  metrics: true
rules:
  disabled:
    - activity-log
  severity:
    media-type: error
  params:
    allowed-methods:
      list-methods: "get|post"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.engine.parallel);
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.metrics);
        assert!(!config.is_rule_enabled("activity-log"));
        assert_eq!(config.get_severity_override("media-type"), Some(Severity::Error));
        let params = config.rule_params("allowed-methods");
        assert_eq!(params.string("list-methods").unwrap().as_deref(), Some("get|post"));
        assert!(config.rule_params("media-type").is_empty());
    }

    #[test]
    fn test_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oaslint.json");
        fs::write(&path, r#"{"output": {"color": "never"}, "rules": {"enabled": ["media-type"]}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output.color, ColorMode::Never);
        assert!(config.is_rule_enabled("media-type"));
        assert!(!config.is_rule_enabled("parsing-error"));
    }

    #[test]
    fn test_load_extends_preset_and_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("base.yaml"),
            "rules:\n  disabled: [path-masquerading]\n",
        )
        .unwrap();
        let path = dir.path().join(".oaslintrc.yaml");
        fs::write(
            &path,
            "extends: [strict, base.yaml]\nrules:\n  severity:\n    media-type: info\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.is_rule_enabled("path-masquerading"));
        assert_eq!(config.get_severity_override("allowed-methods"), Some(Severity::Error));
        assert_eq!(config.get_severity_override("media-type"), Some(Severity::Info));
    }

    #[test]
    fn test_load_rejects_cyclic_extends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("self.yaml");
        fs::write(&path, "extends: [self.yaml]\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let toml = dir.path().join("config.toml");
        fs::write(&toml, "").unwrap();
        assert!(matches!(Config::load(&toml), Err(ConfigError::Invalid(_))));

        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "engine: [1, 2]\n").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Yaml(_))));

        assert!(matches!(
            Config::load(&dir.path().join("absent.yaml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_presets() {
        assert!(Config::preset("recommended").is_some());
        assert!(Config::preset("nope").is_none());
        let minimal = Config::preset("minimal").unwrap();
        assert!(minimal.is_rule_enabled("parsing-error"));
        assert!(!minimal.is_rule_enabled("media-type"));
        let strict = Config::preset("strict").unwrap();
        assert_eq!(strict.get_severity_override("activity-log"), Some(Severity::Error));
    }
}
