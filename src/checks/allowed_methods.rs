use super::ALLOWED_METHODS_KEY;
use crate::grammar::{v2, v3, NodeKind};
use crate::rule::{Issue, Rule, RuleError, RuleParams};
use crate::tree::Node;
use once_cell::sync::Lazy;
use regex::Regex;

const MESSAGE: &str = "Use the only methods allowed";

/// Default value of the `list-methods` property
pub const DEFAULT_METHODS: &str = "get|put|post|delete|options|head|patch|trace";

static DEFAULT_REGEX: Lazy<Regex> = Lazy::new(|| anchored(DEFAULT_METHODS).expect("valid method list"));

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// Flags operations declared under a method the `list-methods` pattern
/// does not allow
#[derive(Debug)]
pub struct AllowedMethods {
    allowed: Regex,
}

impl Default for AllowedMethods {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_REGEX.clone(),
        }
    }
}

impl Rule for AllowedMethods {
    fn key(&self) -> &'static str {
        ALLOWED_METHODS_KEY
    }

    fn description(&self) -> &'static str {
        "Operations must use an allowed HTTP method"
    }

    fn subscribed_kinds(&self) -> Vec<NodeKind> {
        vec![v2::Kind::Operation.into(), v3::Kind::Operation.into()]
    }

    fn configure(&mut self, params: &RuleParams) -> Result<(), RuleError> {
        if let Some(pattern) = params.string("list-methods")? {
            self.allowed = anchored(&pattern).map_err(|e| RuleError::InvalidParam {
                rule: ALLOWED_METHODS_KEY.to_string(),
                param: "list-methods".to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn visit(&mut self, node: Node<'_>) -> Result<Vec<Issue>, RuleError> {
        match node.key() {
            Some(method) if !self.allowed.is_match(method) => Ok(vec![Issue::at(&node, MESSAGE)]),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::{assert_verified, verify_str};
    use std::collections::HashMap;

    const DOC: &str = r#"swagger: "2.0"
info:
  title: t
  version: "1"
paths:
  /pets:
    get: # Noncompliant
      responses:
        "200":
          description: ok
    post:
      responses:
        "200":
          description: ok
    delete: # Noncompliant {{Use the only methods allowed}}
      responses:
        "200":
          description: ok
"#;

    fn configured(pattern: &str) -> Box<dyn Rule> {
        let mut rule = AllowedMethods::default();
        let params = RuleParams::new(ALLOWED_METHODS_KEY, HashMap::new()).with("list-methods", pattern);
        rule.configure(&params).unwrap();
        Box::new(rule)
    }

    #[test]
    fn test_restricted_methods() {
        assert_verified(DOC, configured("post|put"));
    }

    #[test]
    fn test_default_allows_all_methods() {
        assert!(verify_str(DOC, Box::new(AllowedMethods::default())).is_err());
        let clean: String = DOC
            .lines()
            .map(|l| l.split(" # ").next().unwrap_or(l))
            .collect::<Vec<_>>()
            .join("\n");
        assert_verified(&clean, Box::new(AllowedMethods::default()));
    }

    #[test]
    fn test_pattern_is_anchored() {
        let rule = configured("ge");
        let doc = DOC.replace(" # Noncompliant {{Use the only methods allowed}}", " # Noncompliant");
        let doc = doc.replace("    post:\n", "    post: # Noncompliant\n");
        assert_verified(&doc, rule);
    }

    #[test]
    fn test_invalid_pattern() {
        let mut rule = AllowedMethods::default();
        let params = RuleParams::new(ALLOWED_METHODS_KEY, HashMap::new()).with("list-methods", "(get");
        assert!(matches!(
            rule.configure(&params),
            Err(RuleError::InvalidParam { .. })
        ));
    }
}
