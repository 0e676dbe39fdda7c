use super::ACTIVITY_LOG_KEY;
use crate::grammar::{v2, v3, NodeKind};
use crate::rule::{Issue, Rule, RuleError};
use crate::tree::Node;

const MESSAGE: &str = "Use the activity-log policy to log information.";

/// Requires an `activity-log` policy in the assembly of an IBM API Connect
/// configuration
#[derive(Debug, Default)]
pub struct ActivityLog;

impl Rule for ActivityLog {
    fn key(&self) -> &'static str {
        ACTIVITY_LOG_KEY
    }

    fn description(&self) -> &'static str {
        "The assembly must execute an activity-log policy"
    }

    fn subscribed_kinds(&self) -> Vec<NodeKind> {
        vec![
            v2::Kind::XIbmConfiguration.into(),
            v3::Kind::XIbmConfiguration.into(),
        ]
    }

    fn visit(&mut self, node: Node<'_>) -> Result<Vec<Issue>, RuleError> {
        let execute = node.at("/assembly/execute");
        let logged = execute
            .elements()
            .iter()
            .any(|policy| !policy.at("activity-log").is_missing());
        if logged {
            return Ok(Vec::new());
        }

        let anchor = if execute.is_missing() { &node } else { &execute };
        Ok(vec![Issue::at(anchor, MESSAGE)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::assert_verified;

    #[test]
    fn test_execute_without_activity_log() {
        assert_verified(
            r#"swagger: "2.0"
info:
  title: t
  version: "1"
paths: {}
x-ibm-configuration:
  assembly:
    execute: # Noncompliant {{Use the activity-log policy to log information.}}
      - invoke:
          target-url: https://example.com
"#,
            Box::new(ActivityLog),
        );
    }

    #[test]
    fn test_execute_with_activity_log() {
        assert_verified(
            r#"openapi: 3.0.0
info:
  title: t
  version: "1"
paths: {}
x-ibm-configuration:
  assembly:
    execute:
      - invoke:
          target-url: https://example.com
      - activity-log:
          content: activity
"#,
            Box::new(ActivityLog),
        );
    }

    #[test]
    fn test_missing_assembly_reported_on_configuration() {
        assert_verified(
            r#"swagger: "2.0"
info:
  title: t
  version: "1"
paths: {}
x-ibm-configuration: # Noncompliant
  enforced: true
"#,
            Box::new(ActivityLog),
        );
    }
}
