use super::PATH_MASQUERADING_KEY;
use crate::grammar::{v2, v3, NodeKind};
use crate::rule::{Issue, Rule, RuleError};
use crate::tree::Node;

/// Flags literal paths shadowed by a templated path declared before them,
/// e.g. `/pets/mine` after `/pets/{id}`
#[derive(Debug, Default)]
pub struct PathMasquerading;

fn is_parameter(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

/// Whether a request for `literal` would be routed to `template`
fn masks(template: &str, literal: &str) -> bool {
    let template: Vec<&str> = template.split('/').collect();
    let literal: Vec<&str> = literal.split('/').collect();
    template.len() == literal.len()
        && template.iter().any(|s| is_parameter(s))
        && template
            .iter()
            .zip(&literal)
            .all(|(t, l)| t == l || (is_parameter(t) && !l.is_empty()))
}

impl Rule for PathMasquerading {
    fn key(&self) -> &'static str {
        PATH_MASQUERADING_KEY
    }

    fn description(&self) -> &'static str {
        "Templated paths must not hide literal paths declared after them"
    }

    fn subscribed_kinds(&self) -> Vec<NodeKind> {
        vec![v2::Kind::Paths.into(), v3::Kind::Paths.into()]
    }

    fn visit(&mut self, node: Node<'_>) -> Result<Vec<Issue>, RuleError> {
        let mut issues = Vec::new();
        let mut templates: Vec<(&str, Node<'_>)> = Vec::new();

        for (path, item) in node.properties() {
            if !path.starts_with('/') {
                continue;
            }
            if path.contains('{') {
                templates.push((path, item));
                continue;
            }
            if let Some((template, masking)) = templates.iter().find(|(t, _)| masks(t, path)) {
                issues.push(
                    Issue::at(
                        &item,
                        format!("Declare '{}' before '{}', which masks it.", path, template),
                    )
                    .with_secondary(masking, "Masking path"),
                );
            }
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::assert_verified;

    #[test]
    fn test_masks() {
        assert!(masks("/pets/{id}", "/pets/mine"));
        assert!(masks("/{a}/{b}", "/pets/mine"));
        assert!(!masks("/pets/{id}", "/pets"));
        assert!(!masks("/pets/{id}", "/owners/mine"));
        assert!(!masks("/pets/mine", "/pets/mine"));
    }

    #[test]
    fn test_literal_after_template() {
        assert_verified(
            r#"swagger: "2.0"
info:
  title: t
  version: "1"
paths:
  /pets/latest:
    get:
      responses:
        "200":
          description: ok
  /pets/{id}:
    get:
      responses:
        "200":
          description: ok
  /pets/mine: # Noncompliant {{Declare '/pets/mine' before '/pets/{id}', which masks it.}}
    get:
      responses:
        "200":
          description: ok
"#,
            Box::new(PathMasquerading),
        );
    }

    #[test]
    fn test_secondary_location() {
        let doc = crate::tree::Document::parse(
            "openapi: 3.0.0\ninfo: {title: t, version: '1'}\npaths:\n  /a/{x}: {}\n  /a/b: {}\n",
            "api.yaml",
        );
        let issues = PathMasquerading.visit(doc.at("/paths")).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].primary.to_string(), "/paths/~1a~1b");
        assert_eq!(issues[0].flows.len(), 1);
        assert_eq!(issues[0].flows[0].pointer.to_string(), "/paths/~1a~1{x}");
        assert_eq!(issues[0].gap, None);
    }
}
