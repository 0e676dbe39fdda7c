use super::MEDIA_TYPE_KEY;
use crate::grammar::{v2, v3, NodeKind};
use crate::rule::{Issue, Rule, RuleError};
use crate::tree::Node;
use once_cell::sync::Lazy;
use regex::Regex;

/// `type/subtype` with optional parameters, no wildcards
pub const MIME_TYPE_PATTERN: &str = r#"^[-!#$%&'+.^_`|~0-9A-Za-z]+/[-!#$%&'+.^_`|~0-9A-Za-z]+(\s*;\s*[-!#$%&'+.^_`|~0-9A-Za-z]+=("[^"]*"|[-!#$%&'+.^_`|~0-9A-Za-z]+))*$"#;

/// Like [`MIME_TYPE_PATTERN`], also accepting `*/*` and `type/*`
pub const MEDIA_RANGE_PATTERN: &str = r#"^(\*/\*|[-!#$%&'+.^_`|~0-9A-Za-z]+/(\*|[-!#$%&'+.^_`|~0-9A-Za-z]+))(\s*;\s*[-!#$%&'+.^_`|~0-9A-Za-z]+=("[^"]*"|[-!#$%&'+.^_`|~0-9A-Za-z]+))*$"#;

static MIME_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(MIME_TYPE_PATTERN).expect("valid MIME type pattern"));

static MEDIA_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(MEDIA_RANGE_PATTERN).expect("valid media range pattern"));

pub fn is_media_type(text: &str) -> bool {
    MIME_TYPE.is_match(text)
}

pub fn is_media_range(text: &str) -> bool {
    MEDIA_RANGE.is_match(text)
}

/// Checks `consumes`/`produces` entries (Swagger 2.0) and `content` keys
/// (OpenAPI 3)
#[derive(Debug, Default)]
pub struct MediaType;

impl MediaType {
    fn check_lists(node: &Node<'_>) -> Vec<Issue> {
        ["consumes", "produces"]
            .iter()
            .flat_map(|name| node.at(name).elements())
            .filter_map(|entry| {
                let text = entry.text()?;
                (!is_media_type(text)).then(|| Issue::at(&entry, format!("'{}' is not a valid media type.", text)))
            })
            .collect()
    }
}

impl Rule for MediaType {
    fn key(&self) -> &'static str {
        MEDIA_TYPE_KEY
    }

    fn description(&self) -> &'static str {
        "Media types must be well-formed"
    }

    fn subscribed_kinds(&self) -> Vec<NodeKind> {
        vec![
            v2::Kind::Root.into(),
            v2::Kind::Operation.into(),
            v3::Kind::MediaType.into(),
        ]
    }

    fn visit(&mut self, node: Node<'_>) -> Result<Vec<Issue>, RuleError> {
        if node.is(v3::Kind::MediaType) {
            return Ok(match node.key() {
                Some(range) if !is_media_range(range) => {
                    vec![Issue::at(&node, format!("'{}' is not a valid media range.", range))]
                }
                _ => Vec::new(),
            });
        }
        Ok(Self::check_lists(&node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::assert_verified;

    #[test]
    fn test_can_detect_media_types() {
        for text in [
            "text/plain; charset=utf-8",
            "application/json",
            "application/vnd.github+json",
            "application/vnd.github.v3+json",
            "application/vnd.github.v3.raw+json",
            "application/vnd.github.v3.text+json",
            "application/vnd.github.v3.html+json",
            "application/vnd.github.v3.diff",
            "application/vnd.github.v3.patch",
        ] {
            assert!(is_media_type(text), "{}", text);
            assert!(is_media_range(text), "{}", text);
        }
    }

    #[test]
    fn test_can_report_incorrect_media_types() {
        assert!(!is_media_type("application"));
        assert!(!is_media_type("application/*"));
        assert!(!is_media_range("application"));
        assert!(is_media_range("application/*"));
        assert!(is_media_range("*/*"));
    }

    #[test]
    fn test_media_types_in_v2() {
        assert_verified(
            r#"swagger: "2.0"
info:
  title: t
  version: "1"
consumes:
  - application/json
  - json # Noncompliant {{'json' is not a valid media type.}}
paths:
  /a:
    get:
      produces:
        - text/*  # Noncompliant
      responses:
        "200":
          description: ok
"#,
            Box::new(MediaType),
        );
    }

    #[test]
    fn test_media_ranges_in_v3() {
        assert_verified(
            r#"openapi: 3.0.0
info:
  title: t
  version: "1"
paths:
  /a:
    post:
      requestBody:
        content:
          application/*:
            schema:
              type: string
          text: # Noncompliant {{'text' is not a valid media range.}}
            schema:
              type: string
      responses:
        "200":
          description: ok
"#,
            Box::new(MediaType),
        );
    }
}
