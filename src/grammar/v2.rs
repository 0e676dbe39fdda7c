//! Swagger 2.0 grammar

use super::{Expect, GrammarBuilder, NodeKind, ScalarKind, Version, EXTENSION_PATTERN};

node_kinds! {
    /// Node kinds of a Swagger 2.0 document
    Kind {
        Root => "Root",
        Info => "Info",
        Contact => "Contact",
        License => "License",
        Paths => "Paths",
        Path => "Path",
        Operation => "Operation",
        Parameter => "Parameter",
        Items => "Items",
        Responses => "Responses",
        Response => "Response",
        Header => "Header",
        Schema => "Schema",
        Xml => "Xml",
        Tag => "Tag",
        ExternalDoc => "ExternalDoc",
        SecurityScheme => "SecurityScheme",
        SecurityRequirement => "SecurityRequirement",
        Security => "Security",
        Extension => "Extension",
        XIbmConfiguration => "XIbmConfiguration",
    }
}

/// HTTP methods a path item may declare
pub const METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Pattern for response status keys
pub const RESPONSE_CODE_PATTERN: &str = "^([1-5][0-9X]{2}|default)$";

fn strings() -> Expect {
    Expect::list(Expect::string())
}

pub(super) fn definition() -> GrammarBuilder {
    use Kind::*;

    let mut g = GrammarBuilder::new(
        Version::V2,
        Root.into(),
        Kind::ALL.iter().map(|k| NodeKind::V2(*k)).collect(),
    );

    g.object(Root)
        .required("swagger", Expect::string())
        .required("info", Info)
        .optional("host", Expect::string())
        .optional("basePath", Expect::string())
        .optional("schemes", strings())
        .optional("consumes", strings())
        .optional("produces", strings())
        .required("paths", Paths)
        .optional("definitions", Expect::map(Schema))
        .optional("parameters", Expect::map(Parameter))
        .optional("responses", Expect::map(Response))
        .optional("securityDefinitions", Expect::map(SecurityScheme))
        .optional("security", Security)
        .optional("tags", Expect::list(Tag))
        .optional("externalDocs", ExternalDoc)
        .optional("x-ibm-configuration", XIbmConfiguration)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Info)
        .required("title", Expect::string())
        .optional("description", Expect::string())
        .optional("termsOfService", Expect::string())
        .optional("contact", Contact)
        .optional("license", License)
        .required("version", Expect::string())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Contact)
        .optional("name", Expect::string())
        .optional("url", Expect::string())
        .optional("email", Expect::string())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(License)
        .required("name", Expect::string())
        .optional("url", Expect::string())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Paths)
        .pattern("^/", Path)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    let mut path = g
        .object(Path)
        .optional("$ref", Expect::string())
        .optional("parameters", Expect::list(Parameter));
    for method in METHODS {
        path = path.optional(*method, Operation);
    }
    path.pattern(EXTENSION_PATTERN, Extension).done();

    g.object(Operation)
        .optional("tags", strings())
        .optional("summary", Expect::string())
        .optional("description", Expect::string())
        .optional("externalDocs", ExternalDoc)
        .optional("operationId", Expect::string())
        .optional("consumes", strings())
        .optional("produces", strings())
        .optional("parameters", Expect::list(Parameter))
        .required("responses", Responses)
        .optional("schemes", strings())
        .optional("deprecated", Expect::boolean())
        .optional("security", Security)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    validations(
        g.object(Parameter)
            .referenceable()
            .required("name", Expect::string())
            .required("in", Expect::string())
            .optional("description", Expect::string())
            .optional("required", Expect::boolean())
            .optional("schema", Schema)
            .optional("type", Expect::string())
            .optional("format", Expect::string())
            .optional("allowEmptyValue", Expect::boolean())
            .optional("items", Items)
            .optional("collectionFormat", Expect::string()),
    )
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    validations(
        g.object(Items)
            .required("type", Expect::string())
            .optional("format", Expect::string())
            .optional("items", Items)
            .optional("collectionFormat", Expect::string()),
    )
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    g.object(Responses)
        .pattern(RESPONSE_CODE_PATTERN, Response)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Response)
        .referenceable()
        .required("description", Expect::string())
        .optional("schema", Schema)
        .optional("headers", Expect::map(Header))
        .optional("examples", Expect::map(Expect::Any))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    validations(
        g.object(Header)
            .optional("description", Expect::string())
            .required("type", Expect::string())
            .optional("format", Expect::string())
            .optional("items", Items)
            .optional("collectionFormat", Expect::string()),
    )
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    validations(
        g.object(Schema)
            .referenceable()
            .optional("format", Expect::string())
            .optional("title", Expect::string())
            .optional("description", Expect::string())
            .optional("required", strings())
            .optional("type", Expect::string())
            .optional("items", Schema)
            .optional("allOf", Expect::list(Schema))
            .optional("properties", Expect::map(Schema))
            .optional(
                "additionalProperties",
                Expect::NodeOrScalar(Schema.into(), ScalarKind::Boolean),
            )
            .optional("discriminator", Expect::string())
            .optional("readOnly", Expect::boolean())
            .optional("xml", Xml)
            .optional("externalDocs", ExternalDoc)
            .optional("example", Expect::Any)
            .optional("maxProperties", Expect::integer())
            .optional("minProperties", Expect::integer()),
    )
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    g.object(Xml)
        .optional("name", Expect::string())
        .optional("namespace", Expect::string())
        .optional("prefix", Expect::string())
        .optional("attribute", Expect::boolean())
        .optional("wrapped", Expect::boolean())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Tag)
        .required("name", Expect::string())
        .optional("description", Expect::string())
        .optional("externalDocs", ExternalDoc)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(ExternalDoc)
        .optional("description", Expect::string())
        .required("url", Expect::string())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(SecurityScheme)
        .required("type", Expect::string())
        .optional("description", Expect::string())
        .optional("name", Expect::string())
        .optional("in", Expect::string())
        .optional("flow", Expect::string())
        .optional("authorizationUrl", Expect::string())
        .optional("tokenUrl", Expect::string())
        .optional("scopes", Expect::map(Expect::string()))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(SecurityRequirement).pattern(".*", strings()).done();
    g.array(Security, SecurityRequirement);
    g.any(Extension);
    g.any(XIbmConfiguration);

    g
}

/// Validation keywords shared by parameters, items, headers and schemas
fn validations(o: super::ObjectBuilder<'_>) -> super::ObjectBuilder<'_> {
    o.optional("default", Expect::Any)
        .optional("maximum", Expect::number())
        .optional("exclusiveMaximum", Expect::boolean())
        .optional("minimum", Expect::number())
        .optional("exclusiveMinimum", Expect::boolean())
        .optional("maxLength", Expect::integer())
        .optional("minLength", Expect::integer())
        .optional("pattern", Expect::string())
        .optional("maxItems", Expect::integer())
        .optional("minItems", Expect::integer())
        .optional("uniqueItems", Expect::boolean())
        .optional("enum", Expect::list(Expect::Any))
        .optional("multipleOf", Expect::number())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Shape;

    #[test]
    fn test_kind_names() {
        assert_eq!(Kind::Operation.name(), "Operation");
        assert_eq!(Kind::ALL[0], Kind::Root);
        assert_eq!(Kind::XIbmConfiguration.index(), Kind::ALL.len() - 1);
    }

    #[test]
    fn test_operation_requires_responses() {
        let g = Version::V2.grammar();
        let op = g.shape(Kind::Operation.into()).unwrap();
        assert_eq!(op.required().collect::<Vec<_>>(), ["responses"]);
        assert!(!op.allow_ref);
    }

    #[test]
    fn test_security_is_array_of_requirements() {
        let g = Version::V2.grammar();
        let security = g.shape(Kind::Security.into()).unwrap();
        assert!(matches!(
            security.shape,
            Shape::Array(Expect::Node(NodeKind::V2(Kind::SecurityRequirement)))
        ));
    }

    #[test]
    fn test_response_codes() {
        let g = Version::V2.grammar();
        let responses = g.shape(Kind::Responses.into()).unwrap();
        assert!(responses.expect_for("200").is_some());
        assert!(responses.expect_for("4XX").is_some());
        assert!(responses.expect_for("default").is_some());
        assert!(responses.expect_for("600").is_none());
        assert!(responses.expect_for("ok").is_none());
    }

    #[test]
    fn test_path_methods() {
        let g = Version::V2.grammar();
        let path = g.shape(Kind::Path.into()).unwrap();
        for method in METHODS {
            assert_eq!(
                path.expect_for(method),
                Some(Expect::Node(Kind::Operation.into()))
            );
        }
        assert!(path.expect_for("trace").is_none());
    }
}
