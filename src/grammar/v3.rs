//! OpenAPI 3.x grammar

use super::{Expect, GrammarBuilder, NodeKind, ObjectBuilder, ScalarKind, Version, EXTENSION_PATTERN};

node_kinds! {
    /// Node kinds of an OpenAPI 3.x document
    Kind {
        Root => "Root",
        Info => "Info",
        Contact => "Contact",
        License => "License",
        Server => "Server",
        ServerVariable => "ServerVariable",
        Paths => "Paths",
        Path => "Path",
        Operation => "Operation",
        Parameter => "Parameter",
        RequestBody => "RequestBody",
        MediaType => "MediaType",
        Encoding => "Encoding",
        Responses => "Responses",
        Response => "Response",
        Header => "Header",
        Callback => "Callback",
        Example => "Example",
        Link => "Link",
        Components => "Components",
        Schema => "Schema",
        Discriminator => "Discriminator",
        Xml => "Xml",
        Tag => "Tag",
        ExternalDoc => "ExternalDoc",
        SecurityScheme => "SecurityScheme",
        OAuthFlows => "OAuthFlows",
        OAuthFlow => "OAuthFlow",
        SecurityRequirement => "SecurityRequirement",
        Security => "Security",
        Extension => "Extension",
        XIbmConfiguration => "XIbmConfiguration",
    }
}

/// HTTP methods a path item may declare
pub const METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

fn strings() -> Expect {
    Expect::list(Expect::string())
}

fn text<'g>(o: ObjectBuilder<'g>, names: &[&'static str]) -> ObjectBuilder<'g> {
    names.iter().fold(o, |o, n| o.optional(*n, Expect::string()))
}

pub(super) fn definition() -> GrammarBuilder {
    use Kind::*;

    let mut g = GrammarBuilder::new(
        Version::V3,
        Root.into(),
        Kind::ALL.iter().map(|k| NodeKind::V3(*k)).collect(),
    );

    g.object(Root)
        .required("openapi", Expect::string())
        .required("info", Info)
        .optional("jsonSchemaDialect", Expect::string())
        .optional("servers", Expect::list(Server))
        .required("paths", Paths)
        .optional("webhooks", Expect::map(Path))
        .optional("components", Components)
        .optional("security", Security)
        .optional("tags", Expect::list(Tag))
        .optional("externalDocs", ExternalDoc)
        .optional("x-ibm-configuration", XIbmConfiguration)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    text(
        g.object(Info).required("title", Expect::string()),
        &["summary", "description", "termsOfService"],
    )
    .optional("contact", Contact)
    .optional("license", License)
    .required("version", Expect::string())
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    text(g.object(Contact), &["name", "url", "email"])
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    text(
        g.object(License).required("name", Expect::string()),
        &["identifier", "url"],
    )
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    g.object(Server)
        .required("url", Expect::string())
        .optional("description", Expect::string())
        .optional("variables", Expect::map(ServerVariable))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(ServerVariable)
        .optional("enum", strings())
        .required("default", Expect::string())
        .optional("description", Expect::string())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Paths)
        .pattern("^/", Path)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    let mut path = text(g.object(Path), &["$ref", "summary", "description"])
        .optional("servers", Expect::list(Server))
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
        .optional("parameters", Expect::list(Parameter))
        .optional("requestBody", RequestBody)
        .required("responses", Responses)
        .optional("callbacks", Expect::map(Callback))
        .optional("deprecated", Expect::boolean())
        .optional("security", Security)
        .optional("servers", Expect::list(Server))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    serialization(
        g.object(Parameter)
            .referenceable()
            .required("name", Expect::string())
            .required("in", Expect::string()),
    )
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    g.object(RequestBody)
        .referenceable()
        .optional("description", Expect::string())
        .required("content", Expect::map(MediaType))
        .optional("required", Expect::boolean())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(MediaType)
        .optional("schema", Schema)
        .optional("example", Expect::Any)
        .optional("examples", Expect::map(Example))
        .optional("encoding", Expect::map(Encoding))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Encoding)
        .optional("contentType", Expect::string())
        .optional("headers", Expect::map(Header))
        .optional("style", Expect::string())
        .optional("explode", Expect::boolean())
        .optional("allowReserved", Expect::boolean())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Responses)
        .pattern(super::v2::RESPONSE_CODE_PATTERN, Response)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Response)
        .referenceable()
        .required("description", Expect::string())
        .optional("headers", Expect::map(Header))
        .optional("content", Expect::map(MediaType))
        .optional("links", Expect::map(Link))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    serialization(g.object(Header).referenceable())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Callback)
        .referenceable()
        .pattern(EXTENSION_PATTERN, Extension)
        .pattern(".*", Path)
        .done();

    g.object(Example)
        .referenceable()
        .optional("summary", Expect::string())
        .optional("description", Expect::string())
        .optional("value", Expect::Any)
        .optional("externalValue", Expect::string())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Link)
        .referenceable()
        .optional("operationRef", Expect::string())
        .optional("operationId", Expect::string())
        .optional("parameters", Expect::map(Expect::Any))
        .optional("requestBody", Expect::Any)
        .optional("description", Expect::string())
        .optional("server", Server)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Components)
        .optional("schemas", Expect::map(Schema))
        .optional("responses", Expect::map(Response))
        .optional("parameters", Expect::map(Parameter))
        .optional("examples", Expect::map(Example))
        .optional("requestBodies", Expect::map(RequestBody))
        .optional("headers", Expect::map(Header))
        .optional("securitySchemes", Expect::map(SecurityScheme))
        .optional("links", Expect::map(Link))
        .optional("callbacks", Expect::map(Callback))
        .optional("pathItems", Expect::map(Path))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Schema)
        .referenceable()
        .optional("title", Expect::string())
        .optional("multipleOf", Expect::number())
        .optional("maximum", Expect::number())
        .optional("exclusiveMaximum", Expect::Scalar(ScalarKind::Any))
        .optional("minimum", Expect::number())
        .optional("exclusiveMinimum", Expect::Scalar(ScalarKind::Any))
        .optional("maxLength", Expect::integer())
        .optional("minLength", Expect::integer())
        .optional("pattern", Expect::string())
        .optional("maxItems", Expect::integer())
        .optional("minItems", Expect::integer())
        .optional("uniqueItems", Expect::boolean())
        .optional("maxProperties", Expect::integer())
        .optional("minProperties", Expect::integer())
        .optional("required", strings())
        .optional("enum", Expect::list(Expect::Any))
        .optional("const", Expect::Any)
        .optional("type", Expect::Any)
        .optional("allOf", Expect::list(Schema))
        .optional("oneOf", Expect::list(Schema))
        .optional("anyOf", Expect::list(Schema))
        .optional("not", Schema)
        .optional("items", Schema)
        .optional("properties", Expect::map(Schema))
        .optional(
            "additionalProperties",
            Expect::NodeOrScalar(Schema.into(), ScalarKind::Boolean),
        )
        .optional("description", Expect::string())
        .optional("format", Expect::string())
        .optional("default", Expect::Any)
        .optional("nullable", Expect::boolean())
        .optional("discriminator", Discriminator)
        .optional("readOnly", Expect::boolean())
        .optional("writeOnly", Expect::boolean())
        .optional("xml", Xml)
        .optional("externalDocs", ExternalDoc)
        .optional("example", Expect::Any)
        .optional("examples", Expect::Any)
        .optional("deprecated", Expect::boolean())
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(Discriminator)
        .required("propertyName", Expect::string())
        .optional("mapping", Expect::map(Expect::string()))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    text(g.object(Xml), &["name", "namespace", "prefix"])
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

    text(
        g.object(SecurityScheme)
            .referenceable()
            .required("type", Expect::string()),
        &["description", "name", "in", "scheme", "bearerFormat", "openIdConnectUrl"],
    )
    .optional("flows", OAuthFlows)
    .pattern(EXTENSION_PATTERN, Extension)
    .done();

    g.object(OAuthFlows)
        .optional("implicit", OAuthFlow)
        .optional("password", OAuthFlow)
        .optional("clientCredentials", OAuthFlow)
        .optional("authorizationCode", OAuthFlow)
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    text(g.object(OAuthFlow), &["authorizationUrl", "tokenUrl", "refreshUrl"])
        .required("scopes", Expect::map(Expect::string()))
        .pattern(EXTENSION_PATTERN, Extension)
        .done();

    g.object(SecurityRequirement).pattern(".*", strings()).done();
    g.array(Security, SecurityRequirement);
    g.any(Extension);
    g.any(XIbmConfiguration);

    g
}

/// Serialization fields shared by parameters and headers
fn serialization(o: ObjectBuilder<'_>) -> ObjectBuilder<'_> {
    use Kind::*;

    text(o, &["description", "style"])
        .optional("required", Expect::boolean())
        .optional("deprecated", Expect::boolean())
        .optional("allowEmptyValue", Expect::boolean())
        .optional("explode", Expect::boolean())
        .optional("allowReserved", Expect::boolean())
        .optional("schema", Schema)
        .optional("example", Expect::Any)
        .optional("examples", Expect::map(Example))
        .optional("content", Expect::map(MediaType))
}
