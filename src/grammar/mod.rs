//! Grammar definitions
//!
//! A grammar maps each node kind of one OpenAPI version to the shape the
//! node must have. Shapes are stored in an arena indexed by the kind's
//! discriminant, so kinds refer to each other by value and never by
//! reference. Both grammars are compiled once per process and shared
//! read-only between concurrent analyses.

use crate::reader::{RawValue, ScalarType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Declares a grammar's kind enumeration together with its display names.
macro_rules! node_kinds {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every kind, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Display name of the kind
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub(crate) fn index(self) -> usize {
                self as usize
            }
        }
    };
}

pub mod v2;
pub mod v3;

/// Document version, detected from the root discriminant key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum Version {
    /// `swagger: "2.0"`
    V2,
    /// `openapi: "3.x.y"`
    V3,
}

impl Version {
    /// Inspect the root node's discriminant
    pub fn detect(root: &RawValue) -> Option<Self> {
        if let Some(swagger) = root.get("swagger").and_then(|v| v.as_str()) {
            return (swagger == "2.0" || swagger == "2").then_some(Version::V2);
        }
        root.get("openapi")
            .and_then(|v| v.as_str())
            .filter(|v| v.starts_with("3."))
            .map(|_| Version::V3)
    }

    /// Shared compiled grammar for this version
    pub fn grammar(self) -> &'static Grammar {
        match self {
            Version::V2 => &V2_GRAMMAR,
            Version::V3 => &V3_GRAMMAR,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V2 => write!(f, "2.0"),
            Version::V3 => write!(f, "3.x"),
        }
    }
}

/// Grammar-assigned meaning of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    V2(v2::Kind),
    V3(v3::Kind),
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::V2(k) => k.name(),
            NodeKind::V3(k) => k.name(),
        }
    }

    pub fn version(self) -> Version {
        match self {
            NodeKind::V2(_) => Version::V2,
            NodeKind::V3(_) => Version::V3,
        }
    }

    fn index(self) -> usize {
        match self {
            NodeKind::V2(k) => k.index(),
            NodeKind::V3(k) => k.index(),
        }
    }

    /// Path item in either grammar
    pub fn is_path(self) -> bool {
        matches!(self, NodeKind::V2(v2::Kind::Path) | NodeKind::V3(v3::Kind::Path))
    }

    pub fn is_operation(self) -> bool {
        matches!(
            self,
            NodeKind::V2(v2::Kind::Operation) | NodeKind::V3(v3::Kind::Operation)
        )
    }

    pub fn is_schema(self) -> bool {
        matches!(self, NodeKind::V2(v2::Kind::Schema) | NodeKind::V3(v3::Kind::Schema))
    }

    pub fn is_security(self) -> bool {
        matches!(
            self,
            NodeKind::V2(v2::Kind::Security) | NodeKind::V3(v3::Kind::Security)
        )
    }

    /// Kinds whose `enum` property lists allowed values
    pub fn declares_enum(self) -> bool {
        matches!(
            self,
            NodeKind::V2(
                v2::Kind::Schema | v2::Kind::Parameter | v2::Kind::Items | v2::Kind::Header
            ) | NodeKind::V3(
                v3::Kind::Schema | v3::Kind::Parameter | v3::Kind::Header | v3::Kind::ServerVariable
            )
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<v2::Kind> for NodeKind {
    fn from(k: v2::Kind) -> Self {
        NodeKind::V2(k)
    }
}

impl From<v3::Kind> for NodeKind {
    fn from(k: v3::Kind) -> Self {
        NodeKind::V3(k)
    }
}

/// Expected scalar type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Any non-null scalar
    String,
    Boolean,
    Integer,
    /// Integer or float
    Number,
    /// Any scalar, null included
    Any,
}

impl ScalarKind {
    pub fn accepts(self, ty: ScalarType) -> bool {
        match self {
            ScalarKind::Any => true,
            ScalarKind::String => ty != ScalarType::Null,
            ScalarKind::Boolean => ty == ScalarType::Boolean,
            ScalarKind::Integer => ty == ScalarType::Integer,
            ScalarKind::Number => matches!(ty, ScalarType::Integer | ScalarType::Float),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "string"),
            ScalarKind::Boolean => write!(f, "boolean"),
            ScalarKind::Integer => write!(f, "integer"),
            ScalarKind::Number => write!(f, "number"),
            ScalarKind::Any => write!(f, "scalar"),
        }
    }
}

/// What a child value must look like
#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    /// Typed node of the given kind
    Node(NodeKind),
    /// Scalar of the given type
    Scalar(ScalarKind),
    /// Anonymous sequence whose elements follow the inner expectation
    List(Box<Expect>),
    /// Anonymous map with free-form keys whose values follow the inner expectation
    Map(Box<Expect>),
    /// Typed node when the value is a map, otherwise a scalar of the given type
    NodeOrScalar(NodeKind, ScalarKind),
    /// Anything; kept untyped
    Any,
}

impl Expect {
    pub fn string() -> Self {
        Expect::Scalar(ScalarKind::String)
    }

    pub fn boolean() -> Self {
        Expect::Scalar(ScalarKind::Boolean)
    }

    pub fn integer() -> Self {
        Expect::Scalar(ScalarKind::Integer)
    }

    pub fn number() -> Self {
        Expect::Scalar(ScalarKind::Number)
    }

    pub fn list(inner: impl Into<Expect>) -> Self {
        Expect::List(Box::new(inner.into()))
    }

    pub fn map(inner: impl Into<Expect>) -> Self {
        Expect::Map(Box::new(inner.into()))
    }

    fn kinds(&self, out: &mut Vec<NodeKind>) {
        match self {
            Expect::Node(k) | Expect::NodeOrScalar(k, _) => out.push(*k),
            Expect::List(inner) | Expect::Map(inner) => inner.kinds(out),
            Expect::Scalar(_) | Expect::Any => {}
        }
    }
}

impl From<NodeKind> for Expect {
    fn from(k: NodeKind) -> Self {
        Expect::Node(k)
    }
}

impl From<v2::Kind> for Expect {
    fn from(k: v2::Kind) -> Self {
        Expect::Node(k.into())
    }
}

impl From<v3::Kind> for Expect {
    fn from(k: v3::Kind) -> Self {
        Expect::Node(k.into())
    }
}

/// A fixed property of an object shape
#[derive(Debug, Clone)]
pub struct PropertyRule {
    pub name: &'static str,
    pub required: bool,
    pub expect: Expect,
}

/// A dynamic-key rule: keys matching `pattern` follow `expect`
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub pattern: Regex,
    pub expect: Expect,
}

/// Structural form of a kind
#[derive(Debug, Clone)]
pub enum Shape {
    Object {
        properties: Vec<PropertyRule>,
        patterns: Vec<PatternRule>,
        allow_additional: bool,
    },
    /// Sequence whose elements follow the expectation
    Array(Expect),
    /// Any value; children are kept untyped
    Any,
}

/// Declared constraints of one node kind
#[derive(Debug, Clone)]
pub struct ShapeRule {
    pub kind: NodeKind,
    pub shape: Shape,
    /// Whether a `{$ref: ...}` object may stand in for this kind
    pub allow_ref: bool,
}

impl ShapeRule {
    pub fn property(&self, name: &str) -> Option<&PropertyRule> {
        match &self.shape {
            Shape::Object { properties, .. } => properties.iter().find(|p| p.name == name),
            _ => None,
        }
    }

    /// Required property names in declaration order
    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        let props: &[PropertyRule] = match &self.shape {
            Shape::Object { properties, .. } => properties,
            _ => &[],
        };
        props.iter().filter(|p| p.required).map(|p| p.name)
    }

    /// Expectation for a key of an object shape, `None` if the key is not allowed
    pub fn expect_for(&self, key: &str) -> Option<Expect> {
        let Shape::Object {
            properties,
            patterns,
            allow_additional,
        } = &self.shape
        else {
            return None;
        };
        if let Some(p) = properties.iter().find(|p| p.name == key) {
            return Some(p.expect.clone());
        }
        if let Some(p) = patterns.iter().find(|p| p.pattern.is_match(key)) {
            return Some(p.expect.clone());
        }
        allow_additional.then_some(Expect::Any)
    }
}

/// Grammar definition error, detected when the grammar is compiled
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("kind {0} has no shape")]
    MissingShape(&'static str),

    #[error("kind {0} is defined twice")]
    DuplicateShape(&'static str),

    #[error("kind {parent} refers to {child}, which belongs to another grammar")]
    ForeignKind {
        parent: &'static str,
        child: &'static str,
    },

    #[error("invalid pattern '{pattern}' in {kind}: {source}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled, read-only grammar
#[derive(Debug)]
pub struct Grammar {
    version: Version,
    root: NodeKind,
    shapes: Vec<ShapeRule>,
}

impl Grammar {
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn root(&self) -> NodeKind {
        self.root
    }

    pub fn shape(&self, kind: NodeKind) -> Option<&ShapeRule> {
        if kind.version() != self.version {
            return None;
        }
        self.shapes.get(kind.index())
    }

    pub fn shapes(&self) -> &[ShapeRule] {
        &self.shapes
    }
}

/// Collects shape rules and checks them for consistency
pub struct GrammarBuilder {
    version: Version,
    root: NodeKind,
    all: Vec<NodeKind>,
    slots: Vec<Option<ShapeRule>>,
    errors: Vec<GrammarError>,
}

impl GrammarBuilder {
    /// `all` lists every kind of the grammar in discriminant order
    pub fn new(version: Version, root: NodeKind, all: Vec<NodeKind>) -> Self {
        let slots = vec![None; all.len()];
        Self {
            version,
            root,
            all,
            slots,
            errors: Vec::new(),
        }
    }

    fn insert(&mut self, rule: ShapeRule) {
        let idx = rule.kind.index();
        match self.slots.get_mut(idx) {
            Some(slot) if slot.is_none() => *slot = Some(rule),
            _ => self.errors.push(GrammarError::DuplicateShape(rule.kind.name())),
        }
    }

    /// Start an object shape; properties not declared are rejected unless
    /// a pattern matches them
    pub fn object(&mut self, kind: impl Into<NodeKind>) -> ObjectBuilder<'_> {
        ObjectBuilder {
            grammar: self,
            kind: kind.into(),
            properties: Vec::new(),
            patterns: Vec::new(),
            allow_additional: false,
            allow_ref: false,
        }
    }

    pub fn array(&mut self, kind: impl Into<NodeKind>, element: impl Into<Expect>) {
        self.insert(ShapeRule {
            kind: kind.into(),
            shape: Shape::Array(element.into()),
            allow_ref: false,
        });
    }

    pub fn any(&mut self, kind: impl Into<NodeKind>) {
        self.insert(ShapeRule {
            kind: kind.into(),
            shape: Shape::Any,
            allow_ref: false,
        });
    }

    /// Validate and freeze the grammar
    pub fn compile(mut self) -> Result<Grammar, Vec<GrammarError>> {
        let mut shapes = Vec::with_capacity(self.slots.len());
        for (kind, slot) in self.all.iter().zip(std::mem::take(&mut self.slots)) {
            match slot {
                Some(rule) => shapes.push(rule),
                None => self.errors.push(GrammarError::MissingShape(kind.name())),
            }
        }

        for rule in &shapes {
            let mut referenced = Vec::new();
            match &rule.shape {
                Shape::Object {
                    properties,
                    patterns,
                    ..
                } => {
                    properties.iter().for_each(|p| p.expect.kinds(&mut referenced));
                    patterns.iter().for_each(|p| p.expect.kinds(&mut referenced));
                }
                Shape::Array(e) => e.kinds(&mut referenced),
                Shape::Any => {}
            }
            for child in referenced {
                if child.version() != self.version {
                    self.errors.push(GrammarError::ForeignKind {
                        parent: rule.kind.name(),
                        child: child.name(),
                    });
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Grammar {
                version: self.version,
                root: self.root,
                shapes,
            })
        } else {
            Err(self.errors)
        }
    }
}

/// Fluent definition of an object shape
pub struct ObjectBuilder<'g> {
    grammar: &'g mut GrammarBuilder,
    kind: NodeKind,
    properties: Vec<PropertyRule>,
    patterns: Vec<PatternRule>,
    allow_additional: bool,
    allow_ref: bool,
}

impl ObjectBuilder<'_> {
    pub fn required(mut self, name: &'static str, expect: impl Into<Expect>) -> Self {
        self.properties.push(PropertyRule {
            name,
            required: true,
            expect: expect.into(),
        });
        self
    }

    pub fn optional(mut self, name: &'static str, expect: impl Into<Expect>) -> Self {
        self.properties.push(PropertyRule {
            name,
            required: false,
            expect: expect.into(),
        });
        self
    }

    pub fn pattern(mut self, pattern: &str, expect: impl Into<Expect>) -> Self {
        match Regex::new(pattern) {
            Ok(re) => self.patterns.push(PatternRule {
                pattern: re,
                expect: expect.into(),
            }),
            Err(source) => self.grammar.errors.push(GrammarError::InvalidPattern {
                kind: self.kind.name(),
                pattern: pattern.to_string(),
                source,
            }),
        }
        self
    }

    pub fn additional(mut self) -> Self {
        self.allow_additional = true;
        self
    }

    pub fn referenceable(mut self) -> Self {
        self.allow_ref = true;
        self
    }

    pub fn done(self) {
        let rule = ShapeRule {
            kind: self.kind,
            shape: Shape::Object {
                properties: self.properties,
                patterns: self.patterns,
                allow_additional: self.allow_additional,
            },
            allow_ref: self.allow_ref,
        };
        self.grammar.insert(rule);
    }
}

/// Compile a built-in grammar, stopping the process if it is malformed.
fn compile_or_abort(builder: GrammarBuilder) -> Grammar {
    match builder.compile() {
        Ok(grammar) => grammar,
        Err(errors) => {
            let report: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            panic!("built-in grammar is malformed: {}", report.join("; "))
        }
    }
}

static V2_GRAMMAR: Lazy<Grammar> = Lazy::new(|| compile_or_abort(v2::definition()));
static V3_GRAMMAR: Lazy<Grammar> = Lazy::new(|| compile_or_abort(v3::definition()));

/// Force compilation of both grammars (call at startup to fail early)
pub fn init() {
    Lazy::force(&V2_GRAMMAR);
    Lazy::force(&V3_GRAMMAR);
}

/// Pattern for vendor extension keys
pub const EXTENSION_PATTERN: &str = "^x-";
