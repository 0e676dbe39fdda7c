//! Pointer tree document model
//!
//! A [`Document`] owns an arena of typed nodes built top-down from the
//! reader's [`RawValue`] tree. Nodes are stored in pre-order, so arena order
//! is traversal order. Rules only ever see [`Node`] handles, which borrow the
//! document immutably.

use crate::diagnostic::{ProblemKind, TextRange, ValidationError};
use crate::grammar::{Expect, NodeKind, ScalarKind, Shape, ShapeRule, Version};
use crate::pointer::{Pointer, Step};
use crate::reader::{self, resolve_chain, MapEntry, RawData, RawValue, ReferenceError, Scalar, Span};
use indexmap::IndexMap;
use log::debug;
use once_cell::unsync::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Index of a node in its document's arena
pub type NodeId = usize;

/// Failure to map a pointer back to source coordinates
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("pointer '{0}' does not resolve to a node")]
    Unresolved(String),
}

#[derive(Debug)]
enum NodeValue {
    Map(IndexMap<String, NodeId>),
    Sequence(Vec<NodeId>),
    Scalar(Scalar),
}

#[derive(Debug)]
struct NodeData {
    pointer: Pointer,
    kind: Option<NodeKind>,
    key_span: Option<Span>,
    span: Span,
    value: NodeValue,
    parent: Option<NodeId>,
    reference: Option<String>,
    resolved: OnceCell<Option<NodeId>>,
}

impl NodeData {
    fn location(&self) -> Span {
        self.key_span.unwrap_or(self.span)
    }
}

/// A parsed and grammar-typed document
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    version: Option<Version>,
    nodes: Vec<NodeData>,
    errors: Vec<ValidationError>,
    text: String,
}

impl Document {
    /// Parse a YAML or JSON document
    pub fn parse(content: &str, path: impl Into<PathBuf>) -> Self {
        Self::build(content.to_string(), reader::parse_str(content, 0), path.into())
    }

    /// Parse raw bytes; `source` tags every span of the document
    pub fn read(bytes: &[u8], path: impl Into<PathBuf>, source: usize) -> Self {
        let parsed = reader::parse(bytes, source);
        let text = String::from_utf8_lossy(bytes).into_owned();
        Self::build(text, parsed, path.into())
    }

    fn build(text: String, parsed: reader::Parsed, path: PathBuf) -> Self {
        let mut errors = parsed.errors;
        let clean = !errors.iter().any(ValidationError::is_syntax);

        let version = Version::detect(&parsed.root);
        if version.is_none() && clean {
            errors.push(ValidationError::new(
                ProblemKind::UnknownVersion,
                Pointer::root(),
                "Unable to detect the document version: expected 'swagger: \"2.0\"' or 'openapi: 3.x' at the root",
                parsed.root.span,
            ));
        }

        let grammar = version.map(Version::grammar);
        let mut builder = TreeBuilder {
            root: &parsed.root,
            report: clean,
            nodes: Vec::new(),
            errors,
            cycles: HashSet::new(),
        };
        let expect = grammar.map_or(Expect::Any, |g| Expect::Node(g.root()));
        builder.build(&parsed.root, Pointer::root(), None, None, &expect);

        debug!(
            "{}: built {} nodes (version {}), {} problem(s)",
            path.display(),
            builder.nodes.len(),
            version.map_or_else(|| "unknown".to_string(), |v| v.to_string()),
            builder.errors.len()
        );

        Self {
            path,
            version,
            nodes: builder.nodes,
            errors: builder.errors,
            text,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Original source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Validation errors, in discovery order
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Node<'_> {
        if self.nodes.is_empty() {
            Node::missing(self, Pointer::root())
        } else {
            Node::found(self, 0)
        }
    }

    /// Navigate from the root, following references
    pub fn at(&self, path: &str) -> Node<'_> {
        self.root().at(path)
    }

    /// Node whose canonical pointer is `pointer` (no reference following)
    pub fn node(&self, pointer: &Pointer) -> Node<'_> {
        match self.find(pointer) {
            Some(id) => Node::found(self, id),
            None => Node::missing(self, pointer.clone()),
        }
    }

    /// All nodes in depth-first pre-order
    pub fn walk(&self) -> impl Iterator<Item = Node<'_>> {
        (0..self.nodes.len()).map(move |id| Node::found(self, id))
    }

    /// Source range of the node at `pointer`: its key when it is a map
    /// entry, its value otherwise.
    pub fn locate(&self, pointer: &Pointer) -> Result<TextRange, LocateError> {
        let id = self
            .find(pointer)
            .ok_or_else(|| LocateError::Unresolved(pointer.to_string()))?;
        Ok(TextRange::new(self.path.clone(), &self.nodes[id].location()))
    }

    fn find(&self, pointer: &Pointer) -> Option<NodeId> {
        self.nodes.first()?;
        pointer
            .steps()
            .iter()
            .try_fold(0, |id, step| self.child(id, &step.as_text()))
    }

    fn child(&self, id: NodeId, text: &str) -> Option<NodeId> {
        match &self.nodes[id].value {
            NodeValue::Map(m) => m.get(text).copied(),
            NodeValue::Sequence(items) => items.get(text.parse::<usize>().ok()?).copied(),
            NodeValue::Scalar(_) => None,
        }
    }

    fn follow(&self, from: &Pointer, target: &str) -> Option<NodeId> {
        let mut stack = vec![from.clone()];
        let outcome = resolve_chain(target, &mut stack, |p| {
            let id = self.find(p)?;
            Some((id, self.nodes[id].reference.clone()))
        });
        match outcome {
            Ok(id) => Some(id),
            Err(e) => {
                debug!("{}: {}", from, e);
                None
            }
        }
    }
}

/// Read-only handle on a tree node, or the missing sentinel. A missing
/// node remembers the pointer it was asked for.
#[derive(Clone)]
pub struct Node<'a> {
    doc: &'a Document,
    id: Option<NodeId>,
    /// Pointer asked for; only meaningful when `id` is `None`
    requested: Pointer,
}

impl<'a> Node<'a> {
    fn found(doc: &'a Document, id: NodeId) -> Node<'a> {
        Node {
            doc,
            id: Some(id),
            requested: Pointer::root(),
        }
    }

    fn missing(doc: &'a Document, pointer: Pointer) -> Node<'a> {
        Node {
            doc,
            id: None,
            requested: pointer,
        }
    }

    fn data(&self) -> Option<&'a NodeData> {
        self.id.map(|id| &self.doc.nodes[id])
    }

    fn or_missing(&self, id: Option<NodeId>, requested: impl FnOnce() -> Pointer) -> Node<'a> {
        match id {
            Some(id) => Node::found(self.doc, id),
            None => Node::missing(self.doc, requested()),
        }
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn is_missing(&self) -> bool {
        self.id.is_none()
    }

    /// Grammar kind; `None` for untyped and missing nodes
    pub fn kind(&self) -> Option<NodeKind> {
        self.data().and_then(|d| d.kind)
    }

    pub fn is(&self, kind: impl Into<NodeKind>) -> bool {
        self.kind() == Some(kind.into())
    }

    /// Canonical pointer, or the requested pointer of a missing node
    pub fn pointer(&self) -> &Pointer {
        self.data().map_or(&self.requested, |d| &d.pointer)
    }

    /// Property name under which this node sits in its parent map
    pub fn key(&self) -> Option<&'a str> {
        match self.data()?.pointer.last()? {
            Step::Key(k) => Some(k.as_str()),
            Step::Index(_) => None,
        }
    }

    pub fn span(&self) -> Option<Span> {
        self.data().map(|d| d.span)
    }

    pub fn key_span(&self) -> Option<Span> {
        self.data().and_then(|d| d.key_span)
    }

    /// Scalar value, following references
    pub fn value(&self) -> Option<&'a Scalar> {
        match &self.resolve().data()?.value {
            NodeValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Text of a non-null scalar
    pub fn text(&self) -> Option<&'a str> {
        self.value()
            .filter(|s| s.ty != reader::ScalarType::Null)
            .map(|s| s.text.as_str())
    }

    pub fn is_ref(&self) -> bool {
        self.reference().is_some()
    }

    /// Raw `$ref` target when this is a reference node
    pub fn reference(&self) -> Option<&'a str> {
        self.data().and_then(|d| d.reference.as_deref())
    }

    /// Target of a reference node (missing when it cannot be resolved),
    /// the node itself otherwise. Resolution happens once and is cached.
    pub fn resolve(&self) -> Node<'a> {
        let Some(data) = self.data() else {
            return self.clone();
        };
        let Some(target) = &data.reference else {
            return self.clone();
        };
        let id = *data
            .resolved
            .get_or_init(|| self.doc.follow(&data.pointer, target));
        self.or_missing(id, || Pointer::parse(target))
    }

    /// Navigate a relative path (`/a/b`, `a/b` or `#/a/b`), following
    /// references at every step. Never fails: unresolved paths yield the
    /// missing node.
    pub fn at(&self, path: &str) -> Node<'a> {
        Pointer::parse(path)
            .steps()
            .iter()
            .fold(self.clone(), |node, step| node.step(&step.as_text()))
    }

    fn step(&self, text: &str) -> Node<'a> {
        let target = self.resolve();
        let id = target.id.and_then(|id| self.doc.child(id, text));
        self.or_missing(id, || target.pointer().key(text))
    }

    /// Ordered elements of a sequence node; empty for anything else
    pub fn elements(&self) -> Vec<Node<'a>> {
        match self.resolve().data().map(|d| &d.value) {
            Some(NodeValue::Sequence(items)) => items.iter().map(|id| Node::found(self.doc, *id)).collect(),
            _ => Vec::new(),
        }
    }

    /// Ordered properties of a map node; empty for anything else
    pub fn properties(&self) -> IndexMap<&'a str, Node<'a>> {
        match self.resolve().data().map(|d| &d.value) {
            Some(NodeValue::Map(m)) => m
                .iter()
                .map(|(k, id)| (k.as_str(), Node::found(self.doc, *id)))
                .collect(),
            _ => IndexMap::new(),
        }
    }

    /// Structural children in document order, without following references
    pub fn children(&self) -> Vec<Node<'a>> {
        let ids: Vec<NodeId> = match self.data().map(|d| &d.value) {
            Some(NodeValue::Map(m)) => m.values().copied().collect(),
            Some(NodeValue::Sequence(items)) => items.clone(),
            _ => Vec::new(),
        };
        ids.into_iter().map(|id| Node::found(self.doc, id)).collect()
    }

    /// Parent node. The parent of a missing node is missing too and
    /// carries the parent of the requested pointer.
    pub fn parent(&self) -> Node<'a> {
        match self.data() {
            Some(d) => self.or_missing(d.parent, || d.pointer.parent().unwrap_or_else(Pointer::root)),
            None => {
                let up = self.pointer().parent().unwrap_or_else(Pointer::root);
                Node::missing(self.doc, up)
            }
        }
    }

    /// Parent, grandparent, ... up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> {
        std::iter::successors(Some(self.parent()), |n| Some(n.parent()))
            .take_while(|n| !n.is_missing())
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id && self.requested == other.requested
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing() {
            return write!(f, "Node(missing {})", self.pointer());
        }
        f.debug_struct("Node")
            .field("pointer", &self.pointer().to_string())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Short description of a raw value for type-mismatch messages
fn describe(raw: &RawValue) -> String {
    match &raw.data {
        RawData::Map(_) => "object".to_string(),
        RawData::Sequence(_) => "array".to_string(),
        RawData::Scalar(s) => s.ty.to_string(),
    }
}

struct TreeBuilder<'r> {
    root: &'r RawValue,
    /// Grammar problems are not reported on a partial tree
    report: bool,
    nodes: Vec<NodeData>,
    errors: Vec<ValidationError>,
    cycles: HashSet<Vec<String>>,
}

impl<'r> TreeBuilder<'r> {
    fn build(
        &mut self,
        raw: &'r RawValue,
        pointer: Pointer,
        key_span: Option<Span>,
        parent: Option<NodeId>,
        expect: &Expect,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            pointer,
            kind: None,
            key_span,
            span: raw.span,
            value: NodeValue::Scalar(Scalar::null()),
            parent,
            reference: None,
            resolved: OnceCell::new(),
        });

        let value = match expect {
            Expect::Node(kind) => self.typed(id, raw, *kind),
            Expect::NodeOrScalar(kind, _) if raw.as_map().is_some() => self.typed(id, raw, *kind),
            Expect::NodeOrScalar(_, scalar) | Expect::Scalar(scalar) => self.scalar(id, raw, *scalar),
            Expect::List(inner) => match raw.as_sequence() {
                Some(items) => self.sequence(id, items, inner),
                None => self.mismatch(id, raw, "array"),
            },
            Expect::Map(inner) => match raw.as_map() {
                Some(entries) => self.entries(id, entries, |_| Some((**inner).clone())),
                None => self.mismatch(id, raw, "object"),
            },
            Expect::Any => self.untyped(id, raw),
        };
        self.nodes[id].value = value;
        id
    }

    fn problem(&mut self, kind: ProblemKind, pointer: Pointer, message: String, span: Span) {
        if self.report {
            self.errors.push(ValidationError::new(kind, pointer, message, span));
        }
    }

    fn typed(&mut self, id: NodeId, raw: &'r RawValue, kind: NodeKind) -> NodeValue {
        let Some(rule) = kind.version().grammar().shape(kind) else {
            return self.untyped(id, raw);
        };
        self.nodes[id].kind = Some(kind);

        if rule.allow_ref {
            if let Some(target) = raw.ref_target() {
                self.nodes[id].reference = Some(target.to_string());
                self.check_reference(id, raw);
                return self.untyped(id, raw);
            }
        }

        match &rule.shape {
            Shape::Object { .. } => match raw.as_map() {
                Some(entries) => self.object(id, entries, rule),
                None => self.mismatch(id, raw, "object"),
            },
            Shape::Array(element) => match raw.as_sequence() {
                Some(items) => self.sequence(id, items, element),
                None => self.mismatch(id, raw, "array"),
            },
            Shape::Any => self.untyped(id, raw),
        }
    }

    fn object(
        &mut self,
        id: NodeId,
        entries: &'r IndexMap<String, MapEntry>,
        rule: &'static ShapeRule,
    ) -> NodeValue {
        let missing: Vec<&str> = rule.required().filter(|n| !entries.contains_key(*n)).collect();
        if !missing.is_empty() {
            let node = &self.nodes[id];
            let (pointer, span) = (node.pointer.clone(), node.span);
            self.problem(
                ProblemKind::Shape,
                pointer,
                format!("Missing required properties: [{}]", missing.join(", ")),
                span,
            );
        }
        self.entries(id, entries, |key| rule.expect_for(key))
    }

    /// Build map children; `expect` returning `None` marks an unexpected key
    fn entries<F>(&mut self, id: NodeId, entries: &'r IndexMap<String, MapEntry>, expect: F) -> NodeValue
    where
        F: Fn(&str) -> Option<Expect>,
    {
        let mut props = IndexMap::with_capacity(entries.len());
        for (key, entry) in entries {
            let pointer = self.nodes[id].pointer.key(key);
            let expect = match expect(key) {
                Some(e) => e,
                None => {
                    self.problem(
                        ProblemKind::Shape,
                        pointer.clone(),
                        format!("Unexpected property: {}", key),
                        entry.key_span,
                    );
                    Expect::Any
                }
            };
            let child = self.build(&entry.value, pointer, Some(entry.key_span), Some(id), &expect);
            props.insert(key.clone(), child);
        }
        NodeValue::Map(props)
    }

    fn sequence(&mut self, id: NodeId, items: &'r [RawValue], expect: &Expect) -> NodeValue {
        let children = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let pointer = self.nodes[id].pointer.index(i);
                self.build(item, pointer, None, Some(id), expect)
            })
            .collect();
        NodeValue::Sequence(children)
    }

    fn scalar(&mut self, id: NodeId, raw: &'r RawValue, expected: ScalarKind) -> NodeValue {
        match raw.as_scalar() {
            Some(s) if expected.accepts(s.ty) => NodeValue::Scalar(s.clone()),
            _ => self.mismatch(id, raw, &expected.to_string()),
        }
    }

    /// Record a type mismatch and keep the value untyped
    fn mismatch(&mut self, id: NodeId, raw: &'r RawValue, expected: &str) -> NodeValue {
        self.nodes[id].kind = None;
        let node = &self.nodes[id];
        let (pointer, span) = (node.pointer.clone(), node.span);
        self.problem(
            ProblemKind::Shape,
            pointer,
            format!("Expected {} but found {}", expected, describe(raw)),
            span,
        );
        self.untyped(id, raw)
    }

    fn untyped(&mut self, id: NodeId, raw: &'r RawValue) -> NodeValue {
        match &raw.data {
            RawData::Map(entries) => self.entries(id, entries, |_| Some(Expect::Any)),
            RawData::Sequence(items) => self.sequence(id, items, &Expect::Any),
            RawData::Scalar(s) => NodeValue::Scalar(s.clone()),
        }
    }

    fn check_reference(&mut self, id: NodeId, raw: &'r RawValue) {
        let pointer = self.nodes[id].pointer.clone();
        let span = raw.get("$ref").map_or(raw.span, |v| v.span);
        match self.root.resolve(raw, &pointer) {
            Ok(_) => {}
            Err(ReferenceError::External(target)) => {
                debug!("{}: external reference {} is not followed", pointer, target);
            }
            Err(e @ ReferenceError::Unresolved(_)) => {
                self.problem(ProblemKind::UnresolvedReference, pointer, e.to_string(), span);
            }
            Err(ReferenceError::Circular(chain)) => {
                let mut members: Vec<String> = chain.iter().map(|p| p.to_string()).collect();
                members.sort();
                members.dedup();
                if self.cycles.insert(members) {
                    let message = ReferenceError::Circular(chain).to_string();
                    self.problem(ProblemKind::CircularReference, pointer, message, span);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{v2, v3};

    const PETSTORE: &str = r#"swagger: "2.0"
info:
  title: Petstore
  version: "1.0"
paths:
  /pets:
    get:
      responses:
        "200":
          description: A list of pets
          schema:
            $ref: '#/definitions/Pets'
  /pets/{petId}:
    get:
      parameters:
        - name: petId
          in: path
          required: true
          type: string
      responses:
        default:
          description: error
definitions:
  Pet:
    type: object
    required: [id]
    properties:
      id:
        type: integer
  Pets:
    type: array
    items:
      $ref: '#/definitions/Pet'
"#;

    fn doc(content: &str) -> Document {
        Document::parse(content, "api.yaml")
    }

    #[test]
    fn test_well_formed_document_has_no_errors() {
        let d = doc(PETSTORE);
        assert!(d.errors().is_empty(), "{:?}", d.errors());
        assert_eq!(d.version(), Some(Version::V2));
        assert!(d.root().is(v2::Kind::Root));
        assert!(d.at("/info/title").text() == Some("Petstore"));
        assert!(d.at("/paths/~1pets/get/responses").is(v2::Kind::Responses));
        assert!(d.at("/paths/~1pets~1{petId}/get/parameters/0").is(v2::Kind::Parameter));
    }

    #[test]
    fn test_missing_required_property() {
        let content = PETSTORE.replace(
            "      responses:\n        default:\n          description: error\n",
            "",
        );
        let d = doc(&content);
        assert_eq!(d.errors().len(), 1, "{:?}", d.errors());
        let err = &d.errors()[0];
        assert_eq!(err.kind, ProblemKind::Shape);
        assert_eq!(err.pointer.to_string(), "/paths/~1pets~1{petId}/get");
        assert_eq!(err.message, "Missing required properties: [responses]");
    }

    #[test]
    fn test_missing_properties_in_declaration_order() {
        let d = doc("swagger: '2.0'\ninfo: {}\n");
        let messages: Vec<&str> = d.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Missing required properties: [paths]",
                "Missing required properties: [title, version]"
            ]
        );
    }

    #[test]
    fn test_at_never_fails() {
        let d = doc(PETSTORE);
        let missing = d.at("/paths/~1nope/get/responses");
        assert!(missing.is_missing());
        assert!(missing.at("/a/b/c").is_missing());
        assert!(missing.elements().is_empty());
        assert!(missing.properties().is_empty());
        assert!(missing.parent().is_missing());
        assert_eq!(missing.parent().pointer().to_string(), "/paths/~1nope/get");
        assert!(d.at("/info/title/deeper").is_missing());
        assert!(d.at("/paths/~1pets/get/responses/200/description/0").is_missing());
        assert!(!d.at("").is_missing());
    }

    #[test]
    fn test_navigation_follows_references() {
        let d = doc(PETSTORE);
        let schema = d.at("/paths/~1pets/get/responses/200/schema");
        assert!(schema.is_ref());
        assert!(schema.is(v2::Kind::Schema));
        assert_eq!(schema.at("type").text(), Some("array"));
        assert_eq!(schema.at("items/properties/id/type").text(), Some("integer"));
        assert_eq!(schema.resolve().pointer().to_string(), "/definitions/Pets");
        assert_eq!(schema.resolve(), d.at("/definitions/Pets"));
    }

    #[test]
    fn test_elements_and_properties_keep_order() {
        let d = doc(PETSTORE);
        let keys: Vec<&str> = d.at("/paths").properties().keys().copied().collect();
        assert_eq!(keys, ["/pets", "/pets/{petId}"]);
        let params = d.at("/paths/~1pets~1{petId}/get/parameters").elements();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].pointer().to_string(), "/paths/~1pets~1{petId}/get/parameters/0");
        assert!(d.at("/info").elements().is_empty());
    }

    #[test]
    fn test_missing_node_keeps_requested_pointer() {
        let d = doc(PETSTORE);
        let missing = d.at("/nope/deeper");
        assert_eq!(missing.pointer().to_string(), "/nope/deeper");
        assert!(d.locate(missing.pointer()).is_err());
        assert_eq!(d.node(&Pointer::parse("/info/nope")).pointer().to_string(), "/info/nope");

        let through_ref = d.at("/paths/~1pets/get/responses/200/schema/nope");
        assert_eq!(through_ref.pointer().to_string(), "/definitions/Pets/nope");
        assert_ne!(missing, through_ref);
    }

    #[test]
    fn test_shape_errors_use_value_span() {
        let d = doc("swagger: '2.0'\ninfo:\n  title: Pets\npaths:\n  /pets:\n    get:\n      summary: list\n");
        let found: Vec<(usize, usize, &str)> = d
            .errors()
            .iter()
            .map(|e| (e.span.start.line, e.span.start.column, e.message.as_str()))
            .collect();
        assert_eq!(
            found,
            [
                (3, 2, "Missing required properties: [version]"),
                (7, 6, "Missing required properties: [responses]"),
            ]
        );

        let d = doc("openapi: 3.0.0\ninfo:\n  - title\npaths: {}\n");
        assert_eq!(d.errors()[0].span.start.line, 3);
        assert_eq!(d.errors()[0].span.start.column, 2);
    }

    #[test]
    fn test_duplicate_subtree_errors_resolve() {
        let d = doc("swagger: '2.0'\ninfo:\n  title: t\n  version: '1'\npaths: {}\nx-a:\n  y: 1\nx-a:\n  x: 1\n  x: 2\n");
        assert_eq!(d.errors().len(), 1, "{:?}", d.errors());
        assert_eq!(d.errors()[0].pointer.to_string(), "/x-a");
        for err in d.errors() {
            assert!(d.locate(&err.pointer).is_ok(), "{}", err.pointer);
        }
        assert_eq!(d.at("/x-a/y").text(), Some("1"));
    }

    #[test]
    fn test_walk_is_preorder() {
        let d = doc(PETSTORE);
        let pointers: Vec<String> = d.walk().take(4).map(|n| n.pointer().to_string()).collect();
        assert_eq!(pointers, ["", "/swagger", "/info", "/info/title"]);
    }

    #[test]
    fn test_circular_reference_reported_once() {
        let d = doc(
            "swagger: '2.0'\ninfo:\n  title: t\n  version: '1'\npaths: {}\ndefinitions:\n  A:\n    $ref: '#/definitions/B'\n  B:\n    $ref: '#/definitions/A'\n  C:\n    type: object\n",
        );
        let cycles: Vec<_> = d
            .errors()
            .iter()
            .filter(|e| e.kind == ProblemKind::CircularReference)
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].pointer.to_string(), "/definitions/A");
        assert_eq!(d.errors().len(), 1);
        assert!(d.at("/definitions/A").resolve().is_missing());
        assert!(d.at("/definitions/A/type").is_missing());
        assert_eq!(d.at("/definitions/C/type").text(), Some("object"));
    }

    #[test]
    fn test_unresolved_reference() {
        let d = doc(
            "swagger: '2.0'\ninfo:\n  title: t\n  version: '1'\npaths: {}\ndefinitions:\n  A:\n    $ref: '#/definitions/Nope'\n",
        );
        assert_eq!(d.errors().len(), 1);
        assert_eq!(d.errors()[0].kind, ProblemKind::UnresolvedReference);
        assert_eq!(d.errors()[0].span.start.line, 8);
        assert!(d.at("/definitions/A").resolve().is_missing());
    }

    #[test]
    fn test_duplicate_key_keeps_first_value() {
        let d = doc("swagger: '2.0'\ninfo:\n  title: first\n  title: second\n  version: '1'\npaths: {}\n");
        assert_eq!(d.errors().len(), 1);
        assert_eq!(d.errors()[0].kind, ProblemKind::DuplicateKey);
        assert_eq!(d.at("/info/title").text(), Some("first"));
        assert_eq!(d.at("/info").properties().len(), 2);
    }

    #[test]
    fn test_unexpected_property_and_extensions() {
        let d = doc("swagger: '2.0'\ninfo:\n  title: t\n  version: '1'\n  x-logo: logo.png\n  colour: blue\npaths: {}\n");
        assert_eq!(d.errors().len(), 1);
        assert_eq!(d.errors()[0].pointer.to_string(), "/info/colour");
        assert_eq!(d.errors()[0].message, "Unexpected property: colour");
        assert!(d.at("/info/x-logo").is(v2::Kind::Extension));
        assert!(d.at("/info/colour").kind().is_none());
    }

    #[test]
    fn test_type_mismatch_keeps_subtree() {
        let d = doc("openapi: 3.0.0\ninfo:\n  - title\npaths: {}\n");
        assert_eq!(d.errors().len(), 1);
        assert_eq!(d.errors()[0].message, "Expected object but found array");
        assert!(d.at("/info").kind().is_none());
        assert_eq!(d.at("/info/0").text(), Some("title"));
    }

    #[test]
    fn test_unknown_version() {
        let d = doc("asyncapi: 2.0.0\ninfo: {}\n");
        assert_eq!(d.version(), None);
        assert_eq!(d.errors().len(), 1);
        assert_eq!(d.errors()[0].kind, ProblemKind::UnknownVersion);
        assert!(d.root().kind().is_none());
        assert_eq!(d.at("/asyncapi").text(), Some("2.0.0"));
    }

    #[test]
    fn test_syntax_error_is_single_problem() {
        let d = doc("openapi: 3.0.0\ninfo: [unclosed\n");
        assert_eq!(d.errors().len(), 1);
        assert!(d.errors()[0].is_syntax());
        assert!(!d.root().is_missing());
    }

    #[test]
    fn test_error_pointers_resolve() {
        let d = doc("openapi: 3.0.0\ninfo:\n  title: 1\n  title: 2\n  extra: x\npaths:\n  /a:\n    get: {}\ncomponents:\n  schemas:\n    S:\n      $ref: '#/components/schemas/T'\n");
        assert!(d.errors().len() >= 4, "{:?}", d.errors());
        for err in d.errors() {
            assert!(!d.node(&err.pointer).is_missing(), "{}", err.pointer);
            assert!(d.locate(&err.pointer).is_ok());
        }
    }

    #[test]
    fn test_locate_uses_key_span() {
        let d = doc(PETSTORE);
        let range = d.locate(&Pointer::parse("/paths/~1pets/get")).unwrap();
        assert_eq!((range.start_line, range.start_column), (7, 4));
        assert_eq!((range.end_line, range.end_column), (7, 7));
        let root = d.locate(&Pointer::root()).unwrap();
        assert_eq!(root.start_line, 1);
        assert!(d.locate(&Pointer::parse("/nope")).is_err());
    }

    #[test]
    fn test_parent_and_ancestors() {
        let d = doc(PETSTORE);
        let op = d.at("/paths/~1pets/get");
        assert_eq!(op.key(), Some("get"));
        assert!(op.parent().is(v2::Kind::Path));
        let kinds: Vec<Option<NodeKind>> = op.ancestors().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            [
                Some(v2::Kind::Path.into()),
                Some(v2::Kind::Paths.into()),
                Some(v2::Kind::Root.into())
            ]
        );
    }

    #[test]
    fn test_v3_document() {
        let d = doc(r#"{"openapi": "3.0.3", "info": {"title": "t", "version": "1"},
 "paths": {"/pets": {"post": {"requestBody": {"content": {"application/json": {"schema": {"oneOf": [{"type": "string"}, {"type": "integer"}]}}}},
   "responses": {"201": {"description": "created"}}}}}}"#);
        assert!(d.errors().is_empty(), "{:?}", d.errors());
        assert_eq!(d.version(), Some(Version::V3));
        let schema = d.at("/paths/~1pets/post/requestBody/content/application~1json/schema");
        assert!(schema.is(v3::Kind::Schema));
        assert_eq!(schema.at("oneOf").elements().len(), 2);
        assert!(schema.at("oneOf/1").is(v3::Kind::Schema));
    }
}
