//! Structured-text reader
//!
//! Turns YAML (and therefore JSON) source into a generic [`RawValue`] tree
//! where every node remembers its source span. The reader never fails:
//! syntax errors become a single [`ValidationError`] and the tree built so
//! far is returned.

use crate::diagnostic::{ProblemKind, ValidationError};
use crate::pointer::Pointer;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Position in the source text.
///
/// `line` is 1-based, `column` is 0-based, `offset` counts characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    fn from_marker(mark: &Marker) -> Self {
        Self::new(mark.line(), mark.col(), mark.index())
    }

    fn advance(self, chars: usize) -> Self {
        Self::new(self.line, self.column + chars, self.offset + chars)
    }
}

/// Source range of a node, tagged with the id of the file it came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub source: usize,
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(source: usize, start: Position, end: Position) -> Self {
        Self { source, start, end }
    }

    pub fn point(source: usize, at: Position) -> Self {
        Self::new(source, at, at)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Lines covered by this span (inclusive)
    pub fn lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start.line..=self.end.line.max(self.start.line)
    }
}

/// Resolved type of a scalar (YAML 1.2 core schema)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Null,
    Boolean,
    Integer,
    Float,
    String,
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Null => write!(f, "null"),
            ScalarType::Boolean => write!(f, "boolean"),
            ScalarType::Integer => write!(f, "integer"),
            ScalarType::Float => write!(f, "number"),
            ScalarType::String => write!(f, "string"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scalar {
    pub text: String,
    pub ty: ScalarType,
}

impl Scalar {
    fn plain(text: String) -> Self {
        let ty = classify_plain(&text);
        Self { text, ty }
    }

    fn quoted(text: String) -> Self {
        Self {
            text,
            ty: ScalarType::String,
        }
    }

    pub fn null() -> Self {
        Self {
            text: String::new(),
            ty: ScalarType::Null,
        }
    }
}

fn classify_plain(text: &str) -> ScalarType {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarType::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return ScalarType::Boolean,
        ".inf" | "+.inf" | "-.inf" | ".Inf" | ".INF" | ".nan" | ".NaN" | ".NAN" => {
            return ScalarType::Float
        }
        _ => {}
    }
    let digits = text.strip_prefix(&['-', '+'][..]).unwrap_or(text);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return ScalarType::Integer;
    }
    if digits.starts_with("0x") || digits.starts_with("0o") {
        return ScalarType::Integer;
    }
    if digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') && text.parse::<f64>().is_ok() {
        return ScalarType::Float;
    }
    ScalarType::String
}

/// Map entry: the key's own span plus the value
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key_span: Span,
    pub value: RawValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawData {
    Map(IndexMap<String, MapEntry>),
    Sequence(Vec<RawValue>),
    Scalar(Scalar),
}

/// A node of the generic value tree
#[derive(Debug, Clone, PartialEq)]
pub struct RawValue {
    pub span: Span,
    pub data: RawData,
}

impl RawValue {
    pub fn null(span: Span) -> Self {
        Self {
            span,
            data: RawData::Scalar(Scalar::null()),
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, MapEntry>> {
        match &self.data {
            RawData::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[RawValue]> {
        match &self.data {
            RawData::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.data {
            RawData::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar()
            .filter(|s| s.ty != ScalarType::Null)
            .map(|s| s.text.as_str())
    }

    /// Property of a map value
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.as_map().and_then(|m| m.get(key)).map(|e| &e.value)
    }

    /// `$ref` target when this value is a reference object
    pub fn ref_target(&self) -> Option<&str> {
        self.get("$ref").and_then(|v| v.as_str())
    }

    /// Structural lookup, without following references
    pub fn lookup(&self, pointer: &Pointer) -> Option<&RawValue> {
        let mut current = self;
        for step in pointer.steps() {
            let text = step.as_text();
            current = match &current.data {
                RawData::Map(m) => &m.get(&text)?.value,
                RawData::Sequence(items) => items.get(text.parse::<usize>().ok()?)?,
                RawData::Scalar(_) => return None,
            };
        }
        Some(current)
    }

    /// Follow the `$ref` chain starting at `value` (which lives at `at`)
    /// and return the first non-reference value.
    pub fn resolve<'a>(&'a self, value: &'a RawValue, at: &Pointer) -> Result<&'a RawValue, ReferenceError> {
        let Some(first) = value.ref_target() else {
            return Ok(value);
        };
        let mut stack = vec![at.clone()];
        resolve_chain(first, &mut stack, |p| {
            self.lookup(p).map(|v| (v, v.ref_target().map(String::from)))
        })
    }
}

/// Failure to follow a `$ref` edge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Unable to resolve reference: {0}")]
    Unresolved(String),

    #[error("Circular reference: {}", render_chain(.0))]
    Circular(Vec<Pointer>),

    #[error("External reference not followed: {0}")]
    External(String),
}

fn render_chain(chain: &[Pointer]) -> String {
    chain
        .iter()
        .map(|p| format!("#{}", p))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Follow a chain of same-document references.
///
/// `stack` holds the pointers whose resolution is in progress; a target
/// already on it is a cycle. `lookup` returns the item at a pointer and,
/// when that item is itself a reference, its target.
pub fn resolve_chain<T, F>(first: &str, stack: &mut Vec<Pointer>, mut lookup: F) -> Result<T, ReferenceError>
where
    F: FnMut(&Pointer) -> Option<(T, Option<String>)>,
{
    let mut target = first.to_string();
    loop {
        if !target.starts_with('#') {
            return Err(ReferenceError::External(target));
        }
        let pointer = Pointer::parse(&target);
        if let Some(pos) = stack.iter().position(|p| *p == pointer) {
            let mut chain = stack[pos..].to_vec();
            chain.push(pointer);
            return Err(ReferenceError::Circular(chain));
        }
        stack.push(pointer.clone());
        match lookup(&pointer) {
            None => return Err(ReferenceError::Unresolved(target)),
            Some((item, None)) => return Ok(item),
            Some((_, Some(next))) => target = next,
        }
    }
}

/// Result of reading one document
#[derive(Debug)]
pub struct Parsed {
    pub root: RawValue,
    pub errors: Vec<ValidationError>,
}

/// Read raw bytes. Invalid UTF-8 is reported as a syntax error.
pub fn parse(bytes: &[u8], source: usize) -> Parsed {
    match std::str::from_utf8(bytes) {
        Ok(text) => parse_str(text, source),
        Err(e) => {
            let at = Span::point(source, Position::new(1, 0, 0));
            Parsed {
                root: RawValue::null(at),
                errors: vec![ValidationError::new(
                    ProblemKind::Syntax,
                    Pointer::root(),
                    format!("Invalid UTF-8 input: {}", e),
                    at,
                )],
            }
        }
    }
}

/// Read a YAML or JSON document
pub fn parse_str(content: &str, source: usize) -> Parsed {
    let mut builder = TreeBuilder::new(content, source);
    let mut parser = Parser::new(content.chars());
    let outcome = parser.load(&mut builder, false);

    if let Err(e) = outcome {
        let at = Position::from_marker(e.marker());
        log::debug!("syntax error at {}:{}: {}", at.line, at.column, e.info());
        builder.fail(at, e.info());
    }
    builder.finish()
}

/// Drop the problems recorded since `mark` that point strictly below
/// `under`: they belong to a value that is not kept in the tree.
fn forget_problems_below(errors: &mut Vec<ValidationError>, mark: usize, under: &Pointer) {
    let from = mark.min(errors.len());
    let kept: Vec<ValidationError> = errors
        .drain(from..)
        .filter(|e| e.pointer == *under || !e.pointer.starts_with(under))
        .collect();
    errors.extend(kept);
}

enum PendingKey {
    None,
    Key(String, Span),
    Skip,
}

enum FrameData {
    Map {
        entries: IndexMap<String, MapEntry>,
        pending: PendingKey,
    },
    Sequence(Vec<RawValue>),
}

struct Frame {
    pointer: Pointer,
    start: Position,
    end: Position,
    anchor: usize,
    flow: bool,
    /// Number of problems recorded before the frame opened
    mark: usize,
    data: FrameData,
}

/// Receives parser events and assembles the value tree
struct TreeBuilder {
    chars: Vec<char>,
    source: usize,
    stack: Vec<Frame>,
    anchors: HashMap<usize, RawValue>,
    root: Option<RawValue>,
    errors: Vec<ValidationError>,
    done: bool,
}

impl TreeBuilder {
    fn new(content: &str, source: usize) -> Self {
        Self {
            chars: content.chars().collect(),
            source,
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            errors: Vec::new(),
            done: false,
        }
    }

    /// Pointer the next value will occupy
    fn next_pointer(&self) -> Pointer {
        match self.stack.last() {
            None => Pointer::root(),
            Some(frame) => match &frame.data {
                FrameData::Map {
                    pending: PendingKey::Key(k, _),
                    ..
                } => frame.pointer.key(k),
                FrameData::Map { .. } => frame.pointer.clone(),
                FrameData::Sequence(items) => frame.pointer.index(items.len()),
            },
        }
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(offset).copied()
    }

    fn scalar_span(&self, text: &str, style: TScalarStyle, start: Position) -> (Span, bool) {
        let width = text.chars().count();
        let end = match style {
            TScalarStyle::Plain => {
                // Implicit empty values are reported as "~" at the next token
                if text == "~" && self.char_at(start.offset) != Some('~') {
                    return (Span::point(self.source, start), true);
                }
                start.advance(width)
            }
            TScalarStyle::SingleQuoted | TScalarStyle::DoubleQuoted => start.advance(width + 2),
            _ => {
                let lines: Vec<&str> = text.lines().collect();
                let last = lines.last().map(|l| l.chars().count()).unwrap_or(0);
                Position::new(start.line + lines.len().max(1), last, start.offset + width)
            }
        };
        (Span::new(self.source, start, end), false)
    }

    /// Attach a finished value to the open frame. Problems recorded from
    /// `mark` on belong to the value's own subtree.
    fn push_value(&mut self, value: RawValue, anchor: usize, mark: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
        let Some(frame) = self.stack.last_mut() else {
            if self.root.is_none() {
                self.root = Some(value);
            }
            return;
        };
        if value.span.end > frame.end {
            frame.end = value.span.end;
        }
        let map_pointer = frame.pointer.clone();
        match &mut frame.data {
            FrameData::Sequence(items) => items.push(value),
            FrameData::Map { entries, pending } => match std::mem::replace(pending, PendingKey::None) {
                PendingKey::None => match value.data {
                    RawData::Scalar(s) => *pending = PendingKey::Key(s.text, value.span),
                    _ => {
                        *pending = PendingKey::Skip;
                        forget_problems_below(&mut self.errors, mark, &map_pointer);
                        self.errors.push(ValidationError::new(
                            ProblemKind::Shape,
                            map_pointer,
                            "Mapping keys must be scalars",
                            value.span,
                        ));
                    }
                },
                PendingKey::Skip => forget_problems_below(&mut self.errors, mark, &map_pointer),
                PendingKey::Key(key, key_span) => {
                    if entries.contains_key(&key) {
                        let discarded = map_pointer.key(&key);
                        forget_problems_below(&mut self.errors, mark, &discarded);
                        self.errors.push(ValidationError::new(
                            ProblemKind::DuplicateKey,
                            discarded,
                            format!("Duplicate key: \"{}\"", key),
                            key_span,
                        ));
                    } else {
                        entries.insert(key, MapEntry { key_span, value });
                    }
                }
            },
        }
    }

    fn open(&mut self, data: FrameData, anchor: usize, mark: &Marker) {
        let start = Position::from_marker(mark);
        let flow = matches!(self.char_at(start.offset), Some('{') | Some('['));
        let pointer = self.next_pointer();
        self.stack.push(Frame {
            pointer,
            start,
            end: start,
            anchor,
            flow,
            mark: self.errors.len(),
            data,
        });
    }

    fn close(&mut self, at: Option<Position>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let end = match at {
            Some(pos) if frame.flow => pos.advance(1),
            _ => frame.end,
        };
        let data = match frame.data {
            FrameData::Map { entries, .. } => RawData::Map(entries),
            FrameData::Sequence(items) => RawData::Sequence(items),
        };
        let value = RawValue {
            span: Span::new(self.source, frame.start, end.max(frame.start)),
            data,
        };
        self.push_value(value, frame.anchor, frame.mark);
    }

    fn fail(&mut self, at: Position, info: &str) {
        self.errors.push(ValidationError::new(
            ProblemKind::Syntax,
            Pointer::root(),
            format!("Syntax error: {}", info),
            Span::point(self.source, at),
        ));
        while !self.stack.is_empty() {
            self.close(None);
        }
    }

    fn finish(mut self) -> Parsed {
        while !self.stack.is_empty() {
            self.close(None);
        }
        let root = self
            .root
            .unwrap_or_else(|| RawValue::null(Span::point(self.source, Position::new(1, 0, 0))));
        Parsed {
            root,
            errors: self.errors,
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        if self.done {
            return;
        }
        match ev {
            Event::Scalar(text, style, anchor, _) => {
                let start = Position::from_marker(&mark);
                let (span, implicit) = self.scalar_span(&text, style, start);
                let scalar = if implicit {
                    Scalar::null()
                } else if matches!(style, TScalarStyle::Plain) {
                    Scalar::plain(text)
                } else {
                    Scalar::quoted(text)
                };
                let mark = self.errors.len();
                self.push_value(
                    RawValue {
                        span,
                        data: RawData::Scalar(scalar),
                    },
                    anchor,
                    mark,
                );
            }
            Event::MappingStart(anchor, ..) => self.open(
                FrameData::Map {
                    entries: IndexMap::new(),
                    pending: PendingKey::None,
                },
                anchor,
                &mark,
            ),
            Event::SequenceStart(anchor, ..) => {
                self.open(FrameData::Sequence(Vec::new()), anchor, &mark)
            }
            Event::MappingEnd | Event::SequenceEnd => {
                self.close(Some(Position::from_marker(&mark)))
            }
            Event::Alias(id) => {
                let value = self.anchors.get(&id).cloned().unwrap_or_else(|| {
                    RawValue::null(Span::point(self.source, Position::from_marker(&mark)))
                });
                let mark = self.errors.len();
                self.push_value(value, 0, mark);
            }
            Event::DocumentEnd => self.done = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(content: &str) -> Parsed {
        parse_str(content, 0)
    }

    #[test]
    fn test_map_order_preserved() {
        let parsed = read("b: 1\na: 2\nc: 3\n");
        assert!(parsed.errors.is_empty());
        let keys: Vec<&String> = parsed.root.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_scalar_types() {
        let parsed = read("a: 1\nb: 1.5\nc: true\nd: ~\ne: text\nf: '1'\n");
        let ty = |k: &str| parsed.root.get(k).unwrap().as_scalar().unwrap().ty;
        assert_eq!(ty("a"), ScalarType::Integer);
        assert_eq!(ty("b"), ScalarType::Float);
        assert_eq!(ty("c"), ScalarType::Boolean);
        assert_eq!(ty("d"), ScalarType::Null);
        assert_eq!(ty("e"), ScalarType::String);
        assert_eq!(ty("f"), ScalarType::String);
    }

    #[test]
    fn test_spans() {
        let parsed = read("info:\n  title: Pets\n");
        let info = parsed.root.as_map().unwrap().get("info").unwrap();
        assert_eq!(info.key_span.start, Position::new(1, 0, 0));
        assert_eq!(info.key_span.end.column, 4);

        let title = info.value.as_map().unwrap().get("title").unwrap();
        assert_eq!(title.key_span.start.line, 2);
        assert_eq!(title.key_span.start.column, 2);
        assert_eq!(title.value.span.start.column, 9);
        assert_eq!(title.value.span.end.column, 13);
    }

    #[test]
    fn test_quoted_span_includes_quotes() {
        let parsed = read("a: \"xy\"\n");
        let a = parsed.root.get("a").unwrap();
        assert_eq!(a.span.start.column, 3);
        assert_eq!(a.span.end.column, 7);
    }

    #[test]
    fn test_implicit_null_is_empty_span() {
        let parsed = read("a:\nb: 1\n");
        let a = parsed.root.get("a").unwrap();
        assert_eq!(a.as_scalar().unwrap().ty, ScalarType::Null);
        assert!(a.span.is_empty());
    }

    #[test]
    fn test_duplicate_key_keeps_first() {
        let parsed = read("a: 1\nb: 2\na: 3\n");
        assert_eq!(parsed.errors.len(), 1);
        let err = &parsed.errors[0];
        assert_eq!(err.kind, ProblemKind::DuplicateKey);
        assert_eq!(err.pointer.to_string(), "/a");
        assert_eq!(err.span.start.line, 3);
        assert_eq!(parsed.root.get("a").unwrap().as_str(), Some("1"));
    }

    #[test]
    fn test_duplicate_value_problems_are_dropped() {
        let parsed = read("x-a:\n  y: 1\nx-a:\n  x: 1\n  x: 2\n");
        assert_eq!(parsed.errors.len(), 1, "{:?}", parsed.errors);
        assert_eq!(parsed.errors[0].kind, ProblemKind::DuplicateKey);
        assert_eq!(parsed.errors[0].pointer.to_string(), "/x-a");
        assert_eq!(parsed.errors[0].span.start.line, 3);
        assert!(parsed.root.lookup(&parsed.errors[0].pointer).is_some());
    }

    #[test]
    fn test_problems_in_kept_duplicate_siblings_survive() {
        let parsed = read("a:\n  b: 1\n  b: 2\nc: 1\nc:\n  d: 1\n  d: 2\n");
        let pointers: Vec<String> = parsed.errors.iter().map(|e| e.pointer.to_string()).collect();
        assert_eq!(pointers, ["/a/b", "/c"]);
        for err in &parsed.errors {
            assert!(parsed.root.lookup(&err.pointer).is_some(), "{}", err.pointer);
        }
    }

    #[test]
    fn test_complex_key_is_shape_problem() {
        let parsed = read("? [a, b]\n: 1\nc: 2\n");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].kind, ProblemKind::Shape);
        assert!(!parsed.errors[0].is_syntax());
        assert_eq!(parsed.root.get("c").unwrap().as_str(), Some("2"));
    }

    #[test]
    fn test_json_input() {
        let parsed = read("{\"swagger\": \"2.0\", \"tags\": [{\"name\": \"a\"}]}");
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.root.get("swagger").unwrap().as_str(), Some("2.0"));
        let tags = parsed.root.get("tags").unwrap().as_sequence().unwrap();
        assert_eq!(tags[0].get("name").unwrap().as_str(), Some("a"));
        assert_eq!(parsed.root.span.end.column, 43);
    }

    #[test]
    fn test_syntax_error_keeps_partial_tree() {
        let parsed = read("a: 1\nb: [1, 2\n");
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].is_syntax());
        assert!(parsed.errors[0].pointer.is_root());
        assert_eq!(parsed.root.get("a").unwrap().as_str(), Some("1"));
    }

    #[test]
    fn test_empty_document() {
        let parsed = read("");
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.root.as_scalar().unwrap().ty, ScalarType::Null);
    }

    #[test]
    fn test_invalid_utf8() {
        let parsed = parse(&[0x61, 0xff, 0x62], 3);
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].is_syntax());
        assert_eq!(parsed.root.span.source, 3);
    }

    #[test]
    fn test_alias_expands_anchor() {
        let parsed = read("base: &b {x: 1}\ncopy: *b\n");
        assert!(parsed.errors.is_empty());
        assert_eq!(
            parsed.root.get("copy").unwrap().get("x").unwrap().as_str(),
            Some("1")
        );
    }

    #[test]
    fn test_resolve_reference_chain() {
        let parsed = read("a:\n  $ref: '#/b'\nb:\n  $ref: '#/c'\nc:\n  type: string\n");
        let root = &parsed.root;
        let a = root.get("a").unwrap();
        let target = root.resolve(a, &Pointer::parse("/a")).unwrap();
        assert_eq!(target.get("type").unwrap().as_str(), Some("string"));
    }

    #[test]
    fn test_resolve_detects_cycle() {
        let parsed = read("a:\n  $ref: '#/b'\nb:\n  $ref: '#/a'\n");
        let root = &parsed.root;
        let err = root
            .resolve(root.get("a").unwrap(), &Pointer::parse("/a"))
            .unwrap_err();
        match err {
            ReferenceError::Circular(chain) => {
                let rendered: Vec<String> = chain.iter().map(|p| p.to_string()).collect();
                assert_eq!(rendered, ["/a", "/b", "/a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_unresolved_and_external() {
        let parsed = read("a:\n  $ref: '#/missing'\nb:\n  $ref: 'other.yaml#/x'\n");
        let root = &parsed.root;
        assert!(matches!(
            root.resolve(root.get("a").unwrap(), &Pointer::parse("/a")),
            Err(ReferenceError::Unresolved(_))
        ));
        assert!(matches!(
            root.resolve(root.get("b").unwrap(), &Pointer::parse("/b")),
            Err(ReferenceError::External(_))
        ));
    }
}
