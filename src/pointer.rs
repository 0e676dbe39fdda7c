//! Document pointers
//!
//! A pointer is the canonical path from the document root to a node. It is
//! rendered as an RFC 6901 string (`/paths/~1pets/get`) and is the only
//! addressing scheme used for validation errors and issue locations.

use serde::{Serialize, Serializer};
use std::fmt;

/// One step of a pointer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// Map property
    Key(String),
    /// Sequence element
    Index(usize),
}

impl Step {
    /// Raw (unescaped) text of the step
    pub fn as_text(&self) -> String {
        match self {
            Step::Key(k) => k.clone(),
            Step::Index(i) => i.to_string(),
        }
    }
}

/// Canonical path from the document root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    steps: Vec<Step>,
}

impl Pointer {
    /// The root pointer (renders as the empty string)
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an RFC 6901 string. A leading `#` (URI fragment form) is accepted.
    ///
    /// Numeric segments are kept as keys; lookups treat a key that parses as
    /// an integer as an index when the target is a sequence.
    pub fn parse(s: &str) -> Self {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.is_empty() {
            return Self::root();
        }
        let s = s.strip_prefix('/').unwrap_or(s);
        let steps = s.split('/').map(|seg| Step::Key(unescape(seg))).collect();
        Self { steps }
    }

    /// New pointer with a property step appended
    pub fn key(&self, key: &str) -> Self {
        let mut steps = self.steps.clone();
        steps.push(Step::Key(key.to_string()));
        Self { steps }
    }

    /// New pointer with an index step appended
    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(Step::Index(index));
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Last step, if any
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Pointer of the parent node
    pub fn parent(&self) -> Option<Self> {
        if self.steps.is_empty() {
            return None;
        }
        let mut steps = self.steps.clone();
        steps.pop();
        Some(Self { steps })
    }

    /// Whether `self` is `other` or lies below it
    pub fn starts_with(&self, other: &Pointer) -> bool {
        self.steps.len() >= other.steps.len()
            && self
                .steps
                .iter()
                .zip(other.steps.iter())
                .all(|(a, b)| step_eq(a, b))
    }
}

fn step_eq(a: &Step, b: &Step) -> bool {
    match (a, b) {
        (Step::Key(x), Step::Key(y)) => x == y,
        (Step::Index(x), Step::Index(y)) => x == y,
        (Step::Key(k), Step::Index(i)) | (Step::Index(i), Step::Key(k)) => {
            k.parse::<usize>().ok() == Some(*i)
        }
    }
}

/// Escape a raw key for use as a pointer segment
pub fn escape(raw: &str) -> String {
    raw.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape`]. `~1` is decoded before `~0` so `~01` yields `~1`.
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                Step::Key(k) => write!(f, "/{}", escape(k))?,
                Step::Index(i) => write!(f, "/{}", i)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Pointer {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
