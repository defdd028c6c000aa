/// Code units (named, ranged declarations) and their content identity.
///
/// A unit's cache validity is decided purely by the SHA-256 digest of the
/// exact text covered by its range; see [`content_hash`].
pub mod document;
pub mod outline;

pub use document::{Document, Position, TextRange};
pub use outline::{JavaOutline, OutlineError, OutlineProvider};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Class,
    Interface,
    Enum,
    Method,
    Constructor,
}

impl UnitKind {
    /// Types: classes, interfaces and enums.
    pub fn is_type(self) -> bool {
        matches!(self, Self::Class | Self::Interface | Self::Enum)
    }

    /// Callables: methods and constructors.
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Method | Self::Constructor)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Method => "method",
            Self::Constructor => "constructor",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Name qualified by the enclosing types, e.g. `Outer.Inner.run`.
    pub name: String,
    pub kind: UnitKind,
    pub range: TextRange,
}

impl CodeUnit {
    pub fn new(name: impl Into<String>, kind: UnitKind, range: TextRange) -> Self {
        Self {
            name: name.into(),
            kind,
            range,
        }
    }

    pub fn start_line(&self) -> usize {
        self.range.start.line
    }

    pub fn end_line(&self) -> usize {
        self.range.end.line
    }

    /// Identity of the unit within its document: kind plus qualified name.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

impl fmt::Display for CodeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Hex-encoded SHA-256 of a unit's source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of the exact text `unit` spans in `document`.
pub fn content_hash(document: &Document, unit: &CodeUnit) -> ContentHash {
    ContentHash::of(document.text_in(&unit.range))
}
