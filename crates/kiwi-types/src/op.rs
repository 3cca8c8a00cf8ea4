//! Operation kinds.
//!
//! The set of operations a program node may perform is closed. Parametrized
//! families (`filter_<attribute>`, `query_<attribute>`, `equal_<kind>`,
//! `same_<attribute>`) carry their parameter in the variant, and every kind
//! round-trips through its canonical wire name (`"filter_color"`,
//! `"relate"`, `"query_text_q"`, ...).

use crate::error::ParseOpKindError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ══════════════════════════════════════════════════════════════════════════════
// Attributes
// ══════════════════════════════════════════════════════════════════════════════

/// A queryable object attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Color,
    Shape,
    Material,
    Size,
    Text,
    #[serde(rename = "objectcategory")]
    ObjectCategory,
}

impl Attribute {
    pub const COUNT: usize = 6;

    /// Every attribute, in declaration order.
    pub const ALL: [Attribute; Self::COUNT] = [
        Attribute::Color,
        Attribute::Shape,
        Attribute::Material,
        Attribute::Size,
        Attribute::Text,
        Attribute::ObjectCategory,
    ];

    /// The key under which scene objects record this attribute.
    pub fn key(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Shape => "shape",
            Self::Material => "material",
            Self::Size => "size",
            Self::Text => "text",
            Self::ObjectCategory => "objectcategory",
        }
    }

    /// Look up an attribute by its object key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }

    /// Dense position of this attribute within [`Attribute::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What an `equal_<kind>` node compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqualKind {
    Attribute(Attribute),
    Integer,
    Object,
}

impl EqualKind {
    fn name(self) -> &'static str {
        match self {
            Self::Attribute(a) => a.key(),
            Self::Integer => "integer",
            Self::Object => "object",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(Self::Integer),
            "object" => Some(Self::Object),
            other => Attribute::from_key(other).map(Self::Attribute),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// OpKind
// ══════════════════════════════════════════════════════════════════════════════

/// The operation a program node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OpKind {
    /// Every object index in the scene.
    Scene,
    /// Keep indices whose attribute matches the side input.
    Filter(Attribute),
    /// The sole element of a one-element list.
    Unique,
    /// Adjacency-by-index relation lookup.
    Relate,
    /// Triple-store relation lookup.
    RelateTriple,
    Union,
    Intersect,
    Count,
    /// The literal value of one object's attribute.
    Query(Attribute),
    /// A value asserted by the question, read from run state.
    QueryTextQuestion,
    /// The text body attached to one object.
    QueryTextTerminal,
    Exist,
    Equal(EqualKind),
    LessThan,
    GreaterThan,
    /// Other objects sharing one object's attribute value.
    Same(Attribute),
}

impl OpKind {
    /// Whether this node is a spatial-relation step.
    pub fn is_relation(self) -> bool {
        matches!(self, Self::Relate | Self::RelateTriple)
    }
}

impl FromStr for OpKind {
    type Err = ParseOpKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "scene" => Some(Self::Scene),
            "unique" => Some(Self::Unique),
            "relate" => Some(Self::Relate),
            "relate_triple" | "vg_relate" => Some(Self::RelateTriple),
            "union" => Some(Self::Union),
            "intersect" => Some(Self::Intersect),
            "count" => Some(Self::Count),
            "query_text_q" | "query_text_question" => Some(Self::QueryTextQuestion),
            "query_text_terminal" => Some(Self::QueryTextTerminal),
            "exist" => Some(Self::Exist),
            "less_than" => Some(Self::LessThan),
            "greater_than" => Some(Self::GreaterThan),
            _ => {
                if let Some(attr) = s.strip_prefix("filter_") {
                    Attribute::from_key(attr).map(Self::Filter)
                } else if let Some(attr) = s.strip_prefix("query_") {
                    Attribute::from_key(attr).map(Self::Query)
                } else if let Some(kind) = s.strip_prefix("equal_") {
                    EqualKind::from_name(kind).map(Self::Equal)
                } else if let Some(attr) = s.strip_prefix("same_") {
                    Attribute::from_key(attr).map(Self::Same)
                } else {
                    None
                }
            }
        };
        kind.ok_or_else(|| ParseOpKindError(s.to_string()))
    }
}

impl TryFrom<String> for OpKind {
    type Error = ParseOpKindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OpKind> for String {
    fn from(kind: OpKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scene => write!(f, "scene"),
            Self::Filter(a) => write!(f, "filter_{a}"),
            Self::Unique => write!(f, "unique"),
            Self::Relate => write!(f, "relate"),
            Self::RelateTriple => write!(f, "relate_triple"),
            Self::Union => write!(f, "union"),
            Self::Intersect => write!(f, "intersect"),
            Self::Count => write!(f, "count"),
            Self::Query(a) => write!(f, "query_{a}"),
            Self::QueryTextQuestion => write!(f, "query_text_q"),
            Self::QueryTextTerminal => write!(f, "query_text_terminal"),
            Self::Exist => write!(f, "exist"),
            Self::Equal(k) => write!(f, "equal_{}", k.name()),
            Self::LessThan => write!(f, "less_than"),
            Self::GreaterThan => write!(f, "greater_than"),
            Self::Same(a) => write!(f, "same_{a}"),
        }
    }
}
