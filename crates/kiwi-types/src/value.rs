//! Values flowing between program nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The output of one program node.
///
/// `Invalid` is absorbing: once a node produces it, evaluation stops and it
/// becomes the program's answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// A set of object indices.
    Objects(Vec<usize>),
    /// A single object index.
    Object(usize),
    Bool(bool),
    Integer(i64),
    /// An attribute literal (color name, text body, ...).
    Literal(String),
    /// No well-defined answer.
    Invalid,
}

impl Value {
    /// Build a literal value.
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Objects(_) => "object list",
            Self::Object(_) => "object",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Literal(_) => "literal",
            Self::Invalid => "invalid",
        }
    }

    pub fn as_objects(&self) -> Option<&[usize]> {
        match self {
            Self::Objects(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<usize> {
        match self {
            Self::Object(idx) => Some(*idx),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<usize>> for Value {
    fn from(list: Vec<usize>) -> Self {
        Self::Objects(list)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Objects(list) => {
                write!(f, "[")?;
                for (i, idx) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{idx}")?;
                }
                write!(f, "]")
            }
            Self::Object(idx) => write!(f, "#{idx}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Literal(s) => write!(f, "{s}"),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}
