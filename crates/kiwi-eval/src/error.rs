//! Contract violations raised while evaluating a program.
//!
//! A program that does not have a well-defined answer evaluates to
//! [`Value::Invalid`](kiwi_types::Value::Invalid); these errors are for
//! programs that are malformed and should have been rejected upstream.

use kiwi_types::{Attribute, OpKind, ProgramError};
use thiserror::Error;

/// Evaluation error: the program broke the node contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Structural defect found before or during evaluation.
    #[error(transparent)]
    Program(#[from] ProgramError),

    /// A handler received the wrong number of inputs.
    #[error("{kind} expects {expected} input(s), got {got}")]
    InputArity {
        kind: OpKind,
        expected: usize,
        got: usize,
    },

    /// A handler received the wrong number of side inputs.
    #[error("{kind} expects {expected} side input(s), got {got}")]
    SideInputArity {
        kind: OpKind,
        expected: usize,
        got: usize,
    },

    /// An input value has the wrong variant.
    #[error("{kind} expects {expected}, got {got}")]
    TypeMismatch {
        kind: OpKind,
        expected: &'static str,
        got: &'static str,
    },

    /// An object index outside the scene.
    #[error("object index {0} is out of range")]
    UnknownObject(usize),

    /// The object does not record the attribute.
    #[error("object {object} has no '{attribute}' attribute")]
    MissingAttribute { object: usize, attribute: Attribute },

    /// The attribute holds something that is not a literal.
    #[error("object {object} has a non-literal '{attribute}' attribute")]
    NonLiteralAttribute { object: usize, attribute: Attribute },

    /// The scene has no adjacency entry for the relation.
    #[error("scene has no '{0}' relation")]
    UnknownRelation(String),

    /// The node kind needs the other relationship shape.
    #[error("{kind} needs {expected} relationships, scene has {found}")]
    RelationshipShape {
        kind: OpKind,
        expected: &'static str,
        found: &'static str,
    },

    /// Question-asserted value missing from run state.
    #[error("run state has no value for '{0}'")]
    MissingRunValue(String),

    /// The kind has no scene handler.
    #[error("no handler registered for {0}")]
    NoHandler(OpKind),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
