//! Shared types for the kiwi question executor.
//!
//! This crate defines the scene graph consumed by the evaluator, the program
//! representation (nodes and operation kinds), the value domain produced by
//! evaluation, and the structural errors shared by all downstream crates.

mod error;
mod op;
mod program;
mod scene;
mod value;

pub use error::{ParseOpKindError, ProgramError};
pub use op::{Attribute, EqualKind, OpKind};
pub use program::{Node, Program};
pub use scene::{
    AttrValue, Relationships, Scene, SceneFingerprint, SceneObject, TextAnnotation, Triple,
};
pub use value::Value;

/// Result type for structural program checks.
pub type ProgramResult<T> = std::result::Result<T, ProgramError>;
