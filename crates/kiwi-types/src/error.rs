//! Errors for malformed programs and unknown operation names.

use thiserror::Error;

/// A structural defect in a program.
///
/// Programs are built upstream and are expected to be well formed; these
/// errors describe the ways they can fail to be.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// A program must have at least one node to produce an answer.
    #[error("program has no nodes")]
    Empty,

    /// Node inputs may only reference strictly earlier nodes.
    #[error("node {node} references input {input}, which is not an earlier node")]
    ForwardReference { node: usize, input: usize },
}

/// An operation name outside the closed set of supported kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation kind '{0}'")]
pub struct ParseOpKindError(pub String);
