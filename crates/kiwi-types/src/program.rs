//! Programs: ordered DAGs of operation nodes.
//!
//! Node inputs reference strictly earlier nodes, so list order is always a
//! valid evaluation order. Each node carries a cache slot for its output.
//! The slot is only meaningful for the scene it was filled against, which is
//! why [`Program`] remembers that scene's fingerprint and nodes are never
//! cloned: [`Node::detached`] is the only way to copy one, and it leaves the
//! cache behind.

use crate::error::ProgramError;
use crate::op::OpKind;
use crate::scene::SceneFingerprint;
use crate::value::Value;
use crate::ProgramResult;
use serde::{Deserialize, Serialize};

/// One operation step.
#[derive(Debug, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: OpKind,
    /// Indices of earlier nodes whose outputs feed this one.
    #[serde(default)]
    pub inputs: Vec<usize>,
    /// Literal arguments (a color name, a relation name, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_inputs: Vec<String>,
    #[serde(skip)]
    output: Option<Value>,
}

impl Node {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            side_inputs: Vec::new(),
            output: None,
        }
    }

    /// A `scene` node with no inputs.
    pub fn scene() -> Self {
        Self::new(OpKind::Scene)
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = usize>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }

    pub fn with_side_input(mut self, side_input: impl Into<String>) -> Self {
        self.side_inputs.push(side_input.into());
        self
    }

    /// A fresh node with the same kind, inputs and side inputs, and an empty
    /// cache.
    pub fn detached(&self) -> Self {
        Self {
            kind: self.kind,
            inputs: self.inputs.clone(),
            side_inputs: self.side_inputs.clone(),
            output: None,
        }
    }

    pub fn cached_output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn cache_output(&mut self, value: Value) {
        self.output = Some(value);
    }

    pub fn clear_cached_output(&mut self) {
        self.output = None;
    }
}

/// Structural equality: kind, inputs and side inputs. Cached outputs are
/// ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.inputs == other.inputs
            && self.side_inputs == other.side_inputs
    }
}

impl Eq for Node {}

/// A question expressed as an ordered list of nodes. The last node's output
/// is the answer.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Program {
    pub nodes: Vec<Node>,
    /// Scene the node caches were filled against.
    #[serde(skip)]
    bound_scene: Option<SceneFingerprint>,
}

impl Program {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            bound_scene: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A copy built from [`Node::detached`] nodes: same structure, cold caches.
    pub fn structural_copy(&self) -> Self {
        Self::new(self.nodes.iter().map(Node::detached).collect())
    }

    /// Drop every node's cached output.
    pub fn clear_cache(&mut self) {
        for node in &mut self.nodes {
            node.clear_cached_output();
        }
        self.bound_scene = None;
    }

    /// Tie the node caches to `scene`.
    ///
    /// Caches filled against a different scene are cleared first. Returns
    /// `true` when that happened.
    pub fn bind_scene(&mut self, scene: SceneFingerprint) -> bool {
        match self.bound_scene {
            Some(bound) if bound == scene => false,
            Some(_) => {
                self.clear_cache();
                self.bound_scene = Some(scene);
                true
            }
            None => {
                self.bound_scene = Some(scene);
                false
            }
        }
    }

    pub fn bound_scene(&self) -> Option<SceneFingerprint> {
        self.bound_scene
    }

    /// Indices of the relation steps (`relate`, `relate_triple`).
    pub fn relation_steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind.is_relation())
            .map(|(idx, _)| idx)
    }

    /// Check that the program is non-empty and every input references a
    /// strictly earlier node.
    pub fn validate(&self) -> ProgramResult<()> {
        if self.nodes.is_empty() {
            return Err(ProgramError::Empty);
        }
        for (node, n) in self.nodes.iter().enumerate() {
            if let Some(&input) = n.inputs.iter().find(|&&input| input >= node) {
                return Err(ProgramError::ForwardReference { node, input });
            }
        }
        Ok(())
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Eq for Program {}

impl FromIterator<Node> for Program {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
