//! Degeneracy analysis.
//!
//! A program is degenerate when replacing one of its relation steps with a
//! `scene` step (the full object universe) leaves its answer unchanged: the
//! relation contributed nothing, so the question is uninformative.

use crate::error::EvalResult;
use crate::executor::Executor;
use crate::run_state::RunState;
use kiwi_types::{Node, Program, ProgramResult, Scene, Value};

/// Verdict of [`DegeneracyAnalyzer::analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// Replacing the relation step at `relation_node` did not change the
    /// answer.
    Degenerate { relation_node: usize },
    /// Every relation step affects the answer.
    Informative,
}

impl Degeneracy {
    pub fn is_degenerate(self) -> bool {
        matches!(self, Self::Degenerate { .. })
    }

    /// Index of the relation step shown to be redundant.
    pub fn witness(self) -> Option<usize> {
        match self {
            Self::Degenerate { relation_node } => Some(relation_node),
            Self::Informative => None,
        }
    }
}

/// Copy `program` with node `index` replaced by a `scene` node, then drop the
/// nodes the answer no longer depends on.
///
/// The copy is built from detached nodes and never shares cached outputs
/// with `program`.
pub fn replace_with_scene(program: &Program, index: usize) -> ProgramResult<Program> {
    let mut copy = program.structural_copy();
    if let Some(node) = copy.nodes.get_mut(index) {
        *node = Node::scene();
    }
    eliminate_dead_nodes(copy)
}

/// Keep only the nodes reachable from the last node through `inputs`, and
/// renumber the inputs of the survivors.
pub fn eliminate_dead_nodes(program: Program) -> ProgramResult<Program> {
    program.validate()?;

    let mut used = vec![false; program.len()];
    let mut pending = vec![program.len() - 1];
    while let Some(idx) = pending.pop() {
        if used[idx] {
            continue;
        }
        used[idx] = true;
        pending.extend(&program.nodes[idx].inputs);
    }

    let mut new_index = vec![None; program.len()];
    let mut kept = Vec::with_capacity(program.len());
    for (old, node) in program.nodes.into_iter().enumerate() {
        if used[old] {
            new_index[old] = Some(kept.len());
            kept.push(node);
        }
    }
    for node in &mut kept {
        // Every input of a kept node was marked used above, so it has a slot.
        node.inputs = node.inputs.iter().filter_map(|&old| new_index[old]).collect();
    }
    Ok(Program::new(kept))
}

/// Flags programs whose answer does not depend on a relation step.
#[derive(Debug, Clone, Default)]
pub struct DegeneracyAnalyzer {
    executor: Executor,
}

impl DegeneracyAnalyzer {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Evaluate `program` for its answer, then test each relation step.
    pub fn analyze(
        &self,
        program: &mut Program,
        scene: &Scene,
        state: &RunState,
    ) -> EvalResult<Degeneracy> {
        let answer = self.executor.evaluate(program, scene, state)?;
        self.analyze_with_answer(program, scene, state, &answer)
    }

    /// Test each relation step against a known `answer`.
    ///
    /// Stops at the first relation step whose removal keeps the answer.
    #[tracing::instrument(skip_all, fields(nodes = program.len()))]
    pub fn analyze_with_answer(
        &self,
        program: &Program,
        scene: &Scene,
        state: &RunState,
        answer: &Value,
    ) -> EvalResult<Degeneracy> {
        for relation_node in program.relation_steps() {
            let mut rewritten = replace_with_scene(program, relation_node)?;
            let rewritten_answer = self.executor.evaluate(&mut rewritten, scene, state)?;
            tracing::trace!(
                relation_node,
                kept = rewritten.len(),
                %rewritten_answer,
                "evaluated without relation step"
            );
            if &rewritten_answer == answer {
                tracing::debug!(relation_node, %answer, "answer does not depend on relation step");
                return Ok(Degeneracy::Degenerate { relation_node });
            }
        }
        Ok(Degeneracy::Informative)
    }
}
