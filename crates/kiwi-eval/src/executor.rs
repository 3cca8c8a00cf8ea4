//! Program executor.

use crate::error::{EvalError, EvalResult};
use crate::handlers::{self, HandlerArgs};
use crate::run_state::RunState;
use kiwi_types::{Node, OpKind, Program, ProgramError, Scene, Value};
use serde::{Deserialize, Serialize};

/// Run-state key for the value a `query_text_q` node reads when it has no
/// side input.
pub const QUESTION_KEY: &str = "<T>";

/// Executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Memoize node outputs on the nodes themselves.
    pub cache_outputs: bool,
    /// Default run-state key for `query_text_q`.
    pub question_key: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            cache_outputs: true,
            question_key: QUESTION_KEY.to_string(),
        }
    }
}

/// Evaluates programs node by node.
///
/// Nodes run in list order, which is a topological order because inputs
/// only reference earlier nodes. Outputs are memoized on each node while
/// caching is enabled; the program is bound to the scene's fingerprint so a
/// cache filled against one scene is cleared before the program runs against
/// another. `query_text_q` nodes and everything downstream of them depend on
/// the run state and are recomputed on every call. The first `Invalid`
/// output ends evaluation.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Evaluate `program` and return the answer: the last output produced.
    #[tracing::instrument(skip_all, fields(nodes = program.len()))]
    pub fn evaluate(
        &self,
        program: &mut Program,
        scene: &Scene,
        state: &RunState,
    ) -> EvalResult<Value> {
        let mut outputs = self.run(program, scene, state)?;
        outputs.pop().ok_or(EvalError::Program(ProgramError::Empty))
    }

    /// Evaluate `program` and return every output produced, in node order.
    ///
    /// When a node yields `Invalid` the trace ends with it.
    #[tracing::instrument(skip_all, fields(nodes = program.len()))]
    pub fn trace(
        &self,
        program: &mut Program,
        scene: &Scene,
        state: &RunState,
    ) -> EvalResult<Vec<Value>> {
        self.run(program, scene, state)
    }

    fn run(&self, program: &mut Program, scene: &Scene, state: &RunState) -> EvalResult<Vec<Value>> {
        if program.is_empty() {
            return Err(ProgramError::Empty.into());
        }
        let caching = self.config.cache_outputs;
        if caching && program.bind_scene(scene.fingerprint()) {
            tracing::debug!("scene changed, cleared cached node outputs");
        }

        let mut outputs: Vec<Value> = Vec::with_capacity(program.len());
        // Nodes that read run state, directly or through an input. Their
        // outputs vary per call, so they bypass the node cache.
        let mut reads_state: Vec<bool> = Vec::with_capacity(program.len());
        for (index, node) in program.nodes.iter_mut().enumerate() {
            let volatile = node.kind == OpKind::QueryTextQuestion
                || node
                    .inputs
                    .iter()
                    .any(|&input| reads_state.get(input).copied().unwrap_or(false));
            let use_cache = caching && !volatile;
            let output = match node.cached_output() {
                Some(cached) if use_cache => cached.clone(),
                _ => {
                    let output = self.eval_node(index, node, &outputs, scene, state)?;
                    if use_cache {
                        node.cache_output(output.clone());
                    } else if volatile {
                        node.clear_cached_output();
                    }
                    output
                }
            };
            reads_state.push(volatile);
            let invalid = output.is_invalid();
            outputs.push(output);
            if invalid {
                tracing::debug!(node = index, kind = %node.kind, "invalid output, stopping");
                break;
            }
        }
        Ok(outputs)
    }

    fn eval_node(
        &self,
        index: usize,
        node: &Node,
        outputs: &[Value],
        scene: &Scene,
        state: &RunState,
    ) -> EvalResult<Value> {
        if node.kind == OpKind::QueryTextQuestion {
            if !node.inputs.is_empty() {
                return Err(EvalError::InputArity {
                    kind: node.kind,
                    expected: 0,
                    got: node.inputs.len(),
                });
            }
            if node.side_inputs.len() > 1 {
                return Err(EvalError::SideInputArity {
                    kind: node.kind,
                    expected: 1,
                    got: node.side_inputs.len(),
                });
            }
            let key = node
                .side_inputs
                .first()
                .map(String::as_str)
                .unwrap_or(self.config.question_key.as_str());
            return state
                .get(key)
                .cloned()
                .ok_or_else(|| EvalError::MissingRunValue(key.to_string()));
        }

        let operands = node
            .inputs
            .iter()
            .map(|&input| match outputs.get(input) {
                Some(value) if input < index => Ok(value.clone()),
                _ => Err(EvalError::from(ProgramError::ForwardReference {
                    node: index,
                    input,
                })),
            })
            .collect::<EvalResult<Vec<_>>>()?;

        let args = HandlerArgs::new(node.kind, scene, &operands, &node.side_inputs);
        let output = handlers::dispatch(&args)?;
        tracing::trace!(node = index, kind = %node.kind, %output, "evaluated");
        Ok(output)
    }
}
