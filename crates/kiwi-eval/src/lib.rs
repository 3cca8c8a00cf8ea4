//! kiwi program executor.
//!
//! Evaluates question programs against a scene graph and detects programs
//! whose answer does not depend on one of their relation steps.
//!
//! ```text
//! (Program, Scene, RunState) → Executor → Value
//!                                  ↑
//!                    DegeneracyAnalyzer (rewrite, prune, re-run)
//! ```

pub mod degeneracy;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod run_state;

pub use degeneracy::{eliminate_dead_nodes, replace_with_scene, Degeneracy, DegeneracyAnalyzer};
pub use error::{EvalError, EvalResult};
pub use executor::{Executor, ExecutorConfig, QUESTION_KEY};
pub use run_state::RunState;
