//! Batch answering: evaluate many programs against loaded scenes in parallel.
//!
//! Each item owns its program, so node caches are never shared across
//! threads. Scenes are shared read-only; their derived caches are
//! initialized at most once.

use crate::error::{DatasetError, DatasetResult};
use kiwi_eval::{
    Degeneracy, DegeneracyAnalyzer, EvalError, Executor, ExecutorConfig, RunState,
};
use kiwi_types::{Program, Scene, Value};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One question: a program, the scene it is asked about (by position), and
/// its question-asserted values.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchItem {
    pub scene: usize,
    pub program: Program,
    #[serde(default)]
    pub run_state: RunState,
}

impl BatchItem {
    pub fn new(scene: usize, program: Program) -> Self {
        Self {
            scene,
            program,
            run_state: RunState::new(),
        }
    }

    pub fn with_run_state(mut self, run_state: RunState) -> Self {
        self.run_state = run_state;
        self
    }
}

/// Batch runner settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub executor: ExecutorConfig,
    /// Run degeneracy analysis on every answered item.
    pub check_degeneracy: bool,
    /// Drop degenerate items from the outcomes. Implies `check_degeneracy`.
    pub skip_degenerate: bool,
}

/// Result of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Position of the item in the batch.
    pub item: usize,
    pub scene: usize,
    /// The answer, or the contract violation that stopped evaluation.
    pub answer: Result<Value, EvalError>,
    pub degeneracy: Option<Degeneracy>,
}

impl BatchOutcome {
    pub fn is_answered(&self) -> bool {
        self.answer.is_ok()
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.answer {
            Ok(answer) => write!(f, "  ✓ #{} (scene {}): {answer}", self.item, self.scene)?,
            Err(err) => write!(f, "  ✗ #{} (scene {}): {err}", self.item, self.scene)?,
        }
        if let Some(Degeneracy::Degenerate { relation_node }) = self.degeneracy {
            write!(f, " [degenerate at node {relation_node}]")?;
        }
        Ok(())
    }
}

/// Outcomes of a batch, in item order, with tallies.
#[derive(Debug)]
pub struct BatchSummary {
    pub outcomes: Vec<BatchOutcome>,
    pub answered: usize,
    pub failed: usize,
    pub degenerate: usize,
    /// Degenerate items dropped from `outcomes`.
    pub skipped: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "{outcome}")?;
        }
        writeln!(
            f,
            "\n{} answered, {} failed, {} degenerate ({} skipped)",
            self.answered, self.failed, self.degenerate, self.skipped
        )
    }
}

/// Answer every item against `scenes`.
///
/// Fails up front if an item names a scene that is not loaded. Per-item
/// evaluation errors are reported in the item's outcome.
#[tracing::instrument(skip_all, fields(items = items.len(), scenes = scenes.len()))]
pub fn answer_batch(
    items: Vec<BatchItem>,
    scenes: &[Scene],
    config: &BatchConfig,
) -> DatasetResult<BatchSummary> {
    if let Some((item, bad)) = items
        .iter()
        .enumerate()
        .find(|(_, item)| item.scene >= scenes.len())
    {
        return Err(DatasetError::SceneOutOfRange {
            item,
            scene: bad.scene,
            available: scenes.len(),
        });
    }

    let analyzer = DegeneracyAnalyzer::new(Executor::with_config(config.executor.clone()));
    let check = config.check_degeneracy || config.skip_degenerate;

    let outcomes: Vec<BatchOutcome> = items
        .into_par_iter()
        .enumerate()
        .map(|(idx, item)| {
            let scene = &scenes[item.scene];
            answer_item(&analyzer, idx, item, scene, check)
        })
        .collect();

    let answered = outcomes.iter().filter(|o| o.is_answered()).count();
    let failed = outcomes.len() - answered;
    let degenerate = outcomes
        .iter()
        .filter(|o| o.degeneracy.is_some_and(Degeneracy::is_degenerate))
        .count();

    let (outcomes, skipped) = if config.skip_degenerate {
        let total = outcomes.len();
        let kept: Vec<BatchOutcome> = outcomes
            .into_iter()
            .filter(|o| !o.degeneracy.is_some_and(Degeneracy::is_degenerate))
            .collect();
        let skipped = total - kept.len();
        (kept, skipped)
    } else {
        (outcomes, 0)
    };

    tracing::info!(answered, failed, degenerate, skipped, "batch finished");
    Ok(BatchSummary {
        outcomes,
        answered,
        failed,
        degenerate,
        skipped,
    })
}

fn answer_item(
    analyzer: &DegeneracyAnalyzer,
    idx: usize,
    item: BatchItem,
    scene: &Scene,
    check: bool,
) -> BatchOutcome {
    let BatchItem {
        scene: scene_idx,
        mut program,
        run_state,
    } = item;
    let result = analyzer
        .executor()
        .evaluate(&mut program, scene, &run_state)
        .and_then(|answer| {
            let degeneracy = check
                .then(|| analyzer.analyze_with_answer(&program, scene, &run_state, &answer))
                .transpose()?;
            Ok((answer, degeneracy))
        });

    match result {
        Ok((answer, degeneracy)) => BatchOutcome {
            item: idx,
            scene: scene_idx,
            answer: Ok(answer),
            degeneracy,
        },
        Err(err) => {
            tracing::warn!(item = idx, %err, "item failed");
            BatchOutcome {
                item: idx,
                scene: scene_idx,
                answer: Err(err),
                degeneracy: None,
            }
        }
    }
}
