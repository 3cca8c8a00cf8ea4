//! Question template filtering.
//!
//! Templates are stored as JSON arrays, one file per template family. Only
//! the `text` statements are interpreted here; everything else a template
//! carries (`nodes`, `params`, `constraints`, ...) is passed through as is.

use crate::error::{DatasetError, DatasetResult};
use crate::json_file::{read_json, write_json};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder a template statement uses for a spatial relation.
pub const RELATION_PLACEHOLDER: &str = "<R>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    /// Alternative phrasings of the question.
    pub text: Vec<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl QuestionTemplate {
    /// Whether any phrasing mentions a spatial relation.
    pub fn is_spatial(&self) -> bool {
        self.text
            .iter()
            .any(|statement| statement.contains(RELATION_PLACEHOLDER))
    }
}

/// The spatial templates, in input order.
pub fn spatial_templates(templates: Vec<QuestionTemplate>) -> Vec<QuestionTemplate> {
    templates.into_iter().filter(QuestionTemplate::is_spatial).collect()
}

/// Outcome of filtering one template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFileSummary {
    pub file: PathBuf,
    pub total: usize,
    pub spatial: usize,
}

/// Filter every `.json` file of `input_dir` down to its spatial templates,
/// writing each result under the same file name in `output_dir`.
///
/// Files are processed in name order.
#[tracing::instrument(skip_all, fields(input = %input_dir.as_ref().display()))]
pub fn filter_template_dir(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> DatasetResult<Vec<TemplateFileSummary>> {
    let (input_dir, output_dir) = (input_dir.as_ref(), output_dir.as_ref());
    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)
        .map_err(|e| DatasetError::read(input_dir, e))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    fs::create_dir_all(output_dir).map_err(|e| DatasetError::write(output_dir, e))?;

    let mut summaries = Vec::with_capacity(files.len());
    for file in files {
        let templates: Vec<QuestionTemplate> = read_json(&file)?;
        let total = templates.len();
        let kept = spatial_templates(templates);
        let Some(name) = file.file_name() else {
            continue;
        };
        write_json(&output_dir.join(name), &kept)?;
        tracing::info!(file = %file.display(), total, spatial = kept.len(), "filtered templates");
        summaries.push(TemplateFileSummary {
            file,
            total,
            spatial: kept.len(),
        });
    }
    Ok(summaries)
}
