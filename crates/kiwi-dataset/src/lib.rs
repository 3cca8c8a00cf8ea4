//! Dataset tooling around the kiwi executor.
//!
//! Loads rendered scene files (with a fallback to per-directory shards),
//! exports the rendered text of each scene as OCR tokens, filters question
//! templates down to the spatial ones, and answers batches of programs in
//! parallel with optional degeneracy checks.

pub mod batch;
pub mod error;
mod json_file;
pub mod ocr;
pub mod scene_file;
pub mod templates;

pub use batch::{answer_batch, BatchConfig, BatchItem, BatchOutcome, BatchSummary};
pub use error::{DatasetError, DatasetResult};
pub use ocr::{export_ocr, image_index_from_filename, ocr_tokens, write_ocr, OcrExport, OcrToken};
pub use scene_file::{
    load_scene_collection, load_scene_file, scenes_for_camera, SceneFile, SceneRecord, View,
    DEFAULT_CAMERA, SHARD_FILE_NAME,
};
pub use templates::{
    filter_template_dir, spatial_templates, QuestionTemplate, TemplateFileSummary,
    RELATION_PLACEHOLDER,
};
