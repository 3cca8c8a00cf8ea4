//! OCR token export: the rendered text of every scene, for training a
//! text-spotting stage.

use crate::error::{DatasetError, DatasetResult};
use crate::json_file::write_json;
use crate::scene_file::{SceneRecord, View};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One rendered text token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
    pub body: String,
    pub pixel_coords: Vec<f64>,
}

/// `{"tokens": [[token, ...], ...]}`, one inner list per scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrExport {
    pub tokens: Vec<Vec<OcrToken>>,
}

/// Image index encoded in a rendered image's file name.
///
/// The stem is split on `_`. A trailing camera segment (starting with `c`)
/// is skipped; the index is the six characters after the first of the
/// remaining last segment, e.g. `CLEVR_new_s000042_cc.png` gives 42.
pub fn image_index_from_filename(filename: &str) -> DatasetResult<u64> {
    let invalid = || DatasetError::ImageIndex(filename.to_string());
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(invalid)?;
    let segments: Vec<&str> = stem.split('_').collect();
    let segment = match segments.as_slice() {
        [.., index, camera] if camera.starts_with('c') => index,
        [.., index] => index,
        [] => return Err(invalid()),
    };
    let digits: String = segment.chars().skip(1).take(6).collect();
    digits.parse().map_err(|_| invalid())
}

/// Text tokens of a view, in object order. Objects without text are skipped.
pub fn ocr_tokens(view: &View) -> Vec<OcrToken> {
    view.objects
        .iter()
        .filter_map(|object| object.text())
        .map(|text| OcrToken {
            body: text.body.clone(),
            pixel_coords: text.pixel_coords.clone(),
        })
        .collect()
}

/// Collect the text tokens of every record's `camera` view.
pub fn export_ocr(records: &[SceneRecord], camera: &str) -> DatasetResult<OcrExport> {
    let total = records.len();
    let mut tokens = Vec::with_capacity(total);
    for (scene, record) in records.iter().enumerate() {
        let view = record.view(camera).ok_or_else(|| DatasetError::MissingView {
            scene,
            camera: camera.to_string(),
        })?;
        let image_index = view
            .image_filename
            .as_deref()
            .map(image_index_from_filename)
            .transpose()?;
        let scene_tokens = ocr_tokens(view);
        tracing::info!(
            image_index,
            scene = scene + 1,
            total,
            tokens = scene_tokens.len(),
            "exported scene"
        );
        tokens.push(scene_tokens);
    }
    Ok(OcrExport { tokens })
}

/// Write an export as JSON.
pub fn write_ocr(path: impl AsRef<Path>, export: &OcrExport) -> DatasetResult<()> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), scenes = export.tokens.len(), "writing OCR tokens");
    write_json(path, export)
}
