//! Rendered scene files.
//!
//! A scene file holds `{"scenes": [...]}`. Each record maps a camera name to
//! the view rendered from that camera; the default camera is
//! [`DEFAULT_CAMERA`]. Large renders are sharded into one `scenes.json` per
//! subdirectory, which [`load_scene_collection`] falls back to.

use crate::error::{DatasetError, DatasetResult};
use crate::json_file::read_json;
use kiwi_types::{Relationships, Scene, SceneObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Camera whose view the dataset tools read unless told otherwise.
pub const DEFAULT_CAMERA: &str = "cc";

/// File name of one shard in a sharded render.
pub const SHARD_FILE_NAME: &str = "scenes.json";

/// One scene as seen from one camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub relationships: Relationships,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cam_params: Option<serde_json::Value>,
}

impl View {
    /// The scene graph of this view.
    pub fn to_scene(&self) -> Scene {
        Scene::new(self.objects.clone(), self.relationships.clone())
    }

    pub fn into_scene(self) -> Scene {
        Scene::new(self.objects, self.relationships)
    }
}

/// Every camera's view of one scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneRecord {
    pub views: BTreeMap<String, View>,
}

impl SceneRecord {
    pub fn view(&self, camera: &str) -> Option<&View> {
        self.views.get(camera)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub scenes: Vec<SceneRecord>,
}

/// Read the scene records of one file.
pub fn load_scene_file(path: impl AsRef<Path>) -> DatasetResult<Vec<SceneRecord>> {
    let file: SceneFile = read_json(path.as_ref())?;
    Ok(file.scenes)
}

/// Read a scene file, or the shards next to it when the file itself cannot be
/// read.
///
/// Shards are the `scenes.json` files of the subdirectories of `path`'s
/// directory, concatenated in subdirectory name order. A subdirectory
/// without a shard is an error.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_scene_collection(path: impl AsRef<Path>) -> DatasetResult<Vec<SceneRecord>> {
    let path = path.as_ref();
    let err = match load_scene_file(path) {
        Ok(scenes) => return Ok(scenes),
        Err(err) => err,
    };
    tracing::warn!(%err, "scene file unreadable, loading shards");

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut shards: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| DatasetError::read(dir, e))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|entry| entry.is_dir())
        .collect();
    shards.sort();

    let mut scenes = Vec::new();
    for shard in shards {
        let shard = shard.join(SHARD_FILE_NAME);
        let records = load_scene_file(&shard)?;
        tracing::debug!(shard = %shard.display(), scenes = records.len(), "loaded shard");
        scenes.extend(records);
    }
    Ok(scenes)
}

/// The scene graph each record shows through `camera`.
pub fn scenes_for_camera(records: &[SceneRecord], camera: &str) -> DatasetResult<Vec<Scene>> {
    records
        .iter()
        .enumerate()
        .map(|(scene, record)| {
            record
                .view(camera)
                .map(View::to_scene)
                .ok_or_else(|| DatasetError::MissingView {
                    scene,
                    camera: camera.to_string(),
                })
        })
        .collect()
}
