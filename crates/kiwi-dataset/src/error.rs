//! Dataset I/O errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading, writing or assembling dataset files.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A scene record has no view for the requested camera.
    #[error("scene {scene} has no '{camera}' view")]
    MissingView { scene: usize, camera: String },

    #[error("cannot read an image index from '{0}'")]
    ImageIndex(String),

    /// A batch item names a scene that was not loaded.
    #[error("item {item} names scene {scene}, but only {available} scene(s) are loaded")]
    SceneOutOfRange {
        item: usize,
        scene: usize,
        available: usize,
    },
}

impl DatasetError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
