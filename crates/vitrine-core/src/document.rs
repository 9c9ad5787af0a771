//! Persisted scene documents
//!
//! A [`SceneDocument`] is what the editor saves and the viewer loads: global
//! settings (fog and auto-rotate) plus the ordered list of object records.
//! Helpers such as the grid, axes and lights are never part of it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::record::{RecordError, SceneObjectRecord};

/// Version string written into saved documents
pub const DOCUMENT_VERSION: &str = "v1.0.0";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid record at index {index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: RecordError,
    },
}

/// Exponential fog settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fog {
    pub fog_color: String,
    pub fog_density: f64,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            fog_color: "#ccc".to_string(),
            fog_density: 0.005,
        }
    }
}

/// Global scene settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseSettings {
    #[serde(default = "default_auto_rotate")]
    pub auto_rotate: bool,
    #[serde(default)]
    pub fog: Fog,
}

fn default_auto_rotate() -> bool {
    true
}

impl Default for BaseSettings {
    fn default() -> Self {
        Self {
            auto_rotate: default_auto_rotate(),
            fog: Fog::default(),
        }
    }
}

/// A saved scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Local time of the save, informational only
    #[serde(default)]
    pub time: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub base: BaseSettings,
    #[serde(default)]
    pub list: Vec<SceneObjectRecord>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new(BaseSettings::default(), Vec::new())
    }
}

impl SceneDocument {
    /// Create a document stamped with the current local time
    pub fn new(base: BaseSettings, list: Vec<SceneObjectRecord>) -> Self {
        Self {
            time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            version: default_version(),
            base,
            list,
        }
    }

    /// Parse and validate a document
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let doc: SceneDocument = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a document from a file
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save a document to a file
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let content = self.to_json_pretty()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DocumentError> {
        for (index, record) in self.list.iter().enumerate() {
            record
                .validate()
                .map_err(|source| DocumentError::InvalidRecord { index, source })?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
