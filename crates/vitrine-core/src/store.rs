//! Named document slots on disk
//!
//! The editor persists its scene under a single named slot (`saveData` by
//! default) and exports that slot's exact JSON as a `3d.json` download. The
//! store keeps each slot in its own file and tracks them in a manifest:
//!
//! ```text
//! <dir>/manifest.json
//! <dir>/slots/<slot>.json
//! ```
//!
//! Each manifest entry records the SHA256 of the slot content so a file that
//! was changed behind the store's back is detected on read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{DocumentError, SceneDocument};

/// Slot the editor saves to
pub const DEFAULT_SLOT: &str = "saveData";

/// File name offered for exports
pub const EXPORT_FILE_NAME: &str = "3d.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("Invalid slot name: {0}")]
    InvalidSlot(String),
    #[error("SHA mismatch for slot {slot}: expected {expected}, got {actual}")]
    ShaMismatch {
        slot: String,
        expected: String,
        actual: String,
    },
}

/// Manifest entry for one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// SHA256 of the stored JSON
    pub sha: String,
    /// File path relative to the store directory
    pub path: String,
    /// When the slot was last written (RFC 3339)
    pub saved_at: String,
    /// Number of records in the stored document
    pub objects: usize,
}

/// Index of all stored slots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotManifest {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotEntry>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl SlotManifest {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            slots: BTreeMap::new(),
        }
    }

    /// Load manifest or create new if file doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// File-backed slot store
#[derive(Debug, Clone)]
pub struct SlotStore {
    base_dir: PathBuf,
    manifest_path: PathBuf,
    manifest: SlotManifest,
}

impl SlotStore {
    /// Open (or create) a store rooted at `base_dir`
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(base_dir.join("slots"))?;

        let manifest_path = base_dir.join("manifest.json");
        let manifest = SlotManifest::load_or_create(&manifest_path)?;
        debug!(
            path = %base_dir.display(),
            slots = manifest.slots.len(),
            "Opened slot store"
        );

        Ok(Self {
            base_dir,
            manifest_path,
            manifest,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn check_slot(slot: &str) -> Result<(), StoreError> {
        let valid = !slot.is_empty()
            && slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidSlot(slot.to_string()))
        }
    }

    pub fn entry(&self, slot: &str) -> Option<&SlotEntry> {
        self.manifest.slots.get(slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &SlotEntry)> {
        self.manifest.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Write a document to `slot`, replacing what was there
    pub fn save(&mut self, slot: &str, doc: &SceneDocument) -> Result<SlotEntry, StoreError> {
        Self::check_slot(slot)?;

        let content = doc.to_json()?;
        let sha = sha256_hex(content.as_bytes());
        let relative_path = format!("slots/{}.json", slot);
        std::fs::write(self.base_dir.join(&relative_path), &content)?;

        let entry = SlotEntry {
            sha,
            path: relative_path,
            saved_at: chrono::Utc::now().to_rfc3339(),
            objects: doc.len(),
        };
        self.manifest.slots.insert(slot.to_string(), entry.clone());
        self.manifest.save(&self.manifest_path)?;

        info!(slot = %slot, objects = entry.objects, sha = %&entry.sha[..8], "Saved scene");
        Ok(entry)
    }

    /// The exact stored JSON of `slot`, if it has been saved
    pub fn read_raw(&self, slot: &str) -> Result<Option<String>, StoreError> {
        Self::check_slot(slot)?;
        let Some(entry) = self.manifest.slots.get(slot) else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(self.base_dir.join(&entry.path))?;
        let actual = sha256_hex(content.as_bytes());
        if actual != entry.sha {
            return Err(StoreError::ShaMismatch {
                slot: slot.to_string(),
                expected: entry.sha.clone(),
                actual,
            });
        }
        Ok(Some(content))
    }

    /// The document stored in `slot`, if it has been saved
    pub fn load(&self, slot: &str) -> Result<Option<SceneDocument>, StoreError> {
        match self.read_raw(slot)? {
            Some(content) => Ok(Some(SceneDocument::from_json(&content)?)),
            None => Ok(None),
        }
    }

    /// Remove a slot; returns whether it existed
    pub fn remove(&mut self, slot: &str) -> Result<bool, StoreError> {
        Self::check_slot(slot)?;
        let Some(entry) = self.manifest.slots.remove(slot) else {
            return Ok(false);
        };
        let path = self.base_dir.join(&entry.path);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        self.manifest.save(&self.manifest_path)?;
        Ok(true)
    }
}

/// Compute SHA256 hash of data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
