//! Application state management

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use vitrine_core::{BaseSettings, SceneDocument, SlotStore};
use vitrine_scene::{
    load_document, Animator, BindingReport, CameraTween, LoadReport, ViewerSession,
};

use crate::assets::FsAssetLoader;
use crate::config::Config;

/// The daemon's viewer has no camera to animate
struct Headless;

impl Animator for Headless {
    fn tween_to(&mut self, tween: CameraTween) {
        debug!(to = ?tween.to, "Ignoring camera tween");
    }
}

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Saved scene documents
    pub store: Mutex<SlotStore>,
    /// Headless viewer mirroring the saved scene with live data applied
    pub viewer: Arc<Mutex<ViewerSession>>,
    /// Assets for the headless viewer
    pub loader: Arc<FsAssetLoader>,
    /// Live data broadcast for WebSocket clients
    pub snapshots: broadcast::Sender<Value>,
}

impl AppState {
    /// Create new application state and load the saved scene
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let store = SlotStore::open(&config.store.path)?;
        let loader = Arc::new(FsAssetLoader::new(&config.assets.path));
        let viewer = Arc::new(Mutex::new(ViewerSession::new(Box::new(Headless))));
        let (snapshots, _) = broadcast::channel(config.viewer.snapshot_channel.max(1));

        let state = Arc::new(Self {
            config,
            store: Mutex::new(store),
            viewer,
            loader,
            snapshots,
        });

        state.reload().await?;
        Ok(state)
    }

    /// Reload the headless viewer from the configured slot
    pub async fn reload(&self) -> Result<LoadReport> {
        let slot = &self.config.store.slot;
        let doc = self.store.lock().await.load(slot)?;
        let doc = doc.unwrap_or_else(|| SceneDocument::new(BaseSettings::default(), Vec::new()));
        let objects = doc.len();

        let report = load_document(self.viewer.clone(), self.loader.clone(), doc, || {
            debug!("Viewer scene ready");
        })
        .await;

        info!(
            slot = %slot,
            objects,
            added = report.added,
            failed = report.failed,
            "Viewer loaded"
        );
        Ok(report)
    }

    /// Apply live data to the headless viewer and forward it to WebSocket
    /// clients. Returns `None` if `data` is not a JSON object.
    pub async fn push_data(&self, data: Value) -> Option<BindingReport> {
        let report = self.viewer.lock().await.apply_json(&data)?;
        // No subscribers is fine
        let receivers = self.snapshots.send(data).unwrap_or(0);
        debug!(
            changed = report.changed,
            regenerated = report.regenerated.len(),
            replaced = report.replaced.len(),
            receivers,
            "Applied live data"
        );
        Some(report)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.snapshots.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{AssetsConfig, StoreConfig};
    use serde_json::json;
    use tempfile::TempDir;
    use vitrine_core::{create_record, BindProperty, ObjectType, Vec3};
    use vitrine_scene::SceneHost;

    pub(crate) fn test_config(dir: &TempDir) -> Config {
        Config {
            store: StoreConfig {
                path: dir.path().join("scenes").to_string_lossy().into_owned(),
                ..Default::default()
            },
            assets: AssetsConfig {
                path: dir.path().join("3d_assets").to_string_lossy().into_owned(),
                web: dir.path().join("web").to_string_lossy().into_owned(),
            },
            ..Default::default()
        }
    }

    pub(crate) fn bound_doc() -> SceneDocument {
        let mut tank = create_record(ObjectType::Box, "2,4,2", Vec3::ZERO).unwrap();
        tank.bind.insert(BindProperty::PositionY, "{$level}".to_string());
        tank.bind.insert(BindProperty::Name, "tank {$id}".to_string());
        SceneDocument::new(BaseSettings::default(), vec![tank])
    }

    #[tokio::test]
    async fn test_starts_with_empty_scene() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();
        let viewer = state.viewer.lock().await;
        assert!(viewer.is_ready());
        assert!(viewer.scene().is_empty());
    }

    #[tokio::test]
    async fn test_reload_and_push_data() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();
        state
            .store
            .lock()
            .await
            .save("saveData", &bound_doc())
            .unwrap();

        let report = state.reload().await.unwrap();
        assert_eq!(report.added, 1);
        assert!(report.ready);

        let mut rx = state.subscribe();
        let data = json!({"level": "3.5", "id": 7});
        let report = state.push_data(data.clone()).await.unwrap();
        assert_eq!(report.changed, 2);
        assert_eq!(rx.recv().await.unwrap(), data);

        let viewer = state.viewer.lock().await;
        let tank = &viewer.scene().objects()[0];
        assert_eq!(tank.transform.position.y, 3.5);
        assert_eq!(tank.name, "tank 7");
    }

    #[tokio::test]
    async fn test_push_rejects_non_objects() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();
        assert!(state.push_data(json!("level")).await.is_none());
    }
}
