//! Read-only viewer session

use serde_json::Value;
use tracing::debug;
use vitrine_core::{Snapshot, Vec3};

use crate::binding::{apply_snapshot, BindingReport};
use crate::collab::{Animator, Picker, Renderer, SelectionTarget};
use crate::loader::SceneHost;
use crate::object::ObjectId;
use crate::scene::{Helper, Scene};
use crate::selection::{SelectOutcome, SelectionController};

pub struct ViewerSession {
    scene: Scene,
    selection: SelectionController,
}

impl ViewerSession {
    pub fn new(animator: Box<dyn Animator>) -> Self {
        Self {
            scene: Scene::new(Helper::default_lights()),
            selection: SelectionController::viewer(animator),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.scene.is_ready()
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selection.selected().map(|t| t.object())
    }

    pub fn select(&mut self, id: ObjectId) -> SelectOutcome {
        self.selection
            .select(&mut self.scene, SelectionTarget::Object(id))
    }

    /// Hide the outline and give the camera back to auto-rotate
    pub fn cancel_select(&mut self) -> bool {
        self.selection.deselect(&mut self.scene)
    }

    /// Outline whatever is under the cursor, or cancel the selection
    pub fn click(&mut self, picker: &dyn Picker, x: f64, y: f64) -> Option<ObjectId> {
        let candidates = self.scene.ids();
        match picker.pick(x, y, &candidates) {
            Some(hit) => {
                self.select(hit.object);
            }
            None => {
                self.cancel_select();
            }
        }
        self.selected()
    }

    /// Cancel the selection and move the camera to `position`
    pub fn move_to(&mut self, position: Vec3) {
        self.selection.look_at(&mut self.scene, position);
    }

    /// Apply live data to bound properties
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> BindingReport {
        let report = apply_snapshot(&mut self.scene, snapshot);
        for (old, _) in &report.replaced {
            self.selection.forget(&mut self.scene, *old);
        }
        report
    }

    /// Apply a JSON object of live data. Anything but an object is ignored.
    pub fn apply_json(&mut self, data: &Value) -> Option<BindingReport> {
        let Some(snapshot) = Snapshot::from_json(data) else {
            debug!("Ignoring non-object data");
            return None;
        };
        Some(self.apply_snapshot(&snapshot))
    }

    /// Every data key the scene's bindings refer to
    pub fn keys(&self) -> Vec<String> {
        self.scene.bind_key_all()
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        renderer.render_frame(&self.scene, &self.scene.camera);
    }
}

impl SceneHost for ViewerSession {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn before_load(&mut self) {
        self.selection.deselect(&mut self.scene);
    }

    /// Objects driven by a `visible` binding stay hidden until data arrives
    fn object_loaded(&mut self, id: ObjectId) {
        if let Some(object) = self.scene.get_mut(id) {
            if object.has_visible_binding() {
                object.visible = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{Asset, AssetError, AssetHandle, AssetKind, AssetLoader};
    use crate::loader::load_document;
    use crate::test_support::{CountingRenderer, FixedPicker, RecordingAnimator};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use vitrine_core::{create_record, BaseSettings, BindProperty, ObjectType, SceneDocument};

    struct StaticLoader;

    impl AssetLoader for StaticLoader {
        async fn load(&self, kind: AssetKind, url: &str) -> Result<Asset, AssetError> {
            Ok(Asset {
                kind,
                url: url.to_string(),
                handle: AssetHandle(format!("static:{}", url)),
            })
        }
    }

    fn doc() -> SceneDocument {
        let mut tank = create_record(ObjectType::Cylinder, "2,2,6,32", Vec3::ZERO).unwrap();
        tank.bind.insert(BindProperty::ScaleY, "{$level}".to_string());
        tank.bind.insert(BindProperty::Visible, "{$online}".to_string());

        let mut label = create_record(ObjectType::Marker, "36,#fff|--", Vec3::new(0.0, 8.0, 0.0)).unwrap();
        label.bind.insert(BindProperty::Value, "{$level} m".to_string());

        let mut title = create_record(ObjectType::Text, "3,1,#ff0000|Tank", Vec3::ZERO).unwrap();
        title.bind.insert(BindProperty::Value, "Tank {$name}".to_string());

        SceneDocument::new(BaseSettings::default(), vec![tank, label, title])
    }

    async fn loaded_viewer() -> Arc<Mutex<ViewerSession>> {
        let viewer = Arc::new(Mutex::new(ViewerSession::new(Box::new(
            RecordingAnimator::default(),
        ))));
        let report = load_document(viewer.clone(), Arc::new(StaticLoader), doc(), || {}).await;
        assert!(report.ready);
        viewer
    }

    #[tokio::test]
    async fn test_visible_binding_hides_until_data() {
        let viewer = loaded_viewer().await;
        let mut viewer = viewer.lock().await;
        let tank = viewer.scene().objects()[0].id;
        assert!(!viewer.scene().get(tank).unwrap().visible);

        viewer.apply_json(&json!({"online": 1, "level": 0.5, "name": "A"}));
        let tank = viewer.scene().get(tank).unwrap();
        assert!(tank.visible);
        assert_eq!(tank.transform.scale.y, 0.5);
    }

    #[tokio::test]
    async fn test_repeated_snapshot_is_noop() {
        let viewer = loaded_viewer().await;
        let mut viewer = viewer.lock().await;
        let data = json!({"online": "1", "level": "3", "name": "North"});

        let first = viewer.apply_json(&data).unwrap();
        assert_eq!(first.replaced.len(), 1);
        assert_eq!(first.regenerated.len(), 1);
        let ids = viewer.scene().ids();

        let second = viewer.apply_json(&data).unwrap();
        assert!(second.is_noop());
        assert_eq!(viewer.scene().ids(), ids);

        assert_eq!(viewer.keys(), vec!["online", "level", "name", "level"]);
        assert!(viewer.apply_json(&json!([1, 2])).is_none());
    }

    #[tokio::test]
    async fn test_selected_marker_forgotten_on_rebuild() {
        let viewer = loaded_viewer().await;
        let mut viewer = viewer.lock().await;
        let marker = viewer.scene().objects()[1].id;

        assert_eq!(viewer.select(marker), SelectOutcome::Selected);
        viewer.apply_json(&json!({"level": "7"}));
        assert_eq!(viewer.selected(), None);
        assert!(!viewer.scene().outline.visible);
    }

    #[tokio::test]
    async fn test_click_and_move_to() {
        let viewer = loaded_viewer().await;
        let mut viewer = viewer.lock().await;
        let tank = viewer.scene().objects()[0].id;

        assert_eq!(viewer.click(&FixedPicker::object(tank), 0.0, 0.0), Some(tank));
        assert!(!viewer.scene().camera.auto_rotate);

        viewer.move_to(Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(viewer.selected(), None);
        assert!(viewer.scene().camera.auto_rotate);

        let mut renderer = CountingRenderer::default();
        viewer.render(&mut renderer);
        assert_eq!(renderer.objects_seen, 3);
    }
}
