//! Editor session
//!
//! Ties a [`Scene`] to an emissive-highlight [`SelectionController`] with a
//! property panel and gizmo, and adds the editor's commands: creating,
//! copying and deleting objects, tube point promotion, and saving to or
//! exporting from a [`SlotStore`].

use thiserror::Error;
use tracing::{debug, info};
use vitrine_core::store::SlotEntry;
use vitrine_core::{
    create_record, CreateError, ObjectType, PointIndex, SceneDocument, SlotStore, StoreError,
    Transform, TubeError,
};

use crate::collab::{
    Animator, Asset, AssetError, PanelChange, Picker, PropertyPanel, Renderer, SelectionTarget,
    TransformGizmo,
};
use crate::loader::SceneHost;
use crate::materialize::{serialize, MaterializeError};
use crate::object::{Geometry, ObjectId, SceneObject};
use crate::scene::{CompletionOutcome, Helper, PendingAsset, Scene};
use crate::selection::{SelectOutcome, SelectionController};

/// Offset of a copy from its original, along x
pub const COPY_OFFSET_X: f64 = 2.0;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid input: {0}")]
    Create(#[from] CreateError),
    #[error("Failed to build object: {0}")]
    Materialize(#[from] MaterializeError),
    #[error("Tube error: {0}")]
    Tube(#[from] TubeError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Nothing is selected")]
    NothingSelected,
    #[error("Tube control points cannot be copied or deleted")]
    ControlPoint,
    #[error("No such object: {0}")]
    NoSuchObject(ObjectId),
    #[error("Object {0} is not a tube")]
    NotATube(ObjectId),
    #[error("Slot {0} has not been saved yet")]
    NotSaved(String),
}

/// Result of adding an object
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// Created and selected
    Added(ObjectId),
    /// Waiting for an asset; finish with [`EditorSession::complete_add`]
    Pending(PendingAsset),
}

/// Keyboard commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Save,
    Load,
    Export,
    Clear,
}

impl Command {
    /// Ctrl+S, Ctrl+L, Ctrl+E and Ctrl+R
    pub fn from_shortcut(ctrl: bool, key: char) -> Option<Self> {
        if !ctrl {
            return None;
        }
        match key {
            's' => Some(Command::Save),
            'l' => Some(Command::Load),
            'e' => Some(Command::Export),
            'r' => Some(Command::Clear),
            _ => None,
        }
    }
}

pub struct EditorSession {
    scene: Scene,
    selection: SelectionController,
}

impl EditorSession {
    pub fn new(
        animator: Box<dyn Animator>,
        panel: Box<dyn PropertyPanel>,
        gizmo: Box<dyn TransformGizmo>,
    ) -> Self {
        let mut helpers = Helper::editor_aids();
        helpers.extend(Helper::default_lights());
        Self {
            scene: Scene::new(helpers),
            selection: SelectionController::editor(animator, panel, gizmo),
        }
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn selected(&self) -> Option<SelectionTarget> {
        self.selection.selected()
    }

    pub fn select(&mut self, target: SelectionTarget) -> SelectOutcome {
        self.selection.select(&mut self.scene, target)
    }

    pub fn deselect(&mut self) -> bool {
        self.selection.deselect(&mut self.scene)
    }

    /// Select whatever is under the cursor, or clear the selection
    pub fn click(&mut self, picker: &dyn Picker, x: f64, y: f64) -> Option<SelectionTarget> {
        let candidates = self.scene.ids();
        match picker.pick(x, y, &candidates) {
            Some(hit) => {
                let target = match hit.tube_point {
                    Some(index) => SelectionTarget::TubePoint {
                        tube: hit.object,
                        index,
                    },
                    None => SelectionTarget::Object(hit.object),
                };
                self.select(target);
            }
            None => {
                self.deselect();
            }
        }
        self.selected()
    }

    pub fn panel_changed(&mut self, change: PanelChange) -> bool {
        self.selection.handle_panel_change(&mut self.scene, change)
    }

    pub fn gizmo_changed(&mut self, transform: Transform) -> bool {
        self.selection.gizmo_changed(&mut self.scene, transform)
    }

    pub fn gizmo_released(&mut self) {
        self.selection.gizmo_released(&mut self.scene);
    }

    /// Create an object from panel input at the camera target and select it.
    /// Text, Svg and Model come back pending on their asset.
    pub fn add(&mut self, ty: ObjectType, input: &str) -> Result<AddOutcome, EditorError> {
        let record = create_record(ty, input, self.scene.camera.target).map_err(|e| {
            debug!(object_type = %ty, input = %input, error = %e, "Rejected new object input");
            e
        })?;

        if let Some(pending) = self.scene.pending_for(record.clone()) {
            return Ok(AddOutcome::Pending(pending));
        }

        let id = self.scene.add_record(record, None)?;
        self.select(SelectionTarget::Object(id));
        info!(id = %id, object_type = %ty, "Added object");
        Ok(AddOutcome::Added(id))
    }

    /// Finish an add that was waiting for its asset
    pub fn complete_add(
        &mut self,
        pending: PendingAsset,
        result: Result<Asset, AssetError>,
    ) -> Option<ObjectId> {
        let ty = pending.record.object_type();
        match self.scene.complete_asset(pending, result).outcome {
            CompletionOutcome::Added(id) => {
                self.select(SelectionTarget::Object(id));
                info!(id = %id, object_type = %ty, "Added object");
                Some(id)
            }
            CompletionOutcome::Stale | CompletionOutcome::Failed => None,
        }
    }

    fn selected_object(&self) -> Result<&SceneObject, EditorError> {
        match self.selected() {
            None => Err(EditorError::NothingSelected),
            Some(SelectionTarget::TubePoint { .. }) => Err(EditorError::ControlPoint),
            Some(SelectionTarget::Object(id)) => {
                self.scene.get(id).ok_or(EditorError::NoSuchObject(id))
            }
        }
    }

    /// Duplicate the selection next to itself and select the copy
    pub fn copy(&mut self) -> Result<ObjectId, EditorError> {
        let original = self.selected_object()?;
        let mut record = serialize(original);
        record.transform.position.x += COPY_OFFSET_X;
        let asset = match &original.geometry {
            Geometry::Text { font } => Some(font.clone()),
            Geometry::Group { asset } => Some(asset.clone()),
            _ => None,
        };
        let (source, name) = (original.id, original.name.clone());

        let id = self.scene.add_record(record, asset)?;
        if let Some(copy) = self.scene.get_mut(id) {
            copy.name = name;
        }
        self.select(SelectionTarget::Object(id));
        info!(source = %source, copy = %id, "Copied object");
        Ok(id)
    }

    /// Remove the selection once `confirm` agrees. Returns whether it was
    /// removed.
    pub fn delete(&mut self, confirm: impl FnOnce(&SceneObject) -> bool) -> Result<bool, EditorError> {
        let object = self.selected_object()?;
        if !confirm(object) {
            return Ok(false);
        }
        let id = object.id;
        self.scene.remove(id);
        self.selection.forget(&mut self.scene, id);
        info!(id = %id, "Deleted object");
        Ok(true)
    }

    /// Promote a dotted tube control point. A selected point on the same
    /// tube keeps pointing at the same control point under its new index.
    pub fn promote_tube_point(
        &mut self,
        tube: ObjectId,
        index: PointIndex,
    ) -> Result<PointIndex, EditorError> {
        let object = self
            .scene
            .get_mut(tube)
            .ok_or(EditorError::NoSuchObject(tube))?;
        let editor = object.tube.as_mut().ok_or(EditorError::NotATube(tube))?;
        let promoted = editor.promote(index)?;
        object.refresh_tube();

        if let Some(SelectionTarget::TubePoint {
            tube: selected_tube,
            index: selected,
        }) = self.selected()
        {
            if selected_tube == tube {
                let target = SelectionTarget::TubePoint {
                    tube,
                    index: selected.after_promotion(index),
                };
                self.selection.retarget(&mut self.scene, target);
            }
        }
        Ok(promoted)
    }

    /// Remove every object
    pub fn clear(&mut self) {
        self.deselect();
        self.scene.clear();
        info!("Cleared scene");
    }

    /// The current scene as a document
    pub fn save(&self) -> SceneDocument {
        self.scene.save()
    }

    /// Save the scene into `slot`
    pub fn save_to(&self, store: &mut SlotStore, slot: &str) -> Result<SlotEntry, EditorError> {
        Ok(store.save(slot, &self.save())?)
    }

    /// The exact JSON last saved to `slot`, for download
    pub fn export(&self, store: &SlotStore, slot: &str) -> Result<String, EditorError> {
        store
            .read_raw(slot)?
            .ok_or_else(|| EditorError::NotSaved(slot.to_string()))
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        renderer.render_frame(&self.scene, &self.scene.camera);
    }
}

impl SceneHost for EditorSession {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn before_load(&mut self) {
        self.selection.deselect(&mut self.scene);
    }
}
