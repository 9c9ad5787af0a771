//! Selection, highlight and the panel/gizmo round trip
//!
//! The controller owns what is selected and keeps the property panel, the
//! gizmo, the highlight and the camera in step with it. Pushing values into
//! the panel makes its widgets fire change events; those echoes arrive while
//! the `programmatic_update` guard is set and are dropped, so only real user
//! edits reach the object.

use tracing::{debug, warn};
use vitrine_core::{deg_to_rad, BindProperty, PointIndex, Transform, Vec3};

use crate::camera::CameraTween;
use crate::collab::{
    Animator, PanelChange, PanelField, PanelValue, PropertyPanel, SelectionTarget,
    TransformGizmo,
};
use crate::object::{Geometry, ObjectId, SceneObject, EMISSIVE_HIGHLIGHT};
use crate::scene::{Outline, Scene};

/// How the selection is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightStyle {
    /// Phong emissive set to a grey glow
    Emissive,
    /// Wireframe box around the object
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotFound,
    NotSelectable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Already selected; nothing happened
    Unchanged,
    Selected,
    Rejected(RejectReason),
}

type FieldValues = Vec<(PanelField, PanelValue)>;

pub struct SelectionController {
    style: HighlightStyle,
    honor_can_select: bool,
    selected: Option<SelectionTarget>,
    programmatic_update: bool,
    saved_emissive: Option<u32>,
    panel: Option<Box<dyn PropertyPanel>>,
    gizmo: Option<Box<dyn TransformGizmo>>,
    animator: Box<dyn Animator>,
}

impl SelectionController {
    /// Editor selection: emissive highlight, panel and gizmo. Every object
    /// can be selected.
    pub fn editor(
        animator: Box<dyn Animator>,
        panel: Box<dyn PropertyPanel>,
        gizmo: Box<dyn TransformGizmo>,
    ) -> Self {
        Self {
            style: HighlightStyle::Emissive,
            honor_can_select: false,
            selected: None,
            programmatic_update: false,
            saved_emissive: None,
            panel: Some(panel),
            gizmo: Some(gizmo),
            animator,
        }
    }

    /// Viewer selection: outline highlight only, respecting `can_select`
    pub fn viewer(animator: Box<dyn Animator>) -> Self {
        Self {
            style: HighlightStyle::Outline,
            honor_can_select: true,
            selected: None,
            programmatic_update: false,
            saved_emissive: None,
            panel: None,
            gizmo: None,
            animator,
        }
    }

    pub fn style(&self) -> HighlightStyle {
        self.style
    }

    pub fn selected(&self) -> Option<SelectionTarget> {
        self.selected
    }

    /// Whether panel values are currently being pushed programmatically
    pub fn is_updating(&self) -> bool {
        self.programmatic_update
    }

    pub fn select(&mut self, scene: &mut Scene, target: SelectionTarget) -> SelectOutcome {
        if self.selected == Some(target) {
            return SelectOutcome::Unchanged;
        }

        let Some(world) = scene.world_position(target) else {
            debug!(target = ?target, "Selection target not found");
            return SelectOutcome::Rejected(RejectReason::NotFound);
        };
        let selectable = scene.get(target.object()).is_some_and(|o| o.can_select);
        if self.honor_can_select && !selectable {
            debug!(target = ?target, "Object is not selectable");
            return SelectOutcome::Rejected(RejectReason::NotSelectable);
        }

        self.clear_highlight(scene);
        self.selected = Some(target);
        self.apply_highlight(scene, target, world);

        let fields = target_fields(scene, target);
        self.push_fields(scene, fields);

        if let Some(gizmo) = self.gizmo.as_mut() {
            gizmo.attach(target, world);
        }
        scene.camera.auto_rotate = false;
        self.follow(scene);

        debug!(target = ?target, "Selected");
        SelectOutcome::Selected
    }

    /// Drop the selection. Returns whether anything was selected.
    pub fn deselect(&mut self, scene: &mut Scene) -> bool {
        if self.selected.is_none() {
            return false;
        }
        self.clear_highlight(scene);
        self.selected = None;
        if let Some(gizmo) = self.gizmo.as_mut() {
            gizmo.detach();
        }
        scene.camera.auto_rotate = scene.settings.auto_rotate;
        debug!("Selection cleared");
        true
    }

    /// Forget a selection whose object has been removed from the scene
    pub fn forget(&mut self, scene: &mut Scene, id: ObjectId) {
        if self.selected.map(|t| t.object()) != Some(id) {
            return;
        }
        self.saved_emissive = None;
        if self.style == HighlightStyle::Outline {
            scene.outline = Outline::default();
        }
        self.selected = None;
        if let Some(gizmo) = self.gizmo.as_mut() {
            gizmo.detach();
        }
        scene.camera.auto_rotate = scene.settings.auto_rotate;
    }

    /// Cancel the selection and ease the camera to `position`
    pub fn look_at(&mut self, scene: &mut Scene, position: Vec3) {
        self.deselect(scene);
        self.ease_to(scene, position);
    }

    /// Ease the camera to the current selection
    pub fn follow(&mut self, scene: &mut Scene) {
        let Some(to) = self.selected.and_then(|t| scene.world_position(t)) else {
            return;
        };
        self.ease_to(scene, to);
    }

    /// The animator owns the easing; the orbit target is where it settles
    fn ease_to(&mut self, scene: &mut Scene, to: Vec3) {
        self.animator
            .tween_to(CameraTween::follow(scene.camera.target, to));
        scene.camera.target = to;
    }

    /// Point the selection at a different target without moving the camera,
    /// e.g. when a control point is renumbered. The gizmo and panel follow.
    pub fn retarget(&mut self, scene: &mut Scene, target: SelectionTarget) {
        if self.selected.is_none() || self.selected == Some(target) {
            return;
        }
        let Some(world) = scene.world_position(target) else {
            return;
        };
        self.selected = Some(target);
        if let Some(gizmo) = self.gizmo.as_mut() {
            gizmo.attach(target, world);
        }
        let fields = target_fields(scene, target);
        self.push_fields(scene, fields);
        debug!(target = ?target, "Selection renumbered");
    }

    fn clear_highlight(&mut self, scene: &mut Scene) {
        match self.style {
            HighlightStyle::Emissive => {
                let previous = self.selected.map(|t| t.object());
                if let (Some(id), Some(saved)) = (previous, self.saved_emissive.take()) {
                    if let Some(object) = scene.get_mut(id) {
                        object.emissive = saved;
                    }
                }
            }
            HighlightStyle::Outline => scene.outline = Outline::default(),
        }
    }

    fn apply_highlight(&mut self, scene: &mut Scene, target: SelectionTarget, world: Vec3) {
        match (self.style, target) {
            (HighlightStyle::Emissive, SelectionTarget::Object(id)) => {
                if let Some(object) = scene.get_mut(id).filter(|o| o.is_phong()) {
                    self.saved_emissive = Some(object.emissive);
                    object.emissive = EMISSIVE_HIGHLIGHT;
                }
            }
            // Control points have unlit markers
            (HighlightStyle::Emissive, SelectionTarget::TubePoint { .. }) => {}
            (HighlightStyle::Outline, SelectionTarget::Object(id)) => {
                let traced = scene
                    .get(id)
                    .filter(|o| !matches!(o.geometry, Geometry::Group { .. }))
                    .map(|o| o.transform);
                scene.outline = Outline {
                    visible: true,
                    source: traced.map(|_| id),
                    transform: traced.unwrap_or_else(|| Transform::at(world)),
                };
            }
            (HighlightStyle::Outline, SelectionTarget::TubePoint { .. }) => {
                scene.outline = Outline {
                    visible: true,
                    source: None,
                    transform: Transform::at(world),
                };
            }
        }
    }

    /// Write values to the panel under the guard, dropping any echoes
    fn push_fields(&mut self, scene: &mut Scene, fields: FieldValues) {
        let Some(panel) = self.panel.as_mut() else {
            return;
        };

        self.programmatic_update = true;
        let echoes: Vec<PanelChange> = fields
            .into_iter()
            .filter_map(|(field, value)| panel.set_field(field, value))
            .collect();
        for echo in echoes {
            self.handle_panel_change(scene, echo);
        }
        self.programmatic_update = false;
    }

    /// Apply a user edit from the panel. Returns whether it changed anything.
    pub fn handle_panel_change(&mut self, scene: &mut Scene, change: PanelChange) -> bool {
        if self.programmatic_update {
            debug!(field = ?change.field, "Ignoring panel echo");
            return false;
        }

        match (change.field, &change.value) {
            (PanelField::FogColor, PanelValue::Text(color)) => {
                scene.settings.fog.fog_color = color.clone();
                return true;
            }
            (PanelField::FogDensity, PanelValue::Number(density)) => {
                scene.settings.fog.fog_density = *density;
                return true;
            }
            (PanelField::AutoRotate, PanelValue::Bool(on)) => {
                scene.settings.auto_rotate = *on;
                if self.selected.is_none() {
                    scene.camera.auto_rotate = *on;
                }
                return true;
            }
            _ => {}
        }

        match self.selected {
            Some(SelectionTarget::Object(id)) => self.edit_object(scene, id, change),
            Some(SelectionTarget::TubePoint { tube, index }) => {
                let Some(current) = scene
                    .get(tube)
                    .and_then(|o| o.tube.as_ref())
                    .and_then(|t| t.get(index))
                    .map(|b| b.position)
                else {
                    return false;
                };
                let Some(position) = with_position_field(current, &change) else {
                    debug!(field = ?change.field, "Field does not apply to a control point");
                    return false;
                };
                self.move_tube_point(scene, tube, index, position)
            }
            None => false,
        }
    }

    fn edit_object(&mut self, scene: &mut Scene, id: ObjectId, change: PanelChange) -> bool {
        let Some(object) = scene.get_mut(id) else {
            return false;
        };

        let mut follow_up = FieldValues::new();
        let applied = apply_field(object, &change, &mut follow_up);
        if !applied {
            debug!(field = ?change.field, value = ?change.value, "Panel change not applicable");
        }
        if !follow_up.is_empty() {
            self.push_fields(scene, follow_up);
        }
        applied
    }

    fn move_tube_point(
        &mut self,
        scene: &mut Scene,
        tube: ObjectId,
        index: PointIndex,
        position: Vec3,
    ) -> bool {
        let Some(object) = scene.get_mut(tube) else {
            return false;
        };
        let Some(editor) = object.tube.as_mut() else {
            return false;
        };

        let new_index = match editor.move_point(index, position) {
            Ok(new_index) => new_index,
            Err(e) => {
                warn!(id = %tube, point = %index, error = %e, "Tube edit failed");
                return false;
            }
        };
        object.refresh_tube();

        if new_index != index {
            let target = SelectionTarget::TubePoint {
                tube,
                index: new_index,
            };
            self.selected = Some(target);
            if let (Some(gizmo), Some(world)) = (self.gizmo.as_mut(), scene.world_position(target)) {
                gizmo.attach(target, world);
            }
        }
        true
    }

    /// The gizmo moved the attached target to `transform`. The gizmo works in
    /// world space, so a control point's position is taken relative to its
    /// tube.
    pub fn gizmo_changed(&mut self, scene: &mut Scene, transform: Transform) -> bool {
        let Some(target) = self.selected else {
            return false;
        };

        match target {
            SelectionTarget::Object(id) => {
                let Some(object) = scene.get_mut(id) else {
                    return false;
                };
                object.transform = transform;
            }
            SelectionTarget::TubePoint { tube, index } => {
                let Some(parent) = scene.get(tube).map(|o| o.transform.position) else {
                    return false;
                };
                if !self.move_tube_point(scene, tube, index, transform.position - parent) {
                    return false;
                }
            }
        }

        if let Some(current) = self.selected {
            let fields = transform_fields(&target_transform(scene, current));
            self.push_fields(scene, fields);
        }
        true
    }

    /// The gizmo drag ended; bring the camera back onto the selection
    pub fn gizmo_released(&mut self, scene: &mut Scene) {
        self.follow(scene);
    }
}

/// Transform of a target as the panel shows it
fn target_transform(scene: &Scene, target: SelectionTarget) -> Transform {
    match target {
        SelectionTarget::Object(id) => scene.get(id).map(|o| o.transform).unwrap_or_default(),
        SelectionTarget::TubePoint { tube, index } => scene
            .get(tube)
            .and_then(|o| o.tube.as_ref())
            .and_then(|t| t.get(index))
            .map(|b| Transform::at(b.position))
            .unwrap_or_default(),
    }
}

fn transform_fields(transform: &Transform) -> FieldValues {
    let degrees = transform.rotation_degrees();
    let scale = transform.scale;
    vec![
        (PanelField::PositionX, PanelValue::Number(transform.position.x)),
        (PanelField::PositionY, PanelValue::Number(transform.position.y)),
        (PanelField::PositionZ, PanelValue::Number(transform.position.z)),
        (PanelField::RotationX, PanelValue::Number(degrees.x)),
        (PanelField::RotationY, PanelValue::Number(degrees.y)),
        (PanelField::RotationZ, PanelValue::Number(degrees.z)),
        (PanelField::ScaleX, PanelValue::Number(scale.x)),
        (PanelField::ScaleY, PanelValue::Number(scale.y)),
        (PanelField::ScaleZ, PanelValue::Number(scale.z)),
        (
            PanelField::Scale,
            PanelValue::Number(scale.x.min(scale.y).min(scale.z)),
        ),
    ]
}

/// Everything the panel shows for a newly selected target
fn target_fields(scene: &Scene, target: SelectionTarget) -> FieldValues {
    let mut fields = transform_fields(&target_transform(scene, target));
    let SelectionTarget::Object(id) = target else {
        return fields;
    };
    let Some(object) = scene.get(id) else {
        return fields;
    };
    object_fields(object, &mut fields);
    fields
}

fn object_fields(object: &SceneObject, fields: &mut FieldValues) {
    let kind = &object.kind;
    if let Some(material) = kind.material() {
        fields.push((PanelField::Color, PanelValue::Text(material.color.clone())));
    }
    fields.push((PanelField::CastShadow, PanelValue::Bool(object.cast_shadow)));
    fields.push((PanelField::ReceiveShadow, PanelValue::Bool(object.receive_shadow)));
    if let Some(texture) = kind.texture() {
        fields.push((PanelField::TextureUrl, PanelValue::Text(texture.texture_url.clone())));
        fields.push((PanelField::TextureRepeatX, PanelValue::Number(texture.texture_repeat_x)));
        fields.push((PanelField::TextureRepeatY, PanelValue::Number(texture.texture_repeat_y)));
    }
    if let Some(material) = kind.material() {
        fields.push((PanelField::BumpScale, PanelValue::Number(material.bump_scale)));
        fields.push((PanelField::Shininess, PanelValue::Number(material.shininess)));
    }
    if let Some(opacity) = kind.opacity() {
        fields.push((PanelField::Opacity, PanelValue::Number(opacity)));
    }
    for prop in BindProperty::ALL {
        let raw = object.bind.get(&prop).cloned().unwrap_or_default();
        fields.push((PanelField::Bind(prop), PanelValue::Text(raw)));
    }
}

/// `current` with the position component named by `change` replaced
fn with_position_field(current: Vec3, change: &PanelChange) -> Option<Vec3> {
    let value = change.value.as_number()?;
    let mut position = current;
    match change.field {
        PanelField::PositionX => position.x = value,
        PanelField::PositionY => position.y = value,
        PanelField::PositionZ => position.z = value,
        _ => return None,
    }
    Some(position)
}

/// Apply one panel edit to an object. Values that must be re-shown in the
/// panel afterwards are added to `follow_up`.
fn apply_field(object: &mut SceneObject, change: &PanelChange, follow_up: &mut FieldValues) -> bool {
    let t = &mut object.transform;
    match (change.field, &change.value) {
        (PanelField::PositionX, PanelValue::Number(v)) => t.position.x = *v,
        (PanelField::PositionY, PanelValue::Number(v)) => t.position.y = *v,
        (PanelField::PositionZ, PanelValue::Number(v)) => t.position.z = *v,
        (PanelField::RotationX, PanelValue::Number(v)) => t.rotation.x = deg_to_rad(*v),
        (PanelField::RotationY, PanelValue::Number(v)) => t.rotation.y = deg_to_rad(*v),
        (PanelField::RotationZ, PanelValue::Number(v)) => t.rotation.z = deg_to_rad(*v),
        (PanelField::ScaleX, PanelValue::Number(v)) => t.scale.x = *v,
        (PanelField::ScaleY, PanelValue::Number(v)) => t.scale.y = *v,
        (PanelField::ScaleZ, PanelValue::Number(v)) => t.scale.z = *v,
        (PanelField::Scale, PanelValue::Number(v)) => {
            t.scale = Vec3::splat(*v);
            follow_up.extend([
                (PanelField::ScaleX, PanelValue::Number(*v)),
                (PanelField::ScaleY, PanelValue::Number(*v)),
                (PanelField::ScaleZ, PanelValue::Number(*v)),
            ]);
        }
        (PanelField::CastShadow, PanelValue::Bool(on)) => object.cast_shadow = *on,
        (PanelField::ReceiveShadow, PanelValue::Bool(on)) => object.receive_shadow = *on,
        (PanelField::Color, PanelValue::Text(color)) => return object.set_color(color),
        (PanelField::TextureUrl, PanelValue::Text(url)) => {
            let Some(texture) = object.kind.texture_mut() else {
                return false;
            };
            texture.texture_url = url.clone();
            if url.is_empty() {
                texture.texture_repeat_x = 0.0;
                texture.texture_repeat_y = 0.0;
            }
            object.refresh_texture_repeat();
        }
        (PanelField::TextureRepeatX, PanelValue::Number(v)) => {
            let Some(texture) = object.kind.texture_mut() else {
                return false;
            };
            texture.texture_repeat_x = *v;
            object.refresh_texture_repeat();
        }
        (PanelField::TextureRepeatY, PanelValue::Number(v)) => {
            let Some(texture) = object.kind.texture_mut() else {
                return false;
            };
            texture.texture_repeat_y = *v;
            object.refresh_texture_repeat();
        }
        (PanelField::BumpScale, PanelValue::Number(v)) => match object.kind.material_mut() {
            Some(material) => material.bump_scale = *v,
            None => return false,
        },
        (PanelField::Shininess, PanelValue::Number(v)) => match object.kind.material_mut() {
            Some(material) => material.shininess = *v,
            None => return false,
        },
        (PanelField::Opacity, PanelValue::Number(v)) => {
            if object.kind.opacity().is_none() {
                return false;
            }
            object.set_opacity(*v);
        }
        (PanelField::Bind(prop), PanelValue::Text(raw)) => object.update_bind(prop, raw),
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingAnimator, RecordingGizmo, RecordingPanel};
    use vitrine_core::{create_record, default_input, ObjectType};

    fn add(scene: &mut Scene, ty: ObjectType, at: Vec3) -> ObjectId {
        let record = create_record(ty, default_input(ty), at).unwrap();
        scene.add_record(record, None).unwrap()
    }

    struct Editor {
        scene: Scene,
        selection: SelectionController,
        panel: RecordingPanel,
        gizmo: RecordingGizmo,
        animator: RecordingAnimator,
    }

    fn editor() -> Editor {
        let panel = RecordingPanel::echoing();
        let gizmo = RecordingGizmo::default();
        let animator = RecordingAnimator::default();
        let selection = SelectionController::editor(
            Box::new(animator.clone()),
            Box::new(panel.clone()),
            Box::new(gizmo.clone()),
        );
        Editor {
            scene: Scene::default(),
            selection,
            panel,
            gizmo,
            animator,
        }
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut ed = editor();
        let id = add(&mut ed.scene, ObjectType::Box, Vec3::new(1.0, 0.0, 0.0));
        let target = SelectionTarget::Object(id);

        assert_eq!(ed.selection.select(&mut ed.scene, target), SelectOutcome::Selected);
        let pushed = ed.panel.count();
        assert_eq!(ed.selection.select(&mut ed.scene, target), SelectOutcome::Unchanged);

        assert_eq!(ed.panel.count(), pushed);
        assert_eq!(ed.animator.tweens().len(), 1);
        assert_eq!(ed.gizmo.attached(), vec![target]);
        assert_eq!(ed.scene.get(id).unwrap().emissive, EMISSIVE_HIGHLIGHT);
        assert!(!ed.scene.camera.auto_rotate);
    }

    #[test]
    fn test_panel_echoes_are_dropped() {
        let mut ed = editor();
        let id = add(&mut ed.scene, ObjectType::Box, Vec3::new(1.0, 2.0, 3.0));
        let before = ed.scene.get(id).unwrap().clone();

        // The panel echoes every value back shifted; none of it may land
        ed.selection.select(&mut ed.scene, SelectionTarget::Object(id));
        let after = ed.scene.get(id).unwrap();
        assert_eq!(after.transform, before.transform);
        assert_eq!(after.kind, before.kind);
        assert_eq!(after.bind, before.bind);
        assert!(!ed.selection.is_updating());
        assert!(ed.panel.count() > 0);
    }

    #[test]
    fn test_switching_restores_emissive() {
        let mut ed = editor();
        let a = add(&mut ed.scene, ObjectType::Box, Vec3::ZERO);
        let b = add(&mut ed.scene, ObjectType::Sphere, Vec3::ZERO);

        ed.selection.select(&mut ed.scene, SelectionTarget::Object(a));
        ed.selection.select(&mut ed.scene, SelectionTarget::Object(b));
        assert_eq!(ed.scene.get(a).unwrap().emissive, 0);
        assert_eq!(ed.scene.get(b).unwrap().emissive, EMISSIVE_HIGHLIGHT);

        assert!(ed.selection.deselect(&mut ed.scene));
        assert_eq!(ed.scene.get(b).unwrap().emissive, 0);
        assert!(ed.gizmo.detached() >= 1);
        assert_eq!(ed.scene.camera.auto_rotate, ed.scene.settings.auto_rotate);
        assert!(!ed.selection.deselect(&mut ed.scene));
    }

    #[test]
    fn test_panel_edits_apply() {
        let mut ed = editor();
        let id = add(&mut ed.scene, ObjectType::Box, Vec3::ZERO);
        ed.selection.select(&mut ed.scene, SelectionTarget::Object(id));
        let change = |field, value| PanelChange { field, value };

        assert!(ed.selection.handle_panel_change(
            &mut ed.scene,
            change(PanelField::RotationY, PanelValue::Number(180.0))
        ));
        assert!(ed.selection.handle_panel_change(
            &mut ed.scene,
            change(PanelField::Scale, PanelValue::Number(2.0))
        ));
        assert!(ed.selection.handle_panel_change(
            &mut ed.scene,
            change(PanelField::TextureUrl, PanelValue::Text("wood.jpg".to_string()))
        ));
        assert!(ed.selection.handle_panel_change(
            &mut ed.scene,
            change(PanelField::Opacity, PanelValue::Number(0.4))
        ));
        assert!(ed.selection.handle_panel_change(
            &mut ed.scene,
            change(
                PanelField::Bind(BindProperty::PositionY),
                PanelValue::Text("{$level}".to_string())
            )
        ));

        let object = ed.scene.get(id).unwrap();
        assert!((object.transform.rotation.y - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(object.transform.scale, Vec3::splat(2.0));
        assert_eq!(object.texture_repeat, (3.0, 3.0));
        assert!(object.transparent);
        assert_eq!(object.bind_keys().to_vec(), vec!["level".to_string()]);

        // The uniform scale is re-shown per axis
        assert!(ed
            .panel
            .pushed()
            .contains(&(PanelField::ScaleX, PanelValue::Number(2.0))));

        // Clearing the texture zeroes the stored repeat and the binding goes away
        ed.selection.handle_panel_change(
            &mut ed.scene,
            change(PanelField::TextureUrl, PanelValue::Text(String::new())),
        );
        ed.selection.handle_panel_change(
            &mut ed.scene,
            change(PanelField::Bind(BindProperty::PositionY), PanelValue::Text(String::new())),
        );
        let object = ed.scene.get(id).unwrap();
        let texture = object.kind.texture().unwrap();
        assert_eq!((texture.texture_repeat_x, texture.texture_repeat_y), (0.0, 0.0));
        assert_eq!(object.texture_repeat, (0.0, 0.0));
        assert!(object.bind.is_empty());
    }

    #[test]
    fn test_auto_rotate_ignored_while_selected() {
        let mut ed = editor();
        let id = add(&mut ed.scene, ObjectType::Box, Vec3::ZERO);
        let toggle = |on| PanelChange {
            field: PanelField::AutoRotate,
            value: PanelValue::Bool(on),
        };

        ed.selection.select(&mut ed.scene, SelectionTarget::Object(id));
        ed.selection.handle_panel_change(&mut ed.scene, toggle(true));
        assert!(!ed.scene.camera.auto_rotate);
        assert!(ed.scene.settings.auto_rotate);

        ed.selection.deselect(&mut ed.scene);
        ed.selection.handle_panel_change(&mut ed.scene, toggle(false));
        assert!(!ed.scene.camera.auto_rotate);
        assert!(!ed.scene.settings.auto_rotate);
    }

    #[test]
    fn test_dragging_dotted_point_promotes_it() {
        let mut ed = editor();
        let tube = add(&mut ed.scene, ObjectType::Tube, Vec3::ZERO);
        let dotted = PointIndex::dotted_before(1);
        let target = SelectionTarget::TubePoint { tube, index: dotted };

        assert_eq!(ed.selection.select(&mut ed.scene, target), SelectOutcome::Selected);
        // Camera follows parent position plus local offset
        let tween = ed.animator.tweens()[0];
        assert_eq!(tween.to, Vec3::new(0.0, 20.0, 0.0));

        // Gizmo positions are in world space; the tube sits at y=20
        let moved = Transform::at(Vec3::new(0.0, 24.0, 0.0));
        assert!(ed.selection.gizmo_changed(&mut ed.scene, moved));

        let promoted = SelectionTarget::TubePoint {
            tube,
            index: PointIndex::solid(1),
        };
        assert_eq!(ed.selection.selected(), Some(promoted));
        let object = ed.scene.get(tube).unwrap();
        let editor = object.tube.as_ref().unwrap();
        assert_eq!(editor.solid_count(), 3);
        assert_eq!(editor.path()[1], Vec3::new(0.0, 4.0, 0.0));
        editor.check_invariant().unwrap();
        assert_eq!(object.revision, 1);
        assert_eq!(ed.gizmo.attached().last(), Some(&promoted));

        ed.selection.gizmo_released(&mut ed.scene);
        assert_eq!(ed.animator.tweens().last().unwrap().to, Vec3::new(0.0, 24.0, 0.0));
    }

    #[test]
    fn test_gizmo_on_offset_tube() {
        let mut ed = editor();
        let tube = add(&mut ed.scene, ObjectType::Tube, Vec3::ZERO);
        ed.scene.get_mut(tube).unwrap().transform.position = Vec3::new(5.0, 20.0, -3.0);
        let end = SelectionTarget::TubePoint {
            tube,
            index: PointIndex::solid(1),
        };
        ed.selection.select(&mut ed.scene, end);
        assert_eq!(ed.scene.world_position(end), Some(Vec3::new(15.0, 20.0, -3.0)));

        // Dragging to where the point already is leaves it in place
        let here = Transform::at(Vec3::new(15.0, 20.0, -3.0));
        assert!(ed.selection.gizmo_changed(&mut ed.scene, here));
        let point = |ed: &Editor| {
            let editor = ed.scene.get(tube).unwrap().tube.as_ref().unwrap();
            editor.get(PointIndex::solid(1)).unwrap().position
        };
        assert_eq!(point(&ed), Vec3::new(10.0, 0.0, 0.0));

        let up = Transform::at(Vec3::new(15.0, 25.0, -3.0));
        assert!(ed.selection.gizmo_changed(&mut ed.scene, up));
        assert_eq!(point(&ed), Vec3::new(10.0, 5.0, 0.0));
        assert_eq!(ed.scene.world_position(end), Some(Vec3::new(15.0, 25.0, -3.0)));
    }

    #[test]
    fn test_follow_moves_orbit_target() {
        let mut ed = editor();
        let a = add(&mut ed.scene, ObjectType::Box, Vec3::new(10.0, 0.0, 0.0));
        let b = add(&mut ed.scene, ObjectType::Box, Vec3::new(0.0, 0.0, 4.0));

        ed.selection.select(&mut ed.scene, SelectionTarget::Object(a));
        assert_eq!(ed.scene.camera.target, Vec3::new(10.0, 0.0, 0.0));

        ed.selection.select(&mut ed.scene, SelectionTarget::Object(b));
        let tween = *ed.animator.tweens().last().unwrap();
        assert_eq!(tween.from, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(tween.to, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(ed.scene.camera.target, Vec3::new(0.0, 0.0, 4.0));

        ed.selection.look_at(&mut ed.scene, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(ed.scene.camera.target, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_viewer_respects_can_select() {
        let animator = RecordingAnimator::default();
        let mut selection = SelectionController::viewer(Box::new(animator.clone()));
        let mut scene = Scene::default();
        let id = add(&mut scene, ObjectType::Sphere, Vec3::new(5.0, 0.0, 0.0));
        scene.get_mut(id).unwrap().can_select = false;

        assert_eq!(
            selection.select(&mut scene, SelectionTarget::Object(id)),
            SelectOutcome::Rejected(RejectReason::NotSelectable)
        );
        assert!(animator.tweens().is_empty());

        scene.get_mut(id).unwrap().can_select = true;
        assert_eq!(
            selection.select(&mut scene, SelectionTarget::Object(id)),
            SelectOutcome::Selected
        );
        assert!(scene.outline.visible);
        assert_eq!(scene.outline.source, Some(id));
        assert_eq!(scene.outline.transform.position, Vec3::new(5.0, 0.0, 0.0));

        selection.look_at(&mut scene, Vec3::new(0.0, 1.0, 0.0));
        assert!(!scene.outline.visible);
        assert_eq!(selection.selected(), None);
        assert_eq!(animator.tweens().last().unwrap().to, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_forget_removed_selection() {
        let mut ed = editor();
        let id = add(&mut ed.scene, ObjectType::Box, Vec3::ZERO);
        ed.selection.select(&mut ed.scene, SelectionTarget::Object(id));
        ed.scene.remove(id);
        ed.selection.forget(&mut ed.scene, id);
        assert_eq!(ed.selection.selected(), None);
        assert_eq!(ed.gizmo.detached(), 1);
    }
}
