//! Recording collaborators for tests

use std::sync::{Arc, Mutex};
use vitrine_core::Vec3;

use crate::camera::{Camera, CameraTween};
use crate::collab::{
    Animator, PanelChange, PanelField, PanelValue, PickHit, Picker, PropertyPanel, Renderer,
    SelectionTarget, TransformGizmo,
};
use crate::object::ObjectId;
use crate::scene::Scene;

/// Records every value pushed to it. An echoing panel answers each push
/// with a change event carrying a different value.
#[derive(Clone, Default)]
pub struct RecordingPanel {
    log: Arc<Mutex<Vec<(PanelField, PanelValue)>>>,
    echo: bool,
}

impl RecordingPanel {
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Default::default()
        }
    }

    pub fn pushed(&self) -> Vec<(PanelField, PanelValue)> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl PropertyPanel for RecordingPanel {
    fn set_field(&mut self, field: PanelField, value: PanelValue) -> Option<PanelChange> {
        self.log.lock().unwrap().push((field, value.clone()));
        if !self.echo {
            return None;
        }
        let value = match value {
            PanelValue::Number(v) => PanelValue::Number(v + 100.0),
            PanelValue::Text(s) => PanelValue::Text(format!("{}x", s)),
            PanelValue::Bool(b) => PanelValue::Bool(!b),
        };
        Some(PanelChange { field, value })
    }
}

#[derive(Clone, Default)]
pub struct RecordingGizmo {
    attached: Arc<Mutex<Vec<SelectionTarget>>>,
    detached: Arc<Mutex<usize>>,
}

impl RecordingGizmo {
    pub fn attached(&self) -> Vec<SelectionTarget> {
        self.attached.lock().unwrap().clone()
    }

    pub fn detached(&self) -> usize {
        *self.detached.lock().unwrap()
    }
}

impl TransformGizmo for RecordingGizmo {
    fn attach(&mut self, target: SelectionTarget, _world_position: Vec3) {
        self.attached.lock().unwrap().push(target);
    }

    fn detach(&mut self) {
        *self.detached.lock().unwrap() += 1;
    }
}

#[derive(Clone, Default)]
pub struct RecordingAnimator {
    tweens: Arc<Mutex<Vec<CameraTween>>>,
}

impl RecordingAnimator {
    pub fn tweens(&self) -> Vec<CameraTween> {
        self.tweens.lock().unwrap().clone()
    }
}

impl Animator for RecordingAnimator {
    fn tween_to(&mut self, tween: CameraTween) {
        self.tweens.lock().unwrap().push(tween);
    }
}

/// Always reports the same hit, if any
pub struct FixedPicker(pub Option<PickHit>);

impl FixedPicker {
    pub fn object(id: ObjectId) -> Self {
        Self(Some(PickHit {
            object: id,
            tube_point: None,
            distance: 1.0,
        }))
    }
}

impl Picker for FixedPicker {
    fn pick(&self, _x: f64, _y: f64, candidates: &[ObjectId]) -> Option<PickHit> {
        self.0.filter(|hit| candidates.contains(&hit.object))
    }
}

#[derive(Default)]
pub struct CountingRenderer {
    pub frames: usize,
    pub objects_seen: usize,
    pub size: (u32, u32),
}

impl Renderer for CountingRenderer {
    fn render_frame(&mut self, scene: &Scene, _camera: &Camera) {
        self.frames += 1;
        self.objects_seen = scene.len();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}
