//! Live scene objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use vitrine_core::{
    BindProperty, BindingSet, ObjectKind, ObjectType, Transform, TubeEditor, TubeGeometry, Vec3,
};

use crate::collab::Asset;

/// Emissive color of an unhighlighted Phong material
pub const EMISSIVE_NONE: u32 = 0x000000;

/// Emissive color used to highlight the selection in the editor
pub const EMISSIVE_HIGHLIGHT: u32 = 0x333333;

/// Stable identity of a top-level object within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Renderable content of an object
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Parametric primitive, shifted so that base-anchored shapes sit on y=0
    Primitive { anchor_offset: Vec3 },
    Tube(TubeGeometry),
    /// Extruded text built with a font
    Text { font: Asset },
    /// Canvas-drawn label on a sprite
    Label { text: String },
    /// Image sprite
    Image { url: String },
    /// Children parsed from a loaded asset
    Group { asset: Asset },
}

/// A top-level, type-tagged object in the live scene.
///
/// The record part (`kind`, `transform`, shadows, `bind`) is what gets
/// saved; the rest is live state that is rebuilt on load.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub bind: BTreeMap<BindProperty, String>,

    pub name: String,
    pub visible: bool,
    pub can_select: bool,
    /// Emissive color of a Phong material
    pub emissive: u32,
    pub transparent: bool,
    /// Texture repeat the renderer applies
    pub texture_repeat: (f64, f64),
    pub geometry: Geometry,
    pub bindings: BindingSet,
    /// Control points, for tubes
    pub tube: Option<TubeEditor>,
    /// Incremented whenever the geometry is rebuilt
    pub revision: u64,
}

impl SceneObject {
    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }

    pub fn is_phong(&self) -> bool {
        self.kind.is_phong()
    }

    /// Whether a `visible` binding is present
    pub fn has_visible_binding(&self) -> bool {
        self.bindings.contains(BindProperty::Visible)
    }

    /// Replace the raw binding strings and recompile them
    pub fn set_bind(&mut self, bind: BTreeMap<BindProperty, String>) {
        self.bindings = BindingSet::compile(&bind);
        self.bind = bind;
    }

    /// Set or clear one binding. An empty template removes it.
    pub fn update_bind(&mut self, prop: BindProperty, raw: &str) {
        let mut bind = std::mem::take(&mut self.bind);
        if raw.is_empty() {
            bind.remove(&prop);
        } else {
            bind.insert(prop, raw.to_string());
        }
        self.set_bind(bind);
    }

    /// Update opacity. Phong materials become transparent unless exactly
    /// opaque; sprites stay transparent.
    pub fn set_opacity(&mut self, opacity: f64) {
        if self.kind.opacity().is_none() {
            return;
        }
        self.kind.set_opacity(opacity);
        if !self.object_type().is_sprite() {
            self.transparent = opacity != 1.0;
        }
    }

    /// Set the Phong color; ignored for other materials
    pub fn set_color(&mut self, color: &str) -> bool {
        match self.kind.material_mut() {
            Some(material) => {
                material.color = color.to_string();
                true
            }
            None => false,
        }
    }

    /// Re-derive the texture repeat from the stored binding
    pub fn refresh_texture_repeat(&mut self) {
        if let Some(texture) = self.kind.texture() {
            self.texture_repeat = texture.effective_repeat();
        }
    }

    /// Rebuild the tube geometry from its editor
    pub fn refresh_tube(&mut self) {
        if let Some(editor) = &self.tube {
            self.geometry = Geometry::Tube(editor.geometry());
            self.revision += 1;
        }
    }

    /// All template keys across this object's bindings
    pub fn bind_keys(&self) -> &[String] {
        self.bindings.all_keys()
    }
}
