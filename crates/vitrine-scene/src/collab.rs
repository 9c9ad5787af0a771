//! External collaborators
//!
//! Rendering, picking, gizmo handles, asset loading, the property panel and
//! camera easing all live outside the scene core. The session talks to them
//! through these traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;
use vitrine_core::{BindProperty, PointIndex, Vec3};

use crate::camera::{Camera, CameraTween};
use crate::object::ObjectId;
use crate::scene::Scene;

/// What kind of asset a load produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Font,
    Model,
    Svg,
    Texture,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetKind::Font => "font",
            AssetKind::Model => "model",
            AssetKind::Svg => "svg",
            AssetKind::Texture => "texture",
        };
        f.write_str(s)
    }
}

/// Opaque identity of a loaded asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(pub String);

/// A loaded asset. Parsing is the loader's business; the scene only keeps
/// the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub kind: AssetKind,
    pub url: String,
    pub handle: AssetHandle,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("Failed to read asset {url}: {message}")]
    Io { url: String, message: String },
    #[error("Failed to parse asset {url}: {message}")]
    Parse { url: String, message: String },
    #[error("Asset load task failed: {0}")]
    Task(String),
}

/// Loads fonts, models, SVGs and textures
pub trait AssetLoader: Send + Sync {
    fn load(&self, kind: AssetKind, url: &str)
        -> impl Future<Output = Result<Asset, AssetError>> + Send;
}

/// Draws the scene
pub trait Renderer {
    fn render_frame(&mut self, scene: &Scene, camera: &Camera);
    fn resize(&mut self, width: u32, height: u32);
}

/// Result of a pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Top-level object that was hit
    pub object: ObjectId,
    /// Tube control point under the cursor, when the hit was one
    pub tube_point: Option<PointIndex>,
    pub distance: f64,
}

/// Finds the nearest object under a screen coordinate
pub trait Picker {
    fn pick(&self, screen_x: f64, screen_y: f64, candidates: &[ObjectId]) -> Option<PickHit>;
}

/// Something the gizmo or selection can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionTarget {
    Object(ObjectId),
    TubePoint { tube: ObjectId, index: PointIndex },
}

impl SelectionTarget {
    /// The top-level object this target belongs to
    pub fn object(&self) -> ObjectId {
        match self {
            SelectionTarget::Object(id) => *id,
            SelectionTarget::TubePoint { tube, .. } => *tube,
        }
    }
}

/// Drag handles for the selected object
pub trait TransformGizmo: Send {
    fn attach(&mut self, target: SelectionTarget, world_position: Vec3);
    fn detach(&mut self);
}

/// Fields shown in the property panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelField {
    FogColor,
    FogDensity,
    AutoRotate,
    CastShadow,
    ReceiveShadow,
    Color,
    PositionX,
    PositionY,
    PositionZ,
    /// Degrees
    RotationX,
    RotationY,
    RotationZ,
    /// Uniform scale
    Scale,
    ScaleX,
    ScaleY,
    ScaleZ,
    TextureUrl,
    TextureRepeatX,
    TextureRepeatY,
    BumpScale,
    Shininess,
    Opacity,
    Bind(BindProperty),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl PanelValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PanelValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PanelValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PanelValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A user edit (or widget echo) coming out of the panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelChange {
    pub field: PanelField,
    pub value: PanelValue,
}

/// Parameter widgets. `set_field` returns the change event the widget emits
/// in response, if it emits one.
pub trait PropertyPanel: Send {
    fn set_field(&mut self, field: PanelField, value: PanelValue) -> Option<PanelChange>;
}

/// Eases the camera target
pub trait Animator: Send {
    fn tween_to(&mut self, tween: CameraTween);
}
