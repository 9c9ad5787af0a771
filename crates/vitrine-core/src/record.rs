//! Serializable scene object records
//!
//! A [`SceneObjectRecord`] is the persisted description of one placed object.
//! The object's `type` selects an [`ObjectKind`] variant and each variant
//! carries only the parameters that make sense for it: mesh primitives carry
//! geometry, a Phong material and a texture binding, sprites carry an opacity,
//! and group types (Svg, Model) carry only their asset reference.
//!
//! The JSON form is flat and internally tagged:
//!
//! ```json
//! {
//!   "type": "Box",
//!   "geometryParams": { "width": 1, "height": 1, "depth": 1 },
//!   "materialParams": { "color": "#F00", "bumpScale": 0.2, "shininess": 30, "opacity": 1 },
//!   "textureUrl": "", "textureRepeatX": 3, "textureRepeatY": 3,
//!   "position": { "x": 0, "y": 0.2, "z": 0 },
//!   "rotation": { "x": 0, "y": 0, "z": 0 },
//!   "scale": { "x": 1, "y": 1, "z": 1 },
//!   "castShadow": true, "receiveShadow": true,
//!   "bind": { "visible": "{$valve_1}" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::transform::{Transform, Vec3};

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("Unknown object type: {0}")]
    UnknownType(String),
    #[error("Unknown bind property: {0}")]
    UnknownBindProperty(String),
    #[error("Tube path needs at least 2 points, got {0}")]
    TubeTooShort(usize),
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),
}

/// The fixed set of placeable object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    Box,
    Cone,
    Cylinder,
    Dodecahedron,
    Icosahedron,
    Octahedron,
    Ring,
    Sphere,
    Tetrahedron,
    Torus,
    Tube,
    Text,
    Marker,
    Svg,
    Img,
    Model,
}

impl ObjectType {
    pub const ALL: [ObjectType; 16] = [
        ObjectType::Box,
        ObjectType::Cone,
        ObjectType::Cylinder,
        ObjectType::Dodecahedron,
        ObjectType::Icosahedron,
        ObjectType::Octahedron,
        ObjectType::Ring,
        ObjectType::Sphere,
        ObjectType::Tetrahedron,
        ObjectType::Torus,
        ObjectType::Tube,
        ObjectType::Text,
        ObjectType::Marker,
        ObjectType::Svg,
        ObjectType::Img,
        ObjectType::Model,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Box => "Box",
            ObjectType::Cone => "Cone",
            ObjectType::Cylinder => "Cylinder",
            ObjectType::Dodecahedron => "Dodecahedron",
            ObjectType::Icosahedron => "Icosahedron",
            ObjectType::Octahedron => "Octahedron",
            ObjectType::Ring => "Ring",
            ObjectType::Sphere => "Sphere",
            ObjectType::Tetrahedron => "Tetrahedron",
            ObjectType::Torus => "Torus",
            ObjectType::Tube => "Tube",
            ObjectType::Text => "Text",
            ObjectType::Marker => "Marker",
            ObjectType::Svg => "Svg",
            ObjectType::Img => "Img",
            ObjectType::Model => "Model",
        }
    }

    /// Group types own child meshes and have no material of their own
    pub fn is_group(self) -> bool {
        matches!(self, ObjectType::Svg | ObjectType::Model)
    }

    /// Sprite types are always rendered transparent
    pub fn is_sprite(self) -> bool {
        matches!(self, ObjectType::Marker | ObjectType::Img)
    }

    /// Types whose geometry comes from an asynchronous asset load
    pub fn is_asset_derived(self) -> bool {
        matches!(self, ObjectType::Text | ObjectType::Svg | ObjectType::Model)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RecordError::UnknownType(s.to_string()))
    }
}

/// Object properties that can be driven by a template binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindProperty {
    Name,
    Visible,
    Color,
    PositionX,
    PositionY,
    PositionZ,
    RotationX,
    RotationY,
    RotationZ,
    ScaleX,
    ScaleY,
    ScaleZ,
    Opacity,
    Value,
    #[serde(rename = "can_select")]
    CanSelect,
}

impl BindProperty {
    pub const ALL: [BindProperty; 15] = [
        BindProperty::Name,
        BindProperty::Visible,
        BindProperty::Color,
        BindProperty::PositionX,
        BindProperty::PositionY,
        BindProperty::PositionZ,
        BindProperty::RotationX,
        BindProperty::RotationY,
        BindProperty::RotationZ,
        BindProperty::ScaleX,
        BindProperty::ScaleY,
        BindProperty::ScaleZ,
        BindProperty::Opacity,
        BindProperty::Value,
        BindProperty::CanSelect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BindProperty::Name => "name",
            BindProperty::Visible => "visible",
            BindProperty::Color => "color",
            BindProperty::PositionX => "positionX",
            BindProperty::PositionY => "positionY",
            BindProperty::PositionZ => "positionZ",
            BindProperty::RotationX => "rotationX",
            BindProperty::RotationY => "rotationY",
            BindProperty::RotationZ => "rotationZ",
            BindProperty::ScaleX => "scaleX",
            BindProperty::ScaleY => "scaleY",
            BindProperty::ScaleZ => "scaleZ",
            BindProperty::Opacity => "opacity",
            BindProperty::Value => "value",
            BindProperty::CanSelect => "can_select",
        }
    }
}

impl fmt::Display for BindProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindProperty {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BindProperty::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| RecordError::UnknownBindProperty(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Geometry parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxParams {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConeParams {
    pub radius: f64,
    pub height: f64,
    pub radial_segments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CylinderParams {
    pub radius_top: f64,
    pub radius_bottom: f64,
    pub height: f64,
    pub radial_segments: u32,
}

/// Shared by Dodecahedron, Icosahedron, Octahedron and Tetrahedron
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyhedronParams {
    pub radius: f64,
    pub detail: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingParams {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub theta_segments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SphereParams {
    pub radius: f64,
    pub width_segments: u32,
    pub height_segments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorusParams {
    pub radius: f64,
    pub tube: f64,
    pub radial_segments: u32,
    pub tubular_segments: u32,
    /// Central angle in radians
    pub arc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TubeParams {
    /// Ordered solid control points, local to the tube
    pub path: Vec<Vec3>,
    pub radius: f64,
    pub radial_segments: u32,
    pub tubular_segments: u32,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextParams {
    pub size: f64,
    pub height: f64,
    #[serde(default = "default_curve_segments")]
    pub curve_segments: u32,
    #[serde(default)]
    pub bevel_enabled: bool,
    #[serde(default = "default_bevel")]
    pub bevel_thickness: f64,
    #[serde(default = "default_bevel")]
    pub bevel_size: f64,
}

fn default_curve_segments() -> u32 {
    10
}

fn default_bevel() -> f64 {
    0.1
}

impl TextParams {
    pub fn new(size: f64, height: f64) -> Self {
        Self {
            size,
            height,
            curve_segments: default_curve_segments(),
            bevel_enabled: false,
            bevel_thickness: default_bevel(),
            bevel_size: default_bevel(),
        }
    }
}

/// Label style for a Marker sprite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerParams {
    #[serde(default = "default_fontface")]
    pub fontface: String,
    #[serde(default = "default_fontsize")]
    pub fontsize: f64,
    #[serde(default = "default_border_thickness")]
    pub border_thickness: f64,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_marker_color")]
    pub color: String,
    pub text: String,
}

fn default_fontface() -> String {
    "Arial".to_string()
}

fn default_fontsize() -> f64 {
    48.0
}

fn default_border_thickness() -> f64 {
    4.0
}

fn default_border_color() -> String {
    "rgba(0,0,0,0.7)".to_string()
}

fn default_background_color() -> String {
    "rgba(255,255,255,0.7)".to_string()
}

fn default_marker_color() -> String {
    "#000".to_string()
}

impl MarkerParams {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            fontface: default_fontface(),
            fontsize: default_fontsize(),
            border_thickness: default_border_thickness(),
            border_color: default_border_color(),
            background_color: default_background_color(),
            color: default_marker_color(),
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Materials and textures
// ---------------------------------------------------------------------------

/// Phong material state of a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialParams {
    pub color: String,
    #[serde(default = "default_bump_scale")]
    pub bump_scale: f64,
    #[serde(default = "default_shininess")]
    pub shininess: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_bump_scale() -> f64 {
    0.2
}

fn default_shininess() -> f64 {
    30.0
}

fn default_opacity() -> f64 {
    1.0
}

impl MaterialParams {
    pub fn with_color(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            bump_scale: default_bump_scale(),
            shininess: default_shininess(),
            opacity: default_opacity(),
        }
    }
}

/// Sprite material state; sprites only expose opacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteMaterial {
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for SpriteMaterial {
    fn default() -> Self {
        Self {
            opacity: default_opacity(),
        }
    }
}

/// Procedural texture binding of a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureBinding {
    #[serde(default)]
    pub texture_url: String,
    #[serde(default = "default_repeat")]
    pub texture_repeat_x: f64,
    #[serde(default = "default_repeat")]
    pub texture_repeat_y: f64,
}

fn default_repeat() -> f64 {
    3.0
}

impl Default for TextureBinding {
    fn default() -> Self {
        Self {
            texture_url: String::new(),
            texture_repeat_x: default_repeat(),
            texture_repeat_y: default_repeat(),
        }
    }
}

impl TextureBinding {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            texture_url: url.into(),
            ..Default::default()
        }
    }

    /// Repeat applied to the live texture. An empty URL disables the texture
    /// by forcing (0, 0); the stored repeat values are left alone.
    pub fn effective_repeat(&self) -> (f64, f64) {
        if self.texture_url.is_empty() {
            (0.0, 0.0)
        } else {
            (self.texture_repeat_x, self.texture_repeat_y)
        }
    }
}

// ---------------------------------------------------------------------------
// Per-type specs
// ---------------------------------------------------------------------------

/// Geometry, material and texture of a procedural mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshSpec<G> {
    pub geometry_params: G,
    pub material_params: MaterialParams,
    #[serde(flatten)]
    pub texture: TextureBinding,
}

impl<G> MeshSpec<G> {
    pub fn new(geometry_params: G, color: impl Into<String>) -> Self {
        Self {
            geometry_params,
            material_params: MaterialParams::with_color(color),
            texture: TextureBinding::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpec {
    pub text: String,
    pub geometry_params: TextParams,
    pub material_params: MaterialParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub marker_params: MarkerParams,
    #[serde(default)]
    pub material_params: SpriteMaterial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImgSpec {
    pub img_url: String,
    #[serde(default)]
    pub material_params: SpriteMaterial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgSpec {
    pub svg_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub model_name: String,
}

/// Type-specific content of a record, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectKind {
    Box(MeshSpec<BoxParams>),
    Cone(MeshSpec<ConeParams>),
    Cylinder(MeshSpec<CylinderParams>),
    Dodecahedron(MeshSpec<PolyhedronParams>),
    Icosahedron(MeshSpec<PolyhedronParams>),
    Octahedron(MeshSpec<PolyhedronParams>),
    Ring(MeshSpec<RingParams>),
    Sphere(MeshSpec<SphereParams>),
    Tetrahedron(MeshSpec<PolyhedronParams>),
    Torus(MeshSpec<TorusParams>),
    Tube(MeshSpec<TubeParams>),
    Text(TextSpec),
    Marker(MarkerSpec),
    Svg(SvgSpec),
    Img(ImgSpec),
    Model(ModelSpec),
}

/// Runs `$body` with `$spec` bound to the mesh spec of any procedural mesh
/// variant, or evaluates `$other` for the remaining variants.
macro_rules! with_mesh_spec {
    ($kind:expr, $spec:ident => $body:expr, _ => $other:expr) => {
        match $kind {
            ObjectKind::Box($spec) => $body,
            ObjectKind::Cone($spec) => $body,
            ObjectKind::Cylinder($spec) => $body,
            ObjectKind::Dodecahedron($spec) => $body,
            ObjectKind::Icosahedron($spec) => $body,
            ObjectKind::Octahedron($spec) => $body,
            ObjectKind::Ring($spec) => $body,
            ObjectKind::Sphere($spec) => $body,
            ObjectKind::Tetrahedron($spec) => $body,
            ObjectKind::Torus($spec) => $body,
            ObjectKind::Tube($spec) => $body,
            _ => $other,
        }
    };
}

impl ObjectKind {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectKind::Box(_) => ObjectType::Box,
            ObjectKind::Cone(_) => ObjectType::Cone,
            ObjectKind::Cylinder(_) => ObjectType::Cylinder,
            ObjectKind::Dodecahedron(_) => ObjectType::Dodecahedron,
            ObjectKind::Icosahedron(_) => ObjectType::Icosahedron,
            ObjectKind::Octahedron(_) => ObjectType::Octahedron,
            ObjectKind::Ring(_) => ObjectType::Ring,
            ObjectKind::Sphere(_) => ObjectType::Sphere,
            ObjectKind::Tetrahedron(_) => ObjectType::Tetrahedron,
            ObjectKind::Torus(_) => ObjectType::Torus,
            ObjectKind::Tube(_) => ObjectType::Tube,
            ObjectKind::Text(_) => ObjectType::Text,
            ObjectKind::Marker(_) => ObjectType::Marker,
            ObjectKind::Svg(_) => ObjectType::Svg,
            ObjectKind::Img(_) => ObjectType::Img,
            ObjectKind::Model(_) => ObjectType::Model,
        }
    }

    /// Phong material, present on procedural meshes and Text
    pub fn material(&self) -> Option<&MaterialParams> {
        match self {
            ObjectKind::Text(spec) => Some(&spec.material_params),
            other => with_mesh_spec!(other, spec => Some(&spec.material_params), _ => None),
        }
    }

    pub fn material_mut(&mut self) -> Option<&mut MaterialParams> {
        match self {
            ObjectKind::Text(spec) => Some(&mut spec.material_params),
            other => with_mesh_spec!(other, spec => Some(&mut spec.material_params), _ => None),
        }
    }

    /// Objects with a Phong-class material accept color and emissive changes
    pub fn is_phong(&self) -> bool {
        self.material().is_some()
    }

    pub fn texture(&self) -> Option<&TextureBinding> {
        with_mesh_spec!(self, spec => Some(&spec.texture), _ => None)
    }

    pub fn texture_mut(&mut self) -> Option<&mut TextureBinding> {
        with_mesh_spec!(self, spec => Some(&mut spec.texture), _ => None)
    }

    /// Opacity of any material-carrying object; `None` for group types
    pub fn opacity(&self) -> Option<f64> {
        match self {
            ObjectKind::Marker(spec) => Some(spec.material_params.opacity),
            ObjectKind::Img(spec) => Some(spec.material_params.opacity),
            other => other.material().map(|m| m.opacity),
        }
    }

    /// Set the opacity; a no-op for group types
    pub fn set_opacity(&mut self, opacity: f64) {
        match self {
            ObjectKind::Marker(spec) => spec.material_params.opacity = opacity,
            ObjectKind::Img(spec) => spec.material_params.opacity = opacity,
            other => {
                if let Some(material) = other.material_mut() {
                    material.opacity = opacity;
                }
            }
        }
    }

    /// Height for the base-anchored vertical primitives
    pub fn base_anchor_height(&self) -> Option<f64> {
        match self {
            ObjectKind::Box(spec) => Some(spec.geometry_params.height),
            ObjectKind::Cone(spec) => Some(spec.geometry_params.height),
            ObjectKind::Cylinder(spec) => Some(spec.geometry_params.height),
            _ => None,
        }
    }

    pub fn tube(&self) -> Option<&TubeParams> {
        match self {
            ObjectKind::Tube(spec) => Some(&spec.geometry_params),
            _ => None,
        }
    }

    pub fn tube_mut(&mut self) -> Option<&mut TubeParams> {
        match self {
            ObjectKind::Tube(spec) => Some(&mut spec.geometry_params),
            _ => None,
        }
    }

    /// Label or extruded text carried by Marker and Text
    pub fn text_value(&self) -> Option<&str> {
        match self {
            ObjectKind::Text(spec) => Some(&spec.text),
            ObjectKind::Marker(spec) => Some(&spec.marker_params.text),
            _ => None,
        }
    }

    /// URL or name of the external asset this object is built from
    pub fn asset_ref(&self) -> Option<&str> {
        match self {
            ObjectKind::Svg(spec) => Some(&spec.svg_url),
            ObjectKind::Img(spec) => Some(&spec.img_url),
            ObjectKind::Model(spec) => Some(&spec.model_name),
            _ => None,
        }
    }

    fn check_finite(&self) -> Result<(), RecordError> {
        if let Some(material) = self.material() {
            if !(material.opacity.is_finite()
                && material.bump_scale.is_finite()
                && material.shininess.is_finite())
            {
                return Err(RecordError::NonFinite("materialParams"));
            }
        }
        if let Some(tube) = self.tube() {
            if tube.path.len() < 2 {
                return Err(RecordError::TubeTooShort(tube.path.len()));
            }
            let finite = tube
                .path
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
            if !finite || !tube.radius.is_finite() {
                return Err(RecordError::NonFinite("geometryParams.path"));
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Persisted description of one placed object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObjectRecord {
    #[serde(flatten)]
    pub kind: ObjectKind,
    #[serde(flatten)]
    pub transform: Transform,
    #[serde(default = "default_true")]
    pub cast_shadow: bool,
    #[serde(default = "default_true")]
    pub receive_shadow: bool,
    /// Property name to raw template string
    #[serde(default)]
    pub bind: BTreeMap<BindProperty, String>,
}

impl SceneObjectRecord {
    /// A fresh record with no bindings. Meshes and Text cast and receive
    /// shadows; sprites and groups do not.
    pub fn new(kind: ObjectKind, transform: Transform) -> Self {
        let shadows = kind.material().is_some();
        Self {
            kind,
            transform,
            cast_shadow: shadows,
            receive_shadow: shadows,
            bind: BTreeMap::new(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }

    /// Check the invariants serde cannot express
    pub fn validate(&self) -> Result<(), RecordError> {
        let t = &self.transform;
        let finite = [t.position, t.rotation, t.scale]
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite());
        if !finite {
            return Err(RecordError::NonFinite("transform"));
        }
        self.kind.check_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_record() -> SceneObjectRecord {
        let kind = ObjectKind::Box(MeshSpec::new(
            BoxParams {
                width: 1.0,
                height: 2.0,
                depth: 1.0,
            },
            "#F00",
        ));
        SceneObjectRecord::new(kind, Transform::at(Vec3::new(0.0, 0.2, 0.0)))
    }

    #[test]
    fn test_record_json_shape() {
        let mut record = box_record();
        record
            .bind
            .insert(BindProperty::CanSelect, "{$sel}".to_string());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "Box");
        assert_eq!(json["geometryParams"]["height"], 2.0);
        assert_eq!(json["materialParams"]["bumpScale"], 0.2);
        assert_eq!(json["textureUrl"], "");
        assert_eq!(json["textureRepeatX"], 3.0);
        assert_eq!(json["position"]["y"], 0.2);
        assert_eq!(json["castShadow"], true);
        assert_eq!(json["bind"]["can_select"], "{$sel}");
    }

    #[test]
    fn test_record_parses_flat_json() {
        let json = r##"{
            "type": "Sphere",
            "geometryParams": {"radius": 2, "widthSegments": 16, "heightSegments": 16},
            "materialParams": {"color": "#00ff00", "bumpScale": 0.2, "shininess": 30, "opacity": 0.5},
            "textureUrl": "", "textureRepeatX": 3, "textureRepeatY": 3,
            "position": {"x": 1, "y": 2, "z": 3},
            "rotation": {"x": 0, "y": 0, "z": 0},
            "scale": {"x": 1, "y": 1, "z": 1},
            "castShadow": true, "receiveShadow": false,
            "bind": {"positionX": "{$x}"}
        }"##;

        let record: SceneObjectRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.object_type(), ObjectType::Sphere);
        assert_eq!(record.kind.opacity(), Some(0.5));
        assert_eq!(record.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(!record.receive_shadow);
        assert_eq!(record.bind[&BindProperty::PositionX], "{$x}");
    }

    #[test]
    fn test_unknown_bind_property_rejected() {
        let json = r#"{
            "type": "Svg", "svgUrl": "a.svg",
            "position": {"x": 0, "y": 0, "z": 0},
            "rotation": {"x": 0, "y": 0, "z": 0},
            "scale": {"x": 1, "y": 1, "z": 1},
            "bind": {"wobble": "{$w}"}
        }"#;
        assert!(serde_json::from_str::<SceneObjectRecord>(json).is_err());
    }

    #[test]
    fn test_group_types_have_no_material() {
        let mut model = ObjectKind::Model(ModelSpec {
            model_name: "3d.glb".to_string(),
        });
        assert!(model.material().is_none());
        assert!(model.opacity().is_none());
        assert!(!model.is_phong());

        // No-op rather than an error
        model.set_opacity(0.3);
        assert!(model.opacity().is_none());
    }

    #[test]
    fn test_empty_texture_url_disables_repeat() {
        let mut texture = TextureBinding::default();
        assert_eq!(texture.effective_repeat(), (0.0, 0.0));
        assert_eq!(texture.texture_repeat_x, 3.0);

        texture.texture_url = "wood.jpg".to_string();
        assert_eq!(texture.effective_repeat(), (3.0, 3.0));
    }

    #[test]
    fn test_bind_property_names() {
        for prop in BindProperty::ALL {
            let json = serde_json::to_string(&prop).unwrap();
            assert_eq!(json, format!("\"{}\"", prop.as_str()));
            assert_eq!(prop.as_str().parse::<BindProperty>().unwrap(), prop);
        }
        assert!("wobble".parse::<BindProperty>().is_err());
    }

    #[test]
    fn test_validate_rejects_short_tube() {
        let kind = ObjectKind::Tube(MeshSpec::new(
            TubeParams {
                path: vec![Vec3::ZERO],
                radius: 0.25,
                radial_segments: 32,
                tubular_segments: 10,
                closed: false,
            },
            "#FF0000",
        ));
        let record = SceneObjectRecord::new(kind, Transform::default());
        assert_eq!(record.validate(), Err(RecordError::TubeTooShort(1)));
    }

    #[test]
    fn test_base_anchor_height() {
        assert_eq!(box_record().kind.base_anchor_height(), Some(2.0));
        let marker = ObjectKind::Marker(MarkerSpec {
            marker_params: MarkerParams::new(" Hi "),
            material_params: SpriteMaterial::default(),
        });
        assert_eq!(marker.base_anchor_height(), None);
        assert_eq!(marker.text_value(), Some(" Hi "));
    }
}
