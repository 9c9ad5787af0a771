//! New-object input parsing
//!
//! The editor asks for a short text when an object is added, e.g. `1,1,1`
//! for a box or `36,#ff0000|Hello` for a marker. Comma-separated fields are
//! numbers unless they start with `#`, in which case they are colors. Anything
//! malformed is rejected and no object is created.

use thiserror::Error;

use crate::curve::segments_for;
use crate::record::{
    BoxParams, ConeParams, CylinderParams, ImgSpec, MarkerParams, MarkerSpec, MeshSpec,
    ModelSpec, ObjectKind, ObjectType, PolyhedronParams, RingParams, SceneObjectRecord,
    SphereParams, SpriteMaterial, SvgSpec, TextParams, TextSpec, TorusParams, TubeParams,
    MaterialParams,
};
use crate::transform::{deg_to_rad, Transform, Vec3};

/// Color of new procedural meshes
pub const DEFAULT_MESH_COLOR: &str = "#F00";

const DEFAULT_TEXT_COLOR: &str = "#FF0000";

#[derive(Error, Debug, PartialEq)]
pub enum CreateError {
    #[error("Empty input")]
    Empty,
    #[error("Expected {expected} fields, got {got}")]
    MissingField { expected: usize, got: usize },
    #[error("Not a number: {0}")]
    NotANumber(String),
    #[error("Not a count: {0}")]
    NotACount(String),
    #[error("Expected a color, got {0}")]
    NotAColor(String),
    #[error("Missing '|text' part")]
    MissingText,
}

/// One comma-separated field
#[derive(Debug, Clone, PartialEq)]
enum Field {
    Number(f64),
    Color(String),
}

fn parse_fields(input: &str) -> Result<Vec<Field>, CreateError> {
    input
        .split(',')
        .map(|raw| {
            let raw = raw.trim();
            if raw.starts_with('#') {
                Ok(Field::Color(raw.to_string()))
            } else {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Field::Number)
                    .ok_or_else(|| CreateError::NotANumber(raw.to_string()))
            }
        })
        .collect()
}

struct Fields(Vec<Field>);

impl Fields {
    fn parse(input: &str, expected: usize) -> Result<Self, CreateError> {
        let fields = parse_fields(input)?;
        if fields.len() < expected {
            return Err(CreateError::MissingField {
                expected,
                got: fields.len(),
            });
        }
        Ok(Self(fields))
    }

    fn number(&self, i: usize) -> Result<f64, CreateError> {
        match &self.0[i] {
            Field::Number(v) => Ok(*v),
            Field::Color(c) => Err(CreateError::NotANumber(c.clone())),
        }
    }

    fn count(&self, i: usize) -> Result<u32, CreateError> {
        let v = self.number(i)?;
        if v < 0.0 || v > u32::MAX as f64 {
            return Err(CreateError::NotACount(v.to_string()));
        }
        Ok(v.floor() as u32)
    }

    /// A color field, or `default` when the field is absent
    fn color_or(&self, i: usize, default: &str) -> Result<String, CreateError> {
        match self.0.get(i) {
            None => Ok(default.to_string()),
            Some(Field::Color(c)) => Ok(c.clone()),
            Some(Field::Number(v)) => Err(CreateError::NotAColor(v.to_string())),
        }
    }
}

/// Split `numbers|text` inputs
fn split_text(input: &str) -> Result<(&str, &str), CreateError> {
    if input.len() < 2 {
        return Err(CreateError::Empty);
    }
    input.split_once('|').ok_or(CreateError::MissingText)
}

/// The input offered for each type when the editor asks for one
pub fn default_input(ty: ObjectType) -> &'static str {
    match ty {
        ObjectType::Box => "1,1,1",
        ObjectType::Cone => "1,1,32",
        ObjectType::Cylinder => "1,1,3,32",
        ObjectType::Dodecahedron => "1,2",
        ObjectType::Icosahedron => "1,0",
        ObjectType::Octahedron => "1,0",
        ObjectType::Ring => "1,2,32",
        ObjectType::Sphere => "2,16,16",
        ObjectType::Tetrahedron => "2,0",
        ObjectType::Torus => "5,1,32,32,360",
        ObjectType::Tube => "0.25,32,#FF0000",
        ObjectType::Text => "3,1,#ff0000|Hello",
        ObjectType::Marker => "36,#ff0000|Hello",
        ObjectType::Svg => "./3d_assets/models/svg/threejs.svg",
        ObjectType::Img => "./3d_assets/models/png/test.png",
        ObjectType::Model => "3d.glb",
    }
}

fn mesh<G>(params: G) -> MeshSpec<G> {
    MeshSpec::new(params, DEFAULT_MESH_COLOR)
}

fn polyhedron(input: &str) -> Result<PolyhedronParams, CreateError> {
    let f = Fields::parse(input, 2)?;
    Ok(PolyhedronParams {
        radius: f.number(0)?,
        detail: f.count(1)?,
    })
}

fn non_empty(input: &str) -> Result<String, CreateError> {
    let input = input.trim();
    if input.is_empty() {
        Err(CreateError::Empty)
    } else {
        Ok(input.to_string())
    }
}

/// Parse the creation input for `ty` into object content
pub fn parse_kind(ty: ObjectType, input: &str) -> Result<ObjectKind, CreateError> {
    let kind = match ty {
        ObjectType::Box => {
            let f = Fields::parse(input, 3)?;
            ObjectKind::Box(mesh(BoxParams {
                width: f.number(0)?,
                height: f.number(1)?,
                depth: f.number(2)?,
            }))
        }
        ObjectType::Cone => {
            let f = Fields::parse(input, 3)?;
            ObjectKind::Cone(mesh(ConeParams {
                radius: f.number(0)?,
                height: f.number(1)?,
                radial_segments: f.count(2)?,
            }))
        }
        ObjectType::Cylinder => {
            let f = Fields::parse(input, 4)?;
            ObjectKind::Cylinder(mesh(CylinderParams {
                radius_top: f.number(0)?,
                radius_bottom: f.number(1)?,
                height: f.number(2)?,
                radial_segments: f.count(3)?,
            }))
        }
        ObjectType::Dodecahedron => ObjectKind::Dodecahedron(mesh(polyhedron(input)?)),
        ObjectType::Icosahedron => ObjectKind::Icosahedron(mesh(polyhedron(input)?)),
        ObjectType::Octahedron => ObjectKind::Octahedron(mesh(polyhedron(input)?)),
        ObjectType::Tetrahedron => ObjectKind::Tetrahedron(mesh(polyhedron(input)?)),
        ObjectType::Ring => {
            let f = Fields::parse(input, 3)?;
            ObjectKind::Ring(mesh(RingParams {
                inner_radius: f.number(0)?,
                outer_radius: f.number(1)?,
                theta_segments: f.count(2)?,
            }))
        }
        ObjectType::Sphere => {
            let f = Fields::parse(input, 3)?;
            ObjectKind::Sphere(mesh(SphereParams {
                radius: f.number(0)?,
                width_segments: f.count(1)?,
                height_segments: f.count(2)?,
            }))
        }
        ObjectType::Torus => {
            let f = Fields::parse(input, 5)?;
            ObjectKind::Torus(mesh(TorusParams {
                radius: f.number(0)?,
                tube: f.number(1)?,
                radial_segments: f.count(2)?,
                tubular_segments: f.count(3)?,
                arc: deg_to_rad(f.number(4)?),
            }))
        }
        ObjectType::Tube => {
            let f = Fields::parse(input, 2)?;
            let path = vec![Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)];
            let radius = f.number(0)?;
            let radial_segments = f.count(1)?;
            let params = TubeParams {
                tubular_segments: segments_for(path.len()),
                path,
                radius: if radius == 0.0 { 0.5 } else { radius },
                radial_segments: if radial_segments == 0 { 32 } else { radial_segments },
                closed: false,
            };
            ObjectKind::Tube(MeshSpec::new(params, f.color_or(2, DEFAULT_TEXT_COLOR)?))
        }
        ObjectType::Text => {
            let (numbers, text) = split_text(input)?;
            let f = Fields::parse(numbers, 2)?;
            let size = f.number(0)?;
            let height = f.number(1)?;
            ObjectKind::Text(TextSpec {
                text: text.to_string(),
                geometry_params: TextParams::new(
                    if size == 0.0 { 3.0 } else { size },
                    if height == 0.0 { 1.0 } else { height },
                ),
                material_params: MaterialParams::with_color(f.color_or(2, DEFAULT_TEXT_COLOR)?),
            })
        }
        ObjectType::Marker => {
            let (numbers, text) = split_text(input)?;
            let f = Fields::parse(numbers, 2)?;
            let mut params = MarkerParams::new(format!(" {} ", text));
            params.fontsize = f.number(0)?;
            params.color = f.color_or(1, &params.color)?;
            ObjectKind::Marker(MarkerSpec {
                marker_params: params,
                material_params: SpriteMaterial::default(),
            })
        }
        ObjectType::Svg => ObjectKind::Svg(SvgSpec {
            svg_url: non_empty(input)?,
        }),
        ObjectType::Img => ObjectKind::Img(ImgSpec {
            img_url: non_empty(input)?,
            material_params: SpriteMaterial::default(),
        }),
        ObjectType::Model => ObjectKind::Model(ModelSpec {
            model_name: non_empty(input)?,
        }),
    };
    Ok(kind)
}

/// Where a new object of type `ty` is placed, given the camera target
pub fn initial_transform(ty: ObjectType, target: Vec3) -> Transform {
    match ty {
        ObjectType::Tube => Transform::at(Vec3::new(0.0, 20.0, 0.0)),
        ObjectType::Svg => Transform {
            position: Vec3::new(0.0, 30.0, 0.0),
            scale: Vec3::new(1.0, -1.0, 1.0),
            ..Default::default()
        },
        ObjectType::Model => Transform {
            position: target,
            scale: Vec3::splat(50.0),
            ..Default::default()
        },
        _ => Transform::at(target),
    }
}

/// Build a fresh record from creation input
pub fn create_record(
    ty: ObjectType,
    input: &str,
    target: Vec3,
) -> Result<SceneObjectRecord, CreateError> {
    let kind = parse_kind(ty, input)?;
    Ok(SceneObjectRecord::new(kind, initial_transform(ty, target)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_default_input_parses() {
        for ty in ObjectType::ALL {
            let record = create_record(ty, default_input(ty), Vec3::ZERO).unwrap();
            assert_eq!(record.object_type(), ty);
            assert!(record.bind.is_empty());
            record.validate().unwrap();
        }
    }

    #[test]
    fn test_torus_arc_in_radians() {
        let kind = parse_kind(ObjectType::Torus, "5,1,32,32,180").unwrap();
        match kind {
            ObjectKind::Torus(spec) => {
                assert!((spec.geometry_params.arc - std::f64::consts::PI).abs() < 1e-12)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_marker_text_is_padded() {
        let kind = parse_kind(ObjectType::Marker, "36,#ff0000|Hello").unwrap();
        let ObjectKind::Marker(spec) = kind else {
            panic!("not a marker");
        };
        assert_eq!(spec.marker_params.text, " Hello ");
        assert_eq!(spec.marker_params.fontsize, 36.0);
        assert_eq!(spec.marker_params.color, "#ff0000");
        assert_eq!(spec.marker_params.fontface, "Arial");
    }

    #[test]
    fn test_tube_defaults() {
        let record = create_record(ObjectType::Tube, "0.25,32,#FF0000", Vec3::ZERO).unwrap();
        assert_eq!(record.transform.position, Vec3::new(0.0, 20.0, 0.0));
        let tube = record.kind.tube().unwrap();
        assert_eq!(tube.path.len(), 2);
        assert_eq!(tube.tubular_segments, 20);
        assert_eq!(record.kind.material().unwrap().color, "#FF0000");
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert_eq!(
            parse_kind(ObjectType::Box, "1,1"),
            Err(CreateError::MissingField { expected: 3, got: 2 })
        );
        assert_eq!(
            parse_kind(ObjectType::Box, "1,x,1"),
            Err(CreateError::NotANumber("x".to_string()))
        );
        assert_eq!(
            parse_kind(ObjectType::Sphere, "2,-16,16"),
            Err(CreateError::NotACount("-16".to_string()))
        );
        assert_eq!(parse_kind(ObjectType::Text, "3,1,#fff"), Err(CreateError::MissingText));
        assert_eq!(parse_kind(ObjectType::Marker, "1"), Err(CreateError::Empty));
        assert_eq!(parse_kind(ObjectType::Model, "  "), Err(CreateError::Empty));
    }

    #[test]
    fn test_new_objects_placed_at_target() {
        let target = Vec3::new(3.0, 0.0, -2.0);
        let record = create_record(ObjectType::Box, "1,1,1", target).unwrap();
        assert_eq!(record.transform.position, target);

        let model = create_record(ObjectType::Model, "3d.glb", target).unwrap();
        assert_eq!(model.transform.scale, Vec3::splat(50.0));
        assert!(!model.cast_shadow);
    }
}
