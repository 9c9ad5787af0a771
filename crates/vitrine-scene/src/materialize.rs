//! Record to live object and back
//!
//! `materialize` builds a [`SceneObject`] from a [`SceneObjectRecord`] and
//! `serialize` reads one back. For every record `r` that materializes,
//! `serialize(&materialize(id, r.clone(), asset)?) == r`.

use thiserror::Error;
use tracing::debug;
use vitrine_core::{ObjectKind, ObjectType, SceneObjectRecord, TubeEditor, TubeError, Vec3};

use crate::collab::{Asset, AssetKind};
use crate::object::{Geometry, ObjectId, SceneObject, EMISSIVE_NONE};

/// Font used for extruded text
pub const DEFAULT_FONT_URL: &str = "./3d_assets/font/helvetiker_regular.typeface.json";

/// Directory models are loaded from
pub const MODEL_PATH: &str = "./3d_assets/models/";

#[derive(Error, Debug, PartialEq)]
pub enum MaterializeError {
    #[error("{0} objects need a loaded {1} asset")]
    MissingAsset(ObjectType, AssetKind),
    #[error("Expected a {expected} asset, got {actual}")]
    WrongAsset { expected: AssetKind, actual: AssetKind },
    #[error("Tube error: {0}")]
    Tube(#[from] TubeError),
}

/// The asset a record needs before it can be materialized, if any
pub fn asset_request(record: &SceneObjectRecord) -> Option<(AssetKind, String)> {
    match &record.kind {
        ObjectKind::Text(_) => Some((AssetKind::Font, DEFAULT_FONT_URL.to_string())),
        ObjectKind::Svg(spec) => Some((AssetKind::Svg, spec.svg_url.clone())),
        ObjectKind::Model(spec) => Some((AssetKind::Model, format!("{}{}", MODEL_PATH, spec.model_name))),
        _ => None,
    }
}

fn take_asset(
    ty: ObjectType,
    expected: AssetKind,
    asset: Option<Asset>,
) -> Result<Asset, MaterializeError> {
    let asset = asset.ok_or(MaterializeError::MissingAsset(ty, expected))?;
    if asset.kind != expected {
        return Err(MaterializeError::WrongAsset {
            expected,
            actual: asset.kind,
        });
    }
    Ok(asset)
}

/// Build the live object for `record`.
///
/// Text, Svg and Model need the asset named by [`asset_request`]; every
/// other type ignores `asset`.
pub fn materialize(
    id: ObjectId,
    record: SceneObjectRecord,
    asset: Option<Asset>,
) -> Result<SceneObject, MaterializeError> {
    let ty = record.object_type();

    let mut tube = None;
    let geometry = match &record.kind {
        ObjectKind::Tube(spec) => {
            let editor = TubeEditor::from_params(&spec.geometry_params)?;
            let geometry = Geometry::Tube(editor.geometry());
            tube = Some(editor);
            geometry
        }
        ObjectKind::Text(_) => Geometry::Text {
            font: take_asset(ty, AssetKind::Font, asset)?,
        },
        ObjectKind::Marker(spec) => Geometry::Label {
            text: spec.marker_params.text.clone(),
        },
        ObjectKind::Img(spec) => Geometry::Image {
            url: spec.img_url.clone(),
        },
        ObjectKind::Svg(_) => Geometry::Group {
            asset: take_asset(ty, AssetKind::Svg, asset)?,
        },
        ObjectKind::Model(_) => Geometry::Group {
            asset: take_asset(ty, AssetKind::Model, asset)?,
        },
        kind => {
            let lift = kind.base_anchor_height().map_or(0.0, |h| h / 2.0);
            Geometry::Primitive {
                anchor_offset: Vec3::new(0.0, lift, 0.0),
            }
        }
    };

    let transparent = if ty.is_sprite() {
        true
    } else {
        record.kind.opacity().is_some_and(|o| o < 1.0)
    };
    let texture_repeat = record
        .kind
        .texture()
        .map_or((1.0, 1.0), |t| t.effective_repeat());

    let mut object = SceneObject {
        id,
        kind: record.kind,
        transform: record.transform,
        cast_shadow: record.cast_shadow,
        receive_shadow: record.receive_shadow,
        bind: Default::default(),
        name: String::new(),
        visible: true,
        can_select: true,
        emissive: EMISSIVE_NONE,
        transparent,
        texture_repeat,
        geometry,
        bindings: Default::default(),
        tube,
        revision: 0,
    };
    object.set_bind(record.bind);

    debug!(id = %id, object_type = %ty, "Materialized object");
    Ok(object)
}

/// Read the persisted record back out of a live object
pub fn serialize(object: &SceneObject) -> SceneObjectRecord {
    let mut kind = object.kind.clone();
    if let (Some(editor), Some(params)) = (&object.tube, kind.tube_mut()) {
        if editor.path() != params.path {
            *params = editor.to_params();
        }
    }

    SceneObjectRecord {
        kind,
        transform: object.transform,
        cast_shadow: object.cast_shadow,
        receive_shadow: object.receive_shadow,
        bind: object.bind.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::AssetHandle;
    use vitrine_core::{create_record, default_input, BindProperty, PointIndex};

    fn asset_for(record: &SceneObjectRecord) -> Option<Asset> {
        asset_request(record).map(|(kind, url)| Asset {
            kind,
            handle: AssetHandle(url.clone()),
            url,
        })
    }

    #[test]
    fn test_round_trip_every_type() {
        for ty in ObjectType::ALL {
            let mut record = create_record(ty, default_input(ty), Vec3::new(1.0, 2.0, 3.0)).unwrap();
            record.transform.rotation = Vec3::new(0.1, 0.2, 0.3);
            record.transform.scale = Vec3::new(1.0, 2.0, 0.5);
            record.cast_shadow = false;
            record
                .bind
                .insert(BindProperty::PositionY, "{$level}".to_string());

            let asset = asset_for(&record);
            let object = materialize(ObjectId(1), record.clone(), asset).unwrap();
            assert_eq!(serialize(&object), record, "{} did not round-trip", ty);
        }
    }

    #[test]
    fn test_async_types_need_assets() {
        let record = create_record(ObjectType::Text, "3,1,#FF0000|hi", Vec3::ZERO).unwrap();
        assert_eq!(
            materialize(ObjectId(1), record, None),
            Err(MaterializeError::MissingAsset(ObjectType::Text, AssetKind::Font))
        );

        let record = create_record(ObjectType::Model, "pump.glb", Vec3::ZERO).unwrap();
        assert_eq!(
            asset_request(&record),
            Some((AssetKind::Model, "./3d_assets/models/pump.glb".to_string()))
        );
    }

    #[test]
    fn test_live_material_state() {
        let mut record = create_record(ObjectType::Box, "1,4,1", Vec3::ZERO).unwrap();
        record.kind.set_opacity(0.5);
        let object = materialize(ObjectId(1), record, None).unwrap();
        assert!(object.transparent);
        assert_eq!(
            object.geometry,
            Geometry::Primitive {
                anchor_offset: Vec3::new(0.0, 2.0, 0.0)
            }
        );
        // No texture URL means an effective repeat of zero
        assert_eq!(object.texture_repeat, (0.0, 0.0));

        let record = create_record(ObjectType::Marker, default_input(ObjectType::Marker), Vec3::ZERO).unwrap();
        let object = materialize(ObjectId(2), record, None).unwrap();
        assert!(object.transparent);
    }

    #[test]
    fn test_tube_serializes_edited_path() {
        let record = create_record(ObjectType::Tube, default_input(ObjectType::Tube), Vec3::ZERO).unwrap();
        let mut object = materialize(ObjectId(1), record, None).unwrap();

        let editor = object.tube.as_mut().unwrap();
        editor
            .move_point(PointIndex::dotted_before(1), Vec3::new(0.0, 5.0, 0.0))
            .unwrap();

        let saved = serialize(&object);
        let params = saved.kind.tube().unwrap();
        assert_eq!(params.path.len(), 3);
        assert_eq!(params.path[1], Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(params.tubular_segments, 30);
    }
}
