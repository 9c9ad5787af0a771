//! Vitrine Core - Scene documents, template bindings, and tube editing
//!
//! This crate provides the data model shared by the editor and the viewer:
//! - Scene object records and the saved scene document
//! - `{$key}` template bindings resolved against live data snapshots
//! - Catmull-Rom tube curves and the control-point editor
//! - Parsing of new-object input
//! - A file-backed store of named document slots

pub mod creation;
pub mod curve;
pub mod document;
pub mod record;
pub mod store;
pub mod template;
pub mod transform;
pub mod tube;

pub use creation::{create_record, default_input, CreateError};
pub use curve::{CatmullRomCurve, CurveKind};
pub use document::{BaseSettings, DocumentError, Fog, SceneDocument};
pub use record::{BindProperty, ObjectKind, ObjectType, RecordError, SceneObjectRecord};
pub use store::{sha256_hex, SlotStore, StoreError, DEFAULT_SLOT, EXPORT_FILE_NAME};
pub use template::{BindingSet, Snapshot, Template};
pub use transform::{deg_to_rad, rad_to_deg, Transform, Vec3};
pub use tube::{PointIndex, PointKind, TubeBox, TubeEditor, TubeError, TubeGeometry};
