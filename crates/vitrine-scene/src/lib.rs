//! Vitrine Scene - Live scene sessions for the editor and the viewer
//!
//! This crate keeps the live mirror of a scene document and everything that
//! acts on it:
//! - Materializing records into live objects and serializing them back
//! - Epoch-guarded async document loading
//! - Selection with highlight, property panel and gizmo round trips
//! - Applying live data snapshots through template bindings
//!
//! Rendering, picking, asset parsing and UI widgets are collaborators behind
//! the traits in [`collab`].

pub mod binding;
pub mod camera;
pub mod collab;
pub mod editor;
pub mod loader;
pub mod materialize;
pub mod object;
pub mod scene;
pub mod selection;
pub mod viewer;

#[cfg(test)]
mod test_support;

pub use binding::{apply_snapshot, BindingReport};
pub use camera::{Camera, CameraTween};
pub use collab::{
    Animator, Asset, AssetError, AssetHandle, AssetKind, AssetLoader, PanelChange, PanelField,
    PanelValue, PickHit, Picker, PropertyPanel, Renderer, SelectionTarget, TransformGizmo,
};
pub use editor::{AddOutcome, Command, EditorError, EditorSession};
pub use loader::{load_document, LoadReport, SceneHost};
pub use materialize::{materialize, serialize, MaterializeError};
pub use object::{Geometry, ObjectId, SceneObject};
pub use scene::{LoadEpoch, PendingAsset, Scene};
pub use selection::{HighlightStyle, SelectOutcome, SelectionController};
pub use viewer::ViewerSession;
