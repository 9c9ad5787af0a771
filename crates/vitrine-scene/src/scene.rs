//! The live scene graph
//!
//! A [`Scene`] owns the top-level, type-tagged objects in insertion order,
//! the untagged helpers (lights, grid, axes, outline box) that are never
//! saved, the global settings and the camera.
//!
//! Loading a document is split in two so that the async part can live in
//! [`crate::loader`]: [`Scene::begin_load`] clears the scene, materializes
//! every record that needs no asset and hands back the pending asset loads;
//! each load result is fed to [`Scene::complete_asset`]. Every pending load
//! carries the [`LoadEpoch`] it was started under, and completions from an
//! older epoch are dropped.

use std::fmt;
use tracing::{debug, info, warn};
use vitrine_core::{BaseSettings, SceneDocument, SceneObjectRecord, Transform, Vec3};

use crate::camera::Camera;
use crate::collab::{Asset, AssetError, AssetKind, SelectionTarget};
use crate::materialize::{asset_request, materialize, serialize, MaterializeError};
use crate::object::{ObjectId, SceneObject};

/// Generation counter for document loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LoadEpoch(u64);

impl LoadEpoch {
    fn next(self) -> Self {
        LoadEpoch(self.0 + 1)
    }
}

impl fmt::Display for LoadEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Untagged scene content
#[derive(Debug, Clone, PartialEq)]
pub enum Helper {
    Skybox { faces: Vec<String> },
    Axes { size: f64 },
    Grid { size: f64, divisions: u32 },
    AmbientLight { color: u32 },
    DirectionalLight { color: u32, position: Vec3, cast_shadow: bool },
    PointLight { color: u32, intensity: f64, position: Vec3 },
}

impl Helper {
    /// Lights shared by the editor and the viewer
    pub fn default_lights() -> Vec<Helper> {
        vec![
            Helper::AmbientLight { color: 0x404040 },
            Helper::DirectionalLight {
                color: 0xffffff,
                position: Vec3::new(0.0, 50.0, 50.0),
                cast_shadow: true,
            },
            Helper::PointLight {
                color: 0xffffff,
                intensity: 0.3,
                position: Vec3::new(0.0, 50.0, -50.0),
            },
        ]
    }

    /// Editing aids: skybox, axes and ground grid
    pub fn editor_aids() -> Vec<Helper> {
        let faces = ["RT", "LF", "UP", "DN", "BK", "FR"]
            .iter()
            .map(|side| format!("./3d_assets/img/skybox_{}_s.jpg", side))
            .collect();
        vec![
            Helper::Skybox { faces },
            Helper::Axes { size: 50.0 },
            Helper::Grid {
                size: 100.0,
                divisions: 100,
            },
        ]
    }
}

/// Wireframe box drawn around the viewer's selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub visible: bool,
    /// Object whose geometry the outline traces; `None` draws a unit box
    pub source: Option<ObjectId>,
    pub transform: Transform,
}

/// An asset load started for a record
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAsset {
    pub epoch: LoadEpoch,
    pub kind: AssetKind,
    pub url: String,
    pub record: SceneObjectRecord,
    /// Part of a document load, as opposed to a single interactive add
    pub counts_toward_ready: bool,
}

/// What `begin_load` did and what is left to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub epoch: LoadEpoch,
    /// Objects materialized synchronously, in document order
    pub loaded: Vec<ObjectId>,
    pub pending: Vec<PendingAsset>,
    /// The document was fully settled without any async load
    pub ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Started under an older epoch; discarded
    Stale,
    Added(ObjectId),
    /// Load or materialization failed; logged and settled
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub outcome: CompletionOutcome,
    /// This completion settled the last outstanding record
    pub became_ready: bool,
}

#[derive(Debug, Clone)]
struct LoadState {
    epoch: LoadEpoch,
    expected: usize,
    settled: usize,
    ready: bool,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            epoch: LoadEpoch::default(),
            expected: 0,
            settled: 0,
            ready: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<SceneObject>,
    helpers: Vec<Helper>,
    pub outline: Outline,
    pub settings: BaseSettings,
    pub camera: Camera,
    next_id: u64,
    load: LoadState,
    base_font: Option<Asset>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Helper::default_lights())
    }
}

impl Scene {
    pub fn new(helpers: Vec<Helper>) -> Self {
        let settings = BaseSettings::default();
        let camera = Camera {
            auto_rotate: settings.auto_rotate,
            ..Default::default()
        };
        Self {
            objects: Vec::new(),
            helpers,
            outline: Outline::default(),
            settings,
            camera,
            next_id: 1,
            load: LoadState::default(),
            base_font: None,
        }
    }

    pub fn helpers(&self) -> &[Helper] {
        &self.helpers
    }

    /// Apply global settings; auto-rotate takes effect immediately
    pub fn apply_settings(&mut self, settings: BaseSettings) {
        self.camera.auto_rotate = settings.auto_rotate;
        self.settings = settings;
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    fn alloc_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Materialize a record and append it to the scene
    pub fn add_record(
        &mut self,
        record: SceneObjectRecord,
        asset: Option<Asset>,
    ) -> Result<ObjectId, MaterializeError> {
        let id = self.alloc_id();
        let object = materialize(id, record, asset)?;
        self.objects.push(object);
        Ok(id)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let pos = self.objects.iter().position(|o| o.id == id)?;
        if self.outline.source == Some(id) {
            self.outline = Outline::default();
        }
        Some(self.objects.remove(pos))
    }

    /// Remove every type-tagged object. In-flight loads become stale.
    pub fn clear(&mut self) {
        let removed = self.objects.len();
        self.objects.clear();
        self.outline = Outline::default();
        self.load = LoadState {
            epoch: self.load.epoch.next(),
            ..Default::default()
        };
        debug!(removed, epoch = %self.load.epoch, "Cleared scene");
    }

    /// Snapshot every top-level object, in scene order
    pub fn save(&self) -> SceneDocument {
        SceneDocument::new(
            self.settings.clone(),
            self.objects.iter().map(serialize).collect(),
        )
    }

    pub fn epoch(&self) -> LoadEpoch {
        self.load.epoch
    }

    /// Every record of the last load has been settled
    pub fn is_ready(&self) -> bool {
        self.load.ready
    }

    /// The first font loaded in this session, used to rebuild text
    pub fn base_font(&self) -> Option<&Asset> {
        self.base_font.as_ref()
    }

    /// Start loading `doc`: clear, apply settings, materialize what needs
    /// no asset and return the rest as pending loads.
    pub fn begin_load(&mut self, doc: &SceneDocument) -> LoadPlan {
        self.clear();
        self.apply_settings(doc.base.clone());
        self.load.expected = doc.list.len();
        self.load.ready = false;

        let mut loaded = Vec::new();
        let mut pending = Vec::new();
        for (index, record) in doc.list.iter().enumerate() {
            if let Some((kind, url)) = asset_request(record) {
                pending.push(PendingAsset {
                    epoch: self.load.epoch,
                    kind,
                    url,
                    record: record.clone(),
                    counts_toward_ready: true,
                });
                continue;
            }

            match self.add_record(record.clone(), None) {
                Ok(id) => loaded.push(id),
                Err(e) => warn!(index, error = %e, "Skipping record"),
            }
            self.load.settled += 1;
        }

        let ready = self.settle();
        info!(
            epoch = %self.load.epoch,
            objects = doc.list.len(),
            pending = pending.len(),
            "Loading scene"
        );

        LoadPlan {
            epoch: self.load.epoch,
            loaded,
            pending,
            ready,
        }
    }

    /// Mark the load ready once every record has settled. Returns whether
    /// this call made it ready.
    fn settle(&mut self) -> bool {
        if !self.load.ready && self.load.settled >= self.load.expected {
            self.load.ready = true;
            info!(epoch = %self.load.epoch, objects = self.objects.len(), "Scene ready");
            return true;
        }
        false
    }

    /// A load for a single new object, outside of any document load
    pub fn pending_for(&self, record: SceneObjectRecord) -> Option<PendingAsset> {
        let (kind, url) = asset_request(&record)?;
        Some(PendingAsset {
            epoch: self.load.epoch,
            kind,
            url,
            record,
            counts_toward_ready: false,
        })
    }

    /// Feed the result of a pending load back into the scene
    pub fn complete_asset(
        &mut self,
        pending: PendingAsset,
        result: Result<Asset, AssetError>,
    ) -> Completion {
        if pending.epoch != self.load.epoch {
            debug!(
                url = %pending.url,
                started = %pending.epoch,
                current = %self.load.epoch,
                "Discarding stale asset load"
            );
            return Completion {
                outcome: CompletionOutcome::Stale,
                became_ready: false,
            };
        }

        let outcome = match result {
            Ok(asset) => {
                if asset.kind == AssetKind::Font && self.base_font.is_none() {
                    self.base_font = Some(asset.clone());
                }
                match self.add_record(pending.record, Some(asset)) {
                    Ok(id) => CompletionOutcome::Added(id),
                    Err(e) => {
                        warn!(url = %pending.url, error = %e, "Failed to build loaded object");
                        CompletionOutcome::Failed
                    }
                }
            }
            Err(e) => {
                warn!(url = %pending.url, kind = %pending.kind, error = %e, "Asset load failed");
                CompletionOutcome::Failed
            }
        };

        let mut became_ready = false;
        if pending.counts_toward_ready {
            self.load.settled += 1;
            became_ready = self.settle();
        }

        Completion {
            outcome,
            became_ready,
        }
    }

    /// Every template key referenced by any object, flattened
    pub fn bind_key_all(&self) -> Vec<String> {
        self.objects
            .iter()
            .flat_map(|o| o.bind_keys().iter().cloned())
            .collect()
    }

    /// World position of a selection target
    pub fn world_position(&self, target: SelectionTarget) -> Option<Vec3> {
        match target {
            SelectionTarget::Object(id) => self.get(id).map(|o| o.transform.position),
            SelectionTarget::TubePoint { tube, index } => {
                let object = self.get(tube)?;
                let point = object.tube.as_ref()?.get(index)?;
                Some(object.transform.position + point.position)
            }
        }
    }
}
