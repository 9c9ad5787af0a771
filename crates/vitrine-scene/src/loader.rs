//! Async document loading
//!
//! Asset fetches run as tokio tasks in a `JoinSet`; results are applied to
//! the scene in completion order under the host lock. A load that was
//! overtaken by a newer one stops at its first stale completion.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};
use vitrine_core::SceneDocument;

use crate::collab::{AssetError, AssetLoader};
use crate::object::ObjectId;
use crate::scene::{CompletionOutcome, LoadEpoch, Scene};

/// Owner of a scene that documents are loaded into
pub trait SceneHost: Send {
    fn scene(&self) -> &Scene;
    fn scene_mut(&mut self) -> &mut Scene;

    /// Called before the scene is cleared
    fn before_load(&mut self) {}

    /// Called for every object the load adds
    fn object_loaded(&mut self, _id: ObjectId) {}
}

impl SceneHost for Scene {
    fn scene(&self) -> &Scene {
        self
    }

    fn scene_mut(&mut self) -> &mut Scene {
        self
    }
}

/// Summary of a finished `load_document`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub epoch: LoadEpoch,
    pub added: usize,
    pub failed: usize,
    /// A newer load took over before this one finished
    pub superseded: bool,
    pub ready: bool,
}

/// Load `doc` into the host's scene.
///
/// `on_ready` runs exactly once, when every record has been settled (added
/// or failed). It never runs for a load that was superseded.
pub async fn load_document<H, L, F>(
    host: Arc<Mutex<H>>,
    loader: Arc<L>,
    doc: SceneDocument,
    on_ready: F,
) -> LoadReport
where
    H: SceneHost + 'static,
    L: AssetLoader + 'static,
    F: FnOnce() + Send,
{
    let mut on_ready = Some(on_ready);
    let mut fire = || {
        if let Some(callback) = on_ready.take() {
            callback();
        }
    };

    let plan = {
        let mut host = host.lock().await;
        host.before_load();
        let plan = host.scene_mut().begin_load(&doc);
        for id in &plan.loaded {
            host.object_loaded(*id);
        }
        plan
    };

    let mut report = LoadReport {
        epoch: plan.epoch,
        added: plan.loaded.len(),
        failed: doc.len() - plan.loaded.len() - plan.pending.len(),
        superseded: false,
        ready: plan.ready,
    };
    if plan.ready {
        fire();
    }

    let mut tasks = JoinSet::new();
    let mut in_flight = HashMap::new();
    for pending in plan.pending {
        let loader = loader.clone();
        let kind = pending.kind;
        let url = pending.url.clone();
        let handle = tasks.spawn(async move { loader.load(kind, &url).await });
        in_flight.insert(handle.id(), pending);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        let (task_id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(e) => (e.id(), Err(AssetError::Task(e.to_string()))),
        };
        let Some(pending) = in_flight.remove(&task_id) else {
            continue;
        };

        let completion = {
            let mut host = host.lock().await;
            let completion = host.scene_mut().complete_asset(pending, result);
            if let CompletionOutcome::Added(id) = completion.outcome {
                host.object_loaded(id);
            }
            completion
        };

        match completion.outcome {
            CompletionOutcome::Stale => {
                debug!(epoch = %report.epoch, remaining = tasks.len(), "Load superseded");
                tasks.abort_all();
                report.superseded = true;
                return report;
            }
            CompletionOutcome::Added(_) => report.added += 1,
            CompletionOutcome::Failed => report.failed += 1,
        }

        if completion.became_ready {
            report.ready = true;
            fire();
        }
    }

    info!(
        epoch = %report.epoch,
        added = report.added,
        failed = report.failed,
        "Scene load finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{Asset, AssetHandle, AssetKind};
    use std::collections::HashSet;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use vitrine_core::{create_record, BaseSettings, ObjectKind, ObjectType, Vec3};

    #[derive(Default)]
    struct MockLoader {
        delays: HashMap<String, u64>,
        failing: HashSet<String>,
    }

    impl AssetLoader for MockLoader {
        fn load(
            &self,
            kind: AssetKind,
            url: &str,
        ) -> impl Future<Output = Result<Asset, AssetError>> + Send {
            let delay = self.delays.get(url).copied().unwrap_or(1);
            let fail = self.failing.contains(url);
            let url = url.to_string();
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if fail {
                    return Err(AssetError::NotFound(url));
                }
                Ok(Asset {
                    kind,
                    handle: AssetHandle(url.clone()),
                    url,
                })
            }
        }
    }

    fn svg(url: &str) -> vitrine_core::SceneObjectRecord {
        create_record(ObjectType::Svg, url, Vec3::ZERO).unwrap()
    }

    fn boxed() -> vitrine_core::SceneObjectRecord {
        create_record(ObjectType::Box, "1,1,1", Vec3::ZERO).unwrap()
    }

    fn svg_urls(scene: &Scene) -> Vec<String> {
        scene
            .objects()
            .iter()
            .filter_map(|o| match &o.kind {
                ObjectKind::Svg(spec) => Some(spec.svg_url.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_and_single_ready() {
        let loader = MockLoader {
            delays: HashMap::from([("a.svg".to_string(), 30), ("b.svg".to_string(), 10)]),
            ..Default::default()
        };
        let host = Arc::new(Mutex::new(Scene::default()));
        let doc = SceneDocument::new(
            BaseSettings::default(),
            vec![svg("a.svg"), boxed(), svg("b.svg")],
        );

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let report = load_document(host.clone(), Arc::new(loader), doc, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(report.ready);
        assert_eq!(report.added, 3);

        let scene = host.lock().await;
        assert_eq!(scene.objects()[0].object_type(), ObjectType::Box);
        assert_eq!(svg_urls(&scene), vec!["b.svg", "a.svg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_asset_does_not_block_ready() {
        let loader = MockLoader {
            failing: HashSet::from(["missing.svg".to_string()]),
            ..Default::default()
        };
        let host = Arc::new(Mutex::new(Scene::default()));
        let doc = SceneDocument::new(
            BaseSettings::default(),
            vec![svg("missing.svg"), svg("ok.svg")],
        );

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let report = load_document(host.clone(), Arc::new(loader), doc, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.added, 1);
        assert!(host.lock().await.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_load_discarded() {
        let loader = Arc::new(MockLoader {
            delays: HashMap::from([("old.svg".to_string(), 100)]),
            ..Default::default()
        });
        let host = Arc::new(Mutex::new(Scene::default()));

        let old_fired = Arc::new(AtomicUsize::new(0));
        let counter = old_fired.clone();
        let old_doc = SceneDocument::new(BaseSettings::default(), vec![svg("old.svg")]);
        let old_load = tokio::spawn(load_document(host.clone(), loader.clone(), old_doc, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(10)).await;

        let new_doc = SceneDocument::new(BaseSettings::default(), vec![svg("new.svg")]);
        let new_report = load_document(host.clone(), loader, new_doc, || {}).await;
        assert!(new_report.ready);

        let old_report = old_load.await.unwrap();
        assert!(old_report.superseded);
        assert!(!old_report.ready);
        assert_eq!(old_fired.load(Ordering::SeqCst), 0);

        let scene = host.lock().await;
        assert_eq!(svg_urls(&scene), vec!["new.svg"]);
    }

    #[tokio::test]
    async fn test_empty_document_fires_ready() {
        let host = Arc::new(Mutex::new(Scene::default()));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let report = load_document(
            host,
            Arc::new(MockLoader::default()),
            SceneDocument::default(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert!(report.ready);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
