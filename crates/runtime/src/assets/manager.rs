use std::collections::HashMap;
use std::sync::Arc;

use experience_content::ContentBundle;
use experience_core::{
    ExperienceDefinition, FeatureActionSet, LoadCategories, PawnData, PrimaryAssetId,
};
use parking_lot::Mutex;
use tracing::{debug, error};

use super::{BundleLoader, CompletionMode, LoadHandle};

struct PendingLoad {
    ids: Vec<PrimaryAssetId>,
    categories: LoadCategories,
    handle: LoadHandle,
}

/// In-process asset catalog and bundle loader.
///
/// Loaded assets are recorded in a registry that keeps them resident for the
/// life of the process; it is guarded by a lock because loads may be finished
/// from another thread via [`process_pending`](Self::process_pending).
pub struct AssetManager {
    experiences: HashMap<PrimaryAssetId, Arc<ExperienceDefinition>>,
    action_sets: HashMap<PrimaryAssetId, Arc<FeatureActionSet>>,
    pawn_data: HashMap<PrimaryAssetId, Arc<PawnData>>,
    mode: CompletionMode,
    loaded: Mutex<HashMap<PrimaryAssetId, LoadCategories>>,
    pending: Mutex<Vec<PendingLoad>>,
}

impl AssetManager {
    pub fn new(mode: CompletionMode) -> Self {
        Self {
            experiences: HashMap::new(),
            action_sets: HashMap::new(),
            pawn_data: HashMap::new(),
            mode,
            loaded: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Catalogs everything in a loaded content bundle.
    pub fn from_bundle(bundle: &ContentBundle, mode: CompletionMode) -> Self {
        let mut manager = Self::new(mode);
        for experience in &bundle.experiences {
            manager.add_experience(Arc::clone(experience));
        }
        for set in bundle.action_sets.values() {
            manager.add_action_set(Arc::clone(set));
        }
        for pawn in bundle.pawn_data.values() {
            manager.add_pawn_data(Arc::clone(pawn));
        }
        manager
    }

    pub fn add_experience(&mut self, experience: Arc<ExperienceDefinition>) {
        for set in experience.action_sets().iter().flatten() {
            self.action_sets
                .entry(set.id().clone())
                .or_insert_with(|| Arc::clone(set));
        }
        self.experiences.insert(experience.id().clone(), experience);
    }

    pub fn add_action_set(&mut self, set: Arc<FeatureActionSet>) {
        self.action_sets.insert(set.id().clone(), set);
    }

    pub fn add_pawn_data(&mut self, pawn_data: Arc<PawnData>) {
        self.pawn_data.insert(pawn_data.id.clone(), pawn_data);
    }

    /// True if `id` names any cataloged asset.
    pub fn knows(&self, id: &PrimaryAssetId) -> bool {
        self.experiences.contains_key(id)
            || self.action_sets.contains_key(id)
            || self.pawn_data.contains_key(id)
    }

    /// Keeps an asset resident with the given bundle categories.
    pub fn add_loaded_asset(&self, id: PrimaryAssetId, categories: LoadCategories) {
        let mut loaded = self.loaded.lock();
        *loaded.entry(id).or_default() |= categories;
    }

    pub fn is_resident(&self, id: &PrimaryAssetId, categories: LoadCategories) -> bool {
        self.loaded
            .lock()
            .get(id)
            .is_some_and(|resident| resident.contains(categories))
    }

    pub fn loaded_assets(&self) -> Vec<PrimaryAssetId> {
        let mut ids: Vec<_> = self.loaded.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.lock().len()
    }

    /// Finishes every queued load. Completion callbacks run on the caller's
    /// thread, outside the locks.
    pub fn process_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for load in pending {
            for id in &load.ids {
                self.add_loaded_asset(id.clone(), load.categories);
            }
            load.handle.complete();
        }
        count
    }

    /// Cancels every queued load.
    pub fn cancel_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for load in pending {
            load.handle.cancel();
        }
        count
    }

    /// Fails every queued load with `reason`.
    pub fn fail_pending(&self, reason: &str) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for load in pending {
            load.handle.fail(reason);
        }
        count
    }
}

impl BundleLoader for AssetManager {
    fn resolve_experience(&self, id: &PrimaryAssetId) -> Option<Arc<ExperienceDefinition>> {
        self.experiences.get(id).cloned()
    }

    fn resolve_pawn_data(&self, id: &PrimaryAssetId) -> Option<Arc<PawnData>> {
        self.pawn_data.get(id).cloned()
    }

    fn load_bundles(&self, ids: &[PrimaryAssetId], categories: LoadCategories) -> LoadHandle {
        if let Some(unknown) = ids.iter().find(|id| !self.knows(id)) {
            error!(target: "experience::assets", asset = %unknown, "bundle load requested for unknown asset");
            return LoadHandle::failed(format!("unknown asset {unknown}"));
        }

        if ids.iter().all(|id| self.is_resident(id, categories)) {
            debug!(target: "experience::assets", count = ids.len(), "bundle already resident");
            return LoadHandle::completed();
        }

        match self.mode {
            CompletionMode::Immediate => {
                for id in ids {
                    self.add_loaded_asset(id.clone(), categories);
                }
                LoadHandle::completed()
            }
            CompletionMode::Deferred => {
                let handle = LoadHandle::pending();
                self.pending.lock().push(PendingLoad {
                    ids: ids.to_vec(),
                    categories,
                    handle: handle.clone(),
                });
                debug!(target: "experience::assets", count = ids.len(), ?categories, "bundle load queued");
                handle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LoadOutcome;

    fn manager(mode: CompletionMode) -> AssetManager {
        let mut manager = AssetManager::new(mode);
        manager.add_experience(Arc::new(
            ExperienceDefinition::builder(PrimaryAssetId::experience("X")).build(),
        ));
        manager
    }

    #[test]
    fn immediate_mode_completes_and_marks_resident() {
        let manager = manager(CompletionMode::Immediate);
        let id = PrimaryAssetId::experience("X");
        let handle = manager.load_bundles(std::slice::from_ref(&id), LoadCategories::all());
        assert!(handle.has_load_completed());
        assert!(manager.is_resident(&id, LoadCategories::CLIENT));
    }

    #[test]
    fn deferred_mode_waits_for_processing() {
        let manager = manager(CompletionMode::Deferred);
        let id = PrimaryAssetId::experience("X");
        let handle = manager.load_bundles(std::slice::from_ref(&id), LoadCategories::EQUIPPED);
        assert_eq!(handle.outcome(), None);
        assert_eq!(manager.pending_loads(), 1);

        assert_eq!(manager.process_pending(), 1);
        assert!(handle.has_load_completed());

        // A second request for resident assets completes synchronously.
        let again = manager.load_bundles(&[id], LoadCategories::EQUIPPED);
        assert!(again.has_load_completed());
        assert_eq!(manager.pending_loads(), 0);
    }

    #[test]
    fn unknown_assets_fail_the_load() {
        let manager = manager(CompletionMode::Immediate);
        let handle =
            manager.load_bundles(&[PrimaryAssetId::experience("Nope")], LoadCategories::all());
        assert!(matches!(handle.outcome(), Some(LoadOutcome::Failed(_))));
    }
}
