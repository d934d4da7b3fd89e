//! Content factory for loading a whole experience content tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use experience_core::{
    ExperienceDefinition, ExperienceSettings, FeatureActionSet, PawnData, PrimaryAssetId,
    ValidationContext, ValidationIssue,
};

use crate::loaders::{
    ActionCatalog, ActionFactory, ActionSetLoader, ExperienceLoader, ExperienceRefs, LoadResult,
    PawnDataLoader, SettingsLoader,
};

/// Everything loaded from one data directory.
pub struct ContentBundle {
    pub settings: ExperienceSettings,
    pub actions: ActionCatalog,
    pub action_sets: HashMap<PrimaryAssetId, Arc<FeatureActionSet>>,
    pub pawn_data: HashMap<PrimaryAssetId, Arc<PawnData>>,
    pub experiences: Vec<Arc<ExperienceDefinition>>,
    /// Unresolved references found while loading.
    pub notes: Vec<String>,
}

impl ContentBundle {
    /// Runs validation over every experience and action set.
    ///
    /// Loader notes come first as warnings so the names behind unresolved
    /// slots are visible next to the indexed errors.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut ctx = ValidationContext::new();
        for note in &self.notes {
            ctx.add_warning(note.clone());
        }

        if let Some(default) = &self.settings.default_experience
            && !self.experiences.iter().any(|e| e.id() == default)
        {
            ctx.add_error(format!("settings: default experience {default} does not exist"));
        }
        if let Some(default) = &self.settings.default_pawn_data
            && !self.pawn_data.contains_key(default)
        {
            ctx.add_error(format!("settings: default pawn data {default} does not exist"));
        }

        let mut sets: Vec<_> = self.action_sets.values().collect();
        sets.sort_by(|a, b| a.id().cmp(b.id()));
        for set in sets {
            set.validate(&mut ctx);
        }
        for experience in &self.experiences {
            experience.validate(&mut ctx);
        }
        ctx.into_issues()
    }

    pub fn experience(&self, id: &PrimaryAssetId) -> Option<&Arc<ExperienceDefinition>> {
        self.experiences.iter().find(|e| e.id() == id)
    }
}

/// Content factory that loads all experience content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── settings.toml      (optional, defaults apply when missing)
/// ├── actions.ron
/// ├── action_sets.ron    (optional)
/// ├── pawn_data.ron      (optional)
/// └── experiences/
///     ├── Shooter.ron
///     └── Lobby.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load settings from `settings.toml`, or defaults when the file is absent.
    pub fn load_settings(&self) -> LoadResult<ExperienceSettings> {
        let path = self.data_dir.join("settings.toml");
        if !path.exists() {
            return Ok(ExperienceSettings::default());
        }
        SettingsLoader::load(&path)
    }

    /// Load the action catalog from `actions.ron`.
    pub fn load_actions(&self, factory: &dyn ActionFactory) -> LoadResult<ActionCatalog> {
        ActionCatalog::load(&self.data_dir.join("actions.ron"), factory)
    }

    /// Load pawn data from `pawn_data.ron`.
    pub fn load_pawn_data(&self) -> LoadResult<Vec<PawnData>> {
        let path = self.data_dir.join("pawn_data.ron");
        if !path.exists() {
            return Ok(Vec::new());
        }
        PawnDataLoader::load(&path)
    }

    /// Load every file in the tree and resolve references between them.
    pub fn load_bundle(&self, factory: &dyn ActionFactory) -> LoadResult<ContentBundle> {
        let settings = self.load_settings()?;
        let actions = self.load_actions(factory)?;
        let mut notes = Vec::new();

        let sets_path = self.data_dir.join("action_sets.ron");
        let action_sets = if sets_path.exists() {
            let (sets, mut set_notes) = ActionSetLoader::load(&sets_path, &actions)?;
            notes.append(&mut set_notes);
            sets
        } else {
            Vec::new()
        };
        let action_sets: HashMap<_, _> = action_sets
            .into_iter()
            .map(|set| (set.id().clone(), set))
            .collect();

        let pawn_data: HashMap<_, _> = self
            .load_pawn_data()?
            .into_iter()
            .map(|pawn| (pawn.id.clone(), Arc::new(pawn)))
            .collect();

        let refs = ExperienceRefs {
            actions: &actions,
            action_sets: &action_sets,
            pawn_data: &pawn_data,
        };
        let (experiences, mut experience_notes) =
            ExperienceLoader::load_dir(&self.data_dir.join("experiences"), &refs)?;
        notes.append(&mut experience_notes);

        Ok(ContentBundle {
            settings,
            actions,
            action_sets,
            pawn_data,
            experiences,
            notes,
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
