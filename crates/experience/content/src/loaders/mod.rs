//! Content loaders for reading experience data from files.

pub mod action_sets;
pub mod actions;
pub mod experiences;
pub mod factory;
pub mod pawn_data;
pub mod settings;

pub use action_sets::{ActionSetLoader, ActionSetSpec};
pub use actions::{ActionCatalog, ActionFactory, ActionKindSpec, ActionSpec, ComponentEntrySpec};
pub use experiences::{ExperienceLoader, ExperienceRefs, ExperienceSpec};
pub use factory::{ContentBundle, ContentFactory};
pub use pawn_data::{PawnDataLoader, PawnDataSpec};
pub use settings::SettingsLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
