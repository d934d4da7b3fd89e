//! Asset resolution and bundle loading.
//!
//! [`BundleLoader`] is the boundary the experience manager loads through.
//! [`AssetManager`] is the in-process implementation backed by loaded content.

mod handle;
mod manager;

pub use handle::{LoadHandle, LoadOutcome};
pub use manager::AssetManager;

use std::sync::Arc;

use experience_core::{ExperienceDefinition, LoadCategories, PawnData, PrimaryAssetId};

/// Whether in-process collaborators finish requests on the spot or queue them
/// until explicitly processed (the stand-in for a background loading thread).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompletionMode {
    #[default]
    Immediate,
    Deferred,
}

/// Resolves asset ids and loads asset bundles.
pub trait BundleLoader: Send + Sync {
    fn resolve_experience(&self, id: &PrimaryAssetId) -> Option<Arc<ExperienceDefinition>>;

    fn resolve_pawn_data(&self, id: &PrimaryAssetId) -> Option<Arc<PawnData>>;

    /// Starts one combined load of `ids` for the given bundle categories.
    fn load_bundles(&self, ids: &[PrimaryAssetId], categories: LoadCategories) -> LoadHandle;
}
