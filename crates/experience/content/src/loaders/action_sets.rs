//! Feature action set loader.

use std::path::Path;
use std::sync::Arc;

use experience_core::{FeatureActionSet, PrimaryAssetId};
use serde::{Deserialize, Serialize};

use crate::loaders::{ActionCatalog, LoadResult, read_file};

/// One entry of `action_sets.ron`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSetSpec {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Loader for feature action sets from RON files.
pub struct ActionSetLoader;

impl ActionSetLoader {
    /// Load action sets, resolving action names through `catalog`.
    ///
    /// Unknown action names become empty slots and are described in the
    /// returned notes.
    pub fn load(
        path: &Path,
        catalog: &ActionCatalog,
    ) -> LoadResult<(Vec<Arc<FeatureActionSet>>, Vec<String>)> {
        let content = read_file(path)?;
        Self::parse(&content, catalog)
    }

    pub fn parse(
        content: &str,
        catalog: &ActionCatalog,
    ) -> LoadResult<(Vec<Arc<FeatureActionSet>>, Vec<String>)> {
        let specs: Vec<ActionSetSpec> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse action set RON: {}", e))?;

        let mut notes = Vec::new();
        let sets = specs
            .into_iter()
            .map(|spec| {
                let id = PrimaryAssetId::action_set(&spec.name);
                let actions = spec
                    .actions
                    .iter()
                    .map(|name| {
                        let action = catalog.get(name);
                        if action.is_none() {
                            notes.push(format!("{id}: unknown action '{name}'"));
                        }
                        action
                    })
                    .collect();
                Arc::new(FeatureActionSet::new(id, actions))
            })
            .collect();

        Ok((sets, notes))
    }
}
