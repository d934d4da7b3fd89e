//! Feature action specs and the catalog that resolves them.
//!
//! `actions.ron` lists every action content may reference by name. Each spec
//! is turned into a live [`FeatureAction`] by an [`ActionFactory`] supplied by
//! the runtime, which owns the built-in action implementations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use experience_core::FeatureAction;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// One entry of `actions.ron`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub kind: ActionKindSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKindSpec {
    /// Request feature components on actors of a class while active.
    AddComponents { entries: Vec<ComponentEntrySpec> },
    /// Implemented in code and registered with the factory under `name`.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEntrySpec {
    pub actor_class: String,
    pub features: Vec<String>,
    #[serde(default = "enabled")]
    pub client: bool,
    #[serde(default = "enabled")]
    pub server: bool,
}

fn enabled() -> bool {
    true
}

/// Builds live actions from specs.
pub trait ActionFactory {
    fn build(&self, spec: &ActionSpec) -> LoadResult<Arc<dyn FeatureAction>>;
}

/// Name to implementation table for every loadable action.
#[derive(Default, Clone)]
pub struct ActionCatalog {
    actions: HashMap<String, Arc<dyn FeatureAction>>,
}

impl std::fmt::Debug for ActionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCatalog")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `actions.ron` and build every spec through `factory`.
    pub fn load(path: &Path, factory: &dyn ActionFactory) -> LoadResult<Self> {
        let content = read_file(path)?;
        Self::parse(&content, factory)
    }

    pub fn parse(content: &str, factory: &dyn ActionFactory) -> LoadResult<Self> {
        let specs: Vec<ActionSpec> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse action catalog RON: {}", e))?;

        let mut catalog = Self::new();
        for spec in &specs {
            let action = factory
                .build(spec)
                .map_err(|e| anyhow::anyhow!("Failed to build action '{}': {}", spec.name, e))?;
            catalog.insert(spec.name.clone(), action)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, name: impl Into<String>, action: Arc<dyn FeatureAction>) -> LoadResult<()> {
        let name = name.into();
        if self.actions.contains_key(&name) {
            anyhow::bail!("Duplicate action name '{}'", name);
        }
        self.actions.insert(name, action);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FeatureAction>> {
        self.actions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
