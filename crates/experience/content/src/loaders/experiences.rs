//! Experience definition loader.
//!
//! Each experience lives in its own `experiences/{Name}.ron` file; the file
//! stem becomes the asset name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use experience_core::{ExperienceDefinition, FeatureActionSet, PawnData, PrimaryAssetId};
use serde::{Deserialize, Serialize};

use crate::loaders::{ActionCatalog, LoadResult, read_file};

/// On-disk shape of one experience.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceSpec {
    /// Feature plugin names to enable.
    pub plugins: Vec<String>,
    /// Action names from the action catalog.
    pub actions: Vec<String>,
    /// Action set names.
    pub action_sets: Vec<String>,
    /// Pawn data name.
    pub default_pawn_data: Option<String>,
}

/// Lookup tables an experience resolves its references against.
pub struct ExperienceRefs<'a> {
    pub actions: &'a ActionCatalog,
    pub action_sets: &'a HashMap<PrimaryAssetId, Arc<FeatureActionSet>>,
    pub pawn_data: &'a HashMap<PrimaryAssetId, Arc<PawnData>>,
}

/// Loader for experience definitions from RON files.
pub struct ExperienceLoader;

impl ExperienceLoader {
    /// Load every `*.ron` file in `dir`, in file name order.
    pub fn load_dir(
        dir: &Path,
        refs: &ExperienceRefs<'_>,
    ) -> LoadResult<(Vec<Arc<ExperienceDefinition>>, Vec<String>)> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
            .collect();
        paths.sort();

        let mut experiences = Vec::with_capacity(paths.len());
        let mut notes = Vec::new();
        for path in paths {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid experience file name {}", path.display()))?
                .to_string();
            let content = read_file(&path)?;
            let (definition, mut file_notes) = Self::parse(&name, &content, refs)?;
            experiences.push(Arc::new(definition));
            notes.append(&mut file_notes);
        }

        Ok((experiences, notes))
    }

    /// Parse one experience named `name`.
    pub fn parse(
        name: &str,
        content: &str,
        refs: &ExperienceRefs<'_>,
    ) -> LoadResult<(ExperienceDefinition, Vec<String>)> {
        let spec: ExperienceSpec = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse experience '{}' RON: {}", name, e))?;

        let id = PrimaryAssetId::experience(name);
        let mut notes = Vec::new();
        let mut builder = ExperienceDefinition::builder(id.clone());

        for plugin in spec.plugins {
            builder = builder.plugin(plugin);
        }

        for action_name in &spec.actions {
            let action = refs.actions.get(action_name);
            if action.is_none() {
                notes.push(format!("{id}: unknown action '{action_name}'"));
            }
            builder = builder.action_slot(action);
        }

        for set_name in &spec.action_sets {
            let set = refs
                .action_sets
                .get(&PrimaryAssetId::action_set(set_name))
                .cloned();
            if set.is_none() {
                notes.push(format!("{id}: unknown action set '{set_name}'"));
            }
            builder = builder.action_set_slot(set);
        }

        if let Some(pawn_name) = &spec.default_pawn_data {
            match refs.pawn_data.get(&PrimaryAssetId::pawn_data(pawn_name)) {
                Some(pawn_data) => builder = builder.default_pawn_data(Arc::clone(pawn_data)),
                None => notes.push(format!("{id}: unknown pawn data '{pawn_name}'")),
            }
        }

        Ok((builder.build(), notes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::actions::tests::NamedFactory;

    fn tables() -> (
        ActionCatalog,
        HashMap<PrimaryAssetId, Arc<FeatureActionSet>>,
        HashMap<PrimaryAssetId, Arc<PawnData>>,
    ) {
        let catalog = ActionCatalog::parse(r#"[(name: "spawn", kind: Custom)]"#, &NamedFactory)
            .unwrap();
        let set = Arc::new(FeatureActionSet::new(
            PrimaryAssetId::action_set("Shared"),
            vec![catalog.get("spawn")],
        ));
        let pawn = Arc::new(PawnData::new(PrimaryAssetId::pawn_data("Hero"), "B_Hero"));
        (
            catalog,
            HashMap::from([(set.id().clone(), set)]),
            HashMap::from([(pawn.id.clone(), pawn)]),
        )
    }

    #[test]
    fn test_parse_resolves_references() {
        let (actions, action_sets, pawn_data) = tables();
        let refs = ExperienceRefs {
            actions: &actions,
            action_sets: &action_sets,
            pawn_data: &pawn_data,
        };

        let (definition, notes) = ExperienceLoader::parse(
            "Shooter",
            r#"(
                plugins: ["ShooterCore"],
                actions: ["spawn"],
                action_sets: ["Shared"],
                default_pawn_data: Some("Hero"),
            )"#,
            &refs,
        )
        .unwrap();

        assert!(notes.is_empty());
        assert_eq!(definition.id(), &PrimaryAssetId::experience("Shooter"));
        assert_eq!(definition.plugin_names(), ["ShooterCore".to_string()]);
        assert_eq!(definition.all_actions().count(), 2);
        assert_eq!(
            definition.default_pawn_data().map(|p| p.pawn_class.as_str()),
            Some("B_Hero")
        );
    }

    #[test]
    fn test_unknown_references_are_noted() {
        let (actions, action_sets, pawn_data) = tables();
        let refs = ExperienceRefs {
            actions: &actions,
            action_sets: &action_sets,
            pawn_data: &pawn_data,
        };

        let (definition, notes) = ExperienceLoader::parse(
            "Broken",
            r#"(actions: ["ghost"], action_sets: ["Nope"], default_pawn_data: Some("Who"))"#,
            &refs,
        )
        .unwrap();

        assert_eq!(notes.len(), 3);
        assert_eq!(definition.actions().len(), 1);
        assert!(definition.actions()[0].is_none());
        assert!(definition.default_pawn_data().is_none());
    }

    #[test]
    fn test_load_dir_reads_ron_files_in_order() {
        let (actions, action_sets, pawn_data) = tables();
        let refs = ExperienceRefs {
            actions: &actions,
            action_sets: &action_sets,
            pawn_data: &pawn_data,
        };

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("B.ron"), "()").unwrap();
        std::fs::write(dir.path().join("A.ron"), r#"(plugins: ["X"])"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (experiences, notes) = ExperienceLoader::load_dir(dir.path(), &refs).unwrap();
        assert!(notes.is_empty());
        let ids: Vec<_> = experiences.iter().map(|e| e.id().name().to_string()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }
}
