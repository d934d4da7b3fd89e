//! Pawn data loader.

use std::path::Path;

use experience_core::{PawnData, PrimaryAssetId};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// One entry of `pawn_data.ron`; the id is derived from `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PawnDataSpec {
    pub name: String,
    pub pawn_class: String,
    #[serde(default)]
    pub input_config: Option<String>,
}

/// Loader for pawn data from RON files.
pub struct PawnDataLoader;

impl PawnDataLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<PawnData>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<PawnData>> {
        let specs: Vec<PawnDataSpec> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse pawn data RON: {}", e))?;

        Ok(specs
            .into_iter()
            .map(|spec| PawnData {
                id: PrimaryAssetId::pawn_data(spec.name),
                pawn_class: spec.pawn_class,
                input_config: spec.input_config,
            })
            .collect())
    }
}
