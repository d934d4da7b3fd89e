//! Experience settings loader.

use std::path::Path;

use experience_core::ExperienceSettings;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`ExperienceSettings`] from TOML files.
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a TOML file and check that its readiness chain is
    /// well formed.
    pub fn load(path: &Path) -> LoadResult<ExperienceSettings> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<ExperienceSettings> {
        let settings: ExperienceSettings = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse settings TOML: {}", e))?;

        settings
            .readiness_chain()
            .map_err(|e| anyhow::anyhow!("Invalid state_chain in settings: {}", e))?;

        Ok(settings)
    }
}
