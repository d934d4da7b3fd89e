//! Process-wide experience settings.
//!
//! Loaded once from `settings.toml` by the content crate and shared by every
//! session through the runtime context.

use crate::ids::PrimaryAssetId;
use crate::readiness::{ChainError, ReadinessChain};

/// Game-wide defaults for experience selection and actor readiness.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExperienceSettings {
    /// Experience used when nothing more specific selects one.
    pub default_experience: Option<PrimaryAssetId>,

    /// Pawn data used when neither the player nor the experience provides one.
    pub default_pawn_data: Option<PrimaryAssetId>,

    /// Path of the game data asset, relative to the content root.
    pub game_data_path: Option<String>,

    /// The four readiness stage tags, in order.
    pub state_chain: Vec<String>,
}

impl ExperienceSettings {
    pub fn readiness_chain(&self) -> Result<ReadinessChain, ChainError> {
        ReadinessChain::from_tags(self.state_chain.iter().map(String::as_str))
    }
}

impl Default for ExperienceSettings {
    fn default() -> Self {
        Self {
            default_experience: None,
            default_pawn_data: None,
            game_data_path: None,
            state_chain: ReadinessChain::default()
                .tags()
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
        }
    }
}
