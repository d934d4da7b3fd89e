//! Load states, priorities and failure types of the experience manager.

use experience_core::{
    ErrorSeverity, ExperienceErrorKind, NetMode, PluginUrl, PrimaryAssetId, SessionId,
    WorldContextHandle,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a session is in the experience lifecycle.
///
/// A successful load visits `Unloaded`, `Loading`, `LoadingFeatures`,
/// `ExecutingActions` and `Loaded` in that order. `Failed` is entered instead
/// of `Loaded` when a bundle or plugin load fails.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    LoadingFeatures,
    ExecutingActions,
    Loaded,
    Deactivating,
    Failed,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// True while a load is in flight.
    pub const fn is_loading(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::LoadingFeatures | Self::ExecutingActions
        )
    }
}

/// Order in which loaded subscribers are notified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LoadPriority {
    High,
    #[default]
    Normal,
    Low,
}

impl LoadPriority {
    pub const ALL: [Self; 3] = [Self::High, Self::Normal, Self::Low];
}

/// Why an experience load ended in [`LoadState::Failed`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error("bundle load for {experience} failed: {reason}")]
    Bundle {
        experience: PrimaryAssetId,
        reason: String,
    },

    #[error("{} feature plugin(s) failed to activate for {experience}", .failures.len())]
    Plugins {
        experience: PrimaryAssetId,
        failures: Vec<(PluginUrl, String)>,
    },
}

impl LoadFailure {
    pub fn experience(&self) -> &PrimaryAssetId {
        match self {
            Self::Bundle { experience, .. } | Self::Plugins { experience, .. } => experience,
        }
    }
}

impl ExperienceErrorKind for LoadFailure {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Bundle { .. } => "LOAD_BUNDLE_FAILED",
            Self::Plugins { .. } => "LOAD_PLUGINS_FAILED",
        }
    }
}

/// Rejected calls into the experience manager.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error("cannot set experience while {state} (current: {current:?})")]
    AlreadyActive {
        state: LoadState,
        current: Option<PrimaryAssetId>,
    },

    #[error("experience {id} could not be resolved")]
    UnknownExperience { id: PrimaryAssetId },

    #[error("experience is not loaded")]
    NotLoaded,
}

impl ExperienceErrorKind for ManagerError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AlreadyActive { .. } | Self::NotLoaded => ErrorSeverity::Internal,
            Self::UnknownExperience { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyActive { .. } => "MANAGER_ALREADY_ACTIVE",
            Self::UnknownExperience { .. } => "MANAGER_UNKNOWN_EXPERIENCE",
            Self::NotLoaded => "MANAGER_NOT_LOADED",
        }
    }
}

/// Identity and network role of the session a manager serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub world: WorldContextHandle,
    pub net_mode: NetMode,
    pub is_editor: bool,
}

impl SessionInfo {
    pub fn new(id: SessionId, world: WorldContextHandle, net_mode: NetMode) -> Self {
        Self {
            id,
            world,
            net_mode,
            is_editor: false,
        }
    }

    #[must_use]
    pub fn editor(mut self, is_editor: bool) -> Self {
        self.is_editor = is_editor;
        self
    }
}
