//! Event payloads for each topic.

use experience_core::{PluginUrl, PrimaryAssetId, SessionId};
use serde::{Deserialize, Serialize};

use crate::manager::LoadState;

/// Experience lifecycle of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceEvent {
    StateChanged {
        session: SessionId,
        from: LoadState,
        to: LoadState,
    },

    /// The experience finished loading and its actions are active.
    Loaded {
        session: SessionId,
        experience: PrimaryAssetId,
    },

    LoadFailed {
        session: SessionId,
        experience: PrimaryAssetId,
        reason: String,
    },
}

/// Feature plugin activity triggered by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginEvent {
    Activated { session: SessionId, url: PluginUrl },

    /// The session released the last request for the plugin.
    Deactivated { session: SessionId, url: PluginUrl },

    ActivationFailed {
        session: SessionId,
        url: PluginUrl,
        reason: String,
    },
}
