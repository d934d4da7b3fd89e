//! Feature plugin subsystem boundary.

mod memory;

pub use memory::{InMemoryPluginSubsystem, PluginState};

use experience_core::{ErrorSeverity, ExperienceErrorKind, PluginUrl};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("plugin {url} is not known to the plugin subsystem")]
    Unknown { url: PluginUrl },

    #[error("plugin {url} failed to load: {reason}")]
    LoadFailed { url: PluginUrl, reason: String },
}

impl ExperienceErrorKind for PluginError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Unknown { .. } => ErrorSeverity::Validation,
            Self::LoadFailed { .. } => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unknown { .. } => "PLUGIN_UNKNOWN",
            Self::LoadFailed { .. } => "PLUGIN_LOAD_FAILED",
        }
    }
}

/// Completion for a load-and-activate request. Called exactly once.
pub type PluginCompletion = Box<dyn FnOnce(Result<(), PluginError>) + Send>;

/// Loads, activates and deactivates feature plugins by URL.
pub trait PluginSubsystem: Send + Sync {
    /// Maps a plugin name from an experience definition to its URL.
    fn resolve_plugin_url(&self, name: &str) -> Option<PluginUrl>;

    fn load_and_activate(&self, url: &PluginUrl, completion: PluginCompletion);

    fn deactivate(&self, url: &PluginUrl);
}
