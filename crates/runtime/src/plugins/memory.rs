use std::collections::HashMap;

use experience_core::PluginUrl;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{PluginCompletion, PluginError, PluginSubsystem};
use crate::assets::CompletionMode;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PluginState {
    #[default]
    Installed,
    Active,
}

#[derive(Debug, Default)]
struct PluginEntry {
    state: PluginState,
    failure: Option<String>,
    activations: u32,
    deactivations: u32,
}

/// Plugin subsystem backed by a fixed table of known plugins.
///
/// Plugin names map to `file:Plugins/GameFeatures/{name}/{name}.uplugin`.
/// In deferred mode requests queue until [`process_pending`](Self::process_pending).
pub struct InMemoryPluginSubsystem {
    mode: CompletionMode,
    plugins: Mutex<HashMap<PluginUrl, PluginEntry>>,
    pending: Mutex<Vec<(PluginUrl, PluginCompletion)>>,
}

impl InMemoryPluginSubsystem {
    pub fn new(mode: CompletionMode) -> Self {
        Self {
            mode,
            plugins: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn url_for(name: &str) -> PluginUrl {
        PluginUrl::new(format!("file:Plugins/GameFeatures/{name}/{name}.uplugin"))
    }

    #[must_use]
    pub fn with_plugin(self, name: &str) -> Self {
        self.plugins
            .lock()
            .insert(Self::url_for(name), PluginEntry::default());
        self
    }

    /// Registers a plugin whose activation always fails with `reason`.
    #[must_use]
    pub fn with_failing_plugin(self, name: &str, reason: &str) -> Self {
        self.plugins.lock().insert(
            Self::url_for(name),
            PluginEntry {
                failure: Some(reason.to_string()),
                ..PluginEntry::default()
            },
        );
        self
    }

    pub fn plugin_state(&self, url: &PluginUrl) -> Option<PluginState> {
        self.plugins.lock().get(url).map(|entry| entry.state)
    }

    pub fn is_active(&self, url: &PluginUrl) -> bool {
        self.plugin_state(url) == Some(PluginState::Active)
    }

    pub fn activation_count(&self, url: &PluginUrl) -> u32 {
        self.plugins.lock().get(url).map_or(0, |entry| entry.activations)
    }

    pub fn deactivation_count(&self, url: &PluginUrl) -> u32 {
        self.plugins.lock().get(url).map_or(0, |entry| entry.deactivations)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.lock().len()
    }

    /// Completes every queued request. Completions run outside the locks.
    pub fn process_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for (url, completion) in pending {
            let result = self.activate(&url);
            completion(result);
        }
        count
    }

    fn activate(&self, url: &PluginUrl) -> Result<(), PluginError> {
        let mut plugins = self.plugins.lock();
        let entry = plugins
            .get_mut(url)
            .ok_or_else(|| PluginError::Unknown { url: url.clone() })?;

        if let Some(reason) = &entry.failure {
            return Err(PluginError::LoadFailed {
                url: url.clone(),
                reason: reason.clone(),
            });
        }

        if entry.state != PluginState::Active {
            entry.state = PluginState::Active;
            entry.activations += 1;
            info!(target: "experience::plugins", %url, "plugin activated");
        }
        Ok(())
    }
}

impl PluginSubsystem for InMemoryPluginSubsystem {
    fn resolve_plugin_url(&self, name: &str) -> Option<PluginUrl> {
        let url = Self::url_for(name);
        self.plugins.lock().contains_key(&url).then_some(url)
    }

    fn load_and_activate(&self, url: &PluginUrl, completion: PluginCompletion) {
        match self.mode {
            CompletionMode::Immediate => {
                let result = self.activate(url);
                completion(result);
            }
            CompletionMode::Deferred => {
                debug!(target: "experience::plugins", %url, "plugin activation queued");
                self.pending.lock().push((url.clone(), completion));
            }
        }
    }

    fn deactivate(&self, url: &PluginUrl) {
        let mut plugins = self.plugins.lock();
        match plugins.get_mut(url) {
            Some(entry) if entry.state == PluginState::Active => {
                entry.state = PluginState::Installed;
                entry.deactivations += 1;
                info!(target: "experience::plugins", %url, "plugin deactivated");
            }
            Some(_) => debug!(target: "experience::plugins", %url, "plugin already inactive"),
            None => warn!(target: "experience::plugins", %url, "deactivate requested for unknown plugin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn capture() -> (PluginCompletion, Arc<Mutex<Option<Result<(), PluginError>>>>) {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        (Box::new(move |result| *sink.lock() = Some(result)), slot)
    }

    #[test]
    fn resolves_only_known_plugins() {
        let plugins = InMemoryPluginSubsystem::new(CompletionMode::Immediate).with_plugin("A");
        assert_eq!(
            plugins.resolve_plugin_url("A"),
            Some(PluginUrl::new("file:Plugins/GameFeatures/A/A.uplugin"))
        );
        assert_eq!(plugins.resolve_plugin_url("B"), None);
    }

    #[test]
    fn deferred_activation_waits_for_processing() {
        let plugins = InMemoryPluginSubsystem::new(CompletionMode::Deferred).with_plugin("A");
        let url = InMemoryPluginSubsystem::url_for("A");
        let (completion, result) = capture();

        plugins.load_and_activate(&url, completion);
        assert!(result.lock().is_none());
        assert!(!plugins.is_active(&url));

        assert_eq!(plugins.process_pending(), 1);
        assert_eq!(*result.lock(), Some(Ok(())));
        assert!(plugins.is_active(&url));

        plugins.deactivate(&url);
        assert_eq!(plugins.plugin_state(&url), Some(PluginState::Installed));
        assert_eq!(plugins.deactivation_count(&url), 1);
    }

    #[test]
    fn failing_plugin_reports_load_failure() {
        let plugins = InMemoryPluginSubsystem::new(CompletionMode::Immediate)
            .with_failing_plugin("Broken", "missing content");
        let url = InMemoryPluginSubsystem::url_for("Broken");
        let (completion, result) = capture();

        plugins.load_and_activate(&url, completion);
        assert!(matches!(
            *result.lock(),
            Some(Err(PluginError::LoadFailed { .. }))
        ));
        assert_eq!(plugins.activation_count(&url), 0);
    }
}
