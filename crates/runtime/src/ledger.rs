//! Process-wide reference counts of feature plugin activation requests.
//!
//! Several sessions in one process may enable the same plugin. The ledger
//! counts outstanding requests per plugin URL so a plugin is deactivated only
//! when the last session that asked for it ends.

use std::collections::HashMap;

use experience_core::{ErrorSeverity, ExperienceErrorKind, PluginUrl};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("plugin {url} released without an outstanding activation request")]
    NotRegistered { url: PluginUrl },
}

impl ExperienceErrorKind for LedgerError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotRegistered { .. } => "LEDGER_NOT_REGISTERED",
        }
    }
}

/// Reference-counted table from plugin URL to activation requests.
///
/// Entries are removed as soon as their count reaches zero.
#[derive(Debug, Default)]
pub struct PluginActivationLedger {
    requests: Mutex<HashMap<PluginUrl, u32>>,
}

impl PluginActivationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more request for `url` and returns the new count.
    pub fn register(&self, url: &PluginUrl) -> u32 {
        let mut requests = self.requests.lock();
        let count = requests.entry(url.clone()).or_insert(0);
        *count += 1;
        debug!(target: "experience::ledger", %url, count = *count, "plugin activation requested");
        *count
    }

    /// Drops one request for `url`. Returns `true` when it was the last one,
    /// in which case the caller should deactivate the plugin.
    pub fn release_and_check_last(&self, url: &PluginUrl) -> Result<bool, LedgerError> {
        let mut requests = self.requests.lock();
        let count = requests
            .get_mut(url)
            .ok_or_else(|| LedgerError::NotRegistered { url: url.clone() })?;

        *count -= 1;
        if *count == 0 {
            requests.remove(url);
            debug!(target: "experience::ledger", %url, "no more requests for plugin");
            Ok(true)
        } else {
            debug!(target: "experience::ledger", %url, remaining = *count, "plugin still requested");
            Ok(false)
        }
    }

    /// Outstanding requests for `url`; zero when absent.
    pub fn request_count(&self, url: &PluginUrl) -> u32 {
        self.requests.lock().get(url).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }

    /// Clears the table when a fresh play session starts in the same process.
    /// Leftover entries mean an earlier session never released its plugins.
    pub fn reset_for_new_play_session(&self) {
        let mut requests = self.requests.lock();
        if !requests.is_empty() {
            warn!(
                target: "experience::ledger",
                leftover = requests.len(),
                "activation ledger not empty at the start of a play session"
            );
        }
        requests.clear();
    }
}
