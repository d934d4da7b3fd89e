//! Process-wide experience subsystem state.
//!
//! One [`ExperienceContext`] is shared by every session in the process. It
//! owns the activation ledger and the readiness chain configuration, and holds
//! the asset and plugin collaborators sessions load through.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use experience_core::{ExperienceSettings, ReadinessChain, SessionId, WorldContextHandle};

use crate::api::{Result, RuntimeError};
use crate::assets::BundleLoader;
use crate::components::ComponentRequests;
use crate::ledger::PluginActivationLedger;
use crate::plugins::PluginSubsystem;

pub struct ExperienceContext {
    settings: ExperienceSettings,
    chain: Arc<ReadinessChain>,
    ledger: PluginActivationLedger,
    assets: Arc<dyn BundleLoader>,
    plugins: Arc<dyn PluginSubsystem>,
    components: ComponentRequests,
    next_session: AtomicU64,
    next_world: AtomicU32,
}

impl ExperienceContext {
    pub fn builder() -> ExperienceContextBuilder {
        ExperienceContextBuilder::default()
    }

    pub fn settings(&self) -> &ExperienceSettings {
        &self.settings
    }

    pub fn chain(&self) -> &Arc<ReadinessChain> {
        &self.chain
    }

    pub fn ledger(&self) -> &PluginActivationLedger {
        &self.ledger
    }

    pub fn assets(&self) -> &Arc<dyn BundleLoader> {
        &self.assets
    }

    pub fn plugins(&self) -> &Arc<dyn PluginSubsystem> {
        &self.plugins
    }

    pub fn components(&self) -> &ComponentRequests {
        &self.components
    }

    /// Hands out a fresh session id and world handle.
    pub fn allocate_session(&self) -> (SessionId, WorldContextHandle) {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        let world = self.next_world.fetch_add(1, Ordering::Relaxed);
        (SessionId(session), WorldContextHandle(world))
    }
}

impl std::fmt::Debug for ExperienceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperienceContext")
            .field("settings", &self.settings)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExperienceContext`].
#[derive(Default)]
pub struct ExperienceContextBuilder {
    settings: ExperienceSettings,
    assets: Option<Arc<dyn BundleLoader>>,
    plugins: Option<Arc<dyn PluginSubsystem>>,
    components: Option<ComponentRequests>,
}

impl ExperienceContextBuilder {
    pub fn settings(mut self, settings: ExperienceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn assets(mut self, assets: Arc<dyn BundleLoader>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn plugins(mut self, plugins: Arc<dyn PluginSubsystem>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Shares a request table that actions were already built against.
    pub fn components(mut self, components: ComponentRequests) -> Self {
        self.components = Some(components);
        self
    }

    pub fn build(self) -> Result<Arc<ExperienceContext>> {
        let chain = self.settings.readiness_chain()?;
        let assets = self
            .assets
            .ok_or(RuntimeError::MissingCollaborator { name: "assets" })?;
        let plugins = self
            .plugins
            .ok_or(RuntimeError::MissingCollaborator { name: "plugins" })?;

        Ok(Arc::new(ExperienceContext {
            settings: self.settings,
            chain: Arc::new(chain),
            ledger: PluginActivationLedger::new(),
            assets,
            plugins,
            components: self.components.unwrap_or_default(),
            next_session: AtomicU64::new(1),
            next_world: AtomicU32::new(1),
        }))
    }
}
