//! Shared fixtures for runtime integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use experience_core::{
    ActivationContext, DeactivationContext, ExperienceDefinition, FeatureAction, FeatureActionSet,
    NetMode, PauseToken, PrimaryAssetId, SessionId, WorldContextHandle,
};
use experience_runtime::{
    AssetManager, CompletionMode, ExperienceContext, ExperienceManager, InMemoryPluginSubsystem,
    SessionInfo,
};
use parking_lot::Mutex;

/// Ordered record of action callbacks.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Pause tokens an action handed out, kept so tests can complete them.
#[derive(Clone, Default)]
pub struct Parked(Arc<Mutex<Vec<PauseToken>>>);

impl Parked {
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Completes the oldest parked token.
    pub fn complete_next(&self) {
        let token = {
            let mut tokens = self.0.lock();
            if tokens.is_empty() {
                return;
            }
            tokens.remove(0)
        };
        token.complete();
    }
}

/// Logs every lifecycle callback and optionally pauses deactivation.
pub struct RecordingAction {
    name: String,
    log: Log,
    pausers: usize,
    parked: Parked,
    complete_inline: bool,
}

impl RecordingAction {
    pub fn new(name: &str, log: &Log) -> Arc<dyn FeatureAction> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            pausers: 0,
            parked: Parked::default(),
            complete_inline: false,
        })
    }

    /// An action that pauses deactivation `pausers` times and parks the
    /// tokens in `parked`.
    pub fn pausing(name: &str, log: &Log, pausers: usize, parked: &Parked) -> Arc<dyn FeatureAction> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            pausers,
            parked: parked.clone(),
            complete_inline: false,
        })
    }

    /// An action that pauses once and completes before returning.
    pub fn pausing_inline(name: &str, log: &Log) -> Arc<dyn FeatureAction> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            pausers: 1,
            parked: Parked::default(),
            complete_inline: true,
        })
    }
}

impl FeatureAction for RecordingAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_register(&self) {
        self.log.push(format!("register:{}", self.name));
    }

    fn on_load(&self) {
        self.log.push(format!("load:{}", self.name));
    }

    fn on_activate(&self, _ctx: &ActivationContext) {
        self.log.push(format!("activate:{}", self.name));
    }

    fn on_deactivate(&self, ctx: &mut DeactivationContext) {
        self.log.push(format!("deactivate:{}", self.name));
        for index in 0..self.pausers {
            let token = ctx.pause(format!("{}#{index}", self.name));
            if self.complete_inline {
                token.complete();
            } else {
                self.parked.0.lock().push(token);
            }
        }
    }

    fn on_unregister(&self) {
        self.log.push(format!("unregister:{}", self.name));
    }
}

pub struct Fixture {
    pub context: Arc<ExperienceContext>,
    pub assets: Arc<AssetManager>,
    pub plugins: Arc<InMemoryPluginSubsystem>,
}

impl Fixture {
    pub fn new(mode: CompletionMode, experiences: Vec<ExperienceDefinition>, plugins: &[&str]) -> Self {
        Self::with_plugins(mode, experiences, |subsystem| {
            plugins.iter().fold(subsystem, |subsystem, name| subsystem.with_plugin(name))
        })
    }

    pub fn with_plugins(
        mode: CompletionMode,
        experiences: Vec<ExperienceDefinition>,
        configure: impl FnOnce(InMemoryPluginSubsystem) -> InMemoryPluginSubsystem,
    ) -> Self {
        let mut assets = AssetManager::new(mode);
        for experience in experiences {
            assets.add_experience(Arc::new(experience));
        }
        let assets = Arc::new(assets);
        let plugins = Arc::new(configure(InMemoryPluginSubsystem::new(mode)));

        let context = ExperienceContext::builder()
            .assets(assets.clone())
            .plugins(plugins.clone())
            .build()
            .expect("context should build");

        Self {
            context,
            assets,
            plugins,
        }
    }

    pub fn manager(&self, net_mode: NetMode) -> ExperienceManager {
        let (session, world) = self.context.allocate_session();
        ExperienceManager::new(Arc::clone(&self.context), SessionInfo::new(session, world, net_mode))
    }
}

pub fn experience(name: &str) -> experience_core::ExperienceDefinitionBuilder {
    ExperienceDefinition::builder(PrimaryAssetId::experience(name))
}

pub fn action_set(name: &str, actions: Vec<Arc<dyn FeatureAction>>) -> Arc<FeatureActionSet> {
    Arc::new(FeatureActionSet::new(
        PrimaryAssetId::action_set(name),
        actions.into_iter().map(Some).collect(),
    ))
}

pub fn session_info(id: u64, net_mode: NetMode) -> SessionInfo {
    SessionInfo::new(SessionId(id), WorldContextHandle(id as u32), net_mode)
}
