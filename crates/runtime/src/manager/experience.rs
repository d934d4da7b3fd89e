//! Per-session experience state machine.
//!
//! Completions from collaborators (bundle loads, plugin activations, pause
//! tokens) never call back into the manager directly. They are posted as
//! [`Signal`]s on the manager's own channel and applied by [`pump`], which
//! every public entry point runs before returning. A session worker can also
//! await [`next_signal`] to apply completions that arrive later.
//!
//! [`pump`]: ExperienceManager::pump
//! [`next_signal`]: ExperienceManager::next_signal

use std::sync::Arc;

use experience_core::{
    ActivationContext, DeactivationContext, ExperienceDefinition, LoadCategories, PauseNotifier,
    PluginUrl, PrimaryAssetId,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::{LoadFailure, LoadPriority, LoadState, ManagerError, SessionInfo};
use crate::assets::LoadOutcome;
use crate::context::ExperienceContext;
use crate::events::{EventBus, ExperienceEvent, PluginEvent};
use crate::plugins::PluginError;

/// Continuation run once the experience is loaded.
pub type LoadedCallback = Box<dyn FnOnce(&Arc<ExperienceDefinition>) + Send>;

/// Continuation run if the experience fails to load.
pub type FailedCallback = Box<dyn FnOnce(&LoadFailure) + Send>;

/// A collaborator completion waiting to be applied.
///
/// `generation` identifies the load attempt that issued the request; signals
/// from an abandoned attempt are dropped.
#[derive(Debug)]
pub enum Signal {
    BundleLoaded {
        generation: u64,
        outcome: LoadOutcome,
    },
    PluginLoaded {
        generation: u64,
        url: PluginUrl,
        result: Result<(), PluginError>,
    },
    PauserCompleted {
        generation: u64,
        label: String,
    },
}

#[derive(Default)]
struct LoadedSubscribers {
    high: Vec<LoadedCallback>,
    normal: Vec<LoadedCallback>,
    low: Vec<LoadedCallback>,
}

impl LoadedSubscribers {
    fn list(&mut self, priority: LoadPriority) -> &mut Vec<LoadedCallback> {
        match priority {
            LoadPriority::High => &mut self.high,
            LoadPriority::Normal => &mut self.normal,
            LoadPriority::Low => &mut self.low,
        }
    }

    fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    fn clear(&mut self) -> usize {
        let dropped = self.len();
        self.high.clear();
        self.normal.clear();
        self.low.clear();
        dropped
    }
}

/// Drives one session's experience from selection to teardown.
pub struct ExperienceManager {
    context: Arc<ExperienceContext>,
    session: SessionInfo,
    events: Option<EventBus>,

    state: LoadState,
    current: Option<Arc<ExperienceDefinition>>,
    failure: Option<LoadFailure>,
    generation: u64,

    /// URLs this session registered with the activation ledger.
    plugin_urls: Vec<PluginUrl>,
    /// Activations requested by the current load that have not completed.
    plugins_in_flight: Vec<PluginUrl>,
    plugin_failures: Vec<(PluginUrl, String)>,
    /// In-flight activations of abandoned loads, deactivated on arrival if
    /// nobody requests them any more.
    abandoned_plugins: Vec<PluginUrl>,

    activation: Option<ActivationContext>,
    expected_pausers: Option<usize>,
    observed_pausers: usize,

    on_loaded: LoadedSubscribers,
    on_failed: Vec<FailedCallback>,

    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
}

impl ExperienceManager {
    pub fn new(context: Arc<ExperienceContext>, session: SessionInfo) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            context,
            session,
            events: None,
            state: LoadState::Unloaded,
            current: None,
            failure: None,
            generation: 0,
            plugin_urls: Vec::new(),
            plugins_in_flight: Vec::new(),
            plugin_failures: Vec::new(),
            abandoned_plugins: Vec::new(),
            activation: None,
            expected_pausers: None,
            observed_pausers: 0,
            on_loaded: LoadedSubscribers::default(),
            on_failed: Vec::new(),
            signal_tx,
            signal_rx,
        }
    }

    /// Publishes lifecycle events to `bus`.
    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub fn current_experience(&self) -> Option<&Arc<ExperienceDefinition>> {
        self.current.as_ref()
    }

    pub fn is_experience_loaded(&self) -> bool {
        self.state == LoadState::Loaded && self.current.is_some()
    }

    /// The active experience. Fails unless the state is [`LoadState::Loaded`].
    pub fn loaded_experience(&self) -> Result<&Arc<ExperienceDefinition>, ManagerError> {
        match (&self.state, &self.current) {
            (LoadState::Loaded, Some(experience)) => Ok(experience),
            _ => Err(ManagerError::NotLoaded),
        }
    }

    pub fn load_failure(&self) -> Option<&LoadFailure> {
        self.failure.as_ref()
    }

    /// Pause tokens handed out during deactivation that have not completed.
    pub fn outstanding_pausers(&self) -> usize {
        self.expected_pausers
            .map_or(0, |expected| expected.saturating_sub(self.observed_pausers))
    }

    pub fn plugin_urls(&self) -> &[PluginUrl] {
        &self.plugin_urls
    }

    /// The experience id replicated to observers of this session.
    pub fn replicated_experience(&self) -> Option<&PrimaryAssetId> {
        self.current.as_ref().map(|experience| experience.id())
    }

    /// Starts loading `id`. Only valid while unloaded.
    pub fn set_current_experience(&mut self, id: PrimaryAssetId) -> Result<(), ManagerError> {
        if self.state != LoadState::Unloaded || self.current.is_some() {
            return Err(ManagerError::AlreadyActive {
                state: self.state,
                current: self.replicated_experience().cloned(),
            });
        }

        let Some(experience) = self.context.assets().resolve_experience(&id) else {
            error!(
                target: "experience::manager",
                session = %self.session.id,
                experience = %id,
                "experience could not be resolved"
            );
            return Err(ManagerError::UnknownExperience { id });
        };

        info!(
            target: "experience::manager",
            session = %self.session.id,
            experience = %id,
            "setting current experience"
        );

        self.generation += 1;
        self.current = Some(experience);
        self.failure = None;
        self.start_experience_load();
        self.pump();
        Ok(())
    }

    /// Applies an experience id received through replication.
    pub fn on_replicated_experience(&mut self, id: PrimaryAssetId) -> Result<(), ManagerError> {
        if self.replicated_experience() == Some(&id) {
            debug!(target: "experience::manager", experience = %id, "replicated experience already current");
            return Ok(());
        }
        self.set_current_experience(id)
    }

    /// Calls `callback` now if the experience is loaded, otherwise once it is.
    ///
    /// On completion high priority callbacks run before normal ones, and
    /// normal before low, regardless of registration order.
    pub fn call_or_register_on_experience_loaded(
        &mut self,
        priority: LoadPriority,
        callback: impl FnOnce(&Arc<ExperienceDefinition>) + Send + 'static,
    ) {
        if let Ok(experience) = self.loaded_experience() {
            let experience = Arc::clone(experience);
            callback(&experience);
        } else if self.state == LoadState::Failed {
            warn!(
                target: "experience::manager",
                session = %self.session.id,
                %priority,
                "experience failed to load; loaded callback dropped"
            );
        } else {
            self.on_loaded.list(priority).push(Box::new(callback));
        }
    }

    pub fn call_or_register_on_experience_loaded_high_priority(
        &mut self,
        callback: impl FnOnce(&Arc<ExperienceDefinition>) + Send + 'static,
    ) {
        self.call_or_register_on_experience_loaded(LoadPriority::High, callback);
    }

    pub fn call_or_register_on_experience_loaded_low_priority(
        &mut self,
        callback: impl FnOnce(&Arc<ExperienceDefinition>) + Send + 'static,
    ) {
        self.call_or_register_on_experience_loaded(LoadPriority::Low, callback);
    }

    /// Calls `callback` now if the load already failed, otherwise on failure.
    pub fn call_or_register_on_experience_load_failed(
        &mut self,
        callback: impl FnOnce(&LoadFailure) + Send + 'static,
    ) {
        match (&self.state, &self.failure) {
            (LoadState::Failed, Some(failure)) => callback(failure),
            _ => self.on_failed.push(Box::new(callback)),
        }
    }

    /// Tears the session's experience down.
    ///
    /// Plugins this session requested are released through the ledger and
    /// deactivated when no other session still needs them. A loaded
    /// experience then deactivates its actions and waits for any pause tokens
    /// they hand out.
    pub fn end_play(&mut self) {
        self.release_plugins();

        match self.state {
            LoadState::Loaded => self.begin_deactivation(),
            LoadState::Failed => self.on_all_actions_deactivated(),
            LoadState::Unloaded => {
                debug!(target: "experience::manager", session = %self.session.id, "end play with no experience");
            }
            LoadState::Deactivating => {
                warn!(target: "experience::manager", session = %self.session.id, "end play while already deactivating");
            }
            LoadState::Loading | LoadState::LoadingFeatures | LoadState::ExecutingActions => {
                warn!(
                    target: "experience::manager",
                    session = %self.session.id,
                    state = %self.state,
                    "end play during load; discarding in-flight load"
                );
                self.generation += 1;
                self.on_all_actions_deactivated();
            }
        }

        self.pump();
    }

    /// Applies every completion already posted. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(signal) = self.signal_rx.try_recv() {
            self.apply_signal(signal);
            applied += 1;
        }
        applied
    }

    /// Waits for the next posted completion.
    pub(crate) async fn next_signal(&mut self) -> Option<Signal> {
        self.signal_rx.recv().await
    }

    pub(crate) fn apply_signal(&mut self, signal: Signal) {
        match signal {
            Signal::BundleLoaded {
                generation,
                outcome,
            } => {
                if self.is_stale(generation, "bundle load") {
                    return;
                }
                if self.state != LoadState::Loading {
                    warn!(target: "experience::manager", state = %self.state, "bundle completion outside loading; ignored");
                    return;
                }
                self.on_bundle_loaded(outcome);
            }
            Signal::PluginLoaded {
                generation,
                url,
                result,
            } => {
                if self.is_stale(generation, "plugin activation") {
                    self.on_abandoned_plugin_loaded(url, result);
                    return;
                }
                self.on_plugin_loaded(url, result);
            }
            Signal::PauserCompleted { generation, label } => {
                if self.is_stale(generation, "pause token") {
                    return;
                }
                self.on_pauser_completed(&label);
            }
        }
    }

    fn is_stale(&self, generation: u64, what: &str) -> bool {
        if generation == self.generation {
            return false;
        }
        warn!(
            target: "experience::manager",
            session = %self.session.id,
            generation,
            current = self.generation,
            "{what} completion from an abandoned load; ignored"
        );
        true
    }

    fn start_experience_load(&mut self) {
        let Some(experience) = self.current.clone() else {
            return;
        };
        self.transition(LoadState::Loading);

        let ids = experience.bundle_asset_ids();
        let categories = LoadCategories::for_session(self.session.net_mode, self.session.is_editor);
        debug!(
            target: "experience::manager",
            session = %self.session.id,
            assets = ids.len(),
            ?categories,
            "loading experience bundles"
        );

        let handle = self.context.assets().load_bundles(&ids, categories);
        match handle.outcome() {
            Some(outcome) => self.on_bundle_loaded(outcome),
            None => {
                let tx = self.signal_tx.clone();
                let generation = self.generation;
                handle.bind_completion(move |outcome| {
                    let _ = tx.send(Signal::BundleLoaded {
                        generation,
                        outcome,
                    });
                });
            }
        }
    }

    fn on_bundle_loaded(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Completed => {}
            LoadOutcome::Cancelled => {
                warn!(target: "experience::manager", session = %self.session.id, "bundle load cancelled; continuing");
            }
            LoadOutcome::Failed(reason) => {
                let experience = self.current_id();
                self.fail(LoadFailure::Bundle { experience, reason });
                return;
            }
        }
        self.load_feature_plugins();
    }

    fn load_feature_plugins(&mut self) {
        let Some(experience) = self.current.clone() else {
            return;
        };
        self.transition(LoadState::LoadingFeatures);

        let plugins = Arc::clone(self.context.plugins());
        let mut urls: Vec<PluginUrl> = Vec::new();
        for name in experience.plugin_names() {
            match plugins.resolve_plugin_url(name) {
                Some(url) if !urls.contains(&url) => urls.push(url),
                Some(_) => {}
                None => warn!(
                    target: "experience::manager",
                    experience = %experience.id(),
                    plugin = %name,
                    "feature plugin could not be resolved; skipping"
                ),
            }
        }

        if urls.is_empty() {
            self.on_experience_full_load_completed();
            return;
        }

        self.plugins_in_flight = urls.clone();
        self.plugin_failures.clear();
        for url in urls {
            self.context.ledger().register(&url);
            self.plugin_urls.push(url.clone());

            let tx = self.signal_tx.clone();
            let generation = self.generation;
            let signal_url = url.clone();
            plugins.load_and_activate(
                &url,
                Box::new(move |result| {
                    let _ = tx.send(Signal::PluginLoaded {
                        generation,
                        url: signal_url,
                        result,
                    });
                }),
            );
        }
    }

    fn on_plugin_loaded(&mut self, url: PluginUrl, result: Result<(), PluginError>) {
        if self.state != LoadState::LoadingFeatures {
            warn!(target: "experience::manager", %url, state = %self.state, "plugin completion outside feature loading; ignored");
            return;
        }

        let session = self.session.id;
        match result {
            Ok(()) => {
                debug!(target: "experience::manager", %session, %url, "feature plugin active");
                self.emit(PluginEvent::Activated {
                    session,
                    url: url.clone(),
                });
            }
            Err(err) => {
                error!(target: "experience::manager", %session, %url, error = %err, "feature plugin failed to activate");
                self.emit(PluginEvent::ActivationFailed {
                    session,
                    url: url.clone(),
                    reason: err.to_string(),
                });
                self.plugin_failures.push((url.clone(), err.to_string()));
            }
        }

        if let Some(index) = self.plugins_in_flight.iter().position(|pending| *pending == url) {
            self.plugins_in_flight.swap_remove(index);
        }
        if !self.plugins_in_flight.is_empty() {
            return;
        }

        if self.plugin_failures.is_empty() {
            self.on_experience_full_load_completed();
        } else {
            let failure = LoadFailure::Plugins {
                experience: self.current_id(),
                failures: std::mem::take(&mut self.plugin_failures),
            };
            self.fail(failure);
        }
    }

    fn on_experience_full_load_completed(&mut self) {
        let Some(experience) = self.current.clone() else {
            return;
        };
        self.transition(LoadState::ExecutingActions);

        let activation = ActivationContext::new(self.session.id, self.session.net_mode)
            .with_world(self.session.world);
        for action in experience.all_actions() {
            action.on_register();
            action.on_load();
            action.on_activate(&activation);
        }
        self.activation = Some(activation);

        self.transition(LoadState::Loaded);
        info!(
            target: "experience::manager",
            session = %self.session.id,
            experience = %experience.id(),
            "experience loaded"
        );
        self.emit(ExperienceEvent::Loaded {
            session: self.session.id,
            experience: experience.id().clone(),
        });

        for priority in LoadPriority::ALL {
            for callback in std::mem::take(self.on_loaded.list(priority)) {
                callback(&experience);
            }
        }
    }

    fn fail(&mut self, failure: LoadFailure) {
        error!(
            target: "experience::manager",
            session = %self.session.id,
            error = %failure,
            "experience load failed"
        );
        self.transition(LoadState::Failed);
        self.emit(ExperienceEvent::LoadFailed {
            session: self.session.id,
            experience: failure.experience().clone(),
            reason: failure.to_string(),
        });

        let dropped = self.on_loaded.clear();
        if dropped > 0 {
            debug!(target: "experience::manager", dropped, "loaded callbacks discarded after failure");
        }
        for callback in std::mem::take(&mut self.on_failed) {
            callback(&failure);
        }
        self.failure = Some(failure);
    }

    fn release_plugins(&mut self) {
        let session = self.session.id;
        let plugins = Arc::clone(self.context.plugins());
        for url in std::mem::take(&mut self.plugin_urls) {
            match self.context.ledger().release_and_check_last(&url) {
                Ok(true) if self.plugins_in_flight.contains(&url) => {
                    debug!(target: "experience::manager", %session, %url, "last request released while activation in flight");
                }
                Ok(true) => {
                    plugins.deactivate(&url);
                    self.emit(PluginEvent::Deactivated { session, url });
                }
                Ok(false) => {
                    debug!(target: "experience::manager", %session, %url, "plugin still requested by another session");
                }
                Err(err) => {
                    error!(target: "experience::manager", %session, error = %err, "plugin release failed");
                }
            }
        }
    }

    /// A plugin activation issued by an abandoned load finished. The plugin
    /// is deactivated unless some session has requested it since.
    fn on_abandoned_plugin_loaded(&mut self, url: PluginUrl, result: Result<(), PluginError>) {
        let Some(index) = self.abandoned_plugins.iter().position(|pending| *pending == url) else {
            return;
        };
        self.abandoned_plugins.swap_remove(index);
        if result.is_err() || self.context.ledger().request_count(&url) > 0 {
            return;
        }

        let session = self.session.id;
        info!(target: "experience::manager", %session, %url, "deactivating plugin activated by an abandoned load");
        self.context.plugins().deactivate(&url);
        self.emit(PluginEvent::Deactivated { session, url });
    }

    fn begin_deactivation(&mut self) {
        let Some(experience) = self.current.clone() else {
            self.on_all_actions_deactivated();
            return;
        };
        self.transition(LoadState::Deactivating);
        self.expected_pausers = None;
        self.observed_pausers = 0;

        let tx = self.signal_tx.clone();
        let generation = self.generation;
        let notifier: PauseNotifier = Arc::new(move |label: &str| {
            let _ = tx.send(Signal::PauserCompleted {
                generation,
                label: label.to_string(),
            });
        });

        let activation = self.activation.unwrap_or_else(|| {
            ActivationContext::new(self.session.id, self.session.net_mode)
                .with_world(self.session.world)
        });
        let mut ctx = DeactivationContext::new(activation, notifier);
        for action in experience.all_actions() {
            action.on_deactivate(&mut ctx);
            action.on_unregister();
        }

        let expected = ctx.num_pausers();
        self.expected_pausers = Some(expected);
        if expected == self.observed_pausers {
            self.on_all_actions_deactivated();
        } else {
            info!(
                target: "experience::manager",
                session = %self.session.id,
                pausers = expected,
                "waiting for paused deactivations"
            );
        }
    }

    fn on_pauser_completed(&mut self, label: &str) {
        if self.state != LoadState::Deactivating {
            error!(
                target: "experience::manager",
                session = %self.session.id,
                label,
                state = %self.state,
                "pause token completed outside deactivation; ignored"
            );
            return;
        }

        self.observed_pausers += 1;
        debug!(
            target: "experience::manager",
            session = %self.session.id,
            label,
            observed = self.observed_pausers,
            expected = ?self.expected_pausers,
            "pause token completed"
        );

        if self.expected_pausers == Some(self.observed_pausers) {
            self.on_all_actions_deactivated();
        }
    }

    fn on_all_actions_deactivated(&mut self) {
        self.transition(LoadState::Unloaded);
        self.current = None;
        self.failure = None;
        self.activation = None;
        self.expected_pausers = None;
        self.observed_pausers = 0;
        self.abandoned_plugins.append(&mut self.plugins_in_flight);
        self.plugin_failures.clear();
        self.on_failed.clear();

        let dropped = self.on_loaded.clear();
        if dropped > 0 {
            debug!(target: "experience::manager", dropped, "loaded callbacks discarded at teardown");
        }
        info!(target: "experience::manager", session = %self.session.id, "experience unloaded");
    }

    fn current_id(&self) -> PrimaryAssetId {
        self.current
            .as_ref()
            .map(|experience| experience.id().clone())
            .unwrap_or_else(|| PrimaryAssetId::experience(""))
    }

    fn transition(&mut self, to: LoadState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!(
            target: "experience::manager",
            session = %self.session.id,
            %from,
            %to,
            "load state changed"
        );
        self.emit(ExperienceEvent::StateChanged {
            session: self.session.id,
            from,
            to,
        });
    }

    fn emit(&self, event: impl Into<crate::events::Event>) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

impl std::fmt::Debug for ExperienceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperienceManager")
            .field("session", &self.session)
            .field("state", &self.state)
            .field("experience", &self.replicated_experience())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use experience_core::{FeatureAction, NetMode};

    use super::*;
    use crate::assets::{AssetManager, CompletionMode};
    use crate::events::{Event, Topic};
    use crate::plugins::InMemoryPluginSubsystem;

    struct PausesOnce;

    impl FeatureAction for PausesOnce {
        fn name(&self) -> &str {
            "pauses-once"
        }

        fn on_deactivate(&self, ctx: &mut DeactivationContext) {
            ctx.pause("pauses-once").complete();
        }
    }

    fn loaded_manager(bus: &EventBus) -> ExperienceManager {
        let mut assets = AssetManager::new(CompletionMode::Immediate);
        assets.add_experience(Arc::new(
            ExperienceDefinition::builder(PrimaryAssetId::experience("Paused"))
                .action(Arc::new(PausesOnce))
                .build(),
        ));
        let context = ExperienceContext::builder()
            .assets(Arc::new(assets))
            .plugins(Arc::new(InMemoryPluginSubsystem::new(CompletionMode::Immediate)))
            .build()
            .unwrap();
        let (session, world) = context.allocate_session();
        let mut manager =
            ExperienceManager::new(context, SessionInfo::new(session, world, NetMode::Standalone))
                .with_events(bus.clone());
        manager
            .set_current_experience(PrimaryAssetId::experience("Paused"))
            .unwrap();
        manager
    }

    #[test]
    fn extra_pause_completion_after_unload_is_ignored() {
        let bus = EventBus::new();
        let mut manager = loaded_manager(&bus);
        assert_eq!(manager.load_state(), LoadState::Loaded);

        let mut events = bus.subscribe(Topic::Experience);
        manager.end_play();
        assert_eq!(manager.load_state(), LoadState::Unloaded);

        let mut transitions = Vec::new();
        while let Ok(Event::Experience(ExperienceEvent::StateChanged { from, to, .. })) =
            events.try_recv()
        {
            transitions.push((from, to));
        }
        assert_eq!(
            transitions,
            vec![
                (LoadState::Loaded, LoadState::Deactivating),
                (LoadState::Deactivating, LoadState::Unloaded),
            ]
        );

        manager
            .signal_tx
            .send(Signal::PauserCompleted {
                generation: manager.generation,
                label: "pauses-once".to_string(),
            })
            .unwrap();
        assert_eq!(manager.pump(), 1);

        assert_eq!(manager.load_state(), LoadState::Unloaded);
        assert_eq!(manager.outstanding_pausers(), 0);
        assert!(events.try_recv().is_err());
    }
}
