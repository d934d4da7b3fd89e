use std::sync::Arc;

use crate::ids::{NetMode, SessionId, WorldContextHandle};

/// Identity of the session an action is being activated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationContext {
    session: SessionId,
    world: Option<WorldContextHandle>,
    net_mode: NetMode,
}

impl ActivationContext {
    pub const fn new(session: SessionId, net_mode: NetMode) -> Self {
        Self {
            session,
            world: None,
            net_mode,
        }
    }

    #[must_use]
    pub const fn with_world(mut self, world: WorldContextHandle) -> Self {
        self.world = Some(world);
        self
    }

    pub const fn session(&self) -> SessionId {
        self.session
    }

    pub const fn world(&self) -> Option<WorldContextHandle> {
        self.world
    }

    pub const fn net_mode(&self) -> NetMode {
        self.net_mode
    }

    /// True when an effect targeted at `world` belongs to this activation.
    /// A context without a world applies everywhere.
    pub fn should_apply_to_world(&self, world: WorldContextHandle) -> bool {
        self.world.is_none_or(|own| own == world)
    }
}

/// Callback invoked once per completed pause token with the token's label.
pub type PauseNotifier = Arc<dyn Fn(&str) + Send + Sync>;

/// Context handed to [`FeatureAction::on_deactivate`](super::FeatureAction::on_deactivate).
///
/// Counts every [`pause`](Self::pause) so the manager can read the number of
/// outstanding pausers once all actions have been walked.
pub struct DeactivationContext {
    activation: ActivationContext,
    pausers: usize,
    notifier: PauseNotifier,
}

impl DeactivationContext {
    pub fn new(activation: ActivationContext, notifier: PauseNotifier) -> Self {
        Self {
            activation,
            pausers: 0,
            notifier,
        }
    }

    pub const fn session(&self) -> SessionId {
        self.activation.session
    }

    pub const fn world(&self) -> Option<WorldContextHandle> {
        self.activation.world
    }

    pub const fn activation(&self) -> &ActivationContext {
        &self.activation
    }

    /// Requests that deactivation wait for the returned token.
    pub fn pause(&mut self, label: impl Into<String>) -> PauseToken {
        self.pausers += 1;
        PauseToken {
            label: label.into(),
            notifier: Some(Arc::clone(&self.notifier)),
        }
    }

    /// Number of pause tokens handed out so far.
    pub const fn num_pausers(&self) -> usize {
        self.pausers
    }
}

/// Outstanding asynchronous deactivation.
///
/// Completing consumes the token, so each pauser reports exactly once. A token
/// dropped without completing leaves the experience stuck in `Deactivating`
/// and is logged as an error.
#[must_use = "deactivation waits until this token is completed"]
pub struct PauseToken {
    label: String,
    notifier: Option<PauseNotifier>,
}

impl PauseToken {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reports that the paused deactivation has finished.
    pub fn complete(mut self) {
        if let Some(notifier) = self.notifier.take() {
            notifier(&self.label);
        }
    }
}

impl Drop for PauseToken {
    fn drop(&mut self) {
        if self.notifier.is_some() {
            tracing::error!(
                target: "experience::manager",
                label = %self.label,
                "pause token dropped without completing; experience deactivation will stall"
            );
        }
    }
}

impl core::fmt::Debug for PauseToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PauseToken")
            .field("label", &self.label)
            .field("completed", &self.notifier.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn pause_counts_and_completion_notifies_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let notifier: PauseNotifier = Arc::new(move |label: &str| {
            sink.lock().unwrap().push(label.to_string());
        });

        let activation = ActivationContext::new(SessionId(1), NetMode::Standalone);
        let mut ctx = DeactivationContext::new(activation, notifier);
        let first = ctx.pause("first");
        let second = ctx.pause("second");
        assert_eq!(ctx.num_pausers(), 2);

        second.complete();
        first.complete();
        assert_eq!(*seen.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn world_filter_accepts_everything_without_world() {
        let ctx = ActivationContext::new(SessionId(1), NetMode::Standalone);
        assert!(ctx.should_apply_to_world(WorldContextHandle(3)));

        let scoped = ctx.with_world(WorldContextHandle(7));
        assert!(scoped.should_apply_to_world(WorldContextHandle(7)));
        assert!(!scoped.should_apply_to_world(WorldContextHandle(3)));
    }
}
