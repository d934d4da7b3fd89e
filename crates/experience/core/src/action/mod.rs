//! Feature actions: the units of setup and teardown work an experience runs.
//!
//! Actions are shared immutable objects (`Arc<dyn FeatureAction>`) referenced
//! from definitions and action sets, so every callback takes `&self`. Any
//! per-session bookkeeping an action needs lives behind its own lock, keyed by
//! the [`SessionId`](crate::SessionId) carried in the context.

mod context;

pub use context::{ActivationContext, DeactivationContext, PauseNotifier, PauseToken};

use crate::validation::{DataValidation, ValidationContext};

/// A unit of configuration work run when an experience activates.
///
/// The manager calls `on_register`, `on_load` and `on_activate` in that order
/// when the experience finishes loading, and `on_deactivate` then
/// `on_unregister` when the session ends. Only `name` is required.
pub trait FeatureAction: Send + Sync {
    /// Returns a human-readable name for this action (used in logging and content lookup).
    fn name(&self) -> &str;

    fn on_register(&self) {}

    fn on_load(&self) {}

    fn on_activate(&self, _ctx: &ActivationContext) {}

    /// Tears down whatever `on_activate` set up.
    ///
    /// An action that cannot finish synchronously calls
    /// [`DeactivationContext::pause`] and completes the returned token later;
    /// the experience stays in `Deactivating` until every token completes.
    fn on_deactivate(&self, _ctx: &mut DeactivationContext) {}

    fn on_unregister(&self) {}

    /// Authoring-time checks for this action's own data.
    fn validate(&self, _ctx: &mut ValidationContext) -> DataValidation {
        DataValidation::NotValidated
    }
}

impl core::fmt::Debug for dyn FeatureAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("FeatureAction").field(&self.name()).finish()
    }
}
