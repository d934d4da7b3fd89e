use experience_core::{
    ActivationContext, DataValidation, DeactivationContext, FeatureAction, FeatureName,
    ValidationContext,
};
use tracing::debug;

use crate::components::{ComponentRequest, ComponentRequests};

/// Features to request on actors of one class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentEntry {
    pub actor_class: String,
    pub features: Vec<FeatureName>,
    /// Apply in sessions that render (anything but a dedicated server).
    pub client: bool,
    /// Apply in sessions with authority.
    pub server: bool,
}

impl ComponentEntry {
    fn applies_to(&self, ctx: &ActivationContext) -> bool {
        let net_mode = ctx.net_mode();
        (self.client && net_mode != experience_core::NetMode::DedicatedServer)
            || (self.server && net_mode.has_authority())
    }
}

/// Requests feature components on actors while the experience is active.
pub struct AddComponentsAction {
    name: String,
    entries: Vec<ComponentEntry>,
    requests: ComponentRequests,
}

impl AddComponentsAction {
    pub fn new(name: impl Into<String>, entries: Vec<ComponentEntry>, requests: ComponentRequests) -> Self {
        Self {
            name: name.into(),
            entries,
            requests,
        }
    }

    pub fn entries(&self) -> &[ComponentEntry] {
        &self.entries
    }
}

impl FeatureAction for AddComponentsAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_activate(&self, ctx: &ActivationContext) {
        for entry in self.entries.iter().filter(|entry| entry.applies_to(ctx)) {
            for feature in &entry.features {
                self.requests.add(
                    ctx.session(),
                    ComponentRequest {
                        action: self.name.clone(),
                        actor_class: entry.actor_class.clone(),
                        feature: feature.clone(),
                    },
                );
            }
        }
        debug!(target: "experience::actions", action = %self.name, session = %ctx.session(), "component requests added");
    }

    fn on_deactivate(&self, ctx: &mut DeactivationContext) {
        let removed = self.requests.remove_action(ctx.session(), &self.name);
        debug!(target: "experience::actions", action = %self.name, session = %ctx.session(), removed, "component requests removed");
    }

    fn validate(&self, ctx: &mut ValidationContext) -> DataValidation {
        let mut result = DataValidation::Valid;
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.actor_class.is_empty() {
                ctx.add_error(format!("{}: empty actor class at index {index} in entries", self.name));
                result = DataValidation::Invalid;
            }
            if entry.features.is_empty() {
                ctx.add_error(format!("{}: no features at index {index} in entries", self.name));
                result = DataValidation::Invalid;
            }
        }
        result
    }
}
