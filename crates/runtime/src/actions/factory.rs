use std::collections::HashMap;
use std::sync::Arc;

use experience_content::{ActionFactory, ActionKindSpec, ActionSpec, LoadResult};
use experience_core::{FeatureAction, FeatureName};

use super::{AddComponentsAction, ComponentEntry};
use crate::components::ComponentRequests;

/// Builds the runtime's built-in actions from content specs.
///
/// `Custom` specs are looked up among actions registered with
/// [`with_custom`](Self::with_custom).
pub struct BuiltinActionFactory {
    requests: ComponentRequests,
    custom: HashMap<String, Arc<dyn FeatureAction>>,
}

impl BuiltinActionFactory {
    pub fn new(requests: ComponentRequests) -> Self {
        Self {
            requests,
            custom: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_custom(mut self, action: Arc<dyn FeatureAction>) -> Self {
        self.custom.insert(action.name().to_string(), action);
        self
    }
}

impl ActionFactory for BuiltinActionFactory {
    fn build(&self, spec: &ActionSpec) -> LoadResult<Arc<dyn FeatureAction>> {
        match &spec.kind {
            ActionKindSpec::AddComponents { entries } => {
                let entries = entries
                    .iter()
                    .map(|entry| ComponentEntry {
                        actor_class: entry.actor_class.clone(),
                        features: entry.features.iter().cloned().map(FeatureName::new).collect(),
                        client: entry.client,
                        server: entry.server,
                    })
                    .collect();
                Ok(Arc::new(AddComponentsAction::new(
                    spec.name.clone(),
                    entries,
                    self.requests.clone(),
                )))
            }
            ActionKindSpec::Custom => self
                .custom
                .get(&spec.name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no custom action registered as '{}'", spec.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use experience_content::ComponentEntrySpec;

    use super::*;

    struct Grant;

    impl FeatureAction for Grant {
        fn name(&self) -> &str {
            "grant_abilities"
        }
    }

    #[test]
    fn test_builds_add_components_and_custom_actions() {
        let factory = BuiltinActionFactory::new(ComponentRequests::new()).with_custom(Arc::new(Grant));

        let add = factory
            .build(&ActionSpec {
                name: "add_hero".into(),
                kind: ActionKindSpec::AddComponents {
                    entries: vec![ComponentEntrySpec {
                        actor_class: "Character".into(),
                        features: vec!["Hero".into()],
                        client: true,
                        server: true,
                    }],
                },
            })
            .unwrap();
        assert_eq!(add.name(), "add_hero");

        let custom = factory
            .build(&ActionSpec {
                name: "grant_abilities".into(),
                kind: ActionKindSpec::Custom,
            })
            .unwrap();
        assert_eq!(custom.name(), "grant_abilities");
    }

    #[test]
    fn test_unregistered_custom_action_is_an_error() {
        let factory = BuiltinActionFactory::new(ComponentRequests::new());
        let err = factory
            .build(&ActionSpec {
                name: "mystery".into(),
                kind: ActionKindSpec::Custom,
            })
            .unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }
}
