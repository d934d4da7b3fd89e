//! Experience definitions, feature action sets and pawn data.
//!
//! All three are immutable once built. Definitions hold shared references to
//! their action sets and pawn data so several experiences can reuse them.
//! Action slots are `Option` because content may name an action that failed
//! to resolve; such holes are reported by [`ExperienceDefinition::validate`]
//! and skipped at runtime.

use std::collections::HashSet;
use std::sync::Arc;

use crate::action::FeatureAction;
use crate::ids::PrimaryAssetId;
use crate::validation::{DataValidation, ValidationContext};

/// An action list entry; `None` marks an entry that failed to resolve.
pub type ActionSlot = Option<Arc<dyn FeatureAction>>;

/// Data describing which pawn a player spawns as.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PawnData {
    pub id: PrimaryAssetId,
    /// Class spawned for players using this pawn data.
    pub pawn_class: String,
    /// Input configuration bound when player input initialises.
    #[cfg_attr(feature = "serde", serde(default))]
    pub input_config: Option<String>,
}

impl PawnData {
    pub fn new(id: PrimaryAssetId, pawn_class: impl Into<String>) -> Self {
        Self {
            id,
            pawn_class: pawn_class.into(),
            input_config: None,
        }
    }

    #[must_use]
    pub fn with_input_config(mut self, input_config: impl Into<String>) -> Self {
        self.input_config = Some(input_config.into());
        self
    }
}

/// Reusable, ordered list of feature actions with its own asset identity.
#[derive(Debug)]
pub struct FeatureActionSet {
    id: PrimaryAssetId,
    actions: Vec<ActionSlot>,
}

impl FeatureActionSet {
    pub fn new(id: PrimaryAssetId, actions: Vec<ActionSlot>) -> Self {
        Self { id, actions }
    }

    pub fn id(&self) -> &PrimaryAssetId {
        &self.id
    }

    pub fn actions(&self) -> &[ActionSlot] {
        &self.actions
    }

    pub fn validate(&self, ctx: &mut ValidationContext) -> DataValidation {
        validate_actions(&self.actions, &format!("action set {}", self.id), ctx)
    }
}

/// Immutable description of a gameplay experience.
#[derive(Debug)]
pub struct ExperienceDefinition {
    id: PrimaryAssetId,
    plugins: Vec<String>,
    actions: Vec<ActionSlot>,
    action_sets: Vec<Option<Arc<FeatureActionSet>>>,
    default_pawn_data: Option<Arc<PawnData>>,
}

impl ExperienceDefinition {
    pub fn builder(id: PrimaryAssetId) -> ExperienceDefinitionBuilder {
        ExperienceDefinitionBuilder {
            definition: Self {
                id,
                plugins: Vec::new(),
                actions: Vec::new(),
                action_sets: Vec::new(),
                default_pawn_data: None,
            },
        }
    }

    pub fn id(&self) -> &PrimaryAssetId {
        &self.id
    }

    /// Names of the feature plugins this experience enables, in authoring order.
    pub fn plugin_names(&self) -> &[String] {
        &self.plugins
    }

    pub fn actions(&self) -> &[ActionSlot] {
        &self.actions
    }

    pub fn action_sets(&self) -> &[Option<Arc<FeatureActionSet>>] {
        &self.action_sets
    }

    pub fn default_pawn_data(&self) -> Option<&Arc<PawnData>> {
        self.default_pawn_data.as_ref()
    }

    /// Every resolved action in execution order: the flat list first, then
    /// each action set's actions in set order.
    pub fn all_actions(&self) -> impl Iterator<Item = &Arc<dyn FeatureAction>> {
        let sets = self
            .action_sets
            .iter()
            .flatten()
            .flat_map(|set| set.actions().iter());
        self.actions.iter().chain(sets).flatten()
    }

    /// Asset ids loaded as one bundle: this experience plus every referenced
    /// action set, without duplicates.
    pub fn bundle_asset_ids(&self) -> Vec<PrimaryAssetId> {
        let mut seen = HashSet::new();
        std::iter::once(&self.id)
            .chain(self.action_sets.iter().flatten().map(|set| set.id()))
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Reports unresolved action entries, missing action sets and empty
    /// plugin names by index, then lets each action validate itself.
    pub fn validate(&self, ctx: &mut ValidationContext) -> DataValidation {
        let mut result = DataValidation::Valid;

        for (index, name) in self.plugins.iter().enumerate() {
            if name.trim().is_empty() {
                ctx.add_error(format!(
                    "{}: empty plugin name at index {index} in plugins",
                    self.id
                ));
                result = DataValidation::Invalid;
            }
        }

        result = result.combine(validate_actions(
            &self.actions,
            &self.id.to_string(),
            ctx,
        ));

        for (index, set) in self.action_sets.iter().enumerate() {
            match set {
                Some(set) => result = result.combine(set.validate(ctx)),
                None => {
                    ctx.add_error(format!(
                        "{}: unresolved entry at index {index} in action sets",
                        self.id
                    ));
                    result = DataValidation::Invalid;
                }
            }
        }

        result
    }
}

fn validate_actions(
    actions: &[ActionSlot],
    owner: &str,
    ctx: &mut ValidationContext,
) -> DataValidation {
    let mut result = DataValidation::Valid;
    for (index, action) in actions.iter().enumerate() {
        match action {
            Some(action) => result = result.combine(action.validate(ctx)),
            None => {
                ctx.add_error(format!("{owner}: unresolved entry at index {index} in actions"));
                result = DataValidation::Invalid;
            }
        }
    }
    result
}

/// Builder for [`ExperienceDefinition`].
pub struct ExperienceDefinitionBuilder {
    definition: ExperienceDefinition,
}

impl ExperienceDefinitionBuilder {
    pub fn plugin(mut self, name: impl Into<String>) -> Self {
        self.definition.plugins.push(name.into());
        self
    }

    pub fn action(mut self, action: Arc<dyn FeatureAction>) -> Self {
        self.definition.actions.push(Some(action));
        self
    }

    /// Appends a raw slot; content loaders use this to keep unresolved
    /// entries visible to validation.
    pub fn action_slot(mut self, slot: ActionSlot) -> Self {
        self.definition.actions.push(slot);
        self
    }

    pub fn action_set(mut self, set: Arc<FeatureActionSet>) -> Self {
        self.definition.action_sets.push(Some(set));
        self
    }

    pub fn action_set_slot(mut self, slot: Option<Arc<FeatureActionSet>>) -> Self {
        self.definition.action_sets.push(slot);
        self
    }

    pub fn default_pawn_data(mut self, pawn_data: Arc<PawnData>) -> Self {
        self.definition.default_pawn_data = Some(pawn_data);
        self
    }

    pub fn build(self) -> ExperienceDefinition {
        self.definition
    }
}
