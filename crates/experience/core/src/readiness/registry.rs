use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, error, trace};

use super::chain::{ReadinessChain, Stage};
use super::feature::{ActorFeature, FeatureName, FeatureView, StageChange};
use crate::error::{ErrorSeverity, ExperienceErrorKind};
use crate::ids::ActorId;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{actor} is not tracked by the feature registry")]
    UnknownActor { actor: ActorId },

    #[error("{actor} is already tracked by the feature registry")]
    DuplicateActor { actor: ActorId },

    #[error("feature `{feature}` is not registered on {actor}")]
    UnknownFeature { actor: ActorId, feature: FeatureName },

    #[error("feature `{feature}` is already registered on {actor}")]
    DuplicateFeature { actor: ActorId, feature: FeatureName },

    #[error("feature `{feature}` on {actor} cannot move from {current} to {desired}")]
    StageSkip {
        actor: ActorId,
        feature: FeatureName,
        current: String,
        desired: String,
    },
}

impl ExperienceErrorKind for RegistryError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::StageSkip { .. } => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownActor { .. } => "REGISTRY_UNKNOWN_ACTOR",
            Self::DuplicateActor { .. } => "REGISTRY_DUPLICATE_ACTOR",
            Self::UnknownFeature { .. } => "REGISTRY_UNKNOWN_FEATURE",
            Self::DuplicateFeature { .. } => "REGISTRY_DUPLICATE_FEATURE",
            Self::StageSkip { .. } => "REGISTRY_STAGE_SKIP",
        }
    }
}

type Result<T> = std::result::Result<T, RegistryError>;

/// Tracks the readiness stage of every feature on every actor.
///
/// Stage changes are relayed to the other features of the same actor through
/// a work queue drained before the triggering call returns, so cascades of
/// mutually dependent features settle without recursion.
pub struct ActorFeatureRegistry<A> {
    chain: Arc<ReadinessChain>,
    actors: HashMap<ActorId, ActorEntry<A>>,
}

struct ActorEntry<A> {
    id: ActorId,
    data: A,
    stages: Vec<(FeatureName, Option<Stage>)>,
    features: Vec<Box<dyn ActorFeature<A>>>,
}

impl<A> ActorFeatureRegistry<A> {
    pub fn new(chain: Arc<ReadinessChain>) -> Self {
        Self {
            chain,
            actors: HashMap::new(),
        }
    }

    pub fn chain(&self) -> &Arc<ReadinessChain> {
        &self.chain
    }

    /// Starts tracking an actor. Its features are registered separately.
    pub fn add_actor(&mut self, actor: ActorId, data: A) -> Result<()> {
        if self.actors.contains_key(&actor) {
            return Err(RegistryError::DuplicateActor { actor });
        }
        self.actors.insert(
            actor,
            ActorEntry {
                id: actor,
                data,
                stages: Vec::new(),
                features: Vec::new(),
            },
        );
        Ok(())
    }

    /// Forgets an actor and every feature on it, returning its data.
    pub fn remove_actor(&mut self, actor: ActorId) -> Option<A> {
        self.actors.remove(&actor).map(|entry| entry.data)
    }

    pub fn contains_actor(&self, actor: ActorId) -> bool {
        self.actors.contains_key(&actor)
    }

    pub fn actor(&self, actor: ActorId) -> Option<&A> {
        self.actors.get(&actor).map(|entry| &entry.data)
    }

    /// Mutates actor data, then re-runs default advancement for every
    /// feature since their preconditions may now hold.
    pub fn modify_actor<R>(&mut self, actor: ActorId, f: impl FnOnce(&mut A) -> R) -> Result<R> {
        let entry = self.entry_mut(actor)?;
        let output = f(&mut entry.data);
        self.check_default_advancement_all(actor)?;
        Ok(output)
    }

    /// Adds a feature to an actor without advancing it.
    pub fn register_feature(&mut self, actor: ActorId, feature: Box<dyn ActorFeature<A>>) -> Result<()> {
        let entry = self.entry_mut(actor)?;
        let name = feature.feature_name();
        if entry.index_of(&name).is_some() {
            return Err(RegistryError::DuplicateFeature {
                actor,
                feature: name,
            });
        }
        debug!(target: "experience::readiness", %actor, feature = %name, "feature registered");
        entry.stages.push((name, None));
        entry.features.push(feature);
        Ok(())
    }

    /// Attempts to move `name` to `desired`, which must be the stage right
    /// after its current one.
    ///
    /// Returns `Ok(false)` when the feature's predicate denies the move.
    pub fn try_advance(&mut self, actor: ActorId, name: &FeatureName, desired: Stage) -> Result<bool> {
        let chain = Arc::clone(&self.chain);
        let entry = self.entry_mut(actor)?;
        let index = entry.require_index(name)?;
        let current = entry.stages[index].1;

        if Stage::next_after(current) != Some(desired) {
            let err = RegistryError::StageSkip {
                actor,
                feature: name.clone(),
                current: chain.describe(current).to_string(),
                desired: chain.tag(desired).to_string(),
            };
            error!(target: "experience::readiness", error = %err, "readiness protocol violation");
            return Err(err);
        }

        let mut queue = VecDeque::new();
        let advanced = entry.attempt(index, desired, &chain, &mut queue);
        entry.drain(&chain, &mut queue);
        Ok(advanced)
    }

    /// Walks `name` forward through its remaining stages, stopping at the
    /// first denial. Returns the number of transitions made on the actor,
    /// cascades included.
    pub fn check_default_advancement(&mut self, actor: ActorId, name: &FeatureName) -> Result<usize> {
        let chain = Arc::clone(&self.chain);
        let entry = self.entry_mut(actor)?;
        let index = entry.require_index(name)?;

        let mut queue = VecDeque::new();
        let own = entry.advance_defaults(index, &chain, &mut queue);
        Ok(own + entry.drain(&chain, &mut queue))
    }

    /// Runs default advancement for every feature on the actor in
    /// registration order.
    pub fn check_default_advancement_all(&mut self, actor: ActorId) -> Result<usize> {
        let chain = Arc::clone(&self.chain);
        let entry = self.entry_mut(actor)?;

        let mut queue = VecDeque::new();
        let mut transitions = 0;
        for index in 0..entry.features.len() {
            transitions += entry.advance_defaults(index, &chain, &mut queue);
            transitions += entry.drain(&chain, &mut queue);
        }
        Ok(transitions)
    }

    pub fn feature_stage(&self, actor: ActorId, name: &FeatureName) -> Option<Stage> {
        let entry = self.actors.get(&actor)?;
        entry.index_of(name).and_then(|index| entry.stages[index].1)
    }

    pub fn is_stage_at_least(&self, actor: ActorId, name: &FeatureName, stage: Stage) -> bool {
        self.feature_stage(actor, name)
            .is_some_and(|current| current >= stage)
    }

    /// True when the actor has features and all of them reached `stage`.
    pub fn have_all_features_reached(&self, actor: ActorId, stage: Stage) -> bool {
        self.actors.get(&actor).is_some_and(|entry| {
            !entry.stages.is_empty() && FeatureView::new(&entry.stages, &self.chain).all_reached(stage)
        })
    }

    pub fn feature_names(&self, actor: ActorId) -> Vec<FeatureName> {
        self.actors
            .get(&actor)
            .map(|entry| entry.stages.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    fn entry_mut(&mut self, actor: ActorId) -> Result<&mut ActorEntry<A>> {
        self.actors
            .get_mut(&actor)
            .ok_or(RegistryError::UnknownActor { actor })
    }
}

impl<A> ActorEntry<A> {
    fn index_of(&self, name: &FeatureName) -> Option<usize> {
        self.stages.iter().position(|(candidate, _)| candidate == name)
    }

    fn require_index(&self, name: &FeatureName) -> Result<usize> {
        self.index_of(name).ok_or_else(|| RegistryError::UnknownFeature {
            actor: self.id,
            feature: name.clone(),
        })
    }

    /// Applies one transition if the predicate allows it and queues the
    /// sibling notification.
    fn attempt(
        &mut self,
        index: usize,
        desired: Stage,
        chain: &ReadinessChain,
        queue: &mut VecDeque<(usize, StageChange)>,
    ) -> bool {
        let current = self.stages[index].1;
        let view = FeatureView::new(&self.stages, chain);
        if !self.features[index].can_advance(&self.data, current, desired, &view) {
            trace!(
                target: "experience::readiness",
                actor = %self.id,
                feature = %self.stages[index].0,
                desired = %chain.tag(desired),
                "transition denied"
            );
            return false;
        }

        self.stages[index].1 = Some(desired);
        self.features[index].on_advance(&mut self.data, current, desired);

        let feature = self.stages[index].0.clone();
        debug!(
            target: "experience::readiness",
            actor = %self.id,
            feature = %feature,
            from = chain.describe(current),
            to = %chain.tag(desired),
            "feature advanced"
        );
        queue.push_back((
            index,
            StageChange {
                feature,
                stage: desired,
            },
        ));
        true
    }

    fn advance_defaults(
        &mut self,
        index: usize,
        chain: &ReadinessChain,
        queue: &mut VecDeque<(usize, StageChange)>,
    ) -> usize {
        let mut transitions = 0;
        while let Some(next) = Stage::next_after(self.stages[index].1) {
            if !self.attempt(index, next, chain, queue) {
                break;
            }
            transitions += 1;
        }
        transitions
    }

    /// Delivers queued stage changes to every other feature until no more
    /// transitions happen.
    fn drain(&mut self, chain: &ReadinessChain, queue: &mut VecDeque<(usize, StageChange)>) -> usize {
        let mut transitions = 0;
        while let Some((origin, change)) = queue.pop_front() {
            for index in 0..self.features.len() {
                if index == origin {
                    continue;
                }
                if self.features[index].on_sibling_changed(&change) {
                    transitions += self.advance_defaults(index, chain, queue);
                }
            }
        }
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Flags {
        spawned: bool,
        data: bool,
        initialized_calls: u32,
    }

    /// Needs `data` to become available and waits for every feature to be
    /// available before initialising.
    struct Leader;

    const LEADER: FeatureName = FeatureName::from_static("Leader");
    const FOLLOWER: FeatureName = FeatureName::from_static("Follower");

    impl ActorFeature<Flags> for Leader {
        fn feature_name(&self) -> FeatureName {
            LEADER
        }

        fn can_advance(
            &self,
            actor: &Flags,
            current: Option<Stage>,
            desired: Stage,
            view: &FeatureView<'_>,
        ) -> bool {
            match (current, desired) {
                (None, Stage::SPAWNED) => actor.spawned,
                (Some(Stage::SPAWNED), Stage::AVAILABLE) => actor.data,
                (Some(Stage::AVAILABLE), Stage::INITIALIZED) => view.all_reached(Stage::AVAILABLE),
                (Some(Stage::INITIALIZED), Stage::READY) => true,
                _ => false,
            }
        }

        fn on_advance(&mut self, actor: &mut Flags, _current: Option<Stage>, desired: Stage) {
            if desired == Stage::INITIALIZED {
                actor.initialized_calls += 1;
            }
        }

        fn on_sibling_changed(&mut self, change: &StageChange) -> bool {
            change.stage == Stage::AVAILABLE
        }
    }

    /// Becomes available on spawn and initialises after the leader.
    struct Follower;

    impl ActorFeature<Flags> for Follower {
        fn feature_name(&self) -> FeatureName {
            FOLLOWER
        }

        fn can_advance(
            &self,
            actor: &Flags,
            current: Option<Stage>,
            desired: Stage,
            view: &FeatureView<'_>,
        ) -> bool {
            match (current, desired) {
                (None, Stage::SPAWNED) => actor.spawned,
                (Some(Stage::SPAWNED), Stage::AVAILABLE) => true,
                (Some(Stage::AVAILABLE), Stage::INITIALIZED) => {
                    view.has_reached(&LEADER, Stage::INITIALIZED)
                }
                (Some(Stage::INITIALIZED), Stage::READY) => true,
                _ => false,
            }
        }

        fn on_sibling_changed(&mut self, change: &StageChange) -> bool {
            change.feature == LEADER && change.stage == Stage::INITIALIZED
        }
    }

    fn registry() -> ActorFeatureRegistry<Flags> {
        let mut registry = ActorFeatureRegistry::new(Arc::new(ReadinessChain::default()));
        registry
            .add_actor(
                ActorId(1),
                Flags {
                    spawned: true,
                    ..Flags::default()
                },
            )
            .unwrap();
        registry.register_feature(ActorId(1), Box::new(Leader)).unwrap();
        registry.register_feature(ActorId(1), Box::new(Follower)).unwrap();
        registry
    }

    #[test]
    fn registration_does_not_advance() {
        let registry = registry();
        assert_eq!(registry.feature_stage(ActorId(1), &LEADER), None);
        assert!(!registry.have_all_features_reached(ActorId(1), Stage::SPAWNED));
    }

    #[test]
    fn default_advancement_stops_at_first_denial() {
        let mut registry = registry();
        registry.check_default_advancement(ActorId(1), &LEADER).unwrap();
        assert_eq!(registry.feature_stage(ActorId(1), &LEADER), Some(Stage::SPAWNED));

        registry.check_default_advancement(ActorId(1), &FOLLOWER).unwrap();
        assert_eq!(registry.feature_stage(ActorId(1), &FOLLOWER), Some(Stage::AVAILABLE));
    }

    #[test]
    fn data_arrival_cascades_to_ready() {
        let mut registry = registry();
        registry.check_default_advancement_all(ActorId(1)).unwrap();

        registry
            .modify_actor(ActorId(1), |flags| flags.data = true)
            .unwrap();

        assert!(registry.have_all_features_reached(ActorId(1), Stage::READY));
        assert_eq!(registry.actor(ActorId(1)).unwrap().initialized_calls, 1);
    }

    #[test]
    fn second_default_check_is_idempotent() {
        let mut registry = registry();
        registry
            .modify_actor(ActorId(1), |flags| flags.data = true)
            .unwrap();
        assert_eq!(registry.check_default_advancement_all(ActorId(1)).unwrap(), 0);
        assert_eq!(registry.check_default_advancement(ActorId(1), &LEADER).unwrap(), 0);
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut registry = registry();
        let err = registry
            .try_advance(ActorId(1), &LEADER, Stage::AVAILABLE)
            .unwrap_err();
        assert!(matches!(err, RegistryError::StageSkip { .. }));
        assert_eq!(err.severity(), ErrorSeverity::Internal);
        assert_eq!(registry.feature_stage(ActorId(1), &LEADER), None);
    }

    #[test]
    fn denied_transition_changes_nothing() {
        let mut registry = registry();
        assert!(registry.try_advance(ActorId(1), &LEADER, Stage::SPAWNED).unwrap());
        assert!(!registry.try_advance(ActorId(1), &LEADER, Stage::AVAILABLE).unwrap());
        assert_eq!(registry.feature_stage(ActorId(1), &LEADER), Some(Stage::SPAWNED));
        assert!(registry.is_stage_at_least(ActorId(1), &LEADER, Stage::SPAWNED));
        assert!(!registry.is_stage_at_least(ActorId(1), &LEADER, Stage::AVAILABLE));
    }

    #[test]
    fn duplicate_feature_and_unknown_actor_are_errors() {
        let mut registry = registry();
        assert!(matches!(
            registry.register_feature(ActorId(1), Box::new(Leader)),
            Err(RegistryError::DuplicateFeature { .. })
        ));
        assert!(matches!(
            registry.try_advance(ActorId(9), &LEADER, Stage::SPAWNED),
            Err(RegistryError::UnknownActor { .. })
        ));
    }

    #[test]
    fn removing_an_actor_drops_its_features() {
        let mut registry = registry();
        assert!(registry.remove_actor(ActorId(1)).is_some());
        assert!(registry.feature_names(ActorId(1)).is_empty());
        assert!(!registry.contains_actor(ActorId(1)));
    }
}
