use std::collections::HashMap;
use std::sync::Arc;

use experience_core::{
    ActorFeature, ActorFeatureRegistry, ActorId, FeatureName, PawnData, SessionId, Stage,
};
use tracing::{debug, error};

use super::{HeroFeature, PawnError, PawnExtensionFeature, PawnState, TrackingFeature};
use crate::components::ComponentRequests;
use crate::context::ExperienceContext;

/// Creates a fresh feature instance for one pawn.
pub type FeatureConstructor = Box<dyn Fn() -> Box<dyn ActorFeature<PawnState>> + Send + Sync>;

/// Readiness tracking for the pawns of one session.
///
/// Features are attached at spawn from the session's component requests.
/// Names without a registered constructor get a [`TrackingFeature`].
pub struct PawnReadiness {
    registry: ActorFeatureRegistry<PawnState>,
    components: ComponentRequests,
    session: SessionId,
    constructors: HashMap<FeatureName, FeatureConstructor>,
}

impl PawnReadiness {
    pub fn new(context: &ExperienceContext, session: SessionId) -> Self {
        Self {
            registry: ActorFeatureRegistry::new(Arc::clone(context.chain())),
            components: context.components().clone(),
            session,
            constructors: HashMap::new(),
        }
        .with_feature(HeroFeature::NAME, || Box::new(HeroFeature))
    }

    #[must_use]
    pub fn with_feature(
        mut self,
        name: FeatureName,
        constructor: impl Fn() -> Box<dyn ActorFeature<PawnState>> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.insert(name, Box::new(constructor));
        self
    }

    pub fn registry(&self) -> &ActorFeatureRegistry<PawnState> {
        &self.registry
    }

    /// Direct access for features driven outside the default walk.
    pub fn registry_mut(&mut self) -> &mut ActorFeatureRegistry<PawnState> {
        &mut self.registry
    }

    /// Starts tracking a pawn, attaches its features and advances them as far
    /// as they can go.
    pub fn spawn_pawn(&mut self, actor: ActorId, state: PawnState) -> Result<usize, PawnError> {
        let requested = self.components.features_for(self.session, &state.actor_class);
        self.registry.add_actor(actor, state)?;
        self.registry
            .register_feature(actor, Box::new(PawnExtensionFeature))?;

        for name in requested {
            if name == PawnExtensionFeature::NAME {
                continue;
            }
            let feature: Box<dyn ActorFeature<PawnState>> = match self.constructors.get(&name) {
                Some(constructor) => constructor(),
                None => {
                    debug!(target: "experience::pawn", %actor, feature = %name, "no dedicated feature; tracking the pawn extension");
                    Box::new(TrackingFeature::new(name))
                }
            };
            self.registry.register_feature(actor, feature)?;
        }

        self.check_default_initialization(actor)
    }

    /// Advances every other feature first, then the pawn extension, which
    /// waits on all of them.
    pub fn check_default_initialization(&mut self, actor: ActorId) -> Result<usize, PawnError> {
        let mut transitions = 0;
        for name in self.registry.feature_names(actor) {
            if name != PawnExtensionFeature::NAME {
                transitions += self.registry.check_default_advancement(actor, &name)?;
            }
        }
        transitions += self
            .registry
            .check_default_advancement(actor, &PawnExtensionFeature::NAME)?;
        Ok(transitions)
    }

    /// Assigns pawn data. Authority only, and only once per pawn.
    pub fn set_pawn_data(&mut self, actor: ActorId, pawn_data: Arc<PawnData>) -> Result<(), PawnError> {
        let state = self
            .registry
            .actor(actor)
            .ok_or(experience_core::RegistryError::UnknownActor { actor })?;

        if !state.has_authority {
            let err = PawnError::NotAuthority { actor };
            error!(target: "experience::pawn", error = %err, "rejected pawn data");
            return Err(err);
        }
        if let Some(existing) = &state.pawn_data {
            let err = PawnError::PawnDataAlreadySet { actor };
            error!(
                target: "experience::pawn",
                existing = %existing.id,
                requested = %pawn_data.id,
                error = %err,
                "rejected pawn data"
            );
            return Err(err);
        }

        self.registry
            .modify_actor(actor, |state| state.pawn_data = Some(pawn_data))?;
        Ok(())
    }

    /// Mutates pawn facts (controller arrival, player state replication, ...)
    /// and re-runs default advancement.
    pub fn update_pawn(&mut self, actor: ActorId, update: impl FnOnce(&mut PawnState)) -> Result<(), PawnError> {
        self.registry.modify_actor(actor, update)?;
        Ok(())
    }

    pub fn despawn(&mut self, actor: ActorId) -> Option<PawnState> {
        self.registry.remove_actor(actor)
    }

    pub fn pawn(&self, actor: ActorId) -> Option<&PawnState> {
        self.registry.actor(actor)
    }

    pub fn feature_stage(&self, actor: ActorId, feature: &FeatureName) -> Option<Stage> {
        self.registry.feature_stage(actor, feature)
    }

    /// True once every feature on the pawn is gameplay-ready.
    pub fn is_ready(&self, actor: ActorId) -> bool {
        self.registry.have_all_features_reached(actor, Stage::READY)
    }
}
