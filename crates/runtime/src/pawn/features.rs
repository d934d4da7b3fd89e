use experience_core::{ActorFeature, FeatureName, FeatureView, Stage, StageChange};
use tracing::{debug, warn};

use super::PawnState;

/// Coordinates initialisation of every other feature on a pawn.
///
/// Becomes available once pawn data is present, and initialises only after
/// every feature on the pawn is available.
#[derive(Debug, Default)]
pub struct PawnExtensionFeature;

impl PawnExtensionFeature {
    pub const NAME: FeatureName = FeatureName::from_static("PawnExtension");
}

impl ActorFeature<PawnState> for PawnExtensionFeature {
    fn feature_name(&self) -> FeatureName {
        Self::NAME
    }

    fn can_advance(
        &self,
        pawn: &PawnState,
        _current: Option<Stage>,
        desired: Stage,
        view: &FeatureView<'_>,
    ) -> bool {
        match desired {
            Stage::SPAWNED => pawn.alive,
            Stage::AVAILABLE => {
                if pawn.pawn_data.is_none() {
                    return false;
                }
                // Authority and the owning client both need the controller.
                !(pawn.has_authority || pawn.locally_controlled) || pawn.has_controller
            }
            Stage::INITIALIZED => view.all_reached(Stage::AVAILABLE),
            _ => true,
        }
    }

    fn on_sibling_changed(&mut self, change: &StageChange) -> bool {
        change.stage == Stage::AVAILABLE
    }
}

/// Player-controlled pawn setup: ability system and input.
#[derive(Debug, Default)]
pub struct HeroFeature;

impl HeroFeature {
    pub const NAME: FeatureName = FeatureName::from_static("Hero");
}

impl ActorFeature<PawnState> for HeroFeature {
    fn feature_name(&self) -> FeatureName {
        Self::NAME
    }

    fn can_advance(
        &self,
        pawn: &PawnState,
        _current: Option<Stage>,
        desired: Stage,
        view: &FeatureView<'_>,
    ) -> bool {
        match desired {
            Stage::SPAWNED => pawn.alive,
            Stage::AVAILABLE => {
                if !pawn.has_player_state {
                    return false;
                }
                if !pawn.simulated_proxy && !(pawn.has_controller && pawn.controller_paired) {
                    return false;
                }
                if pawn.locally_controlled && !pawn.bot_controlled {
                    return pawn.has_input_component && pawn.has_local_player;
                }
                true
            }
            Stage::INITIALIZED => {
                pawn.has_player_state
                    && view.has_reached(&PawnExtensionFeature::NAME, Stage::INITIALIZED)
            }
            _ => true,
        }
    }

    fn on_advance(&mut self, pawn: &mut PawnState, _current: Option<Stage>, desired: Stage) {
        if desired != Stage::INITIALIZED {
            return;
        }

        pawn.ability_system_initialized = true;
        if !pawn.locally_controlled {
            return;
        }
        match pawn.pawn_data.as_ref().and_then(|data| data.input_config.as_ref()) {
            Some(config) => {
                pawn.player_input_initialized = true;
                debug!(target: "experience::pawn", input_config = %config, "player input initialized");
            }
            None => warn!(target: "experience::pawn", class = %pawn.actor_class, "pawn data has no input config"),
        }
    }

    fn on_sibling_changed(&mut self, change: &StageChange) -> bool {
        change.feature == PawnExtensionFeature::NAME && change.stage == Stage::INITIALIZED
    }
}

/// A feature with no preconditions of its own that keeps pace with the pawn
/// extension.
#[derive(Debug)]
pub struct TrackingFeature {
    name: FeatureName,
}

impl TrackingFeature {
    pub fn new(name: FeatureName) -> Self {
        Self { name }
    }
}

impl ActorFeature<PawnState> for TrackingFeature {
    fn feature_name(&self) -> FeatureName {
        self.name.clone()
    }

    fn can_advance(
        &self,
        pawn: &PawnState,
        _current: Option<Stage>,
        desired: Stage,
        view: &FeatureView<'_>,
    ) -> bool {
        match desired {
            Stage::SPAWNED => pawn.alive,
            other => view.has_reached(&PawnExtensionFeature::NAME, other),
        }
    }

    fn on_sibling_changed(&mut self, change: &StageChange) -> bool {
        change.feature == PawnExtensionFeature::NAME
    }
}
