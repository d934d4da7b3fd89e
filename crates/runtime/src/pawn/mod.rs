//! Pawn readiness: the features that bring a spawned pawn to gameplay-ready.
//!
//! Every pawn carries a [`PawnExtensionFeature`] that coordinates the other
//! features on it. Additional features come from component requests made by
//! the active experience's actions (for example `Hero` on player characters).

mod features;
mod readiness;

pub use features::{HeroFeature, PawnExtensionFeature, TrackingFeature};
pub use readiness::{FeatureConstructor, PawnReadiness};

use std::sync::Arc;

use experience_core::{ActorId, ErrorSeverity, ExperienceErrorKind, PawnData, RegistryError};
use thiserror::Error;

/// Facts about a pawn, its controller and its player state that the
/// readiness predicates inspect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PawnState {
    pub actor_class: String,
    pub alive: bool,
    pub has_authority: bool,
    pub locally_controlled: bool,
    pub bot_controlled: bool,
    /// Replicated copy on a remote machine with no controller of its own.
    pub simulated_proxy: bool,
    pub has_controller: bool,
    /// The controller's player state is the pawn's player state.
    pub controller_paired: bool,
    pub has_player_state: bool,
    pub has_input_component: bool,
    pub has_local_player: bool,
    pub pawn_data: Option<Arc<PawnData>>,

    pub ability_system_initialized: bool,
    pub player_input_initialized: bool,
}

impl PawnState {
    /// A live pawn of `actor_class` with nothing attached yet.
    pub fn new(actor_class: impl Into<String>) -> Self {
        Self {
            actor_class: actor_class.into(),
            alive: true,
            ..Self::default()
        }
    }

    /// A pawn possessed by the local human player on an authoritative machine,
    /// with controller, player state and input all present.
    pub fn local_player(actor_class: impl Into<String>) -> Self {
        Self {
            has_authority: true,
            locally_controlled: true,
            has_controller: true,
            controller_paired: true,
            has_player_state: true,
            has_input_component: true,
            has_local_player: true,
            ..Self::new(actor_class)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PawnError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{actor}: pawn data can only be set with authority")]
    NotAuthority { actor: ActorId },

    #[error("{actor}: pawn data is already set")]
    PawnDataAlreadySet { actor: ActorId },
}

impl ExperienceErrorKind for PawnError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Registry(err) => err.severity(),
            Self::NotAuthority { .. } | Self::PawnDataAlreadySet { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Registry(err) => err.error_code(),
            Self::NotAuthority { .. } => "PAWN_NOT_AUTHORITY",
            Self::PawnDataAlreadySet { .. } => "PAWN_DATA_ALREADY_SET",
        }
    }
}
