//! Per-player state that receives pawn data once the experience loads.

use std::sync::Arc;

use experience_core::{ErrorSeverity, ExperienceErrorKind, PawnData, PrimaryAssetId};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error};

use crate::game_mode::GameMode;
use crate::manager::{ExperienceManager, LoadPriority};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PlayerStateError {
    #[error("pawn data can only be set with authority")]
    NotAuthority,

    #[error("player already has pawn data {existing}")]
    PawnDataAlreadySet { existing: PrimaryAssetId },
}

impl ExperienceErrorKind for PlayerStateError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }
}

#[derive(Debug, Default)]
pub struct PlayerState {
    authority: bool,
    pawn_data: Option<Arc<PawnData>>,
}

pub type SharedPlayerState = Arc<Mutex<PlayerState>>;

impl PlayerState {
    pub fn new(authority: bool) -> Self {
        Self {
            authority,
            pawn_data: None,
        }
    }

    pub fn shared(authority: bool) -> SharedPlayerState {
        Arc::new(Mutex::new(Self::new(authority)))
    }

    pub fn has_authority(&self) -> bool {
        self.authority
    }

    pub fn pawn_data(&self) -> Option<&Arc<PawnData>> {
        self.pawn_data.as_ref()
    }

    /// Assigns pawn data. Allowed once, and only with authority.
    pub fn set_pawn_data(&mut self, pawn_data: Arc<PawnData>) -> Result<(), PlayerStateError> {
        if !self.authority {
            error!(target: "experience::player", pawn_data = %pawn_data.id, "pawn data set without authority");
            return Err(PlayerStateError::NotAuthority);
        }
        if let Some(existing) = &self.pawn_data {
            error!(
                target: "experience::player",
                existing = %existing.id,
                requested = %pawn_data.id,
                "trying to set pawn data on a player state that already has it"
            );
            return Err(PlayerStateError::PawnDataAlreadySet {
                existing: existing.id.clone(),
            });
        }
        debug!(target: "experience::player", pawn_data = %pawn_data.id, "pawn data assigned");
        self.pawn_data = Some(pawn_data);
        Ok(())
    }
}

/// Assigns the player's pawn data when the experience loads, at normal
/// priority.
pub fn register_with_experience(
    player: &SharedPlayerState,
    manager: &mut ExperienceManager,
    game_mode: GameMode,
) {
    let player = Arc::clone(player);
    manager.call_or_register_on_experience_loaded(LoadPriority::Normal, move |experience| {
        let mut state = player.lock();
        if !state.has_authority() {
            return;
        }
        let current = state.pawn_data().cloned();
        if let Some(pawn_data) = game_mode.pawn_data_for_experience(experience, current.as_ref()) {
            // Rejections are logged by `set_pawn_data`.
            let _ = state.set_pawn_data(pawn_data);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero() -> Arc<PawnData> {
        Arc::new(PawnData::new(PrimaryAssetId::pawn_data("Hero"), "B_Hero"))
    }

    #[test]
    fn second_assignment_is_rejected() {
        let mut state = PlayerState::new(true);
        state.set_pawn_data(hero()).unwrap();
        assert_eq!(
            state.set_pawn_data(hero()),
            Err(PlayerStateError::PawnDataAlreadySet {
                existing: PrimaryAssetId::pawn_data("Hero")
            })
        );
    }

    #[test]
    fn clients_cannot_assign() {
        let mut state = PlayerState::new(false);
        assert_eq!(state.set_pawn_data(hero()), Err(PlayerStateError::NotAuthority));
        assert!(state.pawn_data().is_none());
    }
}
