mod common;

use std::sync::Arc;

use common::{Fixture, experience};
use experience_core::{
    ActivationContext, ActorId, FeatureAction, FeatureName, NetMode, PawnData, PrimaryAssetId,
    SessionId, Stage,
};
use experience_runtime::{
    AddComponentsAction, CompletionMode, ComponentEntry, HeroFeature, PawnError,
    PawnExtensionFeature, PawnReadiness, PawnState,
};

const PAWN: ActorId = ActorId(7);
const NAMEPLATE: FeatureName = FeatureName::from_static("Nameplate");

fn hero_data() -> Arc<PawnData> {
    Arc::new(
        PawnData::new(PrimaryAssetId::pawn_data("HeroPawn"), "B_Hero").with_input_config("IC_Hero"),
    )
}

/// Readiness for session 1 with `features` requested on `Character` pawns.
fn readiness(features: &[FeatureName]) -> PawnReadiness {
    let fixture = Fixture::new(CompletionMode::Immediate, vec![experience("X").build()], &[]);
    let action = AddComponentsAction::new(
        "add_character_features",
        vec![ComponentEntry {
            actor_class: "Character".into(),
            features: features.to_vec(),
            client: true,
            server: true,
        }],
        fixture.context.components().clone(),
    );
    action.on_activate(&ActivationContext::new(SessionId(1), NetMode::Standalone));
    PawnReadiness::new(&fixture.context, SessionId(1))
}

#[test]
fn test_pawn_waits_for_pawn_data_then_becomes_ready() {
    let mut pawns = readiness(&[HeroFeature::NAME]);
    pawns
        .spawn_pawn(PAWN, PawnState::local_player("Character"))
        .unwrap();

    assert_eq!(
        pawns.feature_stage(PAWN, &PawnExtensionFeature::NAME),
        Some(Stage::SPAWNED)
    );
    assert_eq!(pawns.feature_stage(PAWN, &HeroFeature::NAME), Some(Stage::AVAILABLE));
    assert!(!pawns.is_ready(PAWN));

    pawns.set_pawn_data(PAWN, hero_data()).unwrap();

    assert!(pawns.is_ready(PAWN));
    let pawn = pawns.pawn(PAWN).unwrap();
    assert!(pawn.ability_system_initialized);
    assert!(pawn.player_input_initialized);
}

#[test]
fn test_hero_waits_for_player_state() {
    let mut pawns = readiness(&[HeroFeature::NAME]);
    let state = PawnState {
        has_player_state: false,
        controller_paired: false,
        pawn_data: Some(hero_data()),
        ..PawnState::local_player("Character")
    };
    pawns.spawn_pawn(PAWN, state).unwrap();

    assert_eq!(pawns.feature_stage(PAWN, &HeroFeature::NAME), Some(Stage::SPAWNED));
    assert_eq!(
        pawns.feature_stage(PAWN, &PawnExtensionFeature::NAME),
        Some(Stage::AVAILABLE)
    );

    pawns
        .update_pawn(PAWN, |pawn| {
            pawn.has_player_state = true;
            pawn.controller_paired = true;
        })
        .unwrap();
    assert!(pawns.is_ready(PAWN));
}

#[test]
fn test_default_initialization_is_idempotent() {
    let mut pawns = readiness(&[HeroFeature::NAME]);
    let state = PawnState {
        pawn_data: Some(hero_data()),
        ..PawnState::local_player("Character")
    };
    let transitions = pawns.spawn_pawn(PAWN, state).unwrap();
    assert_eq!(transitions, 8);
    assert_eq!(pawns.check_default_initialization(PAWN).unwrap(), 0);
}

#[test]
fn test_requested_features_without_implementation_track_the_extension() {
    let mut pawns = readiness(&[NAMEPLATE]);
    pawns
        .spawn_pawn(PAWN, PawnState::local_player("Character"))
        .unwrap();
    assert_eq!(pawns.feature_stage(PAWN, &NAMEPLATE), Some(Stage::SPAWNED));

    pawns.set_pawn_data(PAWN, hero_data()).unwrap();
    assert_eq!(pawns.feature_stage(PAWN, &NAMEPLATE), Some(Stage::READY));
    assert!(pawns.is_ready(PAWN));
}

#[test]
fn test_other_classes_only_get_the_extension() {
    let mut pawns = readiness(&[HeroFeature::NAME]);
    pawns.spawn_pawn(PAWN, PawnState::new("Vehicle")).unwrap();
    assert_eq!(
        pawns.registry().feature_names(PAWN),
        vec![PawnExtensionFeature::NAME]
    );
}

#[test]
fn test_pawn_data_is_set_once_with_authority() {
    let mut pawns = readiness(&[]);
    pawns
        .spawn_pawn(PAWN, PawnState::local_player("Character"))
        .unwrap();
    pawns.set_pawn_data(PAWN, hero_data()).unwrap();
    assert_eq!(
        pawns.set_pawn_data(PAWN, hero_data()),
        Err(PawnError::PawnDataAlreadySet { actor: PAWN })
    );

    let proxy = ActorId(8);
    pawns
        .spawn_pawn(proxy, PawnState { simulated_proxy: true, ..PawnState::new("Character") })
        .unwrap();
    assert_eq!(
        pawns.set_pawn_data(proxy, hero_data()),
        Err(PawnError::NotAuthority { actor: proxy })
    );
}

#[test]
fn test_skipping_a_stage_is_a_protocol_error() {
    let mut pawns = readiness(&[]);
    pawns.spawn_pawn(PAWN, PawnState::new("Character")).unwrap();
    let err = pawns
        .registry_mut()
        .try_advance(PAWN, &PawnExtensionFeature::NAME, Stage::READY)
        .unwrap_err();
    assert!(err.to_string().contains("InitState.GameplayReady"));
}
