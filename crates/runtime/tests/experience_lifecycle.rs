mod common;

use std::sync::Arc;

use common::{Fixture, Log, RecordingAction, action_set, experience};
use experience_core::{NetMode, PrimaryAssetId};
use experience_runtime::{
    CompletionMode, Event, EventBus, ExperienceEvent, InMemoryPluginSubsystem, LoadFailure,
    LoadPriority, LoadState, ManagerError, Topic,
};
use parking_lot::Mutex;

fn shooter(log: &Log) -> experience_core::ExperienceDefinition {
    experience("Shooter")
        .plugin("ShooterCore")
        .action(RecordingAction::new("scoring", log))
        .action_set(action_set(
            "SharedHero",
            vec![RecordingAction::new("hero", log), RecordingAction::new("nameplate", log)],
        ))
        .build()
}

fn state_changes(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<LoadState> {
    let mut states = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::Experience(ExperienceEvent::StateChanged { to, .. }) = event {
            states.push(to);
        }
    }
    states
}

#[test]
fn test_load_states_visited_in_order() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Immediate, vec![shooter(&log)], &["ShooterCore"]);
    let bus = EventBus::new();
    let mut rx = bus.subscribe(Topic::Experience);
    let mut manager = fixture.manager(NetMode::Standalone).with_events(bus);

    assert_eq!(manager.load_state(), LoadState::Unloaded);
    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .expect("experience should load");

    assert_eq!(
        state_changes(&mut rx),
        vec![
            LoadState::Loading,
            LoadState::LoadingFeatures,
            LoadState::ExecutingActions,
            LoadState::Loaded,
        ]
    );
    assert!(manager.is_experience_loaded());
    assert_eq!(
        manager.loaded_experience().unwrap().id(),
        &PrimaryAssetId::experience("Shooter")
    );
}

#[test]
fn test_actions_run_flat_list_then_sets() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Immediate, vec![shooter(&log)], &["ShooterCore"]);
    let mut manager = fixture.manager(NetMode::Standalone);

    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();

    assert_eq!(
        log.entries(),
        vec![
            "register:scoring",
            "load:scoring",
            "activate:scoring",
            "register:hero",
            "load:hero",
            "activate:hero",
            "register:nameplate",
            "load:nameplate",
            "activate:nameplate",
        ]
    );
}

#[test]
fn test_priorities_fire_high_normal_low() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Deferred, vec![shooter(&log)], &["ShooterCore"]);
    let mut manager = fixture.manager(NetMode::Standalone);
    let order = Arc::new(Mutex::new(Vec::new()));

    for (priority, label) in [
        (LoadPriority::Low, "low"),
        (LoadPriority::Normal, "normal"),
        (LoadPriority::High, "high"),
        (LoadPriority::Low, "low-2"),
    ] {
        let order = Arc::clone(&order);
        manager.call_or_register_on_experience_loaded(priority, move |_| order.lock().push(label));
    }

    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();
    assert_eq!(manager.load_state(), LoadState::Loading);
    assert!(order.lock().is_empty());

    fixture.assets.process_pending();
    manager.pump();
    assert_eq!(manager.load_state(), LoadState::LoadingFeatures);

    fixture.plugins.process_pending();
    manager.pump();
    assert_eq!(manager.load_state(), LoadState::Loaded);
    assert_eq!(*order.lock(), vec!["high", "normal", "low", "low-2"]);
}

#[test]
fn test_call_or_register_after_load_fires_synchronously_once() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Immediate, vec![shooter(&log)], &["ShooterCore"]);
    let mut manager = fixture.manager(NetMode::Standalone);
    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();

    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    manager.call_or_register_on_experience_loaded_low_priority(move |experience| {
        assert_eq!(experience.id().name(), "Shooter");
        *counter.lock() += 1;
    });
    assert_eq!(*calls.lock(), 1);

    manager.pump();
    assert_eq!(*calls.lock(), 1);
}

#[test]
fn test_cancelled_bundle_load_still_completes() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Deferred, vec![shooter(&log)], &["ShooterCore"]);
    let mut manager = fixture.manager(NetMode::DedicatedServer);
    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();

    assert_eq!(fixture.assets.cancel_pending(), 1);
    manager.pump();
    fixture.plugins.process_pending();
    manager.pump();

    assert_eq!(manager.load_state(), LoadState::Loaded);
}

#[test]
fn test_bundle_failure_enters_failed_state() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Deferred, vec![shooter(&log)], &["ShooterCore"]);
    let mut manager = fixture.manager(NetMode::Standalone);

    let loaded = Arc::new(Mutex::new(false));
    let loaded_flag = Arc::clone(&loaded);
    manager.call_or_register_on_experience_loaded_high_priority(move |_| *loaded_flag.lock() = true);

    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    manager.call_or_register_on_experience_load_failed(move |failure| sink.lock().push(failure.clone()));

    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();
    fixture.assets.fail_pending("corrupt pak");
    manager.pump();

    assert_eq!(manager.load_state(), LoadState::Failed);
    assert!(!*loaded.lock());
    assert!(log.entries().is_empty());
    assert!(matches!(
        failures.lock().as_slice(),
        [LoadFailure::Bundle { reason, .. }] if reason == "corrupt pak"
    ));

    // Late subscribers learn about the failure right away.
    let late = Arc::new(Mutex::new(false));
    let late_flag = Arc::clone(&late);
    manager.call_or_register_on_experience_load_failed(move |_| *late_flag.lock() = true);
    assert!(*late.lock());

    manager.end_play();
    assert_eq!(manager.load_state(), LoadState::Unloaded);
    assert!(manager.load_failure().is_none());
}

#[test]
fn test_plugin_failure_enters_failed_state() {
    let log = Log::default();
    let fixture = Fixture::with_plugins(CompletionMode::Immediate, vec![shooter(&log)], |plugins| {
        plugins.with_failing_plugin("ShooterCore", "missing module")
    });
    let mut manager = fixture.manager(NetMode::Standalone);
    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();

    assert_eq!(manager.load_state(), LoadState::Failed);
    match manager.load_failure() {
        Some(LoadFailure::Plugins { failures, .. }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, InMemoryPluginSubsystem::url_for("ShooterCore"));
        }
        other => panic!("unexpected failure: {other:?}"),
    }
    assert!(log.entries().is_empty());
    assert_eq!(manager.loaded_experience().unwrap_err(), ManagerError::NotLoaded);
}

#[test]
fn test_unresolved_plugins_are_skipped() {
    let log = Log::default();
    let definition = experience("Sandbox")
        .plugin("NotInstalled")
        .action(RecordingAction::new("a", &log))
        .build();
    let fixture = Fixture::new(CompletionMode::Immediate, vec![definition], &[]);
    let mut manager = fixture.manager(NetMode::Standalone);

    manager
        .set_current_experience(PrimaryAssetId::experience("Sandbox"))
        .unwrap();

    assert!(manager.is_experience_loaded());
    assert!(manager.plugin_urls().is_empty());
    assert!(fixture.context.ledger().is_empty());
}

#[test]
fn test_duplicate_plugin_names_register_once() {
    let definition = experience("Twice").plugin("A").plugin("A").build();
    let fixture = Fixture::new(CompletionMode::Immediate, vec![definition], &["A"]);
    let mut manager = fixture.manager(NetMode::Standalone);

    manager
        .set_current_experience(PrimaryAssetId::experience("Twice"))
        .unwrap();

    let url = InMemoryPluginSubsystem::url_for("A");
    assert_eq!(manager.plugin_urls(), std::slice::from_ref(&url));
    assert_eq!(fixture.context.ledger().request_count(&url), 1);
}

#[test]
fn test_setting_experience_twice_is_rejected() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Immediate, vec![shooter(&log)], &["ShooterCore"]);
    let mut manager = fixture.manager(NetMode::Standalone);
    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();

    let err = manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap_err();
    assert_eq!(
        err,
        ManagerError::AlreadyActive {
            state: LoadState::Loaded,
            current: Some(PrimaryAssetId::experience("Shooter")),
        }
    );
}

#[test]
fn test_unknown_experience_is_rejected() {
    let fixture = Fixture::new(CompletionMode::Immediate, Vec::new(), &[]);
    let mut manager = fixture.manager(NetMode::Standalone);

    let err = manager
        .set_current_experience(PrimaryAssetId::experience("Missing"))
        .unwrap_err();
    assert!(matches!(err, ManagerError::UnknownExperience { .. }));
    assert_eq!(manager.load_state(), LoadState::Unloaded);
    assert!(manager.current_experience().is_none());
}

#[test]
fn test_end_play_during_load_discards_late_completions() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Deferred, vec![shooter(&log)], &["ShooterCore"]);
    let mut manager = fixture.manager(NetMode::Standalone);
    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();

    manager.end_play();
    assert_eq!(manager.load_state(), LoadState::Unloaded);

    fixture.assets.process_pending();
    assert_eq!(manager.pump(), 1);
    assert_eq!(manager.load_state(), LoadState::Unloaded);
    assert!(log.entries().is_empty());
}

#[test]
fn test_plugin_activated_after_abandoned_load_is_deactivated() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Deferred, vec![shooter(&log)], &["ShooterCore"]);
    let url = InMemoryPluginSubsystem::url_for("ShooterCore");
    let mut manager = fixture.manager(NetMode::Standalone);
    manager
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();
    fixture.assets.process_pending();
    manager.pump();
    assert_eq!(manager.load_state(), LoadState::LoadingFeatures);

    manager.end_play();
    assert_eq!(manager.load_state(), LoadState::Unloaded);
    assert_eq!(fixture.context.ledger().request_count(&url), 0);

    assert_eq!(fixture.plugins.process_pending(), 1);
    assert_eq!(manager.pump(), 1);
    assert!(!fixture.plugins.is_active(&url));
    assert_eq!(fixture.plugins.activation_count(&url), 1);
    assert_eq!(fixture.plugins.deactivation_count(&url), 1);
    assert_eq!(manager.load_state(), LoadState::Unloaded);
    assert!(log.entries().is_empty());
}

#[test]
fn test_abandoned_plugin_stays_active_when_requested_again() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Deferred, vec![shooter(&log)], &["ShooterCore"]);
    let url = InMemoryPluginSubsystem::url_for("ShooterCore");
    let mut first = fixture.manager(NetMode::Standalone);
    let mut second = fixture.manager(NetMode::Standalone);

    first
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();
    fixture.assets.process_pending();
    first.pump();
    first.end_play();

    second
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();
    fixture.assets.process_pending();
    second.pump();
    assert_eq!(second.load_state(), LoadState::LoadingFeatures);
    assert_eq!(fixture.context.ledger().request_count(&url), 1);

    fixture.plugins.process_pending();
    first.pump();
    second.pump();
    assert_eq!(second.load_state(), LoadState::Loaded);
    assert!(fixture.plugins.is_active(&url));
    assert_eq!(fixture.plugins.deactivation_count(&url), 0);

    second.end_play();
    assert!(!fixture.plugins.is_active(&url));
    assert_eq!(fixture.plugins.deactivation_count(&url), 1);
}

#[test]
fn test_observers_follow_the_replicated_experience() {
    let log = Log::default();
    let fixture = Fixture::new(CompletionMode::Immediate, vec![shooter(&log)], &["ShooterCore"]);
    let mut server = fixture.manager(NetMode::DedicatedServer);
    let mut client = fixture.manager(NetMode::Client);

    server
        .set_current_experience(PrimaryAssetId::experience("Shooter"))
        .unwrap();
    let replicated = server.replicated_experience().cloned().expect("authority replicates its experience");

    client.on_replicated_experience(replicated.clone()).unwrap();
    assert!(client.is_experience_loaded());

    // Repeated replication of the same id is a no-op.
    client.on_replicated_experience(replicated).unwrap();
    assert_eq!(client.load_state(), LoadState::Loaded);
}
