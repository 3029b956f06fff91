use action_runtime::framework::mock::{EventLog, Phase, RecordingInitializer};
use action_runtime::framework::ErrorType;
use action_runtime::lifecycle::{Orchestrator, OrchestratorState};
use std::sync::Arc;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Each phase follows its own priority, independent of the others.
#[tokio::test]
async fn test_every_phase_follows_its_own_priority() {
    let log = EventLog::new();
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("a", &log).priorities(30, 10, 20)))
        .unwrap();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("b", &log).priorities(10, 20, 30)))
        .unwrap();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("c", &log).priorities(20, 30, 10)))
        .unwrap();

    orchestrator.boot().await.unwrap();
    assert_eq!(orchestrator.state(), OrchestratorState::Running);
    orchestrator.shutdown().await.unwrap();
    assert_eq!(orchestrator.state(), OrchestratorState::Stopped);

    assert_eq!(log.calls(Phase::Initialize), names(&["b", "c", "a"]));
    assert_eq!(log.calls(Phase::Start), names(&["a", "b", "c"]));
    assert_eq!(log.calls(Phase::Stop), names(&["c", "a", "b"]));
}

/// Every initialize hook completes before the first start hook.
#[tokio::test]
async fn test_initialize_phase_completes_before_start_phase() {
    let log = EventLog::new();
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("early", &log).priorities(1, 1, 1)))
        .unwrap();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("late", &log).priorities(2, 2, 2)))
        .unwrap();

    orchestrator.boot().await.unwrap();

    let phases: Vec<Phase> = log.events().into_iter().map(|(phase, _)| phase).collect();
    assert_eq!(phases, vec![Phase::Initialize, Phase::Initialize, Phase::Start, Phase::Start]);
}

/// A failing start stops only what already started, in stop order.
#[tokio::test]
async fn test_start_failure_stops_only_started_components() {
    let log = EventLog::new();
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("db", &log).priorities(1, 10, 50)))
        .unwrap();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("cache", &log).priorities(1, 20, 10)))
        .unwrap();
    orchestrator
        .register(Arc::new(
            RecordingInitializer::new("web", &log)
                .priorities(1, 30, 1)
                .fail_on(Phase::Start),
        ))
        .unwrap();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("jobs", &log).priorities(1, 40, 1)))
        .unwrap();

    let err = orchestrator.boot().await.unwrap_err();
    assert_eq!(err.kind(), ErrorType::ServerStart);
    assert!(err.message().contains("web"));
    assert_eq!(orchestrator.state(), OrchestratorState::Failed);

    assert_eq!(log.calls(Phase::Start), names(&["db", "cache", "web"]));
    assert_eq!(log.calls(Phase::Stop), names(&["cache", "db"]));

    // Nothing left to stop.
    orchestrator.shutdown().await.unwrap();
    assert_eq!(log.calls(Phase::Stop).len(), 2);
}

#[tokio::test]
async fn test_initialize_failure_starts_nothing() {
    let log = EventLog::new();
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("db", &log).priorities(1, 1, 1)))
        .unwrap();
    orchestrator
        .register(Arc::new(
            RecordingInitializer::new("broken", &log)
                .priorities(2, 2, 2)
                .fail_on(Phase::Initialize),
        ))
        .unwrap();

    let err = orchestrator.boot().await.unwrap_err();
    assert_eq!(err.kind(), ErrorType::ServerInitialization);
    assert!(log.calls(Phase::Start).is_empty());
    assert!(log.calls(Phase::Stop).is_empty());
    assert!(orchestrator.services().is_none());
}

/// A failing stop is reported, but every other component still stops.
#[tokio::test]
async fn test_failing_stop_does_not_block_others() {
    let log = EventLog::new();
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(
            RecordingInitializer::new("web", &log)
                .priorities(1, 1, 1)
                .fail_on(Phase::Stop),
        ))
        .unwrap();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("db", &log).priorities(1, 1, 2)))
        .unwrap();

    orchestrator.boot().await.unwrap();
    let err = orchestrator.shutdown().await.unwrap_err();

    assert_eq!(err.kind(), ErrorType::ServerStop);
    assert!(err.message().contains("web"));
    assert_eq!(log.calls(Phase::Stop), names(&["web", "db"]));
    assert_eq!(orchestrator.state(), OrchestratorState::Stopped);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let log = EventLog::new();
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("db", &log)))
        .unwrap();

    orchestrator.boot().await.unwrap();
    orchestrator.shutdown().await.unwrap();
    orchestrator.shutdown().await.unwrap();

    assert_eq!(log.calls(Phase::Stop), names(&["db"]));
}

#[tokio::test]
async fn test_boot_twice_is_rejected() {
    let log = EventLog::new();
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(RecordingInitializer::new("db", &log)))
        .unwrap();

    orchestrator.boot().await.unwrap();
    let err = orchestrator.boot().await.unwrap_err();

    assert_eq!(err.kind(), ErrorType::ServerInitialization);
    assert_eq!(log.calls(Phase::Start), names(&["db"]));
}

#[tokio::test]
async fn test_shutdown_before_boot() {
    let mut orchestrator = Orchestrator::new();
    orchestrator.shutdown().await.unwrap();
    assert_eq!(orchestrator.state(), OrchestratorState::Stopped);
}
