//! Integration tests for the timer runtime with the background session writer.

use std::time::Duration;

use pomodoro_core::{
    spawn_session_writer, Database, NullNotifier, PeriodType, SessionQuery, SessionStore,
    Settings, TimerController, TimerRuntime, TimerState,
};
use tokio::sync::watch;

fn one_minute_work() -> Settings {
    let mut settings = Settings::default();
    settings.timer.work_minutes = 1;
    settings
}

#[tokio::test(start_paused = true)]
async fn test_completed_period_reaches_store() {
    let store = SessionStore::new(Database::open_memory().unwrap());
    let mut feed = store.watch_sessions(SessionQuery::All);
    assert!(feed.current().unwrap().is_empty());

    let settings = one_minute_work();
    let (_settings_tx, settings_rx) = watch::channel(settings.clone());
    let runtime = TimerRuntime::new();
    let (sink, writer) = spawn_session_writer(store.clone(), runtime.commands());
    let (handle, join) =
        runtime.spawn(TimerController::new(&settings), settings_rx, sink, NullNotifier);

    let mut state = handle.subscribe();
    handle.start().unwrap();
    state
        .wait_for(|s| s.period == PeriodType::ShortBreak)
        .await
        .unwrap();

    let sessions = feed.changed().await.unwrap().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].period_type, PeriodType::Work);
    assert_eq!(sessions[0].duration_min, 1);
    assert!(sessions[0].completed);

    handle.shutdown().unwrap();
    let controller = join.await.unwrap();
    writer.await.unwrap();
    assert_eq!(controller.state(), TimerState::Idle);
    assert_eq!(controller.engine().completed_work(), 1);
    assert!(controller.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_restored_running_timer_keeps_ticking() {
    let settings = Settings::default();
    let mut controller = TimerController::new(&settings);
    controller.start(chrono::Utc::now());

    let (_settings_tx, settings_rx) = watch::channel(settings);
    let store = SessionStore::new(Database::open_memory().unwrap());
    let runtime = TimerRuntime::new();
    let (sink, _writer) = spawn_session_writer(store, runtime.commands());
    let (handle, _join) = runtime.spawn(controller, settings_rx, sink, NullNotifier);

    tokio::time::sleep(Duration::from_millis(5500)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, TimerState::Running);
    assert_eq!(snapshot.remaining_secs, 1495);
}
