//! QA tests for saving and resuming sessions.

use lovesim_core::persist::SAVE_KEY;
use lovesim_core::testing::{ending, scene};
use lovesim_core::{
    Choice, EngineError, FileSaveStore, GameEngine, GameEvent, GameRules, MockBackend, Progress,
    SaveStore, TestHarness,
};
use tempfile::TempDir;

const SCENARIO: &str = "male-friend";

fn three_scenes() -> MockBackend {
    MockBackend::new()
        .with_scene(
            SCENARIO,
            1,
            scene("Yo, want to grab lunch?", vec![Choice::new("Sure!", 10, 2)]),
        )
        .with_scene(
            SCENARIO,
            2,
            scene("Pizza or ramen?", vec![Choice::new("Ramen", 5, 3)]),
        )
        .with_scene(SCENARIO, 3, ending("Good choice."))
}

// =============================================================================
// TEST 1: Resume within the freshness window
// =============================================================================

#[tokio::test]
async fn test_resume_restores_progress() {
    let mut harness = TestHarness::new(three_scenes());
    harness.start(SCENARIO).await;
    harness.choose(0).await.unwrap();
    let saved = harness.engine.session().cloned().unwrap();

    harness.advance_clock(chrono::Duration::hours(23));
    let mut restarted = harness.restart();
    let progress = restarted.engine.resume_saved().await.unwrap();

    match progress {
        Progress::Continue(scene) => assert_eq!(scene.ai_line, "Pizza or ramen?"),
        other => panic!("expected scene 2, got {other:?}"),
    }
    assert_eq!(restarted.engine.session(), Some(&saved));
    assert_eq!(restarted.favorability(), 60);
    assert_eq!(restarted.history_len(), 1);
    assert!(matches!(
        restarted.events()[0],
        GameEvent::GameStarted { resumed: true, .. }
    ));

    // History keeps growing from where it left off.
    restarted.choose(0).await.unwrap();
    assert_eq!(restarted.history_len(), 2);
}

#[tokio::test]
async fn test_saved_game_peek_leaves_engine_idle() {
    let mut harness = TestHarness::new(three_scenes());
    harness.start(SCENARIO).await;
    harness.choose(0).await.unwrap();

    let restarted = harness.restart();
    let saved = restarted.engine.saved_game().await.unwrap();
    assert_eq!(saved.current_scene_id(), 2);
    assert_eq!(saved.favorability().value(), 60);
    assert!(restarted.engine.session().is_none());
    assert!(restarted.events().is_empty());
}

// =============================================================================
// TEST 2: Stale and finished sessions are not resumed
// =============================================================================

#[tokio::test]
async fn test_save_older_than_a_day_is_ignored() {
    let mut harness = TestHarness::new(three_scenes());
    harness.start(SCENARIO).await;

    harness.advance_clock(chrono::Duration::hours(24));
    let mut restarted = harness.restart();
    assert!(matches!(
        restarted.engine.resume_saved().await,
        Err(EngineError::NothingToResume)
    ));
    assert!(restarted.engine.session().is_none());
}

#[tokio::test]
async fn test_custom_freshness_window() {
    let rules = GameRules {
        save_freshness_hours: 1,
        ..GameRules::default()
    };
    let mut harness = TestHarness::with_rules(three_scenes(), rules);
    harness.start(SCENARIO).await;

    harness.advance_clock(chrono::Duration::minutes(61));
    let mut restarted = harness.restart();
    assert!(restarted.engine.resume_saved().await.is_err());
}

#[tokio::test]
async fn test_finished_game_clears_save() {
    let mut harness = TestHarness::new(three_scenes());
    harness.start(SCENARIO).await;
    assert!(harness.store().contains(SAVE_KEY).await);

    harness.choose(0).await.unwrap();
    let progress = harness.choose(0).await.unwrap();
    assert!(progress.is_finished());
    assert!(!harness.store().contains(SAVE_KEY).await);

    let mut restarted = harness.restart();
    assert!(restarted.engine.resume_saved().await.is_err());
}

#[tokio::test]
async fn test_failed_writes_do_not_interrupt_play() {
    let mut harness = TestHarness::new(three_scenes());
    harness.store().set_fail_writes(true);

    harness.start(SCENARIO).await;
    harness.choose(0).await.unwrap();
    let progress = harness.choose(0).await.unwrap();

    assert!(progress.is_finished());
    assert_eq!(harness.favorability(), 65);
}

// =============================================================================
// TEST 3: File-backed saves
// =============================================================================

#[tokio::test]
async fn test_file_store_resume() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let backend = three_scenes();

    let mut engine = GameEngine::new(
        backend.clone(),
        FileSaveStore::new(temp_dir.path()),
        GameRules::default(),
    );
    engine.start_new_game(SCENARIO).await;
    engine.choose(0).await.unwrap();
    assert!(temp_dir.path().join("loveSimulatorSave.json").exists());

    let mut engine = GameEngine::new(
        backend,
        FileSaveStore::new(temp_dir.path()),
        GameRules::default(),
    );
    engine.resume_saved().await.unwrap();
    let session = engine.session().unwrap();
    assert_eq!(session.current_scene_id(), 2);
    assert_eq!(session.favorability().value(), 60);
}

#[tokio::test]
async fn test_corrupt_file_is_no_save() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = FileSaveStore::new(temp_dir.path());
    store.store(SAVE_KEY, "{\"version\":1").await.unwrap();

    let mut engine = GameEngine::new(three_scenes(), store, GameRules::default());
    assert!(matches!(
        engine.resume_saved().await,
        Err(EngineError::NothingToResume)
    ));
}
