//! Stale Stream Integration Tests
//!
//! A reset while a stream is in flight makes its session stale; everything
//! the stream produces afterwards must be discarded instead of applied.

use std::sync::Arc;

use tokio::sync::Notify;

use step_tutor::{AppError, GuidanceMode, LeaderboardService, TutorPhase};

use crate::support::{celebrations, drain_events, fixture, ScriptedReply};

#[tokio::test]
async fn test_reset_discards_late_completion() {
    let gate = Arc::new(Notify::new());
    let mut fx = fixture(vec![ScriptedReply::Paused(
        vec!["Congratulations! You've solved it."],
        gate.clone(),
    )]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();

    let tutor = fx.tutor.clone();
    let exchange = tokio::spawn(async move { tutor.start_with_text("2x = 4".into()).await });
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    let stale_id = fx.tutor.current_session().unwrap().id;

    // Abandon the problem while the stream is still open.
    fx.tutor.reset();
    assert_eq!(fx.tutor.phase(), TutorPhase::ProblemIntake);

    gate.notify_one();
    exchange.await.unwrap().unwrap();

    // The completion phrase arrived for a superseded session: no phase
    // change, no points, no celebration.
    assert_eq!(fx.tutor.phase(), TutorPhase::ProblemIntake);
    let board = LeaderboardService::new(fx.repo.clone()).leaderboard();
    assert!(board.iter().all(|e| e.user_id != fx.user.id));
    assert!(celebrations(&drain_events(&mut fx.events)).is_empty());

    // The abandoned session keeps the text it received before the reset but
    // is never marked completed.
    let stale = fx.repo.session(&stale_id).unwrap();
    assert!(!stale.is_completed);
}

#[tokio::test]
async fn test_new_problem_after_reset_is_unaffected_by_old_stream() {
    let gate = Arc::new(Notify::new());
    let fx = fixture(vec![
        ScriptedReply::Paused(vec!["old stream"], gate.clone()),
        ScriptedReply::Text(vec!["Fresh start. What do you notice?"]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();

    let tutor = fx.tutor.clone();
    let old = tokio::spawn(async move { tutor.start_with_text("old".into()).await });
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    fx.tutor.reset();

    fx.tutor.start_with_text("new".into()).await.unwrap();
    let new_session = fx.tutor.current_session().unwrap();

    gate.notify_one();
    old.await.unwrap().unwrap();

    // The late stream never leaks into the new session.
    let reloaded = fx.repo.session(&new_session.id).unwrap();
    assert!(reloaded
        .messages
        .iter()
        .all(|m| !m.content.contains("old stream")));
    assert_eq!(
        reloaded.messages.last().unwrap().content,
        "Fresh start. What do you notice?"
    );
}

#[tokio::test]
async fn test_finished_stale_exchange_keeps_the_new_exchange_busy() {
    let old_gate = Arc::new(Notify::new());
    let new_gate = Arc::new(Notify::new());
    let fx = fixture(vec![
        ScriptedReply::Paused(vec!["old"], old_gate.clone()),
        ScriptedReply::Paused(vec!["new"], new_gate.clone()),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();

    let tutor = fx.tutor.clone();
    let old = tokio::spawn(async move { tutor.start_with_text("first".into()).await });
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    // A reset supersedes the old exchange and frees the guard for a new one.
    fx.tutor.reset();
    let tutor = fx.tutor.clone();
    let new = tokio::spawn(async move { tutor.start_with_text("second".into()).await });
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert!(fx.tutor.is_loading());

    // The old exchange finishes while the new one is still streaming. Its
    // epilogue must not release the guard the new exchange now owns.
    old_gate.notify_one();
    old.await.unwrap().unwrap();
    assert!(fx.tutor.is_loading());
    let err = fx.tutor.send_message("too eager".into()).await;
    assert!(matches!(err, Err(AppError::Busy)));

    new_gate.notify_one();
    new.await.unwrap().unwrap();
    assert!(!fx.tutor.is_loading());
}
