//! Session Lifecycle Integration Tests
//!
//! The full path from mode selection through a completed problem: streamed
//! deltas landing in the persisted session, topic detection, scoring, and
//! failure surfacing.

use std::sync::Arc;

use tokio::sync::Notify;

use step_tutor::{
    AppError, GuidanceMode, LeaderboardService, MessageRole, TopicService, TutorEvent, TutorPhase,
};

use crate::support::{celebrations, drain_events, fixture, ScriptedReply};

#[tokio::test]
async fn test_guided_completion_awards_full_points() {
    let mut fx = fixture(vec![
        ScriptedReply::Text(vec!["[TOPIC: Algebra] ", "Subtract 3 from both sides."]),
        ScriptedReply::Text(vec!["Congratulations! ", "You've solved it."]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();
    fx.tutor.start_with_text("2x + 3 = 7".into()).await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Tutoring);

    fx.tutor.send_message("x = 2".into()).await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Completed);

    let session = fx.tutor.current_session().unwrap();
    assert!(session.is_completed);
    assert_eq!(session.topic.as_deref(), Some("Algebra"));

    let board = LeaderboardService::new(fx.repo.clone()).leaderboard();
    let entry = board.iter().find(|e| e.user_id == fx.user.id).unwrap();
    assert_eq!(entry.score, 100);

    let events = drain_events(&mut fx.events);
    assert_eq!(celebrations(&events), vec![(100, 1, 1)]);
    assert!(events
        .iter()
        .any(|e| matches!(e, TutorEvent::SessionCompleted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, TutorEvent::TopicDetected { topic, .. } if topic == "Algebra")));
}

#[tokio::test]
async fn test_soft_mode_awards_half_points() {
    let mut fx = fixture(vec![ScriptedReply::Text(vec![
        "Excellent work, you've solved the equation!",
    ])]);
    fx.tutor.select_mode(GuidanceMode::Soft).unwrap();
    fx.tutor.start_with_text("x - 1 = 0".into()).await.unwrap();

    let events = drain_events(&mut fx.events);
    assert_eq!(celebrations(&events), vec![(50, 1, 1)]);
    assert_eq!(fx.tutor.phase(), TutorPhase::Completed);
}

#[tokio::test]
async fn test_streamed_deltas_collapse_into_one_bot_message() {
    let fx = fixture(vec![
        ScriptedReply::Text(vec!["First ", "think ", "about ", "the constant."]),
        ScriptedReply::Text(vec!["Good. ", "Now divide."]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();
    fx.tutor.start_with_text("2x + 3 = 7".into()).await.unwrap();
    fx.tutor.send_message("subtract 3".into()).await.unwrap();

    let session = fx.tutor.current_session().unwrap();
    let roles: Vec<MessageRole> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::Student,
            MessageRole::Bot,
            MessageRole::Student,
            MessageRole::Bot,
        ]
    );
    assert_eq!(session.messages[1].content, "First think about the constant.");
    assert_eq!(session.messages[3].content, "Good. Now divide.");
}

#[tokio::test]
async fn test_topic_registered_before_completion_then_scored() {
    let fx = fixture(vec![
        ScriptedReply::Text(vec!["[TOPIC: Fractions] Find a common denominator."]),
        ScriptedReply::Text(vec!["Congratulations, problem is complete!"]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();
    fx.tutor.start_with_text("1/2 + 1/3".into()).await.unwrap();

    // Detection registers the topic with zeroed counters.
    let topics = TopicService::new(fx.repo.clone());
    let stats = topics.user_topic_stats(&fx.user.id);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].topic, "Fractions");
    assert_eq!(stats[0].total_questions, 0);

    fx.tutor.send_message("5/6".into()).await.unwrap();

    let stats = topics.user_topic_stats(&fx.user.id);
    assert_eq!(stats[0].total_questions, 1);
    assert_eq!(stats[0].correctly_answered, 1);
}

#[tokio::test]
async fn test_completion_without_topic_awards_points_only() {
    let mut fx = fixture(vec![ScriptedReply::Text(vec![
        "Congratulations! You've solved it.",
    ])]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();
    fx.tutor.start_with_text("x = ?".into()).await.unwrap();

    let events = drain_events(&mut fx.events);
    assert_eq!(celebrations(&events).len(), 1);
    assert!(TopicService::new(fx.repo.clone())
        .user_topic_stats(&fx.user.id)
        .is_empty());
}

#[tokio::test]
async fn test_no_message_accepted_after_completion() {
    let fx = fixture(vec![ScriptedReply::Text(vec!["You've solved it!"])]);
    fx.tutor.select_mode(GuidanceMode::Soft).unwrap();
    fx.tutor.start_with_text("done already".into()).await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Completed);

    let err = fx.tutor.send_message("hello?".into()).await;
    assert!(matches!(err, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_concurrent_request_is_rejected_as_busy() {
    let gate = Arc::new(Notify::new());
    let fx = fixture(vec![
        ScriptedReply::Paused(vec!["Thinking..."], gate.clone()),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();

    let tutor = fx.tutor.clone();
    let first = tokio::spawn(async move { tutor.start_with_text("2x = 4".into()).await });
    // Let the first exchange reach the paused stream.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert!(fx.tutor.is_loading());

    let err = fx.tutor.send_message("too eager".into()).await;
    assert!(matches!(err, Err(AppError::Busy)));

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert!(!fx.tutor.is_loading());
}

#[tokio::test]
async fn test_gateway_failure_surfaces_notice_and_clears_loading() {
    let mut fx = fixture(vec![
        ScriptedReply::Fail(429),
        ScriptedReply::Text(vec!["Back again. What's the first step?"]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();

    let err = fx.tutor.start_with_text("2x = 4".into()).await;
    assert!(matches!(err, Err(AppError::Gateway(_))));
    assert!(!fx.tutor.is_loading());

    let events = drain_events(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        TutorEvent::Notice { message }
            if message == "Rate limit exceeded. Please wait a moment and try again."
    )));

    // The failed exchange does not wedge the session; a retry goes through.
    fx.tutor.send_message("retrying".into()).await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Tutoring);
}

#[tokio::test]
async fn test_send_message_replays_full_history() {
    let fx = fixture(vec![
        ScriptedReply::Text(vec!["Start with the constant."]),
        ScriptedReply::Text(vec!["Right, keep going."]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();
    fx.tutor.start_with_text("2x + 3 = 7".into()).await.unwrap();
    fx.tutor.send_message("subtract 3".into()).await.unwrap();

    let requests = fx.gateway.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 1);
    // problem, first reply, answer
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[2].content, "subtract 3");
    assert_eq!(requests[1].guidance_mode, "guided");
}
