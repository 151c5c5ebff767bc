//! Practice Mode Integration Tests

use step_tutor::{AppError, GuidanceMode, TutorPhase};

use crate::support::{fixture, ScriptedReply};

#[tokio::test]
async fn test_practice_similar_reuses_detected_topic() {
    let fx = fixture(vec![
        ScriptedReply::Text(vec![
            "[TOPIC: Quadratic Equations] Factor it. Congratulations, you've solved it!",
        ]),
        ScriptedReply::Text(vec!["Here is a similar one: x^2 - 4 = 0"]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();
    fx.tutor
        .start_with_text("x^2 - 5x + 6 = 0".into())
        .await
        .unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Completed);
    let first_id = fx.tutor.current_session().unwrap().id;

    fx.tutor.practice_similar().await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Tutoring);

    let second = fx.tutor.current_session().unwrap();
    assert_ne!(second.id, first_id);
    assert_eq!(second.problem_text, "Practice: Quadratic Equations");

    let requests = fx.gateway.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].practice_mode);
    assert_eq!(
        requests[1].practice_topic.as_deref(),
        Some("Quadratic Equations")
    );
    // Practice problems start from a clean history.
    assert!(requests[1].messages.is_empty());
}

#[tokio::test]
async fn test_practice_similar_requires_a_topic() {
    let fx = fixture(vec![ScriptedReply::Text(vec![
        "No tag here. Congratulations, you've solved it!",
    ])]);
    fx.tutor.select_mode(GuidanceMode::Soft).unwrap();
    fx.tutor.start_with_text("x = 1".into()).await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Completed);

    let err = fx.tutor.practice_similar().await;
    assert!(matches!(err, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_explicit_practice_from_intake() {
    let fx = fixture(vec![ScriptedReply::Text(vec![
        "[TOPIC: Percentages] What is 20% of 50?",
    ])]);
    fx.tutor.select_mode(GuidanceMode::Soft).unwrap();
    fx.tutor
        .start_practice("Percentages".into())
        .await
        .unwrap();

    assert_eq!(fx.tutor.phase(), TutorPhase::Tutoring);
    let requests = fx.gateway.requests();
    assert!(requests[0].practice_mode);
    assert_eq!(requests[0].guidance_mode, "soft");
}

#[tokio::test]
async fn test_start_new_problem_keeps_mode_while_end_session_clears_it() {
    let fx = fixture(vec![
        ScriptedReply::Text(vec!["You've solved it!"]),
        ScriptedReply::Text(vec!["You've solved it again!"]),
    ]);
    fx.tutor.select_mode(GuidanceMode::Guided).unwrap();
    fx.tutor.start_with_text("first".into()).await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Completed);

    fx.tutor.start_new_problem().unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::ProblemIntake);
    assert_eq!(fx.tutor.guidance_mode(), Some(GuidanceMode::Guided));

    fx.tutor.start_with_text("second".into()).await.unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::Completed);

    fx.tutor.end_session().unwrap();
    assert_eq!(fx.tutor.phase(), TutorPhase::ModeSelection);
    assert!(fx.tutor.guidance_mode().is_none());
    assert!(fx.tutor.current_session().is_none());
}
