use relay_openai::fake::{FakeAssistants, FakeOp, RunScript};
use relay_openai::{ClientError, MessageRole, RunStatus};
use relay_turn::{PollPolicy, TurnError, TurnOrchestrator, TurnStage};
use std::sync::Arc;
use std::time::Duration;

fn fast_policy() -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(1))
}

fn setup() -> (Arc<FakeAssistants>, TurnOrchestrator) {
    let fake = Arc::new(FakeAssistants::new());
    fake.insert_thread("T1");
    let orchestrator = TurnOrchestrator::new(fake.clone(), fast_policy());
    (fake, orchestrator)
}

fn server_error() -> ClientError {
    ClientError::Api {
        status: 503,
        message: "upstream unavailable".to_string(),
    }
}

#[tokio::test]
async fn test_completed_run_returns_reply() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::completes_with("hi there"));

    let reply = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap();

    assert_eq!(reply.text, "hi there");
    assert_eq!(reply.thread_id, "T1");
    assert_eq!(reply.polls, 2);
    assert_eq!(fake.runs_created(), 1);

    let messages = fake.messages("T1");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].text(), "hello");
}

#[tokio::test]
async fn test_failed_run_reports_status() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::new(vec![
        RunStatus::Queued,
        RunStatus::InProgress,
        RunStatus::Failed,
    ]));

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    match err {
        TurnError::RunFailure { status, .. } => assert_eq!(status, RunStatus::Failed),
        other => panic!("Expected RunFailure, got {:?}", other),
    }
    assert_eq!(fake.runs_created(), 1);
    // no assistant message was added
    assert_eq!(fake.messages("T1").len(), 1);
}

#[tokio::test]
async fn test_every_terminal_failure_is_reported_verbatim() {
    for status in [RunStatus::Cancelled, RunStatus::Expired, RunStatus::Incomplete] {
        let (fake, orchestrator) = setup();
        fake.script_run(RunScript::new(vec![RunStatus::InProgress, status.clone()]));

        let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();
        assert_eq!(err.run_status(), Some(status.clone()), "{}", status);
        assert!(matches!(err, TurnError::RunFailure { .. }));
    }
}

#[tokio::test]
async fn test_requires_action_fails_and_cancels_run() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::new(vec![
        RunStatus::Queued,
        RunStatus::RequiresAction,
    ]));

    let err = orchestrator.execute_turn("T1", "A1", "use a tool").await.unwrap_err();

    assert_eq!(err.run_status(), Some(RunStatus::RequiresAction));
    assert_eq!(fake.cancelled_runs().len(), 1);
}

#[tokio::test]
async fn test_completed_without_reply_is_distinct_error() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::new(vec![RunStatus::Queued, RunStatus::Completed]));

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    assert!(matches!(err, TurnError::NoAssistantReply { .. }));
}

#[tokio::test]
async fn test_old_assistant_reply_is_not_reused() {
    let (fake, orchestrator) = setup();
    fake.insert_message("T1", MessageRole::User, "earlier question");
    fake.insert_message("T1", MessageRole::Assistant, "earlier answer");
    fake.script_run(RunScript::new(vec![RunStatus::Completed]));

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    assert!(matches!(err, TurnError::NoAssistantReply { .. }));
}

#[tokio::test]
async fn test_endless_in_progress_times_out_by_attempts() {
    let (fake, orchestrator) = setup();
    let orchestrator = TurnOrchestrator::new(fake.clone(), fast_policy().with_max_attempts(5));
    fake.script_run(RunScript::new(vec![RunStatus::InProgress]));

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    match err {
        TurnError::PollTimeout {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 5);
            assert_eq!(last_status, RunStatus::InProgress);
        }
        other => panic!("Expected PollTimeout, got {:?}", other),
    }
    assert_eq!(fake.polls(), 5);
    assert_eq!(fake.runs_created(), 1);
}

#[tokio::test]
async fn test_endless_in_progress_times_out_by_wall_clock() {
    let (fake, _) = setup();
    let policy = PollPolicy::fixed(Duration::from_millis(10))
        .with_max_attempts(u32::MAX)
        .with_max_wait(Duration::from_millis(100));
    let orchestrator = TurnOrchestrator::new(fake.clone(), policy);
    fake.script_run(RunScript::new(vec![RunStatus::Queued]));

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    match err {
        TurnError::PollTimeout { elapsed, .. } => assert!(elapsed < Duration::from_secs(1)),
        other => panic!("Expected PollTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_poll_errors_are_retried() {
    let (fake, orchestrator) = setup();
    fake.script_run(
        RunScript::completes_with("recovered").with_poll_errors(vec![server_error(), server_error()]),
    );

    let reply = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap();

    assert_eq!(reply.text, "recovered");
    assert_eq!(fake.polls(), 4);
}

#[tokio::test]
async fn test_transient_retries_are_bounded() {
    let (fake, _) = setup();
    let orchestrator =
        TurnOrchestrator::new(fake.clone(), fast_policy().with_transient_retries(1));
    fake.script_run(
        RunScript::completes_with("never").with_poll_errors(vec![server_error(), server_error()]),
    );

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    assert!(matches!(
        err,
        TurnError::Submission {
            stage: TurnStage::PollRun,
            ..
        }
    ));
}

#[tokio::test]
async fn test_non_transient_poll_error_fails_immediately() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::completes_with("never").with_poll_errors(vec![ClientError::Api {
        status: 404,
        message: "No run found".to_string(),
    }]));

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    assert!(matches!(
        err,
        TurnError::Submission {
            stage: TurnStage::PollRun,
            ..
        }
    ));
    assert_eq!(fake.polls(), 1);
}

#[tokio::test]
async fn test_run_creation_failure_is_not_retried() {
    let (fake, orchestrator) = setup();
    fake.fail_next(FakeOp::CreateRun, server_error());

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    assert!(matches!(
        err,
        TurnError::Submission {
            stage: TurnStage::CreateRun,
            ..
        }
    ));
    assert_eq!(fake.runs_created(), 0);
    assert_eq!(fake.polls(), 0);
}

#[tokio::test]
async fn test_blank_input_is_rejected_before_any_call() {
    let (fake, orchestrator) = setup();

    for (thread, assistant, message) in [("", "A1", "hi"), ("T1", " ", "hi"), ("T1", "A1", "\n")] {
        let err = orchestrator
            .execute_turn(thread, assistant, message)
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::InvalidInput(_)));
    }
    assert!(fake.messages("T1").is_empty());
}

#[tokio::test]
async fn test_send_message_without_thread_creates_one() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::completes_with("hi there"));
    fake.script_run(RunScript::completes_with("hello again"));

    let first = orchestrator.send_message(None, "A1", "hello").await;
    let second = orchestrator.send_message(Some(""), "A1", "hello").await;

    assert!(first.created_thread);
    assert!(second.created_thread);
    let first_id = first.thread_id.unwrap();
    let second_id = second.thread_id.unwrap();
    assert_ne!(first_id, "T1");
    assert_ne!(first_id, second_id);
    assert_eq!(first.outcome.unwrap().text, "hi there");
    assert_eq!(second.outcome.unwrap().thread_id, second_id);
    assert_eq!(fake.thread_count(), 3);
}

#[tokio::test]
async fn test_created_thread_survives_failed_turn() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::new(vec![RunStatus::Expired]));

    let turn = orchestrator.send_message(None, "A1", "hello").await;

    assert!(turn.created_thread);
    assert!(turn.thread_id.is_some());
    assert!(matches!(turn.outcome, Err(TurnError::RunFailure { .. })));
}

#[tokio::test]
async fn test_send_message_reuses_existing_thread() {
    let (fake, orchestrator) = setup();
    fake.script_run(RunScript::completes_with("hi there"));

    let turn = orchestrator.send_message(Some("T1"), "A1", "hello").await;

    assert!(!turn.created_thread);
    assert_eq!(turn.thread_id.as_deref(), Some("T1"));
    assert_eq!(fake.thread_count(), 1);
}

#[tokio::test]
async fn test_thread_creation_failure() {
    let (fake, orchestrator) = setup();
    fake.fail_next(FakeOp::CreateThread, server_error());

    let turn = orchestrator.send_message(None, "A1", "hello").await;

    assert!(turn.thread_id.is_none());
    assert!(matches!(
        turn.outcome,
        Err(TurnError::Submission {
            stage: TurnStage::CreateThread,
            ..
        })
    ));
}

#[tokio::test]
async fn test_concurrent_turns_keep_their_own_runs() {
    let fake = Arc::new(FakeAssistants::new());
    let orchestrator = TurnOrchestrator::new(fake.clone(), fast_policy());
    for i in 0..4 {
        fake.insert_thread(format!("T{}", i));
        fake.script_run(RunScript::new(vec![
            RunStatus::Queued,
            RunStatus::InProgress,
            RunStatus::InProgress,
            RunStatus::Completed,
        ])
        .with_reply(vec![format!("reply {}", i)]));
    }

    let turns = (0..4).map(|i| {
        let orchestrator = orchestrator.clone();
        async move {
            let thread = format!("T{}", i);
            orchestrator.execute_turn(&thread, "A1", "hello").await
        }
    });
    let replies = futures::future::join_all(turns).await;

    let mut texts: Vec<String> = replies
        .into_iter()
        .map(|r| {
            let reply = r.unwrap();
            // each thread only ever sees the reply of its own run
            let stored = fake.messages(&reply.thread_id);
            assert_eq!(stored.last().unwrap().text(), reply.text);
            reply.text
        })
        .collect();
    texts.sort();
    assert_eq!(texts, vec!["reply 0", "reply 1", "reply 2", "reply 3"]);
    assert_eq!(fake.runs_created(), 4);
}

#[tokio::test]
async fn test_last_check_is_made_within_remaining_budget() {
    let (fake, _) = setup();
    // the first sleep is longer than the whole budget and gets clamped to it
    let policy = PollPolicy::fixed(Duration::from_millis(200)).with_max_wait(Duration::from_millis(150));
    let orchestrator = TurnOrchestrator::new(fake.clone(), policy);
    fake.script_run(
        RunScript::new(vec![RunStatus::Queued, RunStatus::Completed]).with_reply(vec!["hi".to_string()]),
    );

    let reply = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap();

    assert_eq!(reply.text, "hi");
    assert_eq!(reply.polls, 1);
    assert_eq!(fake.polls(), 1);
}

#[tokio::test]
async fn test_transient_retries_stop_at_wall_clock_bound() {
    let (fake, _) = setup();
    let policy = PollPolicy::fixed(Duration::from_millis(10))
        .with_max_wait(Duration::from_millis(60))
        .with_transient_retries(1_000);
    let orchestrator = TurnOrchestrator::new(fake.clone(), policy);
    fake.script_run(
        RunScript::completes_with("never").with_poll_errors((0..500).map(|_| server_error()).collect()),
    );

    let err = orchestrator.execute_turn("T1", "A1", "hello").await.unwrap_err();

    match err {
        TurnError::PollTimeout {
            attempts,
            elapsed,
            last_status,
        } => {
            assert_eq!(attempts, 1);
            assert!(elapsed >= Duration::from_millis(60));
            assert_eq!(last_status, RunStatus::Queued);
        }
        other => panic!("Expected PollTimeout, got {:?}", other),
    }
    assert!(fake.polls() < 500);
}
