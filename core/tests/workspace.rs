mod common;

use serde_json::json;

use common::{history_with_test_cases, unavailable, FakeBackend};
use testgen_core::models::{ExportRecord, ExportStatus, MessageRole, NoticeKind, SessionPatch};
use testgen_core::pending::SendPhase;
use testgen_core::store::SEND_FAILURE_TEXT;
use testgen_core::{AppError, LoadOutcome, Workspace};

fn workspace(backend: FakeBackend) -> Workspace<FakeBackend> {
    Workspace::new(backend, "u1")
}

#[tokio::test]
async fn first_send_creates_exactly_one_session() {
    let backend = FakeBackend::new();
    backend.script_reply(Ok(json!({
        "text": "Generated 1 test case",
        "updated_title": "Login flows",
        "aggregated_testcases": [
            {"testcase_id": "TC-1", "Testcase Title": "Login", "testcases": [[1, "Enter creds", "Logged in"]]}
        ]
    })));
    let ws = workspace(backend);

    ws.send("  Generate login tests ").await.unwrap();

    assert_eq!(ws.backend().count("create_session"), 1);
    assert_eq!(ws.backend().count("send_message"), 1);
    let snap = ws.snapshot();
    assert_eq!(snap.sessions.len(), 1);
    assert_eq!(snap.active_session_id.as_deref(), Some("s1"));
    assert_eq!(snap.active_session().unwrap().title, "Login flows");

    assert_eq!(snap.messages.len(), 2);
    assert_eq!(snap.messages[0].role, MessageRole::User);
    assert_eq!(snap.messages[0].text, "Generate login tests");
    assert_eq!(snap.messages[1].role, MessageRole::Assistant);
    assert_eq!(snap.messages[1].testcases[0].id, "TC-1");
    assert!(!snap.agent_thinking);
    assert_eq!(ws.last_send_phase(), Some(SendPhase::Committed));

    ws.send("And logout").await.unwrap();
    assert_eq!(ws.backend().count("create_session"), 1);
    assert_eq!(ws.snapshot().messages.len(), 4);
}

#[tokio::test]
async fn agent_failure_becomes_an_assistant_message() {
    let backend = FakeBackend::new();
    backend.script_reply(Err(unavailable()));
    let ws = workspace(backend);

    let err = ws.send("Hello").await.unwrap_err();
    assert!(err.is_backend());

    let snap = ws.snapshot();
    assert_eq!(snap.messages.len(), 2);
    assert_eq!(snap.messages[1].role, MessageRole::Assistant);
    assert_eq!(snap.messages[1].text, SEND_FAILURE_TEXT);
    assert_eq!(ws.last_send_phase(), Some(SendPhase::Failed));
    assert!(ws.notifier().take().is_empty());
}

#[tokio::test]
async fn failed_session_creation_sends_nothing() {
    let backend = FakeBackend::new();
    backend.fail_create.set(true);
    let ws = workspace(backend);

    assert!(ws.send("Hello").await.is_err());
    assert_eq!(ws.backend().count("send_message"), 0);
    assert!(ws.snapshot().messages.is_empty());
    assert_eq!(ws.last_send_phase(), Some(SendPhase::Failed));
    assert_eq!(ws.notifier().take()[0].kind, NoticeKind::Error);
}

#[tokio::test]
async fn invalid_messages_are_rejected_before_any_call() {
    let ws = workspace(FakeBackend::new());

    assert!(matches!(ws.send("   ").await, Err(AppError::EmptyField { .. })));
    let long = "x".repeat(8001);
    assert!(matches!(ws.send(&long).await, Err(AppError::FieldTooLong { actual_length: 8001, .. })));
    assert!(ws.backend().calls.borrow().is_empty());
}

#[tokio::test]
async fn stale_history_load_is_discarded() {
    let backend = FakeBackend::new();
    backend.set_history("a", json!({"conversation_history": [{"role": "user", "text": "from a"}]}));
    backend.set_history("b", json!({"conversation_history": [{"role": "user", "text": "from b"}]}));
    let release_a = backend.gate("a");
    let ws = workspace(backend);

    let (first, second) = tokio::join!(ws.select_session("a"), async {
        tokio::task::yield_now().await;
        let outcome = ws.select_session("b").await;
        let _ = release_a.send(());
        outcome
    });

    assert_eq!(first.unwrap(), LoadOutcome::Discarded);
    assert_eq!(second.unwrap(), LoadOutcome::Committed(1));
    let snap = ws.snapshot();
    assert_eq!(snap.active_session_id.as_deref(), Some("b"));
    assert_eq!(snap.messages.len(), 1);
    assert_eq!(snap.messages[0].text, "from b");
    assert!(!snap.loading_messages);
}

#[tokio::test]
async fn message_sent_while_history_loads_survives_the_load() {
    let backend = FakeBackend::new();
    backend.set_history("a", json!({"conversation_history": [{"role": "user", "text": "old"}]}));
    backend.script_reply(Ok(json!({"text": "Hi there"})));
    let release_a = backend.gate("a");
    let ws = workspace(backend);

    let (loaded, sent) = tokio::join!(ws.select_session("a"), async {
        tokio::task::yield_now().await;
        let sent = ws.send("Hello").await;
        let _ = release_a.send(());
        sent
    });

    assert_eq!(loaded.unwrap(), LoadOutcome::Committed(1));
    sent.unwrap();
    assert_eq!(ws.backend().count("create_session"), 0);
    let snap = ws.snapshot();
    let transcript: Vec<(MessageRole, &str)> =
        snap.messages.iter().map(|m| (m.role, m.text.as_str())).collect();
    assert_eq!(
        transcript,
        [
            (MessageRole::User, "old"),
            (MessageRole::User, "Hello"),
            (MessageRole::Assistant, "Hi there"),
        ]
    );
    assert!(!snap.loading_messages);
}

#[tokio::test]
async fn session_list_is_replaced_and_emptied_on_failure() {
    let backend = FakeBackend::new();
    let ws = workspace(backend);
    ws.create_session().await.unwrap();
    ws.create_session().await.unwrap();

    assert_eq!(ws.load_sessions().await.unwrap(), 2);
    let ids: Vec<String> = ws.snapshot().sessions.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, ["s2", "s1"]);
    assert!(ws.notifier().take().is_empty());

    ws.backend().fail_list.set(true);
    let err = ws.load_sessions().await.unwrap_err();
    assert!(err.is_backend());
    let snap = ws.snapshot();
    assert!(snap.sessions.is_empty());
    assert!(!snap.loading_sessions);
    let notices = ws.notifier().take();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
    assert_eq!(notices[0].title, "Failed to load conversations");
}

#[tokio::test]
async fn failure_after_switching_away_is_still_reported() {
    let backend = FakeBackend::new();
    backend.script_reply(Err(unavailable()));
    let release_reply = backend.gate_reply();
    let ws = workspace(backend);
    ws.create_session().await.unwrap();

    // the switch to "b" happens while the agent call is outstanding
    let (sent, _) = tokio::join!(ws.send("Hello"), async {
        ws.select_session("b").await.unwrap();
        let _ = release_reply.send(());
    });

    assert!(sent.is_err());
    let snap = ws.snapshot();
    assert_eq!(snap.active_session_id.as_deref(), Some("b"));
    assert!(snap.messages.iter().all(|m| m.text != SEND_FAILURE_TEXT));
    let notices = ws.notifier().take();
    let failed = notices.iter().find(|n| n.title == "Message failed").unwrap();
    assert_eq!(failed.kind, NoticeKind::Error);
}

#[tokio::test]
async fn rename_waits_for_the_server() {
    let backend = FakeBackend::new();
    backend.fail_rename.set(true);
    let ws = workspace(backend);
    ws.create_session().await.unwrap();

    let err = ws.rename_session("s1", "Dosage checks").await.unwrap_err();
    assert_eq!(err.to_string(), "Session is locked");
    assert_eq!(ws.snapshot().sessions[0].title, "");

    ws.backend().fail_rename.set(false);
    ws.rename_session("s1", "  Dosage checks ").await.unwrap();
    assert_eq!(ws.snapshot().sessions[0].title, "Dosage checks");

    // unchanged titles and unknown ids never reach the server
    ws.rename_session("s1", "Dosage checks").await.unwrap();
    assert!(ws.rename_session("nope", "x").await.unwrap_err().is_not_found());
    assert_eq!(ws.backend().count("rename_session"), 2);
}

#[tokio::test]
async fn touch_moves_session_to_top_and_is_idempotent() {
    let backend = FakeBackend::new();
    let ws = workspace(backend);
    ws.create_session().await.unwrap();
    ws.create_session().await.unwrap();
    assert_eq!(ws.snapshot().sessions[0].id, "s2");

    let patch = SessionPatch { title: Some("Audit".into()), updated_at: None };
    assert!(ws.touch_session("s1", &patch));
    let once = ws.snapshot().sessions;
    assert!(ws.touch_session("s1", &patch));
    assert_eq!(ws.snapshot().sessions, once);
    assert_eq!(once[0].id, "s1");
    assert_eq!(once[0].title, "Audit");
    assert!(!ws.touch_session("missing", &patch));
}

#[tokio::test]
async fn batch_export_records_each_result() {
    let backend = FakeBackend::new();
    backend.set_history("s9", history_with_test_cases(&["TC-1", "TC-2", "TC-3"]));
    backend.export_failures.borrow_mut().insert("TC-2".to_string());
    let ws = workspace(backend);
    ws.select_session("s9").await.unwrap();

    let selected = ["TC-1", "TC-2", "TC-3"].map(String::from);
    let summary = ws.export_batch(&selected, Some("QA"), Some(" REQ-7 ")).await.unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, ["TC-2"]);
    assert_eq!(summary.message(), "2 of 3 test cases exported successfully.");

    let exports = ws.snapshot().exports;
    assert_eq!(exports.status("TC-1"), Some(ExportStatus::Success));
    assert_eq!(exports.status("TC-2"), Some(ExportStatus::Error));
    assert_eq!(exports.status("TC-3"), Some(ExportStatus::Success));
    assert_eq!(ws.export_status("TC-3").unwrap().jira_key.as_deref(), Some("QA-2"));
    assert_eq!(
        ws.backend().exported.borrow()[0],
        ("TC-1".to_string(), "QA".to_string(), Some("REQ-7".to_string()))
    );

    let notices = ws.notifier().take();
    let last = notices.last().unwrap();
    assert_eq!(last.title, "Export Complete");
    assert_eq!(last.kind, NoticeKind::Info);
    assert!(!ws.snapshot().exporting);

    // a retry only touches what is not yet exported
    ws.backend().export_failures.borrow_mut().clear();
    let retry = ws.export_batch(&selected, Some("QA"), None).await.unwrap();
    assert_eq!(retry.attempted, 1);
    assert_eq!(retry.already_exported, ["TC-1", "TC-3"]);
    assert!(retry.all_succeeded());

    // everything already exported: nothing is sent and the notice says so
    ws.notifier().take();
    let again = ws.export_batch(&selected, Some("QA"), None).await.unwrap();
    assert_eq!(again.attempted, 0);
    assert_eq!(ws.backend().count("export_test_case"), 4);
    let notice = ws.notifier().take().pop().unwrap();
    assert_eq!(notice.kind, NoticeKind::Info);
    assert_eq!(
        notice.description.as_deref(),
        Some("Nothing to export: 3 selected test cases were already exported.")
    );
}

#[tokio::test]
async fn export_requires_a_project() {
    let backend = FakeBackend::new();
    backend.set_history("s9", history_with_test_cases(&["TC-1"]));
    let ws = workspace(backend);
    ws.select_session("s9").await.unwrap();

    let err = ws.export_batch(&["TC-1".to_string()], Some("  "), None).await.unwrap_err();
    assert!(matches!(err, AppError::NoProjectSelected));
    assert_eq!(ws.backend().count("export_test_case"), 0);
    assert_eq!(ws.export_status("TC-1"), None);
}

#[tokio::test]
async fn export_view_hydration_never_downgrades() {
    let backend = FakeBackend::new();
    backend.set_history("s9", history_with_test_cases(&["TC-1", "TC-2"]));
    let ws = workspace(backend);
    ws.select_session("s9").await.unwrap();
    ws.export_batch(&["TC-1".to_string()], Some("QA"), None).await.unwrap();

    ws.backend().export_records.borrow_mut().extend([
        ExportRecord {
            testcase_id: Some("TC-1".into()),
            jira_key: Some("QA-OLD".into()),
            status: Some("failed".into()),
            ..Default::default()
        },
        ExportRecord {
            testcase_id: Some("TC-2".into()),
            jira_key: Some("QA-9".into()),
            ..Default::default()
        },
    ]);
    let seeded = ws.open_export_view().await.unwrap();

    assert_eq!(seeded, 1);
    assert_eq!(ws.export_status("TC-1").unwrap().jira_key.as_deref(), Some("QA-1"));
    assert_eq!(ws.export_status("TC-2").unwrap().status, ExportStatus::Success);
}

#[tokio::test]
async fn export_view_needs_an_active_session() {
    let ws = workspace(FakeBackend::new());
    assert!(matches!(ws.open_export_view().await, Err(AppError::NoActiveSession)));
}

#[tokio::test]
async fn listener_sees_thinking_state_during_send() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let ws = workspace(FakeBackend::new());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    ws.set_listener(move |snap| sink.borrow_mut().push((snap.agent_thinking, snap.messages.len())));

    ws.send("Hello").await.unwrap();

    let seen = seen.borrow();
    assert!(seen.contains(&(true, 1)));
    assert_eq!(seen.last(), Some(&(false, 2)));
}
