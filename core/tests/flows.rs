mod common;

use common::{candidate, document, FakeBackend};
use testgen_core::analytics::Dashboard;
use testgen_core::api::FileUpload;
use testgen_core::documents::DocumentShelf;
use testgen_core::jira::JiraLink;
use testgen_core::models::{AnalyticsOverview, JiraProject, NoticeKind, TimeseriesPoint};
use testgen_core::requirements::{ImportFlow, ImportStep, ImportView};
use testgen_core::{AppError, Notifier};

#[tokio::test]
async fn import_without_jira_is_refused_with_a_warning() {
    let backend = FakeBackend::new();
    let notifier = Notifier::new();
    let flow = ImportFlow::new(notifier.clone());

    let err = flow.start_import(&backend, "u1", false).await.unwrap_err();

    assert!(matches!(err, AppError::JiraNotConnected));
    assert_eq!(flow.view(), ImportView::List);
    assert_eq!(backend.count("jira_projects"), 0);
    let notices = notifier.take();
    assert_eq!(notices[0].kind, NoticeKind::Warning);
    assert_eq!(notices[0].title, "Jira Not Connected");
}

#[tokio::test]
async fn duplicates_route_through_overwrite_confirmation() {
    let backend = FakeBackend::new();
    backend.projects.borrow_mut().push(JiraProject { key: "MED".into(), name: "Medical".into() });
    backend.candidates.borrow_mut().extend([candidate("1"), candidate("2")]);
    backend.existing_requirements.borrow_mut().push("2".to_string());
    let flow = ImportFlow::new(Notifier::new());

    assert_eq!(flow.start_import(&backend, "u1", true).await.unwrap(), 1);
    assert_eq!(flow.view(), ImportView::Projects);
    assert_eq!(flow.choose_project(&backend, "u1", "MED").await.unwrap(), 2);
    assert_eq!(flow.view(), ImportView::Requirements);

    assert!(flow.toggle("1"));
    assert!(flow.toggle("2"));
    let step = flow.prepare_import(&backend, "u1", "s1").await.unwrap();

    let ImportStep::NeedsConfirmation(report) = step else {
        panic!("expected confirmation, got {step:?}");
    };
    assert_eq!(report.existing_ids, ["2"]);
    assert_eq!(flow.view(), ImportView::ConfirmOverwrite);
    assert_eq!(backend.count("import_requirements"), 0);

    flow.cancel_overwrite();
    assert_eq!(flow.view(), ImportView::Requirements);
    assert_eq!(flow.selected_count(), 2);

    flow.prepare_import(&backend, "u1", "s1").await.unwrap();
    let message = flow.confirm_overwrite(&backend, "u1", "s1").await.unwrap();

    assert_eq!(message, "Imported 2 requirements");
    assert_eq!(*backend.imports.borrow(), [(vec!["1".to_string(), "2".to_string()], true)]);
    assert_eq!(flow.view(), ImportView::List);
    assert_eq!(flow.selected_count(), 0);
    assert_eq!(flow.requirements().len(), 2);
}

#[tokio::test]
async fn fresh_requirements_import_directly() {
    let backend = FakeBackend::new();
    backend.candidates.borrow_mut().push(candidate("7"));
    let flow = ImportFlow::new(Notifier::new());

    flow.choose_project(&backend, "u1", "MED").await.unwrap();
    flow.toggle("7");
    let step = flow.prepare_import(&backend, "u1", "s1").await.unwrap();

    assert_eq!(step, ImportStep::Imported("Imported 1 requirements".to_string()));
    assert_eq!(*backend.imports.borrow(), [(vec!["7".to_string()], false)]);

    flow.delete(&backend, "u1", "s1", "row-7").await.unwrap();
    assert!(flow.requirements().is_empty());
}

#[tokio::test]
async fn empty_selection_is_not_sent() {
    let backend = FakeBackend::new();
    let flow = ImportFlow::new(Notifier::new());
    assert!(flow.prepare_import(&backend, "u1", "s1").await.is_err());
    assert_eq!(backend.count("check_duplicates"), 0);
}

#[tokio::test]
async fn document_toggle_changes_local_state_only_after_server_accepts() {
    let backend = FakeBackend::new();
    backend.documents.borrow_mut().extend([document("a", true), document("b", true)]);
    let notifier = Notifier::new();
    let shelf = DocumentShelf::new(notifier.clone());
    shelf.refresh(&backend, "u1", "s1").await.unwrap();
    assert_eq!(shelf.active_count(), 2);

    backend.fail_toggle.set(true);
    assert!(shelf.toggle(&backend, "u1", "a").await.is_err());
    assert_eq!(shelf.active_count(), 2);

    backend.fail_toggle.set(false);
    assert!(!shelf.toggle(&backend, "u1", "a").await.unwrap());
    assert_eq!(shelf.active_count(), 1);
    let last = notifier.take().pop().unwrap();
    assert_eq!(last.title, "Document deactivated");
    assert_eq!(last.description.as_deref(), Some("a.pdf will no longer be searched"));
}

#[tokio::test]
async fn upload_refreshes_the_shelf() {
    let backend = FakeBackend::new();
    let shelf = DocumentShelf::new(Notifier::new());
    let file = FileUpload { filename: "spec.pdf".into(), mime: Some("application/pdf".into()), bytes: vec![1, 2, 3] };

    shelf.upload(&backend, "u1", "s1", file).await.unwrap();

    assert_eq!(shelf.documents().len(), 1);
    assert_eq!(backend.count("session_documents"), 1);

    let empty = FileUpload { filename: "x.pdf".into(), mime: None, bytes: Vec::new() };
    assert!(shelf.upload(&backend, "u1", "s1", empty).await.is_err());
    assert_eq!(backend.count("upload_document"), 1);
}

#[tokio::test]
async fn dashboard_parts_fall_back_independently() {
    let backend = FakeBackend::new();
    backend.timeseries.replace(Some(vec![
        TimeseriesPoint { date: "2026-03-01".into(), test_cases: 4 },
        TimeseriesPoint { date: "2026-03-02".into(), test_cases: 3 },
    ]));

    let dashboard = Dashboard::load(&backend, "u1", 30).await;

    assert_eq!(dashboard.overview, AnalyticsOverview::default());
    assert_eq!(dashboard.total_exported_in_window(), 7);
    assert!(dashboard.sessions.is_empty());
}

#[tokio::test]
async fn jira_link_round_trip() {
    let backend = FakeBackend::new();
    let notifier = Notifier::new();
    let link = JiraLink::new(notifier.clone());

    assert!(!link.refresh(&backend, "u1").await.connected);
    assert!(link.complete_authorization(&backend, "u1", "bad-code").await.is_err());
    assert!(!link.is_connected());

    link.complete_authorization(&backend, "u1", "good-code").await.unwrap();
    assert!(link.is_connected());
    assert_eq!(notifier.take().last().unwrap().kind, NoticeKind::Success);

    link.disconnect(&backend, "u1").await.unwrap();
    assert!(!link.is_connected());
}
