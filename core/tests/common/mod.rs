#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use testgen_core::api::{
    AnalyticsBackend, DocumentBackend, ExportRequest, FileUpload, JiraBackend,
    RequirementsBackend, SessionBackend,
};
use testgen_core::models::{
    AnalyticsOverview, Conversation, DuplicateReport, ExportReceipt, ExportRecord,
    JiraConnection, JiraProject, JiraRequirement, SessionDocument, SessionRequirement,
    TimeseriesPoint,
};
use testgen_core::{AppError, Result};

/// In-memory backend whose answers are scripted per test.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: RefCell<Vec<String>>,
    pub sessions: RefCell<Vec<Conversation>>,
    next_session: Cell<u32>,
    pub fail_create: Cell<bool>,
    pub fail_list: Cell<bool>,
    pub fail_rename: Cell<bool>,
    pub replies: RefCell<VecDeque<Result<Value>>>,
    /// The next agent call waits until the sender fires.
    pub reply_gate: RefCell<Option<oneshot::Receiver<()>>>,
    pub histories: RefCell<HashMap<String, Value>>,
    /// A history load for the session waits until the sender fires.
    pub gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    pub export_failures: RefCell<HashSet<String>>,
    pub exported: RefCell<Vec<(String, String, Option<String>)>>,
    pub export_records: RefCell<Vec<ExportRecord>>,
    pub jira_connected: Cell<bool>,
    pub projects: RefCell<Vec<JiraProject>>,
    pub candidates: RefCell<Vec<JiraRequirement>>,
    pub existing_requirements: RefCell<Vec<String>>,
    pub imports: RefCell<Vec<(Vec<String>, bool)>>,
    pub documents: RefCell<Vec<SessionDocument>>,
    pub fail_toggle: Cell<bool>,
    pub overview: RefCell<Option<AnalyticsOverview>>,
    pub timeseries: RefCell<Option<Vec<TimeseriesPoint>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_string());
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn script_reply(&self, reply: Result<Value>) {
        self.replies.borrow_mut().push_back(reply);
    }

    pub fn set_history(&self, session_id: &str, history: Value) {
        self.histories.borrow_mut().insert(session_id.to_string(), history);
    }

    pub fn gate(&self, session_id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(session_id.to_string(), rx);
        tx
    }

    pub fn gate_reply(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.reply_gate.borrow_mut() = Some(rx);
        tx
    }
}

pub fn unavailable() -> AppError {
    AppError::Http { status: 503, body: "agent unavailable".to_string() }
}

/// History entry holding one assistant message with the given test case ids.
pub fn history_with_test_cases(ids: &[&str]) -> Value {
    let testcases: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "testcase_id": id,
                "Testcase Title": format!("Case {id}"),
                "testcases": [[1, "Open the app", "App opens"]],
            })
        })
        .collect();
    json!({
        "conversation_history": [
            {"role": "user", "text": "Generate tests"},
            {"content": {"role": "assistant", "text": "Here you go", "aggregated_testcases": testcases}},
        ]
    })
}

pub fn candidate(id: &str) -> JiraRequirement {
    JiraRequirement {
        id: id.to_string(),
        jira_key: format!("REQ-{id}"),
        text: format!("Requirement {id}"),
        kind: "Functional".to_string(),
        risk_level: "High".to_string(),
        compliance_standard: "IEC 62304".to_string(),
        jira_url: None,
    }
}

pub fn document(id: &str, active: bool) -> SessionDocument {
    SessionDocument {
        id: id.to_string(),
        filename: format!("{id}.pdf"),
        chunk_count: 4,
        total_pages: 2,
        summary: String::new(),
        uploaded: String::new(),
        is_active: active,
    }
}

#[async_trait(?Send)]
impl SessionBackend for FakeBackend {
    async fn create_session(&self, _user_id: &str) -> Result<Conversation> {
        self.record("create_session");
        if self.fail_create.get() {
            return Err(unavailable());
        }
        let n = self.next_session.get() + 1;
        self.next_session.set(n);
        let conversation = Conversation::new(format!("s{n}"), String::new());
        self.sessions.borrow_mut().insert(0, conversation.clone());
        Ok(conversation)
    }

    async fn list_sessions(&self, _user_id: &str) -> Result<Vec<Conversation>> {
        self.record("list_sessions");
        if self.fail_list.get() {
            return Err(unavailable());
        }
        Ok(self.sessions.borrow().clone())
    }

    async fn rename_session(&self, _user_id: &str, _session_id: &str, _title: &str) -> Result<()> {
        self.record("rename_session");
        if self.fail_rename.get() {
            return Err(AppError::rejected("Session is locked"));
        }
        Ok(())
    }

    async fn send_message(&self, _user_id: &str, _session_id: &str, _text: &str) -> Result<Value> {
        self.record("send_message");
        let gate = self.reply_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"text": "ok"})))
    }

    async fn fetch_messages(&self, _user_id: &str, session_id: &str) -> Result<Value> {
        self.record("fetch_messages");
        let gate = self.gates.borrow_mut().remove(session_id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self
            .histories
            .borrow()
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| json!({"conversation_history": []})))
    }
}

#[async_trait(?Send)]
impl JiraBackend for FakeBackend {
    async fn jira_status(&self, _user_id: &str) -> Result<JiraConnection> {
        self.record("jira_status");
        Ok(JiraConnection {
            connected: self.jira_connected.get(),
            jira_url: self.jira_connected.get().then(|| "https://acme.atlassian.net".to_string()),
            expires_at: None,
        })
    }

    async fn jira_authorization_url(&self, _user_id: &str) -> Result<String> {
        Ok("https://auth.atlassian.com/authorize?state=u1".to_string())
    }

    async fn jira_exchange_code(&self, _user_id: &str, code: &str) -> Result<bool> {
        self.record("jira_exchange_code");
        let accepted = code == "good-code";
        self.jira_connected.set(accepted);
        Ok(accepted)
    }

    async fn jira_disconnect(&self, _user_id: &str) -> Result<()> {
        self.jira_connected.set(false);
        Ok(())
    }

    async fn jira_projects(&self, _user_id: &str) -> Result<Vec<JiraProject>> {
        self.record("jira_projects");
        Ok(self.projects.borrow().clone())
    }

    async fn jira_requirements(&self, _user_id: &str, _project_key: &str) -> Result<Vec<JiraRequirement>> {
        self.record("jira_requirements");
        Ok(self.candidates.borrow().clone())
    }

    async fn export_test_case(&self, request: &ExportRequest<'_>) -> Result<ExportReceipt> {
        self.record("export_test_case");
        let id = request.test_case.id.clone();
        if self.export_failures.borrow().contains(&id) {
            return Err(AppError::rejected("Jira rejected the issue"));
        }
        let n = self.exported.borrow().len() + 1;
        self.exported.borrow_mut().push((
            id,
            request.project_key.to_string(),
            request.requirement_key.map(str::to_string),
        ));
        Ok(ExportReceipt {
            jira_key: Some(format!("QA-{n}")),
            jira_url: Some(format!("https://acme.atlassian.net/browse/QA-{n}")),
        })
    }

    async fn export_history(&self, _user_id: &str, _session_id: &str) -> Result<Vec<ExportRecord>> {
        self.record("export_history");
        Ok(self.export_records.borrow().clone())
    }
}

#[async_trait(?Send)]
impl RequirementsBackend for FakeBackend {
    async fn session_requirements(&self, _user_id: &str, _session_id: &str) -> Result<Vec<SessionRequirement>> {
        self.record("session_requirements");
        Ok(self
            .existing_requirements
            .borrow()
            .iter()
            .map(|id| SessionRequirement {
                id: format!("row-{id}"),
                requirement_id: Some(id.clone()),
                text: format!("Requirement {id}"),
                risk_level: "High".to_string(),
                compliance_standard: String::new(),
                jira_key: Some(format!("REQ-{id}")),
                status: "imported".to_string(),
                test_case_count: 0,
            })
            .collect())
    }

    async fn check_duplicates(&self, _user_id: &str, _session_id: &str, requirement_ids: &[String]) -> Result<DuplicateReport> {
        self.record("check_duplicates");
        let existing = self.existing_requirements.borrow();
        let existing_ids: Vec<String> =
            requirement_ids.iter().filter(|id| existing.contains(id)).cloned().collect();
        Ok(DuplicateReport {
            has_duplicates: !existing_ids.is_empty(),
            count: existing_ids.len(),
            existing_ids,
        })
    }

    async fn import_requirements(
        &self,
        _user_id: &str,
        _session_id: &str,
        requirements: &[JiraRequirement],
        overwrite: bool,
    ) -> Result<String> {
        self.record("import_requirements");
        let ids: Vec<String> = requirements.iter().map(|r| r.id.clone()).collect();
        {
            let mut existing = self.existing_requirements.borrow_mut();
            for id in &ids {
                if !existing.contains(id) {
                    existing.push(id.clone());
                }
            }
        }
        self.imports.borrow_mut().push((ids.clone(), overwrite));
        Ok(format!("Imported {} requirements", ids.len()))
    }

    async fn delete_requirement(&self, _user_id: &str, _session_id: &str, requirement_id: &str) -> Result<()> {
        self.record("delete_requirement");
        self.existing_requirements
            .borrow_mut()
            .retain(|id| format!("row-{id}") != requirement_id);
        Ok(())
    }
}

#[async_trait(?Send)]
impl DocumentBackend for FakeBackend {
    async fn upload_document(&self, _user_id: &str, _session_id: &str, file: FileUpload) -> Result<()> {
        self.record("upload_document");
        let id = file.filename.trim_end_matches(".pdf").to_string();
        self.documents.borrow_mut().push(document(&id, true));
        Ok(())
    }

    async fn session_documents(&self, _user_id: &str, _session_id: &str) -> Result<Vec<SessionDocument>> {
        self.record("session_documents");
        Ok(self.documents.borrow().clone())
    }

    async fn toggle_document(&self, _user_id: &str, document_id: &str, active: bool) -> Result<()> {
        self.record("toggle_document");
        if self.fail_toggle.get() {
            return Err(unavailable());
        }
        if let Some(doc) = self.documents.borrow_mut().iter_mut().find(|d| d.id == document_id) {
            doc.is_active = active;
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl AnalyticsBackend for FakeBackend {
    async fn analytics_overview(&self, _user_id: &str) -> Result<AnalyticsOverview> {
        self.overview.borrow().clone().ok_or_else(unavailable)
    }

    async fn exports_timeseries(&self, _user_id: &str, _days: u32) -> Result<Vec<TimeseriesPoint>> {
        self.timeseries.borrow().clone().ok_or_else(unavailable)
    }
}
