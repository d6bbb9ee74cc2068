//! The chat workspace: sessions, messages and Jira export, composed.
//!
//! All state sits behind one `RefCell` and every method takes `&self`, so a
//! UI can keep several operations in flight (switch sessions while a history
//! load is outstanding). No borrow is held across an `.await`; results of
//! loads that lost the race are dropped by the message store's ticket check.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::api::{ExportRequest, JiraBackend, SessionBackend};
use crate::errors::{AppError, Result};
use crate::export::{BatchSummary, ExportOutcome, ExportTracker};
use crate::models::{
    Conversation, ExportStatusEntry, JiraProject, JiraRequirement, Message, Notice, NoticeKind,
    SessionPatch, TestCase,
};
use crate::notices::Notifier;
use crate::pending::{PendingSend, SendPhase};
use crate::store::{MessageStore, SessionStore};
use crate::transform::{transform_history, transform_reply};

const MAX_MESSAGE_LENGTH: usize = 8000;

/// Read-only view handed to the UI after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceSnapshot {
    pub sessions: Vec<Conversation>,
    pub active_session_id: Option<String>,
    pub messages: Vec<Message>,
    pub loading_sessions: bool,
    pub loading_messages: bool,
    pub agent_thinking: bool,
    pub exporting: bool,
    /// Export progress of the active session.
    pub exports: ExportTracker,
}

impl WorkspaceSnapshot {
    pub fn active_session(&self) -> Option<&Conversation> {
        let id = self.active_session_id.as_deref()?;
        self.sessions.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed(usize),
    /// The user selected another session before the load finished.
    Discarded,
}

#[derive(Default)]
struct WorkspaceState {
    sessions: SessionStore,
    messages: MessageStore,
    exports: HashMap<String, ExportTracker>,
    pending: Option<PendingSend>,
    loading_sessions: bool,
    exporting: bool,
}

type ChangeListener = Rc<dyn Fn(&WorkspaceSnapshot)>;

pub struct Workspace<B> {
    backend: B,
    user_id: String,
    state: RefCell<WorkspaceState>,
    on_change: RefCell<Option<ChangeListener>>,
    notifier: Notifier,
}

impl<B> Workspace<B>
where
    B: SessionBackend + JiraBackend,
{
    pub fn new(backend: B, user_id: impl Into<String>) -> Self {
        Self::with_notifier(backend, user_id, Notifier::new())
    }

    pub fn with_notifier(backend: B, user_id: impl Into<String>, notifier: Notifier) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            state: RefCell::new(WorkspaceState::default()),
            on_change: RefCell::new(None),
            notifier,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Called with a fresh snapshot after every state change.
    pub fn set_listener(&self, listener: impl Fn(&WorkspaceSnapshot) + 'static) {
        *self.on_change.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let st = self.state.borrow();
        let active_session_id = st.sessions.active_id().map(str::to_string);
        let exports = active_session_id
            .as_deref()
            .and_then(|id| st.exports.get(id))
            .cloned()
            .unwrap_or_default();
        WorkspaceSnapshot {
            sessions: st.sessions.sessions().to_vec(),
            active_session_id,
            messages: st.messages.messages().to_vec(),
            loading_sessions: st.loading_sessions,
            loading_messages: st.messages.is_loading(),
            agent_thinking: st.pending.as_ref().is_some_and(|p| !p.is_settled()),
            exporting: st.exporting,
            exports,
        }
    }

    pub fn last_send_phase(&self) -> Option<SendPhase> {
        self.state.borrow().pending.as_ref().map(PendingSend::phase)
    }

    fn emit(&self) {
        let listener = self.on_change.borrow().clone();
        if let Some(listener) = listener {
            let snapshot = self.snapshot();
            listener(&snapshot);
        }
    }

    fn notify(&self, notice: Notice) {
        self.notifier.push(notice);
    }

    fn active_session_id(&self) -> Option<String> {
        self.state.borrow().sessions.active_id().map(str::to_string)
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    /// Replaces the session list with the server's. On failure the list is
    /// left empty and the error returned; there is no retry.
    pub async fn load_sessions(&self) -> Result<usize> {
        self.state.borrow_mut().loading_sessions = true;
        self.emit();

        let result = self.backend.list_sessions(&self.user_id).await;
        let outcome = {
            let mut st = self.state.borrow_mut();
            st.loading_sessions = false;
            match result {
                Ok(sessions) => {
                    let count = sessions.len();
                    st.sessions.replace(sessions);
                    Ok(count)
                }
                Err(e) => {
                    st.sessions.clear();
                    Err(e)
                }
            }
        };
        if let Err(e) = &outcome {
            error!("Failed to fetch sessions: {e}");
            self.notify(Notice::error("Failed to load conversations", e));
        }
        self.emit();
        outcome
    }

    /// Asks the backend for a new conversation, puts it on top and selects it.
    pub async fn create_session(&self) -> Result<Conversation> {
        let conversation = match self.backend.create_session(&self.user_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                error!("Failed to create session: {e}");
                self.notify(Notice::error("Could not start a new chat", &e));
                return Err(e);
            }
        };
        info!("Created session {}", conversation.id);
        {
            let mut st = self.state.borrow_mut();
            st.sessions.prepend_active(conversation.clone());
            st.messages.reset(Some(&conversation.id));
        }
        self.emit();
        Ok(conversation)
    }

    /// Local projection of a server-side change; moves the session to the top.
    pub fn touch_session(&self, id: &str, patch: &SessionPatch) -> bool {
        let touched = self.state.borrow_mut().sessions.touch(id, patch);
        if touched {
            self.emit();
        }
        touched
    }

    /// Renames on the server first; the local title follows only on success.
    pub async fn rename_session(&self, id: &str, new_title: &str) -> Result<()> {
        let title = new_title.trim();
        if title.is_empty() {
            return Err(AppError::empty_field("title"));
        }
        let current = self
            .state
            .borrow()
            .sessions
            .get(id)
            .map(|c| c.title.clone())
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })?;
        if current == title {
            return Ok(());
        }

        if let Err(e) = self.backend.rename_session(&self.user_id, id, title).await {
            error!("Failed to rename session {id}: {e}");
            self.notify(Notice::error("Rename failed", &e));
            return Err(e);
        }
        self.state.borrow_mut().sessions.set_title(id, title);
        self.emit();
        Ok(())
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    /// Makes `id` active and loads its history.
    pub async fn select_session(&self, id: &str) -> Result<LoadOutcome> {
        self.state.borrow_mut().sessions.set_active(Some(id.to_string()));
        self.load_messages(id).await
    }

    /// Loads the full history of `session_id`. A result arriving after the
    /// user switched to another session is discarded.
    pub async fn load_messages(&self, session_id: &str) -> Result<LoadOutcome> {
        let ticket = self.state.borrow_mut().messages.begin_load(session_id);
        self.emit();

        let result = self
            .backend
            .fetch_messages(&self.user_id, session_id)
            .await
            .and_then(|payload| transform_history(&payload));

        match result {
            Ok(messages) => {
                let count = messages.len();
                let committed = self.state.borrow_mut().messages.commit_load(&ticket, messages);
                if !committed {
                    debug!("Discarding stale history for session {session_id}");
                    return Ok(LoadOutcome::Discarded);
                }
                self.emit();
                Ok(LoadOutcome::Committed(count))
            }
            Err(e) => {
                if !self.state.borrow_mut().messages.abort_load(&ticket) {
                    debug!("Ignoring failed stale history load for {session_id}: {e}");
                    return Ok(LoadOutcome::Discarded);
                }
                error!("Failed to fetch messages for session {session_id}: {e}");
                self.notify(Notice::error("Failed to load messages", &e));
                self.emit();
                Err(e)
            }
        }
    }

    /// Sends `text`, creating a session first when none is active.
    ///
    /// The user message is shown before the agent answers. A failed agent
    /// call still ends in a visible assistant message, or in an error notice
    /// when the user has moved to another session; the error is returned.
    pub async fn send(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::empty_field("message"));
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "message".to_string(),
                max_length: MAX_MESSAGE_LENGTH,
                actual_length: text.chars().count(),
            });
        }
        {
            let mut st = self.state.borrow_mut();
            if st.pending.as_ref().is_some_and(|p| !p.is_settled()) {
                return Err(AppError::SendInProgress);
            }
            st.pending = Some(PendingSend::queued());
        }
        self.emit();

        let session_id = match self.active_session_id() {
            Some(id) => id,
            None => match self.create_session().await {
                Ok(conversation) => conversation.id,
                Err(e) => {
                    if let Some(p) = self.state.borrow_mut().pending.as_mut() {
                        p.fail();
                    }
                    self.emit();
                    return Err(e);
                }
            },
        };

        {
            let mut st = self.state.borrow_mut();
            if st.messages.session_id() != Some(session_id.as_str()) {
                st.messages.reset(Some(&session_id));
            }
            st.messages.append_user_message(text);
            if let Some(p) = st.pending.as_mut() {
                p.dispatch(&session_id);
            }
        }
        self.emit();

        let reply = self.backend.send_message(&self.user_id, &session_id, text).await;

        let still_viewing = self.state.borrow().messages.session_id() == Some(session_id.as_str());
        let outcome = {
            let mut st = self.state.borrow_mut();
            match reply {
                Ok(raw) => {
                    let response = transform_reply(Some(&raw));
                    let patch = SessionPatch {
                        title: response.updated_title.clone(),
                        updated_at: Some(Utc::now()),
                    };
                    if still_viewing {
                        st.messages.append_assistant_message(response);
                    } else {
                        debug!("Reply for {session_id} arrived after switching sessions");
                    }
                    st.sessions.touch(&session_id, &patch);
                    if let Some(p) = st.pending.as_mut() {
                        p.commit();
                    }
                    Ok(())
                }
                Err(e) => {
                    if still_viewing {
                        st.messages.append_failure_notice();
                    }
                    if let Some(p) = st.pending.as_mut() {
                        p.fail();
                    }
                    Err(e)
                }
            }
        };
        if let Err(e) = &outcome {
            error!("Failed to send message to session {session_id}: {e}");
            // the failure notice only lands in the list the user is looking at
            if !still_viewing {
                self.notify(Notice::error("Message failed", e));
            }
        }
        self.emit();
        outcome
    }

    // ── Jira export ──────────────────────────────────────────────────────────

    pub fn export_status(&self, test_case_id: &str) -> Option<ExportStatusEntry> {
        let st = self.state.borrow();
        let session_id = st.sessions.active_id()?;
        st.exports.get(session_id)?.entry(test_case_id).cloned()
    }

    /// Seeds the active session's export tracker from persisted exports.
    pub async fn open_export_view(&self) -> Result<usize> {
        let session_id = self.active_session_id().ok_or(AppError::NoActiveSession)?;
        let records = match self.backend.export_history(&self.user_id, &session_id).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to fetch export history for {session_id}: {e}");
                self.notify(Notice::error("Could not load previous exports", &e));
                return Err(e);
            }
        };
        let seeded = self
            .state
            .borrow_mut()
            .exports
            .entry(session_id)
            .or_default()
            .hydrate_from_history(&records);
        self.emit();
        Ok(seeded)
    }

    /// Exports the selected test cases of the active session one at a time.
    /// Every item is attempted; failures are recorded per id.
    pub async fn export_batch(
        &self,
        selected_ids: &[String],
        project_key: Option<&str>,
        requirement_key: Option<&str>,
    ) -> Result<BatchSummary> {
        let Some(project_key) = project_key.map(str::trim).filter(|k| !k.is_empty()) else {
            self.notify(Notice::warning("Select a project", "Choose a Jira project to export to."));
            return Err(AppError::NoProjectSelected);
        };
        if selected_ids.is_empty() {
            return Err(AppError::empty_field("selection"));
        }
        let session_id = self.active_session_id().ok_or(AppError::NoActiveSession)?;
        let requirement_key = requirement_key.map(str::trim).filter(|k| !k.is_empty());

        let test_cases = self.selected_test_cases(selected_ids);
        let begun = {
            let mut st = self.state.borrow_mut();
            st.exporting = true;
            st.exports
                .entry(session_id.clone())
                .or_default()
                .begin_export(test_cases.iter().map(|tc| tc.id.as_str()))
        };
        self.emit();

        let mut summary = BatchSummary {
            attempted: begun.started.len(),
            already_exported: begun.already_exported,
            ..Default::default()
        };

        for test_case in test_cases.iter().filter(|tc| begun.started.contains(&tc.id)) {
            let request = ExportRequest {
                user_id: &self.user_id,
                session_id: &session_id,
                project_key,
                test_case,
                requirement_key,
            };
            let outcome = match self.backend.export_test_case(&request).await {
                Ok(receipt) => {
                    info!("Exported {} as {:?}", test_case.id, receipt.jira_key);
                    summary.succeeded += 1;
                    ExportOutcome::Success { jira_key: receipt.jira_key, jira_url: receipt.jira_url }
                }
                Err(e) => {
                    error!("Failed to export {}: {e}", test_case.id);
                    summary.failed.push(test_case.id.clone());
                    ExportOutcome::Failed { message: e.to_string() }
                }
            };
            self.state
                .borrow_mut()
                .exports
                .entry(session_id.clone())
                .or_default()
                .record_result(&test_case.id, outcome);
            self.emit();
        }

        self.state.borrow_mut().exporting = false;
        let kind = if summary.all_succeeded() { NoticeKind::Success } else { NoticeKind::Info };
        self.notify(Notice::new(kind, "Export Complete", Some(summary.message())));
        self.emit();
        Ok(summary)
    }

    /// Test cases of the loaded messages whose id is selected, first occurrence wins.
    fn selected_test_cases(&self, selected_ids: &[String]) -> Vec<TestCase> {
        let wanted: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let st = self.state.borrow();
        let found: Vec<TestCase> = st
            .messages
            .messages()
            .iter()
            .flat_map(|m| m.testcases.iter())
            .filter(|tc| wanted.contains(tc.id.as_str()) && seen.insert(tc.id.clone()))
            .cloned()
            .collect();
        if found.len() < wanted.len() {
            warn!(
                "{} selected test case(s) are not in the current conversation",
                wanted.len() - found.len()
            );
        }
        found
    }

    pub async fn jira_projects(&self) -> Result<Vec<JiraProject>> {
        self.backend.jira_projects(&self.user_id).await.map_err(|e| {
            error!("Failed to fetch Jira projects: {e}");
            self.notify(Notice::error("Failed to load projects", &e));
            e
        })
    }

    pub async fn jira_requirements(&self, project_key: &str) -> Result<Vec<JiraRequirement>> {
        self.backend
            .jira_requirements(&self.user_id, project_key)
            .await
            .map_err(|e| {
                error!("Failed to fetch requirements for {project_key}: {e}");
                self.notify(Notice::error("Failed to load requirements", &e));
                e
            })
    }
}
