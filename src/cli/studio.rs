use std::path::Path;

use anyhow::Context;
use tracing::debug;

use testgen_core::analytics::{Dashboard, SessionTable};
use testgen_core::api::{FileUpload, RestBackend};
use testgen_core::documents::DocumentShelf;
use testgen_core::jira::JiraLink;
use testgen_core::models::MessageRole;
use testgen_core::requirements::{ImportFlow, ImportStep, ImportView};
use testgen_core::{AppError, LoadOutcome, Notifier, Workspace};

use super::render;
use super::{Command, ImportCommand, JiraCommand, Selection};
use crate::transport::ReqwestTransport;

pub type StudioBackend = RestBackend<ReqwestTransport>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

/// Everything one signed-in terminal user works with.
pub struct Studio {
    workspace: Workspace<StudioBackend>,
    jira: JiraLink,
    import: ImportFlow,
    shelf: DocumentShelf,
    analytics_days: u32,
}

fn mime_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(mime.to_string())
}

impl Studio {
    /// Notices go to stdout through `notifier` as they are raised.
    pub fn new(backend: StudioBackend, user_id: &str, analytics_days: u32, notifier: Notifier) -> Self {
        Self {
            workspace: Workspace::with_notifier(backend, user_id, notifier.clone()),
            jira: JiraLink::new(notifier.clone()),
            import: ImportFlow::new(notifier.clone()),
            shelf: DocumentShelf::new(notifier),
            analytics_days,
        }
    }

    fn backend(&self) -> &StudioBackend {
        self.workspace.backend()
    }

    fn user_id(&self) -> &str {
        self.workspace.user_id()
    }

    fn active_session(&self) -> Result<String, AppError> {
        self.workspace.snapshot().active_session_id.ok_or(AppError::NoActiveSession)
    }

    /// Loads the chat list and Jira status. Failures were already reported.
    pub async fn start(&self) -> String {
        if let Err(e) = self.workspace.load_sessions().await {
            debug!("Starting without a chat list: {e}");
        }
        let connection = self.jira.refresh(self.backend(), self.user_id()).await;
        format!("{}\n{}", render::sessions(&self.workspace.snapshot()), render::jira(&connection))
    }

    pub async fn handle(&self, command: Command) -> anyhow::Result<Reply> {
        let output = match command {
            Command::Quit => return Ok(Reply::Quit),
            Command::Help => super::HELP.to_string(),
            Command::Send(text) => self.send(&text).await?,
            Command::New => {
                let conversation = self.workspace.create_session().await?;
                format!("Started a new chat ({})", conversation.id)
            }
            Command::Sessions => {
                self.workspace.load_sessions().await?;
                render::sessions(&self.workspace.snapshot())
            }
            Command::Open(target) => self.open(&target).await?,
            Command::Rename(title) => {
                let id = self.active_session()?;
                self.workspace.rename_session(&id, &title).await?;
                render::sessions(&self.workspace.snapshot())
            }
            Command::Cases => render::cases(&self.workspace.snapshot()),
            Command::Export { project, selection, requirement } => {
                let ids = match selection {
                    Selection::Ids(ids) => ids,
                    Selection::All => self
                        .workspace
                        .snapshot()
                        .messages
                        .iter()
                        .flat_map(|m| m.testcases.iter().map(|tc| tc.id.clone()))
                        .collect(),
                };
                let summary = self
                    .workspace
                    .export_batch(&ids, Some(&project), requirement.as_deref())
                    .await?;
                let mut out = render::cases(&self.workspace.snapshot());
                if !summary.already_exported.is_empty() {
                    out.push_str(&format!("Already exported: {}\n", summary.already_exported.join(", ")));
                }
                out
            }
            Command::Exports => {
                let seeded = self.workspace.open_export_view().await?;
                format!("{seeded} previous export(s) loaded\n{}", render::cases(&self.workspace.snapshot()))
            }
            Command::Projects => render::projects(&self.workspace.jira_projects().await?),
            Command::Jira(jira) => self.jira(jira).await?,
            Command::Docs => {
                let session = self.active_session()?;
                self.shelf.refresh(self.backend(), self.user_id(), &session).await?;
                render::documents(&self.shelf.documents())
            }
            Command::Upload(path) => {
                let session = self.active_session()?;
                let path = Path::new(&path);
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Could not read {}", path.display()))?;
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("document")
                    .to_string();
                let file = FileUpload { filename, mime: mime_for(path), bytes };
                self.shelf.upload(self.backend(), self.user_id(), &session, file).await?;
                render::documents(&self.shelf.documents())
            }
            Command::Toggle(id) => {
                self.shelf.toggle(self.backend(), self.user_id(), &id).await?;
                render::documents(&self.shelf.documents())
            }
            Command::Reqs => {
                let session = self.active_session()?;
                self.import.refresh(self.backend(), self.user_id(), &session).await?;
                render::session_requirements(&self.import.requirements())
            }
            Command::Import(step) => self.import(step).await?,
            Command::DeleteReq(id) => {
                let session = self.active_session()?;
                self.import.delete(self.backend(), self.user_id(), &session, &id).await?;
                render::session_requirements(&self.import.requirements())
            }
            Command::Analytics { search, page } => {
                let dashboard = Dashboard::load(self.backend(), self.user_id(), self.analytics_days).await;
                let table = SessionTable { page, ..SessionTable::default().with_search(search) };
                render::dashboard(&dashboard, &table.page(&dashboard.sessions), self.analytics_days)
            }
        };
        Ok(Reply::Output(output))
    }

    /// Agent failures end in a visible assistant message, so only
    /// validation problems are errors here.
    async fn send(&self, text: &str) -> Result<String, AppError> {
        match self.workspace.send(text).await {
            Ok(()) => {}
            Err(e) if e.is_validation() => return Err(e),
            Err(e) => debug!("Send failed, showing the failure message: {e}"),
        }
        let snapshot = self.workspace.snapshot();
        Ok(snapshot
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| render::message(m, &snapshot.exports))
            .unwrap_or_default())
    }

    async fn open(&self, target: &str) -> Result<String, AppError> {
        let snapshot = self.workspace.snapshot();
        let id = target
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| snapshot.sessions.get(i))
            .map(|c| c.id.clone())
            .unwrap_or_else(|| target.to_string());
        match self.workspace.select_session(&id).await? {
            LoadOutcome::Committed(_) => Ok(render::transcript(&self.workspace.snapshot())),
            LoadOutcome::Discarded => Ok(String::new()),
        }
    }

    async fn jira(&self, command: JiraCommand) -> Result<String, AppError> {
        let (backend, user) = (self.backend(), self.user_id());
        match command {
            JiraCommand::Status => Ok(render::jira(&self.jira.refresh(backend, user).await)),
            JiraCommand::Connect => {
                let url = self.jira.authorization_url(backend, user).await?;
                Ok(format!("Open this URL to authorise Jira, then run /jira code <code>:\n{url}"))
            }
            JiraCommand::Code(code) => {
                self.jira.complete_authorization(backend, user, &code).await?;
                Ok(render::jira(&self.jira.connection()))
            }
            JiraCommand::Disconnect => {
                self.jira.disconnect(backend, user).await?;
                Ok(render::jira(&self.jira.connection()))
            }
        }
    }

    async fn import(&self, step: ImportCommand) -> Result<String, AppError> {
        let (backend, user) = (self.backend(), self.user_id());
        let candidates = || render::candidates(&self.import.candidates(), |id| self.import.is_selected(id));
        match step {
            ImportCommand::Start => {
                let connected = self.jira.refresh(backend, user).await.connected;
                self.import.start_import(backend, user, connected).await?;
                Ok(format!(
                    "Pick a project with /import project <KEY>:\n{}",
                    render::projects(&self.import.projects())
                ))
            }
            ImportCommand::Project(key) => {
                self.import.choose_project(backend, user, &key).await?;
                Ok(candidates())
            }
            ImportCommand::Pick(ids) => {
                for id in &ids {
                    self.import.toggle(id);
                }
                Ok(candidates())
            }
            ImportCommand::Run => {
                let session = self.active_session()?;
                match self.import.prepare_import(backend, user, &session).await? {
                    ImportStep::NeedsConfirmation(report) => Ok(format!(
                        "{} selected requirement(s) are already in this chat ({}).\n\
                         /import overwrite replaces them, /import back returns to the selection.",
                        report.count,
                        report.existing_ids.join(", ")
                    )),
                    ImportStep::Imported(_) => Ok(render::session_requirements(&self.import.requirements())),
                }
            }
            ImportCommand::Overwrite => {
                if self.import.view() != ImportView::ConfirmOverwrite {
                    return Ok("Nothing is waiting for confirmation.".to_string());
                }
                let session = self.active_session()?;
                self.import.confirm_overwrite(backend, user, &session).await?;
                Ok(render::session_requirements(&self.import.requirements()))
            }
            ImportCommand::Back => {
                self.import.cancel_overwrite();
                Ok(candidates())
            }
            ImportCommand::Cancel => {
                self.import.cancel();
                Ok("Import cancelled.".to_string())
            }
        }
    }
}
