use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos::task::spawn_local;
use web_sys::File;

use testgen_core::analytics::Dashboard;
use testgen_core::auth::{AuthSession, AuthUser};
use testgen_core::documents::DocumentShelf;
use testgen_core::jira::JiraLink;
use testgen_core::models::{
    DuplicateReport, JiraConnection, JiraProject, JiraRequirement, Notice, SessionDocument,
    SessionRequirement,
};
use testgen_core::requirements::{ImportFlow, ImportView};
use testgen_core::{Notifier, Result, Workspace, WorkspaceSnapshot};

use crate::api::{self, Backend, Identity};

const TOAST_MS: u32 = 5_000;

fn settle<T>(what: &str, result: Result<T>) -> Option<T> {
    result.map_err(|e| log::debug!("{what}: {e}")).ok()
}

// ── Sign-in ─────────────────────────────────────────────────────────────────

/// Who is using the app, provided via Leptos context above the studio.
#[derive(Clone, Copy)]
pub struct AuthState {
    session: StoredValue<Option<Rc<AuthSession<Identity>>>, LocalStorage>,
    pub user: ReadSignal<Option<AuthUser>>,
    set_user: WriteSignal<Option<AuthUser>>,
    /// Set instead of `user` when no identity provider is configured.
    pub guest: ReadSignal<Option<String>>,
    pub busy: RwSignal<bool>,
    pub error: RwSignal<Option<String>>,
}

impl AuthState {
    pub fn provide() -> Self {
        let identity = api::identity();
        let guest = match &identity {
            Some(_) => None,
            None => {
                let id = format!("local-{}", uuid::Uuid::new_v4());
                log::warn!("FIREBASE_API_KEY was not set at build time; continuing as {id}");
                Some(id)
            }
        };
        let (user, set_user) = signal(None::<AuthUser>);
        let (guest, _) = signal(guest);

        let state = Self {
            session: StoredValue::new_local(identity.map(|p| Rc::new(AuthSession::new(p)))),
            user,
            set_user,
            guest,
            busy: RwSignal::new(false),
            error: RwSignal::new(None),
        };
        provide_context(state);
        state
    }

    /// The id the studio runs under: a verified account, or the guest id.
    pub fn signed_in_as(&self) -> Option<String> {
        self.guest.get().or_else(|| {
            self.user
                .get()
                .filter(|u| u.email_verified)
                .map(|u| u.uid)
        })
    }

    fn run<F, Fut>(&self, action: F)
    where
        F: FnOnce(Rc<AuthSession<Identity>>) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        let Some(session) = self.session.get_value() else {
            return;
        };
        let auth = *self;
        auth.busy.set(true);
        auth.error.set(None);
        spawn_local(async move {
            let result = action(session.clone()).await;
            auth.busy.set(false);
            if let Err(e) = result {
                log::warn!("Authentication request failed: {e}");
                auth.error.set(Some(e.to_string()));
            }
            auth.set_user.set(session.current());
        });
    }

    pub fn sign_in(&self, email: String, password: String) {
        self.run(move |s| async move { s.sign_in(&email, &password).await.map(|_| ()) });
    }

    pub fn sign_up(&self, email: String, password: String, display_name: String) {
        self.run(move |s| async move {
            s.sign_up(&email, &password, Some(display_name.as_str())).await.map(|_| ())
        });
    }

    pub fn resend_verification(&self) {
        self.run(|s| async move { s.send_verification().await });
    }

    /// Picks up a verification completed in another tab.
    pub fn reload(&self) {
        self.run(|s| async move { s.reload().await.map(|_| ()) });
    }

    pub fn sign_out(&self) {
        if let Some(session) = self.session.get_value() {
            session.sign_out();
        }
        self.error.set(None);
        self.set_user.set(None);
    }
}

// ── Studio ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Panel {
    #[default]
    Chat,
    Documents,
    Requirements,
    Analytics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub notice: Notice,
}

/// Render-ready copy of the import wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportState {
    pub view: ImportView,
    pub requirements: Vec<SessionRequirement>,
    pub projects: Vec<JiraProject>,
    pub project_key: Option<String>,
    pub candidates: Vec<(JiraRequirement, bool)>,
    pub selected: usize,
    pub duplicates: Option<DuplicateReport>,
    pub loading: bool,
}

impl ImportState {
    fn read(flow: &ImportFlow) -> Self {
        Self {
            view: flow.view(),
            requirements: flow.requirements(),
            projects: flow.projects(),
            project_key: flow.project_key(),
            candidates: flow
                .candidates()
                .into_iter()
                .map(|r| {
                    let selected = flow.is_selected(&r.id);
                    (r, selected)
                })
                .collect(),
            selected: flow.selected_count(),
            duplicates: flow.duplicates(),
            loading: flow.is_loading(),
        }
    }
}

/// The controllers of one signed-in user. They share a backend and a notifier.
pub struct Controllers {
    pub workspace: Workspace<Backend>,
    pub jira: JiraLink,
    pub import: ImportFlow,
    pub shelf: DocumentShelf,
}

impl Controllers {
    fn backend(&self) -> &Backend {
        self.workspace.backend()
    }

    fn user_id(&self) -> &str {
        self.workspace.user_id()
    }
}

/// Shared studio state, provided via Leptos context.
///
/// The controllers own the truth; signals hold copies that components
/// subscribe to. The workspace pushes snapshots by itself, the other
/// controllers are read back after each call.
#[derive(Clone, Copy)]
pub struct AppState {
    controllers: StoredValue<Rc<Controllers>, LocalStorage>,

    // --- Read signals (for components to subscribe to) ---
    pub snapshot: ReadSignal<WorkspaceSnapshot>,
    pub active_session: Memo<Option<String>>,
    pub toasts: ReadSignal<Vec<Toast>>,
    pub jira: ReadSignal<JiraConnection>,
    pub documents: ReadSignal<Vec<SessionDocument>>,
    pub uploading: ReadSignal<bool>,
    pub import: ReadSignal<ImportState>,
    pub projects: ReadSignal<Vec<JiraProject>>,
    pub dashboard: ReadSignal<Option<Dashboard>>,
    pub panel: RwSignal<Panel>,

    // --- Write signals ---
    set_toasts: WriteSignal<Vec<Toast>>,
    set_jira: WriteSignal<JiraConnection>,
    set_documents: WriteSignal<Vec<SessionDocument>>,
    set_uploading: WriteSignal<bool>,
    set_import: WriteSignal<ImportState>,
    set_projects: WriteSignal<Vec<JiraProject>>,
    set_dashboard: WriteSignal<Option<Dashboard>>,
}

impl AppState {
    /// Builds the controllers for `user_id` and provides the state in the current context.
    pub fn provide(user_id: String) -> Self {
        let notifier = Notifier::new();
        let controllers = Rc::new(Controllers {
            workspace: Workspace::with_notifier(api::backend(), user_id, notifier.clone()),
            jira: JiraLink::new(notifier.clone()),
            import: ImportFlow::new(notifier.clone()),
            shelf: DocumentShelf::new(notifier.clone()),
        });

        let (snapshot, set_snapshot) = signal(controllers.workspace.snapshot());
        controllers
            .workspace
            .set_listener(move |snap| set_snapshot.set(snap.clone()));

        let (toasts, set_toasts) = signal(Vec::<Toast>::new());
        let next_id = Cell::new(0u64);
        notifier.set_listener(move |notice| {
            let id = next_id.get();
            next_id.set(id + 1);
            set_toasts.update(|t| t.push(Toast { id, notice }));
            Timeout::new(TOAST_MS, move || {
                let _ = set_toasts.try_update(|t| t.retain(|toast| toast.id != id));
            })
            .forget();
        });

        let (jira, set_jira) = signal(JiraConnection::default());
        let (documents, set_documents) = signal(Vec::<SessionDocument>::new());
        let (uploading, set_uploading) = signal(false);
        let (import, set_import) = signal(ImportState::default());
        let (projects, set_projects) = signal(Vec::<JiraProject>::new());
        let (dashboard, set_dashboard) = signal(None::<Dashboard>);

        let state = Self {
            controllers: StoredValue::new_local(controllers),
            snapshot,
            active_session: Memo::new(move |_| snapshot.with(|s| s.active_session_id.clone())),
            toasts,
            jira,
            documents,
            uploading,
            import,
            projects,
            dashboard,
            panel: RwSignal::new(Panel::Chat),
            set_toasts,
            set_jira,
            set_documents,
            set_uploading,
            set_import,
            set_projects,
            set_dashboard,
        };

        provide_context(state);
        state
    }

    fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(AppState, Rc<Controllers>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let controllers = self.controllers.get_value();
        spawn_local(task(*self, controllers));
    }

    fn active_id(&self) -> Option<String> {
        self.active_session.get_untracked()
    }

    fn sync_import(&self, c: &Controllers) {
        self.set_import.set(ImportState::read(&c.import));
    }

    pub fn dismiss(&self, id: u64) {
        self.set_toasts.update(|t| t.retain(|toast| toast.id != id));
    }

    /// Loads the chat list and the Jira link, finishing a Jira consent
    /// redirect first when the page was opened by one.
    pub fn start(&self) {
        self.spawn(|state, c| async move {
            settle("Loading sessions", c.workspace.load_sessions().await);
            let connection = match api::take_jira_callback_code() {
                Some(code) => {
                    settle(
                        "Completing Jira authorization",
                        c.jira.complete_authorization(c.backend(), c.user_id(), &code).await,
                    );
                    c.jira.connection()
                }
                None => c.jira.refresh(c.backend(), c.user_id()).await,
            };
            state.set_jira.set(connection);
        });
    }

    // --- Sessions and chat ---

    pub fn new_chat(&self) {
        self.panel.set(Panel::Chat);
        self.spawn(|state, c| async move {
            settle("Creating session", c.workspace.create_session().await);
            state.set_documents.set(Vec::new());
            state.set_import.set(ImportState::default());
        });
    }

    pub fn select(&self, id: String) {
        self.spawn(|state, c| async move {
            settle("Loading messages", c.workspace.select_session(&id).await);
            match state.panel.get_untracked() {
                Panel::Documents => state.refresh_documents(),
                Panel::Requirements => state.refresh_requirements(),
                Panel::Chat | Panel::Analytics => {}
            }
        });
    }

    pub fn rename(&self, id: String, title: String) {
        self.spawn(|_, c| async move {
            settle("Renaming session", c.workspace.rename_session(&id, &title).await);
        });
    }

    pub fn send(&self, text: String) {
        self.spawn(|_, c| async move {
            match c.workspace.send(&text).await {
                Ok(()) => {}
                Err(e) if e.is_validation() => {
                    c.workspace.notifier().push(Notice::warning("Message not sent", e.to_string()));
                }
                // the failure is already in the transcript
                Err(e) => log::debug!("Send failed: {e}"),
            }
        });
    }

    // --- Export ---

    /// Loads the Jira projects and the active session's earlier exports.
    pub fn open_export(&self) {
        self.spawn(|state, c| async move {
            if let Some(projects) = settle("Loading projects", c.workspace.jira_projects().await) {
                state.set_projects.set(projects);
            }
            settle("Loading export history", c.workspace.open_export_view().await);
        });
    }

    pub fn export(&self, ids: Vec<String>, project_key: String, requirement_key: String) {
        self.spawn(|_, c| async move {
            let result = c
                .workspace
                .export_batch(&ids, Some(project_key.as_str()), Some(requirement_key.as_str()))
                .await;
            if let Some(summary) = settle("Exporting", result) {
                log::info!("{}", summary.message());
            }
        });
    }

    // --- Jira connection ---

    pub fn connect_jira(&self) {
        self.spawn(|_, c| async move {
            if let Some(url) = settle(
                "Jira authorization URL",
                c.jira.authorization_url(c.backend(), c.user_id()).await,
            ) {
                api::navigate(&url);
            }
        });
    }

    pub fn disconnect_jira(&self) {
        self.spawn(|state, c| async move {
            settle("Disconnecting Jira", c.jira.disconnect(c.backend(), c.user_id()).await);
            state.set_jira.set(c.jira.connection());
        });
    }

    // --- Documents ---

    pub fn refresh_documents(&self) {
        let Some(session) = self.active_id() else {
            self.set_documents.set(Vec::new());
            return;
        };
        self.spawn(|state, c| async move {
            settle("Loading documents", c.shelf.refresh(c.backend(), c.user_id(), &session).await);
            state.set_documents.set(c.shelf.documents());
        });
    }

    pub fn upload(&self, file: File) {
        let Some(session) = self.active_id() else {
            return;
        };
        self.set_uploading.set(true);
        self.spawn(|state, c| async move {
            match api::read_file(&file).await {
                Ok(upload) => {
                    settle("Uploading", c.shelf.upload(c.backend(), c.user_id(), &session, upload).await);
                }
                Err(e) => c.workspace.notifier().push(Notice::error("Upload failed", &e)),
            }
            state.set_documents.set(c.shelf.documents());
            state.set_uploading.set(false);
        });
    }

    pub fn toggle_document(&self, id: String) {
        self.spawn(|state, c| async move {
            settle("Toggling document", c.shelf.toggle(c.backend(), c.user_id(), &id).await);
            state.set_documents.set(c.shelf.documents());
        });
    }

    // --- Requirements ---

    pub fn refresh_requirements(&self) {
        let Some(session) = self.active_id() else {
            self.set_import.set(ImportState::default());
            return;
        };
        self.spawn(|state, c| async move {
            settle("Loading requirements", c.import.refresh(c.backend(), c.user_id(), &session).await);
            state.sync_import(&c);
        });
    }

    pub fn start_import(&self) {
        let connected = self.jira.get_untracked().connected;
        self.spawn(move |state, c| async move {
            let pending = c.import.start_import(c.backend(), c.user_id(), connected);
            settle("Starting import", pending.await);
            state.sync_import(&c);
        });
    }

    pub fn choose_project(&self, key: String) {
        self.spawn(|state, c| async move {
            let pending = c.import.choose_project(c.backend(), c.user_id(), &key);
            settle("Loading Jira requirements", pending.await);
            state.sync_import(&c);
        });
    }

    pub fn toggle_candidate(&self, id: String) {
        let c = self.controllers.get_value();
        c.import.toggle(&id);
        self.sync_import(&c);
    }

    pub fn prepare_import(&self) {
        let Some(session) = self.active_id() else {
            return;
        };
        self.spawn(|state, c| async move {
            let pending = c.import.prepare_import(c.backend(), c.user_id(), &session);
            settle("Importing", pending.await);
            state.sync_import(&c);
        });
    }

    pub fn confirm_overwrite(&self) {
        let Some(session) = self.active_id() else {
            return;
        };
        self.spawn(|state, c| async move {
            let pending = c.import.confirm_overwrite(c.backend(), c.user_id(), &session);
            settle("Importing with overwrite", pending.await);
            state.sync_import(&c);
        });
    }

    pub fn cancel_overwrite(&self) {
        let c = self.controllers.get_value();
        c.import.cancel_overwrite();
        self.sync_import(&c);
    }

    pub fn back_to_projects(&self) {
        let c = self.controllers.get_value();
        c.import.back_to_projects();
        self.sync_import(&c);
    }

    pub fn cancel_import(&self) {
        let c = self.controllers.get_value();
        c.import.cancel();
        self.sync_import(&c);
    }

    pub fn delete_requirement(&self, id: String) {
        let Some(session) = self.active_id() else {
            return;
        };
        self.spawn(|state, c| async move {
            let pending = c.import.delete(c.backend(), c.user_id(), &session, &id);
            settle("Deleting requirement", pending.await);
            state.sync_import(&c);
        });
    }

    // --- Analytics ---

    pub fn load_dashboard(&self, days: u32) {
        self.spawn(move |state, c| async move {
            let dashboard = Dashboard::load(c.backend(), c.user_id(), days).await;
            state.set_dashboard.set(Some(dashboard));
        });
    }
}
