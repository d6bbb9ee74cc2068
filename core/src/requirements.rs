//! Session requirements and the Jira import wizard.
//!
//! The wizard moves `List → Projects → Requirements → (ConfirmOverwrite) →
//! Importing → List`. Every failure lands on a screen the user can act from.

use std::cell::RefCell;
use std::collections::BTreeSet;

use tracing::{debug, error, info};

use crate::api::{JiraBackend, RequirementsBackend};
use crate::errors::{AppError, Result};
use crate::models::{DuplicateReport, JiraProject, JiraRequirement, Notice, SessionRequirement};
use crate::notices::Notifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportView {
    #[default]
    List,
    Projects,
    Requirements,
    ConfirmOverwrite,
    Importing,
}

/// What [`ImportFlow::prepare_import`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStep {
    /// Some selected requirements already belong to the session.
    NeedsConfirmation(DuplicateReport),
    /// Imported straight away; carries the server's summary.
    Imported(String),
}

#[derive(Debug, Default)]
struct FlowState {
    view: ImportView,
    requirements: Vec<SessionRequirement>,
    projects: Vec<JiraProject>,
    project_key: Option<String>,
    candidates: Vec<JiraRequirement>,
    selected: BTreeSet<String>,
    duplicates: Option<DuplicateReport>,
    loading: bool,
}

pub struct ImportFlow {
    state: RefCell<FlowState>,
    notifier: Notifier,
}

impl ImportFlow {
    pub fn new(notifier: Notifier) -> Self {
        Self { state: RefCell::new(FlowState::default()), notifier }
    }

    pub fn view(&self) -> ImportView {
        self.state.borrow().view
    }

    pub fn requirements(&self) -> Vec<SessionRequirement> {
        self.state.borrow().requirements.clone()
    }

    pub fn projects(&self) -> Vec<JiraProject> {
        self.state.borrow().projects.clone()
    }

    pub fn project_key(&self) -> Option<String> {
        self.state.borrow().project_key.clone()
    }

    pub fn candidates(&self) -> Vec<JiraRequirement> {
        self.state.borrow().candidates.clone()
    }

    pub fn is_selected(&self, requirement_id: &str) -> bool {
        self.state.borrow().selected.contains(requirement_id)
    }

    pub fn selected_count(&self) -> usize {
        self.state.borrow().selected.len()
    }

    pub fn duplicates(&self) -> Option<DuplicateReport> {
        self.state.borrow().duplicates.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    fn set_view(&self, view: ImportView) {
        let mut st = self.state.borrow_mut();
        debug!("Import view {:?} -> {:?}", st.view, view);
        st.view = view;
    }

    fn set_loading(&self, loading: bool) {
        self.state.borrow_mut().loading = loading;
    }

    /// Reloads the requirements already attached to the session.
    pub async fn refresh<B>(&self, backend: &B, user_id: &str, session_id: &str) -> Result<usize>
    where
        B: RequirementsBackend + ?Sized,
    {
        let requirements = backend.session_requirements(user_id, session_id).await.map_err(|e| {
            error!("Failed to fetch requirements: {e}");
            e
        })?;
        let count = requirements.len();
        self.state.borrow_mut().requirements = requirements;
        Ok(count)
    }

    /// Opens the project picker. Refused with a warning while Jira is not linked.
    pub async fn start_import<B>(&self, backend: &B, user_id: &str, jira_connected: bool) -> Result<usize>
    where
        B: JiraBackend + ?Sized,
    {
        if !jira_connected {
            self.notifier.push(Notice::warning(
                "Jira Not Connected",
                "Please connect your Jira account in the profile menu first.",
            ));
            return Err(AppError::JiraNotConnected);
        }
        self.set_view(ImportView::Projects);
        self.set_loading(true);
        let result = backend.jira_projects(user_id).await;
        self.set_loading(false);
        match result {
            Ok(projects) => {
                let count = projects.len();
                self.state.borrow_mut().projects = projects;
                Ok(count)
            }
            Err(e) => {
                error!("Failed to load Jira projects: {e}");
                self.notifier.push(Notice::error("Failed to load projects", &e));
                self.set_view(ImportView::List);
                Err(e)
            }
        }
    }

    /// Loads the project's requirements and shows them for selection.
    pub async fn choose_project<B>(&self, backend: &B, user_id: &str, project_key: &str) -> Result<usize>
    where
        B: JiraBackend + ?Sized,
    {
        self.set_loading(true);
        let result = backend.jira_requirements(user_id, project_key).await;
        self.set_loading(false);
        match result {
            Ok(candidates) => {
                let count = candidates.len();
                {
                    let mut st = self.state.borrow_mut();
                    st.project_key = Some(project_key.to_string());
                    st.candidates = candidates;
                    st.selected.clear();
                }
                self.set_view(ImportView::Requirements);
                Ok(count)
            }
            Err(e) => {
                error!("Failed to load requirements of {project_key}: {e}");
                self.notifier.push(Notice::error("Failed to load requirements", &e));
                Err(e)
            }
        }
    }

    /// Flips the selection of one candidate; returns whether it is now selected.
    pub fn toggle(&self, requirement_id: &str) -> bool {
        let mut st = self.state.borrow_mut();
        if st.selected.remove(requirement_id) {
            false
        } else {
            st.selected.insert(requirement_id.to_string())
        }
    }

    pub fn back_to_projects(&self) {
        self.set_view(ImportView::Projects);
    }

    /// Leaves the wizard without importing.
    pub fn cancel(&self) {
        {
            let mut st = self.state.borrow_mut();
            st.selected.clear();
            st.duplicates = None;
        }
        self.set_view(ImportView::List);
    }

    /// Returns to the selection after the overwrite prompt was declined.
    pub fn cancel_overwrite(&self) {
        self.state.borrow_mut().duplicates = None;
        self.set_view(ImportView::Requirements);
    }

    fn selected_candidates(&self) -> Vec<JiraRequirement> {
        let st = self.state.borrow();
        st.candidates
            .iter()
            .filter(|r| st.selected.contains(&r.id))
            .cloned()
            .collect()
    }

    /// Checks the selection for requirements the session already has, then
    /// either asks for confirmation or imports.
    pub async fn prepare_import<B>(&self, backend: &B, user_id: &str, session_id: &str) -> Result<ImportStep>
    where
        B: RequirementsBackend + ?Sized,
    {
        let selected = self.selected_candidates();
        if selected.is_empty() {
            self.notifier.push(Notice::warning("Please select requirements", "Nothing is selected."));
            return Err(AppError::empty_field("selection"));
        }
        let ids: Vec<String> = selected.iter().map(|r| r.id.clone()).collect();

        self.set_loading(true);
        let report = backend.check_duplicates(user_id, session_id, &ids).await;
        self.set_loading(false);
        let report = report.map_err(|e| {
            error!("Duplicate check failed: {e}");
            self.notifier.push(Notice::error("Failed to check duplicates", &e));
            e
        })?;

        if report.has_duplicates {
            info!("{} selected requirement(s) already imported", report.count);
            self.state.borrow_mut().duplicates = Some(report.clone());
            self.set_view(ImportView::ConfirmOverwrite);
            return Ok(ImportStep::NeedsConfirmation(report));
        }
        self.import(backend, user_id, session_id, false).await.map(ImportStep::Imported)
    }

    /// Imports the selection replacing the session's existing copies.
    pub async fn confirm_overwrite<B>(&self, backend: &B, user_id: &str, session_id: &str) -> Result<String>
    where
        B: RequirementsBackend + ?Sized,
    {
        self.import(backend, user_id, session_id, true).await
    }

    async fn import<B>(&self, backend: &B, user_id: &str, session_id: &str, overwrite: bool) -> Result<String>
    where
        B: RequirementsBackend + ?Sized,
    {
        let selected = self.selected_candidates();
        self.set_view(ImportView::Importing);
        self.set_loading(true);
        let result = backend.import_requirements(user_id, session_id, &selected, overwrite).await;
        self.set_loading(false);

        let message = match result {
            Ok(message) => message,
            Err(e) => {
                error!("Requirement import failed: {e}");
                self.notifier.push(Notice::error("Import failed", &e));
                self.set_view(ImportView::Requirements);
                return Err(e);
            }
        };
        info!("Imported {} requirement(s) into {session_id}", selected.len());
        self.notifier.push(Notice::success("Success", message.clone()));
        if let Err(e) = self.refresh(backend, user_id, session_id).await {
            debug!("Requirement list stays stale after import: {e}");
        }
        self.cancel();
        Ok(message)
    }

    pub async fn delete<B>(&self, backend: &B, user_id: &str, session_id: &str, requirement_id: &str) -> Result<()>
    where
        B: RequirementsBackend + ?Sized,
    {
        if let Err(e) = backend.delete_requirement(user_id, session_id, requirement_id).await {
            error!("Failed to delete requirement {requirement_id}: {e}");
            self.notifier.push(Notice::error("Failed to delete requirement", &e));
            return Err(e);
        }
        self.notifier.push(Notice::success("Deleted", "Requirement deleted successfully"));
        if let Err(e) = self.refresh(backend, user_id, session_id).await {
            debug!("Requirement list stays stale after delete: {e}");
        }
        Ok(())
    }
}
