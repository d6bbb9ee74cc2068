//! Backend contracts consumed by the workspace.
//!
//! The traits are `?Send`: every implementation runs on a single-threaded
//! event loop (the browser, or a current-thread Tokio runtime).

pub mod rest;
pub mod wire;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;
use crate::models::{
    AnalyticsOverview, Conversation, DuplicateReport, ExportReceipt, ExportRecord,
    JiraConnection, JiraProject, JiraRequirement, SessionDocument, SessionRequirement, TestCase,
    TimeseriesPoint,
};

pub use rest::{ApiRequest, Body, FileUpload, Method, RestBackend, Transport};

/// Session lifecycle and messaging on the agent backend.
#[async_trait(?Send)]
pub trait SessionBackend {
    async fn create_session(&self, user_id: &str) -> Result<Conversation>;

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Conversation>>;

    async fn rename_session(&self, user_id: &str, session_id: &str, title: &str) -> Result<()>;

    /// Returns the raw agent reply; see [`crate::transform::transform_reply`].
    async fn send_message(&self, user_id: &str, session_id: &str, text: &str) -> Result<Value>;

    /// Returns the raw history payload; see [`crate::transform::transform_history`].
    async fn fetch_messages(&self, user_id: &str, session_id: &str) -> Result<Value>;
}

/// Body of a single test-case export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRequest<'a> {
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub project_key: &'a str,
    pub test_case: &'a TestCase,
    pub requirement_key: Option<&'a str>,
}

#[async_trait(?Send)]
pub trait JiraBackend {
    async fn jira_status(&self, user_id: &str) -> Result<JiraConnection>;

    async fn jira_authorization_url(&self, user_id: &str) -> Result<String>;

    /// Completes the OAuth dance with the code Jira redirected back with.
    async fn jira_exchange_code(&self, user_id: &str, code: &str) -> Result<bool>;

    async fn jira_disconnect(&self, user_id: &str) -> Result<()>;

    async fn jira_projects(&self, user_id: &str) -> Result<Vec<JiraProject>>;

    async fn jira_requirements(&self, user_id: &str, project_key: &str)
        -> Result<Vec<JiraRequirement>>;

    async fn export_test_case(&self, request: &ExportRequest<'_>) -> Result<ExportReceipt>;

    async fn export_history(&self, user_id: &str, session_id: &str) -> Result<Vec<ExportRecord>>;
}

#[async_trait(?Send)]
pub trait RequirementsBackend {
    async fn session_requirements(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionRequirement>>;

    async fn check_duplicates(
        &self,
        user_id: &str,
        session_id: &str,
        requirement_ids: &[String],
    ) -> Result<DuplicateReport>;

    /// Returns the server's summary message.
    async fn import_requirements(
        &self,
        user_id: &str,
        session_id: &str,
        requirements: &[JiraRequirement],
        overwrite: bool,
    ) -> Result<String>;

    async fn delete_requirement(
        &self,
        user_id: &str,
        session_id: &str,
        requirement_id: &str,
    ) -> Result<()>;
}

#[async_trait(?Send)]
pub trait DocumentBackend {
    async fn upload_document(&self, user_id: &str, session_id: &str, file: FileUpload)
        -> Result<()>;

    async fn session_documents(&self, user_id: &str, session_id: &str)
        -> Result<Vec<SessionDocument>>;

    async fn toggle_document(&self, user_id: &str, document_id: &str, active: bool) -> Result<()>;
}

#[async_trait(?Send)]
pub trait AnalyticsBackend {
    async fn analytics_overview(&self, user_id: &str) -> Result<AnalyticsOverview>;

    async fn exports_timeseries(&self, user_id: &str, days: u32) -> Result<Vec<TimeseriesPoint>>;
}

/// Everything the studio talks to.
pub trait Backend:
    SessionBackend + JiraBackend + RequirementsBackend + DocumentBackend + AnalyticsBackend
{
}

impl<T> Backend for T where
    T: SessionBackend + JiraBackend + RequirementsBackend + DocumentBackend + AnalyticsBackend
{
}
