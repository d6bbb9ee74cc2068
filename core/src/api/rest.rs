use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};

use super::wire;
use super::{
    AnalyticsBackend, DocumentBackend, ExportRequest, JiraBackend, RequirementsBackend,
    SessionBackend,
};
use crate::errors::Result;
use crate::models::{
    AnalyticsOverview, Conversation, DuplicateReport, ExportReceipt, ExportRecord,
    JiraConnection, JiraProject, JiraRequirement, SessionDocument, SessionRequirement,
    TimeseriesPoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// File attached to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart { fields: Vec<(String, String)>, file: FileUpload },
}

/// A request relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: Body::Empty }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Body::Form(fields);
        self
    }

    pub fn multipart(mut self, fields: Vec<(String, String)>, file: FileUpload) -> Self {
        self.body = Body::Multipart { fields, file };
        self
    }
}

/// Executes requests against one HTTP origin.
///
/// Implementations return the parsed JSON body (`Value::Null` when empty),
/// `AppError::Http` for non-2xx answers (body preserved) and
/// `AppError::Network` for transport failures.
#[async_trait(?Send)]
pub trait Transport {
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

/// REST client for the agent backend, generic over the HTTP stack.
pub struct RestBackend<T> {
    transport: T,
}

impl<T: Transport> RestBackend<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Unreserved characters of RFC 3986 stay as they are.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Path segments are ids handed out by the backend; reserved characters are escaped.
fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

#[async_trait(?Send)]
impl<T: Transport> SessionBackend for RestBackend<T> {
    async fn create_session(&self, user_id: &str) -> Result<Conversation> {
        let body = self
            .transport
            .execute(ApiRequest::post("/new-session").json(json!({ "user_id": user_id })))
            .await?;
        wire::decode_created_session(&body)
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let body = self
            .transport
            .execute(ApiRequest::get(format!("/sessions/{}", segment(user_id))))
            .await?;
        wire::decode_sessions(&body)
    }

    async fn rename_session(&self, user_id: &str, session_id: &str, title: &str) -> Result<()> {
        let body = self
            .transport
            .execute(
                ApiRequest::patch(format!("/sessions/{}/title", segment(session_id)))
                    .query("user_id", user_id)
                    .json(json!({ "new_title": title })),
            )
            .await?;
        wire::check_rejection(&body)
    }

    async fn send_message(&self, user_id: &str, session_id: &str, text: &str) -> Result<Value> {
        let body = self
            .transport
            .execute(
                ApiRequest::post(format!("/sessions/{}/messages", segment(session_id)))
                    .json(json!({ "user_id": user_id, "message": text })),
            )
            .await?;
        wire::check_rejection(&body)?;
        Ok(body)
    }

    async fn fetch_messages(&self, user_id: &str, session_id: &str) -> Result<Value> {
        let body = self
            .transport
            .execute(
                ApiRequest::get(format!("/sessions/{}/messages", segment(session_id)))
                    .query("user_id", user_id),
            )
            .await?;
        wire::check_rejection(&body)?;
        Ok(body)
    }
}

#[async_trait(?Send)]
impl<T: Transport> JiraBackend for RestBackend<T> {
    async fn jira_status(&self, user_id: &str) -> Result<JiraConnection> {
        let body = self
            .transport
            .execute(ApiRequest::get("/api/jira/status").query("user_id", user_id))
            .await?;
        wire::decode_jira_status(&body)
    }

    async fn jira_authorization_url(&self, user_id: &str) -> Result<String> {
        let body = self
            .transport
            .execute(ApiRequest::get("/api/jira/connect").query("user_id", user_id))
            .await?;
        wire::decode_authorization_url(&body)
    }

    async fn jira_exchange_code(&self, user_id: &str, code: &str) -> Result<bool> {
        let body = self
            .transport
            .execute(
                ApiRequest::post("/api/jira/callback")
                    .json(json!({ "user_id": user_id, "code": code })),
            )
            .await?;
        wire::decode_callback(&body)
    }

    async fn jira_disconnect(&self, user_id: &str) -> Result<()> {
        let body = self
            .transport
            .execute(ApiRequest::delete("/api/jira/disconnect").query("user_id", user_id))
            .await?;
        wire::check_rejection(&body)
    }

    async fn jira_projects(&self, user_id: &str) -> Result<Vec<JiraProject>> {
        let body = self
            .transport
            .execute(ApiRequest::get("/api/jira/projects").query("user_id", user_id))
            .await?;
        wire::decode_projects(&body)
    }

    async fn jira_requirements(
        &self,
        user_id: &str,
        project_key: &str,
    ) -> Result<Vec<JiraRequirement>> {
        let body = self
            .transport
            .execute(
                ApiRequest::post("/api/jira/fetch-requirements")
                    .json(json!({ "user_id": user_id, "project_key": project_key })),
            )
            .await?;
        wire::decode_jira_requirements(&body)
    }

    async fn export_test_case(&self, request: &ExportRequest<'_>) -> Result<ExportReceipt> {
        let payload = serde_json::to_value(request)
            .map_err(|e| crate::errors::AppError::decode("export request", e))?;
        let body = self
            .transport
            .execute(ApiRequest::post("/api/jira/create-jira-test-case").json(payload))
            .await?;
        wire::decode_export_receipt(&body)
    }

    async fn export_history(&self, user_id: &str, session_id: &str) -> Result<Vec<ExportRecord>> {
        let body = self
            .transport
            .execute(
                ApiRequest::get("/api/jira/exports")
                    .query("session_id", session_id)
                    .query("user_id", user_id),
            )
            .await?;
        wire::decode_export_history(&body)
    }
}

#[async_trait(?Send)]
impl<T: Transport> RequirementsBackend for RestBackend<T> {
    async fn session_requirements(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionRequirement>> {
        let body = self
            .transport
            .execute(
                ApiRequest::get(format!("/api/requirements/session/{}", segment(session_id)))
                    .query("user_id", user_id),
            )
            .await?;
        wire::decode_session_requirements(&body)
    }

    async fn check_duplicates(
        &self,
        user_id: &str,
        session_id: &str,
        requirement_ids: &[String],
    ) -> Result<DuplicateReport> {
        let body = self
            .transport
            .execute(ApiRequest::post("/api/jira/check-duplicate-requirements").json(json!({
                "user_id": user_id,
                "session_id": session_id,
                "requirement_ids": requirement_ids,
            })))
            .await?;
        wire::decode_duplicates(&body)
    }

    async fn import_requirements(
        &self,
        user_id: &str,
        session_id: &str,
        requirements: &[JiraRequirement],
        overwrite: bool,
    ) -> Result<String> {
        let body = self
            .transport
            .execute(ApiRequest::post("/api/jira/import-requirements").json(json!({
                "user_id": user_id,
                "session_id": session_id,
                "requirements": requirements,
                "overwrite": overwrite,
            })))
            .await?;
        wire::decode_message(&body, "Requirements imported")
    }

    async fn delete_requirement(
        &self,
        user_id: &str,
        session_id: &str,
        requirement_id: &str,
    ) -> Result<()> {
        let body = self
            .transport
            .execute(
                ApiRequest::delete(format!("/api/requirements/{}", segment(requirement_id)))
                    .query("user_id", user_id)
                    .query("session_id", session_id),
            )
            .await?;
        wire::check_rejection(&body)
    }
}

#[async_trait(?Send)]
impl<T: Transport> DocumentBackend for RestBackend<T> {
    async fn upload_document(
        &self,
        user_id: &str,
        session_id: &str,
        file: FileUpload,
    ) -> Result<()> {
        let fields = vec![
            ("user_id".to_string(), user_id.to_string()),
            ("session_id".to_string(), session_id.to_string()),
        ];
        let body = self
            .transport
            .execute(ApiRequest::post("/api/rag/upload").multipart(fields, file))
            .await?;
        wire::check_rejection(&body)
    }

    async fn session_documents(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionDocument>> {
        let body = self
            .transport
            .execute(
                ApiRequest::get(format!("/api/rag/documents/session/{}", segment(session_id)))
                    .query("user_id", user_id),
            )
            .await?;
        wire::decode_documents(&body)
    }

    async fn toggle_document(&self, user_id: &str, document_id: &str, active: bool) -> Result<()> {
        let body = self
            .transport
            .execute(
                ApiRequest::patch(format!("/api/rag/documents/{}/toggle", segment(document_id)))
                    .form(vec![
                        ("user_id".to_string(), user_id.to_string()),
                        ("is_active".to_string(), active.to_string()),
                    ]),
            )
            .await?;
        wire::check_rejection(&body)
    }
}

#[async_trait(?Send)]
impl<T: Transport> AnalyticsBackend for RestBackend<T> {
    async fn analytics_overview(&self, user_id: &str) -> Result<AnalyticsOverview> {
        let body = self
            .transport
            .execute(ApiRequest::get("/api/analytics/overview").query("user_id", user_id))
            .await?;
        wire::decode_overview(&body)
    }

    async fn exports_timeseries(&self, user_id: &str, days: u32) -> Result<Vec<TimeseriesPoint>> {
        let body = self
            .transport
            .execute(
                ApiRequest::get("/api/analytics/exports-timeseries")
                    .query("user_id", user_id)
                    .query("days", days.to_string()),
            )
            .await?;
        wire::decode_timeseries(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records requests and answers each with a canned body.
    struct CannedTransport {
        seen: RefCell<Vec<ApiRequest>>,
        reply: Value,
    }

    #[async_trait(?Send)]
    impl Transport for CannedTransport {
        async fn execute(&self, request: ApiRequest) -> Result<Value> {
            self.seen.borrow_mut().push(request);
            Ok(self.reply.clone())
        }
    }

    fn backend(reply: Value) -> RestBackend<CannedTransport> {
        RestBackend::new(CannedTransport { seen: RefCell::new(Vec::new()), reply })
    }

    #[tokio::test]
    async fn rename_patches_title_with_user_query() {
        let backend = backend(json!({"status": "success"}));
        backend.rename_session("u1", "s 1", "Renamed").await.unwrap();

        let seen = backend.transport().seen.borrow();
        assert_eq!(seen[0].method, Method::Patch);
        assert_eq!(seen[0].path, "/sessions/s%201/title");
        assert_eq!(seen[0].query, vec![("user_id".to_string(), "u1".to_string())]);
        assert_eq!(seen[0].body, Body::Json(json!({"new_title": "Renamed"})));
    }

    #[tokio::test]
    async fn toggle_sends_form_fields() {
        let backend = backend(Value::Null);
        backend.toggle_document("u1", "doc-1", false).await.unwrap();

        let seen = backend.transport().seen.borrow();
        assert_eq!(
            seen[0].body,
            Body::Form(vec![
                ("user_id".to_string(), "u1".to_string()),
                ("is_active".to_string(), "false".to_string()),
            ])
        );
    }

    #[tokio::test]
    async fn send_message_surfaces_body_errors() {
        let backend = backend(json!({"error": "agent offline"}));
        let err = backend.send_message("u1", "s1", "hi").await.unwrap_err();
        assert_eq!(err.to_string(), "agent offline");
    }

    #[test]
    fn segments_escape_reserved_characters() {
        assert_eq!(segment("abc-1_2.3~"), "abc-1_2.3~");
        assert_eq!(segment("a/b?c"), "a%2Fb%3Fc");
        assert_eq!(segment("é"), "%C3%A9");
    }
}
