use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted, server-identified container for an ordered message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn new(id: String, title: String) -> Self {
        Self { id, title, updated_at: Some(Utc::now()) }
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled chat"
        } else {
            &self.title
        }
    }
}

/// Partial update applied by `touch_session`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MessageRole {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" | "model" | "agent" => Ok(MessageRole::Assistant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub testcases: Vec<TestCase>,
}

impl Message {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Some(Utc::now()),
            testcases: Vec::new(),
        }
    }

    pub fn with_testcases(mut self, testcases: Vec<TestCase>) -> Self {
        self.testcases = testcases;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDetail {
    pub step: String,
    pub expected: String,
}

/// A generated test case, serialised the way the export endpoint expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub preconditions: Vec<String>,
    #[serde(rename = "stepDetails")]
    pub step_details: Vec<StepDetail>,
    pub risk: String,
    pub regulatory_refs: Vec<String>,
    pub rationale: String,
}

impl TestCase {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled test case"
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Exporting,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStatusEntry {
    pub test_case_id: String,
    pub status: ExportStatus,
    pub jira_key: Option<String>,
    pub jira_url: Option<String>,
}

/// Issue created by a successful export call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    pub jira_key: Option<String>,
    pub jira_url: Option<String>,
}

/// Export persisted server-side, used for hydration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub testcase_id: Option<String>,
    pub jira_key: Option<String>,
    pub jira_url: Option<String>,
    pub status: Option<String>,
    pub exported_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraProject {
    pub key: String,
    pub name: String,
}

/// Requirement living in Jira, offered for import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraRequirement {
    pub id: String,
    pub jira_key: String,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub compliance_standard: String,
    #[serde(default)]
    pub jira_url: Option<String>,
}

/// Requirement already imported into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequirement {
    pub id: String,
    #[serde(default)]
    pub requirement_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub compliance_standard: String,
    #[serde(default)]
    pub jira_key: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub test_case_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub has_duplicates: bool,
    pub existing_ids: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub chunk_count: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub uploaded: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraConnection {
    pub connected: bool,
    #[serde(default)]
    pub jira_url: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub total_test_cases: u64,
    #[serde(default)]
    pub total_exports: u64,
    #[serde(default)]
    pub documents_uploaded: u64,
    #[serde(default)]
    pub avg_test_cases_per_session: f64,
    #[serde(default)]
    pub export_success_rate: f64,
    #[serde(default)]
    pub sessions_this_week: u64,
    #[serde(default)]
    pub test_cases_this_week: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: String,
    pub test_cases: u64,
}

/// Transient user-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: Option<String>,
    pub kind: NoticeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    pub fn new(kind: NoticeKind, title: impl Into<String>, description: Option<String>) -> Self {
        Self { title: title.into(), description, kind }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title, Some(description.into()))
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, title, Some(description.into()))
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, title, Some(description.into()))
    }

    pub fn error(title: impl Into<String>, err: &crate::errors::AppError) -> Self {
        Self::new(NoticeKind::Error, title, Some(err.to_string()))
    }
}
