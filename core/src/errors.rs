use thiserror::Error;

/// Top-level client error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Transport / backend errors ───────────────────────────────────────────
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Server error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected response from {context}: {message}")]
    Decode { context: String, message: String },

    /// The backend answered 200 but the body carried an `error` field.
    #[error("{message}")]
    Rejected { message: String },

    // ── Authentication errors ────────────────────────────────────────────────
    #[error("{message}")]
    Auth { code: String, message: String },

    #[error("Not signed in")]
    NotSignedIn,

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("Select a Jira project before exporting")]
    NoProjectSelected,

    #[error("Jira is not connected")]
    JiraNotConnected,

    #[error("Another message is still being sent")]
    SendInProgress,

    // ── Session errors ───────────────────────────────────────────────────────
    #[error("No active session")]
    NoActiveSession,

    #[error("Session '{id}' not found")]
    SessionNotFound { id: String },
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
    pub fn network(message: impl Into<String>) -> Self {
        AppError::Network { message: message.into() }
    }

    pub fn decode(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Decode { context: context.into(), message: message.to_string() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        AppError::Rejected { message: message.into() }
    }

    pub fn empty_field(field_name: &str) -> Self {
        AppError::EmptyField { field_name: field_name.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::SessionNotFound { .. })
            || matches!(self, AppError::Http { status: 404, .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. }
                | AppError::FieldTooLong { .. }
                | AppError::NoProjectSelected
                | AppError::NoActiveSession
                | AppError::SendInProgress
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, AppError::Auth { .. } | AppError::NotSignedIn)
    }

    /// Transport failures and non-2xx answers; candidates for a "try again" notice.
    pub fn is_backend(&self) -> bool {
        matches!(self, AppError::Network { .. } | AppError::Http { .. })
    }
}
