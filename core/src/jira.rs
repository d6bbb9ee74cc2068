//! Jira account link: status, OAuth hand-off and disconnect.

use std::cell::RefCell;

use tracing::{error, info, warn};

use crate::api::JiraBackend;
use crate::errors::{AppError, Result};
use crate::models::{JiraConnection, Notice};
use crate::notices::Notifier;

pub struct JiraLink {
    connection: RefCell<JiraConnection>,
    notifier: Notifier,
}

impl JiraLink {
    pub fn new(notifier: Notifier) -> Self {
        Self { connection: RefCell::new(JiraConnection::default()), notifier }
    }

    pub fn connection(&self) -> JiraConnection {
        self.connection.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.borrow().connected
    }

    /// Asks the backend whether the user has a live Jira token. A failed
    /// check counts as disconnected.
    pub async fn refresh<B>(&self, backend: &B, user_id: &str) -> JiraConnection
    where
        B: JiraBackend + ?Sized,
    {
        let connection = backend.jira_status(user_id).await.unwrap_or_else(|e| {
            warn!("Failed to check Jira connection: {e}");
            JiraConnection::default()
        });
        *self.connection.borrow_mut() = connection.clone();
        connection
    }

    /// URL of Jira's consent page; the caller navigates there.
    pub async fn authorization_url<B>(&self, backend: &B, user_id: &str) -> Result<String>
    where
        B: JiraBackend + ?Sized,
    {
        backend.jira_authorization_url(user_id).await.map_err(|e| {
            error!("Failed to start Jira authorization: {e}");
            self.notifier.push(Notice::error("Could not connect to Jira", &e));
            e
        })
    }

    /// Exchanges the `code` Jira redirected back with, then re-reads status.
    pub async fn complete_authorization<B>(&self, backend: &B, user_id: &str, code: &str) -> Result<()>
    where
        B: JiraBackend + ?Sized,
    {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::empty_field("code"));
        }
        let connected = match backend.jira_exchange_code(user_id, code).await {
            Ok(connected) => connected,
            Err(e) => {
                error!("Jira authorization failed: {e}");
                self.notifier.push(Notice::error("Jira connection failed", &e));
                return Err(e);
            }
        };
        let connection = self.refresh(backend, user_id).await;
        if !connected && !connection.connected {
            self.notifier.push(Notice::warning(
                "Jira connection failed",
                "Jira did not accept the authorization. Please try again.",
            ));
            return Err(AppError::JiraNotConnected);
        }
        info!("Jira connected for {user_id}");
        self.notifier.push(Notice::success(
            "Jira connected",
            connection.jira_url.unwrap_or_else(|| "Your Jira account is linked.".to_string()),
        ));
        Ok(())
    }

    pub async fn disconnect<B>(&self, backend: &B, user_id: &str) -> Result<()>
    where
        B: JiraBackend + ?Sized,
    {
        if let Err(e) = backend.jira_disconnect(user_id).await {
            error!("Failed to disconnect Jira: {e}");
            self.notifier.push(Notice::error("Could not disconnect Jira", &e));
            return Err(e);
        }
        *self.connection.borrow_mut() = JiraConnection::default();
        self.notifier.push(Notice::info("Jira disconnected", "Your Jira account was unlinked."));
        Ok(())
    }
}
