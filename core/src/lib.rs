//! Client-side state for the test-case studio: conversations, agent replies,
//! Jira export tracking and the supporting account, document, requirement and
//! analytics flows. Platform neutral; front ends supply a [`api::Transport`].

pub mod analytics;
pub mod api;
pub mod auth;
pub mod documents;
pub mod errors;
pub mod export;
pub mod jira;
pub mod models;
pub mod notices;
pub mod pending;
pub mod requirements;
pub mod store;
pub mod transform;
pub mod workspace;

pub use errors::{AppError, Result};
pub use notices::Notifier;
pub use workspace::{LoadOutcome, Workspace, WorkspaceSnapshot};
