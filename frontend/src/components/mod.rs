pub mod analytics;
pub mod auth;
pub mod chat;
pub mod documents;
pub mod export;
pub mod requirements;
pub mod sidebar;
pub mod toasts;
