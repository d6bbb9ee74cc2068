use thiserror::Error;

use testgen_core::analytics::DEFAULT_DAYS;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive number (got '{value}')")]
    InvalidNumber { name: &'static str, value: String },

    #[error("AGENT_API_BASE must be an http(s) URL (got '{value}')")]
    InvalidUrl { value: String },
}

/// Settings read from the environment (and `.env`, loaded by `main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base: String,
    pub firebase_api_key: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub user_id: Option<String>,
    pub analytics_days: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base = var("AGENT_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl { value: api_base });
        }

        let analytics_days = match var("ANALYTICS_DAYS") {
            None => DEFAULT_DAYS,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or(ConfigError::InvalidNumber { name: "ANALYTICS_DAYS", value: raw })?,
        };

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            firebase_api_key: var("FIREBASE_API_KEY"),
            email: var("STUDIO_EMAIL"),
            password: lookup("STUDIO_PASSWORD").filter(|p| !p.is_empty()),
            user_id: var("STUDIO_USER_ID"),
            analytics_days,
        })
    }

    /// Email/password sign-in is possible only with all three set.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.firebase_api_key.as_deref()?,
            self.email.as_deref()?,
            self.password.as_deref()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.analytics_days, 30);
        assert!(cfg.credentials().is_none());
    }

    #[test]
    fn base_url_is_normalised_and_validated() {
        let cfg = config(&[("AGENT_API_BASE", " https://agent.example/ ")]).unwrap();
        assert_eq!(cfg.api_base, "https://agent.example");
        assert!(matches!(config(&[("AGENT_API_BASE", "agent.example")]), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn credentials_need_key_email_and_password() {
        let cfg = config(&[
            ("FIREBASE_API_KEY", "k"),
            ("STUDIO_EMAIL", "qa@example.com"),
            ("STUDIO_PASSWORD", " pass "),
        ])
        .unwrap();
        assert_eq!(cfg.credentials(), Some(("k", "qa@example.com", " pass ")));
    }

    #[test]
    fn bad_day_count_is_rejected() {
        let err = config(&[("ANALYTICS_DAYS", "0")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidNumber { name: "ANALYTICS_DAYS", value: "0".into() });
    }
}
