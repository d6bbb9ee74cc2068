//! Boundary decoding: one function per backend response shape.
//!
//! Each decoder turns a JSON body into typed values or a decode error. An
//! `error` field in an otherwise successful body is surfaced as
//! [`AppError::Rejected`] so callers treat it like a failed request.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::errors::{AppError, Result};
use crate::models::{
    AnalyticsOverview, Conversation, DuplicateReport, ExportReceipt, ExportRecord,
    JiraConnection, JiraProject, JiraRequirement, SessionDocument, SessionRequirement,
    TimeseriesPoint,
};

/// Fails with [`AppError::Rejected`] when the body reports an error.
pub fn check_rejection(body: &Value) -> Result<()> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        let message = match err {
            Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        };
        return Err(AppError::rejected(message));
    }
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        return Err(AppError::rejected(message));
    }
    Ok(())
}

/// Accepts RFC 3339, naive ISO-8601 (assumed UTC) and epoch seconds/millis.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > 1_000_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

fn id_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pulls `field` out of `body` as a list, decoding each element on its own.
/// Undecodable elements are logged and skipped.
fn lenient_list<T: DeserializeOwned>(body: &Value, field: &str, context: &str) -> Result<Vec<T>> {
    check_rejection(body)?;
    let items = match body.get(field).or(Some(body).filter(|b| b.is_array())) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(AppError::decode(context, format!("'{field}' is not a list: {other}")))
        }
    };
    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping undecodable {context} item: {e}");
                None
            }
        })
        .collect())
}

fn session_from_value(value: &Value) -> Option<Conversation> {
    let id = id_text(value.get("session_id")).or_else(|| id_text(value.get("id")))?;
    let title = value.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
    let updated_at = ["updated_at", "updatedAt", "last_updated", "created_at"]
        .iter()
        .find_map(|key| value.get(*key).and_then(parse_timestamp));
    Some(Conversation { id, title, updated_at })
}

pub fn decode_sessions(body: &Value) -> Result<Vec<Conversation>> {
    check_rejection(body)?;
    let items = match body.get("sessions").unwrap_or(body) {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => return Err(AppError::decode("session list", format!("not a list: {other}"))),
    };
    Ok(items
        .iter()
        .filter_map(|item| {
            let session = session_from_value(item);
            if session.is_none() {
                warn!("Skipping session without an id: {item}");
            }
            session
        })
        .collect())
}

pub fn decode_created_session(body: &Value) -> Result<Conversation> {
    check_rejection(body)?;
    let id = id_text(body.get("session_id"))
        .ok_or_else(|| AppError::decode("new session", "missing session_id"))?;
    let title = body.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(Conversation::new(id, title))
}

pub fn decode_projects(body: &Value) -> Result<Vec<JiraProject>> {
    lenient_list(body, "projects", "Jira project")
}

pub fn decode_jira_requirements(body: &Value) -> Result<Vec<JiraRequirement>> {
    lenient_list(body, "requirements", "Jira requirement")
}

pub fn decode_session_requirements(body: &Value) -> Result<Vec<SessionRequirement>> {
    lenient_list(body, "requirements", "session requirement")
}

pub fn decode_documents(body: &Value) -> Result<Vec<SessionDocument>> {
    lenient_list(body, "documents", "document")
}

pub fn decode_export_history(body: &Value) -> Result<Vec<ExportRecord>> {
    check_rejection(body)?;
    let items = match body.get("exports") {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(other) => return Err(AppError::decode("export history", format!("not a list: {other}"))),
    };
    Ok(items
        .iter()
        .map(|item| {
            let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
            ExportRecord {
                testcase_id: id_text(item.get("testcase_id")),
                jira_key: text("jira_key"),
                jira_url: text("jira_url"),
                status: text("status"),
                exported_at: text("exported_at"),
            }
        })
        .collect())
}

pub fn decode_export_receipt(body: &Value) -> Result<ExportReceipt> {
    check_rejection(body)?;
    let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(ExportReceipt { jira_key: text("jira_key"), jira_url: text("jira_url") })
}

pub fn decode_duplicates(body: &Value) -> Result<DuplicateReport> {
    check_rejection(body)?;
    let existing_ids: Vec<String> = body
        .get("existing_requirement_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(|v| id_text(Some(v))).collect())
        .unwrap_or_default();
    let count = body
        .get("count")
        .and_then(Value::as_u64)
        .map(|c| c as usize)
        .unwrap_or(existing_ids.len());
    let has_duplicates = body
        .get("has_duplicates")
        .and_then(Value::as_bool)
        .unwrap_or(!existing_ids.is_empty());
    Ok(DuplicateReport { has_duplicates, existing_ids, count })
}

pub fn decode_message(body: &Value, fallback: &str) -> Result<String> {
    check_rejection(body)?;
    Ok(body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string())
}

pub fn decode_jira_status(body: &Value) -> Result<JiraConnection> {
    check_rejection(body)?;
    serde_json::from_value(body.clone()).map_err(|e| AppError::decode("Jira status", e))
}

pub fn decode_authorization_url(body: &Value) -> Result<String> {
    check_rejection(body)?;
    body.get("authorization_url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::decode("Jira connect", "missing authorization_url"))
}

pub fn decode_callback(body: &Value) -> Result<bool> {
    check_rejection(body)?;
    Ok(body.get("connected").and_then(Value::as_bool).unwrap_or(false))
}

pub fn decode_overview(body: &Value) -> Result<AnalyticsOverview> {
    check_rejection(body)?;
    let num = |key: &str| body.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    let count = |key: &str| body.get(key).and_then(Value::as_u64).unwrap_or(0);
    Ok(AnalyticsOverview {
        total_sessions: count("total_sessions"),
        total_test_cases: count("total_test_cases"),
        total_exports: count("total_exports"),
        documents_uploaded: count("documents_uploaded"),
        avg_test_cases_per_session: num("avg_test_cases_per_session"),
        export_success_rate: num("export_success_rate"),
        sessions_this_week: count("sessions_this_week"),
        test_cases_this_week: count("test_cases_this_week"),
    })
}

/// Points carry either `count` or `testCases`; a zero `count` falls through.
pub fn decode_timeseries(body: &Value) -> Result<Vec<TimeseriesPoint>> {
    check_rejection(body)?;
    let Some(points) = body.get("timeseries").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    Ok(points
        .iter()
        .filter_map(|p| {
            let date = p.get("date").and_then(Value::as_str)?.to_string();
            let test_cases = ["count", "testCases"]
                .iter()
                .filter_map(|key| p.get(*key).and_then(Value::as_u64))
                .find(|n| *n > 0)
                .unwrap_or(0);
            Some(TimeseriesPoint { date, test_cases })
        })
        .collect())
}
