//! Normalisation of agent replies into [`TestCase`] records.
//!
//! The agent returns generated steps as `[index, step, expected]` tuples
//! grouped under `aggregated_testcases`. Everything here is lenient: a
//! missing field becomes an empty value and a malformed entry is skipped
//! without affecting its siblings.

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::wire::parse_timestamp;
use crate::errors::{AppError, Result};
use crate::models::{Message, MessageRole, StepDetail, TestCase};

const AGGREGATED_FIELD: &str = "aggregated_testcases";

/// A reply ready to be stored as an assistant [`Message`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformedResponse {
    pub text: String,
    pub testcases: Vec<TestCase>,
    pub updated_title: Option<String>,
}

impl TransformedResponse {
    pub fn into_message(self) -> Message {
        Message::new(MessageRole::Assistant, self.text).with_testcases(self.testcases)
    }
}

/// Converts an agent reply (possibly absent) into summary text plus test cases.
pub fn transform_reply(reply: Option<&Value>) -> TransformedResponse {
    let Some(reply) = reply.filter(|v| v.is_object()) else {
        return TransformedResponse::default();
    };

    TransformedResponse {
        text: reply.get("text").map(scalar_text).unwrap_or_default(),
        testcases: transform_test_cases(reply.get(AGGREGATED_FIELD)),
        updated_title: reply
            .get("updated_title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    }
}

/// Maps an `aggregated_testcases` array onto test cases, preserving order.
pub fn transform_test_cases(aggregated: Option<&Value>) -> Vec<TestCase> {
    let Some(entries) = aggregated.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if !entry.is_object() {
                warn!("Skipping malformed test case entry #{index}: not an object");
                return None;
            }
            to_test_case(entry)
        })
        .collect()
}

// Fields are read one by one so a wrong-typed cosmetic field only loses itself.
fn to_test_case(entry: &Value) -> Option<TestCase> {
    let tuples = entry
        .get("testcases")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if tuples.is_empty() {
        debug!("Dropping test case group without steps");
        return None;
    }

    let id = match entry.get("testcase_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("tc-{}", uuid::Uuid::new_v4().simple()),
    };

    Some(TestCase {
        id,
        title: text_field(entry, "Testcase Title"),
        preconditions: string_list(entry, "preconditions"),
        step_details: tuples.iter().filter_map(step_from_tuple).collect(),
        risk: text_field(entry, "risk"),
        regulatory_refs: string_list(entry, "compliance_ids"),
        rationale: text_field(entry, "rationale"),
    })
}

fn text_field(entry: &Value, key: &str) -> String {
    entry.get(key).map(scalar_text).unwrap_or_default()
}

/// Keeps the string items of a list field; anything else is dropped.
fn string_list(entry: &Value, key: &str) -> Vec<String> {
    entry
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// tuple[0] is the step number, [1] the action, [2] the expected result
fn step_from_tuple(tuple: &Value) -> Option<StepDetail> {
    let items = tuple.as_array()?;
    if items.len() < 2 {
        return None;
    }
    Some(StepDetail {
        step: scalar_text(&items[1]),
        expected: items.get(2).map(scalar_text).unwrap_or_default(),
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Decodes a `conversation_history` payload into chronological messages.
///
/// The nested `content` object carries the authoritative role, text and test
/// cases; top-level `role`/`text` are used when it is missing.
pub fn transform_history(payload: &Value) -> Result<Vec<Message>> {
    let entries = match payload.get("conversation_history") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(AppError::decode(
                "message history",
                format!("conversation_history is not an array: {other}"),
            ))
        }
    };

    Ok(entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let content = entry.get("content");
            let role_str = content
                .and_then(|c| c.get("role"))
                .or_else(|| entry.get("role"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let role = match MessageRole::try_from(role_str) {
                Ok(role) => role,
                Err(e) => {
                    warn!("Skipping history entry #{index}: {e}");
                    return None;
                }
            };
            let text = content
                .and_then(|c| c.get("text"))
                .or_else(|| entry.get("text"))
                .map(scalar_text)
                .unwrap_or_default();
            let id = match entry.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => format!("h{index}"),
            };

            Some(Message {
                id,
                role,
                text,
                created_at: entry.get("created_at").and_then(parse_timestamp),
                testcases: transform_test_cases(content.and_then(|c| c.get(AGGREGATED_FIELD))),
            })
        })
        .collect())
}
