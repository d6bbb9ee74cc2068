use std::fmt::Write as _;

use chrono::Utc;

use testgen_core::analytics::{time_ago, Dashboard, TablePage};
use testgen_core::export::ExportTracker;
use testgen_core::models::{
    ExportStatus, JiraConnection, JiraProject, JiraRequirement, Message, MessageRole, Notice,
    NoticeKind, SessionDocument, SessionRequirement, TestCase,
};
use testgen_core::{AppError, WorkspaceSnapshot};

pub fn notice(notice: &Notice) -> String {
    let tag = match notice.kind {
        NoticeKind::Success => "ok",
        NoticeKind::Info => "info",
        NoticeKind::Warning => "warn",
        NoticeKind::Error => "error",
    };
    match &notice.description {
        Some(description) => format!("[{tag}] {}: {description}", notice.title),
        None => format!("[{tag}] {}", notice.title),
    }
}

/// One-line report of a failed command, with a hint for the errors a user can act on.
pub fn failure(err: &anyhow::Error) -> String {
    let hint = match err.downcast_ref::<AppError>() {
        Some(e) if e.is_auth() => " (sign in again: check STUDIO_EMAIL and STUDIO_PASSWORD)",
        Some(e) if e.is_not_found() => " (use /sessions to list your chats)",
        _ => "",
    };
    format!("! {err:#}{hint}")
}

pub fn sessions(snapshot: &WorkspaceSnapshot) -> String {
    if snapshot.sessions.is_empty() {
        return "No chats yet. Type a message to start one.".to_string();
    }
    let now = Utc::now();
    let mut out = String::new();
    for (i, conversation) in snapshot.sessions.iter().enumerate() {
        let marker = if snapshot.active_session_id.as_deref() == Some(conversation.id.as_str()) {
            '*'
        } else {
            ' '
        };
        let age = conversation.updated_at.map(|t| time_ago(t, now)).unwrap_or_default();
        let _ = writeln!(out, "{marker}{:>3}. {:<40} {age}", i + 1, conversation.display_title());
    }
    out
}

fn export_badge(exports: &ExportTracker, id: &str) -> String {
    match exports.entry(id) {
        None => String::new(),
        Some(entry) => match entry.status {
            ExportStatus::Pending => " [pending]".to_string(),
            ExportStatus::Exporting => " [exporting]".to_string(),
            ExportStatus::Error => " [export failed]".to_string(),
            ExportStatus::Success => match &entry.jira_key {
                Some(key) => format!(" [exported {key}]"),
                None => " [exported]".to_string(),
            },
        },
    }
}

pub fn test_case(tc: &TestCase, exports: &ExportTracker) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {} {}{}", tc.id, tc.display_title(), export_badge(exports, &tc.id));
    if !tc.risk.is_empty() {
        let _ = writeln!(out, "      risk: {}", tc.risk);
    }
    for pre in &tc.preconditions {
        let _ = writeln!(out, "      given {pre}");
    }
    for (i, step) in tc.step_details.iter().enumerate() {
        let _ = writeln!(out, "      {}. {} => {}", i + 1, step.step, step.expected);
    }
    if !tc.regulatory_refs.is_empty() {
        let _ = writeln!(out, "      refs: {}", tc.regulatory_refs.join(", "));
    }
    out
}

pub fn message(message: &Message, exports: &ExportTracker) -> String {
    let who = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "agent",
    };
    let mut out = format!("{who}> {}\n", message.text);
    for tc in &message.testcases {
        out.push_str(&test_case(tc, exports));
    }
    out
}

pub fn transcript(snapshot: &WorkspaceSnapshot) -> String {
    snapshot.messages.iter().map(|m| message(m, &snapshot.exports)).collect()
}

pub fn cases(snapshot: &WorkspaceSnapshot) -> String {
    let out: String = snapshot
        .messages
        .iter()
        .flat_map(|m| m.testcases.iter())
        .map(|tc| test_case(tc, &snapshot.exports))
        .collect();
    if out.is_empty() {
        "No test cases in this chat yet.".to_string()
    } else {
        out
    }
}

pub fn projects(projects: &[JiraProject]) -> String {
    if projects.is_empty() {
        return "No Jira projects available.".to_string();
    }
    projects.iter().map(|p| format!("  {:<10} {}\n", p.key, p.name)).collect()
}

pub fn jira(connection: &JiraConnection) -> String {
    match (connection.connected, &connection.jira_url) {
        (true, Some(url)) => format!("Jira connected ({url})"),
        (true, None) => "Jira connected".to_string(),
        (false, _) => "Jira not connected. Use /jira connect.".to_string(),
    }
}

pub fn documents(docs: &[SessionDocument]) -> String {
    if docs.is_empty() {
        return "No documents in this chat.".to_string();
    }
    let active = docs.iter().filter(|d| d.is_active).count();
    let mut out = format!("{active} of {} documents active\n", docs.len());
    for doc in docs {
        let flag = if doc.is_active { "on " } else { "off" };
        let _ = writeln!(out, "  [{flag}] {} {} ({} pages)", doc.id, doc.filename, doc.total_pages);
    }
    out
}

pub fn session_requirements(reqs: &[SessionRequirement]) -> String {
    if reqs.is_empty() {
        return "No requirements in this chat.".to_string();
    }
    reqs.iter()
        .map(|r| {
            let key = r.jira_key.as_deref().unwrap_or("-");
            format!("  {} {key} [{}] {} ({} test cases)\n", r.id, r.risk_level, r.text, r.test_case_count)
        })
        .collect()
}

pub fn candidates(reqs: &[JiraRequirement], is_selected: impl Fn(&str) -> bool) -> String {
    if reqs.is_empty() {
        return "This project has no requirements.".to_string();
    }
    reqs.iter()
        .map(|r| {
            let mark = if is_selected(&r.id) { 'x' } else { ' ' };
            format!("  [{mark}] {} {} [{}] {}\n", r.id, r.jira_key, r.risk_level, r.text)
        })
        .collect()
}

pub fn dashboard(dashboard: &Dashboard, page: &TablePage<'_>, days: u32) -> String {
    let o = &dashboard.overview;
    let mut out = String::new();
    let _ = writeln!(out, "Sessions      {:>6}  (this week {})", o.total_sessions, o.sessions_this_week);
    let _ = writeln!(out, "Test cases    {:>6}  (this week {})", o.total_test_cases, o.test_cases_this_week);
    let _ = writeln!(out, "Jira exports  {:>6}  ({:.0}% success)", o.total_exports, o.export_success_rate);
    let _ = writeln!(out, "Documents     {:>6}", o.documents_uploaded);
    let _ = writeln!(out, "Avg per chat  {:>6.1}", o.avg_test_cases_per_session);
    let _ = writeln!(
        out,
        "Exported in the last {days} days: {}",
        dashboard.total_exported_in_window()
    );
    let now = Utc::now();
    for c in &page.rows {
        let age = c.updated_at.map(|t| time_ago(t, now)).unwrap_or_default();
        let _ = writeln!(out, "  {:<36} {:<30} {age}", c.id, c.display_title());
    }
    let _ = write!(out, "page {} of {} ({} chats)", page.page, page.total_pages, page.matching);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use testgen_core::export::ExportOutcome;
    use testgen_core::models::StepDetail;

    fn login_case() -> TestCase {
        TestCase {
            id: "TC-1".into(),
            title: "Login".into(),
            preconditions: vec!["an account exists".into()],
            step_details: vec![StepDetail { step: "Enter creds".into(), expected: "Logged in".into() }],
            risk: "High".into(),
            regulatory_refs: vec!["IEC 62304".into()],
            rationale: String::new(),
        }
    }

    #[test]
    fn test_case_shows_steps_and_export_key() {
        let mut exports = ExportTracker::new();
        exports.begin_export(["TC-1"]);
        exports.record_result(
            "TC-1",
            ExportOutcome::Success { jira_key: Some("QA-3".into()), jira_url: None },
        );
        let text = test_case(&login_case(), &exports);
        assert!(text.contains("TC-1 Login [exported QA-3]"));
        assert!(text.contains("1. Enter creds => Logged in"));
        assert!(text.contains("refs: IEC 62304"));
    }

    #[test]
    fn notices_carry_their_kind() {
        let n = Notice::success("Export Complete", "3 of 3 test cases exported successfully.");
        assert_eq!(notice(&n), "[ok] Export Complete: 3 of 3 test cases exported successfully.");
    }

    #[test]
    fn failures_hint_at_what_to_do() {
        let missing = anyhow::Error::new(AppError::SessionNotFound { id: "s9".into() });
        assert!(failure(&missing).ends_with("(use /sessions to list your chats)"));

        let signed_out = anyhow::Error::new(AppError::NotSignedIn).context("Sign-in failed");
        assert!(failure(&signed_out).contains("sign in again"));

        assert_eq!(failure(&anyhow::anyhow!("boom")), "! boom");
    }
}
