//! Usage dashboard: headline metrics, export trend and the sessions table.

use chrono::{DateTime, Utc};
use futures_util::future::join3;
use tracing::warn;

use crate::api::{AnalyticsBackend, SessionBackend};
use crate::models::{AnalyticsOverview, Conversation, TimeseriesPoint};

pub const DEFAULT_DAYS: u32 = 30;
pub const PAGE_SIZE: usize = 10;

/// Everything the dashboard shows. Each part falls back on its own, so one
/// failing endpoint never blanks the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub overview: AnalyticsOverview,
    pub timeseries: Vec<TimeseriesPoint>,
    pub sessions: Vec<Conversation>,
}

impl Dashboard {
    pub async fn load<B>(backend: &B, user_id: &str, days: u32) -> Self
    where
        B: SessionBackend + AnalyticsBackend + ?Sized,
    {
        let (sessions, overview, timeseries) = join3(
            backend.list_sessions(user_id),
            backend.analytics_overview(user_id),
            backend.exports_timeseries(user_id, days),
        )
        .await;

        Self {
            sessions: sessions.unwrap_or_else(|e| {
                warn!("Dashboard sessions unavailable: {e}");
                Vec::new()
            }),
            overview: overview.unwrap_or_else(|e| {
                warn!("Analytics overview unavailable: {e}");
                AnalyticsOverview::default()
            }),
            timeseries: timeseries.unwrap_or_else(|e| {
                warn!("Export time series unavailable: {e}");
                Vec::new()
            }),
        }
    }

    pub fn total_exported_in_window(&self) -> u64 {
        self.timeseries.iter().map(|p| p.test_cases).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Filter, order and page settings of the sessions table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTable {
    pub search: String,
    pub order: SortOrder,
    /// 1-based.
    pub page: usize,
}

/// One page of the sessions table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePage<'a> {
    pub rows: Vec<&'a Conversation>,
    pub page: usize,
    pub total_pages: usize,
    pub matching: usize,
}

impl SessionTable {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self.page = 1;
        self
    }

    /// Case-insensitive substring match on id or title.
    pub fn matches(&self, conversation: &Conversation) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || conversation.id.to_lowercase().contains(&needle)
            || conversation.title.to_lowercase().contains(&needle)
    }

    pub fn page<'a>(&self, sessions: &'a [Conversation]) -> TablePage<'a> {
        let mut rows: Vec<&Conversation> = sessions.iter().filter(|c| self.matches(c)).collect();
        // sessions without a timestamp sort as oldest
        rows.sort_by(|a, b| {
            let ordering = a.updated_at.cmp(&b.updated_at);
            match self.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });

        let matching = rows.len();
        let total_pages = matching.div_ceil(PAGE_SIZE).max(1);
        let page = self.page.clamp(1, total_pages);
        let rows = rows.into_iter().skip((page - 1) * PAGE_SIZE).take(PAGE_SIZE).collect();
        TablePage { rows, page, total_pages, matching }
    }
}

/// "Today", "Yesterday", "3 days ago", "2 weeks ago", "4 months ago".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - then).num_days().max(0);
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=29 => format!("{} weeks ago", days / 7),
        _ => format!("{} months ago", days / 30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn conversation(id: &str, title: &str, day: u32) -> Conversation {
        let mut c = Conversation::new(id.to_string(), title.to_string());
        c.updated_at = Some(Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap());
        c
    }

    #[test]
    fn filters_on_id_or_title_case_insensitively() {
        let sessions = vec![
            conversation("abc-1", "Login flows", 1),
            conversation("xyz-2", "Dosage checks", 2),
            conversation("LOG-3", "Audit trail", 3),
        ];
        let table = SessionTable::default().with_search("log");
        let page = table.page(&sessions);
        let ids: Vec<&str> = page.rows.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["LOG-3", "abc-1"]);
        assert_eq!(page.matching, 2);
    }

    #[test]
    fn sorts_by_update_time_and_paginates_by_ten() {
        let mut sessions: Vec<Conversation> =
            (1..=25).map(|d| conversation(&format!("s{d}"), "chat", d)).collect();
        let mut undated = Conversation::new("undated".into(), "chat".into());
        undated.updated_at = None;
        sessions.push(undated);

        let table = SessionTable { page: 3, ..Default::default() };
        let page = table.page(&sessions);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.rows.len(), 6);
        assert_eq!(page.rows.last().unwrap().id, "undated");

        let ascending = SessionTable { order: SortOrder::Ascending, page: 1, ..Default::default() };
        let first = ascending.page(&sessions);
        assert_eq!(first.rows[0].id, "undated");
        assert_eq!(first.rows[1].id, "s1");
    }

    #[test]
    fn out_of_range_page_is_clamped() {
        let sessions = vec![conversation("a", "one", 1)];
        let page = SessionTable { page: 9, ..Default::default() }.page(&sessions);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);

        let empty = SessionTable::default().page(&[]);
        assert_eq!(empty.total_pages, 1);
        assert!(empty.rows.is_empty());
    }

    #[test]
    fn relative_ages() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now, now), "Today");
        assert_eq!(time_ago(now - Duration::days(1), now), "Yesterday");
        assert_eq!(time_ago(now - Duration::days(4), now), "4 days ago");
        assert_eq!(time_ago(now - Duration::days(15), now), "2 weeks ago");
        assert_eq!(time_ago(now - Duration::days(65), now), "2 months ago");
    }
}
