use chrono::Utc;
use leptos::prelude::*;

use testgen_core::analytics::{time_ago, SessionTable, SortOrder, DEFAULT_DAYS};

use crate::state::{AppState, Panel};

#[component]
pub fn AnalyticsPanel() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (days, set_days) = signal(DEFAULT_DAYS);

    Effect::new(move |_| state.load_dashboard(days.get()));

    view! {
        <section class="panel analytics">
            <div class="panel-header">
                <h3>"Analytics"</h3>
                <select on:change=move |ev| {
                    if let Ok(value) = event_target_value(&ev).parse() {
                        set_days.set(value);
                    }
                }>
                    {[7u32, 30, 90]
                        .into_iter()
                        .map(|d| view! {
                            <option value=d.to_string() selected=move || days.get() == d>
                                {format!("Last {d} days")}
                            </option>
                        })
                        .collect_view()}
                </select>
            </div>
            {move || match state.dashboard.get() {
                None => view! { <div class="empty-state">"Loading analytics…"</div> }.into_any(),
                Some(dashboard) => {
                    let o = dashboard.overview.clone();
                    let peak = dashboard.timeseries.iter().map(|p| p.test_cases).max().unwrap_or(0).max(1);
                    view! {
                        <div class="stat-grid">
                            <Stat label="Sessions" value=o.total_sessions.to_string()
                                hint=format!("{} this week", o.sessions_this_week) />
                            <Stat label="Test cases" value=o.total_test_cases.to_string()
                                hint=format!("{} this week", o.test_cases_this_week) />
                            <Stat label="Jira exports" value=o.total_exports.to_string()
                                hint=format!("{:.0}% success", o.export_success_rate) />
                            <Stat label="Documents" value=o.documents_uploaded.to_string()
                                hint=format!("{:.1} test cases per chat", o.avg_test_cases_per_session) />
                        </div>
                        <h4>{format!("{} test cases exported in the window", dashboard.total_exported_in_window())}</h4>
                        <div class="timeseries">
                            {dashboard
                                .timeseries
                                .iter()
                                .map(|p| {
                                    let height = format!("height: {}%", p.test_cases * 100 / peak);
                                    view! {
                                        <div class="bar" style=height title=format!("{}: {}", p.date, p.test_cases)></div>
                                    }
                                })
                                .collect_view()}
                        </div>
                    }.into_any()
                }
            }}
            <SessionsTable />
        </section>
    }
}

#[component]
fn Stat(label: &'static str, value: String, hint: String) -> impl IntoView {
    view! {
        <div class="stat">
            <div class="stat-label">{label}</div>
            <div class="stat-value">{value}</div>
            <div class="stat-hint">{hint}</div>
        </div>
    }
}

/// Searchable, sortable, paged list of every chat.
#[component]
fn SessionsTable() -> impl IntoView {
    let state = expect_context::<AppState>();
    let table = RwSignal::new(SessionTable::default());

    let open = move |id: String| {
        state.panel.set(Panel::Chat);
        state.select(id);
    };

    view! {
        <div class="sessions-table">
            <div class="input-row">
                <input
                    type="search"
                    placeholder="Search chats"
                    prop:value=move || table.with(|t| t.search.clone())
                    on:input=move |ev| table.update(|t| *t = t.clone().with_search(event_target_value(&ev)))
                />
                <button class="link-btn" on:click=move |_| table.update(|t| t.order = t.order.flipped())>
                    {move || match table.with(|t| t.order) {
                        SortOrder::Descending => "Newest first",
                        SortOrder::Ascending => "Oldest first",
                    }}
                </button>
            </div>
            {move || {
                let sessions = state.dashboard.with(|d| d.as_ref().map(|d| d.sessions.clone()).unwrap_or_default());
                let now = Utc::now();
                let settings = table.get();
                let page = settings.page(&sessions);
                let rows = page
                    .rows
                    .iter()
                    .map(|c| {
                        let id = c.id.clone();
                        let age = c.updated_at.map(|t| time_ago(t, now)).unwrap_or_default();
                        view! {
                            <tr on:click=move |_| open(id.clone())>
                                <td>{c.display_title().to_string()}</td>
                                <td class="test-case-id">{c.id.clone()}</td>
                                <td>{age}</td>
                            </tr>
                        }
                    })
                    .collect_view();
                let (current, total, matching) = (page.page, page.total_pages, page.matching);
                view! {
                    <table>
                        <thead><tr><th>"Title"</th><th>"Session"</th><th>"Updated"</th></tr></thead>
                        <tbody>{rows}</tbody>
                    </table>
                    <div class="pager">
                        <button
                            class="link-btn"
                            disabled={current <= 1}
                            on:click=move |_| table.update(|t| t.page = current - 1)
                        >
                            "Previous"
                        </button>
                        <span>{format!("Page {current} of {total} ({matching} chats)")}</span>
                        <button
                            class="link-btn"
                            disabled={current >= total}
                            on:click=move |_| table.update(|t| t.page = current + 1)
                        >
                            "Next"
                        </button>
                    </div>
                }
            }}
        </div>
    }
}
