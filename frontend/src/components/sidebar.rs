use chrono::Utc;
use leptos::prelude::*;

use testgen_core::analytics::time_ago;

use crate::state::{AppState, AuthState};

/// Sidebar showing the chat list, the Jira link and the account.
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();
    let auth = expect_context::<AuthState>();

    view! {
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"Test Case Studio"</h2>
                <button class="new-chat-btn" on:click=move |_| state.new_chat()>
                    "+ New Chat"
                </button>
            </div>
            <div class="conversation-list">
                {move || {
                    let snapshot = state.snapshot.get();
                    if snapshot.loading_sessions {
                        view! { <div class="sidebar-hint">"Loading chats…"</div> }.into_any()
                    } else if snapshot.sessions.is_empty() {
                        view! { <div class="sidebar-hint">"No conversations yet"</div> }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || state.snapshot.get().sessions
                                key=|c| (c.id.clone(), c.title.clone(), c.updated_at)
                                let:conv
                            >
                                {
                                    let id_click = conv.id.clone();
                                    let id_active = conv.id.clone();
                                    let age = conv
                                        .updated_at
                                        .map(|t| time_ago(t, Utc::now()))
                                        .unwrap_or_default();
                                    view! {
                                        <div
                                            class="conversation-item"
                                            class:active=move || {
                                                state.active_session.get().as_deref() == Some(id_active.as_str())
                                            }
                                            on:click=move |_| state.select(id_click.clone())
                                        >
                                            <div class="conversation-title">{conv.display_title().to_string()}</div>
                                            <div class="conversation-age">{age}</div>
                                        </div>
                                    }
                                }
                            </For>
                        }.into_any()
                    }
                }}
            </div>
            <div class="sidebar-footer">
                <JiraStatus />
                {move || auth.user.get().map(|user| view! {
                    <div class="account">
                        <span>{user.display_name.clone().unwrap_or(user.email.clone())}</span>
                        <button class="link-btn" on:click=move |_| auth.sign_out()>"Sign out"</button>
                    </div>
                })}
            </div>
        </aside>
    }
}

#[component]
fn JiraStatus() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="jira-status">
            {move || {
                let connection = state.jira.get();
                if connection.connected {
                    let site = connection.jira_url.unwrap_or_else(|| "Jira".to_string());
                    view! {
                        <span class="badge success">"Connected: " {site}</span>
                        <button class="link-btn" on:click=move |_| state.disconnect_jira()>
                            "Disconnect"
                        </button>
                    }.into_any()
                } else {
                    view! {
                        <span class="badge">"Jira not connected"</span>
                        <button class="link-btn" on:click=move |_| state.connect_jira()>
                            "Connect Jira"
                        </button>
                    }.into_any()
                }
            }}
        </div>
    }
}
