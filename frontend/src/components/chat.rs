use leptos::ev;
use leptos::prelude::*;

use testgen_core::models::{ExportStatus, Message, MessageRole, TestCase};

use crate::components::export::ExportPanel;
use crate::state::AppState;

/// Main chat area with message history, generated test cases and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (show_export, set_show_export) = signal(false);
    let has_test_cases = move || {
        state
            .snapshot
            .with(|s| s.messages.iter().any(|m| !m.testcases.is_empty()))
    };

    view! {
        <main class="chat-area">
            <ChatHeader />

            <Show when=move || has_test_cases() && state.active_session.get().is_some()>
                <div class="export-toggle">
                    <button class="link-btn" on:click=move |_| {
                        let opening = !show_export.get();
                        set_show_export.set(opening);
                        if opening {
                            state.open_export();
                        }
                    }>
                        {move || if show_export.get() { "Hide Jira export" } else { "Export to Jira…" }}
                    </button>
                </div>
                <Show when=move || show_export.get()>
                    <ExportPanel />
                </Show>
            </Show>

            <div class="messages-container">
                {move || {
                    let snapshot = state.snapshot.get();
                    if snapshot.loading_messages {
                        view! { <div class="empty-state">"Loading messages…"</div> }.into_any()
                    } else if snapshot.messages.is_empty() && !snapshot.agent_thinking {
                        view! {
                            <div class="empty-state">
                                "Describe the requirements to generate test cases for"
                            </div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || state.snapshot.get().messages
                                key=|m| m.id.clone()
                                let:msg
                            >
                                <MessageBubble message=msg />
                            </For>
                            <Show when=move || state.snapshot.with(|s| s.agent_thinking)>
                                <div class="message assistant">
                                    <div class="role-label">"assistant"</div>
                                    <div class="streaming-cursor">"Generating…"</div>
                                </div>
                            </Show>
                        }.into_any()
                    }
                }}
            </div>

            <ChatInput />
        </main>
    }
}

/// Title of the open chat, editable in place.
#[component]
fn ChatHeader() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (editing, set_editing) = signal(false);
    let (draft, set_draft) = signal(String::new());

    let title = move || {
        state.snapshot.with(|s| match s.active_session() {
            Some(c) => c.display_title().to_string(),
            None => "New conversation".to_string(),
        })
    };

    let commit = move || {
        set_editing.set(false);
        if let Some(id) = state.active_session.get_untracked() {
            state.rename(id, draft.get_untracked());
        }
    };

    view! {
        <div class="chat-header">
            {move || {
                if editing.get() {
                    view! {
                        <input
                            class="title-input"
                            prop:value=draft
                            on:input=move |ev| set_draft.set(event_target_value(&ev))
                            on:keydown=move |ev: ev::KeyboardEvent| match ev.key().as_str() {
                                "Enter" => commit(),
                                "Escape" => set_editing.set(false),
                                _ => {}
                            }
                            on:blur=move |_| commit()
                        />
                    }.into_any()
                } else {
                    view! {
                        <span>{title}</span>
                        <Show when=move || state.active_session.get().is_some()>
                            <button class="link-btn" on:click=move |_| {
                                set_draft.set(title());
                                set_editing.set(true);
                            }>
                                "Rename"
                            </button>
                        </Show>
                    }.into_any()
                }
            }}
        </div>
    }
}

/// A single chat message bubble, with the test cases it produced.
#[component]
fn MessageBubble(message: Message) -> impl IntoView {
    let css_class = match message.role {
        MessageRole::User => "message user",
        MessageRole::Assistant => "message assistant",
    };

    view! {
        <div class=css_class>
            <div class="role-label">{message.role.as_str()}</div>
            <div>{message.text}</div>
            {message
                .testcases
                .into_iter()
                .map(|tc| view! { <TestCaseCard test_case=tc /> })
                .collect_view()}
        </div>
    }
}

#[component]
fn TestCaseCard(test_case: TestCase) -> impl IntoView {
    let state = expect_context::<AppState>();
    let id = test_case.id.clone();
    let badge = move || {
        state.snapshot.with(|s| {
            s.exports.entry(&id).map(|entry| match entry.status {
                ExportStatus::Pending => view! { <span class="badge">"Pending"</span> }.into_any(),
                ExportStatus::Exporting => view! { <span class="badge">"Exporting…"</span> }.into_any(),
                ExportStatus::Error => view! { <span class="badge error">"Export failed"</span> }.into_any(),
                ExportStatus::Success => {
                    let key = entry.jira_key.clone().unwrap_or_else(|| "Exported".to_string());
                    match entry.jira_url.clone() {
                        Some(url) => view! {
                            <a class="badge success" href=url target="_blank">{key}</a>
                        }.into_any(),
                        None => view! { <span class="badge success">{key}</span> }.into_any(),
                    }
                }
            })
        })
    };

    view! {
        <div class="test-case">
            <div class="test-case-header">
                <span class="test-case-id">{test_case.id.clone()}</span>
                <span class="test-case-title">{test_case.display_title().to_string()}</span>
                {(!test_case.risk.is_empty()).then(|| view! { <span class="badge">{test_case.risk.clone()}</span> })}
                {badge}
            </div>
            {(!test_case.preconditions.is_empty()).then(|| view! {
                <ul class="preconditions">
                    {test_case.preconditions.iter().map(|p| view! { <li>{p.clone()}</li> }).collect_view()}
                </ul>
            })}
            <ol class="steps">
                {test_case
                    .step_details
                    .iter()
                    .map(|s| view! {
                        <li>
                            <span class="step">{s.step.clone()}</span>
                            <span class="expected">{s.expected.clone()}</span>
                        </li>
                    })
                    .collect_view()}
            </ol>
            {(!test_case.regulatory_refs.is_empty()).then(|| view! {
                <div class="refs">{test_case.regulatory_refs.join(", ")}</div>
            })}
            {(!test_case.rationale.is_empty()).then(|| view! {
                <div class="rationale">{test_case.rationale.clone()}</div>
            })}
        </div>
    }
}

/// Chat input form with textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || state.snapshot.with(|s| s.agent_thinking);

    let send = move || {
        let text = input.get().trim().to_string();
        if text.is_empty() || is_sending() {
            return;
        }
        set_input.set(String::new());
        state.send(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Describe what to test… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || is_sending() || input.get().trim().is_empty()
                >
                    {move || if is_sending() { "Generating…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
