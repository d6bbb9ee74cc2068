use leptos::prelude::*;

use testgen_core::requirements::ImportView;

use crate::state::AppState;

/// Requirements of the open chat and the Jira import wizard.
#[component]
pub fn RequirementsPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    Effect::new(move |_| {
        state.active_session.track();
        state.refresh_requirements();
    });

    view! {
        <section class="panel">
            <Show
                when=move || state.active_session.get().is_some()
                fallback=|| view! { <div class="empty-state">"Open a chat to manage its requirements"</div> }
            >
                {move || match state.import.with(|i| i.view) {
                    ImportView::List => view! { <RequirementList /> }.into_any(),
                    ImportView::Projects => view! { <ProjectPicker /> }.into_any(),
                    ImportView::Requirements => view! { <CandidatePicker /> }.into_any(),
                    ImportView::ConfirmOverwrite => view! { <ConfirmOverwrite /> }.into_any(),
                    ImportView::Importing => {
                        view! { <div class="empty-state">"Importing requirements…"</div> }.into_any()
                    }
                }}
            </Show>
        </section>
    }
}

#[component]
fn RequirementList() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="panel-header">
            <h3>"Requirements"</h3>
            <button class="send-btn" on:click=move |_| state.start_import()>
                "Import from Jira"
            </button>
        </div>
        {move || {
            let requirements = state.import.with(|i| i.requirements.clone());
            if requirements.is_empty() {
                return view! { <div class="empty-state">"No requirements in this chat yet"</div> }.into_any();
            }
            requirements
                .into_iter()
                .map(|r| {
                    let id = r.id.clone();
                    view! {
                        <div class="requirement">
                            <div class="requirement-header">
                                <span class="test-case-id">{r.jira_key.clone().unwrap_or_else(|| r.id.clone())}</span>
                                <span class="badge">{r.risk_level.clone()}</span>
                                <span class="panel-hint">{format!("{} test cases", r.test_case_count)}</span>
                                <button class="link-btn" on:click=move |_| state.delete_requirement(id.clone())>
                                    "Delete"
                                </button>
                            </div>
                            <div>{r.text.clone()}</div>
                        </div>
                    }
                })
                .collect_view()
                .into_any()
        }}
    }
}

#[component]
fn ProjectPicker() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="panel-header">
            <h3>"Choose a Jira project"</h3>
            <button class="link-btn" on:click=move |_| state.cancel_import()>"Cancel"</button>
        </div>
        {move || {
            state
                .import
                .with(|i| i.projects.clone())
                .into_iter()
                .map(|p| {
                    let key = p.key.clone();
                    view! {
                        <button class="project" on:click=move |_| state.choose_project(key.clone())>
                            <span class="test-case-id">{p.key.clone()}</span>
                            <span>{p.name.clone()}</span>
                        </button>
                    }
                })
                .collect_view()
        }}
    }
}

#[component]
fn CandidatePicker() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="panel-header">
            <h3>{move || state.import.with(|i| i.project_key.clone().unwrap_or_default())}</h3>
            <button class="link-btn" on:click=move |_| state.back_to_projects()>"Back"</button>
            <button
                class="send-btn"
                disabled=move || state.import.with(|i| i.selected == 0)
                on:click=move |_| state.prepare_import()
            >
                {move || format!("Import {}", state.import.with(|i| i.selected))}
            </button>
        </div>
        {move || {
            let candidates = state.import.with(|i| i.candidates.clone());
            if candidates.is_empty() {
                return view! { <div class="empty-state">"This project has no requirements"</div> }.into_any();
            }
            candidates
                .into_iter()
                .map(|(r, selected)| {
                    let id = r.id.clone();
                    view! {
                        <label class="requirement">
                            <input
                                type="checkbox"
                                prop:checked=selected
                                on:change=move |_| state.toggle_candidate(id.clone())
                            />
                            <span class="test-case-id">{r.jira_key.clone()}</span>
                            <span class="badge">{r.risk_level.clone()}</span>
                            <span>{r.text.clone()}</span>
                        </label>
                    }
                })
                .collect_view()
                .into_any()
        }}
    }
}

#[component]
fn ConfirmOverwrite() -> impl IntoView {
    let state = expect_context::<AppState>();
    let report = move || state.import.with(|i| i.duplicates.clone()).unwrap_or_default();

    view! {
        <div class="confirm">
            <h3>"Replace existing requirements?"</h3>
            <p>
                {move || format!(
                    "{} of the selected requirements are already in this chat: {}",
                    report().count,
                    report().existing_ids.join(", "),
                )}
            </p>
            <div class="input-row">
                <button class="link-btn" on:click=move |_| state.cancel_overwrite()>"Back"</button>
                <button class="send-btn" on:click=move |_| state.confirm_overwrite()>"Overwrite"</button>
            </div>
        </div>
    }
}
