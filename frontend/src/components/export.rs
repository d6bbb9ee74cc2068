use std::collections::BTreeSet;

use leptos::prelude::*;

use testgen_core::models::ExportStatus;

use crate::state::AppState;

/// Picks a Jira project and the test cases of the open chat to export.
#[component]
pub fn ExportPanel() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (project, set_project) = signal(String::new());
    let (requirement, set_requirement) = signal(String::new());
    let selected = RwSignal::new(BTreeSet::<String>::new());

    // (id, title, already exported)
    let cases = move || {
        state.snapshot.with(|s| {
            let mut seen = BTreeSet::new();
            s.messages
                .iter()
                .flat_map(|m| m.testcases.iter())
                .filter(|tc| seen.insert(tc.id.clone()))
                .map(|tc| {
                    let done = s.exports.status(&tc.id) == Some(ExportStatus::Success);
                    (tc.id.clone(), tc.display_title().to_string(), done)
                })
                .collect::<Vec<_>>()
        })
    };

    let select_all = move |_| {
        selected.set(cases().into_iter().filter(|(_, _, done)| !done).map(|(id, _, _)| id).collect());
    };

    let export = move |_| {
        let ids: Vec<String> = selected.get().into_iter().collect();
        state.export(ids, project.get(), requirement.get());
        selected.set(BTreeSet::new());
    };

    view! {
        <div class="export-panel">
            <div class="input-row">
                <select on:change=move |ev| set_project.set(event_target_value(&ev))>
                    <option value="" selected=move || project.get().is_empty()>"Select a project"</option>
                    {move || {
                        state
                            .projects
                            .get()
                            .into_iter()
                            .map(|p| {
                                let key = p.key.clone();
                                view! {
                                    <option value=p.key.clone() selected=move || project.get() == key>
                                        {format!("{}: {}", p.key, p.name)}
                                    </option>
                                }
                            })
                            .collect_view()
                    }}
                </select>
                <input
                    type="text"
                    placeholder="Requirement key (optional)"
                    prop:value=requirement
                    on:input=move |ev| set_requirement.set(event_target_value(&ev))
                />
            </div>

            <div class="export-list">
                {move || {
                    cases()
                        .into_iter()
                        .map(|(id, title, done)| {
                            let id_checked = id.clone();
                            let id_toggle = id.clone();
                            view! {
                                <label class="export-item" class:done=done>
                                    <input
                                        type="checkbox"
                                        disabled=done
                                        prop:checked=move || selected.with(|s| s.contains(&id_checked))
                                        on:change=move |_| {
                                            selected.update(|s| {
                                                if !s.remove(&id_toggle) {
                                                    s.insert(id_toggle.clone());
                                                }
                                            })
                                        }
                                    />
                                    <span class="test-case-id">{id}</span>
                                    <span>{title}</span>
                                </label>
                            }
                        })
                        .collect_view()
                }}
            </div>

            <div class="input-row">
                <button class="link-btn" on:click=select_all>"Select all"</button>
                <button
                    class="send-btn"
                    on:click=export
                    disabled=move || {
                        state.snapshot.with(|s| s.exporting)
                            || selected.with(BTreeSet::is_empty)
                            || project.get().is_empty()
                    }
                >
                    {move || {
                        if state.snapshot.with(|s| s.exporting) {
                            "Exporting…".to_string()
                        } else {
                            format!("Export {} to Jira", selected.with(BTreeSet::len))
                        }
                    }}
                </button>
            </div>
        </div>
    }
}
