use leptos::prelude::*;
use web_sys::HtmlInputElement;

use crate::state::AppState;

/// Documents uploaded into the open chat; inactive ones are left out of search.
#[component]
pub fn DocumentsPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    Effect::new(move |_| {
        state.active_session.track();
        state.refresh_documents();
    });

    let on_pick = move |ev: leptos::ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            state.upload(file);
        }
        input.set_value("");
    };

    view! {
        <section class="panel">
            <Show
                when=move || state.active_session.get().is_some()
                fallback=|| view! { <div class="empty-state">"Open a chat to manage its documents"</div> }
            >
                <div class="panel-header">
                    <h3>"Documents"</h3>
                    <span class="panel-hint">
                        {move || {
                            let docs = state.documents.get();
                            let active = docs.iter().filter(|d| d.is_active).count();
                            format!("{active} of {} active", docs.len())
                        }}
                    </span>
                    <label class="send-btn upload-btn">
                        {move || if state.uploading.get() { "Uploading…" } else { "Upload" }}
                        <input
                            type="file"
                            accept=".pdf,.txt,.md,.docx"
                            hidden=true
                            disabled=move || state.uploading.get()
                            on:change=on_pick
                        />
                    </label>
                </div>
                <div class="document-list">
                    <For
                        each=move || state.documents.get()
                        key=|d| (d.id.clone(), d.is_active)
                        let:doc
                    >
                        {
                            let id = doc.id.clone();
                            view! {
                                <div class="document" class:inactive={!doc.is_active}>
                                    <div class="document-name">{doc.filename.clone()}</div>
                                    <div class="document-meta">
                                        {format!("{} pages, {} chunks", doc.total_pages, doc.chunk_count)}
                                    </div>
                                    {(!doc.summary.is_empty()).then(|| view! {
                                        <div class="document-summary">{doc.summary.clone()}</div>
                                    })}
                                    <label class="switch">
                                        <input
                                            type="checkbox"
                                            prop:checked=doc.is_active
                                            on:change=move |_| state.toggle_document(id.clone())
                                        />
                                        {if doc.is_active { "Searched" } else { "Not searched" }}
                                    </label>
                                </div>
                            }
                        }
                    </For>
                </div>
            </Show>
        </section>
    }
}
