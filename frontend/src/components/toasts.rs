use leptos::prelude::*;

use testgen_core::models::NoticeKind;

use crate::state::AppState;

#[component]
pub fn Toasts() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="toasts">
            <For
                each=move || state.toasts.get()
                key=|t| t.id
                let:toast
            >
                {
                    let class = match toast.notice.kind {
                        NoticeKind::Success => "toast success",
                        NoticeKind::Info => "toast info",
                        NoticeKind::Warning => "toast warning",
                        NoticeKind::Error => "toast error",
                    };
                    let id = toast.id;
                    view! {
                        <div class=class on:click=move |_| state.dismiss(id)>
                            <div class="toast-title">{toast.notice.title}</div>
                            {toast.notice.description.map(|d| view! { <div class="toast-body">{d}</div> })}
                        </div>
                    }
                }
            </For>
        </div>
    }
}
