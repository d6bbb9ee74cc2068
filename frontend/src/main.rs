mod api;
mod components;
mod state;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::analytics::AnalyticsPanel;
use components::auth::AuthGate;
use components::chat::ChatArea;
use components::documents::DocumentsPanel;
use components::requirements::RequirementsPanel;
use components::sidebar::Sidebar;
use components::toasts::Toasts;
use state::{AppState, AuthState, Panel};

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let auth = AuthState::provide();
    // only a change of user rebuilds the studio
    let user_id = Memo::new(move |_| auth.signed_in_as());

    view! {
        {move || match user_id.get() {
            Some(user_id) => view! { <Studio user_id=user_id /> }.into_any(),
            None => view! { <AuthGate /> }.into_any(),
        }}
    }
}

/// Everything a signed-in user sees.
#[component]
fn Studio(user_id: String) -> impl IntoView {
    let state = AppState::provide(user_id);
    state.start();

    view! {
        <div class="app-container">
            <Sidebar />
            <div class="main-area">
                <PanelTabs />
                {move || match state.panel.get() {
                    Panel::Chat => view! { <ChatArea /> }.into_any(),
                    Panel::Documents => view! { <DocumentsPanel /> }.into_any(),
                    Panel::Requirements => view! { <RequirementsPanel /> }.into_any(),
                    Panel::Analytics => view! { <AnalyticsPanel /> }.into_any(),
                }}
            </div>
            <Toasts />
        </div>
    }
}

#[component]
fn PanelTabs() -> impl IntoView {
    let state = expect_context::<AppState>();
    let tab = move |panel: Panel, label: &'static str| {
        view! {
            <button
                class="tab"
                class:active=move || state.panel.get() == panel
                on:click=move |_| state.panel.set(panel)
            >
                {label}
            </button>
        }
    };

    view! {
        <nav class="panel-tabs">
            {tab(Panel::Chat, "Chat")}
            {tab(Panel::Documents, "Documents")}
            {tab(Panel::Requirements, "Requirements")}
            {tab(Panel::Analytics, "Analytics")}
        </nav>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
