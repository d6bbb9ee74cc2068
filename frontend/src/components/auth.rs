use leptos::ev;
use leptos::prelude::*;

use crate::state::AuthState;

/// Sign-in / sign-up form, or the verification prompt for an unverified account.
#[component]
pub fn AuthGate() -> impl IntoView {
    let auth = expect_context::<AuthState>();

    view! {
        <div class="auth-screen">
            <h1>"Test Case Studio"</h1>
            {move || match auth.user.get() {
                Some(user) if !user.email_verified => {
                    view! { <VerifyEmail email=user.email /> }.into_any()
                }
                _ => view! { <CredentialsForm /> }.into_any(),
            }}
            {move || auth.error.get().map(|err| view! { <div class="error-banner">{err}</div> })}
        </div>
    }
}

#[component]
fn CredentialsForm() -> impl IntoView {
    let auth = expect_context::<AuthState>();
    let (signing_up, set_signing_up) = signal(false);
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (name, set_name) = signal(String::new());

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if signing_up.get() {
            auth.sign_up(email.get(), password.get(), name.get());
        } else {
            auth.sign_in(email.get(), password.get());
        }
    };

    view! {
        <form class="auth-form" on:submit=on_submit>
            <Show when=move || signing_up.get()>
                <input
                    type="text"
                    placeholder="Display name"
                    prop:value=name
                    on:input=move |ev| set_name.set(event_target_value(&ev))
                />
            </Show>
            <input
                type="email"
                placeholder="Email"
                prop:value=email
                on:input=move |ev| set_email.set(event_target_value(&ev))
            />
            <input
                type="password"
                placeholder="Password"
                prop:value=password
                on:input=move |ev| set_password.set(event_target_value(&ev))
            />
            <button type="submit" class="send-btn" disabled=move || auth.busy.get()>
                {move || match (auth.busy.get(), signing_up.get()) {
                    (true, _) => "Please wait…",
                    (false, true) => "Create account",
                    (false, false) => "Sign in",
                }}
            </button>
            <button
                type="button"
                class="link-btn"
                on:click=move |_| set_signing_up.update(|s| *s = !*s)
            >
                {move || {
                    if signing_up.get() {
                        "Already have an account? Sign in"
                    } else {
                        "New here? Create an account"
                    }
                }}
            </button>
        </form>
    }
}

#[component]
fn VerifyEmail(email: String) -> impl IntoView {
    let auth = expect_context::<AuthState>();

    view! {
        <div class="verify-email">
            <p>"We sent a verification link to " <strong>{email}</strong> "."</p>
            <p>"Open it, then come back here."</p>
            <div class="input-row">
                <button class="send-btn" disabled=move || auth.busy.get() on:click=move |_| auth.reload()>
                    "I've verified my email"
                </button>
                <button class="link-btn" disabled=move || auth.busy.get() on:click=move |_| auth.resend_verification()>
                    "Resend email"
                </button>
                <button class="link-btn" on:click=move |_| auth.sign_out()>
                    "Sign out"
                </button>
            </div>
        </div>
    }
}
