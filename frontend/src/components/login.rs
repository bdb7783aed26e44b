use leptos::prelude::*;

use neurocom_client::models::{LoginCredentials, RegisterData};

use crate::state::AppState;

/// Login form with a toggle to the registration fields.
#[component]
pub fn LoginForm() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (registering, set_registering) = signal(false);

    let username = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let first_name = RwSignal::new(String::new());
    let last_name = RwSignal::new(String::new());

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if registering.get() {
            state.register(RegisterData {
                first_name: first_name.get(),
                last_name: last_name.get(),
                username: username.get(),
                email: email.get(),
                password: password.get(),
            });
        } else {
            state.login(LoginCredentials { username: username.get(), password: password.get() });
        }
    };

    // Server-side validation message for one field, if any.
    let field_error = move |field: &'static str| {
        move || {
            state
                .form_error
                .get()
                .and_then(|e| e.field_error(field).map(str::to_string))
                .map(|msg| view! { <div class="field-error">{msg}</div> })
        }
    };

    view! {
        <form class="login-form" on:submit=on_submit>
            <h2>{move || if registering.get() { "Create account" } else { "Log in" }}</h2>

            {move || {
                state.form_error.get().map(|err| {
                    let general = err.non_field_errors().first().cloned().unwrap_or_else(|| err.to_string());
                    view! { <div class="error-banner">{general}</div> }
                })
            }}

            <input type="text" placeholder="Username" bind:value=username />
            {field_error("username")}

            <Show when=move || registering.get()>
                <input type="email" placeholder="Email" bind:value=email />
                {field_error("email")}
                <input type="text" placeholder="First name" bind:value=first_name />
                <input type="text" placeholder="Last name" bind:value=last_name />
            </Show>

            <input type="password" placeholder="Password" bind:value=password />
            {field_error("password")}

            <button type="submit" class="send-btn">
                {move || if registering.get() { "Register" } else { "Log in" }}
            </button>
            <button
                type="button"
                class="link-btn"
                on:click=move |_| set_registering.update(|r| *r = !*r)
            >
                {move || if registering.get() { "I already have an account" } else { "Create an account" }}
            </button>
        </form>
    }
}
