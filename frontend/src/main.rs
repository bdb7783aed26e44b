mod api;
mod components;
mod state;
mod storage;
mod ws;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use neurocom_client::LoginState;

use components::chat::ChatArea;
use components::login::LoginForm;
use components::sidebar::Sidebar;
use state::AppState;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    // Validate any stored token on mount
    state.restore_session();

    let darkmode = move || {
        state.login_state() == LoginState::Authenticated
            && state.client().session().settings().is_some_and(|s| s.darkmode)
    };

    view! {
        <div class="app-container" class:dark=darkmode>
            {move || match state.login_state() {
                LoginState::Unknown | LoginState::Loading => {
                    view! { <div class="empty-state">"Loading…"</div> }.into_any()
                }
                LoginState::Anonymous => view! { <LoginForm /> }.into_any(),
                LoginState::Authenticated => {
                    view! {
                        <Sidebar />
                        <ChatArea />
                    }
                        .into_any()
                }
            }}
        </div>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
