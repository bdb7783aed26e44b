use leptos::ev;
use leptos::html::Div;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use neurocom_client::models::Message;
use neurocom_client::ScrollMetrics;

use crate::state::AppState;

/// Main chat area with message history, typing indicator and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();
    let container = NodeRef::<Div>::new();

    let on_scroll = move |_| {
        if let Some(el) = container.get() {
            state.on_scroll(ScrollMetrics::new(
                el.scroll_top() as f64,
                el.scroll_height() as f64,
                el.client_height() as f64,
            ));
        }
    };

    view! {
        <main class="chat-area">
            // Toast banner
            {move || {
                state.toast.get().map(|msg| {
                    view! {
                        <div class="error-banner" on:click=move |_| state.set_toast.set(None)>
                            {msg}
                        </div>
                    }
                })
            }}

            <div class="chat-header">
                {move || match state.active_conversation() {
                    Some(_) => "Direct message",
                    None => "Pick a conversation",
                }}
            </div>

            <div class="messages-container" node_ref=container on:scroll=on_scroll>
                {move || {
                    let me = state.user().map(|u| u.id);
                    let msgs = state.messages();
                    if msgs.is_empty() {
                        view! { <div class="empty-state">"No messages yet"</div> }.into_any()
                    } else {
                        msgs.into_iter()
                            .map(|msg| {
                                let own = Some(msg.sender.id) == me;
                                view! { <MessageBubble msg own /> }
                            })
                            .collect_view()
                            .into_any()
                    }
                }}
            </div>

            <TypingIndicator />

            {move || {
                state.has_new_messages().then(|| {
                    view! {
                        <button class="new-messages" on:click=move |_| state.dismiss_new_messages()>
                            "New messages"
                        </button>
                    }
                })
            }}

            <Show when=move || state.active_conversation().is_some()>
                <ChatInput />
            </Show>
        </main>
    }
}

/// A single chat message; our own messages can be edited or deleted.
#[component]
fn MessageBubble(msg: Message, own: bool) -> impl IntoView {
    let state = expect_context::<AppState>();
    let id = msg.id;
    let css_class = if own { "message user" } else { "message assistant" };
    let current = msg.content.clone();

    let on_edit = move |_| {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Ok(Some(text)) = window.prompt_with_message_and_default("Edit message", &current) {
            state.edit_message(id, text);
        }
    };

    view! {
        <div class=css_class id=format!("message-{id}")>
            <div class="role-label">{msg.sender.username}</div>
            <div>{msg.content}</div>
            {msg.file.map(|file| {
                let name = file.original_name.clone();
                view! { <a class="attachment" href=file.url target="_blank">{name}</a> }
            })}
            {own.then(|| {
                view! {
                    <div class="message-actions">
                        <button on:click=on_edit>"Edit"</button>
                        <button on:click=move |_| state.delete_message(id)>"Delete"</button>
                    </div>
                }
            })}
        </div>
    }
}

/// Shows who else in the conversation is typing.
#[component]
fn TypingIndicator() -> impl IntoView {
    let state = expect_context::<AppState>();
    let typing = move || {
        let me = state.user().map(|u| u.id);
        state.user_statuses().iter().filter(|s| s.typing && Some(s.user_id) != me).count()
    };

    view! {
        {move || match typing() {
            0 => None,
            1 => Some(view! { <div class="typing">"Someone is typing…"</div> }.into_any()),
            n => Some(view! { <div class="typing">{format!("{n} people are typing…")}</div> }.into_any()),
        }}
    }
}

/// Chat input with textarea, file picker and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            state.submit();
        }
    };

    let on_file = move |ev: ev::Event| {
        let file = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
            .and_then(|input| input.files())
            .and_then(|files| files.get(0));
        if let Some(file) = file {
            state.attach_file(file);
        }
    };

    view! {
        <div class="input-area">
            {move || {
                state.upload_label().map(|label| {
                    view! {
                        <div class="pending-file">
                            {label}
                            <button on:click=move |_| state.remove_file()>"×"</button>
                        </div>
                    }
                })
            }}
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Type a message… (Enter to send, Shift+Enter for newline)"
                    prop:value=move || state.compose_text()
                    on:input=move |ev| state.set_compose_text(&event_target_value(&ev))
                    on:keydown=on_keydown
                />
                <input type="file" on:change=on_file />
                <button class="send-btn" on:click=move |_| state.submit()>
                    "Send"
                </button>
            </div>
        </div>
    }
}
