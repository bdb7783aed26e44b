use leptos::prelude::*;

use neurocom_client::models::Notification;
use neurocom_client::{ConversationHandle, NotificationReply};

use crate::state::AppState;

/// Sidebar showing the DM list with presence, notifications and account actions.
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();

    let username = move || state.user().map(|u| u.username).unwrap_or_default();

    view! {
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"Neurocom"</h2>
                <div class="account">
                    <span>{username}</span>
                    <button class="new-chat-btn" on:click=move |_| state.toggle_darkmode()>
                        "Theme"
                    </button>
                    <button class="new-chat-btn" on:click=move |_| state.logout()>
                        "Log out"
                    </button>
                </div>
            </div>
            <div class="conversation-list">
                {move || {
                    let dms = state.direct_messages();
                    if dms.is_empty() {
                        view! {
                            <div style="padding:1rem;color:var(--text-secondary);font-size:0.85rem">
                                "No conversations yet"
                            </div>
                        }.into_any()
                    } else {
                        let me = state.user().map(|u| u.id);
                        dms.into_iter()
                            .map(|dm| {
                                let dm_id = dm.id;
                                // The thread lists both members; show the one that isn't us.
                                let peer = if Some(dm.user.id) == me { dm.other_user } else { dm.user };
                                let peer_id = peer.id;
                                view! {
                                    <div
                                        class="conversation-item"
                                        class:active=move || {
                                            state.active_conversation()
                                                == Some(ConversationHandle::Direct { dm_id })
                                        }
                                        on:click=move |_| state.select_direct_message(dm_id)
                                    >
                                        <span
                                            class="presence-dot"
                                            class:online=move || state.is_online(peer_id)
                                        ></span>
                                        {peer.username}
                                    </div>
                                }
                            })
                            .collect_view()
                            .into_any()
                    }
                }}
            </div>
            <div class="online-users">
                <h3>{move || format!("Online ({})", state.online_users().len())}</h3>
            </div>
            <div class="notifications">
                <h3>
                    {move || format!("Notifications ({})", state.unread_notifications())}
                    <button class="new-chat-btn" on:click=move |_| state.mark_all_read()>
                        "Mark read"
                    </button>
                </h3>
                {move || {
                    state
                        .notifications()
                        .into_iter()
                        .map(|n| view! { <NotificationItem notification=n /> })
                        .collect_view()
                }}
            </div>
        </aside>
    }
}

/// One notification; requests and invitations get accept and reject buttons.
#[component]
fn NotificationItem(notification: Notification) -> impl IntoView {
    let state = expect_context::<AppState>();
    let id = notification.id;
    let actionable = notification.notification_type.is_actionable();

    view! {
        <div class="notification" class:unread=!notification.is_read>
            <span>{notification.notification_message}</span>
            {actionable.then(|| {
                view! {
                    <div class="message-actions">
                        <button on:click=move |_| state.reply_notification(id, NotificationReply::Accept)>
                            "Accept"
                        </button>
                        <button on:click=move |_| state.reply_notification(id, NotificationReply::Reject)>
                            "Reject"
                        </button>
                    </div>
                }
            })}
        </div>
    }
}
