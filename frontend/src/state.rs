use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen_futures::JsFuture;

use neurocom_client::models::{
    DirectMessage, FileUpload, LoginCredentials, Message, MessageId, Notification, RegisterData,
    User, UserId, UserSettings,
};
use neurocom_client::protocol::UserStatus;
use neurocom_client::{
    ApiError, ChatClient, ClientConfig, ConnectionTag, ConversationHandle, ConversationList, ConversationManager,
    LoginState, NotificationReply, ScrollMetrics, SocketEvent, ViewEffect,
};

use crate::api::GlooTransport;
use crate::storage::BrowserTokenStore;
use crate::ws::BrowserConnector;

pub type FrontendClient = ChatClient<GlooTransport, BrowserConnector>;
type FrontendConversation = ConversationManager<GlooTransport, BrowserConnector>;

/// Shared application state, provided via Leptos context.
///
/// The chat client owns all conversation and session state; components read
/// it inside reactive closures that track `revision`, which is bumped after
/// every mutation.
#[derive(Clone, Copy)]
pub struct AppState {
    client: StoredValue<Rc<FrontendClient>, LocalStorage>,

    // --- Read signals (for components to subscribe to) ---
    pub revision: ReadSignal<u64>,
    pub toast: ReadSignal<Option<String>>,
    pub form_error: ReadSignal<Option<ApiError>>,

    // --- Write signals (for mutating state) ---
    set_revision: WriteSignal<u64>,
    pub set_toast: WriteSignal<Option<String>>,
    set_form_error: WriteSignal<Option<ApiError>>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let config = ClientConfig::from_build_env().unwrap_or_else(|e| {
            log::warn!("Invalid build configuration, using defaults: {e}");
            ClientConfig::default()
        });
        let connector = BrowserConnector::default();
        let client = Rc::new(ChatClient::new(
            GlooTransport,
            Rc::new(BrowserTokenStore),
            connector.clone(),
            config,
        ));

        let (revision, set_revision) = signal(0u64);
        let (toast, set_toast) = signal(None::<String>);
        let (form_error, set_form_error) = signal(None::<ApiError>);

        let state = Self {
            client: StoredValue::new_local(client),
            revision,
            toast,
            form_error,
            set_revision,
            set_toast,
            set_form_error,
        };
        connector.set_handler(move |tag, event| state.on_socket_event(tag, event));

        provide_context(state);
        state
    }

    pub fn client(&self) -> Rc<FrontendClient> {
        self.client.get_value()
    }

    fn conversation(&self) -> Option<Rc<FrontendConversation>> {
        self.client().conversation()
    }

    /// Marks client state as changed so tracking closures re-run.
    fn touch(&self) {
        self.set_revision.update(|r| *r += 1);
    }

    // ── Reactive reads ────────────────────────────────────────────────────────

    pub fn login_state(&self) -> LoginState {
        self.revision.track();
        self.client().session().login_state()
    }

    pub fn user(&self) -> Option<User> {
        self.revision.track();
        self.client().session().user()
    }

    pub fn online_users(&self) -> Vec<UserId> {
        self.revision.track();
        self.client().session().online_users()
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.revision.track();
        self.client().session().is_online(user_id)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.revision.track();
        self.client().session().notifications().notifications()
    }

    pub fn unread_notifications(&self) -> usize {
        self.revision.track();
        self.client().session().notifications().unread_count()
    }

    pub fn direct_messages(&self) -> Vec<DirectMessage> {
        self.revision.track();
        match self.conversation().map(|c| c.conversations()) {
            Some(ConversationList::DirectMessages(dms)) => dms,
            _ => Vec::new(),
        }
    }

    pub fn active_conversation(&self) -> Option<ConversationHandle> {
        self.revision.track();
        self.conversation().and_then(|c| c.active_conversation())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.revision.track();
        self.conversation().map(|c| c.messages()).unwrap_or_default()
    }

    pub fn user_statuses(&self) -> Vec<UserStatus> {
        self.revision.track();
        self.conversation().map(|c| c.user_statuses()).unwrap_or_default()
    }

    pub fn has_new_messages(&self) -> bool {
        self.revision.track();
        self.conversation().is_some_and(|c| c.has_new_messages())
    }

    pub fn compose_text(&self) -> String {
        self.revision.track();
        self.conversation().map(|c| c.compose_text()).unwrap_or_default()
    }

    pub fn upload_label(&self) -> Option<String> {
        self.revision.track();
        let upload = self.conversation()?.pending_upload()?;
        Some(if upload.completed {
            upload.file_name
        } else {
            format!("{} ({}%)", upload.file_name, upload.progress)
        })
    }

    // ── Session ───────────────────────────────────────────────────────────────

    /// Validate a stored token and, when it is accepted, load the DM list.
    pub fn restore_session(&self) {
        let state = *self;
        spawn_local(async move {
            let client = state.client();
            if let Err(e) = client.session().restore_session().await {
                log::info!("Session not restored: {e}");
            }
            state.touch();
            if client.session().is_logged_in() {
                state.load_direct_messages();
            }
        });
    }

    pub fn login(&self, credentials: LoginCredentials) {
        let state = *self;
        self.set_form_error.set(None);
        spawn_local(async move {
            match state.client().session().login(&credentials).await {
                Ok(_) => state.load_direct_messages(),
                Err(e) => {
                    log::error!("Login failed: {e}");
                    state.set_form_error.set(Some(e));
                }
            }
            state.touch();
        });
    }

    pub fn register(&self, fields: RegisterData) {
        let state = *self;
        self.set_form_error.set(None);
        spawn_local(async move {
            match state.client().session().register(&fields).await {
                Ok(_) => state.load_direct_messages(),
                Err(e) => {
                    log::error!("Registration failed: {e}");
                    state.set_form_error.set(Some(e));
                }
            }
            state.touch();
        });
    }

    pub fn logout(&self) {
        let state = *self;
        spawn_local(async move {
            if let Err(e) = state.client().logout().await {
                log::warn!("Logout call failed: {e}");
            }
            state.touch();
        });
    }

    pub fn toggle_darkmode(&self) {
        let state = *self;
        let mut settings: UserSettings = self.client().session().settings().unwrap_or_default();
        settings.darkmode = !settings.darkmode;
        spawn_local(async move {
            if let Err(e) = state.client().session().update_settings(&settings).await {
                state.set_toast.set(Some(e.to_string()));
            }
            state.touch();
        });
    }

    // ── Notifications ─────────────────────────────────────────────────────────

    pub fn mark_all_read(&self) {
        let state = *self;
        spawn_local(async move {
            if let Err(e) = state.client().session().notifications().mark_all_read().await {
                state.set_toast.set(Some(e.to_string()));
            }
            state.touch();
        });
    }

    /// Accept or reject a friend request, invitation or join request.
    pub fn reply_notification(&self, notification_id: i64, reply: NotificationReply) {
        let state = *self;
        spawn_local(async move {
            let client = state.client();
            if let Err(e) = client.session().notifications().reply(notification_id, reply).await {
                state.set_toast.set(Some(e.to_string()));
            }
            state.touch();
        });
    }

    // ── Conversations ─────────────────────────────────────────────────────────

    /// Load the DM list from the backend.
    pub fn load_direct_messages(&self) {
        let state = *self;
        let manager = match self.client().open_direct_messages() {
            Ok(manager) => manager,
            Err(e) => {
                log::error!("Cannot open direct messages: {e}");
                return;
            }
        };
        spawn_local(async move {
            if let Err(e) = manager.fetch_conversations(None, false).await {
                log::error!("Failed to fetch direct messages: {e}");
            }
            state.drain_effects();
        });
    }

    /// Select a DM thread, open its socket and load its newest messages.
    pub fn select_direct_message(&self, dm_id: i64) {
        let state = *self;
        let Some(manager) = self.conversation() else {
            return;
        };
        spawn_local(async move {
            if let Err(e) = manager.switch_conversation(ConversationHandle::Direct { dm_id }).await {
                log::error!("Failed to open conversation {dm_id}: {e}");
            }
            state.drain_effects();
        });
    }

    pub fn on_scroll(&self, metrics: ScrollMetrics) {
        let Some(manager) = self.conversation() else {
            return;
        };
        let reached_top = manager.on_scroll(metrics);
        self.touch();
        if reached_top {
            let state = *self;
            spawn_local(async move {
                if let Err(e) = manager.load_older().await {
                    log::error!("Failed to load older messages: {e}");
                }
                state.drain_effects();
            });
        }
    }

    pub fn set_compose_text(&self, text: &str) {
        if let Some(manager) = self.conversation() {
            manager.set_compose_text(text);
            self.touch();
        }
    }

    pub fn submit(&self) {
        let Some(manager) = self.conversation() else {
            return;
        };
        if let Err(e) = manager.submit() {
            self.set_toast.set(Some(e.to_string()));
        }
        self.touch();
    }

    pub fn edit_message(&self, message_id: MessageId, new_content: String) {
        if let Some(Err(e)) = self.conversation().map(|m| m.edit_message(message_id, &new_content)) {
            self.set_toast.set(Some(e.to_string()));
        }
    }

    pub fn delete_message(&self, message_id: MessageId) {
        if let Some(Err(e)) = self.conversation().map(|m| m.delete_message(message_id)) {
            self.set_toast.set(Some(e.to_string()));
        }
    }

    pub fn dismiss_new_messages(&self) {
        if let Some(manager) = self.conversation() {
            manager.dismiss_new_messages();
            if let Some(last) = manager.messages().last() {
                scroll_to_message(last.id);
            }
            self.touch();
        }
    }

    /// Read a chosen file and upload it as the pending attachment.
    pub fn attach_file(&self, file: web_sys::File) {
        let state = *self;
        let Some(manager) = self.conversation() else {
            return;
        };
        spawn_local(async move {
            let bytes = match JsFuture::from(file.array_buffer()).await {
                Ok(buffer) => js_sys::Uint8Array::new(&buffer).to_vec(),
                Err(e) => {
                    log::error!("Failed to read {}: {e:?}", file.name());
                    return;
                }
            };
            let upload = FileUpload { file_name: file.name(), content_type: file.type_(), bytes };
            if let Err(e) = manager.upload_attachment(upload).await {
                log::error!("Upload failed: {e}");
            }
            state.drain_effects();
        });
    }

    pub fn remove_file(&self) {
        if let Some(manager) = self.conversation() {
            manager.remove_file();
            self.touch();
        }
    }

    // ── Socket events and view effects ────────────────────────────────────────

    fn on_socket_event(&self, tag: ConnectionTag, event: SocketEvent) {
        self.client().handle_socket_event(tag, event);
        self.drain_effects();
    }

    fn drain_effects(&self) {
        let Some(manager) = self.conversation() else {
            self.touch();
            return;
        };
        for effect in manager.take_effects() {
            match effect {
                ViewEffect::ScrollToMessage(id) | ViewEffect::AnchorToMessage(id) => {
                    scroll_to_message(id)
                }
                ViewEffect::Toast(message) => self.set_toast.set(Some(message)),
                ViewEffect::ReconnectAfter(delay) => {
                    let state = *self;
                    let manager = manager.clone();
                    spawn_local(async move {
                        TimeoutFuture::new(delay.as_millis().min(u32::MAX as u128) as u32).await;
                        manager.reconnect();
                        state.touch();
                    });
                }
            }
        }
        self.touch();
    }
}

/// Scrolls to a message once the list has re-rendered.
fn scroll_to_message(id: MessageId) {
    spawn_local(async move {
        TimeoutFuture::new(0).await;
        let element = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(&format!("message-{id}")));
        if let Some(element) = element {
            element.scroll_into_view();
        }
    });
}
