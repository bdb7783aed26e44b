use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::errors::{ApiError, ApiResult, ErrorDetails};
use crate::handle::ConversationScope;
use crate::managers::{ConversationManager, SessionManager};
use crate::storage::TokenStore;
use crate::transport::{ConnectionTag, HttpTransport, SocketConnector, SocketEvent, SocketRole};

type ConversationSlot<T, C> = RefCell<Option<Rc<ConversationManager<T, C>>>>;

/// Wires the session and the current conversation manager to one API client
/// and one socket connector, and routes socket events to their owner.
pub struct ChatClient<T, C: SocketConnector> {
    api: Rc<ApiClient<T>>,
    connector: Rc<C>,
    session: SessionManager<T, C>,
    conversation: Rc<ConversationSlot<T, C>>,
}

impl<T: HttpTransport + 'static, C: SocketConnector + 'static> ChatClient<T, C> {
    pub fn new(transport: T, tokens: Rc<dyn TokenStore>, connector: C, config: ClientConfig) -> Self {
        let api = Rc::new(ApiClient::new(transport, tokens, config));
        let connector = Rc::new(connector);
        let session = SessionManager::new(api.clone(), connector.clone());
        let conversation: Rc<ConversationSlot<T, C>> = Rc::new(RefCell::new(None));

        let slot: Weak<ConversationSlot<T, C>> = Rc::downgrade(&conversation);
        api.on_unauthorized(move || {
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let current = slot.borrow_mut().take();
            if let Some(manager) = current {
                manager.teardown();
            }
        });

        Self { api, connector, session, conversation }
    }

    pub fn api(&self) -> &Rc<ApiClient<T>> {
        &self.api
    }

    pub fn session(&self) -> &SessionManager<T, C> {
        &self.session
    }

    pub fn conversation(&self) -> Option<Rc<ConversationManager<T, C>>> {
        self.conversation.borrow().clone()
    }

    // ── Conversations ────────────────────────────────────────────────────────

    pub fn open_direct_messages(&self) -> ApiResult<Rc<ConversationManager<T, C>>> {
        self.open_scope(ConversationScope::DirectMessages)
    }

    pub fn open_chatroom(&self, chatroom_id: i64) -> ApiResult<Rc<ConversationManager<T, C>>> {
        self.open_scope(ConversationScope::Chatroom { chatroom_id })
    }

    /// Returns the manager for `scope`, replacing (and tearing down) any manager
    /// bound to a different scope. Requires a logged-in user.
    pub fn open_scope(&self, scope: ConversationScope) -> ApiResult<Rc<ConversationManager<T, C>>> {
        if let Some(current) = self.conversation() {
            if current.scope() == scope {
                return Ok(current);
            }
        }

        if self.session.user().is_none() {
            return Err(ApiError::Unauthorized(ErrorDetails::new(
                "Log in to open a conversation",
                401,
            )));
        }
        self.close_conversation();

        debug!(?scope, "Opening conversation manager");
        let manager = Rc::new(ConversationManager::new(
            scope,
            self.session.current_user(),
            self.api.clone(),
            self.connector.clone(),
        ));
        *self.conversation.borrow_mut() = Some(manager.clone());
        Ok(manager)
    }

    pub fn close_conversation(&self) {
        let current = self.conversation.borrow_mut().take();
        if let Some(manager) = current {
            manager.teardown();
        }
    }

    /// Delivers a socket event to the manager that owns the socket.
    pub fn handle_socket_event(&self, tag: ConnectionTag, event: SocketEvent) {
        match tag.role {
            SocketRole::Presence => self.session.handle_presence_event(tag, event),
            SocketRole::Notifications => self.session.notifications().handle_socket_event(tag, event),
            SocketRole::Conversation => match self.conversation() {
                Some(manager) => manager.handle_socket_event(tag, event),
                None => debug!(generation = tag.generation, "No conversation for socket event"),
            },
        }
    }

    // ── Session shortcuts that also end the conversation ─────────────────────

    /// Closes the conversation socket first, then logs out. Local state is
    /// cleared even when the server call fails.
    pub async fn logout(&self) -> ApiResult<()> {
        self.close_conversation();
        self.session.logout().await
    }

    pub async fn delete_account(&self) -> ApiResult<()> {
        self.session.delete_account().await?;
        self.close_conversation();
        Ok(())
    }

    /// Closes every socket owned by this client.
    pub fn teardown(&self) {
        info!("Shutting down chat client");
        self.close_conversation();
        self.session.teardown();
    }
}
