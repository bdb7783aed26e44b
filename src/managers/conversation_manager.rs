use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::api::{channels_path, ApiClient, DIRECT_MESSAGES_PATH};
use crate::errors::{ApiError, ApiResult, SocketError};
use crate::handle::{ConversationHandle, ConversationMode, ConversationScope};
use crate::managers::CurrentUser;
use crate::models::{Channel, DirectMessage, FileDescriptor, FileUpload, Message, MessageId, User};
use crate::protocol::{ClientCommand, OutgoingMessage, ServerEvent, UserStatus};
use crate::state::{ComposeState, MessageLog, PageTrack, PendingUpload, ScrollMetrics};
use crate::transport::{
    ChatSocket, ConnectionTag, HttpTransport, SocketConnector, SocketEvent, SocketRole,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Failed(String),
}

/// Something the view should do after a state change. Drained with
/// [`ConversationManager::take_effects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    /// Bring this message into view at the end of the list.
    ScrollToMessage(MessageId),
    /// Keep this message where it was after older history was inserted above it.
    AnchorToMessage(MessageId),
    Toast(String),
    /// Call [`ConversationManager::reconnect`] after this delay.
    ReconnectAfter(Duration),
}

/// Conversations available in the manager's scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationList {
    Channels(Vec<Channel>),
    DirectMessages(Vec<DirectMessage>),
}

impl ConversationList {
    fn empty(mode: ConversationMode) -> Self {
        match mode {
            ConversationMode::Chatroom => ConversationList::Channels(Vec::new()),
            ConversationMode::Direct => ConversationList::DirectMessages(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ConversationList::Channels(items) => items.len(),
            ConversationList::DirectMessages(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct ConversationState<S> {
    active: Option<ConversationHandle>,
    socket: Option<S>,
    connection: ConnectionState,
    connection_generation: u64,
    reconnect_attempts: u32,

    messages: MessageLog,
    history: PageTrack,
    initialized: bool,
    new_message_notice: bool,
    user_statuses: Vec<UserStatus>,
    scroll: Option<ScrollMetrics>,

    conversations: ConversationList,
    conversations_track: PageTrack,
    is_admin: bool,
    admin_generation: u64,

    compose: ComposeState,
    effects: Vec<ViewEffect>,
}

impl<S: ChatSocket> ConversationState<S> {
    /// Closes the current socket. Its generation is retired so late events are dropped.
    fn close_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.close();
        }
        self.connection_generation += 1;
        self.connection = ConnectionState::Idle;
        self.reconnect_attempts = 0;
    }

    fn reset_conversation(&mut self) {
        self.messages.clear();
        self.history.reset();
        self.initialized = false;
        self.new_message_notice = false;
        self.user_statuses.clear();
        self.compose.clear();
    }

    fn send(&self, command: &ClientCommand) -> Result<(), SocketError> {
        let socket = self.socket.as_ref().ok_or(SocketError::NotConnected)?;
        socket.send_text(command.encode()?)
    }

    /// Unknown metrics count as "at the bottom": nothing has been scrolled away yet.
    fn at_bottom(&self) -> bool {
        self.scroll.map_or(true, |m| m.is_at_bottom())
    }
}

/// Drives one chatroom's channels or the user's direct messages: the active
/// conversation, its socket, history pages, compose box and view effects.
pub struct ConversationManager<T, C: SocketConnector> {
    scope: ConversationScope,
    sender: CurrentUser,
    api: Rc<ApiClient<T>>,
    connector: Rc<C>,
    state: RefCell<ConversationState<C::Socket>>,
}

impl<T: HttpTransport, C: SocketConnector> ConversationManager<T, C> {
    pub fn new(
        scope: ConversationScope,
        sender: CurrentUser,
        api: Rc<ApiClient<T>>,
        connector: Rc<C>,
    ) -> Self {
        let state = ConversationState {
            active: None,
            socket: None,
            connection: ConnectionState::Idle,
            connection_generation: 0,
            reconnect_attempts: 0,
            messages: MessageLog::new(),
            history: PageTrack::new(),
            initialized: false,
            new_message_notice: false,
            user_statuses: Vec::new(),
            scroll: None,
            conversations: ConversationList::empty(scope.mode()),
            conversations_track: PageTrack::new(),
            is_admin: false,
            admin_generation: 0,
            compose: ComposeState::default(),
            effects: Vec::new(),
        };
        Self { scope, sender, api, connector, state: RefCell::new(state) }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn scope(&self) -> ConversationScope {
        self.scope
    }

    pub fn mode(&self) -> ConversationMode {
        self.scope.mode()
    }

    /// The user outgoing messages are sent as, with their current profile.
    pub fn sender(&self) -> Option<User> {
        self.sender.get()
    }

    pub fn active_conversation(&self) -> Option<ConversationHandle> {
        self.state.borrow().active
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().messages.as_slice().to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.state.borrow().messages.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    pub fn has_new_messages(&self) -> bool {
        self.state.borrow().new_message_notice
    }

    pub fn dismiss_new_messages(&self) {
        self.state.borrow_mut().new_message_notice = false;
    }

    pub fn user_statuses(&self) -> Vec<UserStatus> {
        self.state.borrow().user_statuses.clone()
    }

    pub fn next_cursor(&self) -> Option<String> {
        self.state.borrow().history.next().map(str::to_string)
    }

    pub fn previous_cursor(&self) -> Option<String> {
        self.state.borrow().history.previous().map(str::to_string)
    }

    pub fn is_loading_history(&self) -> bool {
        self.state.borrow().history.is_in_flight()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().connection.clone()
    }

    pub fn conversations(&self) -> ConversationList {
        self.state.borrow().conversations.clone()
    }

    pub fn next_conversations_cursor(&self) -> Option<String> {
        self.state.borrow().conversations_track.next().map(str::to_string)
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin
    }

    pub fn compose_text(&self) -> String {
        self.state.borrow().compose.text().to_string()
    }

    pub fn pending_upload(&self) -> Option<PendingUpload> {
        self.state.borrow().compose.upload().cloned()
    }

    /// Whether the last reported scroll position sits at the bottom of the list.
    pub fn is_at_bottom(&self) -> bool {
        self.state.borrow().at_bottom()
    }

    pub fn take_effects(&self) -> Vec<ViewEffect> {
        std::mem::take(&mut self.state.borrow_mut().effects)
    }

    // ── Conversation lifecycle ───────────────────────────────────────────────

    /// Makes `handle` the active conversation: closes the previous socket,
    /// drops everything tied to it, opens the new socket and loads the newest
    /// history page.
    pub async fn switch_conversation(&self, handle: ConversationHandle) -> ApiResult<()> {
        if !self.scope.contains(&handle) {
            return Err(ApiError::Unexpected(format!(
                "{handle} is outside of this manager's scope"
            )));
        }
        {
            let mut state = self.state.borrow_mut();
            if state.active == Some(handle) {
                return Ok(());
            }
            info!(conversation = %handle, "Switching conversation");
            state.close_socket();
            state.reset_conversation();
            state.active = Some(handle);
            self.open_socket(&mut state, handle);
        }
        self.fetch_history(None, false).await.map(|_| ())
    }

    /// Closes the socket and forgets the active conversation. Responses still
    /// in flight are discarded when they land.
    pub fn teardown(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(handle) = state.active.take() {
            debug!(conversation = %handle, "Tearing down conversation");
        }
        state.close_socket();
        state.reset_conversation();
    }

    /// Reopens the socket of the active conversation after it dropped.
    pub fn reconnect(&self) {
        let mut state = self.state.borrow_mut();
        let Some(handle) = state.active else {
            return;
        };
        if state.socket.is_some() {
            return;
        }
        info!(conversation = %handle, attempt = state.reconnect_attempts, "Reconnecting");
        self.open_socket(&mut state, handle);
    }

    fn open_socket(&self, state: &mut ConversationState<C::Socket>, handle: ConversationHandle) {
        let Some(token) = self.api.token() else {
            warn!(conversation = %handle, "No token, not opening a socket");
            state.connection = ConnectionState::Failed("not authenticated".to_string());
            return;
        };

        state.connection_generation += 1;
        let tag = ConnectionTag { role: SocketRole::Conversation, generation: state.connection_generation };
        let url = self.api.config().socket_url(&handle.socket_path(), &token);
        state.connection = ConnectionState::Connecting;
        match self.connector.connect(&url, tag) {
            Ok(socket) => {
                debug!(conversation = %handle, generation = tag.generation, "Socket opening");
                state.socket = Some(socket);
            }
            Err(e) => {
                error!(conversation = %handle, error = %e, "Failed to open socket");
                state.connection = ConnectionState::Failed(e.to_string());
                state.effects.push(ViewEffect::Toast(e.to_string()));
            }
        }
    }

    // ── Socket events ────────────────────────────────────────────────────────

    pub fn handle_socket_event(&self, tag: ConnectionTag, event: SocketEvent) {
        let mut state = self.state.borrow_mut();
        if tag.role != SocketRole::Conversation || tag.generation != state.connection_generation {
            debug!(generation = tag.generation, "Dropping event from a stale socket");
            return;
        }

        match event {
            SocketEvent::Opened => {
                state.connection = ConnectionState::Open;
                state.reconnect_attempts = 0;
            }
            SocketEvent::Text(text) => match ServerEvent::decode(&text) {
                Ok(event) => apply_server_event(&mut state, event),
                Err(e) => warn!(error = %e, "Undecodable socket frame"),
            },
            SocketEvent::Closed { code, reason } => {
                state.socket = None;
                self.on_unexpected_close(&mut state, code, reason);
            }
            SocketEvent::Error(e) => warn!(error = %e, "Socket error"),
        }
    }

    fn on_unexpected_close(
        &self,
        state: &mut ConversationState<C::Socket>,
        code: Option<u16>,
        reason: String,
    ) {
        let policy = self.api.config().reconnect;
        state.reconnect_attempts += 1;
        match policy.delay_for(state.reconnect_attempts) {
            Some(delay) => {
                info!(?code, %reason, ?delay, "Socket closed, scheduling reconnect");
                state.connection = ConnectionState::Closed;
                state.effects.push(ViewEffect::ReconnectAfter(delay));
            }
            None if policy.max_attempts == 0 => {
                info!(?code, %reason, "Socket closed");
                state.connection = ConnectionState::Closed;
            }
            None => {
                warn!(?code, %reason, attempts = policy.max_attempts, "Giving up on reconnecting");
                state.connection = ConnectionState::Failed(reason);
                state
                    .effects
                    .push(ViewEffect::Toast("Connection lost. Please reload the conversation.".to_string()));
            }
        }
    }

    // ── History ──────────────────────────────────────────────────────────────

    /// Loads one history page for the active conversation. `cursor` is a
    /// `next` URL from an earlier page, or `None` for the newest page.
    ///
    /// Returns whether the page was applied: `false` when there is no active
    /// conversation, a fetch is already in flight, or the conversation changed
    /// while waiting.
    pub async fn fetch_history(&self, cursor: Option<String>, prepend: bool) -> ApiResult<bool> {
        let (handle, ticket, path) = {
            let mut state = self.state.borrow_mut();
            let Some(handle) = state.active else {
                return Ok(false);
            };
            let Some(ticket) = state.history.begin(cursor.clone()) else {
                debug!(conversation = %handle, "History fetch already in flight");
                return Ok(false);
            };
            let path = cursor.unwrap_or_else(|| handle.history_path());
            (handle, ticket, path)
        };

        let result = self.api.messages(&path).await;

        let mut state = self.state.borrow_mut();
        if state.active != Some(handle) || !state.history.is_current(&ticket) {
            debug!(conversation = %handle, "Discarding stale history page");
            return Ok(false);
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                state.history.fail(&ticket);
                state.effects.push(ViewEffect::Toast(e.to_string()));
                return Err(e);
            }
        };

        state.history.complete(&ticket, page.next, page.previous);
        if prepend {
            let anchor = state.messages.first().map(|m| m.id);
            let inserted = state.messages.prepend_page(page.items);
            debug!(conversation = %handle, inserted, "Prepended older history");
            if let (Some(id), true) = (anchor, inserted > 0) {
                state.effects.push(ViewEffect::AnchorToMessage(id));
            }
        } else {
            // Live messages that arrived before the first page landed are kept.
            let live = if state.initialized {
                Vec::new()
            } else {
                state.messages.as_slice().to_vec()
            };
            state.messages.replace_with_page(page.items);
            for message in live {
                state.messages.push(message);
            }
            if let Some(last) = state.messages.last().map(|m| m.id) {
                state.effects.push(ViewEffect::ScrollToMessage(last));
            }
        }
        state.initialized = true;
        Ok(true)
    }

    /// Fetches the next older page, if there is one and nothing is in flight.
    pub async fn load_older(&self) -> ApiResult<bool> {
        let cursor = {
            let state = self.state.borrow();
            if state.history.is_in_flight() {
                return Ok(false);
            }
            state.history.next().map(str::to_string)
        };
        match cursor {
            Some(cursor) => self.fetch_history(Some(cursor), true).await,
            None => Ok(false),
        }
    }

    /// Records the view's scroll position. Returns `true` when the view reached
    /// the top and older history can be loaded.
    pub fn on_scroll(&self, metrics: ScrollMetrics) -> bool {
        let mut state = self.state.borrow_mut();
        state.scroll = Some(metrics);
        if metrics.is_at_bottom() {
            state.new_message_notice = false;
        }
        metrics.is_at_top()
            && state.initialized
            && state.history.next().is_some()
            && !state.history.is_in_flight()
    }

    // ── Outgoing commands ────────────────────────────────────────────────────

    /// Sends the trimmed `text` with the completed attachment, if any, then
    /// clears the compose box. Returns `false` when there was nothing to send.
    pub fn send_message(&self, text: &str) -> Result<bool, SocketError> {
        let mut state = self.state.borrow_mut();
        let content = text.trim();
        let file: Option<FileDescriptor> = state.compose.attached_file().cloned();
        if content.is_empty() && file.is_none() {
            return Ok(false);
        }
        let handle = state.active.ok_or(SocketError::NotConnected)?;
        let sender = self.sender.get().ok_or(SocketError::NoSender)?;

        let message = OutgoingMessage::new(handle, sender, content, file);
        state.send(&ClientCommand::ChatMessage { message })?;
        debug!(conversation = %handle, "Message sent");

        let was_typing = state.compose.is_typing();
        state.compose.clear();
        if was_typing {
            self.send_typing(&state, false);
        }
        Ok(true)
    }

    /// Sends the compose box content.
    pub fn submit(&self) -> Result<bool, SocketError> {
        let text = self.compose_text();
        self.send_message(&text)
    }

    /// Requests an edit. The local copy changes when the server echoes it back.
    pub fn edit_message(&self, message_id: MessageId, new_content: &str) -> Result<(), SocketError> {
        let state = self.state.borrow();
        state.send(&ClientCommand::EditMessage {
            message_id,
            new_content: new_content.to_string(),
        })
    }

    /// Requests a delete. The local copy goes away when the server echoes it back.
    pub fn delete_message(&self, message_id: MessageId) -> Result<(), SocketError> {
        self.state.borrow().send(&ClientCommand::DeleteMessage { message_id })
    }

    /// Updates the compose text and announces typing when it starts or stops.
    pub fn set_compose_text(&self, text: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(typing) = state.compose.set_text(text) {
            self.send_typing(&state, typing);
        }
    }

    fn send_typing(&self, state: &ConversationState<C::Socket>, typing: bool) {
        let Some(user_id) = self.sender.id() else {
            return;
        };
        let user_status = UserStatus { user_id, in_the_chat_status: true, typing };
        if let Err(e) = state.send(&ClientCommand::UserStatus { user_status }) {
            debug!(error = %e, typing, "Typing status not sent");
        }
    }

    // ── Attachments ──────────────────────────────────────────────────────────

    pub fn attach_file(&self, file_name: &str) {
        self.state.borrow_mut().compose.attach(file_name);
    }

    pub fn set_upload_progress(&self, percent: u8) {
        self.state.borrow_mut().compose.set_progress(percent);
    }

    pub fn complete_upload(&self, descriptor: FileDescriptor) -> bool {
        self.state.borrow_mut().compose.complete_upload(descriptor)
    }

    pub fn remove_file(&self) {
        self.state.borrow_mut().compose.remove_upload();
    }

    /// Attaches `upload` and posts it. The result is dropped if the attachment
    /// was removed or replaced while uploading.
    pub async fn upload_attachment(&self, upload: FileUpload) -> ApiResult<FileDescriptor> {
        let file_name = upload.file_name.clone();
        self.attach_file(&file_name);

        let result = self.api.upload_file(upload).await;

        let mut state = self.state.borrow_mut();
        let still_pending = state.compose.upload().is_some_and(|u| u.file_name == file_name);
        match &result {
            Ok(descriptor) if still_pending => {
                state.compose.complete_upload(descriptor.clone());
            }
            Ok(_) => debug!(file = %file_name, "Upload finished after the attachment changed"),
            Err(e) => {
                if still_pending {
                    state.compose.remove_upload();
                }
                state.effects.push(ViewEffect::Toast(e.to_string()));
            }
        }
        result
    }

    // ── Conversation list ────────────────────────────────────────────────────

    /// Loads the channels of the chatroom, or the user's direct messages.
    /// `append` adds a further page after the ones already loaded.
    pub async fn fetch_conversations(&self, cursor: Option<String>, append: bool) -> ApiResult<bool> {
        let ticket = {
            let mut state = self.state.borrow_mut();
            if !append {
                state.conversations_track.reset();
            }
            match state.conversations_track.begin(cursor.clone()) {
                Some(ticket) => ticket,
                None => return Ok(false),
            }
        };

        let path = match (self.scope, cursor) {
            (_, Some(cursor)) => cursor,
            (ConversationScope::Chatroom { chatroom_id }, None) => channels_path(chatroom_id),
            (ConversationScope::DirectMessages, None) => DIRECT_MESSAGES_PATH.to_string(),
        };
        let result = match self.scope {
            ConversationScope::Chatroom { .. } => self.api.channels(&path).await.map(|page| {
                (ConversationList::Channels(page.items), page.next, page.previous)
            }),
            ConversationScope::DirectMessages => self.api.direct_messages(&path).await.map(|page| {
                (ConversationList::DirectMessages(page.items), page.next, page.previous)
            }),
        };

        let mut state = self.state.borrow_mut();
        if !state.conversations_track.is_current(&ticket) {
            return Ok(false);
        }
        let (list, next, previous) = match result {
            Ok(page) => page,
            Err(e) => {
                state.conversations_track.fail(&ticket);
                state.effects.push(ViewEffect::Toast(e.to_string()));
                return Err(e);
            }
        };
        state.conversations_track.complete(&ticket, next, previous);
        match (&mut state.conversations, list) {
            (ConversationList::Channels(current), ConversationList::Channels(page)) if append => {
                current.extend(page)
            }
            (ConversationList::DirectMessages(current), ConversationList::DirectMessages(page))
                if append =>
            {
                current.extend(page)
            }
            (current, page) => *current = page,
        }
        Ok(true)
    }

    /// Asks whether the user administers `chatroom_id`. Only the latest call's
    /// answer is kept.
    pub async fn load_admin_status(&self, chatroom_id: i64) -> ApiResult<bool> {
        let generation = {
            let mut state = self.state.borrow_mut();
            state.admin_generation += 1;
            state.admin_generation
        };
        let is_admin = self.api.is_chatroom_admin(chatroom_id).await?;

        let mut state = self.state.borrow_mut();
        if state.admin_generation == generation {
            state.is_admin = is_admin;
        } else {
            debug!(chatroom_id, "Dropping superseded admin status");
        }
        Ok(is_admin)
    }
}

fn apply_server_event<S: ChatSocket>(state: &mut ConversationState<S>, event: ServerEvent) {
    match event {
        ServerEvent::ChatMessage { message } => {
            let id = message.id;
            if !state.messages.push(message) {
                return;
            }
            if state.at_bottom() {
                state.effects.push(ViewEffect::ScrollToMessage(id));
            } else {
                state.new_message_notice = true;
            }
        }
        ServerEvent::MessageEdited { message_id, new_content } => {
            if new_content.is_empty() {
                debug!(message_id, "Ignoring edit without content");
                return;
            }
            state.messages.edit(message_id, &new_content);
        }
        ServerEvent::MessageDeleted { message_id } => {
            state.messages.remove(message_id);
        }
        ServerEvent::UserStatus { user_status } => state.user_statuses = user_status,
        ServerEvent::Unknown => debug!("Ignoring unknown socket action"),
    }
}
