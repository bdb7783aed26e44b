use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::errors::ApiResult;
use crate::managers::NotificationManager;
use crate::models::{
    ChangePasswordData, LoginCredentials, ProfileUpdate, RegisterData, User, UserId, UserSettings,
};
use crate::protocol::PresenceEvent;
use crate::transport::{
    ChatSocket, ConnectionTag, HttpTransport, SocketConnector, SocketEvent, SocketRole,
};

pub const PRESENCE_SOCKET_PATH: &str = "/ws/activity/";

/// `Unknown → Loading → {Authenticated, Anonymous}`; `Authenticated → Anonymous`
/// on logout or an unauthorized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Unknown,
    Loading,
    Authenticated,
    Anonymous,
}

/// The logged-in user, shared with the managers that need to name the sender.
/// Profile changes are visible to every holder.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(Rc<RefCell<Option<User>>>);

impl CurrentUser {
    pub fn get(&self) -> Option<User> {
        self.0.borrow().clone()
    }

    pub fn id(&self) -> Option<UserId> {
        self.0.borrow().as_ref().map(|u| u.id)
    }

    fn set(&self, user: Option<User>) {
        *self.0.borrow_mut() = user;
    }

    fn update<R>(&self, f: impl FnOnce(&mut Option<User>) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

struct SessionState<S> {
    login_state: LoginState,
    user: CurrentUser,
    settings: Option<UserSettings>,
    online_users: Vec<UserId>,
    presence: Option<S>,
    presence_generation: u64,
}

impl<S: ChatSocket> SessionState<S> {
    fn close_presence(&mut self) {
        if let Some(socket) = self.presence.take() {
            socket.close();
        }
        self.presence_generation += 1;
    }

    fn clear(&mut self) {
        self.close_presence();
        self.login_state = LoginState::Anonymous;
        self.user.set(None);
        self.settings = None;
        self.online_users.clear();
    }
}

/// Owns authentication state, the current user, the presence feed and the
/// notifications feed.
pub struct SessionManager<T, C: SocketConnector> {
    api: Rc<ApiClient<T>>,
    connector: Rc<C>,
    state: Rc<RefCell<SessionState<C::Socket>>>,
    notifications: NotificationManager<T, C>,
}

impl<T: HttpTransport, C: SocketConnector + 'static> SessionManager<T, C> {
    pub fn new(api: Rc<ApiClient<T>>, connector: Rc<C>) -> Self {
        let state = Rc::new(RefCell::new(SessionState {
            login_state: LoginState::Unknown,
            user: CurrentUser::default(),
            settings: None,
            online_users: Vec::new(),
            presence: None,
            presence_generation: 0,
        }));

        let weak: Weak<RefCell<SessionState<C::Socket>>> = Rc::downgrade(&state);
        api.on_unauthorized(move || {
            if let Some(state) = weak.upgrade() {
                info!("Session invalidated by the server");
                state.borrow_mut().clear();
            }
        });

        let notifications = NotificationManager::new(api.clone(), connector.clone());
        Self { api, connector, state, notifications }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn login_state(&self) -> LoginState {
        self.state.borrow().login_state
    }

    pub fn is_logged_in(&self) -> bool {
        self.login_state() == LoginState::Authenticated
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.get()
    }

    /// A live handle on the logged-in user.
    pub fn current_user(&self) -> CurrentUser {
        self.state.borrow().user.clone()
    }

    pub fn settings(&self) -> Option<UserSettings> {
        self.state.borrow().settings.clone()
    }

    /// Ids of the users currently online.
    pub fn online_users(&self) -> Vec<UserId> {
        self.state.borrow().online_users.clone()
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.state.borrow().online_users.contains(&user_id)
    }

    pub fn notifications(&self) -> &NotificationManager<T, C> {
        &self.notifications
    }

    pub fn has_presence_feed(&self) -> bool {
        self.state.borrow().presence.is_some()
    }

    // ── Authentication ───────────────────────────────────────────────────────

    /// Validates a persisted token once. Any failure ends in `Anonymous`.
    pub async fn restore_session(&self) -> ApiResult<LoginState> {
        if self.api.token().is_none() {
            self.state.borrow_mut().login_state = LoginState::Anonymous;
            return Ok(LoginState::Anonymous);
        }

        self.state.borrow_mut().login_state = LoginState::Loading;
        match self.api.current_user().await {
            Ok(user) => {
                info!(user_id = user.id, "Session restored");
                self.establish(user);
                Ok(LoginState::Authenticated)
            }
            Err(e) => {
                warn!(error = %e, "Stored token rejected, continuing anonymously");
                self.api.clear_token();
                self.end();
                Err(e)
            }
        }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<User> {
        let grant = self.api.login(credentials).await?;
        info!(user_id = grant.user.id, "Logged in");
        self.api.store_token(&grant.token);
        self.establish(grant.user.clone());
        Ok(grant.user)
    }

    pub async fn register(&self, fields: &RegisterData) -> ApiResult<User> {
        let grant = self.api.register(fields).await?;
        info!(user_id = grant.user.id, "Registered");
        self.api.store_token(&grant.token);
        self.establish(grant.user.clone());
        Ok(grant.user)
    }

    /// Clears local state whether or not the server call succeeds, then reports its outcome.
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self.api.logout().await;
        if let Err(e) = &result {
            warn!(error = %e, "Logout call failed, clearing session anyway");
        }
        self.api.clear_token();
        self.end();
        result
    }

    // ── Account management ───────────────────────────────────────────────────

    pub async fn update_settings(&self, settings: &UserSettings) -> ApiResult<UserSettings> {
        let updated = self.api.update_settings(settings).await?;
        let mut state = self.state.borrow_mut();
        state.settings = Some(updated.clone());
        state.user.update(|user| {
            if let Some(user) = user.as_mut() {
                user.settings = Some(updated.clone());
            }
        });
        Ok(updated)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let updated = self.api.update_profile(update).await?;
        let user = self.state.borrow().user.update(|current| match current.as_mut() {
            Some(user) => {
                user.merge_profile(updated);
                user.clone()
            }
            None => current.insert(updated).clone(),
        });
        Ok(user)
    }

    pub async fn change_password(&self, fields: &ChangePasswordData) -> ApiResult<String> {
        self.api.change_password(fields).await
    }

    pub async fn delete_account(&self) -> ApiResult<()> {
        self.api.delete_account().await?;
        info!("Account deleted");
        self.api.clear_token();
        self.end();
        Ok(())
    }

    // ── Feeds ────────────────────────────────────────────────────────────────

    fn establish(&self, user: User) {
        {
            let mut state = self.state.borrow_mut();
            state.settings = user.settings.clone();
            state.user.set(Some(user));
            state.login_state = LoginState::Authenticated;
        }
        self.open_presence();
        self.notifications.open();
    }

    fn end(&self) {
        self.state.borrow_mut().clear();
        self.notifications.clear();
    }

    fn open_presence(&self) {
        let mut state = self.state.borrow_mut();
        if state.presence.is_some() {
            return;
        }
        let Some(token) = self.api.token() else {
            return;
        };

        state.presence_generation += 1;
        let tag = ConnectionTag { role: SocketRole::Presence, generation: state.presence_generation };
        let url = self.api.config().socket_url(PRESENCE_SOCKET_PATH, &token);
        match self.connector.connect(&url, tag) {
            Ok(socket) => {
                debug!(generation = tag.generation, "Presence socket opening");
                state.presence = Some(socket);
            }
            Err(e) => error!(error = %e, "Failed to open presence socket"),
        }
    }

    /// Routes an event from the presence socket; events of superseded sockets are ignored.
    pub fn handle_presence_event(&self, tag: ConnectionTag, event: SocketEvent) {
        let mut state = self.state.borrow_mut();
        if tag.role != SocketRole::Presence || tag.generation != state.presence_generation {
            debug!(generation = tag.generation, "Dropping event from a stale presence socket");
            return;
        }

        match event {
            SocketEvent::Opened => debug!("Presence socket established"),
            SocketEvent::Text(text) => match serde_json::from_str::<PresenceEvent>(&text) {
                Ok(PresenceEvent::OnlineUsers { online_users }) => {
                    debug!(count = online_users.len(), "Online users updated");
                    state.online_users = online_users;
                }
                Ok(PresenceEvent::Other) => {}
                Err(e) => warn!(error = %e, "Undecodable presence frame"),
            },
            SocketEvent::Closed { code, reason } => {
                info!(?code, %reason, "Presence socket closed");
                state.presence = None;
            }
            SocketEvent::Error(e) => warn!(error = %e, "Presence socket error"),
        }
    }

    /// Closes the presence and notifications sockets. Session data is kept.
    pub fn teardown(&self) {
        self.state.borrow_mut().close_presence();
        self.notifications.teardown();
    }
}
